use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    models::{JobData, Tool, ToolOutput},
    AnalyzerResult,
};

/// 进度上报回调
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn Fn(f64) + Send + Sync>,
}

impl ProgressReporter {
    pub fn new(sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// 按已处理/总数上报百分比，保留两位小数
    pub fn report(&self, processed: usize, total: usize) {
        if total == 0 {
            return;
        }
        let pct = processed.min(total) as f64 / total as f64 * 100.0;
        (self.sink)((pct * 100.0).round() / 100.0);
    }

    pub fn set(&self, pct: f64) {
        (self.sink)(pct.clamp(0.0, 100.0));
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

/// 调度器交给工具执行器的任务上下文
#[derive(Debug, Clone)]
pub struct JobContext {
    pub session_id: String,
    pub client_id: String,
    pub tool: Tool,
    pub data: Arc<JobData>,
    pub cancellation: CancellationToken,
    pub progress: ProgressReporter,
}

/// 按工具类型执行任务的编排入口
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, ctx: JobContext) -> AnalyzerResult<ToolOutput>;
}
