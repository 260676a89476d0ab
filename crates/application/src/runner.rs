use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use analyzer_core::{
    AnalyzerResult, AppConfig, CompletionService, JobContext, Tool, ToolOutput, ToolRunner,
};

use crate::completion::CompletionCaller;
use crate::orchestrators::{ConsistencyOrchestrator, IndividualOrchestrator, TestCaseOrchestrator};

/// 按工具类型分派到对应编排流程的执行器
#[derive(Clone)]
pub struct AnalyzerToolRunner {
    consistency: ConsistencyOrchestrator,
    individual: IndividualOrchestrator,
    test_cases: TestCaseOrchestrator,
}

impl AnalyzerToolRunner {
    pub fn new(service: Arc<dyn CompletionService>, config: &AppConfig) -> Self {
        let caller = CompletionCaller::new(service, &config.completion);
        Self {
            consistency: ConsistencyOrchestrator::new(caller.clone(), config.consistency.clone()),
            individual: IndividualOrchestrator::new(caller.clone(), config.individual.clone()),
            test_cases: TestCaseOrchestrator::new(caller, config.test_cases.clone()),
        }
    }
}

#[async_trait]
impl ToolRunner for AnalyzerToolRunner {
    async fn run(&self, ctx: JobContext) -> AnalyzerResult<ToolOutput> {
        debug!("会话 {} 使用工具 {} 执行", ctx.session_id, ctx.tool);
        match ctx.tool {
            Tool::Consistency => self.consistency.run(&ctx).await,
            Tool::Translate | Tool::Toxic | Tool::Quality => self.individual.run(&ctx).await,
            Tool::TestCasesGeneration => self.test_cases.run(&ctx).await,
        }
    }
}
