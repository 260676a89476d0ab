use async_trait::async_trait;

use crate::{
    models::{CompletedResult, Tool},
    AnalyzerResult,
};

/// 已完成任务结果的存储接口
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn add_result(&self, client_id: &str, result: CompletedResult) -> AnalyzerResult<()>;

    async fn results_for_client(
        &self,
        client_id: &str,
        tool: Option<Tool>,
    ) -> AnalyzerResult<Vec<CompletedResult>>;

    /// 删除指定会话的结果，返回是否存在
    async fn remove_result(&self, client_id: &str, session_id: &str) -> AnalyzerResult<bool>;
}
