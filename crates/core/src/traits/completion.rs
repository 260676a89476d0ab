use async_trait::async_trait;

use crate::{models::ChatMessage, AnalyzerResult};

/// 外部文本补全服务抽象接口
///
/// 实现方必须在服务未返回任何候选结果时返回 [`crate::AnalyzerError::NoCompletionChoices`]。
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// 发送带角色的消息列表，返回一个或多个候选补全文本
    async fn complete(&self, messages: &[ChatMessage], temperature: f32)
        -> AnalyzerResult<Vec<String>>;
}
