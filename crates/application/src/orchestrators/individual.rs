use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use analyzer_core::{
    config::IndividualConfig, AnalyzerResult, Artifact, ChatMessage, JobContext, JobData,
    ToolOutput,
};
use analyzer_dispatcher::{BatchDispatcher, BatchOutcome};

use crate::completion::CompletionCaller;

/// 模型认为条目没有问题时的回答前缀
const NO_ISSUE_PREFIX: &str = "No issue";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemFinding {
    artifact_id: String,
    message: String,
}

/// 翻译、毒性和质量检查：每个条目单独发出一次补全请求
#[derive(Clone)]
pub struct IndividualOrchestrator {
    caller: CompletionCaller,
    config: IndividualConfig,
}

impl IndividualOrchestrator {
    pub fn new(caller: CompletionCaller, config: IndividualConfig) -> Self {
        Self { caller, config }
    }

    async fn check_item(
        &self,
        data: &JobData,
        artifact: Artifact,
        cancellation: CancellationToken,
    ) -> AnalyzerResult<Option<ItemFinding>> {
        let messages = ChatMessage::conversation(
            &data.role,
            format!("{}{}", data.prompt, artifact.primary_text),
        );
        let Some(message) = self.caller.complete(&messages, &cancellation).await? else {
            return Ok(None);
        };
        if message.starts_with(NO_ISSUE_PREFIX) {
            return Ok(None);
        }

        Ok(Some(ItemFinding {
            artifact_id: artifact.id,
            message,
        }))
    }

    pub async fn run(&self, ctx: &JobContext) -> AnalyzerResult<ToolOutput> {
        let data = ctx.data.as_ref();
        info!(
            "会话 {} 开始逐条检查 {} 个条目 (工具: {})",
            ctx.session_id,
            data.artifacts.len(),
            ctx.tool
        );

        let dispatcher = BatchDispatcher::new(self.config.batch_size)?;
        let outcomes = dispatcher
            .dispatch_with_progress(
                data.artifacts.clone(),
                &ctx.cancellation,
                |artifact, token| self.check_item(data, artifact, token),
                |progress| ctx.progress.report(progress.processed, progress.total),
            )
            .await;

        let mut findings = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                BatchOutcome::Fulfilled(Some(finding)) => findings.push(finding),
                BatchOutcome::Fulfilled(None) => {}
                BatchOutcome::Rejected(e) => errors.push(e.to_string()),
            }
        }

        Ok(ToolOutput::new(serde_json::to_value(findings)?, errors))
    }
}
