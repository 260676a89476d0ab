use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use analyzer_core::{
    AnalyzerError, AnalyzerResult, AppConfig, CompletedResult, CompletionService, Job, JobRequest,
    NewSession, QueueFilter, QueueView, ResultStore, SessionStatus, SessionStore, SessionUpdate,
    SubmitReceipt, Tool, ToolRunner,
};
use analyzer_dispatcher::JobScheduler;

use crate::runner::AnalyzerToolRunner;

/// 忙碌探测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyStatus {
    pub blocked_by_state_machine: bool,
    pub queue_length: usize,
}

/// 提交前的请求校验
pub fn validate_request(request: &JobRequest) -> AnalyzerResult<()> {
    if request.client_id.trim().is_empty() {
        return Err(AnalyzerError::Validation("缺少客户端ID".to_string()));
    }
    if request.data.artifacts.is_empty() {
        return Err(AnalyzerError::Validation("至少需要一个条目".to_string()));
    }
    if request.data.prompt.trim().is_empty() {
        return Err(AnalyzerError::Validation("缺少提示词".to_string()));
    }
    if request.tool == Tool::TestCasesGeneration && request.data.data_for_test_cases.is_none() {
        return Err(AnalyzerError::Validation(
            "测试用例生成需要 dataForTestCases".to_string(),
        ));
    }
    Ok(())
}

/// 任务服务：提交、取消、查询队列和结果
///
/// 调度器、会话存储和结果存储在构造时注入，服务本身可以 `Arc` 共享给多个调用方。
pub struct JobService {
    scheduler: Arc<JobScheduler>,
    session_store: Arc<dyn SessionStore>,
    result_store: Arc<dyn ResultStore>,
}

impl JobService {
    pub fn new(
        scheduler: Arc<JobScheduler>,
        session_store: Arc<dyn SessionStore>,
        result_store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            scheduler,
            session_store,
            result_store,
        }
    }

    /// 用任意工具执行器组装服务
    pub fn with_runner(
        max_concurrent_jobs: usize,
        runner: Arc<dyn ToolRunner>,
        session_store: Arc<dyn SessionStore>,
        result_store: Arc<dyn ResultStore>,
    ) -> Self {
        let scheduler = Arc::new(JobScheduler::new(
            max_concurrent_jobs,
            runner,
            Arc::clone(&session_store),
            Arc::clone(&result_store),
        ));
        Self::new(scheduler, session_store, result_store)
    }

    /// 按配置组装服务，工具执行器使用给定的补全服务
    pub fn from_config(
        config: &AppConfig,
        completion: Arc<dyn CompletionService>,
        session_store: Arc<dyn SessionStore>,
        result_store: Arc<dyn ResultStore>,
    ) -> Self {
        let runner = Arc::new(AnalyzerToolRunner::new(completion, config));
        Self::with_runner(
            config.scheduler.max_concurrent_jobs,
            runner,
            session_store,
            result_store,
        )
    }

    pub fn scheduler(&self) -> &Arc<JobScheduler> {
        &self.scheduler
    }

    /// 创建会话并入队。校验失败时会话标记为 error 并返回校验错误
    pub async fn submit(&self, request: JobRequest) -> AnalyzerResult<SubmitReceipt> {
        let session = self
            .session_store
            .create_session(NewSession::pending(request.client_id.clone(), request.tool))
            .await?;

        if let Err(e) = validate_request(&request) {
            warn!("会话 {} 请求校验失败: {}", session.id, e);
            self.session_store
                .update_session(
                    &session.id,
                    SessionUpdate::status(SessionStatus::Error).with_message(e.to_string()),
                )
                .await?;
            return Err(e);
        }

        let receipt = SubmitReceipt {
            session_id: session.id.clone(),
            client_id: request.client_id.clone(),
            tool: request.tool,
            queue_length: self.scheduler.submit(Job::new(session.id, request)),
        };
        self.scheduler.pump();

        info!(
            "会话 {} 已提交 (客户端: {}, 工具: {}, 队列长度: {})",
            receipt.session_id, receipt.client_id, receipt.tool, receipt.queue_length
        );
        Ok(receipt)
    }

    /// 取消等待中或运行中的任务；任务不存在时返回 false
    pub async fn cancel(&self, session_id: &str, client_id: &str) -> AnalyzerResult<bool> {
        // 运行中的任务在收尾时看到已触发的令牌，结果被丢弃
        let Some(job) = self.scheduler.cancel(session_id, client_id) else {
            return Ok(false);
        };
        self.session_store
            .update_session(&job.id, SessionUpdate::status(SessionStatus::Cancelled))
            .await?;
        self.scheduler.pump();
        Ok(true)
    }

    pub fn is_busy(&self) -> bool {
        self.scheduler.is_busy()
    }

    pub fn check_busy(&self, client_id: &str) -> AnalyzerResult<BusyStatus> {
        if client_id.trim().is_empty() {
            return Err(AnalyzerError::Validation("缺少客户端ID".to_string()));
        }
        Ok(BusyStatus {
            blocked_by_state_machine: self.scheduler.is_busy(),
            queue_length: self.scheduler.queue_len(),
        })
    }

    pub fn queue(&self, filter: &QueueFilter) -> QueueView {
        self.scheduler.queue_view(filter)
    }

    pub async fn results(
        &self,
        client_id: &str,
        tool: Option<Tool>,
    ) -> AnalyzerResult<Vec<CompletedResult>> {
        self.result_store.results_for_client(client_id, tool).await
    }

    pub async fn delete_result(&self, client_id: &str, session_id: &str) -> AnalyzerResult<bool> {
        self.result_store.remove_result(client_id, session_id).await
    }

    pub async fn wait_until_idle(&self) {
        self.scheduler.wait_until_idle().await
    }
}
