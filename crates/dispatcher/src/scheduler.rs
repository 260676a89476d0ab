use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use analyzer_core::{
    AnalyzerError, AnalyzerMetrics, AnalyzerResult, CompletedResult, Job, JobContext, JobKey,
    ProgressReporter, QueueFilter, QueueView, ResultStore, SessionStatus, SessionStore,
    SessionUpdate, Tool, ToolOutput, ToolRunner,
};

use crate::queue::RequestQueue;
use crate::state::{ServiceMode, ServiceState};

struct SchedulerInner {
    queue: RequestQueue,
    state: ServiceState,
}

/// 已准入任务的快照，供执行和收尾使用
#[derive(Debug, Clone)]
struct AdmittedJob {
    key: JobKey,
    tool: Tool,
    requested_at: DateTime<Utc>,
    context: JobContext,
}

/// 任务调度器
///
/// 在并发上限内按队列顺序准入任务，驱动工具执行器运行，并在任务完成、失败
/// 或取消后继续调度下一个任务。调度器构造一次后以 `Arc` 共享。
pub struct JobScheduler {
    inner: Mutex<SchedulerInner>,
    runner: Arc<dyn ToolRunner>,
    session_store: Arc<dyn SessionStore>,
    result_store: Arc<dyn ResultStore>,
    idle: Notify,
}

impl JobScheduler {
    pub fn new(
        max_concurrent_jobs: usize,
        runner: Arc<dyn ToolRunner>,
        session_store: Arc<dyn SessionStore>,
        result_store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            inner: Mutex::new(SchedulerInner {
                queue: RequestQueue::new(max_concurrent_jobs),
                state: ServiceState::new(max_concurrent_jobs),
            }),
            runner,
            session_store,
            result_store,
            idle: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 任务入队，返回新的队列长度
    pub fn submit(&self, job: Job) -> usize {
        let tool = job.tool;
        let key = job.key();
        let length = {
            let mut inner = self.lock();
            inner.queue.enqueue(job)
        };
        AnalyzerMetrics::job_submitted(tool);
        AnalyzerMetrics::queue_depth(length);
        debug!("任务 {} 已入队，当前队列长度: {}", key, length);
        length
    }

    /// 槽位空闲时返回下一个可执行任务的身份
    pub fn next_eligible(&self) -> Option<JobKey> {
        let inner = self.lock();
        if !inner.state.has_capacity() {
            return None;
        }
        inner.queue.next_eligible().map(Job::key)
    }

    /// pending → running：分配取消令牌并进入忙碌状态
    fn admit(self: &Arc<Self>, key: &JobKey) -> Option<AdmittedJob> {
        let mut inner = self.lock();
        if !inner.state.has_capacity() {
            return None;
        }
        let token = CancellationToken::new();
        let job = inner.queue.admit(key, token.clone())?;

        let weak: Weak<Self> = Arc::downgrade(self);
        let progress_key = key.clone();
        let progress = ProgressReporter::new(move |pct| {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.set_progress(&progress_key, pct);
            }
        });

        let admitted = AdmittedJob {
            key: key.clone(),
            tool: job.tool,
            requested_at: job.created_at,
            context: JobContext {
                session_id: job.id.clone(),
                client_id: job.client_id.clone(),
                tool: job.tool,
                data: Arc::new(job.payload.clone()),
                cancellation: token,
                progress,
            },
        };
        inner.state.activate(key.clone());
        Some(admitted)
    }

    /// running → done，按身份移出队列；活跃集合清空后回到空闲
    pub fn complete(&self, key: &JobKey) -> Option<Job> {
        let mut inner = self.lock();
        let job = inner.queue.complete(key);
        inner.state.deactivate(key);
        self.after_release(&inner);
        job
    }

    /// 收尾时将任务移出执行槽，活跃标记保留到结果写入之后。
    /// 任务已被取消移除或令牌已触发时返回 None
    fn take_finished(&self, key: &JobKey, succeeded: bool) -> Option<Job> {
        let mut inner = self.lock();
        let cancelled = inner
            .queue
            .running(key)
            .and_then(|job| job.cancellation.as_ref())
            .is_some_and(CancellationToken::is_cancelled);
        if cancelled {
            return None;
        }
        if succeeded {
            inner.queue.complete(key)
        } else {
            inner.queue.fail(key)
        }
    }

    /// 释放活跃标记
    fn release(&self, key: &JobKey) {
        let mut inner = self.lock();
        inner.state.deactivate(key);
        self.after_release(&inner);
    }

    /// 取消等待中或运行中的任务。找不到时返回 None，不视为错误
    pub fn cancel(&self, session_id: &str, client_id: &str) -> Option<Job> {
        let mut inner = self.lock();
        let job = inner.queue.remove(session_id, client_id)?;
        inner.state.deactivate(&job.key());
        self.after_release(&inner);
        drop(inner);

        AnalyzerMetrics::job_cancelled(job.tool);
        info!("任务 {} 已取消 (状态: {:?})", job.key(), job.status);
        Some(job)
    }

    /// 只更新运行中任务的进度
    pub fn set_progress(&self, key: &JobKey, pct: f64) -> bool {
        self.lock().queue.set_progress(key, pct)
    }

    pub fn is_busy(&self) -> bool {
        self.lock().state.is_busy()
    }

    pub fn mode(&self) -> ServiceMode {
        self.lock().state.mode()
    }

    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn queue_view(&self, filter: &QueueFilter) -> QueueView {
        self.lock().queue.view(filter)
    }

    /// 准入所有可执行任务并在运行时上启动，返回本次启动的任务数
    pub fn pump(self: &Arc<Self>) -> usize {
        let mut started = 0;
        while let Some(key) = self.next_eligible() {
            let Some(admitted) = self.admit(&key) else {
                break;
            };
            AnalyzerMetrics::job_admitted(admitted.tool);
            info!("开始执行任务 {} (工具: {})", admitted.key, admitted.tool);
            self.spawn_job(admitted);
            started += 1;
        }
        started
    }

    /// 等待队列清空且没有运行中的任务
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let inner = self.lock();
                if inner.queue.is_empty() && !inner.state.is_busy() {
                    return;
                }
            }
            notified.await;
        }
    }

    fn after_release(&self, inner: &SchedulerInner) {
        AnalyzerMetrics::queue_depth(inner.queue.len());
        if inner.queue.is_empty() && !inner.state.is_busy() {
            self.idle.notify_waiters();
        }
    }

    fn spawn_job(self: &Arc<Self>, admitted: AdmittedJob) {
        let scheduler = Arc::clone(self);
        let span = info_span!(
            "job",
            session_id = %admitted.context.session_id,
            client_id = %admitted.context.client_id,
            tool = %admitted.tool,
        );

        tokio::spawn(
            async move {
                let runner = Arc::clone(&scheduler.runner);
                let context = admitted.context.clone();
                // 执行器在独立任务中运行，panic 会以 JoinError 的形式返回
                let outcome = tokio::spawn(async move { runner.run(context).await }).await;
                scheduler.finish(&admitted, outcome).await;
                scheduler.pump();
            }
            .instrument(span),
        );
    }

    async fn finish(
        &self,
        admitted: &AdmittedJob,
        outcome: Result<AnalyzerResult<ToolOutput>, JoinError>,
    ) {
        let result = outcome.unwrap_or_else(|join_error| {
            error!("任务 {} 执行异常终止: {}", admitted.key, join_error);
            Err(AnalyzerError::Internal(format!(
                "任务执行异常终止: {join_error}"
            )))
        });

        if self.session_cancelled(admitted).await {
            info!("会话 {} 已被取消，丢弃执行结果", admitted.key.session_id);
            self.release_cancelled(&admitted.key);
            return;
        }

        match result {
            Ok(output) => {
                if self.take_finished(&admitted.key, true).is_none() {
                    info!("任务 {} 在收尾前已被取消，丢弃执行结果", admitted.key);
                    self.release(&admitted.key);
                    return;
                }

                self.update_session(&admitted.key.session_id, SessionUpdate::status(SessionStatus::Success))
                    .await;

                let record = CompletedResult {
                    requested_at: admitted.requested_at,
                    session_id: admitted.key.session_id.clone(),
                    tool: admitted.tool,
                    data: output.data,
                    errors: output.errors,
                };
                if let Err(e) = self
                    .result_store
                    .add_result(&admitted.key.client_id, record)
                    .await
                {
                    error!("保存任务 {} 的结果失败: {}", admitted.key, e);
                }

                self.release(&admitted.key);
                AnalyzerMetrics::job_completed(admitted.tool);
                info!("任务 {} 执行完成", admitted.key);
            }
            Err(AnalyzerError::Cancelled) => {
                self.update_session(
                    &admitted.key.session_id,
                    SessionUpdate::status(SessionStatus::Cancelled),
                )
                .await;
                self.release_cancelled(&admitted.key);
            }
            Err(e) => {
                if self.take_finished(&admitted.key, false).is_none() {
                    info!("任务 {} 在收尾前已被取消，忽略执行错误: {}", admitted.key, e);
                    self.release(&admitted.key);
                    return;
                }

                warn!("任务 {} 执行失败: {}", admitted.key, e);
                self.update_session(
                    &admitted.key.session_id,
                    SessionUpdate::status(SessionStatus::Error).with_message(e.to_string()),
                )
                .await;
                self.release(&admitted.key);
                AnalyzerMetrics::job_failed(admitted.tool);
            }
        }
    }

    async fn session_cancelled(&self, admitted: &AdmittedJob) -> bool {
        if admitted.context.cancellation.is_cancelled() {
            return true;
        }
        match self
            .session_store
            .get_session(&admitted.key.session_id)
            .await
        {
            Ok(Some(session)) => session.is_cancelled(),
            Ok(None) => false,
            Err(e) => {
                warn!("读取会话 {} 失败: {}", admitted.key.session_id, e);
                false
            }
        }
    }

    /// 取消后的收尾：任务若仍在槽位中则移出
    fn release_cancelled(&self, key: &JobKey) {
        let mut inner = self.lock();
        if inner.queue.remove(&key.session_id, &key.client_id).is_some() {
            debug!("任务 {} 取消后移出执行槽", key);
        }
        inner.state.deactivate(key);
        self.after_release(&inner);
    }

    async fn update_session(&self, session_id: &str, update: SessionUpdate) {
        match self.session_store.update_session(session_id, update).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!("会话 {} 不存在，跳过状态更新", session_id),
            Err(e) => error!("更新会话 {} 失败: {}", session_id, e),
        }
    }
}
