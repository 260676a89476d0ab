use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use analyzer_core::{
    AnalyzerResult, Job, JobStatus, NewSession, QueueFilter, QueueView, ResultStore, Session,
    SessionQuery, SessionStatus, SessionStore, SessionUpdate, Tool,
};
use analyzer_dispatcher::{JobScheduler, ServiceMode};
use analyzer_infrastructure::{InMemoryResultStore, InMemorySessionStore};
use analyzer_testing_utils::{JobRequestBuilder, MockRunBehavior, MockToolRunner, TestEnv};

struct Harness {
    scheduler: Arc<JobScheduler>,
    runner: Arc<MockToolRunner>,
    sessions: Arc<InMemorySessionStore>,
    results: Arc<InMemoryResultStore>,
}

impl Harness {
    fn new(limit: usize, runner: MockToolRunner) -> Self {
        let runner = Arc::new(runner);
        let sessions = Arc::new(InMemorySessionStore::new());
        let results = Arc::new(InMemoryResultStore::new());
        let scheduler = Arc::new(JobScheduler::new(
            limit,
            runner.clone(),
            sessions.clone(),
            results.clone(),
        ));
        Self {
            scheduler,
            runner,
            sessions,
            results,
        }
    }

    async fn submit(&self, client_id: &str) -> String {
        let request = JobRequestBuilder::new(Tool::Quality)
            .with_client(client_id)
            .with_artifacts(2)
            .build();
        let session = self
            .sessions
            .create_session(NewSession::pending(client_id, request.tool))
            .await
            .unwrap();
        self.scheduler.submit(Job::new(session.id.clone(), request));
        self.scheduler.pump();
        session.id
    }

    async fn wait_started(&self, count: usize) {
        let runner = self.runner.clone();
        assert!(
            TestEnv::wait_for(
                || {
                    let runner = runner.clone();
                    async move { runner.started().len() >= count }
                },
                Duration::from_secs(5),
            )
            .await,
            "runner never started {count} jobs"
        );
    }

    async fn wait_idle(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.scheduler.wait_until_idle())
            .await
            .expect("scheduler did not become idle");
    }

    async fn status(&self, session_id: &str) -> SessionStatus {
        self.sessions
            .get_session(session_id)
            .await
            .unwrap()
            .unwrap()
            .status
    }
}

#[tokio::test]
async fn test_busy_from_submit_until_completion() {
    let harness = Harness::new(1, MockToolRunner::new().gated());
    assert!(!harness.scheduler.is_busy());

    let session_id = harness.submit("client").await;
    assert!(harness.scheduler.is_busy());
    assert_eq!(harness.scheduler.mode(), ServiceMode::Busy);

    harness.wait_started(1).await;
    assert!(harness.scheduler.is_busy());

    harness.runner.release(1);
    harness.wait_idle().await;

    assert!(!harness.scheduler.is_busy());
    assert_eq!(harness.scheduler.queue_len(), 0);
    assert_eq!(harness.status(&session_id).await, SessionStatus::Success);

    let results = harness.results.results_for_client("client", None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].session_id, session_id);
    assert_eq!(results[0].data["artifacts"], 2);
}

#[tokio::test]
async fn test_cancel_queued_job_produces_no_result() {
    let harness = Harness::new(1, MockToolRunner::new().gated());
    let first = harness.submit("client").await;
    let second = harness.submit("client").await;
    assert_eq!(harness.scheduler.queue_len(), 2);

    let cancelled = harness.scheduler.cancel(&second, "client").unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert_eq!(harness.scheduler.queue_len(), 1);

    // 重复取消不报错
    assert!(harness.scheduler.cancel(&second, "client").is_none());

    harness.runner.release(1);
    harness.wait_idle().await;

    assert_eq!(harness.runner.started(), vec![first.clone()]);
    let results = harness.results.results_for_client("client", None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].session_id, first);
}

#[tokio::test]
async fn test_cancel_running_job_discards_result_and_resumes() {
    let harness = Harness::new(1, MockToolRunner::new().gated());
    let first = harness.submit("client").await;
    let second = harness.submit("client").await;
    harness.wait_started(1).await;

    harness
        .sessions
        .update_session(&first, SessionUpdate::status(SessionStatus::Cancelled))
        .await
        .unwrap();
    let cancelled = harness.scheduler.cancel(&first, "client").unwrap();
    assert!(cancelled.cancellation.unwrap().is_cancelled());
    harness.scheduler.pump();

    harness.wait_started(2).await;
    harness.runner.release(1);
    harness.wait_idle().await;

    assert_eq!(harness.status(&first).await, SessionStatus::Cancelled);
    assert_eq!(harness.status(&second).await, SessionStatus::Success);
    let results = harness.results.results_for_client("client", None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].session_id, second);
}

#[tokio::test]
async fn test_failed_job_marks_session_error() {
    let harness = Harness::new(
        1,
        MockToolRunner::new().with_behavior(MockRunBehavior::Fail("upstream 500".to_string())),
    );
    let session_id = harness.submit("client").await;
    harness.wait_idle().await;

    let session = harness.sessions.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Error);
    assert!(session.message.unwrap().contains("upstream 500"));
    assert!(session.finished_at.is_some());
    assert!(harness
        .results
        .results_for_client("client", None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_panicking_runner_does_not_stop_scheduler() {
    let harness = Harness::new(
        1,
        MockToolRunner::new().with_behavior(MockRunBehavior::Panic("boom".to_string())),
    );
    let first = harness.submit("client").await;
    let second = harness.submit("client").await;
    harness.wait_idle().await;

    assert_eq!(harness.runner.started().len(), 2);
    assert_eq!(harness.status(&first).await, SessionStatus::Error);
    assert_eq!(harness.status(&second).await, SessionStatus::Error);
    assert!(!harness.scheduler.is_busy());
}

#[tokio::test]
async fn test_concurrency_limit_of_two() {
    let harness = Harness::new(2, MockToolRunner::new().gated());
    for _ in 0..3 {
        harness.submit("client").await;
    }
    harness.wait_started(2).await;

    match harness.scheduler.queue_view(&QueueFilter::default()) {
        QueueView::Full(entries) => {
            let running = entries
                .iter()
                .filter(|e| e.status == JobStatus::Running)
                .count();
            assert_eq!(running, 2);
            assert_eq!(entries.len(), 3);
        }
        QueueView::Progress(_) => panic!("expected full view"),
    }
    assert_eq!(harness.runner.started().len(), 2);

    harness.runner.release(3);
    harness.wait_idle().await;
    assert_eq!(harness.runner.started().len(), 3);
    assert_eq!(
        harness
            .results
            .results_for_client("client", None)
            .await
            .unwrap()
            .len(),
        3
    );
}

/// 读取会话时延迟返回的存储，用于放大收尾阶段的时间窗口
struct SlowReadSessionStore {
    inner: Arc<InMemorySessionStore>,
    delay: Duration,
}

#[async_trait]
impl SessionStore for SlowReadSessionStore {
    async fn create_session(&self, session: NewSession) -> AnalyzerResult<Session> {
        self.inner.create_session(session).await
    }

    async fn get_session(&self, session_id: &str) -> AnalyzerResult<Option<Session>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_session(session_id).await
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> AnalyzerResult<Option<Session>> {
        self.inner.update_session(session_id, update).await
    }

    async fn delete_session(&self, session_id: &str) -> AnalyzerResult<()> {
        self.inner.delete_session(session_id).await
    }

    async fn list_sessions(&self, query: &SessionQuery) -> AnalyzerResult<Vec<Session>> {
        self.inner.list_sessions(query).await
    }
}

#[tokio::test]
async fn test_cancel_during_finish_discards_result() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let results = Arc::new(InMemoryResultStore::new());
    let scheduler = Arc::new(JobScheduler::new(
        1,
        Arc::new(MockToolRunner::new()),
        Arc::new(SlowReadSessionStore {
            inner: sessions.clone(),
            delay: Duration::from_millis(200),
        }),
        results.clone(),
    ));

    let request = JobRequestBuilder::new(Tool::Quality)
        .with_client("c")
        .with_artifacts(1)
        .build();
    let session = sessions
        .create_session(NewSession::pending("c", request.tool))
        .await
        .unwrap();
    scheduler.submit(Job::new(session.id.clone(), request));
    scheduler.pump();

    // 执行器已返回，收尾阶段正在读取会话
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(scheduler.cancel(&session.id, "c").is_some());
    sessions
        .update_session(&session.id, SessionUpdate::status(SessionStatus::Cancelled))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;

    let stored = sessions.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Cancelled);
    assert!(results.results_for_client("c", None).await.unwrap().is_empty());
    assert!(!scheduler.is_busy());
    assert_eq!(scheduler.queue_len(), 0);
}
