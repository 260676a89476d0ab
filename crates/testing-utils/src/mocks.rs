//! Mock implementations of the collaborator traits
//!
//! These mocks are scripted in-memory doubles: they never touch the network
//! and record every call so tests can assert on what was sent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use analyzer_core::{
    AnalyzerError, AnalyzerResult, ChatMessage, CompletionService, JobContext, ToolOutput,
    ToolRunner,
};

/// Scripted reply of [`MockCompletionService`]
#[derive(Debug, Clone)]
pub enum MockReply {
    Answer(String),
    Answers(Vec<String>),
    NoChoices,
    Status(u16, String),
    Network(String),
}

impl MockReply {
    pub fn answer(text: impl Into<String>) -> Self {
        MockReply::Answer(text.into())
    }

    fn into_result(self) -> AnalyzerResult<Vec<String>> {
        match self {
            MockReply::Answer(text) => Ok(vec![text]),
            MockReply::Answers(texts) if texts.is_empty() => Err(AnalyzerError::NoCompletionChoices),
            MockReply::Answers(texts) => Ok(texts),
            MockReply::NoChoices => Err(AnalyzerError::NoCompletionChoices),
            MockReply::Status(status, message) => {
                Err(AnalyzerError::external_with_status(message, status))
            }
            MockReply::Network(message) => Err(AnalyzerError::Network(message)),
        }
    }
}

type Matcher = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Mock implementation of CompletionService for testing
///
/// Replies are resolved in this order: queued replies (FIFO), then the first
/// rule whose matcher accepts the last message's content, then the default.
pub struct MockCompletionService {
    queued: Mutex<VecDeque<MockReply>>,
    rules: Vec<(Matcher, MockReply)>,
    default: MockReply,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockCompletionService {
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            default: MockReply::answer("No issue"),
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_default(mut self, reply: MockReply) -> Self {
        self.default = reply;
        self
    }

    /// Reply with `reply` whenever the user message satisfies `matcher`
    pub fn when<F>(mut self, matcher: F, reply: MockReply) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.rules.push((Box::new(matcher), reply));
        self
    }

    /// Reply with `reply` when the user message contains `needle`
    pub fn when_contains(self, needle: &str, reply: MockReply) -> Self {
        let needle = needle.to_string();
        self.when(move |content| content.contains(&needle), reply)
    }

    /// Queue a one-shot reply consumed before any rule
    pub fn then_reply(self, reply: MockReply) -> Self {
        self.queued.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Content of the last message of every request, in call order
    pub fn user_messages(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|messages| messages.last().map(|m| m.content.clone()))
            .collect()
    }

    fn resolve(&self, content: &str) -> MockReply {
        if let Some(reply) = self.queued.lock().unwrap().pop_front() {
            return reply;
        }
        self.rules
            .iter()
            .find(|(matcher, _)| matcher(content))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}

impl Default for MockCompletionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
    ) -> AnalyzerResult<Vec<String>> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let content = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let reply = self.resolve(content);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        reply.into_result()
    }
}

/// Scripted behaviour of [`MockToolRunner`]
#[derive(Debug, Clone)]
pub enum MockRunBehavior {
    Succeed,
    Fail(String),
    Panic(String),
}

/// Mock implementation of ToolRunner for scheduler tests
///
/// A gated runner blocks every job until [`MockToolRunner::release`] hands
/// out a permit, or until the job's cancellation token fires.
pub struct MockToolRunner {
    behavior: MockRunBehavior,
    gate: Option<Arc<Semaphore>>,
    started: Arc<Mutex<Vec<String>>>,
}

impl MockToolRunner {
    pub fn new() -> Self {
        Self {
            behavior: MockRunBehavior::Succeed,
            gate: None,
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_behavior(mut self, behavior: MockRunBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `count` blocked jobs proceed
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Session ids in the order their jobs started
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

impl Default for MockToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRunner for MockToolRunner {
    async fn run(&self, ctx: JobContext) -> AnalyzerResult<ToolOutput> {
        self.started.lock().unwrap().push(ctx.session_id.clone());

        if let Some(gate) = &self.gate {
            tokio::select! {
                permit = gate.acquire() => {
                    if let Ok(permit) = permit {
                        permit.forget();
                    }
                }
                _ = ctx.cancellation.cancelled() => {
                    return Ok(ToolOutput::new(serde_json::json!([]), Vec::new()));
                }
            }
        }

        let total = ctx.data.artifacts.len();
        ctx.progress.report(total, total);

        match &self.behavior {
            MockRunBehavior::Succeed => Ok(ToolOutput::new(
                serde_json::json!({ "sessionId": ctx.session_id, "artifacts": total }),
                Vec::new(),
            )),
            MockRunBehavior::Fail(message) => Err(AnalyzerError::external(message.clone())),
            MockRunBehavior::Panic(message) => panic!("{}", message),
        }
    }
}
