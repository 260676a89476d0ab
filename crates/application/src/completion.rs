use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use analyzer_core::{
    config::CompletionConfig, AnalyzerError, AnalyzerResult, ChatMessage, CompletionService,
};

/// 重试间隔的随机抖动范围
const JITTER_FACTOR: f64 = 0.1;

/// 补全调用封装：取消短路、单次超时与指数退避重试
#[derive(Clone)]
pub struct CompletionCaller {
    service: Arc<dyn CompletionService>,
    temperature: f32,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl CompletionCaller {
    pub fn new(service: Arc<dyn CompletionService>, config: &CompletionConfig) -> Self {
        Self {
            service,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.request_timeout_seconds),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 第 `attempt` 次重试前的等待时间：base × 2^attempt，附加 ±10% 抖动
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.retry_base_delay.as_secs_f64();
        let interval = base * 2f64.powi(attempt as i32);
        let jitter = interval * JITTER_FACTOR * (rand::random::<f64>() - 0.5) * 2.0;
        Duration::from_secs_f64((interval + jitter).max(0.0))
    }

    /// 返回第一个候选补全；取消时返回 `Ok(None)` 且不再调用外部服务
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        cancellation: &CancellationToken,
    ) -> AnalyzerResult<Option<String>> {
        Ok(self
            .complete_all(messages, cancellation)
            .await?
            .and_then(|choices| choices.into_iter().next()))
    }

    /// 返回全部候选补全
    pub async fn complete_all(
        &self,
        messages: &[ChatMessage],
        cancellation: &CancellationToken,
    ) -> AnalyzerResult<Option<Vec<String>>> {
        let mut attempt = 0;

        loop {
            if cancellation.is_cancelled() {
                debug!("任务已取消，跳过补全调用");
                return Ok(None);
            }

            let result = match tokio::time::timeout(
                self.timeout,
                self.service.complete(messages, self.temperature),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(AnalyzerError::Timeout(self.timeout.as_secs())),
            };

            match result {
                Ok(choices) if choices.is_empty() => return Err(AnalyzerError::NoCompletionChoices),
                Ok(choices) => return Ok(Some(choices)),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    attempt += 1;
                    warn!(
                        "补全调用失败，{}ms 后进行第 {} 次重试: {}",
                        delay.as_millis(),
                        attempt,
                        e
                    );
                    tokio::select! {
                        _ = cancellation.cancelled() => return Ok(None),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_testing_utils::{MockCompletionService, MockReply};

    fn caller(service: Arc<MockCompletionService>, max_retries: u32) -> CompletionCaller {
        let config = CompletionConfig {
            max_retries,
            retry_base_delay_ms: 1,
            ..CompletionConfig::default()
        };
        CompletionCaller::new(service, &config)
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_call() {
        let service = Arc::new(MockCompletionService::new());
        let token = CancellationToken::new();
        token.cancel();

        let answer = caller(service.clone(), 2)
            .complete(&[ChatMessage::user("hi")], &token)
            .await
            .unwrap();

        assert!(answer.is_none());
        assert_eq!(service.request_count(), 0);
    }

    #[tokio::test]
    async fn test_retryable_error_is_retried() {
        let service = Arc::new(
            MockCompletionService::new()
                .then_reply(MockReply::Status(503, "overloaded".to_string()))
                .then_reply(MockReply::answer("ok")),
        );

        let answer = caller(service.clone(), 2)
            .complete(&[ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(answer.as_deref(), Some("ok"));
        assert_eq!(service.request_count(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let service = Arc::new(
            MockCompletionService::new()
                .then_reply(MockReply::Status(400, "bad request".to_string())),
        );

        let result = caller(service.clone(), 3)
            .complete(&[ChatMessage::user("hi")], &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(AnalyzerError::ExternalService {
                status: Some(400),
                ..
            })
        ));
        assert_eq!(service.request_count(), 1);
    }

    #[tokio::test]
    async fn test_no_choices_is_distinct_failure() {
        let service =
            Arc::new(MockCompletionService::new().with_default(MockReply::NoChoices));
        let result = caller(service, 0)
            .complete(&[ChatMessage::user("hi")], &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AnalyzerError::NoCompletionChoices)));
    }

    #[tokio::test]
    async fn test_timeout_exhausts_retries() {
        let service = Arc::new(
            MockCompletionService::new().with_delay(Duration::from_millis(200)),
        );
        let result = caller(service.clone(), 1)
            .with_timeout(Duration::from_millis(10))
            .complete(&[ChatMessage::user("hi")], &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(AnalyzerError::Timeout(_))));
        assert_eq!(service.request_count(), 2);
    }

    #[test]
    fn test_backoff_delay_within_jitter() {
        let service = Arc::new(MockCompletionService::new());
        let config = CompletionConfig {
            retry_base_delay_ms: 100,
            ..CompletionConfig::default()
        };
        let caller = CompletionCaller::new(service, &config);

        for attempt in 0..4 {
            let expected = 0.1 * 2f64.powi(attempt as i32);
            let delay = caller.backoff_delay(attempt).as_secs_f64();
            assert!(delay >= expected * 0.9 - 1e-9 && delay <= expected * 1.1 + 1e-9);
        }
    }
}
