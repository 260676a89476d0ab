//! 分批并发执行器
//!
//! 批与批之间严格串行，批内所有条目并发执行。取消只在批边界检查：
//! 已经发出的批允许执行完毕，之后不再启动新批。

use std::future::Future;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use analyzer_core::{AnalyzerError, AnalyzerResult, AnalyzerMetrics};

/// 单个条目的执行结果
#[derive(Debug)]
pub enum BatchOutcome<T> {
    Fulfilled(T),
    Rejected(AnalyzerError),
}

impl<T> BatchOutcome<T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, BatchOutcome::Fulfilled(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            BatchOutcome::Fulfilled(value) => Some(value),
            BatchOutcome::Rejected(_) => None,
        }
    }

    pub fn error(&self) -> Option<&AnalyzerError> {
        match self {
            BatchOutcome::Fulfilled(_) => None,
            BatchOutcome::Rejected(err) => Some(err),
        }
    }

    pub fn into_result(self) -> AnalyzerResult<T> {
        match self {
            BatchOutcome::Fulfilled(value) => Ok(value),
            BatchOutcome::Rejected(err) => Err(err),
        }
    }
}

impl<T> From<AnalyzerResult<T>> for BatchOutcome<T> {
    fn from(result: AnalyzerResult<T>) -> Self {
        match result {
            Ok(value) => BatchOutcome::Fulfilled(value),
            Err(err) => BatchOutcome::Rejected(err),
        }
    }
}

/// 每完成一批触发一次的进度信息
#[derive(Debug)]
pub struct BatchProgress<'a, T> {
    /// 截至目前的全部结果
    pub outcomes: &'a [BatchOutcome<T>],
    /// 本批结果
    pub batch: &'a [BatchOutcome<T>],
    pub processed: usize,
    pub total: usize,
}

/// 有界并发的分批分发器
#[derive(Debug, Clone, Copy)]
pub struct BatchDispatcher {
    batch_size: usize,
}

impl BatchDispatcher {
    pub fn new(batch_size: usize) -> AnalyzerResult<Self> {
        if batch_size == 0 {
            return Err(AnalyzerError::Configuration(
                "批大小必须大于0".to_string(),
            ));
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 处理 `total` 个条目需要的批数
    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size)
    }

    pub async fn dispatch<I, T, F, Fut>(
        &self,
        items: Vec<I>,
        cancellation: &CancellationToken,
        handler: F,
    ) -> Vec<BatchOutcome<T>>
    where
        F: Fn(I, CancellationToken) -> Fut,
        Fut: Future<Output = AnalyzerResult<T>>,
    {
        self.dispatch_with_progress(items, cancellation, handler, |_| {})
            .await
    }

    /// 按输入顺序返回每个条目的结果；被取消时只返回已完成批次的结果
    pub async fn dispatch_with_progress<I, T, F, Fut, P>(
        &self,
        items: Vec<I>,
        cancellation: &CancellationToken,
        handler: F,
        mut progress: P,
    ) -> Vec<BatchOutcome<T>>
    where
        F: Fn(I, CancellationToken) -> Fut,
        Fut: Future<Output = AnalyzerResult<T>>,
        P: FnMut(BatchProgress<'_, T>),
    {
        let total = items.len();
        let mut outcomes: Vec<BatchOutcome<T>> = Vec::with_capacity(total);
        let mut pending = items.into_iter();

        loop {
            if cancellation.is_cancelled() {
                debug!(
                    processed = outcomes.len(),
                    total, "检测到取消信号，停止分发后续批次"
                );
                break;
            }

            let batch: Vec<I> = pending.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }

            let start = outcomes.len();
            let results = join_all(
                batch
                    .into_iter()
                    .map(|item| handler(item, cancellation.clone())),
            )
            .await;
            outcomes.extend(results.into_iter().map(BatchOutcome::from));

            let batch_outcomes = &outcomes[start..];
            let rejected = batch_outcomes.iter().filter(|o| !o.is_fulfilled()).count();
            AnalyzerMetrics::subrequests_rejected(rejected);
            debug!(
                batch_len = batch_outcomes.len(),
                rejected,
                processed = outcomes.len(),
                total,
                "批次执行完成"
            );

            progress(BatchProgress {
                outcomes: &outcomes,
                batch: &outcomes[start..],
                processed: outcomes.len(),
                total,
            });
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(BatchDispatcher::new(0).is_err());
        assert_eq!(BatchDispatcher::new(3).unwrap().batch_count(7), 3);
        assert_eq!(BatchDispatcher::new(3).unwrap().batch_count(0), 0);
    }

    #[tokio::test]
    async fn test_preserves_input_order_with_uneven_latency() {
        let dispatcher = BatchDispatcher::new(4).unwrap();
        let token = CancellationToken::new();
        let items: Vec<u64> = (0..10).collect();

        let outcomes = dispatcher
            .dispatch(items, &token, |n, _| async move {
                // 后发先至，验证结果仍按输入排序
                tokio::time::sleep(Duration::from_millis(10 - n)).await;
                Ok(n * 2)
            })
            .await;

        let values: Vec<u64> = outcomes.iter().map(|o| *o.value().unwrap()).collect();
        assert_eq!(values, (0..10).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_rejection_does_not_halt_later_batches() {
        let dispatcher = BatchDispatcher::new(2).unwrap();
        let token = CancellationToken::new();

        let outcomes = dispatcher
            .dispatch(vec![1, 2, 3, 4, 5], &token, |n, _| async move {
                if n % 2 == 0 {
                    Err(AnalyzerError::external(format!("item {n} failed")))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes[0].is_fulfilled());
        assert!(!outcomes[1].is_fulfilled());
        assert!(outcomes[2].is_fulfilled());
        assert!(!outcomes[3].is_fulfilled());
        assert!(outcomes[4].is_fulfilled());
    }

    #[tokio::test]
    async fn test_batches_run_sequentially_with_bounded_concurrency() {
        let dispatcher = BatchDispatcher::new(3).unwrap();
        let token = CancellationToken::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let batches = Arc::new(Mutex::new(Vec::new()));

        let outcomes = {
            let batches = batches.clone();
            dispatcher
                .dispatch_with_progress(
                    (0..8).collect::<Vec<_>>(),
                    &token,
                    |n, _| {
                        let in_flight = in_flight.clone();
                        let peak = peak.clone();
                        async move {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok(n)
                        }
                    },
                    move |p| {
                        batches
                            .lock()
                            .unwrap()
                            .push((p.batch.len(), p.processed, p.total, p.outcomes.len()))
                    },
                )
                .await
        };

        assert_eq!(outcomes.len(), 8);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(
            *batches.lock().unwrap(),
            vec![(3, 3, 8, 3), (3, 6, 8, 6), (2, 8, 8, 8)]
        );
    }

    #[tokio::test]
    async fn test_cancellation_stops_at_batch_boundary() {
        let dispatcher = BatchDispatcher::new(2).unwrap();
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let outcomes = dispatcher
            .dispatch((0..10).collect::<Vec<_>>(), &token, |n, token| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // 第二批执行过程中发出取消，本批仍然完成
                    if n == 3 {
                        token.cancel();
                    }
                    Ok(n)
                }
            })
            .await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_already_cancelled_dispatches_nothing() {
        let dispatcher = BatchDispatcher::new(2).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let outcomes = dispatcher
            .dispatch(vec![1, 2, 3], &token, |n, _| async move { Ok(n) })
            .await;

        assert!(outcomes.is_empty());
    }
}
