use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use analyzer_core::{AnalyzerError, AnalyzerMetrics, AnalyzerResult};

use crate::candidates::CandidateMatch;
use crate::index::ExistingTestCaseIndex;
use crate::similarity::{score_chunk, ProposalQuery, SimilarityParams};

/// 固定并发上限的阻塞任务池
///
/// `submit` 返回一个 future，被轮询时才占用许可并在阻塞线程上执行任务。
#[derive(Debug, Clone)]
pub struct TaskPool {
    permits: Arc<Semaphore>,
    max_workers: usize,
}

impl TaskPool {
    /// `max_workers` 为 None 时取可用的硬件并行度
    pub fn new(max_workers: Option<usize>) -> Self {
        let max_workers = max_workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
            .max(1);

        Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn submit<F, R>(&self, task: F) -> impl Future<Output = AnalyzerResult<R>> + Send + 'static
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| AnalyzerError::WorkerFailed(e.to_string()))?;
            tokio::task::spawn_blocking(task)
                .await
                .map_err(|e| AnalyzerError::WorkerFailed(e.to_string()))
        }
    }
}

/// 一次相似度匹配的汇总：候选序号 -> 排名列表，以及失败分片的错误描述
#[derive(Debug, Default)]
pub struct SimilarityReport {
    pub matches: HashMap<usize, Vec<CandidateMatch>>,
    pub errors: Vec<String>,
}

/// 分片并行的相似度匹配池
#[derive(Debug, Clone)]
pub struct SimilarityWorkerPool {
    pool: TaskPool,
    chunk_size: usize,
    params: SimilarityParams,
}

impl SimilarityWorkerPool {
    pub fn new(pool: TaskPool, chunk_size: usize, params: SimilarityParams) -> Self {
        Self {
            pool,
            chunk_size: chunk_size.max(1),
            params,
        }
    }

    /// 按 `chunk_size` 切片，每波最多 `max_workers` 个分片同时执行，
    /// 一波全部结束后才开始下一波；取消信号在波之间检查。
    pub async fn match_proposals(
        &self,
        queries: Vec<ProposalQuery>,
        index: Arc<ExistingTestCaseIndex>,
        cancellation: &CancellationToken,
    ) -> SimilarityReport {
        let mut report = SimilarityReport::default();
        if queries.is_empty() || index.is_empty() {
            return report;
        }

        let chunks: Vec<Vec<ProposalQuery>> = queries
            .chunks(self.chunk_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        let total_chunks = chunks.len();
        let mut pending = chunks.into_iter().enumerate();

        loop {
            if cancellation.is_cancelled() {
                debug!("相似度匹配已取消，跳过剩余分片");
                break;
            }

            let wave: Vec<(usize, Vec<ProposalQuery>)> =
                pending.by_ref().take(self.pool.max_workers()).collect();
            if wave.is_empty() {
                break;
            }

            let wave_len = wave.len();
            let tasks = wave.into_iter().map(|(chunk_index, chunk)| {
                let index = Arc::clone(&index);
                let params = self.params;
                let task = self
                    .pool
                    .submit(move || score_chunk(&chunk, &index, params));
                async move { (chunk_index, task.await) }
            });

            for (chunk_index, outcome) in join_all(tasks).await {
                match outcome {
                    Ok(groups) => report.matches.extend(groups),
                    Err(e) => {
                        warn!("相似度分片 {} 计算失败: {}", chunk_index, e);
                        report
                            .errors
                            .push(format!("相似度分片 {chunk_index} 计算失败: {e}"));
                    }
                }
            }

            AnalyzerMetrics::similarity_chunks(wave_len);
            debug!(wave_len, total_chunks, "相似度分片批次完成");
        }

        report
    }
}
