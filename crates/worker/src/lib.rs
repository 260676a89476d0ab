//! 相似度匹配 Worker 池
//!
//! 将候选测试用例与已有测试用例库做基于词集合的 Jaccard 相似度比较，
//! 为每个候选保留按排名排序、容量有限的匹配列表。计算在阻塞线程池上并行执行，
//! 各分片只持有自己的输入和只读索引的 `Arc`，不共享可变状态。

pub mod candidates;
pub mod index;
pub mod pool;
pub mod similarity;
pub mod tokenize;

pub use candidates::{CandidateMatch, RankedCandidates};
pub use index::{ExistingTestCaseIndex, IndexedTestCase};
pub use pool::{SimilarityReport, SimilarityWorkerPool, TaskPool};
pub use similarity::{score_chunk, ProposalQuery, SimilarityParams};
