//! 调度与分发指标
//!
//! 通过 `metrics` 门面记录，未安装 recorder 时为空操作。

use ::metrics::{counter, gauge};

use crate::models::Tool;

pub const JOBS_SUBMITTED: &str = "analyzer_jobs_submitted_total";
pub const JOBS_ADMITTED: &str = "analyzer_jobs_admitted_total";
pub const JOBS_COMPLETED: &str = "analyzer_jobs_completed_total";
pub const JOBS_CANCELLED: &str = "analyzer_jobs_cancelled_total";
pub const JOBS_FAILED: &str = "analyzer_jobs_failed_total";
pub const QUEUE_DEPTH: &str = "analyzer_queue_depth";
pub const SUBREQUESTS_REJECTED: &str = "analyzer_subrequests_rejected_total";
pub const SIMILARITY_CHUNKS: &str = "analyzer_similarity_chunks_total";

pub struct AnalyzerMetrics;

impl AnalyzerMetrics {
    pub fn job_submitted(tool: Tool) {
        counter!(JOBS_SUBMITTED, "tool" => tool.as_str()).increment(1);
    }

    pub fn job_admitted(tool: Tool) {
        counter!(JOBS_ADMITTED, "tool" => tool.as_str()).increment(1);
    }

    pub fn job_completed(tool: Tool) {
        counter!(JOBS_COMPLETED, "tool" => tool.as_str()).increment(1);
    }

    pub fn job_cancelled(tool: Tool) {
        counter!(JOBS_CANCELLED, "tool" => tool.as_str()).increment(1);
    }

    pub fn job_failed(tool: Tool) {
        counter!(JOBS_FAILED, "tool" => tool.as_str()).increment(1);
    }

    pub fn queue_depth(depth: usize) {
        gauge!(QUEUE_DEPTH).set(depth as f64);
    }

    pub fn subrequests_rejected(count: usize) {
        if count > 0 {
            counter!(SUBREQUESTS_REJECTED).increment(count as u64);
        }
    }

    pub fn similarity_chunks(count: usize) {
        counter!(SIMILARITY_CHUNKS).increment(count as u64);
    }
}
