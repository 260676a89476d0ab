use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::{Job, JobStatus, Tool};

/// 队列查询过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueFilter {
    #[serde(default)]
    pub tool: Option<Tool>,
    #[serde(default)]
    pub client_id: Option<String>,
    /// 仅返回运行中/已完成任务的进度视图
    #[serde(default)]
    pub for_progress: bool,
}

impl QueueFilter {
    pub fn accepts(&self, job: &Job) -> bool {
        if let Some(tool) = self.tool {
            if job.tool != tool {
                return false;
            }
        }
        if let Some(client_id) = &self.client_id {
            if &job.client_id != client_id {
                return false;
            }
        }
        if self.for_progress {
            return matches!(job.status, JobStatus::Running | JobStatus::Done);
        }
        true
    }
}

/// 队列条目的完整视图
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryView {
    pub requested_at: DateTime<Utc>,
    pub client_id: String,
    pub session_id: String,
    pub tool: Tool,
    pub artifact_count: usize,
    pub status: JobStatus,
    pub progress: f64,
}

/// 仅含进度的队列视图
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntryView {
    pub client_id: String,
    pub session_id: String,
    pub tool: Tool,
    pub status: JobStatus,
    pub progress: f64,
}

/// 队列查询结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum QueueView {
    Full(Vec<QueueEntryView>),
    Progress(Vec<ProgressEntryView>),
}

impl QueueView {
    pub fn len(&self) -> usize {
        match self {
            QueueView::Full(entries) => entries.len(),
            QueueView::Progress(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&Job> for QueueEntryView {
    fn from(job: &Job) -> Self {
        Self {
            requested_at: job.created_at,
            client_id: job.client_id.clone(),
            session_id: job.id.clone(),
            tool: job.tool,
            artifact_count: job.artifact_count(),
            status: job.status,
            progress: job.progress,
        }
    }
}

impl From<&Job> for ProgressEntryView {
    fn from(job: &Job) -> Self {
        Self {
            client_id: job.client_id.clone(),
            session_id: job.id.clone(),
            tool: job.tool,
            status: job.status,
            progress: job.progress,
        }
    }
}
