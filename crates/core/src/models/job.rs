use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::test_case::TestCaseDataset;
use crate::errors::AnalyzerError;

/// 任务所请求的AI工具类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Tool {
    #[serde(rename = "consistency")]
    Consistency,
    #[serde(rename = "translate")]
    Translate,
    #[serde(rename = "toxic")]
    Toxic,
    #[serde(rename = "quality")]
    Quality,
    #[serde(rename = "test-cases-generation")]
    TestCasesGeneration,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Consistency => "consistency",
            Tool::Translate => "translate",
            Tool::Toxic => "toxic",
            Tool::Quality => "quality",
            Tool::TestCasesGeneration => "test-cases-generation",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consistency" => Ok(Tool::Consistency),
            "translate" => Ok(Tool::Translate),
            "toxic" => Ok(Tool::Toxic),
            "quality" => Ok(Tool::Quality),
            "test-cases-generation" => Ok(Tool::TestCasesGeneration),
            _ => Err(AnalyzerError::Validation(format!("未知的工具类型: {s}"))),
        }
    }
}

/// 队列中任务的状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Cancelled,
    Error,
}

/// 一条需求条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub primary_text: String,
    #[serde(default)]
    pub artifact_type: Option<String>,
    #[serde(default)]
    pub test_level: Option<String>,
}

impl Artifact {
    pub fn new(id: impl Into<String>, primary_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            primary_text: primary_text.into(),
            artifact_type: None,
            test_level: None,
        }
    }
}

/// 任务负载
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub data_for_test_cases: Option<TestCaseDataset>,
    /// 一致性检查的相似分组（条目ID列表），为空时全部条目视为一组
    #[serde(default)]
    pub similarity_groups: Option<Vec<Vec<String>>>,
}

/// 客户端提交的任务请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[serde(default)]
    pub client_id: String,
    pub tool: Tool,
    pub data: JobData,
}

/// 任务身份：会话ID + 客户端ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub session_id: String,
    pub client_id: String,
}

impl JobKey {
    pub fn new(session_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            client_id: client_id.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.session_id, self.client_id)
    }
}

/// 排队中的任务
///
/// 任务在 pending/running 期间由调度队列独占，完成后结果转交给结果存储。
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub client_id: String,
    pub tool: Tool,
    pub payload: JobData,
    pub status: JobStatus,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub cancellation: Option<CancellationToken>,
}

impl Job {
    pub fn new(session_id: impl Into<String>, request: JobRequest) -> Self {
        Self {
            id: session_id.into(),
            client_id: request.client_id,
            tool: request.tool,
            payload: request.data,
            status: JobStatus::Pending,
            progress: 0.0,
            created_at: Utc::now(),
            cancellation: None,
        }
    }

    pub fn key(&self) -> JobKey {
        JobKey::new(self.id.clone(), self.client_id.clone())
    }

    pub fn matches(&self, session_id: &str, client_id: &str) -> bool {
        self.id == session_id && self.client_id == client_id
    }

    pub fn artifact_count(&self) -> usize {
        self.payload.artifacts.len()
    }
}

/// 提交任务后的回执
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub session_id: String,
    pub client_id: String,
    pub tool: Tool,
    pub queue_length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_serde_names() {
        let tool: Tool = serde_json::from_str("\"test-cases-generation\"").unwrap();
        assert_eq!(tool, Tool::TestCasesGeneration);
        assert_eq!(serde_json::to_string(&Tool::Toxic).unwrap(), "\"toxic\"");
        assert_eq!("quality".parse::<Tool>().unwrap(), Tool::Quality);
        assert!("summarize".parse::<Tool>().is_err());
    }

    #[test]
    fn test_job_request_from_client_json() {
        let raw = r#"{
            "clientId": "client-1",
            "tool": "consistency",
            "data": {
                "artifacts": [{"id": "1", "primaryText": "The lamp shall turn on."}],
                "prompt": "Check:",
                "role": "You are a reviewer"
            }
        }"#;
        let request: JobRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.client_id, "client-1");
        assert_eq!(request.data.artifacts.len(), 1);
        assert!(request.data.data_for_test_cases.is_none());

        let job = Job::new("session-1", request);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0.0);
        assert!(job.matches("session-1", "client-1"));
        assert!(!job.matches("session-1", "client-2"));
        assert_eq!(job.artifact_count(), 1);
    }
}
