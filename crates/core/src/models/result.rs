use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::Tool;

/// 工具执行的聚合输出：成功数据与并行的错误列表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    pub data: serde_json::Value,
    pub errors: Vec<String>,
}

impl ToolOutput {
    pub fn new(data: serde_json::Value, errors: Vec<String>) -> Self {
        Self { data, errors }
    }
}

/// 已完成任务的结果记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedResult {
    pub requested_at: DateTime<Utc>,
    pub session_id: String,
    pub tool: Tool,
    pub data: serde_json::Value,
    pub errors: Vec<String>,
}
