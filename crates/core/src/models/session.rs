use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::Tool;

/// 会话状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Success,
    Error,
    Denied,
    Cancelled,
}

impl SessionStatus {
    /// 进入终止状态时需要记录完成时间和耗时
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }
}

/// 一次提交对应的会话记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub client_id: String,
    pub tool: Tool,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub origin: Option<String>,
    pub message: Option<String>,
}

impl Session {
    pub fn is_cancelled(&self) -> bool {
        self.status == SessionStatus::Cancelled
    }
}

/// 创建会话参数
#[derive(Debug, Clone)]
pub struct NewSession {
    pub client_id: String,
    pub tool: Tool,
    pub status: SessionStatus,
    pub origin: Option<String>,
}

impl NewSession {
    pub fn pending(client_id: impl Into<String>, tool: Tool) -> Self {
        Self {
            client_id: client_id.into(),
            tool,
            status: SessionStatus::Pending,
            origin: None,
        }
    }
}

/// 会话的部分更新，系统字段（id、创建时间等）不可覆盖
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub status: Option<SessionStatus>,
    pub message: Option<String>,
    pub origin: Option<String>,
}

impl SessionUpdate {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSort {
    CreatedAsc,
    CreatedDesc,
    DurationAsc,
    DurationDesc,
}

/// 会话查询条件
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    pub client_id: Option<String>,
    pub statuses: Option<Vec<SessionStatus>>,
    pub tool: Option<Tool>,
    pub sort: Option<SessionSort>,
}
