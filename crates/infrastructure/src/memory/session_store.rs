use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use analyzer_core::{
    AnalyzerResult, NewSession, Session, SessionQuery, SessionSort, SessionStore, SessionUpdate,
};

/// 内存会话存储
///
/// 进入终止状态（success / error / denied / cancelled）时记录完成时间和耗时。
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn compare(sort: SessionSort, a: &Session, b: &Session) -> Ordering {
    match sort {
        SessionSort::CreatedAsc => a.created_at.cmp(&b.created_at),
        SessionSort::CreatedDesc => b.created_at.cmp(&a.created_at),
        // 未完成的会话没有耗时，排在最后
        SessionSort::DurationAsc => match (a.duration_ms, b.duration_ms) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SessionSort::DurationDesc => match (a.duration_ms, b.duration_ms) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, session: NewSession) -> AnalyzerResult<Session> {
        let now = Utc::now();
        let mut record = Session {
            id: Uuid::new_v4().to_string(),
            client_id: session.client_id,
            tool: session.tool,
            status: session.status,
            created_at: now,
            finished_at: None,
            duration_ms: None,
            origin: session.origin,
            message: None,
        };
        if record.status.is_terminal() {
            record.finished_at = Some(now);
            record.duration_ms = Some(0);
        }

        self.sessions
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        debug!("创建会话 {} (客户端: {})", record.id, record.client_id);
        Ok(record)
    }

    async fn get_session(&self, session_id: &str) -> AnalyzerResult<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> AnalyzerResult<Option<Session>> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(None);
        };

        if let Some(message) = update.message {
            session.message = Some(message);
        }
        if let Some(origin) = update.origin {
            session.origin = Some(origin);
        }
        if let Some(status) = update.status {
            session.status = status;
            if status.is_terminal() {
                let finished_at = Utc::now();
                session.finished_at = Some(finished_at);
                session.duration_ms = Some((finished_at - session.created_at).num_milliseconds());
            }
            debug!("会话 {} 状态更新为 {:?}", session_id, status);
        }

        Ok(Some(session.clone()))
    }

    async fn delete_session(&self, session_id: &str) -> AnalyzerResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn list_sessions(&self, query: &SessionQuery) -> AnalyzerResult<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut matched: Vec<Session> = sessions
            .values()
            .filter(|s| {
                query
                    .client_id
                    .as_ref()
                    .map_or(true, |client_id| &s.client_id == client_id)
            })
            .filter(|s| {
                query
                    .statuses
                    .as_ref()
                    .map_or(true, |statuses| statuses.contains(&s.status))
            })
            .filter(|s| query.tool.map_or(true, |tool| s.tool == tool))
            .cloned()
            .collect();

        let sort = query.sort.unwrap_or(SessionSort::CreatedAsc);
        matched.sort_by(|a, b| compare(sort, a, b));
        Ok(matched)
    }
}
