use async_trait::async_trait;

use crate::{
    models::{NewSession, Session, SessionQuery, SessionUpdate},
    AnalyzerResult,
};

/// 会话存储抽象接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 创建会话并生成唯一ID
    async fn create_session(&self, session: NewSession) -> AnalyzerResult<Session>;

    /// 获取会话
    async fn get_session(&self, session_id: &str) -> AnalyzerResult<Option<Session>>;

    /// 部分更新会话；进入终止状态时记录完成时间和耗时。会话不存在时返回 None
    async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> AnalyzerResult<Option<Session>>;

    /// 删除会话
    async fn delete_session(&self, session_id: &str) -> AnalyzerResult<()>;

    /// 按条件查询会话
    async fn list_sessions(&self, query: &SessionQuery) -> AnalyzerResult<Vec<Session>>;
}
