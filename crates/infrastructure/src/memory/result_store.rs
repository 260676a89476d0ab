use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use analyzer_core::{AnalyzerResult, CompletedResult, ResultStore, Tool};

/// 按客户端分组的内存结果存储
#[derive(Debug, Clone, Default)]
pub struct InMemoryResultStore {
    results: Arc<RwLock<HashMap<String, Vec<CompletedResult>>>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有有结果的客户端ID
    pub async fn client_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.results.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn add_result(&self, client_id: &str, result: CompletedResult) -> AnalyzerResult<()> {
        debug!("保存会话 {} 的结果 (客户端: {})", result.session_id, client_id);
        self.results
            .write()
            .await
            .entry(client_id.to_string())
            .or_default()
            .push(result);
        Ok(())
    }

    async fn results_for_client(
        &self,
        client_id: &str,
        tool: Option<Tool>,
    ) -> AnalyzerResult<Vec<CompletedResult>> {
        let results = self.results.read().await;
        Ok(results
            .get(client_id)
            .map(|list| {
                list.iter()
                    .filter(|r| tool.map_or(true, |tool| r.tool == tool))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn remove_result(&self, client_id: &str, session_id: &str) -> AnalyzerResult<bool> {
        let mut results = self.results.write().await;
        let Some(list) = results.get_mut(client_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|r| r.session_id != session_id);
        Ok(list.len() != before)
    }
}
