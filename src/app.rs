use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use analyzer_application::JobService;
use analyzer_core::{AppConfig, CompletedResult, CompletionService, JobRequest, SubmitReceipt};
use analyzer_infrastructure::{InMemoryResultStore, InMemorySessionStore, OpenAiCompletionClient};

/// 任务文件内容：单个请求或请求数组
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JobFile {
    Many(Vec<JobRequest>),
    One(Box<JobRequest>),
}

/// 从 JSON 文件读取任务请求
pub fn load_requests(path: &Path) -> Result<Vec<JobRequest>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("读取任务文件失败: {}", path.display()))?;
    let file: JobFile = serde_json::from_str(&raw)
        .with_context(|| format!("解析任务文件失败: {}", path.display()))?;

    Ok(match file {
        JobFile::Many(requests) => requests,
        JobFile::One(request) => vec![*request],
    })
}

/// 命令行应用：组装服务、提交任务并收集结果
pub struct Application {
    service: JobService,
}

impl Application {
    /// 使用 HTTP 补全客户端和内存存储创建应用
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = OpenAiCompletionClient::new(&config.completion)
            .context("创建补全服务客户端失败")?;
        Ok(Self::with_completion(config, Arc::new(client)))
    }

    pub fn with_completion(config: &AppConfig, completion: Arc<dyn CompletionService>) -> Self {
        let service = JobService::from_config(
            config,
            completion,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryResultStore::new()),
        );
        Self { service }
    }

    pub fn service(&self) -> &JobService {
        &self.service
    }

    /// 提交全部请求并等待调度器空闲；`shutdown` 触发时取消未完成的任务。
    /// 返回客户端ID -> 结果列表。
    pub async fn run(
        &self,
        requests: Vec<JobRequest>,
        shutdown: CancellationToken,
    ) -> Result<BTreeMap<String, Vec<CompletedResult>>> {
        let mut receipts: Vec<SubmitReceipt> = Vec::with_capacity(requests.len());
        for request in requests {
            let client_id = request.client_id.clone();
            match self.service.submit(request).await {
                Ok(receipt) => receipts.push(receipt),
                Err(e) => warn!("客户端 {} 的任务提交失败: {}", client_id, e),
            }
        }
        info!("已提交 {} 个任务", receipts.len());

        tokio::select! {
            _ = self.service.wait_until_idle() => {}
            _ = shutdown.cancelled() => {
                warn!("收到关闭信号，取消未完成的任务");
                for receipt in &receipts {
                    if let Err(e) = self.service.cancel(&receipt.session_id, &receipt.client_id).await {
                        error!("取消会话 {} 失败: {}", receipt.session_id, e);
                    }
                }
                self.service.wait_until_idle().await;
            }
        }

        let mut results = BTreeMap::new();
        for receipt in &receipts {
            if results.contains_key(&receipt.client_id) {
                continue;
            }
            let client_results = self.service.results(&receipt.client_id, None).await?;
            results.insert(receipt.client_id.clone(), client_results);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_single_and_many_requests() {
        let mut single = tempfile::NamedTempFile::new().unwrap();
        write!(
            single,
            r#"{{"clientId": "c1", "tool": "toxic", "data": {{"artifacts": [{{"id": "1", "primaryText": "x"}}], "prompt": "p"}}}}"#
        )
        .unwrap();
        let requests = load_requests(single.path()).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].client_id, "c1");

        let mut many = tempfile::NamedTempFile::new().unwrap();
        write!(
            many,
            r#"[{{"clientId": "c1", "tool": "quality", "data": {{"artifacts": []}}}},
                {{"clientId": "c2", "tool": "consistency", "data": {{"artifacts": []}}}}]"#
        )
        .unwrap();
        assert_eq!(load_requests(many.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tool": "summarize"}}"#).unwrap();
        assert!(load_requests(file.path()).is_err());
        assert!(load_requests(Path::new("/nonexistent/jobs.json")).is_err());
    }
}
