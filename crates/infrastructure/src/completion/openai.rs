use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use analyzer_core::{
    config::CompletionConfig, AnalyzerError, AnalyzerResult, ChatMessage, CompletionService,
};

/// 补全服务提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Azure,
}

/// OpenAI / Azure OpenAI chat-completions 客户端
pub struct OpenAiCompletionClient {
    client: reqwest::Client,
    provider: Provider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    api_version: String,
    timeout_seconds: u64,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompletionClient {
    pub fn new(config: &CompletionConfig) -> AnalyzerResult<Self> {
        let provider = match config.provider.as_str() {
            "openai" => Provider::OpenAi,
            "azure" => Provider::Azure,
            other => {
                return Err(AnalyzerError::Configuration(format!(
                    "不支持的补全服务提供方: {other}"
                )))
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AnalyzerError::Configuration(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            provider,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            timeout_seconds: config.request_timeout_seconds,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Azure 以部署名定位模型，OpenAI 在请求体中携带模型名
    pub fn completions_url(&self) -> String {
        match self.provider {
            Provider::OpenAi => format!("{}/chat/completions", self.endpoint),
            Provider::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.endpoint, self.model, self.api_version
            ),
        }
    }

    fn api_key(&self) -> AnalyzerResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AnalyzerError::Configuration("缺少补全服务的API Key".to_string()))
    }

    fn map_transport_error(&self, error: reqwest::Error) -> AnalyzerError {
        if error.is_timeout() {
            AnalyzerError::Timeout(self.timeout_seconds)
        } else {
            AnalyzerError::Network(error.to_string())
        }
    }
}

/// 解析 chat-completions 响应体；没有任何候选时返回 [`AnalyzerError::NoCompletionChoices`]
pub fn parse_choices(body: &str) -> AnalyzerResult<Vec<String>> {
    let response: ChatCompletionResponse = serde_json::from_str(body)?;
    let choices: Vec<String> = response
        .choices
        .unwrap_or_default()
        .into_iter()
        .filter_map(|choice| choice.message.content)
        .collect();

    if choices.is_empty() {
        return Err(AnalyzerError::NoCompletionChoices);
    }
    Ok(choices)
}

#[async_trait]
impl CompletionService for OpenAiCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> AnalyzerResult<Vec<String>> {
        let api_key = self.api_key()?;
        let url = self.completions_url();

        let body = ChatCompletionRequest {
            model: match self.provider {
                Provider::OpenAi => Some(self.model.as_str()),
                Provider::Azure => None,
            },
            messages,
            temperature,
        };

        let request = self.client.post(&url).json(&body);
        let request = match self.provider {
            Provider::OpenAi => request.bearer_auth(api_key),
            Provider::Azure => request.header("api-key", api_key),
        };

        debug!(messages = messages.len(), "发送补全请求");
        let response = request.send().await.map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_transport_error(e))?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "补全服务返回错误状态");
            return Err(AnalyzerError::external_with_status(
                format!("补全服务返回错误 ({status}): {text}"),
                status.as_u16(),
            ));
        }

        parse_choices(&text)
    }
}
