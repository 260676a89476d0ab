use serde::{Deserialize, Serialize};

fn default_provider() -> String {
    "openai".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_version() -> String {
    "2024-02-01".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

/// 外部补全服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// "openai" 或 "azure"
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// OpenAI 模型名，或 Azure 部署名
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            api_version: default_api_version(),
            temperature: 0.0,
            request_timeout_seconds: default_request_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl CompletionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_providers = ["openai", "azure"];
        if !valid_providers.contains(&self.provider.as_str()) {
            return Err(anyhow::anyhow!(
                "无效的补全服务提供方: {}，支持: {:?}",
                self.provider,
                valid_providers
            ));
        }

        if self.endpoint.is_empty() {
            return Err(anyhow::anyhow!("补全服务地址不能为空"));
        }

        if self.model.is_empty() {
            return Err(anyhow::anyhow!("模型或部署名不能为空"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow::anyhow!("temperature 必须在 0.0 到 2.0 之间"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("请求超时时间必须大于0"));
        }

        Ok(())
    }
}
