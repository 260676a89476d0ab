use thiserror::Error;

/// 需求分析服务错误类型定义
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("请求校验失败: {0}")]
    Validation(String),

    #[error("外部服务错误: {message}")]
    ExternalService {
        message: String,
        status: Option<u16>,
    },

    #[error("补全服务未返回任何结果")]
    NoCompletionChoices,

    #[error("模型回答解析失败: {0}")]
    Parse(String),

    #[error("需求不可测试: {0}")]
    NotTestable(String),

    #[error("任务已取消")]
    Cancelled,

    #[error("请求超时: {0}s")]
    Timeout(u64),

    #[error("会话未找到: {id}")]
    SessionNotFound { id: String },

    #[error("相似度计算Worker失败: {0}")]
    WorkerFailed(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl AnalyzerError {
    pub fn external(message: impl Into<String>) -> Self {
        Self::ExternalService {
            message: message.into(),
            status: None,
        }
    }

    pub fn external_with_status(message: impl Into<String>, status: u16) -> Self {
        Self::ExternalService {
            message: message.into(),
            status: Some(status),
        }
    }

    /// 是否为可重试的瞬时错误（超时、网络、限流、5xx）
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalyzerError::Timeout(_) | AnalyzerError::Network(_) => true,
            AnalyzerError::ExternalService {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// 统一的Result类型
pub type AnalyzerResult<T> = std::result::Result<T, AnalyzerError>;
