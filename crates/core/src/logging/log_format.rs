use std::str::FromStr;

/// 日志输出格式：`json` 每行一条结构化记录，`pretty` 为多行可读格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = crate::errors::AnalyzerError;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(crate::errors::AnalyzerError::Configuration(format!(
                "不支持的日志格式: {format}"
            ))),
        }
    }
}
