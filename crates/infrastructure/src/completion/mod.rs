//! 外部文本补全服务客户端

pub mod openai;

pub use openai::{parse_choices, OpenAiCompletionClient, Provider};
