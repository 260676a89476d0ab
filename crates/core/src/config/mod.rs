//! 配置管理
//!
//! 配置按以下优先级合并（后者覆盖前者）：
//!
//! 1. 内置默认值
//! 2. TOML 配置文件（显式路径，或 `config/analyzer.toml`、`analyzer.toml`）
//! 3. 环境变量，前缀 `ANALYZER_`，嵌套字段以 `__` 分隔
//!
//! ```rust,no_run
//! use analyzer_core::config::AppConfig;
//!
//! // ANALYZER_SCHEDULER__MAX_CONCURRENT_JOBS=2 会覆盖文件中的值
//! let config = AppConfig::load(Some("config/analyzer.toml")).unwrap();
//! assert!(config.scheduler.max_concurrent_jobs >= 1);
//! ```

pub mod models;

#[cfg(test)]
mod tests;

pub use models::{
    AppConfig, CompletionConfig, ConsistencyConfig, IndividualConfig, ObservabilityConfig,
    SchedulerConfig, TestCaseConfig,
};
