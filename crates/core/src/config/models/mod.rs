pub mod app_config;
pub mod completion;
pub mod observability;
pub mod orchestration;
pub mod scheduler;

// Re-export main types for easier imports
pub use app_config::AppConfig;
pub use completion::CompletionConfig;
pub use observability::ObservabilityConfig;
pub use orchestration::{ConsistencyConfig, IndividualConfig, TestCaseConfig};
pub use scheduler::SchedulerConfig;
