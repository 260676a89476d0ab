//! 需求分析任务的应用层
//!
//! - [`JobService`]：提交、取消、队列与结果查询
//! - [`AnalyzerToolRunner`]：按工具类型分派到各编排流程
//! - [`orchestrators`]：一致性检查、逐条检查、测试用例生成与匹配
//! - [`parsers`]：模型回答的文本语法解析
//! - [`CompletionCaller`]：补全调用的取消、超时与重试

pub mod completion;
pub mod orchestrators;
pub mod parsers;
pub mod runner;
pub mod service;

pub use completion::CompletionCaller;
pub use orchestrators::{
    build_comparison_units, scan_signals, ComparisonUnit, ConsistencyOrchestrator,
    IndividualOrchestrator, SignalContext, TestCaseOrchestrator, TestStrategy,
};
pub use runner::AnalyzerToolRunner;
pub use service::{validate_request, BusyStatus, JobService};
