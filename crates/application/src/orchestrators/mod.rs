//! 各工具的编排流程
//!
//! 编排器把一个任务拆成若干补全请求，经 [`analyzer_dispatcher::BatchDispatcher`]
//! 分批发出，并把成功结果与被拒绝的子请求分别汇总。单个子请求失败不会中断任务。

pub mod consistency;
pub mod individual;
pub mod test_cases;

pub use consistency::{build_comparison_units, ComparisonUnit, ConsistencyOrchestrator};
pub use individual::IndividualOrchestrator;
pub use test_cases::{scan_signals, SignalContext, TestCaseOrchestrator, TestStrategy};
