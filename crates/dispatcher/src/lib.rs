//! 任务调度与分批分发
//!
//! - [`BatchDispatcher`]：有界并发的分批执行器，批间串行、批内并发，在批边界检查取消
//! - [`RequestQueue`]：等待任务的 FIFO 与固定容量的执行槽
//! - [`ServiceState`]：空闲/忙碌状态与活跃任务集合
//! - [`JobScheduler`]：按并发上限准入任务，驱动工具执行并在结束后继续调度

pub mod batch;
pub mod queue;
pub mod scheduler;
pub mod state;

pub use batch::{BatchDispatcher, BatchOutcome, BatchProgress};
pub use queue::RequestQueue;
pub use scheduler::JobScheduler;
pub use state::{ServiceMode, ServiceState};
