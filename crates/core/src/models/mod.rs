//! # 数据模型
//!
//! 需求分析服务的核心数据结构：任务、会话、对话消息、测试用例数据集以及队列视图。
//!
//! ## 状态流转
//!
//! ### 任务状态
//! ```text
//! Pending → Running → Done
//!    ↓         ↓
//! Cancelled  Cancelled / Error
//! ```
//!
//! ### 会话状态
//! ```text
//! Pending → Success | Error | Denied | Cancelled
//! ```
//!
//! 所有时间字段使用 `DateTime<Utc>`，对外序列化采用 camelCase 字段名。

pub mod job;
pub mod message;
pub mod queue_view;
pub mod result;
pub mod session;
pub mod test_case;

pub use job::*;
pub use message::*;
pub use queue_view::*;
pub use result::*;
pub use session::*;
pub use test_case::*;
