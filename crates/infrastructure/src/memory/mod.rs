//! 会话与结果的内存存储实现
//!
//! 进程内 `RwLock<HashMap>` 存储，进程退出后数据即丢失。

pub mod result_store;
pub mod session_store;

pub use result_store::InMemoryResultStore;
pub use session_store::InMemorySessionStore;
