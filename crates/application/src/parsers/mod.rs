//! 模型回答解析
//!
//! 模型的文本输出格式就是本系统与补全服务之间的协议，每种格式都有独立的语法：
//!
//! - [`consistency`]：`Issues (a - b): message`，可重复出现
//! - [`proposals`]：`Title:` / `Description:` / `Output defined:` 记录，
//!   多条记录以 `Test Case <n>:` 分隔
//! - [`disambiguation`]：每行 `{index}: {id|None}`

pub mod consistency;
pub mod disambiguation;
pub mod proposals;

pub use consistency::{parse_pair_issues, PairIssue};
pub use disambiguation::parse_selections;
pub use proposals::parse_proposals;
