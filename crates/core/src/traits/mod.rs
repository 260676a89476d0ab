pub mod completion;
pub mod result_store;
pub mod runner;
pub mod session_store;

pub use completion::*;
pub use result_store::*;
pub use runner::*;
pub use session_store::*;
