pub mod completion;
pub mod memory;

pub use completion::*;
pub use memory::*;
