//! # Analyzer Testing Utils
//!
//! Shared testing utilities for the requirement analyzer workspace:
//! scripted mocks for the completion service and the tool runner, builders
//! for test data, and small async helpers.
//!
//! ```toml
//! [dev-dependencies]
//! analyzer-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
