pub mod app;

pub use app::{load_requests, Application};
