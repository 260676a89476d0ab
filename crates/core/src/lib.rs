pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use errors::*;
pub use logging::init_logging;
pub use metrics::AnalyzerMetrics;
pub use models::*;
pub use traits::*;
