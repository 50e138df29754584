/// Profiling config module.
pub mod profiling;
/// Scan defaults config module.
pub mod scan;
/// Streaming config module.
pub mod streaming;

mod base;
mod logger;

pub use base::*;
pub use logger::{LogCrateLevel, LogLevel, Logger, LoggerConfig};
