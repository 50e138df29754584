#![warn(missing_docs)]

//! ScanCL runtime crate.
//!
//! Models a throughput device on host threads: ordered streams, aligned device memory, grids of
//! independently scheduled cubes with a grid-wide trap, and the cache-modified load primitive.

#[macro_use]
extern crate derive_new;

/// Compute client module.
pub mod client;
/// Global configuration.
pub mod config;
/// Kernel definition and execution context.
pub mod kernel;
/// Cache-modified loads.
pub mod load;
/// Memory management module.
pub mod memory_management;
/// Compute server module.
pub mod server;
/// Stream pool module.
pub mod stream;

mod compute;
mod feature_set;
mod logging;
mod runtime;

pub use feature_set::*;
pub use logging::*;
pub use runtime::*;
pub use scancl_common::benchmark;
pub use scancl_common::stream_id::StreamId;
