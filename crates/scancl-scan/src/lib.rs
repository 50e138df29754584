#![warn(missing_docs)]

//! Device-wide prefix scan.
//!
//! A single-pass scan over an arbitrary associative operator: the input is cut in tiles, each
//! tile is scanned by one cube, and tiles chain their prefixes through status records published
//! in a caller-provided scratch buffer (decoupled look-back).
//!
//! The entry point is [DeviceScan::scan], which follows a two-call protocol: a first call without
//! scratch reports the scratch size, a second call with the scratch runs the scan.

#[macro_use]
extern crate derive_new;

mod agent;
mod config;
mod dispatch;
mod error;

/// Operators the scan can fold with.
pub mod instructions;
/// Tile status records shared by the tiles of a scan.
pub mod tile_status;

pub use config::*;
pub use dispatch::*;
pub use error::*;
pub use instructions::ScanInstruction;

#[cfg(feature = "export_tests")]
pub mod tests;
