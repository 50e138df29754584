#![warn(missing_docs)]

//! Common utilities shared by the ScanCL crates.

#[macro_use]
extern crate derive_new;

/// Backtrace captured alongside runtime errors.
pub mod backtrace;

/// Benchmark utilities.
pub mod benchmark;

/// Random number generation used by problem generators.
pub mod rand;

/// Stream id related utilities.
pub mod stream_id;
