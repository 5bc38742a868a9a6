//! dumpstat common library
//!
//! Shared plumbing for the dumpstat workspace members:
//!
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` environment variables
//! - **Units**: human-readable sizes and percentages for progress lines
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod logging;
pub mod units;

pub use logging::{init_logging, LogConfig, LogGuard};
