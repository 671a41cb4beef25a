//! Command layer for the `pregen` binary.
//!
//! ## Structure
//!
//! - [`config`] - CLI / environment arguments and their validated form.
//! - [`simulated`] - in-memory generation backend with random latency.
//! - [`telemetry`] - log subscriber setup.

pub mod config;
pub mod simulated;
pub mod telemetry;
