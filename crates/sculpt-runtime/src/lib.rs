//! SCULPT Runtime - Session orchestration
//!
//! This crate ties the pipeline together:
//! 1. Configuration file (JSON, humantime durations)
//! 2. Tracing subscriber setup
//! 3. Per-object session registry
//! 4. Session context: capture, reconstruct, edit, render, export

pub mod config;
pub mod telemetry;
pub mod registry;
pub mod session;

pub use config::*;
pub use telemetry::*;
pub use registry::*;
pub use session::*;
