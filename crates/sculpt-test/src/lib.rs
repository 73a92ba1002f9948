//! SCULPT Test Harness - Fakes and fault injection for pipeline validation
//!
//! This crate provides:
//! - Scripted capture devices and oracles
//! - Seeded fault injection (timeouts, blur, rate limits)
//! - Scene builders
//! - Session harness with zero-delay retry policies

pub mod device;
pub mod oracle;
pub mod scenes;
pub mod harness;

pub use device::*;
pub use oracle::*;
pub use scenes::*;
pub use harness::*;
