//! SCULPT Capture - Angle-indexed image acquisition
//!
//! This crate drives the turntable camera:
//! - Device contract (prepare, capture one angle)
//! - Capture settings (resolution, zoom crop, settle delay)
//! - Capture session state machine with bounded retries
//! - Frame archive for on-disk inspection

pub mod device;
pub mod settings;
pub mod session;
pub mod archive;

pub use device::*;
pub use settings::*;
pub use session::*;
pub use archive::*;
