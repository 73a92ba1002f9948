//! SCULPT Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every pipeline stage:
//! - Identifiers (SessionId, ObjectId, AngleIndex, Version)
//! - Capture time stamps
//! - Frames and capture sets
//! - Scene descriptions (named procedural parts)
//! - Error taxonomy
//! - Bounded exponential backoff and cancellation

pub mod id;
pub mod time;
pub mod frame;
pub mod scene;
pub mod error;
pub mod retry;
pub mod cancel;

pub use id::*;
pub use time::*;
pub use frame::*;
pub use scene::*;
pub use error::*;
pub use retry::*;
pub use cancel::*;
