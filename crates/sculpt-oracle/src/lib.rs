//! SCULPT Oracle - Semantic-reconstruction client
//!
//! This crate provides:
//! - Oracle contract (reconstruct / edit modes)
//! - Request payload encoding (frames as base64)
//! - Response parsing into validated scene descriptions
//! - Reconstruction client with bounded retries and a single-flight guard

pub mod oracle;
pub mod payload;
pub mod parse;
pub mod client;

pub use oracle::*;
pub use payload::*;
pub use parse::{parse_edit_proposal, parse_scene, EditProposal, FormatError};
pub use client::*;
