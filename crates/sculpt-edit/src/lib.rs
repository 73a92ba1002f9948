//! SCULPT Edit - Natural-language model editing
//!
//! This crate implements the edit loop:
//! - Command normalization and target resolution
//! - Oracle edit proposals with semantic validation
//! - No-op detection
//! - Voice commands through a transcription contract

pub mod engine;
pub mod transcribe;

pub use engine::*;
pub use transcribe::*;
