//! Error types for the SCULPT pipeline

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AngleIndex, ObjectId, Version};

/// Oracle call mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleMode {
    Reconstruct,
    Edit,
}

impl OracleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OracleMode::Reconstruct => "reconstruct",
            OracleMode::Edit => "edit",
        }
    }
}

impl fmt::Display for OracleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core SCULPT errors
#[derive(Error, Debug)]
pub enum SculptError {
    // Setup errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },

    // Capture errors
    #[error("Capture failed at angle {angle_index}: {cause}")]
    Capture { angle_index: AngleIndex, cause: String },

    #[error("Duplicate frame for angle {0}")]
    DuplicateAngle(AngleIndex),

    #[error("Angle {angle_index} out of range for {angle_count} angles")]
    AngleOutOfRange {
        angle_index: AngleIndex,
        angle_count: u32,
    },

    #[error("Capture set incomplete: expected {expected} frames, got {actual}")]
    IncompleteCaptureSet { expected: u32, actual: u32 },

    // Oracle errors
    #[error("Oracle unavailable in {mode} mode after {attempts} attempts: {last_cause}")]
    OracleUnavailable {
        mode: OracleMode,
        attempts: u32,
        last_cause: String,
    },

    #[error("Oracle rejected {mode} request: {reason}")]
    OracleRejected { mode: OracleMode, reason: String },

    #[error("Malformed oracle response in {mode} mode: {detail}")]
    ResponseFormat { mode: OracleMode, detail: String },

    #[error("Oracle call already in flight for this session")]
    Busy,

    // Model store errors
    #[error("Model store already initialized")]
    AlreadyInitialized,

    #[error("Stale edit: based on {base}, head is {head}")]
    StaleEdit { base: Version, head: Version },

    #[error("Snapshot not found: {0}")]
    NotFound(Version),

    #[error("Edit introduces undeclared part '{part}'")]
    UndeclaredPart { part: String },

    // Script errors
    #[error("Unsupported primitive '{kind}' on part '{part}'")]
    UnsupportedPrimitive { part: String, kind: String },

    // Session errors
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Object {0} already has an active session")]
    SessionActive(ObjectId),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Persisted state invalid: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SculptError {
    /// Recoverable by recomputing against fresh state
    pub fn is_retryable(&self) -> bool {
        matches!(self, SculptError::StaleEdit { .. })
    }

    pub fn is_fatal(&self) -> bool {
        !self.is_retryable() && !matches!(self, SculptError::Cancelled)
    }
}

/// Result type for SCULPT operations
pub type SculptResult<T> = Result<T, SculptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_edit_is_retryable() {
        let err = SculptError::StaleEdit {
            base: Version(1),
            head: Version(2),
        };
        assert!(err.is_retryable());
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Stale edit: based on v1, head is v2");
    }

    #[test]
    fn test_capture_error_keeps_context() {
        let err = SculptError::Capture {
            angle_index: AngleIndex(3),
            cause: "timeout".into(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("angle 3"));
    }

    #[test]
    fn test_cancelled_is_neither() {
        assert!(!SculptError::Cancelled.is_fatal());
        assert!(!SculptError::Cancelled.is_retryable());
    }
}
