//! Oracle contract
//!
//! The collaborator owns transport and auth; the pipeline owns payload
//! encoding and response parsing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use sculpt_core::OracleMode;

use crate::OraclePayload;

/// Raw, unparsed oracle response body
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub body: String,
}

impl RawResponse {
    pub fn new(body: impl Into<String>) -> Self {
        RawResponse { body: body.into() }
    }
}

/// Oracle failure classification
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// Quota hit; the service may say when to come back
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Network failure or timeout
    #[error("transient failure: {0}")]
    Transient(String),

    /// The oracle refused the input; retrying cannot help
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl OracleError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, OracleError::Invalid(_))
    }

    /// Minimum wait requested by the service, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            OracleError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Semantic-reconstruction service
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn infer(
        &self,
        mode: OracleMode,
        payload: &OraclePayload,
    ) -> Result<RawResponse, OracleError>;
}

#[async_trait]
impl<O: Oracle + ?Sized> Oracle for Arc<O> {
    async fn infer(
        &self,
        mode: OracleMode,
        payload: &OraclePayload,
    ) -> Result<RawResponse, OracleError> {
        (**self).infer(mode, payload).await
    }
}
