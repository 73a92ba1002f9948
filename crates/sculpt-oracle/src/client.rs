//! Reconstruction client
//!
//! Wraps an [`Oracle`] with payload encoding, bounded retries, response
//! parsing and a single-flight guard. One client serves one session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use sculpt_core::{
    backoff_sleep, CancelToken, CaptureSet, ExponentialBackoff, OracleMode, RetryConfig,
    SceneDescription, SculptError, SculptResult, Version,
};

use crate::parse::{parse_edit_proposal, parse_scene, EditProposal};
use crate::{Oracle, OracleError, OraclePayload, RawResponse, DEFAULT_EDIT_PROMPT, DEFAULT_RECONSTRUCT_PROMPT};

/// Client configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Retry policy for transient and rate-limit failures
    pub retry: RetryConfig,
    pub reconstruct_prompt: String,
    pub edit_prompt: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            retry: RetryConfig::default().max_attempts(5),
            reconstruct_prompt: DEFAULT_RECONSTRUCT_PROMPT.to_string(),
            edit_prompt: DEFAULT_EDIT_PROMPT.to_string(),
        }
    }
}

/// Clears the in-flight flag on every exit path, cancellation included
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> SculptResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(flag))
            .map_err(|_| SculptError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Semantic-reconstruction client
pub struct ReconstructionClient {
    oracle: Arc<dyn Oracle>,
    config: OracleConfig,
    in_flight: AtomicBool,
}

impl ReconstructionClient {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self::with_config(oracle, OracleConfig::default())
    }

    pub fn with_config(oracle: Arc<dyn Oracle>, config: OracleConfig) -> Self {
        ReconstructionClient {
            oracle,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// True while a submit or edit call is outstanding
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Reconstruct a scene from a complete capture set
    pub async fn submit(&self, set: &CaptureSet, cancel: &CancelToken) -> SculptResult<SceneDescription> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let payload = OraclePayload::reconstruct(set, &self.config.reconstruct_prompt)?;

        info!(frames = set.len(), bytes = set.payload_size(), "submitting capture set");
        let response = self.call(&payload, cancel).await?;

        let scene = parse_scene(&response.body).map_err(|e| SculptError::ResponseFormat {
            mode: OracleMode::Reconstruct,
            detail: e.0,
        })?;
        info!(parts = scene.len(), "reconstruction parsed");
        Ok(scene)
    }

    /// Ask the oracle to apply `instruction` to `base_scene`
    pub async fn propose_edit(
        &self,
        base_scene: &SceneDescription,
        instruction: &str,
        base_version: Version,
        cancel: &CancelToken,
    ) -> SculptResult<EditProposal> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let payload = OraclePayload::edit(base_scene, instruction, base_version, &self.config.edit_prompt);

        info!(base = %base_version, "submitting edit");
        let response = self.call(&payload, cancel).await?;

        parse_edit_proposal(&response.body).map_err(|e| SculptError::ResponseFormat {
            mode: OracleMode::Edit,
            detail: e.0,
        })
    }

    /// Invoke the oracle with retry classification.
    /// Never retries `Invalid`; honors a rate-limit hint when it exceeds the backoff.
    async fn call(&self, payload: &OraclePayload, cancel: &CancelToken) -> SculptResult<RawResponse> {
        let mode = payload.mode();
        let mut backoff = ExponentialBackoff::new(self.config.retry.clone());

        loop {
            let attempt = backoff.attempt();
            debug!(%mode, attempt, "oracle call");

            let err = match cancel.run(self.oracle.infer(mode, payload)).await? {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!(%mode, error = %err, "oracle rejected request");
                let reason = match err {
                    OracleError::Invalid(reason) => reason,
                    other => other.to_string(),
                };
                return Err(SculptError::OracleRejected { mode, reason });
            }

            let Some(delay) = backoff.next_delay() else {
                warn!(%mode, attempts = attempt, error = %err, "oracle retries exhausted");
                return Err(SculptError::OracleUnavailable {
                    mode,
                    attempts: attempt,
                    last_cause: err.to_string(),
                });
            };
            let delay = err.retry_after().map_or(delay, |hint| hint.max(delay));

            warn!(
                %mode,
                attempt,
                max_attempts = backoff.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "oracle call failed, retrying"
            );
            backoff_sleep(delay, cancel).await?;
        }
    }
}

impl std::fmt::Debug for ReconstructionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconstructionClient")
            .field("config", &self.config)
            .field("busy", &self.is_busy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use sculpt_core::{AngleIndex, Frame, Timestamp};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    const CUBE: &str = r#"{"parts": {"box": {"kind": "cube", "params": {"size": 1}}}}"#;

    /// Replays a fixed list of outcomes, then repeats the last one
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<RawResponse, OracleError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<RawResponse, OracleError>>) -> Arc<Self> {
            Arc::new(Scripted {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Oracle for Scripted {
        async fn infer(&self, _mode: OracleMode, _payload: &OraclePayload) -> Result<RawResponse, OracleError> {
            *self.calls.lock().unwrap() += 1;
            let mut q = self.outcomes.lock().unwrap();
            if q.len() > 1 {
                q.pop_front().unwrap()
            } else {
                q.front().cloned().unwrap()
            }
        }
    }

    struct Hanging;

    #[async_trait]
    impl Oracle for Hanging {
        async fn infer(&self, _mode: OracleMode, _payload: &OraclePayload) -> Result<RawResponse, OracleError> {
            std::future::pending().await
        }
    }

    fn complete_set() -> CaptureSet {
        let mut set = CaptureSet::new(3);
        for i in 0..3 {
            set.insert(Frame::new(AngleIndex(i), Timestamp::ZERO, 1, "image/jpeg", Bytes::from_static(b"x")))
                .unwrap();
        }
        set
    }

    fn fast(attempts: u32) -> OracleConfig {
        OracleConfig {
            retry: RetryConfig::immediate(attempts),
            ..OracleConfig::default()
        }
    }

    #[tokio::test]
    async fn test_submit_parses_scene() {
        let oracle = Scripted::new(vec![Ok(RawResponse::new(CUBE))]);
        let client = ReconstructionClient::new(oracle.clone());
        let scene = client.submit(&complete_set(), &CancelToken::new()).await.unwrap();
        assert!(scene.contains("box"));
        assert_eq!(oracle.calls(), 1);
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let oracle = Scripted::new(vec![
            Err(OracleError::Transient("reset".into())),
            Err(OracleError::RateLimited { retry_after: None }),
            Ok(RawResponse::new(CUBE)),
        ]);
        let client = ReconstructionClient::with_config(oracle.clone(), fast(5));
        client.submit(&complete_set(), &CancelToken::new()).await.unwrap();
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let oracle = Scripted::new(vec![Err(OracleError::Transient("down".into()))]);
        let client = ReconstructionClient::with_config(oracle.clone(), fast(4));
        let err = client.submit(&complete_set(), &CancelToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            SculptError::OracleUnavailable {
                mode: OracleMode::Reconstruct,
                attempts: 4,
                ..
            }
        ));
        assert_eq!(oracle.calls(), 4);
    }

    #[tokio::test]
    async fn test_invalid_is_not_retried() {
        let oracle = Scripted::new(vec![Err(OracleError::Invalid("no object in frame".into()))]);
        let client = ReconstructionClient::with_config(oracle.clone(), fast(5));
        let err = client.submit(&complete_set(), &CancelToken::new()).await.unwrap_err();
        match err {
            SculptError::OracleRejected { mode, reason } => {
                assert_eq!(mode, OracleMode::Reconstruct);
                assert_eq!(reason, "no object in frame");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_response_is_format_error() {
        let oracle = Scripted::new(vec![Ok(RawResponse::new("I think it's a mug."))]);
        let client = ReconstructionClient::new(oracle.clone());
        let err = client.submit(&complete_set(), &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, SculptError::ResponseFormat { mode: OracleMode::Reconstruct, .. }));
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_set_is_rejected_before_calling() {
        let oracle = Scripted::new(vec![Ok(RawResponse::new(CUBE))]);
        let client = ReconstructionClient::new(oracle.clone());
        let err = client.submit(&CaptureSet::new(3), &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, SculptError::IncompleteCaptureSet { .. }));
        assert_eq!(oracle.calls(), 0);
        assert!(!client.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_hint_extends_delay() {
        let oracle = Scripted::new(vec![
            Err(OracleError::RateLimited {
                retry_after: Some(Duration::from_secs(30)),
            }),
            Ok(RawResponse::new(CUBE)),
        ]);
        let client = ReconstructionClient::with_config(oracle.clone(), fast(3));
        let started = tokio::time::Instant::now();
        client.submit(&complete_set(), &CancelToken::new()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_second_call_while_in_flight_is_busy() {
        let client = Arc::new(ReconstructionClient::new(Arc::new(Hanging)));
        let cancel = CancelToken::new();

        let first = {
            let client = client.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { client.submit(&complete_set(), &cancel).await })
        };
        while !client.is_busy() {
            tokio::task::yield_now().await;
        }

        let scene = SceneDescription::new();
        let err = client
            .propose_edit(&scene, "taller", Version::INITIAL, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SculptError::Busy));

        cancel.cancel();
        let result = first.await.unwrap();
        assert!(matches!(result, Err(SculptError::Cancelled)));
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn test_edit_proposal_parsed() {
        let body = r#"{"parts": {"box": {"kind": "cube"}, "lid": {"kind": "plane"}}, "added": ["lid"]}"#;
        let oracle = Scripted::new(vec![Ok(RawResponse::new(body))]);
        let client = ReconstructionClient::new(oracle);
        let base = SceneDescription::new();
        let proposal = client
            .propose_edit(&base, "add a lid", Version(2), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(proposal.scene.len(), 2);
        assert!(proposal.added.contains("lid"));
    }
}
