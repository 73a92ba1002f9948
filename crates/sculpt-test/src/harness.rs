//! Session harness
//!
//! Builds sessions wired to fakes with zero-delay retry policies so
//! scenarios run without real sleeps.

use std::sync::Arc;
use std::time::Duration;

use sculpt_capture::CaptureDevice;
use sculpt_core::{CancelToken, ObjectId, SculptResult};
use sculpt_oracle::Oracle;
use sculpt_runtime::{PipelineConfig, RetrySection, Session, SessionRegistry};
use sculpt_state::Snapshot;

/// Default attempt limits with every delay zeroed
fn no_delay() -> RetrySection {
    RetrySection {
        max_attempts: None,
        initial_delay: Some(Duration::ZERO),
        max_delay: Some(Duration::ZERO),
        multiplier: None,
        jitter: Some(false),
    }
}

/// Default pipeline config with immediate retries
pub fn fast_config(angle_count: u32) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.capture.angle_count = Some(angle_count);
    config.capture.retry = no_delay();
    config.oracle.retry = no_delay();
    config
}

/// Registry plus config for spinning up test sessions
#[derive(Debug, Clone)]
pub struct PipelineHarness {
    pub registry: SessionRegistry,
    pub config: PipelineConfig,
}

impl PipelineHarness {
    pub fn new(angle_count: u32) -> Self {
        PipelineHarness {
            registry: SessionRegistry::new(),
            config: fast_config(angle_count),
        }
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        PipelineHarness {
            registry: SessionRegistry::new(),
            config,
        }
    }

    /// Open a session for `object`
    pub fn session<D: CaptureDevice>(
        &self,
        object: u64,
        device: D,
        oracle: Arc<dyn Oracle>,
    ) -> SculptResult<Session<D>> {
        let lease = self.registry.acquire(ObjectId::new(object))?;
        Ok(Session::new(lease, device, oracle, &self.config))
    }
}

/// Capture a full revolution and reconstruct version 0
pub async fn run_to_model<D: CaptureDevice>(
    session: &mut Session<D>,
    cancel: &CancelToken,
) -> SculptResult<Arc<Snapshot>> {
    session.begin_capture(None)?;
    session.capture_all(cancel).await?;
    session.reconstruct(cancel).await
}
