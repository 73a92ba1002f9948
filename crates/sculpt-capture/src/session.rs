//! Capture session - drives one full turntable revolution
//!
//! State machine:
//! ```text
//! Idle → Capturing(i) → Verifying(i) → Capturing(i+1) | Complete | Failed(i)
//! ```
//! A failed session stays failed until `begin` is called again.

use std::fmt;

use tracing::{debug, error, info, warn};

use sculpt_core::{
    backoff_sleep, AngleIndex, CancelToken, CaptureSet, ExponentialBackoff, Frame, RetryConfig,
    SculptError, SculptResult, Timestamp,
};

use crate::{CaptureDevice, CaptureSettings, DeviceError, RawCapture};

/// Fewer angles cannot support reconstruction
pub const MIN_ANGLE_COUNT: u32 = 3;

/// Retries per angle after the first attempt
pub const DEFAULT_CAPTURE_RETRIES: u32 = 3;

/// Capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing(AngleIndex),
    Verifying(AngleIndex),
    Complete,
    Failed(AngleIndex),
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Idle => f.write_str("idle"),
            CaptureState::Capturing(a) => write!(f, "capturing({})", a),
            CaptureState::Verifying(a) => write!(f, "verifying({})", a),
            CaptureState::Complete => f.write_str("complete"),
            CaptureState::Failed(a) => write!(f, "failed({})", a),
        }
    }
}

/// Capture session configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Device retry policy; `max_attempts` counts the first attempt too
    pub retry: RetryConfig,
    /// Settings handed to the device before the first frame
    pub settings: CaptureSettings,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            retry: RetryConfig::default().max_attempts(DEFAULT_CAPTURE_RETRIES + 1),
            settings: CaptureSettings::default(),
        }
    }
}

/// Progress report after each accepted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureProgress {
    pub angle_index: AngleIndex,
    pub total: u32,
}

type ProgressCallback = Box<dyn FnMut(CaptureProgress) + Send>;

/// Turntable capture session
pub struct CaptureSession<D: CaptureDevice> {
    device: D,
    config: CaptureConfig,
    state: CaptureState,
    set: Option<CaptureSet>,
    prepared: bool,
    progress: Option<ProgressCallback>,
}

impl<D: CaptureDevice> CaptureSession<D> {
    pub fn new(device: D) -> Self {
        Self::with_config(device, CaptureConfig::default())
    }

    pub fn with_config(device: D, config: CaptureConfig) -> Self {
        CaptureSession {
            device,
            config,
            state: CaptureState::Idle,
            set: None,
            prepared: false,
            progress: None,
        }
    }

    /// Register the progress observer. Called once per accepted frame, in
    /// ascending angle order.
    pub fn on_progress(&mut self, callback: impl FnMut(CaptureProgress) + Send + 'static) {
        self.progress = Some(Box::new(callback));
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Frames captured so far
    pub fn capture_set(&self) -> Option<&CaptureSet> {
        self.set.as_ref()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Start a new revolution of `angle_count` stops, discarding any
    /// previous progress.
    pub fn begin(&mut self, angle_count: u32) -> SculptResult<()> {
        if angle_count < MIN_ANGLE_COUNT {
            return Err(SculptError::Config(format!(
                "angle_count must be at least {}, got {}",
                MIN_ANGLE_COUNT, angle_count
            )));
        }

        self.set = Some(CaptureSet::new(angle_count));
        self.state = CaptureState::Capturing(AngleIndex::ZERO);
        self.prepared = false;
        debug!(angle_count, "capture session started");
        Ok(())
    }

    /// Capture the current angle, retrying transient device errors.
    ///
    /// On cancellation the session stays at `Capturing(i)` and the call may
    /// be repeated.
    pub async fn capture_next(&mut self, cancel: &CancelToken) -> SculptResult<CaptureProgress> {
        let angle = match self.state {
            CaptureState::Capturing(angle) => angle,
            other => {
                return Err(SculptError::InvalidState {
                    expected: "capturing",
                    actual: other.to_string(),
                })
            }
        };

        if !self.prepared {
            match cancel.run(self.device.prepare(&self.config.settings)).await? {
                Ok(()) => self.prepared = true,
                Err(e) => return Err(self.fail(angle, format!("prepare failed: {}", e))),
            }
        }

        let mut backoff = ExponentialBackoff::new(self.config.retry.clone());
        loop {
            let attempt = backoff.attempt();
            let result = cancel.run(self.device.capture_frame(angle)).await?;

            let cause = match result {
                Ok(raw) => {
                    self.state = CaptureState::Verifying(angle);
                    match verify(&raw) {
                        Ok(()) => return self.accept(angle, attempt, raw),
                        Err(e) => e,
                    }
                }
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(self.fail(angle, e.to_string())),
            };

            self.state = CaptureState::Capturing(angle);
            match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        angle = %angle,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %cause,
                        "transient capture failure, retrying"
                    );
                    backoff_sleep(delay, cancel).await?;
                }
                None => {
                    return Err(self.fail(
                        angle,
                        format!("{} (gave up after {} attempts)", cause, attempt),
                    ))
                }
            }
        }
    }

    /// Capture every remaining angle
    pub async fn capture_all(&mut self, cancel: &CancelToken) -> SculptResult<()> {
        while let CaptureState::Capturing(_) = self.state {
            self.capture_next(cancel).await?;
        }
        match self.state {
            CaptureState::Complete => Ok(()),
            other => Err(SculptError::InvalidState {
                expected: "capturing",
                actual: other.to_string(),
            }),
        }
    }

    /// Hand the complete capture set off; the session returns to `Idle`
    pub fn take_capture_set(&mut self) -> SculptResult<CaptureSet> {
        if self.state != CaptureState::Complete {
            if let Some(set) = &self.set {
                set.ensure_complete()?;
            }
            return Err(SculptError::InvalidState {
                expected: "complete",
                actual: self.state.to_string(),
            });
        }

        let set = self.set.take().ok_or(SculptError::InvalidState {
            expected: "complete",
            actual: "no capture set".into(),
        })?;
        self.state = CaptureState::Idle;
        Ok(set)
    }

    fn accept(
        &mut self,
        angle: AngleIndex,
        attempts: u32,
        raw: RawCapture,
    ) -> SculptResult<CaptureProgress> {
        let set = self.set.as_mut().ok_or(SculptError::InvalidState {
            expected: "capturing",
            actual: "no capture set".into(),
        })?;

        set.insert(Frame::new(
            angle,
            Timestamp::now(),
            attempts,
            raw.mime_type,
            raw.image,
        ))?;

        let total = set.angle_count();
        let next = angle.next();
        self.state = if next.0 >= total {
            CaptureState::Complete
        } else {
            CaptureState::Capturing(next)
        };

        info!(angle = %angle, attempts, total, "frame accepted");
        let progress = CaptureProgress {
            angle_index: angle,
            total,
        };
        if let Some(callback) = self.progress.as_mut() {
            callback(progress);
        }
        Ok(progress)
    }

    fn fail(&mut self, angle: AngleIndex, cause: String) -> SculptError {
        error!(angle = %angle, cause = %cause, "capture failed");
        self.state = CaptureState::Failed(angle);
        SculptError::Capture {
            angle_index: angle,
            cause,
        }
    }
}

fn verify(raw: &RawCapture) -> Result<(), DeviceError> {
    if raw.image.is_empty() {
        return Err(DeviceError::EmptyImage);
    }
    Ok(())
}
