//! Capture device fakes
//!
//! - `ScriptedDevice` replays a fixed list of outcomes
//! - `FlakyDevice` injects seeded faults at configurable rates

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sculpt_capture::{CaptureDevice, CaptureSettings, CropRegion, DeviceError, RawCapture};
use sculpt_core::AngleIndex;

/// Deterministic JPEG-tagged image for an angle
pub fn test_image(angle_index: AngleIndex) -> Bytes {
    let mut data = vec![0xff, 0xd8, 0xff, 0xe0];
    data.extend_from_slice(&angle_index.0.to_le_bytes());
    Bytes::from(data)
}

/// Sensor size (width, height) the scripted device pretends to have
pub const SIMULATED_SENSOR: (u32, u32) = (4608, 2592);

/// Scripted device outcome
#[derive(Clone, Debug)]
pub enum DeviceStep {
    /// Return [`test_image`] for the requested angle
    Image,
    /// Return an empty image (rejected during verification)
    Empty,
    Fail(DeviceError),
    /// Never return
    Stall,
}

/// Replays steps in order; once exhausted, every capture succeeds
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    steps: VecDeque<DeviceStep>,
    prepared_with: Option<CaptureSettings>,
    crop: Option<CropRegion>,
    requested: Vec<AngleIndex>,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(steps: impl IntoIterator<Item = DeviceStep>) -> Self {
        ScriptedDevice {
            steps: steps.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn then(mut self, step: DeviceStep) -> Self {
        self.steps.push_back(step);
        self
    }

    /// Settings received through `prepare`
    pub fn prepared_with(&self) -> Option<&CaptureSettings> {
        self.prepared_with.as_ref()
    }

    /// Sensor crop applied at `prepare`
    pub fn crop(&self) -> Option<CropRegion> {
        self.crop
    }

    /// Every angle requested, including retries
    pub fn requested(&self) -> &[AngleIndex] {
        &self.requested
    }
}

#[async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn prepare(&mut self, settings: &CaptureSettings) -> Result<(), DeviceError> {
        self.crop = Some(settings.crop_region(SIMULATED_SENSOR));
        self.prepared_with = Some(settings.clone());
        Ok(())
    }

    async fn capture_frame(&mut self, angle_index: AngleIndex) -> Result<RawCapture, DeviceError> {
        self.requested.push(angle_index);
        match self.steps.pop_front().unwrap_or(DeviceStep::Image) {
            DeviceStep::Image => Ok(RawCapture::jpeg(test_image(angle_index))),
            DeviceStep::Empty => Ok(RawCapture::jpeg(Bytes::new())),
            DeviceStep::Fail(e) => Err(e),
            DeviceStep::Stall => std::future::pending().await,
        }
    }
}

/// Fault rates for [`FlakyDevice`]
#[derive(Clone, Debug, PartialEq)]
pub struct FaultConfig {
    /// Per-attempt probability of a timeout
    pub timeout_rate: f64,
    /// Per-attempt probability of a blurred frame
    pub blur_rate: f64,
    /// Per-attempt probability of an empty image
    pub empty_rate: f64,
    /// Per-attempt probability of a fatal fault
    pub fault_rate: f64,
    /// Simulated exposure time per attempt
    pub latency: Duration,
}

impl Default for FaultConfig {
    fn default() -> Self {
        FaultConfig {
            timeout_rate: 0.05,
            blur_rate: 0.05,
            empty_rate: 0.01,
            fault_rate: 0.0,
            latency: Duration::ZERO,
        }
    }
}

impl FaultConfig {
    /// Never fails
    pub fn none() -> Self {
        FaultConfig {
            timeout_rate: 0.0,
            blur_rate: 0.0,
            empty_rate: 0.0,
            fault_rate: 0.0,
            latency: Duration::ZERO,
        }
    }

    /// Loose turntable, bad lighting
    pub fn poor() -> Self {
        FaultConfig {
            timeout_rate: 0.15,
            blur_rate: 0.2,
            empty_rate: 0.05,
            fault_rate: 0.0,
            latency: Duration::ZERO,
        }
    }

    /// Failing hardware
    pub fn hostile() -> Self {
        FaultConfig {
            timeout_rate: 0.3,
            blur_rate: 0.3,
            empty_rate: 0.1,
            fault_rate: 0.02,
            latency: Duration::ZERO,
        }
    }
}

/// Fault injection counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaultStats {
    pub attempts: u64,
    pub delivered: u64,
    pub timeouts: u64,
    pub blurred: u64,
    pub empty: u64,
    pub faults: u64,
}

/// Device with seeded random failures
#[derive(Debug)]
pub struct FlakyDevice {
    config: FaultConfig,
    rng: StdRng,
    stats: FaultStats,
}

impl FlakyDevice {
    pub fn new(config: FaultConfig, seed: u64) -> Self {
        FlakyDevice {
            config,
            rng: StdRng::seed_from_u64(seed),
            stats: FaultStats::default(),
        }
    }

    pub fn stats(&self) -> &FaultStats {
        &self.stats
    }
}

#[async_trait]
impl CaptureDevice for FlakyDevice {
    async fn capture_frame(&mut self, angle_index: AngleIndex) -> Result<RawCapture, DeviceError> {
        self.stats.attempts += 1;
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        let roll: f64 = self.rng.gen();
        let mut threshold = self.config.fault_rate;
        if roll < threshold {
            self.stats.faults += 1;
            return Err(DeviceError::Fault("turntable motor stalled".into()));
        }
        threshold += self.config.timeout_rate;
        if roll < threshold {
            self.stats.timeouts += 1;
            return Err(DeviceError::Timeout);
        }
        threshold += self.config.blur_rate;
        if roll < threshold {
            self.stats.blurred += 1;
            let sharpness = self.rng.gen_range(0.0f32..0.3);
            return Err(DeviceError::Blurred { sharpness });
        }
        threshold += self.config.empty_rate;
        if roll < threshold {
            self.stats.empty += 1;
            return Ok(RawCapture::jpeg(Bytes::new()));
        }

        self.stats.delivered += 1;
        Ok(RawCapture::jpeg(test_image(angle_index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_device_replays_then_succeeds() {
        let mut device = ScriptedDevice::new().then(DeviceStep::Fail(DeviceError::Timeout));
        assert!(device.capture_frame(AngleIndex(0)).await.is_err());
        let raw = device.capture_frame(AngleIndex(0)).await.unwrap();
        assert_eq!(raw.image, test_image(AngleIndex(0)));
        assert_eq!(device.requested(), &[AngleIndex(0), AngleIndex(0)]);
    }

    #[tokio::test]
    async fn test_prepare_records_crop() {
        let mut device = ScriptedDevice::new();
        assert_eq!(device.crop(), None);
        device.prepare(&CaptureSettings::default()).await.unwrap();
        let crop = device.crop().unwrap();
        assert_eq!((crop.x, crop.y, crop.width, crop.height), (768, 432, 3072, 1728));
    }

    #[tokio::test]
    async fn test_flaky_device_is_seeded() {
        let mut a = FlakyDevice::new(FaultConfig::poor(), 42);
        let mut b = FlakyDevice::new(FaultConfig::poor(), 42);
        for i in 0..50 {
            let ra = a.capture_frame(AngleIndex(i)).await.is_ok();
            let rb = b.capture_frame(AngleIndex(i)).await.is_ok();
            assert_eq!(ra, rb);
        }
        assert_eq!(a.stats(), b.stats());
        assert_eq!(a.stats().attempts, 50);
    }

    #[tokio::test]
    async fn test_no_faults() {
        let mut device = FlakyDevice::new(FaultConfig::none(), 7);
        for i in 0..20 {
            assert!(device.capture_frame(AngleIndex(i)).await.is_ok());
        }
        assert_eq!(device.stats().delivered, 20);
    }
}
