//! Capture device contract
//!
//! The turntable actuator and image sensor sit behind one narrow trait.
//! Nothing is assumed about resolution or encoding beyond opaque bytes
//! and a MIME type.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use sculpt_core::{AngleIndex, DEFAULT_MIME_TYPE};

use crate::CaptureSettings;

/// Raw image returned by the device for one angle
#[derive(Clone, Debug)]
pub struct RawCapture {
    pub image: Bytes,
    pub mime_type: String,
}

impl RawCapture {
    pub fn jpeg(image: impl Into<Bytes>) -> Self {
        RawCapture {
            image: image.into(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
        }
    }
}

/// Device failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("device timed out")]
    Timeout,

    /// The sensor's own sharpness check rejected the shot
    #[error("blur detected (sharpness {sharpness:.2})")]
    Blurred { sharpness: f32 },

    #[error("device returned an empty image")]
    EmptyImage,

    #[error("device fault: {0}")]
    Fault(String),
}

impl DeviceError {
    /// Timeouts, blur rejections and empty reads are worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeviceError::Timeout | DeviceError::Blurred { .. } | DeviceError::EmptyImage
        )
    }
}

/// Turntable + camera collaborator
#[async_trait]
pub trait CaptureDevice: Send {
    /// Apply capture settings before the first frame of a session
    async fn prepare(&mut self, _settings: &CaptureSettings) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Rotate to `angle_index` and acquire one image
    async fn capture_frame(&mut self, angle_index: AngleIndex) -> Result<RawCapture, DeviceError>;
}

#[async_trait]
impl<D: CaptureDevice + ?Sized> CaptureDevice for Box<D> {
    async fn prepare(&mut self, settings: &CaptureSettings) -> Result<(), DeviceError> {
        (**self).prepare(settings).await
    }

    async fn capture_frame(&mut self, angle_index: AngleIndex) -> Result<RawCapture, DeviceError> {
        (**self).capture_frame(angle_index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DeviceError::Timeout.is_transient());
        assert!(DeviceError::Blurred { sharpness: 0.1 }.is_transient());
        assert!(!DeviceError::Fault("lens cap".into()).is_transient());
    }

    #[test]
    fn test_raw_capture_defaults_to_jpeg() {
        let raw = RawCapture::jpeg(vec![1u8, 2, 3]);
        assert_eq!(raw.mime_type, "image/jpeg");
        assert_eq!(raw.image.len(), 3);
    }
}
