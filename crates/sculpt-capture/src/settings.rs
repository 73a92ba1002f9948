//! Capture settings passed to the device before acquisition

use std::time::Duration;

/// Sensor crop rectangle in sensor pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Still-capture settings
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Output image size (width, height)
    pub resolution: (u32, u32),
    /// Digital zoom; 1.0 uses the full sensor
    pub zoom: f64,
    /// Time for exposure/white balance to settle after the camera starts
    pub settle_delay: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        CaptureSettings {
            resolution: (1280, 720),
            zoom: 1.5,
            settle_delay: Duration::from_secs(2),
        }
    }
}

impl CaptureSettings {
    /// Centered crop of `sensor` (width, height) for the zoom factor.
    /// Zoom values below 1.0 are treated as 1.0.
    pub fn crop_region(&self, sensor: (u32, u32)) -> CropRegion {
        let zoom = if self.zoom.is_finite() { self.zoom.max(1.0) } else { 1.0 };
        let width = (sensor.0 as f64 / zoom) as u32;
        let height = (sensor.1 as f64 / zoom) as u32;
        CropRegion {
            x: (sensor.0 - width) / 2,
            y: (sensor.1 - height) / 2,
            width,
            height,
        }
    }
}
