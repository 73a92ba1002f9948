//! Frames and capture sets
//!
//! A frame is one accepted image for one turntable angle. A capture set
//! collects exactly one frame per angle before it is handed to the oracle.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::{AngleIndex, SculptError, SculptResult, Timestamp};

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// One captured image plus acquisition metadata. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    angle_index: AngleIndex,
    timestamp: Timestamp,
    capture_attempt_count: u32,
    mime_type: String,
    image: Bytes,
}

impl Frame {
    pub fn new(
        angle_index: AngleIndex,
        timestamp: Timestamp,
        capture_attempt_count: u32,
        mime_type: impl Into<String>,
        image: Bytes,
    ) -> Self {
        Frame {
            angle_index,
            timestamp,
            capture_attempt_count,
            mime_type: mime_type.into(),
            image,
        }
    }

    pub fn angle_index(&self) -> AngleIndex {
        self.angle_index
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Number of device attempts it took to obtain this frame (≥ 1)
    pub fn capture_attempt_count(&self) -> u32 {
        self.capture_attempt_count
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn image(&self) -> &Bytes {
        &self.image
    }

    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

/// Ordered frames for one object, keyed by angle index
#[derive(Clone, Debug)]
pub struct CaptureSet {
    angle_count: u32,
    frames: BTreeMap<AngleIndex, Frame>,
}

impl CaptureSet {
    pub fn new(angle_count: u32) -> Self {
        CaptureSet {
            angle_count,
            frames: BTreeMap::new(),
        }
    }

    pub fn angle_count(&self) -> u32 {
        self.angle_count
    }

    /// Insert a frame. Rejects out-of-range and duplicate angles.
    pub fn insert(&mut self, frame: Frame) -> SculptResult<()> {
        let angle_index = frame.angle_index();
        if angle_index.0 >= self.angle_count {
            return Err(SculptError::AngleOutOfRange {
                angle_index,
                angle_count: self.angle_count,
            });
        }
        if self.frames.contains_key(&angle_index) {
            return Err(SculptError::DuplicateAngle(angle_index));
        }
        self.frames.insert(angle_index, frame);
        Ok(())
    }

    pub fn get(&self, angle_index: AngleIndex) -> Option<&Frame> {
        self.frames.get(&angle_index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Every angle in `[0, angle_count)` has a frame
    pub fn is_complete(&self) -> bool {
        self.frames.len() == self.angle_count as usize
    }

    /// Fails with `IncompleteCaptureSet` unless complete
    pub fn ensure_complete(&self) -> SculptResult<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(SculptError::IncompleteCaptureSet {
                expected: self.angle_count,
                actual: self.frames.len() as u32,
            })
        }
    }

    /// Frames in ascending angle order
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    /// Lowest angle without a frame, if any
    pub fn first_missing(&self) -> Option<AngleIndex> {
        (0..self.angle_count)
            .map(AngleIndex)
            .find(|a| !self.frames.contains_key(a))
    }

    /// Total image payload size in bytes
    pub fn payload_size(&self) -> usize {
        self.frames.values().map(|f| f.image().len()).sum()
    }
}
