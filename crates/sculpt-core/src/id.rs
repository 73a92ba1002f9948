//! Identity types for the SCULPT pipeline
//!
//! Angle indices and versions are small dense integers; sessions and
//! objects are opaque 64-bit handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Session identity - one capture-to-export lifecycle
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SessionId(pub u64);

impl SessionId {
    #[inline]
    pub fn new(id: u64) -> Self {
        SessionId(id)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session({:016x})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Physical object being scanned. At most one session per object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectId(pub u64);

impl ObjectId {
    #[inline]
    pub fn new(id: u64) -> Self {
        ObjectId(id)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({:016x})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Turntable position of a frame, in `[0, angle_count)`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AngleIndex(pub u32);

impl AngleIndex {
    pub const ZERO: AngleIndex = AngleIndex(0);

    #[inline]
    pub fn new(index: u32) -> Self {
        AngleIndex(index)
    }

    #[inline]
    pub fn next(self) -> Self {
        AngleIndex(self.0 + 1)
    }

    /// Turntable heading in degrees for a ring of `angle_count` stops
    pub fn heading_degrees(self, angle_count: u32) -> f64 {
        if angle_count == 0 {
            return 0.0;
        }
        360.0 * self.0 as f64 / angle_count as f64
    }
}

impl fmt::Debug for AngleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Angle({})", self.0)
    }
}

impl fmt::Display for AngleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Model snapshot version. Version 0 is the initial reconstruction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u64);

impl Version {
    pub const INITIAL: Version = Version(0);

    #[inline]
    pub fn new(v: u64) -> Self {
        Version(v)
    }

    #[inline]
    pub fn next(self) -> Self {
        Version(self.0 + 1)
    }

    /// Parent of an edit snapshot; `None` for the initial version
    #[inline]
    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(Version)
    }

    #[inline]
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_chain() {
        let v = Version::INITIAL.next().next();
        assert_eq!(v, Version(2));
        assert_eq!(v.prev(), Some(Version(1)));
        assert_eq!(Version::INITIAL.prev(), None);
    }

    #[test]
    fn test_angle_heading() {
        assert_eq!(AngleIndex(0).heading_degrees(4), 0.0);
        assert_eq!(AngleIndex(1).heading_degrees(4), 90.0);
        assert_eq!(AngleIndex(3).heading_degrees(8), 135.0);
        assert_eq!(AngleIndex(3).heading_degrees(0), 0.0);
    }

    #[test]
    fn test_version_serializes_transparently() {
        let json = serde_json::to_string(&Version(7)).unwrap();
        assert_eq!(json, "7");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Version(7));
    }
}
