//! Scene description - the procedural model as named parts
//!
//! This is NOT a mesh or point cloud.
//! Each part is a shape primitive with parameters and a transform; the
//! oracle produces it, edits rewrite it, emitters turn it into scripts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape primitive kind
///
/// Unknown names survive parsing so that a scene stays opaque data; only
/// the script emitter decides what it can render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShapeKind {
    Cube,
    Sphere,
    Cylinder,
    Cone,
    Torus,
    Plane,
    Unknown(String),
}

impl ShapeKind {
    /// The renderable primitives
    pub const SUPPORTED: [ShapeKind; 6] = [
        ShapeKind::Cube,
        ShapeKind::Sphere,
        ShapeKind::Cylinder,
        ShapeKind::Cone,
        ShapeKind::Torus,
        ShapeKind::Plane,
    ];

    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "cube" | "box" => ShapeKind::Cube,
            "sphere" | "uv_sphere" => ShapeKind::Sphere,
            "cylinder" => ShapeKind::Cylinder,
            "cone" => ShapeKind::Cone,
            "torus" => ShapeKind::Torus,
            "plane" => ShapeKind::Plane,
            _ => ShapeKind::Unknown(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ShapeKind::Cube => "cube",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Cone => "cone",
            ShapeKind::Torus => "torus",
            ShapeKind::Plane => "plane",
            ShapeKind::Unknown(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ShapeKind::Unknown(_))
    }
}

impl From<String> for ShapeKind {
    fn from(name: String) -> Self {
        ShapeKind::parse(&name)
    }
}

impl From<ShapeKind> for String {
    fn from(kind: ShapeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement of a part: translation, XYZ Euler rotation in degrees, scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        location: [0.0; 3],
        rotation: [0.0; 3],
        scale: [1.0; 3],
    };

    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Transform {
            location: [x, y, z],
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation(mut self, rx: f64, ry: f64, rz: f64) -> Self {
        self.rotation = [rx, ry, rz];
        self
    }

    pub fn with_scale(mut self, sx: f64, sy: f64, sz: f64) -> Self {
        self.scale = [sx, sy, sz];
        self
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One named part of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub kind: ShapeKind,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    #[serde(default)]
    pub transform: Transform,
}

impl Part {
    pub fn new(kind: ShapeKind) -> Self {
        Part {
            kind,
            params: BTreeMap::new(),
            transform: Transform::IDENTITY,
        }
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Parameter value, or `default` when absent
    pub fn param_or(&self, name: &str, default: f64) -> f64 {
        self.params.get(name).copied().unwrap_or(default)
    }
}

/// Complete procedural model: part name → part, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    pub parts: BTreeMap<String, Part>,
}

impl SceneDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_part(mut self, name: &str, part: Part) -> Self {
        self.parts.insert(name.to_string(), part);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, part: Part) -> Option<Part> {
        self.parts.insert(name.into(), part)
    }

    pub fn get(&self, name: &str) -> Option<&Part> {
        self.parts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Part)> {
        self.parts.iter().map(|(name, part)| (name.as_str(), part))
    }

    /// Parts whose kind no emitter can render
    pub fn unsupported_parts(&self) -> impl Iterator<Item = (&str, &Part)> {
        self.iter().filter(|(_, part)| !part.kind.is_supported())
    }

    /// Canonical JSON encoding (ordered keys), used for digests and payloads
    pub fn canonical_json(&self) -> Vec<u8> {
        // Maps are BTreeMaps and all values are plain numbers/strings, so
        // serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
