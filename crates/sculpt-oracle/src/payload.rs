//! Request payloads sent to the oracle

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;

use sculpt_core::{CaptureSet, Frame, OracleMode, SceneDescription, SculptResult, Version};

pub const DEFAULT_RECONSTRUCT_PROMPT: &str = r#"You are looking at one physical object photographed from several angles on a turntable.
Ignore the platform or base completely and describe only the object itself.

Decompose the object into a small set of named parts. For each part choose one primitive
(cube, sphere, cylinder, cone, torus, plane), its dimensions, and its placement.

Reply with JSON only:
{"parts": {"<name>": {"kind": "<primitive>",
                      "params": {"<param>": <number>},
                      "transform": {"location": [x, y, z],
                                    "rotation": [rx, ry, rz],
                                    "scale": [sx, sy, sz]}}}}

Conventions:
- Z-up, meters, rotation in degrees (XYZ Euler).
- cube: size; sphere: radius; cylinder: radius, depth; cone: radius1, radius2, depth;
  torus: major_radius, minor_radius; plane: size.
- Keep proportions faithful to the photographs; prefer few parts over many.
"#;

pub const DEFAULT_EDIT_PROMPT: &str = r#"You are editing a procedural model given as JSON parts.
Apply the instruction to the scene and reply with the complete updated scene as JSON only,
in the same shape as the input. Keep part names stable. If you add parts, list their names in
an "added" array next to "parts". Do not rename existing parts.
"#;

/// One frame, encoded for transport
#[derive(Debug, Clone, Serialize)]
pub struct EncodedFrame {
    pub angle_index: u32,
    pub heading_degrees: f64,
    pub timestamp_ms: i64,
    pub capture_attempts: u32,
    pub mime_type: String,
    pub data: String,
}

impl EncodedFrame {
    pub fn encode(frame: &Frame, angle_count: u32) -> Self {
        EncodedFrame {
            angle_index: frame.angle_index().0,
            heading_degrees: frame.angle_index().heading_degrees(angle_count),
            timestamp_ms: frame.timestamp().as_millis(),
            capture_attempts: frame.capture_attempt_count(),
            mime_type: frame.mime_type().to_string(),
            data: BASE64.encode(frame.image()),
        }
    }
}

/// Reconstruction request body
#[derive(Debug, Clone, Serialize)]
pub struct ReconstructRequest {
    pub prompt: String,
    pub angle_count: u32,
    pub frames: Vec<EncodedFrame>,
}

/// Edit request body
#[derive(Debug, Clone, Serialize)]
pub struct EditRequest {
    pub prompt: String,
    pub instruction: String,
    pub base_version: Version,
    pub scene: SceneDescription,
}

/// Oracle request payload
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum OraclePayload {
    Reconstruct(ReconstructRequest),
    Edit(EditRequest),
}

impl OraclePayload {
    /// Reconstruction payload; frames are emitted in angle order.
    /// Fails unless the set is complete.
    pub fn reconstruct(set: &CaptureSet, prompt: &str) -> SculptResult<Self> {
        set.ensure_complete()?;
        let frames = set
            .frames()
            .map(|f| EncodedFrame::encode(f, set.angle_count()))
            .collect();
        Ok(OraclePayload::Reconstruct(ReconstructRequest {
            prompt: prompt.to_string(),
            angle_count: set.angle_count(),
            frames,
        }))
    }

    pub fn edit(scene: &SceneDescription, instruction: &str, base_version: Version, prompt: &str) -> Self {
        OraclePayload::Edit(EditRequest {
            prompt: prompt.to_string(),
            instruction: instruction.to_string(),
            base_version,
            scene: scene.clone(),
        })
    }

    pub fn mode(&self) -> OracleMode {
        match self {
            OraclePayload::Reconstruct(_) => OracleMode::Reconstruct,
            OraclePayload::Edit(_) => OracleMode::Edit,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use sculpt_core::{AngleIndex, Part, SculptError, ShapeKind, Timestamp};

    fn set(n: u32, fill: u32) -> CaptureSet {
        let mut set = CaptureSet::new(n);
        for i in (0..fill).rev() {
            set.insert(Frame::new(
                AngleIndex(i),
                Timestamp::from_millis(10 * i as i64),
                1,
                "image/jpeg",
                Bytes::from_static(b"abc"),
            ))
            .unwrap();
        }
        set
    }

    #[test]
    fn test_reconstruct_payload_orders_frames() {
        let payload = OraclePayload::reconstruct(&set(4, 4), DEFAULT_RECONSTRUCT_PROMPT).unwrap();
        assert_eq!(payload.mode(), OracleMode::Reconstruct);

        let json = payload.to_json();
        assert_eq!(json["mode"], "reconstruct");
        assert_eq!(json["angle_count"], 4);
        let frames = json["frames"].as_array().unwrap();
        let order: Vec<u64> = frames.iter().map(|f| f["angle_index"].as_u64().unwrap()).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert_eq!(frames[1]["heading_degrees"], 90.0);
        assert_eq!(frames[0]["data"], "YWJj");
    }

    #[test]
    fn test_reconstruct_payload_requires_complete_set() {
        let result = OraclePayload::reconstruct(&set(4, 2), DEFAULT_RECONSTRUCT_PROMPT);
        assert!(matches!(
            result,
            Err(SculptError::IncompleteCaptureSet {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_edit_payload_carries_scene() {
        let scene = SceneDescription::new().with_part("body", Part::new(ShapeKind::Cube));
        let payload = OraclePayload::edit(&scene, "make it taller", Version(3), DEFAULT_EDIT_PROMPT);
        let json = payload.to_json();
        assert_eq!(json["mode"], "edit");
        assert_eq!(json["base_version"], 3);
        assert_eq!(json["instruction"], "make it taller");
        assert_eq!(json["scene"]["parts"]["body"]["kind"], "cube");
    }
}
