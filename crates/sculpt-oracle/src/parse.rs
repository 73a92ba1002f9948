//! Oracle response parsing
//!
//! The response is untyped until it passes through here. Accepted shape:
//! ```text
//! {"parts": {"<name>": {"kind": "...", "params": {...}, "transform": {...}}},
//!  "added": ["<name>", ...]}            // edit mode only, optional
//! ```
//! `parts` may also be an array of part objects carrying a `"name"` field.
//! The JSON may be wrapped in a markdown code fence.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use sculpt_core::{Part, SceneDescription, ShapeKind, Transform};

/// Upper bound on parts in one response
pub const MAX_PARTS: usize = 512;

/// Response did not have the expected shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FormatError(pub String);

fn err<T>(msg: impl Into<String>) -> Result<T, FormatError> {
    Err(FormatError(msg.into()))
}

/// Scene proposed by an edit-mode call
#[derive(Debug, Clone, PartialEq)]
pub struct EditProposal {
    pub scene: SceneDescription,
    /// Part names the oracle declares as newly introduced
    pub added: BTreeSet<String>,
}

/// Parse a reconstruction response
pub fn parse_scene(body: &str) -> Result<SceneDescription, FormatError> {
    let root = parse_root(body)?;
    scene_from_root(&root)
}

/// Parse an edit response
pub fn parse_edit_proposal(body: &str) -> Result<EditProposal, FormatError> {
    let root = parse_root(body)?;
    let scene = scene_from_root(&root)?;

    let mut added = BTreeSet::new();
    match root.get("added") {
        None | Some(Value::Null) => {}
        Some(Value::Array(names)) => {
            for name in names {
                match name.as_str().map(str::trim) {
                    Some(n) if !n.is_empty() => {
                        added.insert(n.to_string());
                    }
                    _ => return err("'added' must contain non-empty strings"),
                }
            }
        }
        Some(_) => return err("'added' must be an array"),
    }

    Ok(EditProposal { scene, added })
}

fn parse_root(body: &str) -> Result<Map<String, Value>, FormatError> {
    let json = extract_json(body);
    if json.is_empty() {
        return err("empty response");
    }
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => err(format!("expected a JSON object, got {}", type_name(&other))),
        Err(e) => err(format!("invalid JSON: {}", e)),
    }
}

/// Strip a markdown fence or surrounding prose
fn extract_json(body: &str) -> &str {
    let trimmed = body.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop the info string ("json") on the opening line
        let rest = rest.split_once('\n').map(|(_, r)| r).unwrap_or("");
        let rest = rest.trim_end();
        return rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    if trimmed.starts_with('{') {
        return trimmed;
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn scene_from_root(root: &Map<String, Value>) -> Result<SceneDescription, FormatError> {
    let mut scene = SceneDescription::new();
    match root.get("parts") {
        Some(Value::Object(parts)) => {
            check_count(parts.len())?;
            for (name, value) in parts {
                let name = part_name(name)?;
                let part = parse_part(&name, value)?;
                if scene.insert(name.clone(), part).is_some() {
                    return err(format!("duplicate part name '{}'", name));
                }
            }
        }
        Some(Value::Array(parts)) => {
            check_count(parts.len())?;
            for value in parts {
                let name = match value.get("name").and_then(Value::as_str) {
                    Some(n) => part_name(n)?,
                    None => return err("part in array form is missing 'name'"),
                };
                let part = parse_part(&name, value)?;
                if scene.insert(name.clone(), part).is_some() {
                    return err(format!("duplicate part name '{}'", name));
                }
            }
        }
        Some(other) => return err(format!("'parts' must be an object or array, got {}", type_name(other))),
        None => return err("missing 'parts'"),
    }
    Ok(scene)
}

fn check_count(n: usize) -> Result<(), FormatError> {
    if n > MAX_PARTS {
        return err(format!("too many parts: {} (max {})", n, MAX_PARTS));
    }
    Ok(())
}

fn part_name(raw: &str) -> Result<String, FormatError> {
    let name = raw.trim();
    if name.is_empty() {
        return err("part name must not be empty");
    }
    Ok(name.to_string())
}

fn parse_part(name: &str, value: &Value) -> Result<Part, FormatError> {
    let obj = match value {
        Value::Object(obj) => obj,
        other => return err(format!("part '{}' must be an object, got {}", name, type_name(other))),
    };

    let kind = match obj.get("kind").or_else(|| obj.get("type")) {
        Some(Value::String(k)) if !k.trim().is_empty() => ShapeKind::parse(k),
        Some(_) => return err(format!("part '{}' has an invalid 'kind'", name)),
        None => return err(format!("part '{}' is missing 'kind'", name)),
    };
    if !kind.is_supported() {
        warn!(part = name, kind = kind.as_str(), "unrecognized primitive kind");
    }

    let mut part = Part::new(kind);

    match obj.get("params") {
        None | Some(Value::Null) => {}
        Some(Value::Object(params)) => {
            for (key, v) in params {
                let x = finite(v).ok_or_else(|| {
                    FormatError(format!("part '{}' param '{}' is not a finite number", name, key))
                })?;
                part.params.insert(key.clone(), x);
            }
        }
        Some(_) => return err(format!("part '{}' params must be an object", name)),
    }

    match obj.get("transform") {
        None | Some(Value::Null) => {}
        Some(Value::Object(t)) => {
            part.transform = Transform {
                location: vec3(name, "location", t.get("location"), Transform::IDENTITY.location)?,
                rotation: vec3(name, "rotation", t.get("rotation"), Transform::IDENTITY.rotation)?,
                scale: vec3(name, "scale", t.get("scale"), Transform::IDENTITY.scale)?,
            };
        }
        Some(_) => return err(format!("part '{}' transform must be an object", name)),
    }

    Ok(part)
}

fn vec3(part: &str, field: &str, value: Option<&Value>, default: [f64; 3]) -> Result<[f64; 3], FormatError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::Array(items)) if items.len() == 3 => items,
        Some(_) => return err(format!("part '{}' {} must be an array of 3 numbers", part, field)),
    };
    let mut out = [0.0; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = finite(item).ok_or_else(|| {
            FormatError(format!("part '{}' {} contains a non-finite value", part, field))
        })?;
    }
    Ok(out)
}

fn finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|x| x.is_finite())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUG: &str = r#"{"parts": {
        "body": {"kind": "cylinder", "params": {"radius": 0.4, "depth": 1},
                 "transform": {"location": [0, 0, 0.5]}},
        "handle": {"kind": "torus", "params": {"major_radius": 0.25, "minor_radius": 0.05},
                   "transform": {"location": [0.45, 0, 0.5], "rotation": [90, 0, 0]}}
    }}"#;

    #[test]
    fn test_parse_object_form() {
        let scene = parse_scene(MUG).unwrap();
        assert_eq!(scene.len(), 2);
        let handle = scene.get("handle").unwrap();
        assert_eq!(handle.kind, ShapeKind::Torus);
        assert_eq!(handle.transform.rotation, [90.0, 0.0, 0.0]);
        assert_eq!(handle.transform.scale, [1.0, 1.0, 1.0]);
        assert_eq!(scene.get("body").unwrap().param_or("depth", 0.0), 1.0);
    }

    #[test]
    fn test_parse_array_form() {
        let body = r#"{"parts": [{"name": "lid", "kind": "cube", "params": {"size": 2}}]}"#;
        let scene = parse_scene(body).unwrap();
        assert_eq!(scene.get("lid").unwrap().kind, ShapeKind::Cube);
    }

    #[test]
    fn test_parse_fenced_response() {
        let body = format!("```json\n{}\n```", MUG);
        assert_eq!(parse_scene(&body).unwrap(), parse_scene(MUG).unwrap());
    }

    #[test]
    fn test_parse_with_prose() {
        let body = format!("Here is the model:\n{}\nLet me know!", MUG);
        assert_eq!(parse_scene(&body).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let body = r#"{"parts": {"blob": {"kind": "metaball"}}}"#;
        let scene = parse_scene(body).unwrap();
        assert!(!scene.get("blob").unwrap().kind.is_supported());
    }

    #[test]
    fn test_malformed_responses() {
        let cases = [
            "",
            "not json at all",
            "[1, 2, 3]",
            r#"{"objects": {}}"#,
            r#"{"parts": 3}"#,
            r#"{"parts": {"a": 1}}"#,
            r#"{"parts": {"a": {"params": {}}}}"#,
            r#"{"parts": {"a": {"kind": ""}}}"#,
            r#"{"parts": {" ": {"kind": "cube"}}}"#,
            r#"{"parts": {"a": {"kind": "cube", "params": {"size": "big"}}}}"#,
            r#"{"parts": {"a": {"kind": "cube", "transform": {"location": [1, 2]}}}}"#,
            r#"{"parts": [{"kind": "cube"}]}"#,
            r#"{"parts": [{"name": "a", "kind": "cube"}, {"name": "a", "kind": "cube"}]}"#,
        ];
        for body in cases {
            assert!(parse_scene(body).is_err(), "accepted: {}", body);
        }
    }

    #[test]
    fn test_edit_proposal_added() {
        let body = r#"{"parts": {"lid": {"kind": "cube"}}, "added": ["lid"]}"#;
        let proposal = parse_edit_proposal(body).unwrap();
        assert!(proposal.added.contains("lid"));

        let bad = r#"{"parts": {}, "added": "lid"}"#;
        assert!(parse_edit_proposal(bad).is_err());
    }

    #[test]
    fn test_empty_parts_is_valid_scene() {
        let scene = parse_scene(r#"{"parts": {}}"#).unwrap();
        assert!(scene.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_parser_never_panics(body in ".{0,256}") {
            let _ = parse_scene(&body);
            let _ = parse_edit_proposal(&body);
        }
    }
}
