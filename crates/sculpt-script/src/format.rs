//! Number and identifier formatting shared by both dialects

use sculpt_core::{Part, ShapeKind};

/// Decimal places used unless configured otherwise
pub const DEFAULT_PRECISION: usize = 4;

/// Fixed-precision decimal with trailing zeros trimmed.
///
/// `-0` (including values that round to zero) prints as `0.0`.
pub fn format_number(x: f64, precision: usize) -> String {
    if !x.is_finite() {
        return "0.0".to_string();
    }
    let mut s = format!("{:.*}", precision, x);
    if s.starts_with('-') && s[1..].bytes().all(|b| b == b'0' || b == b'.') {
        s.remove(0);
    }
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').len();
        s.truncate(trimmed);
        if s.ends_with('.') {
            s.push('0');
        }
    } else {
        s.push_str(".0");
    }
    s
}

/// `[x, y, z]` / `(x, y, z)` body, without brackets
pub fn format_vec3(v: [f64; 3], precision: usize) -> String {
    format!(
        "{}, {}, {}",
        format_number(v[0], precision),
        format_number(v[1], precision),
        format_number(v[2], precision)
    )
}

/// Double-quoted string literal valid in both Python and OpenSCAD
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Single-line comment text; control characters become spaces
pub fn comment_text(s: &str) -> String {
    s.chars().map(|c| if c.is_control() { ' ' } else { c }).collect()
}

/// Parameter names and defaults per primitive
pub fn param_defaults(kind: &ShapeKind) -> &'static [(&'static str, f64)] {
    match kind {
        ShapeKind::Cube => &[("size", 2.0)],
        ShapeKind::Sphere => &[("radius", 1.0)],
        ShapeKind::Cylinder => &[("radius", 1.0), ("depth", 2.0)],
        ShapeKind::Cone => &[("radius1", 1.0), ("radius2", 0.0), ("depth", 2.0)],
        ShapeKind::Torus => &[("major_radius", 1.0), ("minor_radius", 0.25)],
        ShapeKind::Plane => &[("size", 2.0)],
        ShapeKind::Unknown(_) => &[],
    }
}

/// Parameter value with the primitive's default applied
pub fn param(part: &Part, name: &str) -> f64 {
    let default = param_defaults(&part.kind)
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
        .unwrap_or(0.0);
    part.param_or(name, default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0, 4), "1.0");
        assert_eq!(format_number(0.25, 4), "0.25");
        assert_eq!(format_number(-0.5, 4), "-0.5");
        assert_eq!(format_number(1.0 / 3.0, 4), "0.3333");
        assert_eq!(format_number(12.0, 0), "12.0");
    }

    #[test]
    fn test_negative_zero_normalized() {
        assert_eq!(format_number(-0.0, 4), "0.0");
        assert_eq!(format_number(-0.00001, 4), "0.0");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("lid"), "\"lid\"");
        assert_eq!(quote("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
    }

    #[test]
    fn test_param_defaults() {
        let cone = Part::new(ShapeKind::Cone).with_param("depth", 3.0);
        assert_eq!(param(&cone, "depth"), 3.0);
        assert_eq!(param(&cone, "radius1"), 1.0);
        assert_eq!(param(&cone, "radius2"), 0.0);
    }
}
