//! OpenSCAD dialect

use sculpt_core::{Part, ShapeKind};

use crate::format::{comment_text, format_number, format_vec3, param};

/// Thickness given to planes, which OpenSCAD has no 2D-in-3D primitive for
const PLANE_THICKNESS: f64 = 0.001;

pub(crate) fn header() -> String {
    "$fn = 64;\n".to_string()
}

fn primitive(part: &Part, p: usize) -> Option<String> {
    let n = |name: &str| format_number(param(part, name), p);
    let body = match part.kind {
        ShapeKind::Cube => format!("cube(size = {}, center = true);", n("size")),
        ShapeKind::Sphere => format!("sphere(r = {});", n("radius")),
        ShapeKind::Cylinder => format!("cylinder(r = {}, h = {}, center = true);", n("radius"), n("depth")),
        ShapeKind::Cone => format!(
            "cylinder(r1 = {}, r2 = {}, h = {}, center = true);",
            n("radius1"),
            n("radius2"),
            n("depth")
        ),
        ShapeKind::Torus => format!(
            "rotate_extrude() translate([{}, 0, 0]) circle(r = {});",
            n("major_radius"),
            n("minor_radius")
        ),
        ShapeKind::Plane => format!(
            "cube([{size}, {size}, {}], center = true);",
            format_number(PLANE_THICKNESS, p.max(3)),
            size = n("size")
        ),
        ShapeKind::Unknown(_) => return None,
    };
    Some(body)
}

pub(crate) fn part(name: &str, part: &Part, precision: usize) -> Option<String> {
    let body = primitive(part, precision)?;
    let t = &part.transform;
    Some(format!(
        "\n// {}\ntranslate([{}]) rotate([{}]) scale([{}])\n    {}\n",
        comment_text(name),
        format_vec3(t.location, precision),
        format_vec3(t.rotation, precision),
        format_vec3(t.scale, precision),
        body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sculpt_core::Transform;

    #[test]
    fn test_torus_uses_rotate_extrude() {
        let p = Part::new(ShapeKind::Torus).with_param("major_radius", 0.25);
        let text = part("handle", &p, 4).unwrap();
        assert!(text.contains("rotate_extrude() translate([0.25, 0, 0]) circle(r = 0.25);"));
    }

    #[test]
    fn test_transform_wraps_primitive() {
        let p = Part::new(ShapeKind::Cube)
            .with_param("size", 1.0)
            .with_transform(Transform::at(1.0, -2.0, 0.0).with_scale(2.0, 1.0, 1.0));
        let text = part("block", &p, 4).unwrap();
        assert!(text.contains("// block\n"));
        assert!(text.contains("translate([1.0, -2.0, 0.0]) rotate([0.0, 0.0, 0.0]) scale([2.0, 1.0, 1.0])"));
        assert!(text.contains("cube(size = 1.0, center = true);"));
    }

    #[test]
    fn test_comment_cannot_break_line() {
        let text = part("a\nb", &Part::new(ShapeKind::Sphere), 4).unwrap();
        assert!(text.contains("// a b\n"));
    }
}
