//! Blender Python dialect

use sculpt_core::{Part, ShapeKind};

use crate::format::{format_number, format_vec3, param, quote};

pub(crate) fn header() -> String {
    let mut out = String::new();
    out.push_str("import bpy\n");
    out.push_str("import math\n\n");
    out.push_str("bpy.ops.object.select_all(action='SELECT')\n");
    out.push_str("bpy.ops.object.delete(use_global=False)\n\n");
    out.push_str("def place(name, rotation, scale):\n");
    out.push_str("    obj = bpy.context.active_object\n");
    out.push_str("    obj.name = name\n");
    out.push_str("    obj.rotation_euler = tuple(math.radians(a) for a in rotation)\n");
    out.push_str("    obj.scale = scale\n");
    out.push_str("    return obj\n");
    out
}

/// Operator call for a supported primitive
fn operator(part: &Part, p: usize) -> Option<String> {
    let n = |name: &str| format_number(param(part, name), p);
    let call = match part.kind {
        ShapeKind::Cube => format!("primitive_cube_add(size={}", n("size")),
        ShapeKind::Sphere => format!("primitive_uv_sphere_add(radius={}", n("radius")),
        ShapeKind::Cylinder => format!("primitive_cylinder_add(radius={}, depth={}", n("radius"), n("depth")),
        ShapeKind::Cone => format!(
            "primitive_cone_add(radius1={}, radius2={}, depth={}",
            n("radius1"),
            n("radius2"),
            n("depth")
        ),
        ShapeKind::Torus => format!(
            "primitive_torus_add(major_radius={}, minor_radius={}",
            n("major_radius"),
            n("minor_radius")
        ),
        ShapeKind::Plane => format!("primitive_plane_add(size={}", n("size")),
        ShapeKind::Unknown(_) => return None,
    };
    Some(call)
}

pub(crate) fn part(name: &str, part: &Part, precision: usize) -> Option<String> {
    let call = operator(part, precision)?;
    let t = &part.transform;
    Some(format!(
        "\nbpy.ops.mesh.{}, location=({}))\nplace({}, ({}), ({}))\n",
        call,
        format_vec3(t.location, precision),
        quote(name),
        format_vec3(t.rotation, precision),
        format_vec3(t.scale, precision),
    ))
}
