//! Scene builders

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sculpt_core::{Part, SceneDescription, ShapeKind, Transform};

/// Single unit cube resting on the origin
pub fn unit_cube() -> SceneDescription {
    SceneDescription::new().with_part(
        "block",
        Part::new(ShapeKind::Cube)
            .with_param("size", 1.0)
            .with_transform(Transform::at(0.0, 0.0, 0.5)),
    )
}

/// Cylinder body with a torus handle
pub fn mug() -> SceneDescription {
    SceneDescription::new()
        .with_part(
            "body",
            Part::new(ShapeKind::Cylinder)
                .with_param("radius", 0.4)
                .with_param("depth", 1.0)
                .with_transform(Transform::at(0.0, 0.0, 0.5)),
        )
        .with_part(
            "handle",
            Part::new(ShapeKind::Torus)
                .with_param("major_radius", 0.25)
                .with_param("minor_radius", 0.05)
                .with_transform(Transform::at(0.45, 0.0, 0.5).with_rotation(90.0, 0.0, 0.0)),
        )
}

/// Copy of `scene` with every part stretched along Z by `factor`
pub fn stretched(scene: &SceneDescription, factor: f64) -> SceneDescription {
    let mut out = scene.clone();
    for part in out.parts.values_mut() {
        part.transform.scale[2] *= factor;
        part.transform.location[2] *= factor;
    }
    out
}

/// Seeded scene of `parts` supported primitives
pub fn random_scene(parts: usize, seed: u64) -> SceneDescription {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = SceneDescription::new();
    for i in 0..parts {
        let kind = ShapeKind::SUPPORTED[rng.gen_range(0..ShapeKind::SUPPORTED.len())].clone();
        let mut v = || rng.gen_range(-5.0..5.0);
        let transform = Transform::at(v(), v(), v())
            .with_rotation(v() * 36.0, v() * 36.0, v() * 36.0)
            .with_scale(v().abs() + 0.1, v().abs() + 0.1, v().abs() + 0.1);
        let part = Part::new(kind)
            .with_param("size", rng.gen_range(0.1..3.0))
            .with_param("radius", rng.gen_range(0.1..2.0))
            .with_param("depth", rng.gen_range(0.1..4.0))
            .with_transform(transform);
        scene.insert(format!("part_{:03}", i), part);
    }
    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretched_changes_scene() {
        let tall = stretched(&mug(), 2.0);
        assert_ne!(tall, mug());
        assert_eq!(tall.get("body").unwrap().transform.scale, [1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_random_scene_is_seeded() {
        assert_eq!(random_scene(16, 3), random_scene(16, 3));
        assert_ne!(random_scene(16, 3), random_scene(16, 4));
        assert_eq!(random_scene(16, 3).len(), 16);
    }
}
