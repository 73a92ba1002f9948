//! SCULPT Script - Procedural script emission
//!
//! This crate renders scene descriptions into executable modeling scripts:
//! - Blender Python (`bpy.ops.mesh.primitive_*_add`)
//! - OpenSCAD (CSG primitives with transforms)
//!
//! Output depends only on the scene, never on version metadata.

pub mod format;
pub mod emitter;
mod blender;
mod openscad;

pub use format::*;
pub use emitter::*;
