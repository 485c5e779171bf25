//! Shape parameter types and the intersection tests for each into-shape.
//!
//! Each module owns one shape kind and the tests that take that kind as
//! the into-shape, named after the from-shape (`box_solid::from_sphere` is
//! a sphere moving into a box).

pub mod box_solid;
pub mod capsule;
pub mod heightfield;
pub mod inv_sphere;
pub mod line;
pub mod parabola;
pub mod plane;
pub mod polygon;
pub mod sphere;

pub use box_solid::BoxSolid;
pub use capsule::Capsule;
pub use heightfield::Heightfield;
pub use inv_sphere::InvSphere;
pub use line::{Line, Ray, Segment};
pub use parabola::ParabolaArc;
pub use polygon::Polygon;
pub use sphere::Sphere;

use glam::{Mat4, Vec3};

/// Radius of a sphere-like shape after transforming by `mat`.
pub(crate) fn xform_radius(radius: f32, mat: &Mat4) -> f32 {
    mat.transform_vector3(Vec3::new(radius, 0.0, 0.0)).length()
}
