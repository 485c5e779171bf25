//! Transform and naming components for scene-graph entities.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

/// Placement of a node relative to its parent.
///
/// Collision tests compose these down the [`Parent`] chain into world-space
/// nets, so a moved node is seen by the next traversal without any system
/// having to run first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Translation * rotation * scale.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Inverse of [`to_matrix`](Self::to_matrix) for shear-free matrices.
    pub fn from_matrix(mat: Mat4) -> Self {
        let (scale, rotation, position) = mat.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// True if no component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// The local transform an entity had at the start of the previous frame.
///
/// Swept collision tests interpolate from here to the current [`Transform`].
/// Entities without it are treated as stationary.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PrevTransform(pub Transform);

/// The node this one hangs from. Nodes without it are roots.
pub struct Parent(pub hecs::Entity);

/// Nodes hanging from this one, kept in sync by
/// [`attach_child`](crate::ecs::hierarchy::attach_child).
pub struct Children(pub Vec<hecs::Entity>);

/// Human-readable node name, substituted into collision event names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Free-form string tags, queried by collision event patterns.
#[derive(Debug, Clone, Default)]
pub struct Tags(pub HashMap<String, String>);

impl Tags {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = Transform::identity();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_to_matrix_roundtrip() {
        let original = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_4),
            scale: Vec3::new(2.0, 1.5, 0.5),
        };

        let recovered = Transform::from_matrix(original.to_matrix());

        let eps = 1e-5;
        assert!((original.position - recovered.position).length() < eps);
        // Quaternion can be negated and still represent the same rotation
        let dot = original.rotation.dot(recovered.rotation).abs();
        assert!((dot - 1.0).abs() < eps);
        assert!((original.scale - recovered.scale).length() < eps);
    }

    #[test]
    fn test_non_finite() {
        let mut t = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        assert!(t.is_finite());
        t.position.y = f32::NAN;
        assert!(!t.is_finite());
    }

    #[test]
    fn test_tags() {
        let tags = Tags::default().with("team", "red");
        assert_eq!(tags.get("team"), Some("red"));
        assert_eq!(tags.get("role"), None);
    }
}
