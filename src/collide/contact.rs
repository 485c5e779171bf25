//! Collision entries: one record per confirmed shape-pair intersection.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::math::Plane;

use super::shape::Shape;

/// One side of a tested pair: a shape plus where it sits in the scene.
#[derive(Debug, Clone)]
pub struct EntrySide {
    pub shape: Arc<Shape>,
    /// Entity carrying the shape's [`CollisionNode`](crate::ecs::components::CollisionNode).
    pub node: hecs::Entity,
    /// Index of the shape within its node.
    pub index: usize,
    /// Net transform of the node relative to the traversal root.
    pub net: Mat4,
    /// The same, as of the previous frame.
    pub prev_net: Mat4,
}

/// A tested (from, into) pair and, once a test confirms contact, the
/// contact geometry.
///
/// Points and normals are stored in the into-shape's space. The `*_in`
/// accessors re-express them relative to any other node, given that node's
/// net transform.
#[derive(Debug, Clone)]
pub struct CollisionEntry {
    from: EntrySide,
    into: EntrySide,
    wrt: Mat4,
    wrt_prev: Mat4,
    respect_prev_transform: bool,
    into_clip_planes: Option<Arc<[Plane]>>,

    surface_point: Option<Vec3>,
    surface_normal: Option<Vec3>,
    interior_point: Option<Vec3>,
    depth: Option<f32>,
    contact_pos: Option<Vec3>,
    contact_normal: Option<Vec3>,
    t: f32,
}

impl CollisionEntry {
    /// Build a probe for testing `from` against `into`.
    ///
    /// With `respect_prev_transform` off the previous-frame transforms are
    /// ignored and every test is static.
    pub fn new(from: EntrySide, into: EntrySide, respect_prev_transform: bool) -> Self {
        let into_inv = into.net.inverse();
        let wrt = into_inv * from.net;
        let wrt_prev = if respect_prev_transform {
            into.prev_net.inverse() * from.prev_net
        } else {
            wrt
        };
        Self {
            from,
            into,
            wrt,
            wrt_prev,
            respect_prev_transform,
            into_clip_planes: None,
            surface_point: None,
            surface_normal: None,
            interior_point: None,
            depth: None,
            contact_pos: None,
            contact_normal: None,
            t: 0.0,
        }
    }

    /// Attach clip planes, given in the into-node's space.
    pub fn with_into_clip_planes(mut self, planes: Arc<[Plane]>) -> Self {
        self.into_clip_planes = Some(planes);
        self
    }

    /// A copy of this probe with no contact data, ready to be filled in.
    pub fn hit(&self) -> Self {
        Self {
            from: self.from.clone(),
            into: self.into.clone(),
            wrt: self.wrt,
            wrt_prev: self.wrt_prev,
            respect_prev_transform: self.respect_prev_transform,
            into_clip_planes: self.into_clip_planes.clone(),
            surface_point: None,
            surface_normal: None,
            interior_point: None,
            depth: None,
            contact_pos: None,
            contact_normal: None,
            t: 0.0,
        }
    }

    /// A probe for the same pair with the from-node moved to new current and
    /// previous net transforms. Previous transforms are always respected.
    pub fn with_from_transforms(&self, net: Mat4, prev_net: Mat4) -> Self {
        let mut from = self.from.clone();
        from.net = net;
        from.prev_net = prev_net;
        let mut probe = CollisionEntry::new(from, self.into.clone(), true);
        probe.into_clip_planes = self.into_clip_planes.clone();
        probe
    }

    pub fn from_shape(&self) -> &Arc<Shape> {
        &self.from.shape
    }

    pub fn into_shape(&self) -> &Arc<Shape> {
        &self.into.shape
    }

    pub fn from_side(&self) -> &EntrySide {
        &self.from
    }

    pub fn into_side(&self) -> &EntrySide {
        &self.into
    }

    pub fn from_node(&self) -> hecs::Entity {
        self.from.node
    }

    pub fn into_node(&self) -> hecs::Entity {
        self.into.node
    }

    /// Matrix taking from-shape space into into-shape space.
    pub fn wrt(&self) -> &Mat4 {
        &self.wrt
    }

    /// [`Self::wrt`] as of the previous frame.
    pub fn wrt_prev(&self) -> &Mat4 {
        &self.wrt_prev
    }

    /// True when the from-shape moved relative to the into-shape since the
    /// previous frame, so swept tests apply.
    pub fn has_prev(&self) -> bool {
        self.wrt_prev != self.wrt
    }

    pub fn into_clip_planes(&self) -> Option<&[Plane]> {
        self.into_clip_planes.as_deref()
    }

    /// The into-shape's effective normal if the from-shape respects it,
    /// otherwise `computed`.
    pub fn pick_normal(&self, computed: Vec3) -> Vec3 {
        match self.into.shape.effective_normal() {
            Some(normal) if self.from.shape.respect_effective_normal() => normal,
            _ => computed,
        }
    }

    /// True when both shapes are tangible.
    pub fn is_tangible(&self) -> bool {
        self.from.shape.is_tangible() && self.into.shape.is_tangible()
    }

    pub fn set_surface_point(&mut self, point: Vec3) {
        self.surface_point = Some(point);
    }

    pub fn set_surface_normal(&mut self, normal: Vec3) {
        self.surface_normal = Some(normal);
    }

    pub fn set_interior_point(&mut self, point: Vec3) {
        self.interior_point = Some(point);
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = Some(depth);
    }

    pub fn set_contact_pos(&mut self, pos: Vec3) {
        self.contact_pos = Some(pos);
    }

    pub fn set_contact_normal(&mut self, normal: Vec3) {
        self.contact_normal = Some(normal);
    }

    pub fn set_t(&mut self, t: f32) {
        self.t = t;
    }

    pub fn surface_point(&self) -> Option<Vec3> {
        self.surface_point
    }

    pub fn surface_normal(&self) -> Option<Vec3> {
        self.surface_normal
    }

    pub fn interior_point(&self) -> Option<Vec3> {
        self.interior_point
    }

    /// Penetration depth along the surface normal.
    ///
    /// Falls back to projecting `surface - interior` onto the normal when the
    /// test did not record a depth directly.
    pub fn depth(&self) -> Option<f32> {
        self.depth.or_else(|| {
            let (s, n, i) = (self.surface_point?, self.surface_normal?, self.interior_point?);
            Some((s - i).dot(n))
        })
    }

    pub fn contact_pos(&self) -> Option<Vec3> {
        self.contact_pos
    }

    pub fn contact_normal(&self) -> Option<Vec3> {
        self.contact_normal
    }

    /// Fraction of the frame's motion at which contact began.
    pub fn t(&self) -> f32 {
        self.t
    }

    /// Matrix taking into-shape space to the space of a node with net
    /// transform `space`.
    fn into_to(&self, space: &Mat4) -> Mat4 {
        space.inverse() * self.into.net
    }

    pub fn surface_point_in(&self, space: &Mat4) -> Option<Vec3> {
        Some(self.into_to(space).transform_point3(self.surface_point?))
    }

    pub fn surface_normal_in(&self, space: &Mat4) -> Option<Vec3> {
        Some(
            self.into_to(space)
                .transform_vector3(self.surface_normal?)
                .normalize_or_zero(),
        )
    }

    pub fn interior_point_in(&self, space: &Mat4) -> Option<Vec3> {
        Some(self.into_to(space).transform_point3(self.interior_point?))
    }

    pub fn contact_pos_in(&self, space: &Mat4) -> Option<Vec3> {
        Some(self.into_to(space).transform_point3(self.contact_pos?))
    }

    pub fn contact_normal_in(&self, space: &Mat4) -> Option<Vec3> {
        Some(
            self.into_to(space)
                .transform_vector3(self.contact_normal?)
                .normalize_or_zero(),
        )
    }

    /// Surface point, surface normal and interior point, all relative to
    /// `space`. `None` unless all three were computed.
    pub fn all_in(&self, space: &Mat4) -> Option<(Vec3, Vec3, Vec3)> {
        Some((
            self.surface_point_in(space)?,
            self.surface_normal_in(space)?,
            self.interior_point_in(space)?,
        ))
    }

    /// Contact position and normal relative to `space`.
    pub fn all_contact_info_in(&self, space: &Mat4) -> Option<(Vec3, Vec3)> {
        Some((self.contact_pos_in(space)?, self.contact_normal_in(space)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(world: &mut hecs::World, shape: Shape, net: Mat4) -> EntrySide {
        EntrySide {
            shape: Arc::new(shape),
            node: world.spawn(()),
            index: 0,
            net,
            prev_net: net,
        }
    }

    #[test]
    fn test_wrt_matrix() {
        let mut world = hecs::World::new();
        let from = side(&mut world, Shape::sphere(Vec3::ZERO, 1.0), Mat4::from_translation(Vec3::X * 5.0));
        let into = side(&mut world, Shape::sphere(Vec3::ZERO, 1.0), Mat4::from_translation(Vec3::X * 2.0));
        let entry = CollisionEntry::new(from, into, false);
        let p = entry.wrt().transform_point3(Vec3::ZERO);
        assert!((p - Vec3::X * 3.0).length() < 1e-5);
        assert!(!entry.has_prev());
    }

    #[test]
    fn test_has_prev() {
        let mut world = hecs::World::new();
        let mut from = side(&mut world, Shape::sphere(Vec3::ZERO, 1.0), Mat4::from_translation(Vec3::X));
        from.prev_net = Mat4::IDENTITY;
        let into = side(&mut world, Shape::sphere(Vec3::ZERO, 1.0), Mat4::IDENTITY);
        assert!(CollisionEntry::new(from.clone(), into.clone(), true).has_prev());
        assert!(!CollisionEntry::new(from, into, false).has_prev());
    }

    #[test]
    fn test_space_conversion_and_depth() {
        let mut world = hecs::World::new();
        let from = side(&mut world, Shape::sphere(Vec3::ZERO, 1.0), Mat4::IDENTITY);
        let into = side(&mut world, Shape::sphere(Vec3::ZERO, 1.0), Mat4::from_translation(Vec3::Z * 10.0));
        let mut entry = CollisionEntry::new(from, into, false).hit();
        entry.set_surface_point(Vec3::new(0.0, 0.0, 1.0));
        entry.set_surface_normal(Vec3::Z);
        entry.set_interior_point(Vec3::new(0.0, 0.0, 0.25));

        let world_point = entry.surface_point_in(&Mat4::IDENTITY).unwrap();
        assert!((world_point - Vec3::new(0.0, 0.0, 11.0)).length() < 1e-5);
        assert!((entry.depth().unwrap() - 0.75).abs() < 1e-6);

        entry.set_depth(0.5);
        assert_eq!(entry.depth(), Some(0.5));
        assert!(entry.all_contact_info_in(&Mat4::IDENTITY).is_none());
    }
}
