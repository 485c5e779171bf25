//! Inverted spheres: solid everywhere except inside the sphere. Useful for
//! keeping things inside a bounded region.

use glam::{Mat4, Vec3};

use crate::collide::contact::CollisionEntry;
use crate::math::{sphere_intersects_line, NEAR_ZERO};

use super::capsule::Capsule;
use super::line::{Extent, Line, LineProbe, Ray, Segment};
use super::sphere::Sphere;
use super::xform_radius;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvSphere {
    center: Vec3,
    radius: f32,
}

impl InvSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        debug_assert!(radius >= 0.0, "negative sphere radius");
        Self { center, radius }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_center(&mut self, center: Vec3) {
        self.center = center;
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    pub(crate) fn xform(&mut self, mat: &Mat4) {
        self.center = mat.transform_point3(self.center);
        self.radius = xform_radius(self.radius, mat);
    }

    /// Normal pointing back toward the center from `point`.
    fn inward_normal(&self, point: Vec3) -> Vec3 {
        (self.center - point).try_normalize().unwrap_or(Vec3::Z)
    }

    /// Contact for a ball of radius `radius` at `point` poking outside.
    fn ball_contact(&self, point: Vec3, radius: f32, entry: &CollisionEntry) -> Option<CollisionEntry> {
        let dist = point.distance(self.center);
        if dist + radius <= self.radius {
            return None;
        }
        let normal = if dist > NEAR_ZERO {
            (self.center - point) / dist
        } else {
            Vec3::Z
        };
        let normal = entry.pick_normal(normal);

        let mut hit = entry.hit();
        hit.set_surface_normal(normal);
        hit.set_surface_point(self.center - normal * self.radius);
        hit.set_interior_point(point - normal * radius);
        hit.set_depth(dist + radius - self.radius);
        Some(hit)
    }
}

pub fn from_sphere(from: &Sphere, into: &InvSphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let center = entry.wrt().transform_point3(from.center());
    let radius = xform_radius(from.radius(), entry.wrt());
    into.ball_contact(center, radius, entry)
}

pub fn from_capsule(from: &Capsule, into: &InvSphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let a = entry.wrt().transform_point3(from.point_a());
    let b = entry.wrt().transform_point3(from.point_b());
    let radius = xform_radius(from.radius(), entry.wrt());
    let farthest = if a.distance_squared(into.center) >= b.distance_squared(into.center) {
        a
    } else {
        b
    };
    into.ball_contact(farthest, radius, entry)
}

/// Lines always reach the solid outside. Probes that start outside touch
/// it at their origin; those starting inside touch it where they leave.
fn from_linear(probe: LineProbe, into: &InvSphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let t = if probe.is_degenerate() {
        if probe.origin.distance(into.center) <= into.radius {
            return None;
        }
        0.0
    } else {
        match (probe.extent, sphere_intersects_line(into.center, into.radius, probe.origin, probe.direction, 0.0)) {
            (Extent::Line, Some((_, t2))) => t2,
            (_, Some((t1, t2))) if t1 <= 0.0 && t2 >= 0.0 => t2,
            _ => 0.0,
        }
    };
    if !probe.contains_t(t) {
        return None;
    }

    let point = probe.point_at(t);
    let mut hit = entry.hit();
    hit.set_surface_point(point);
    hit.set_surface_normal(entry.pick_normal(into.inward_normal(point)));
    hit.set_t(t);
    Some(hit)
}

pub fn from_ray(from: &Ray, into: &InvSphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_ray(from, entry), into, entry)
}

pub fn from_line(from: &Line, into: &InvSphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_line(from, entry), into, entry)
}

pub fn from_segment(from: &Segment, into: &InvSphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_segment(from, entry), into, entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collide::testing::collide;
    use crate::collide::Shape;

    fn arena() -> Shape {
        Shape::inv_sphere(Vec3::ZERO, 10.0)
    }

    #[test]
    fn test_sphere_inside_is_clear() {
        let from = Shape::sphere(Vec3::new(5.0, 0.0, 0.0), 1.0);
        assert!(collide(&from, &arena()).is_none());
    }

    #[test]
    fn test_sphere_poking_out() {
        let from = Shape::sphere(Vec3::new(9.5, 0.0, 0.0), 1.0);
        let hit = collide(&from, &arena()).unwrap();
        assert!((hit.depth().unwrap() - 0.5).abs() < 1e-5);
        assert!((hit.surface_normal().unwrap() + Vec3::X).length() < 1e-5);
        assert!((hit.surface_point().unwrap() - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);
        assert!((hit.interior_point().unwrap() - Vec3::new(10.5, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_capsule_uses_farthest_end() {
        let from = Shape::capsule(Vec3::ZERO, Vec3::new(0.0, 9.5, 0.0), 1.0);
        let hit = collide(&from, &arena()).unwrap();
        assert!((hit.depth().unwrap() - 0.5).abs() < 1e-5);
        assert!((hit.surface_normal().unwrap() + Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_ray_from_inside_exits() {
        let from = Shape::ray(Vec3::ZERO, Vec3::Z);
        let hit = collide(&from, &arena()).unwrap();
        assert!((hit.surface_point().unwrap() - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-4);
        assert!((hit.t() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_ray_from_outside_touches_at_origin() {
        let from = Shape::ray(Vec3::new(20.0, 0.0, 0.0), -Vec3::X);
        let hit = collide(&from, &arena()).unwrap();
        assert_eq!(hit.t(), 0.0);
        assert!((hit.surface_point().unwrap() - Vec3::new(20.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_segment_inside_is_clear() {
        let short = Shape::segment(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0));
        assert!(collide(&short, &arena()).is_none());

        let long = Shape::segment(Vec3::ZERO, Vec3::new(0.0, 0.0, 20.0));
        let hit = collide(&long, &arena()).unwrap();
        assert!((hit.t() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_line_always_hits() {
        let from = Shape::line(Vec3::ZERO, Vec3::X);
        let hit = collide(&from, &arena()).unwrap();
        assert!((hit.surface_point().unwrap() - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
    }
}
