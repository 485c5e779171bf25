//! Spheres, and every test that takes a sphere as the into-shape.

use glam::{Mat4, Vec3};

use crate::collide::contact::CollisionEntry;
use crate::math::{closest_point_on_segment, sphere_intersects_line, NEAR_ZERO};

use super::box_solid::BoxSolid;
use super::capsule::Capsule;
use super::line::{Line, LineProbe, Ray, Segment};
use super::parabola::{first_chord_hit, ParabolaArc};
use super::xform_radius;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
}

impl Sphere {
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

    /// Outward normal at the surface point nearest `point`.
    fn normal_toward(&self, point: Vec3) -> Vec3 {
        (point - self.center).try_normalize().unwrap_or(Vec3::Z)
    }
}

/// Where a moving sphere's center sits at the start and end of the frame,
/// in the into-shape's space.
pub(crate) struct SphereMotion {
    pub from_a: Vec3,
    pub from_b: Vec3,
    pub radius: f32,
}

impl SphereMotion {
    pub fn new(sphere: &Sphere, entry: &CollisionEntry) -> Self {
        let from_b = entry.wrt().transform_point3(sphere.center);
        let from_a = if entry.has_prev() {
            entry.wrt_prev().transform_point3(sphere.center)
        } else {
            from_b
        };
        Self {
            from_a,
            from_b,
            radius: xform_radius(sphere.radius, entry.wrt()),
        }
    }

    pub fn delta(&self) -> Vec3 {
        self.from_b - self.from_a
    }
}

pub fn from_sphere(from: &Sphere, into: &Sphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let motion = SphereMotion::new(from, entry);
    let delta = motion.delta();

    let (t1, t2) = sphere_intersects_line(into.center, into.radius, motion.from_a, delta, motion.radius)?;
    if t2 < 0.0 || t1 > 1.0 {
        return None;
    }

    let actual_t = t1.clamp(0.0, 1.0);
    let contact_point = motion.from_a + delta * actual_t;

    // Deepest point along the sweep: the end position, or the exit point if
    // the sweep passes all the way through.
    let into_point = if t2 > 1.0 {
        motion.from_b
    } else {
        motion.from_a + delta * t2
    };

    let dist = into_point.distance(into.center);
    let normal = entry.pick_normal(into.normal_toward(into_point));

    let mut hit = entry.hit();
    hit.set_surface_normal(normal);
    hit.set_surface_point(into.center + normal * into.radius);
    hit.set_interior_point(into_point - normal * motion.radius);
    hit.set_depth(into.radius + motion.radius - dist);
    hit.set_contact_pos(contact_point);
    hit.set_contact_normal(into.normal_toward(contact_point));
    hit.set_t(actual_t);
    Some(hit)
}

fn from_linear(probe: LineProbe, into: &Sphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    if probe.is_degenerate() {
        return None;
    }
    let (t1, t2) = sphere_intersects_line(into.center, into.radius, probe.origin, probe.direction, 0.0)?;
    let t = probe.first_hit(t1, t2)?;

    let point = probe.point_at(t);
    let mut hit = entry.hit();
    hit.set_surface_point(point);
    hit.set_surface_normal(entry.pick_normal(into.normal_toward(point)));
    hit.set_t(t);
    Some(hit)
}

pub fn from_ray(from: &Ray, into: &Sphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_ray(from, entry), into, entry)
}

pub fn from_line(from: &Line, into: &Sphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_line(from, entry), into, entry)
}

pub fn from_segment(from: &Segment, into: &Sphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_segment(from, entry), into, entry)
}

pub fn from_capsule(from: &Capsule, into: &Sphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let a = entry.wrt().transform_point3(from.point_a());
    let b = entry.wrt().transform_point3(from.point_b());
    let from_radius = xform_radius(from.radius(), entry.wrt());

    let (closest, _) = closest_point_on_segment(a, b, into.center);
    let dist = closest.distance(into.center);
    if dist > into.radius + from_radius {
        return None;
    }

    let normal = if dist > NEAR_ZERO {
        (closest - into.center) / dist
    } else {
        // Axis passes through the center: push perpendicular to it.
        (b - a).any_orthonormal_vector()
    };
    let normal = entry.pick_normal(normal);

    let mut hit = entry.hit();
    hit.set_surface_normal(normal);
    hit.set_surface_point(into.center + normal * into.radius);
    hit.set_interior_point(closest - normal * from_radius);
    hit.set_depth(into.radius + from_radius - dist);
    Some(hit)
}

pub fn from_box(from: &BoxSolid, into: &Sphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let frame = from.frame_in(entry.wrt());
    let local_center = frame.to_local(into.center);
    let half = frame.half_extents();
    let clamped = local_center.clamp(-half, half);
    let to_box = clamped - local_center;
    let dist = to_box.length();
    if dist > into.radius {
        return None;
    }

    let mut hit = entry.hit();
    if dist > NEAR_ZERO {
        // Sphere center outside the box: the closest box point is the deepest.
        let normal = entry.pick_normal(frame.vector_from_local(to_box / dist));
        hit.set_surface_normal(normal);
        hit.set_surface_point(into.center + normal * into.radius);
        hit.set_interior_point(frame.from_local(clamped));
        hit.set_depth(into.radius - dist);
    } else {
        // Sphere center inside the box: leave through the nearest face.
        let (axis, sign, pen) = frame.nearest_face(local_center);
        let mut local_normal = Vec3::ZERO;
        local_normal[axis] = -sign;
        let normal = entry.pick_normal(frame.vector_from_local(local_normal));
        let surface = into.center + normal * into.radius;
        let depth = into.radius + pen;
        hit.set_surface_normal(normal);
        hit.set_surface_point(surface);
        hit.set_interior_point(surface - normal * depth);
        hit.set_depth(depth);
    }
    Some(hit)
}

pub fn from_parabola(from: &ParabolaArc, into: &Sphere, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let local = from.parabola().xform(entry.wrt());
    let t = first_chord_hit(&local, from.t1(), from.t2(), |p1, p2| {
        let (t1, t2) = sphere_intersects_line(into.center, into.radius, p1, p2 - p1, 0.0)?;
        if t2 < 0.0 || t1 > 1.0 {
            return None;
        }
        Some(t1.max(0.0))
    })?;

    let point = local.calc_point(t);
    let mut hit = entry.hit();
    hit.set_surface_point(point);
    hit.set_surface_normal(entry.pick_normal(into.normal_toward(point)));
    hit.set_t(t);
    Some(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collide::testing::{collide, collide_moving};
    use crate::collide::Shape;
    use crate::math::Parabola;

    #[test]
    fn test_sphere_sphere_contact_iff_within_radius_sum() {
        let into = Shape::sphere(Vec3::ZERO, 1.0);
        for &(x, expect) in &[(2.9, true), (3.0, true), (3.01, false), (0.0, true), (1.0, true)] {
            let from = Shape::sphere(Vec3::new(x, 0.0, 0.0), 2.0);
            let hit = collide(&from, &into);
            assert_eq!(hit.is_some(), expect, "distance {x}");
            if let Some(hit) = hit {
                assert!((hit.depth().unwrap() - (3.0 - x)).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_sphere_sphere_depth_zero_at_boundary() {
        let into = Shape::sphere(Vec3::ZERO, 1.5);
        let from = Shape::sphere(Vec3::new(0.0, 2.0, 0.0), 0.5);
        let hit = collide(&from, &into).unwrap();
        assert!(hit.depth().unwrap().abs() < 1e-5);
        assert!((hit.surface_normal().unwrap() - Vec3::Y).length() < 1e-5);
        assert!((hit.surface_point().unwrap() - Vec3::new(0.0, 1.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_swept_sphere_reports_time_of_impact() {
        // Moves from x = -10 to x = 10 straight through a unit sphere.
        let into = Shape::sphere(Vec3::ZERO, 1.0);
        let from = Shape::sphere(Vec3::ZERO, 1.0);
        let hit = collide_moving(
            &from,
            &into,
            Mat4::from_translation(Vec3::new(-10.0, 0.0, 0.0)),
            Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
        )
        .unwrap();
        // Contact when the centers are 2 apart: x = -2, t = 8/20.
        assert!((hit.t() - 0.4).abs() < 1e-5);
        assert!((hit.contact_pos().unwrap() - Vec3::new(-2.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_ray_hits_near_side() {
        let into = Shape::sphere(Vec3::ZERO, 1.0);
        let from = Shape::ray(Vec3::new(-5.0, 0.0, 0.0), Vec3::X);
        let hit = collide(&from, &into).unwrap();
        assert!((hit.surface_point().unwrap() - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((hit.surface_normal().unwrap() + Vec3::X).length() < 1e-5);

        let away = Shape::ray(Vec3::new(-5.0, 0.0, 0.0), -Vec3::X);
        assert!(collide(&away, &into).is_none());
    }

    #[test]
    fn test_segment_range() {
        let into = Shape::sphere(Vec3::ZERO, 1.0);
        let short = Shape::segment(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(-3.0, 0.0, 0.0));
        assert!(collide(&short, &into).is_none());

        let long = Shape::segment(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0));
        let hit = collide(&long, &into).unwrap();
        assert!((hit.t() - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_line_hits_behind_origin() {
        let into = Shape::sphere(Vec3::ZERO, 1.0);
        let from = Shape::line(Vec3::new(5.0, 0.0, 0.0), Vec3::X);
        let hit = collide(&from, &into).unwrap();
        assert!(hit.t() < 0.0);
    }

    #[test]
    fn test_capsule_into_sphere() {
        let into = Shape::sphere(Vec3::ZERO, 1.0);
        let from = Shape::capsule(Vec3::new(1.25, -3.0, 0.0), Vec3::new(1.25, 3.0, 0.0), 0.5);
        let hit = collide(&from, &into).unwrap();
        assert!((hit.depth().unwrap() - 0.25).abs() < 1e-5);
        assert!((hit.surface_normal().unwrap() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_box_into_sphere() {
        let into = Shape::sphere(Vec3::ZERO, 1.0);
        let from = Shape::cuboid(Vec3::new(0.5, -1.0, -1.0), Vec3::new(2.5, 1.0, 1.0));
        let hit = collide(&from, &into).unwrap();
        assert!((hit.surface_normal().unwrap() - Vec3::X).length() < 1e-5);
        assert!((hit.depth().unwrap() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_parabola_into_sphere() {
        let into = Shape::sphere(Vec3::new(5.0, 0.0, 0.0), 1.0);
        let arc = Parabola::from_launch(Vec3::ZERO, Vec3::new(5.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -10.0));
        let from = Shape::parabola(arc, 0.0, 2.0);
        let hit = collide(&from, &into).unwrap();
        // Lands back at z = 0 when x = 5; contact comes a little earlier.
        assert!(hit.t() > 0.7 && hit.t() < 1.0, "t = {}", hit.t());
        let p = hit.surface_point().unwrap();
        assert!((p.distance(Vec3::new(5.0, 0.0, 0.0)) - 1.0).abs() < 0.05);
    }
}
