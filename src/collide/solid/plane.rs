//! Infinite planes, solid behind their normal.
//!
//! The shape itself is [`crate::math::Plane`]. This module holds the tests
//! taking a plane as the into-shape, plus the sphere sweep that polygons
//! share.

use glam::Vec3;

use crate::collide::contact::CollisionEntry;
use crate::math::{Plane, NEAR_ZERO};

use super::box_solid::BoxSolid;
use super::capsule::Capsule;
use super::line::{Line, LineProbe, Ray, Segment};
use super::parabola::ParabolaArc;
use super::sphere::{Sphere, SphereMotion};

/// Moving faster than this along the normal means moving away.
const RECEDING_SPEED: f32 = 0.1;

/// Where to test a moving sphere against a plane.
pub(crate) struct PlaneSweep {
    /// Sphere center to test: the crossing point if the path crosses the
    /// plane during the frame, otherwise the current center.
    pub center: Vec3,
    /// Current center.
    pub final_center: Vec3,
    /// Center at the moment of first touch.
    pub contact_pos: Vec3,
    pub t: f32,
}

/// Pick the test position for a sphere moving against `plane`.
///
/// Returns `None` when the sphere is clearly moving away from the front
/// face, since it cannot be entering the solid.
pub(crate) fn sweep_sphere_against_plane(plane: &Plane, motion: &SphereMotion) -> Option<PlaneSweep> {
    let mut sweep = PlaneSweep {
        center: motion.from_b,
        final_center: motion.from_b,
        contact_pos: motion.from_b,
        t: 0.0,
    };

    let delta = motion.delta();
    if delta.length_squared() < NEAR_ZERO * NEAR_ZERO {
        return Some(sweep);
    }

    let dot = delta.dot(plane.normal);
    if dot > RECEDING_SPEED {
        return None;
    }
    if dot.abs() < NEAR_ZERO {
        // Sliding along the plane: test where it ends up.
        return Some(sweep);
    }

    let dist_a = plane.signed_distance(motion.from_a);
    let t = dist_a / -dot;
    let actual_t = ((dist_a - motion.radius) / -dot).clamp(0.0, 1.0);
    sweep.t = actual_t;
    sweep.contact_pos = motion.from_a + delta * actual_t;
    if t < 0.0 {
        sweep.center = motion.from_a;
    } else if t < 1.0 {
        sweep.center = motion.from_a + delta * t;
    }
    Some(sweep)
}

pub fn from_sphere(from: &Sphere, into: &Plane, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let motion = SphereMotion::new(from, entry);
    let sweep = sweep_sphere_against_plane(into, &motion)?;

    let dist = into.signed_distance(sweep.center);
    if dist > motion.radius {
        return None;
    }
    let depth = motion.radius - into.signed_distance(sweep.final_center);
    let normal = entry.pick_normal(into.normal);

    let mut hit = entry.hit();
    let surface = sweep.center - into.normal * dist;
    hit.set_surface_normal(normal);
    hit.set_surface_point(surface);
    hit.set_interior_point(surface - normal * depth);
    hit.set_depth(depth);
    hit.set_contact_pos(sweep.contact_pos);
    hit.set_contact_normal(into.normal);
    hit.set_t(sweep.t);
    Some(hit)
}

/// Parameter at which a line probe enters the solid half-space.
pub(crate) fn line_probe_entry(plane: &Plane, probe: &LineProbe) -> Option<f32> {
    if plane.signed_distance(probe.origin) < 0.0 && probe.t_min() >= 0.0 {
        // Starts behind the plane: already inside.
        return Some(0.0);
    }
    let t = plane.intersects_line(probe.origin, probe.direction)?;
    probe.contains_t(t).then_some(t)
}

fn from_linear(probe: LineProbe, into: &Plane, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let t = line_probe_entry(into, &probe)?;
    let mut hit = entry.hit();
    hit.set_surface_point(probe.point_at(t));
    hit.set_surface_normal(entry.pick_normal(into.normal));
    hit.set_t(t);
    Some(hit)
}

pub fn from_ray(from: &Ray, into: &Plane, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_ray(from, entry), into, entry)
}

pub fn from_line(from: &Line, into: &Plane, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let probe = LineProbe::from_line(from, entry);
    if into.normal.dot(probe.direction).abs() < NEAR_ZERO && into.signed_distance(probe.origin) < 0.0 {
        // Parallel and buried.
        let mut hit = entry.hit();
        hit.set_surface_point(probe.origin);
        hit.set_surface_normal(entry.pick_normal(into.normal));
        return Some(hit);
    }
    from_linear(probe, into, entry)
}

pub fn from_segment(from: &Segment, into: &Plane, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_segment(from, entry), into, entry)
}

pub fn from_capsule(from: &Capsule, into: &Plane, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let a = entry.wrt().transform_point3(from.point_a());
    let b = entry.wrt().transform_point3(from.point_b());
    let radius = super::xform_radius(from.radius(), entry.wrt());

    let (dist_a, dist_b) = (into.signed_distance(a), into.signed_distance(b));
    let (deepest, dist) = if dist_a <= dist_b { (a, dist_a) } else { (b, dist_b) };
    if dist > radius {
        return None;
    }

    let normal = entry.pick_normal(into.normal);
    let mut hit = entry.hit();
    hit.set_surface_normal(normal);
    hit.set_surface_point(deepest - into.normal * dist);
    hit.set_interior_point(deepest - into.normal * radius);
    hit.set_depth(radius - dist);
    Some(hit)
}

pub fn from_box(from: &BoxSolid, into: &Plane, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let frame = from.frame_in(entry.wrt());
    let corner = frame.support(-into.normal);
    let dist = into.signed_distance(corner);
    if dist > 0.0 {
        return None;
    }

    let normal = entry.pick_normal(into.normal);
    let mut hit = entry.hit();
    hit.set_surface_normal(normal);
    hit.set_surface_point(corner - into.normal * dist);
    hit.set_interior_point(corner);
    hit.set_depth(-dist);
    Some(hit)
}

/// Earliest parameter within the arc at which it is inside the solid.
pub(crate) fn parabola_entry(plane: &Plane, arc: &ParabolaArc, local: &crate::math::Parabola) -> Option<f32> {
    if plane.signed_distance(local.calc_point(arc.t1())) < 0.0 {
        return Some(arc.t1());
    }
    let (t1, t2) = plane.intersects_parabola(local)?;
    [t1, t2].into_iter().find(|&t| arc.contains_t(t))
}

pub fn from_parabola(from: &ParabolaArc, into: &Plane, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let local = from.parabola().xform(entry.wrt());
    let t = parabola_entry(into, from, &local)?;

    let mut hit = entry.hit();
    hit.set_surface_point(local.calc_point(t));
    hit.set_surface_normal(entry.pick_normal(into.normal));
    hit.set_t(t);
    Some(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collide::testing::{collide, collide_moving};
    use crate::collide::Shape;
    use crate::math::Parabola;
    use glam::Mat4;

    fn ground() -> Shape {
        Shape::plane(Plane::from_point_normal(Vec3::ZERO, Vec3::Z))
    }

    #[test]
    fn test_sphere_above_below_touching() {
        let r = 1.0;
        // d > r: clear.
        assert!(collide(&Shape::sphere(Vec3::new(0.0, 0.0, 1.5), r), &ground()).is_none());

        // d == r: touching with zero depth.
        let hit = collide(&Shape::sphere(Vec3::new(0.0, 0.0, 1.0), r), &ground()).unwrap();
        assert!(hit.depth().unwrap().abs() < 1e-5);

        // d < r: depth r - d, normal is the plane normal.
        let hit = collide(&Shape::sphere(Vec3::new(3.0, 2.0, 0.25), r), &ground()).unwrap();
        assert!((hit.depth().unwrap() - 0.75).abs() < 1e-5);
        assert!((hit.surface_normal().unwrap() - Vec3::Z).length() < 1e-5);
        assert!((hit.surface_point().unwrap() - Vec3::new(3.0, 2.0, 0.0)).length() < 1e-5);
        assert!((hit.interior_point().unwrap() - Vec3::new(3.0, 2.0, -0.75)).length() < 1e-5);
    }

    #[test]
    fn test_sphere_deep_below_still_collides() {
        let hit = collide(&Shape::sphere(Vec3::new(0.0, 0.0, -5.0), 1.0), &ground()).unwrap();
        assert!((hit.depth().unwrap() - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_swept_sphere_tunneling_is_caught() {
        let from = Shape::sphere(Vec3::ZERO, 0.5);
        let hit = collide_moving(
            &from,
            &ground(),
            Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0)),
            Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)),
        )
        .unwrap();
        // First touch when the center is 0.5 above the plane.
        assert!((hit.t() - 9.5 / 20.0).abs() < 1e-5);
        assert!((hit.contact_pos().unwrap() - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-4);
        assert!((hit.depth().unwrap() - 10.5).abs() < 1e-4);
    }

    #[test]
    fn test_sphere_moving_away_is_ignored() {
        let from = Shape::sphere(Vec3::ZERO, 1.0);
        let hit = collide_moving(
            &from,
            &ground(),
            Mat4::from_translation(Vec3::new(0.0, 0.0, 0.0)),
            Mat4::from_translation(Vec3::new(0.0, 0.0, 0.5)),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_ray() {
        let down = Shape::ray(Vec3::new(1.0, 1.0, 4.0), -Vec3::Z);
        let hit = collide(&down, &ground()).unwrap();
        assert!((hit.t() - 4.0).abs() < 1e-5);
        assert!((hit.surface_point().unwrap() - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);

        let up = Shape::ray(Vec3::new(1.0, 1.0, 4.0), Vec3::Z);
        assert!(collide(&up, &ground()).is_none());

        let buried = Shape::ray(Vec3::new(1.0, 1.0, -4.0), Vec3::Z);
        assert_eq!(collide(&buried, &ground()).unwrap().t(), 0.0);
    }

    #[test]
    fn test_segment_and_line() {
        let short = Shape::segment(Vec3::new(0.0, 0.0, 4.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(collide(&short, &ground()).is_none());

        let through = Shape::segment(Vec3::new(0.0, 0.0, 4.0), Vec3::new(0.0, 0.0, -4.0));
        assert!((collide(&through, &ground()).unwrap().t() - 0.5).abs() < 1e-5);

        let parallel = Shape::line(Vec3::new(0.0, 0.0, 1.0), Vec3::X);
        assert!(collide(&parallel, &ground()).is_none());

        let line = Shape::line(Vec3::new(0.0, 0.0, 1.0), Vec3::Z);
        assert!((collide(&line, &ground()).unwrap().t() + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_capsule_deepest_end() {
        let from = Shape::capsule(Vec3::new(0.0, 0.0, 0.25), Vec3::new(0.0, 0.0, 3.0), 0.5);
        let hit = collide(&from, &ground()).unwrap();
        assert!((hit.depth().unwrap() - 0.25).abs() < 1e-5);
        assert!((hit.interior_point().unwrap() - Vec3::new(0.0, 0.0, -0.25)).length() < 1e-5);
    }

    #[test]
    fn test_box_deepest_corner() {
        let from = Shape::cuboid(Vec3::new(-1.0, -1.0, -0.5), Vec3::new(1.0, 1.0, 1.5));
        let hit = collide(&from, &ground()).unwrap();
        assert!((hit.depth().unwrap() - 0.5).abs() < 1e-5);
        assert!((hit.interior_point().unwrap().z + 0.5).abs() < 1e-5);

        let above = Shape::cuboid(Vec3::new(-1.0, -1.0, 0.5), Vec3::new(1.0, 1.0, 1.5));
        assert!(collide(&above, &ground()).is_none());
    }

    #[test]
    fn test_parabola_lands() {
        let arc = Parabola::from_launch(Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -2.0));
        let hit = collide(&Shape::parabola(arc, 0.0, 5.0), &ground()).unwrap();
        // z = 1 - t²
        assert!((hit.t() - 1.0).abs() < 1e-5);
        assert!((hit.surface_point().unwrap() - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);

        let short = Shape::parabola(arc, 0.0, 0.5);
        assert!(collide(&short, &ground()).is_none());
    }
}
