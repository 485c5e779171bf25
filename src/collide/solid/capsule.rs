//! Capsules: a segment swept by a sphere.
//!
//! Tests run in a canonical frame where point A sits at the origin and the
//! axis runs up +Y to `(0, length, 0)`.

use std::sync::OnceLock;

use glam::{Mat4, Vec2, Vec3};

use crate::collide::contact::CollisionEntry;
use crate::math::{closest_segment_points, sphere_intersects_line, NEAR_ZERO};

use super::box_solid::{box_capsule_contact, BoxSolid};
use super::line::{Line, LineProbe, Ray, Segment};
use super::parabola::{first_chord_hit, ParabolaArc};
use super::sphere::{Sphere, SphereMotion};
use super::xform_radius;

#[derive(Debug, Clone)]
struct CapsuleFrame {
    /// Canonical frame to shape space.
    mat: Mat4,
    inv_mat: Mat4,
    length: f32,
}

#[derive(Debug, Clone)]
pub struct Capsule {
    a: Vec3,
    b: Vec3,
    radius: f32,
    frame: OnceLock<CapsuleFrame>,
}

impl Capsule {
    pub fn new(a: Vec3, b: Vec3, radius: f32) -> Self {
        debug_assert!(radius >= 0.0, "negative capsule radius");
        Self {
            a,
            b,
            radius,
            frame: OnceLock::new(),
        }
    }

    pub fn point_a(&self) -> Vec3 {
        self.a
    }

    pub fn point_b(&self) -> Vec3 {
        self.b
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn length(&self) -> f32 {
        self.frame().length
    }

    pub fn set_point_a(&mut self, a: Vec3) {
        self.a = a;
        self.invalidate();
    }

    pub fn set_point_b(&mut self, b: Vec3) {
        self.b = b;
        self.invalidate();
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    pub(crate) fn xform(&mut self, mat: &Mat4) {
        self.a = mat.transform_point3(self.a);
        self.b = mat.transform_point3(self.b);
        self.radius = xform_radius(self.radius, mat);
        self.invalidate();
    }

    pub(crate) fn invalidate(&mut self) {
        self.frame = OnceLock::new();
    }

    fn frame(&self) -> &CapsuleFrame {
        self.frame.get_or_init(|| {
            let direction = self.b - self.a;
            let length = direction.length();
            let y = if length > NEAR_ZERO { direction / length } else { Vec3::Z };
            let x = y.any_orthonormal_vector();
            let z = x.cross(y);
            let mat = Mat4::from_cols(x.extend(0.0), y.extend(0.0), z.extend(0.0), self.a.extend(1.0));
            CapsuleFrame {
                mat,
                inv_mat: mat.inverse(),
                length,
            }
        })
    }

    /// Parameters where the line `from + t * delta` enters and leaves the
    /// capsule grown by `inflate`.
    pub fn intersects_line(&self, from: Vec3, delta: Vec3, inflate: f32) -> Option<(f32, f32)> {
        let frame = self.frame();
        let from = frame.inv_mat.transform_point3(from);
        let delta = frame.inv_mat.transform_vector3(delta);
        let radius = self.radius + inflate;
        let length = frame.length;

        let from2 = Vec2::new(from.x, from.z);
        let delta2 = Vec2::new(delta.x, delta.z);
        let a = delta2.dot(delta2);

        let (mut t1, mut t2) = if a < NEAR_ZERO * NEAR_ZERO {
            // Parallel to the axis: inside the infinite cylinder or not at all.
            if from2.dot(from2) > radius * radius {
                return None;
            }
            if delta.y.abs() < NEAR_ZERO {
                // Just a point.
                let inside = if from.y < 0.0 {
                    from.length_squared() <= radius * radius
                } else if from.y > length {
                    (from - Vec3::Y * length).length_squared() <= radius * radius
                } else {
                    true
                };
                return inside.then_some((0.0, 0.0));
            }
            let ta = (-radius - from.y) / delta.y;
            let tb = (length + radius - from.y) / delta.y;
            (ta.min(tb), ta.max(tb))
        } else {
            let b = 2.0 * delta2.dot(from2);
            let c = from2.dot(from2) - radius * radius;
            let radical = b * b - 4.0 * a * c;
            if radical.abs() < NEAR_ZERO {
                let t = -b / (2.0 * a);
                (t, t)
            } else if radical < 0.0 {
                return None;
            } else {
                let sqrt_radical = radical.sqrt();
                ((-b - sqrt_radical) / (2.0 * a), (-b + sqrt_radical) / (2.0 * a))
            }
        };

        let t1_y = from.y + t1 * delta.y;
        let t2_y = from.y + t2 * delta.y;
        if (t1_y < -radius && t2_y < -radius) || (t1_y > length + radius && t2_y > length + radius) {
            return None;
        }

        // Past either end of the body, the end caps decide.
        let cap = |y: f32| sphere_intersects_line(Vec3::Y * y, radius, from, delta, 0.0);
        if t1_y < 0.0 {
            t1 = cap(0.0)?.0;
        } else if t1_y > length {
            t1 = cap(length)?.0;
        }
        if t2_y < 0.0 {
            t2 = cap(0.0)?.1;
        } else if t2_y > length {
            t2 = cap(length)?.1;
        }
        Some((t1, t2))
    }

    /// Snap a point that should be on the surface onto it, returning the
    /// surface point and outward normal.
    pub fn surface_point_and_normal(&self, point: Vec3) -> (Vec3, Vec3) {
        let frame = self.frame();
        let p = frame.inv_mat.transform_point3(point);
        let (surface, normal) = if p.y <= 0.0 {
            let normal = p.try_normalize().unwrap_or(Vec3::NEG_Y);
            (normal * self.radius, normal)
        } else if p.y >= frame.length {
            let normal = (p - Vec3::Y * frame.length).try_normalize().unwrap_or(Vec3::Y);
            (normal * self.radius + Vec3::Y * frame.length, normal)
        } else {
            let n2 = Vec2::new(p.x, p.z).try_normalize().unwrap_or(Vec2::Y);
            let normal = Vec3::new(n2.x, 0.0, n2.y);
            (Vec3::new(normal.x * self.radius, p.y, normal.z * self.radius), normal)
        };
        (
            frame.mat.transform_point3(surface),
            frame.mat.transform_vector3(normal),
        )
    }

    /// Fill in a hit from a point of contact, pulling the interior point in
    /// by `extra_radius`.
    fn set_intersection_point(&self, hit: &mut CollisionEntry, point: Vec3, extra_radius: f32, entry: &CollisionEntry) {
        let (surface, normal) = self.surface_point_and_normal(point);
        let normal = entry.pick_normal(normal);
        hit.set_surface_normal(normal);
        hit.set_surface_point(surface);
        hit.set_interior_point(point - normal * extra_radius);
    }
}

pub fn from_sphere(from: &Sphere, into: &Capsule, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let motion = SphereMotion::new(from, entry);
    let delta = motion.delta();

    let (t1, t2) = into.intersects_line(motion.from_a, delta, motion.radius)?;
    if t2 < 0.0 || t1 > 1.0 {
        return None;
    }
    let actual_t = t1.clamp(0.0, 1.0);
    let contact_point = motion.from_a + delta * actual_t;

    let into_point = if t2 > 1.0 {
        motion.from_b
    } else {
        motion.from_a + delta * t2
    };

    let mut hit = entry.hit();
    into.set_intersection_point(&mut hit, into_point, motion.radius, entry);
    let (_, contact_normal) = into.surface_point_and_normal(contact_point);
    hit.set_contact_pos(contact_point);
    hit.set_contact_normal(contact_normal);
    hit.set_t(actual_t);
    Some(hit)
}

fn from_linear(probe: LineProbe, into: &Capsule, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let (t1, t2) = into.intersects_line(probe.origin, probe.direction, 0.0)?;
    let t = probe.first_hit(t1, t2)?;

    let mut hit = entry.hit();
    into.set_intersection_point(&mut hit, probe.point_at(t), 0.0, entry);
    hit.set_t(t);
    Some(hit)
}

pub fn from_ray(from: &Ray, into: &Capsule, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_ray(from, entry), into, entry)
}

pub fn from_line(from: &Line, into: &Capsule, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_line(from, entry), into, entry)
}

pub fn from_segment(from: &Segment, into: &Capsule, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_segment(from, entry), into, entry)
}

pub fn from_capsule(from: &Capsule, into: &Capsule, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let from_a = entry.wrt().transform_point3(from.a);
    let from_b = entry.wrt().transform_point3(from.b);
    let from_radius = xform_radius(from.radius, entry.wrt());

    let (into_closest, from_closest) = closest_segment_points(into.a, into.b, from_a, from_b);
    let closest = from_closest - into_closest;
    let distance = closest.length();
    if distance > into.radius + from_radius {
        return None;
    }

    let mut hit = entry.hit();
    if distance > NEAR_ZERO {
        let normal = closest / distance;
        hit.set_surface_point(into_closest + normal * into.radius);
        hit.set_interior_point(from_closest - normal * from_radius);
        hit.set_surface_normal(entry.pick_normal(normal));
    } else {
        // Axes cross.
        into.set_intersection_point(&mut hit, into_closest, 0.0, entry);
    }
    hit.set_depth(into.radius + from_radius - distance);
    Some(hit)
}

pub fn from_box(from: &BoxSolid, into: &Capsule, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let solid = from.frame_in(entry.wrt());
    let (surface, interior, normal) = box_capsule_contact(&solid, into.a, into.b, into.radius)?;

    let mut hit = entry.hit();
    hit.set_surface_point(surface);
    hit.set_interior_point(interior);
    hit.set_surface_normal(entry.pick_normal(normal));
    Some(hit)
}

pub fn from_parabola(from: &ParabolaArc, into: &Capsule, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let local = from.parabola().xform(entry.wrt());
    let t = first_chord_hit(&local, from.t1(), from.t2(), |p1, p2| {
        let (t1, t2) = into.intersects_line(p1, p2 - p1, 0.0)?;
        if t2 < 0.0 || t1 > 1.0 {
            return None;
        }
        Some(t1.max(0.0))
    })?;

    let mut hit = entry.hit();
    into.set_intersection_point(&mut hit, local.calc_point(t), 0.0, entry);
    hit.set_t(t);
    Some(hit)
}
