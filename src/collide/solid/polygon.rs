//! Convex planar polygons.
//!
//! A polygon keeps its 3D vertices and lazily derives a 2D frame in its own
//! plane. Containment and edge-distance queries run in that frame, after the
//! into-node's clip planes (if any) have cut the outline down.

use std::borrow::Cow;
use std::sync::OnceLock;

use glam::{Mat4, Vec2, Vec3};

use crate::collide::contact::CollisionEntry;
use crate::error::CollideError;
use crate::math::{closest_segment_points, Plane, NEAR_ZERO, POINT_EPSILON};

use super::box_solid::BoxSolid;
use super::capsule::Capsule;
use super::line::{Line, LineProbe, Ray, Segment};
use super::parabola::ParabolaArc;
use super::plane::sweep_sphere_against_plane;
use super::sphere::{Sphere, SphereMotion};
use super::xform_radius;

/// A convex polygon, wound counter-clockwise around its front normal.
#[derive(Debug, Clone)]
pub struct Polygon {
    points: Vec<Vec3>,
    frame: OnceLock<PolygonFrame>,
}

/// The polygon's plane and its outline projected into that plane.
#[derive(Debug, Clone)]
struct PolygonFrame {
    plane: Plane,
    origin: Vec3,
    u: Vec3,
    w: Vec3,
    outline: Vec<Vec2>,
}

impl PolygonFrame {
    fn new(points: &[Vec3]) -> Self {
        let normal = newell_normal(points).normalize_or(Vec3::Z);
        let origin = points[0];
        let u = points
            .iter()
            .map(|p| *p - origin)
            .find(|d| d.length_squared() > NEAR_ZERO)
            .map(|d| (d - normal * d.dot(normal)).normalize_or(normal.any_orthonormal_vector()))
            .unwrap_or_else(|| normal.any_orthonormal_vector());
        let w = normal.cross(u);
        let mut frame = Self {
            plane: Plane::from_point_normal(origin, normal),
            origin,
            u,
            w,
            outline: Vec::with_capacity(points.len()),
        };
        frame.outline = points.iter().map(|&p| frame.to_2d(p)).collect();
        frame
    }

    fn to_2d(&self, point: Vec3) -> Vec2 {
        let d = point - self.origin;
        Vec2::new(d.dot(self.u), d.dot(self.w))
    }

    fn to_3d(&self, point: Vec2) -> Vec3 {
        self.origin + self.u * point.x + self.w * point.y
    }
}

impl Polygon {
    /// Build a polygon from at least three non-collinear, distinct points.
    ///
    /// Concave outlines are accepted with a warning; containment tests treat
    /// them as their convex hull only by accident.
    pub fn new(points: &[Vec3]) -> Result<Self, CollideError> {
        verify_points(points)?;
        let polygon = Self {
            points: points.to_vec(),
            frame: OnceLock::new(),
        };
        if polygon.is_concave() {
            tracing::warn!(points = points.len(), "concave collision polygon");
        }
        Ok(polygon)
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Average of the vertices.
    pub fn median(&self) -> Vec3 {
        self.points.iter().copied().sum::<Vec3>() / self.points.len().max(1) as f32
    }

    pub fn plane(&self) -> Plane {
        self.frame().plane
    }

    pub fn normal(&self) -> Vec3 {
        self.frame().plane.normal
    }

    /// Signed distance from `point` to the polygon's plane.
    pub fn dist_to_plane(&self, point: Vec3) -> f32 {
        self.frame().plane.signed_distance(point)
    }

    /// True when some vertex turns the wrong way.
    pub fn is_concave(&self) -> bool {
        let outline = &self.frame().outline;
        let n = outline.len();
        (0..n).any(|i| {
            let a = outline[i];
            let b = outline[(i + 1) % n];
            let c = outline[(i + 2) % n];
            (b - a).perp_dot(c - b) < -NEAR_ZERO
        })
    }

    /// True when the projection of `point` onto the plane falls inside the
    /// outline.
    pub fn contains_projection(&self, point: Vec3) -> bool {
        let frame = self.frame();
        point_is_inside(frame.to_2d(point), &frame.outline)
    }

    pub(crate) fn xform(&mut self, mat: &Mat4) {
        for p in &mut self.points {
            *p = mat.transform_point3(*p);
        }
        self.invalidate();
    }

    pub(crate) fn invalidate(&mut self) {
        self.frame = OnceLock::new();
    }

    fn frame(&self) -> &PolygonFrame {
        self.frame.get_or_init(|| PolygonFrame::new(&self.points))
    }

    /// The outline left after the entry's clip planes cut it, or `None` when
    /// nothing is left.
    fn visible_outline(&self, entry: &CollisionEntry) -> Option<Cow<'_, [Vec2]>> {
        let frame = self.frame();
        let Some(planes) = entry.into_clip_planes() else {
            return Some(Cow::Borrowed(&frame.outline));
        };
        let mut outline = frame.outline.clone();
        for plane in planes {
            outline = clip_outline(frame, &outline, plane);
            if outline.len() < 3 {
                return None;
            }
        }
        Some(Cow::Owned(outline))
    }
}

fn verify_points(points: &[Vec3]) -> Result<(), CollideError> {
    if points.len() < 3 {
        return Err(CollideError::TooFewPoints { count: points.len() });
    }
    for (index, p) in points.iter().enumerate() {
        if !p.is_finite() {
            return Err(CollideError::NonFinitePoint { index });
        }
        if points[..index].iter().any(|q| q.distance_squared(*p) < POINT_EPSILON * POINT_EPSILON) {
            return Err(CollideError::RepeatedPoint { index });
        }
    }
    if newell_normal(points).length_squared() < NEAR_ZERO {
        return Err(CollideError::CollinearPoints);
    }
    Ok(())
}

/// Area-weighted normal of a closed vertex loop.
fn newell_normal(points: &[Vec3]) -> Vec3 {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .fold(Vec3::ZERO, |n, (p, q)| {
            n + Vec3::new(
                (p.y - q.y) * (p.z + q.z),
                (p.z - q.z) * (p.x + q.x),
                (p.x - q.x) * (p.y + q.y),
            )
        })
}

fn edges(outline: &[Vec2]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    outline.iter().copied().zip(outline.iter().copied().cycle().skip(1))
}

fn point_is_inside(p: Vec2, outline: &[Vec2]) -> bool {
    edges(outline).all(|(a, b)| (b - a).perp_dot(p - a) >= 0.0)
}

fn dist_to_edge(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 < NEAR_ZERO * NEAR_ZERO {
        return p.distance(a);
    }
    let s = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * s)
}

/// Distance from `p` to the outline's boundary, negated when `p` is inside.
fn dist_to_polygon(p: Vec2, outline: &[Vec2]) -> f32 {
    let nearest = edges(outline)
        .map(|(a, b)| dist_to_edge(p, a, b))
        .fold(f32::INFINITY, f32::min);
    if point_is_inside(p, outline) {
        -nearest
    } else {
        nearest
    }
}

/// Keep the part of the outline behind `plane`.
fn clip_outline(frame: &PolygonFrame, outline: &[Vec2], plane: &Plane) -> Vec<Vec2> {
    let dists: Vec<f32> = outline
        .iter()
        .map(|&p| plane.signed_distance(frame.to_3d(p)))
        .collect();
    let mut kept = Vec::with_capacity(outline.len() + 1);
    for i in 0..outline.len() {
        let j = (i + 1) % outline.len();
        let (p, dp) = (outline[i], dists[i]);
        let (q, dq) = (outline[j], dists[j]);
        if dp <= 0.0 {
            kept.push(p);
        }
        if (dp <= 0.0) != (dq <= 0.0) {
            kept.push(p.lerp(q, dp / (dp - dq)));
        }
    }
    kept
}

/// Parameter range of `p + s * (q - p)`, `s` in `[0, 1]`, lying inside the
/// outline.
fn clip_segment(p: Vec2, q: Vec2, outline: &[Vec2]) -> Option<(f32, f32)> {
    let d = q - p;
    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    for (a, b) in edges(outline) {
        let e = b - a;
        let at_start = e.perp_dot(p - a);
        let rate = e.perp_dot(d);
        if rate.abs() < NEAR_ZERO {
            if at_start < 0.0 {
                return None;
            }
            continue;
        }
        let s = -at_start / rate;
        if rate > 0.0 {
            lo = lo.max(s);
        } else {
            hi = hi.min(s);
        }
        if lo > hi {
            return None;
        }
    }
    Some((lo, hi))
}

pub fn from_sphere(from: &Sphere, into: &Polygon, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let frame = into.frame();
    let plane = frame.plane;
    let motion = SphereMotion::new(from, entry);
    let sweep = sweep_sphere_against_plane(&plane, &motion)?;

    let dist = plane.signed_distance(sweep.center);
    if dist.abs() > motion.radius {
        return None;
    }

    let outline = into.visible_outline(entry)?;
    let edge_dist = dist_to_polygon(frame.to_2d(sweep.center), &outline);
    if edge_dist > motion.radius {
        return None;
    }

    // Past an edge, only a cap of the sphere can reach the face.
    let max_dist = if edge_dist >= 0.0 {
        (motion.radius * motion.radius - edge_dist * edge_dist).max(0.0).sqrt()
    } else {
        motion.radius
    };
    if dist > max_dist {
        return None;
    }
    let depth = max_dist - plane.signed_distance(sweep.final_center);

    let normal = entry.pick_normal(plane.normal);
    let surface = sweep.center - plane.normal * dist;
    let mut hit = entry.hit();
    hit.set_surface_normal(normal);
    hit.set_surface_point(surface);
    hit.set_interior_point(surface - normal * depth);
    hit.set_depth(depth);
    hit.set_contact_pos(sweep.contact_pos);
    hit.set_contact_normal(plane.normal);
    hit.set_t(sweep.t);
    Some(hit)
}

pub(crate) fn from_linear(probe: LineProbe, into: &Polygon, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let frame = into.frame();
    let t = frame.plane.intersects_line(probe.origin, probe.direction)?;
    if !probe.contains_t(t) {
        return None;
    }

    let point = probe.point_at(t);
    let outline = into.visible_outline(entry)?;
    if !point_is_inside(frame.to_2d(point), &outline) {
        return None;
    }

    let mut hit = entry.hit();
    hit.set_surface_point(point);
    hit.set_surface_normal(entry.pick_normal(frame.plane.normal));
    hit.set_t(t);
    Some(hit)
}

pub fn from_ray(from: &Ray, into: &Polygon, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_ray(from, entry), into, entry)
}

pub fn from_line(from: &Line, into: &Polygon, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_line(from, entry), into, entry)
}

pub fn from_segment(from: &Segment, into: &Polygon, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_segment(from, entry), into, entry)
}

pub fn from_parabola(from: &ParabolaArc, into: &Polygon, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let frame = into.frame();
    let local = from.parabola().xform(entry.wrt());
    let (t1, t2) = frame.plane.intersects_parabola(&local)?;
    let outline = into.visible_outline(entry)?;

    let t = [t1, t2]
        .into_iter()
        .filter(|&t| from.contains_t(t))
        .find(|&t| point_is_inside(frame.to_2d(local.calc_point(t)), &outline))?;

    let mut hit = entry.hit();
    hit.set_surface_point(local.calc_point(t));
    hit.set_surface_normal(entry.pick_normal(frame.plane.normal));
    hit.set_t(t);
    Some(hit)
}

pub fn from_capsule(from: &Capsule, into: &Polygon, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let frame = into.frame();
    let plane = frame.plane;
    let a = entry.wrt().transform_point3(from.point_a());
    let b = entry.wrt().transform_point3(from.point_b());
    let radius = xform_radius(from.radius(), entry.wrt());

    let (dist_a, dist_b) = (plane.signed_distance(a), plane.signed_distance(b));
    if (dist_a > radius && dist_b > radius) || (dist_a < -radius && dist_b < -radius) {
        return None;
    }
    let outline = into.visible_outline(entry)?;
    let normal = entry.pick_normal(plane.normal);

    // Part of the axis above the face: its lowest point rests on the face.
    if let Some((lo, hi)) = clip_segment(frame.to_2d(a), frame.to_2d(b), &outline) {
        let (p_lo, p_hi) = (a.lerp(b, lo), a.lerp(b, hi));
        let (deepest, dist) = if plane.signed_distance(p_lo) <= plane.signed_distance(p_hi) {
            (p_lo, plane.signed_distance(p_lo))
        } else {
            (p_hi, plane.signed_distance(p_hi))
        };
        if dist <= radius {
            let surface = plane.project(deepest);
            let mut hit = entry.hit();
            hit.set_surface_normal(normal);
            hit.set_surface_point(surface);
            hit.set_interior_point(surface - normal * (radius - dist));
            hit.set_depth(radius - dist);
            return Some(hit);
        }
    }

    // Otherwise the axis passes beside the outline; look for an edge within
    // reach.
    let (axis_point, edge_point) = edges(&outline)
        .map(|(p, q)| closest_segment_points(a, b, frame.to_3d(p), frame.to_3d(q)))
        .min_by(|(s1, e1), (s2, e2)| s1.distance_squared(*e1).total_cmp(&s2.distance_squared(*e2)))?;
    let dist = axis_point.distance(edge_point);
    if dist >= radius {
        return None;
    }
    let dir = (axis_point - edge_point).normalize_or(plane.normal);
    let mut hit = entry.hit();
    hit.set_surface_normal(normal);
    hit.set_surface_point(edge_point);
    hit.set_interior_point(edge_point - dir * (radius - dist));
    hit.set_depth(radius - dist);
    Some(hit)
}

pub fn from_box(from: &BoxSolid, into: &Polygon, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let frame = into.frame();
    let plane = frame.plane;
    let solid = from.frame_in(entry.wrt());
    let outline = into.visible_outline(entry)?;
    let points: Vec<Vec3> = outline.iter().map(|&p| frame.to_3d(p)).collect();

    let box_axes = solid.axes();
    let mut axes = vec![plane.normal, box_axes.x_axis, box_axes.y_axis, box_axes.z_axis];
    for (p, q) in points.iter().zip(points.iter().cycle().skip(1)) {
        let edge = *q - *p;
        for i in 0..3 {
            axes.push(box_axes.col(i).cross(edge));
        }
    }

    for axis in axes {
        let Some(axis) = axis.try_normalize() else {
            continue;
        };
        let center = solid.center().dot(axis);
        let reach = solid.projected_radius(axis);
        let (lo, hi) = points
            .iter()
            .map(|p| p.dot(axis))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| (lo.min(d), hi.max(d)));
        if center + reach < lo || center - reach > hi {
            return None;
        }
    }

    let corner = solid.support(-plane.normal);
    let dist = plane.signed_distance(corner);
    let mut hit = entry.hit();
    hit.set_surface_normal(entry.pick_normal(plane.normal));
    hit.set_surface_point(corner - plane.normal * dist);
    hit.set_interior_point(corner);
    hit.set_depth(-dist);
    Some(hit)
}
