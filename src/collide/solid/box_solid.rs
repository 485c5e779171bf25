//! Oriented boxes.
//!
//! Every test runs in the box's own frame, where it is the axis-aligned box
//! `[-half_extents, half_extents]`, and maps the results back out.

use glam::{Mat3, Mat4, Vec3};

use crate::collide::contact::CollisionEntry;
use crate::math::{
    closest_segment_points, segment_capsule_first_hit, Parabola, Plane, NEAR_ZERO, POINT_EPSILON,
};

use super::capsule::Capsule;
use super::line::{Extent, Line, LineProbe, Ray, Segment};
use super::parabola::ParabolaArc;
use super::polygon::{self, Polygon};
use super::sphere::Sphere;
use super::xform_radius;

/// Local-frame edges of the unit cube as `(start corner, axis)`, with corner
/// bits `4 = +x`, `2 = +y`, `1 = +z`.
const EDGES: [(usize, usize); 12] = [
    (0b000, 0),
    (0b010, 0),
    (0b001, 0),
    (0b011, 0),
    (0b000, 1),
    (0b001, 1),
    (0b100, 1),
    (0b101, 1),
    (0b000, 2),
    (0b010, 2),
    (0b100, 2),
    (0b110, 2),
];

/// A box with its own orientation. `axes` holds orthonormal columns; any
/// scale lives in `half_extents`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSolid {
    center: Vec3,
    half_extents: Vec3,
    axes: Mat3,
}

impl BoxSolid {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
            axes: Mat3::IDENTITY,
        }
    }

    /// Axis-aligned box spanning two opposite corners.
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self::new((min + max) * 0.5, (max - min) * 0.5)
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    pub fn dimensions(&self) -> Vec3 {
        self.half_extents * 2.0
    }

    /// Unit axes of the box as matrix columns.
    pub fn axes(&self) -> Mat3 {
        self.axes
    }

    /// Corner at the negative end of every box axis.
    pub fn min(&self) -> Vec3 {
        self.from_local(-self.half_extents)
    }

    /// Corner at the positive end of every box axis.
    pub fn max(&self) -> Vec3 {
        self.from_local(self.half_extents)
    }

    /// Corner `n`, where bit 4 picks +x, bit 2 +y and bit 1 +z.
    pub fn corner(&self, n: usize) -> Vec3 {
        self.from_local(local_corner(self.half_extents, n))
    }

    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|n| self.corner(n))
    }

    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.vector_to_local(point - self.center)
    }

    pub fn from_local(&self, point: Vec3) -> Vec3 {
        self.center + self.axes * point
    }

    pub fn vector_to_local(&self, v: Vec3) -> Vec3 {
        self.axes.transpose() * v
    }

    pub fn vector_from_local(&self, v: Vec3) -> Vec3 {
        self.axes * v
    }

    /// The box as seen through `mat`. Shear is not representable and is
    /// dropped.
    pub fn frame_in(&self, mat: &Mat4) -> BoxSolid {
        let center = mat.transform_point3(self.center);
        let mut half_extents = Vec3::ZERO;
        let mut columns = [Vec3::X, Vec3::Y, Vec3::Z];
        for (i, column) in columns.iter_mut().enumerate() {
            let v = mat.transform_vector3(self.axes.col(i) * self.half_extents[i]);
            half_extents[i] = v.length();
            *column = if half_extents[i] > NEAR_ZERO {
                v / half_extents[i]
            } else {
                mat.transform_vector3(self.axes.col(i)).normalize_or_zero()
            };
        }
        BoxSolid {
            center,
            half_extents,
            axes: Mat3::from_cols(columns[0], columns[1], columns[2]),
        }
    }

    pub(crate) fn xform(&mut self, mat: &Mat4) {
        *self = self.frame_in(mat);
    }

    /// Corner furthest along `dir`.
    pub fn support(&self, dir: Vec3) -> Vec3 {
        let local = self.vector_to_local(dir);
        let pick = Vec3::select(local.cmpge(Vec3::ZERO), self.half_extents, -self.half_extents);
        self.from_local(pick)
    }

    /// Half-width of the box measured along the unit vector `dir`.
    pub fn projected_radius(&self, dir: Vec3) -> f32 {
        (0..3)
            .map(|i| (self.axes.col(i).dot(dir) * self.half_extents[i]).abs())
            .sum()
    }

    /// Face nearest a local-frame point inside the box, as `(axis, sign,
    /// distance to that face)`.
    pub(crate) fn nearest_face(&self, local: Vec3) -> (usize, f32, f32) {
        let gaps = self.half_extents - local.abs();
        let axis = if gaps.x <= gaps.y && gaps.x <= gaps.z {
            0
        } else if gaps.y <= gaps.z {
            1
        } else {
            2
        };
        let sign = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
        (axis, sign, gaps[axis])
    }

    /// Slab test of the local-frame line `from + t * delta` against the box
    /// grown by `inflate`. Returns the entry and exit parameters.
    fn intersects_line(&self, from: Vec3, delta: Vec3, inflate: f32) -> Option<(f32, f32)> {
        let bmax = self.half_extents + Vec3::splat(inflate);
        let bmin = -bmax;
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;

        for i in 0..3 {
            if delta[i].abs() > NEAR_ZERO {
                let mut t1 = (bmin[i] - from[i]) / delta[i];
                let mut t2 = (bmax[i] - from[i]) / delta[i];
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                tmin = tmin.max(t1);
                tmax = tmax.min(t2);
                if tmin > tmax {
                    return None;
                }
            } else if from[i] < bmin[i] || from[i] > bmax[i] {
                return None;
            }
        }
        Some((tmin, tmax))
    }

    /// First time a sphere of `radius` moving `from..from + delta` in the
    /// local frame touches the box.
    fn intersects_swept_sphere(&self, from: Vec3, delta: Vec3, radius: f32) -> Option<f32> {
        let (t, t2) = self.intersects_line(from, delta, radius)?;
        if t > 1.0 || t2 < 0.0 {
            return None;
        }
        let t = t.max(0.0);
        let p = from + delta * t;
        let h = self.half_extents;

        // Outside on two or more axes means the grown box's rounded edges or
        // corners, which the slab test overestimates.
        let below = p.cmplt(-h).bitmask() as usize;
        let above = p.cmpgt(h).bitmask() as usize;
        let outside = below | above;
        if outside.count_ones() < 2 {
            return Some(t);
        }

        // `bitmask` is x = 1, z = 4; corners use x = 4, z = 1.
        let swap = |m: usize| ((m & 1) << 2) | (m & 2) | ((m & 4) >> 2);
        let (u, v) = (swap(below), swap(above));
        let edge_hit = |c1: usize, c2: usize| {
            segment_capsule_first_hit(from, delta, local_corner(h, c1), local_corner(h, c2), radius)
        };
        if outside.count_ones() == 3 {
            [v ^ 4, v ^ 2, v ^ 1]
                .into_iter()
                .filter_map(|other| edge_hit(v, other))
                .reduce(f32::min)
        } else {
            edge_hit(u ^ 7, v)
        }
    }

    /// Closest points between a local-frame segment and the box, as
    /// `(segment point, box point)`. Both coincide when they overlap.
    fn closest_to_segment(&self, a: Vec3, b: Vec3) -> (Vec3, Vec3) {
        let h = self.half_extents;
        if let Some((t1, t2)) = self.intersects_line(a, b - a, 0.0) {
            if t2 >= 0.0 && t1 <= 1.0 {
                let p = a + (b - a) * ((t1.max(0.0) + t2.min(1.0)) * 0.5);
                return (p, p);
            }
        }

        let mut best = (a, a.clamp(-h, h));
        let mut best_dist = best.0.distance_squared(best.1);
        let mut consider = |pair: (Vec3, Vec3)| {
            let dist = pair.0.distance_squared(pair.1);
            if dist < best_dist {
                best_dist = dist;
                best = pair;
            }
        };
        consider((b, b.clamp(-h, h)));
        for (corner, axis) in EDGES {
            let start = local_corner(h, corner);
            let mut end = start;
            end[axis] = h[axis];
            consider(closest_segment_points(a, b, start, end));
        }
        best
    }

    /// The six face planes in the local frame, outward facing.
    fn local_face_planes(&self) -> [Plane; 6] {
        let h = self.half_extents;
        std::array::from_fn(|i| {
            let axis = i % 3;
            let sign = if i < 3 { 1.0 } else { -1.0 };
            let mut normal = Vec3::ZERO;
            normal[axis] = sign;
            Plane::new(normal, -h[axis])
        })
    }

    /// Corners of face `face` (0..3 the +x/+y/+z faces, 3..6 the -x/-y/-z
    /// faces) in shape space, wound counter-clockwise around the outward
    /// normal.
    pub fn face_points(&self, face: usize) -> [Vec3; 4] {
        let axis = face % 3;
        let sign = if face < 3 { 1.0 } else { -1.0 };
        let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
        let h = self.half_extents;
        let corner = |u: f32, v: f32| {
            let mut p = Vec3::ZERO;
            p[axis] = h[axis] * sign;
            p[b] = h[b] * u;
            p[c] = h[c] * v;
            self.from_local(p)
        };
        let loop_ = [corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0)];
        if sign > 0.0 {
            loop_
        } else {
            [loop_[3], loop_[2], loop_[1], loop_[0]]
        }
    }

    /// The six faces as polygons. Faces of a flat box that collapse to a
    /// line are left out.
    pub fn face_polygons(&self) -> Vec<Polygon> {
        (0..6)
            .filter_map(|face| Polygon::new(&self.face_points(face)).ok())
            .collect()
    }

    /// Face normal for a local-frame point on the surface, or the nearest
    /// face's normal if it is not on one.
    fn local_surface_normal(&self, point: Vec3) -> Vec3 {
        let h = self.half_extents;
        let tolerance = POINT_EPSILON * h.max_element().max(1.0);
        let mut normal = Vec3::ZERO;
        for i in 0..3 {
            if (point[i] - h[i]).abs() <= tolerance {
                normal[i] += 1.0;
            }
            if (point[i] + h[i]).abs() <= tolerance {
                normal[i] -= 1.0;
            }
        }
        normal.try_normalize().unwrap_or_else(|| {
            let (axis, sign, _) = self.nearest_face(point);
            let mut normal = Vec3::ZERO;
            normal[axis] = sign;
            normal
        })
    }
}

fn local_corner(h: Vec3, n: usize) -> Vec3 {
    Vec3::new(
        if n & 4 != 0 { h.x } else { -h.x },
        if n & 2 != 0 { h.y } else { -h.y },
        if n & 1 != 0 { h.z } else { -h.z },
    )
}

fn axis_of_largest(v: Vec3) -> usize {
    let a = v.abs();
    if a.x > a.y {
        if a.x > a.z {
            0
        } else {
            2
        }
    } else if a.y > a.z {
        1
    } else {
        2
    }
}

fn unit_axis(axis: usize, sign: f32) -> Vec3 {
    let mut v = Vec3::ZERO;
    v[axis] = sign;
    v
}

pub fn from_sphere(from: &Sphere, into: &BoxSolid, entry: &CollisionEntry) -> Option<CollisionEntry> {
    if entry.into_clip_planes().is_some() {
        // Deepest contact among the faces, each clipped like a polygon.
        return into
            .face_polygons()
            .iter()
            .filter_map(|face| polygon::from_sphere(from, face, entry))
            .min_by(|a, b| {
                a.t().total_cmp(&b.t())
                    .then(b.depth().unwrap_or(0.0).total_cmp(&a.depth().unwrap_or(0.0)))
            });
    }

    let h = into.half_extents;
    let center = into.to_local(entry.wrt().transform_point3(from.center()));
    let radius = xform_radius(from.radius(), entry.wrt());
    let prev_center = if entry.has_prev() {
        into.to_local(entry.wrt_prev().transform_point3(from.center()))
    } else {
        center
    };

    let mut contact_center = prev_center;
    let mut t = 0.0;
    let mut swept = false;

    let mut vec = prev_center - prev_center.clamp(-h, h);
    if vec.length_squared() > radius * radius {
        if !entry.has_prev() {
            return None;
        }
        let delta = center - prev_center;
        t = into.intersects_swept_sphere(prev_center, delta, radius)?;
        contact_center = prev_center + delta * t;

        // The normal must oppose the motion.
        vec = contact_center - contact_center.clamp(-h, h);
        for i in 0..3 {
            if (vec[i] > 0.0) == (delta[i] > 0.0) {
                vec[i] = 0.0;
            }
        }
        if vec.length_squared() < NEAR_ZERO * NEAR_ZERO {
            vec = -delta;
        }
        swept = true;
    } else if vec.length_squared() == 0.0 {
        // Center inside the box.
        vec = prev_center;
    }

    let axis = axis_of_largest(vec);
    let sign = if vec[axis] > 0.0 { 1.0 } else { -1.0 };
    let mut surface = contact_center.clamp(-h, h);
    surface[axis] = h[axis] * sign;
    let normal = unit_axis(axis, sign);

    let mut interior = surface;
    if swept {
        interior += center - contact_center;
    } else {
        let mut other = surface - contact_center;
        other[axis] = 0.0;
        let reach = (radius * radius - other.length_squared()).max(0.0).sqrt();
        interior[axis] = center[axis] - reach * sign;
    }

    let world_surface = into.from_local(surface);
    let world_normal = into.vector_from_local(normal);
    let mut hit = entry.hit();
    hit.set_surface_point(world_surface);
    hit.set_interior_point(into.from_local(interior));
    hit.set_surface_normal(entry.pick_normal(world_normal));
    hit.set_contact_pos(into.from_local(contact_center));
    hit.set_contact_normal(world_normal);
    hit.set_t(t);
    Some(hit)
}

fn from_linear(probe: LineProbe, into: &BoxSolid, entry: &CollisionEntry) -> Option<CollisionEntry> {
    if entry.into_clip_planes().is_some() {
        // First face crossed whose clipped outline contains the crossing.
        return into
            .face_polygons()
            .iter()
            .filter_map(|face| polygon::from_linear(probe, face, entry))
            .min_by(|a, b| a.t().total_cmp(&b.t()));
    }

    let origin = into.to_local(probe.origin);
    let direction = into.vector_to_local(probe.direction);
    let (t1, t2) = into.intersects_line(origin, direction, 0.0)?;
    if t2 < probe.t_min() || t1 > probe.t_max() {
        return None;
    }

    let mut hit = entry.hit();
    let t = if probe.extent != Extent::Line && t1 < 0.0 {
        // Starts inside: the way out is the surface.
        hit.set_interior_point(probe.origin);
        t2
    } else {
        if probe.extent == Extent::Segment {
            hit.set_interior_point(probe.point_at(t2.min(1.0)));
        }
        t1
    };

    let local_point = origin + direction * t;
    hit.set_surface_point(probe.point_at(t));
    hit.set_surface_normal(entry.pick_normal(into.vector_from_local(into.local_surface_normal(local_point))));
    hit.set_t(t);
    Some(hit)
}

pub fn from_ray(from: &Ray, into: &BoxSolid, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_ray(from, entry), into, entry)
}

pub fn from_line(from: &Line, into: &BoxSolid, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_line(from, entry), into, entry)
}

pub fn from_segment(from: &Segment, into: &BoxSolid, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_segment(from, entry), into, entry)
}

/// Contact between a capsule axis `a..b` (local frame) of `radius` and the
/// box, as `(surface, interior, local normal)` with the normal pointing at
/// the capsule.
fn capsule_contact(into: &BoxSolid, a: Vec3, b: Vec3, radius: f32) -> Option<(Vec3, Vec3, Vec3)> {
    let (on_axis, on_box) = into.closest_to_segment(a, b);
    let offset = on_axis - on_box;
    let dist = offset.length();
    if dist > radius {
        return None;
    }

    if dist > NEAR_ZERO {
        let normal = offset / dist;
        return Some((on_box, on_axis - normal * radius, normal));
    }

    // The axis passes through the box: leave by the nearest face.
    let (axis, sign, gap) = into.nearest_face(on_axis);
    let normal = unit_axis(axis, sign);
    let mut surface = on_axis;
    surface[axis] = into.half_extents[axis] * sign;
    Some((surface, surface - normal * (gap + radius), normal))
}

pub fn from_capsule(from: &Capsule, into: &BoxSolid, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let a = into.to_local(entry.wrt().transform_point3(from.point_a()));
    let b = into.to_local(entry.wrt().transform_point3(from.point_b()));
    let radius = xform_radius(from.radius(), entry.wrt());
    let (surface, interior, normal) = capsule_contact(into, a, b, radius)?;

    let mut hit = entry.hit();
    hit.set_surface_point(into.from_local(surface));
    hit.set_interior_point(into.from_local(interior));
    hit.set_surface_normal(entry.pick_normal(into.vector_from_local(normal)));
    Some(hit)
}

/// Contact for a box (already in the capsule's space) moving into a capsule
/// with axis `a..b`, as `(surface, interior, normal)` from the capsule's
/// side.
pub(crate) fn box_capsule_contact(from: &BoxSolid, a: Vec3, b: Vec3, radius: f32) -> Option<(Vec3, Vec3, Vec3)> {
    // The capsule's nearest surface point is its surface, the box point
    // nearest the axis is the interior, and the box is pushed the other way.
    let (surface, interior, normal) = capsule_contact(from, from.to_local(a), from.to_local(b), radius)?;
    Some((
        from.from_local(interior),
        from.from_local(surface),
        -from.vector_from_local(normal),
    ))
}

pub fn from_box(from: &BoxSolid, into: &BoxSolid, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let world = from.frame_in(entry.wrt());
    let diff = into.to_local(world.center);
    let from_axes = [
        into.vector_to_local(world.axes.col(0)),
        into.vector_to_local(world.axes.col(1)),
        into.vector_to_local(world.axes.col(2)),
    ];
    let fe = world.half_extents;
    let ie = into.half_extents;

    let mut min_pen = f32::INFINITY;
    let mut axis = 0;

    // Into-box face axes.
    for i in 0..3 {
        let r2: f32 = (0..3).map(|j| (from_axes[j][i] * fe[j]).abs()).sum();
        let pen = ie[i] + r2 - diff[i].abs();
        if pen < 0.0 {
            return None;
        }
        if pen < min_pen {
            min_pen = pen;
            axis = i;
        }
    }

    // From-box face axes.
    for j in 0..3 {
        let u = from_axes[j];
        let r1 = (u * ie).abs().element_sum();
        let pen = r1 + fe[j] - diff.dot(u).abs();
        if pen < 0.0 {
            return None;
        }
        min_pen = min_pen.min(pen);
    }

    // Edge-edge axes.
    for i in 0..3 {
        for (j, u) in from_axes.iter().enumerate() {
            let l = unit_axis(i, 1.0).cross(*u);
            if l.length_squared() < NEAR_ZERO {
                continue;
            }
            let r1 = (l * ie).abs().element_sum();
            let r2: f32 = (0..3)
                .filter(|&k| k != j)
                .map(|k| (from_axes[k].dot(l) * fe[k]).abs())
                .sum();
            if diff.dot(l).abs() > r1 + r2 {
                return None;
            }
        }
    }

    let sign = if diff[axis] >= 0.0 { 1.0 } else { -1.0 };
    let normal = unit_axis(axis, sign);
    let mut surface = diff.clamp(-ie, ie);
    surface[axis] = ie[axis] * sign;

    let mut hit = entry.hit();
    hit.set_surface_point(into.from_local(surface));
    hit.set_interior_point(into.from_local(surface - normal * min_pen));
    hit.set_surface_normal(entry.pick_normal(into.vector_from_local(normal)));
    hit.set_depth(min_pen);
    Some(hit)
}

pub fn from_parabola(from: &ParabolaArc, into: &BoxSolid, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let local = local_parabola(into, &from.parabola().xform(entry.wrt()));
    let planes = into.local_face_planes();

    let mut best: Option<(f32, usize)> = None;
    for (i, face) in planes.iter().enumerate() {
        let Some((t1, t2)) = face.intersects_parabola(&local) else {
            continue;
        };
        for t in [t1, t2] {
            if !from.contains_t(t) || best.is_some_and(|(bt, _)| t >= bt) {
                continue;
            }
            let p = local.calc_point(t);
            let behind_all = planes
                .iter()
                .enumerate()
                .all(|(k, other)| k == i || other.signed_distance(p) <= POINT_EPSILON);
            if behind_all {
                best = Some((t, i));
            }
        }
    }

    let (t, face) = best?;
    let mut hit = entry.hit();
    hit.set_surface_point(into.from_local(local.calc_point(t)));
    hit.set_surface_normal(entry.pick_normal(into.vector_from_local(planes[face].normal)));
    hit.set_t(t);
    Some(hit)
}

fn local_parabola(into: &BoxSolid, p: &Parabola) -> Parabola {
    Parabola::new(
        into.vector_to_local(p.a),
        into.vector_to_local(p.b),
        into.to_local(p.c),
    )
}
