//! Geometric primitives and helpers shared by every shape test.

mod parabola;
mod plane;

pub use parabola::Parabola;
pub use plane::Plane;

use glam::{Mat4, Vec3};

/// Threshold below which lengths and dot products are treated as zero.
pub const NEAR_ZERO: f32 = 1.0e-6;

/// Threshold for comparing points that should coincide.
pub const POINT_EPSILON: f32 = 1.0e-4;

/// Largest axis scale of an affine matrix (use max axis for non-uniform scaling).
pub fn max_scale(mat: &Mat4) -> f32 {
    mat.x_axis
        .truncate()
        .length_squared()
        .max(mat.y_axis.truncate().length_squared())
        .max(mat.z_axis.truncate().length_squared())
        .sqrt()
}

/// Solve `|from + t * delta - center|² = radius²` for `t`.
///
/// Returns the two roots in ascending order. A tangent line yields a
/// double root. A zero-length `delta` reports `(0, 0)` when `from` lies
/// inside the sphere and `None` otherwise.
pub fn sphere_intersects_line(
    center: Vec3,
    radius: f32,
    from: Vec3,
    delta: Vec3,
    inflate: f32,
) -> Option<(f32, f32)> {
    let radius = radius + inflate;
    let a = delta.dot(delta);
    let fc = from - center;
    let fc_d2 = fc.dot(fc);
    let r2 = radius * radius;

    if a < NEAR_ZERO * NEAR_ZERO {
        // Degenerate line: it's just a point.
        return (fc_d2 <= r2).then_some((0.0, 0.0));
    }

    let b = 2.0 * delta.dot(fc);
    let c = fc_d2 - r2;
    let radical = b * b - 4.0 * a * c;

    if radical.abs() < NEAR_ZERO {
        // Tangent.
        let t = -b / (2.0 * a);
        return Some((t, t));
    }
    if radical < 0.0 {
        return None;
    }

    let reciprocal_2a = 1.0 / (2.0 * a);
    let sqrt_radical = radical.sqrt();
    Some((
        (-b - sqrt_radical) * reciprocal_2a,
        (-b + sqrt_radical) * reciprocal_2a,
    ))
}

/// Closest point to `p` on the segment `a..b`, with its parameter.
pub fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 < NEAR_ZERO * NEAR_ZERO {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Closest points between segments `p0..p1` and `q0..q1`.
///
/// Solves the 2x2 system in the segment parameters, clamping each to
/// `[0, 1]` and re-solving the other when clamped.
pub fn closest_segment_points(p0: Vec3, p1: Vec3, q0: Vec3, q1: Vec3) -> (Vec3, Vec3) {
    let u = p1 - p0;
    let v = q1 - q0;
    let w = p0 - q0;
    let a = u.dot(u);
    let b = u.dot(v);
    let c = v.dot(v);
    let d = u.dot(w);
    let e = v.dot(w);
    let denom = a * c - b * b;

    let (mut sn, mut sd, mut tn, td) = if denom < NEAR_ZERO {
        // Parallel: pin the first segment at its start.
        (0.0, 1.0, e, c)
    } else {
        let sn = b * e - c * d;
        let tn = a * e - b * d;
        if sn < 0.0 {
            (0.0, denom, e, c)
        } else if sn > denom {
            (denom, denom, e + b, c)
        } else {
            (sn, denom, tn, denom)
        }
    };

    if tn < 0.0 {
        tn = 0.0;
        if -d < 0.0 {
            sn = 0.0;
        } else if -d > a {
            sn = sd;
        } else {
            sn = -d;
            sd = a;
        }
    } else if tn > td {
        tn = td;
        if (-d + b) < 0.0 {
            sn = 0.0;
        } else if (-d + b) > a {
            sn = sd;
        } else {
            sn = -d + b;
            sd = a;
        }
    }

    let sc = if sn.abs() < NEAR_ZERO || sd.abs() < NEAR_ZERO {
        0.0
    } else {
        sn / sd
    };
    let tc = if tn.abs() < NEAR_ZERO || td.abs() < NEAR_ZERO {
        0.0
    } else {
        tn / td
    };

    (p0 + u * sc, q0 + v * tc)
}

/// Find the closest point on triangle `abc` to `p`.
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// First `t` in `[0, 1]` at which the point `from + t * delta` comes within
/// `radius` of the segment `a..b`: a sphere swept into a capsule.
pub fn segment_capsule_first_hit(from: Vec3, delta: Vec3, a: Vec3, b: Vec3, radius: f32) -> Option<f32> {
    let mut best: Option<f32> = None;

    for cap in [a, b] {
        if let Some((t1, t2)) = sphere_intersects_line(cap, radius, from, delta, 0.0) {
            if t2 >= 0.0 && t1 <= 1.0 {
                best = Some(earlier(best, t1.max(0.0)));
            }
        }
    }

    let axis = b - a;
    let len2 = axis.length_squared();
    if len2 < NEAR_ZERO * NEAR_ZERO {
        return best;
    }

    // Cylinder body: drop the components along the axis and solve in 2D.
    let d = delta - axis * (delta.dot(axis) / len2);
    let m = (from - a) - axis * ((from - a).dot(axis) / len2);
    let qa = d.dot(d);
    let qb = 2.0 * m.dot(d);
    let qc = m.dot(m) - radius * radius;

    let t = if qa < NEAR_ZERO * NEAR_ZERO {
        (qc <= 0.0).then_some(0.0)
    } else {
        let radical = qb * qb - 4.0 * qa * qc;
        if radical < 0.0 {
            None
        } else {
            let sqrt_radical = radical.sqrt();
            let t1 = (-qb - sqrt_radical) / (2.0 * qa);
            let t2 = (-qb + sqrt_radical) / (2.0 * qa);
            (t2 >= 0.0 && t1 <= 1.0).then_some(t1.max(0.0))
        }
    };
    if let Some(t) = t {
        let s = (from + delta * t - a).dot(axis) / len2;
        if (0.0..=1.0).contains(&s) {
            best = Some(earlier(best, t));
        }
    }
    best
}

fn earlier(best: Option<f32>, t: f32) -> f32 {
    best.map_or(t, |b| b.min(t))
}

/// Möller–Trumbore ray/triangle test. Returns the line parameter of the hit.
///
/// Both faces are hit; callers filter on `t`.
pub fn ray_triangle(origin: Vec3, direction: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let e1 = b - a;
    let e2 = c - a;
    let pvec = direction.cross(e2);
    let det = e1.dot(pvec);
    if det.abs() < NEAR_ZERO * NEAR_ZERO {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = origin - a;
    let u = tvec.dot(pvec) * inv_det;
    if !(-NEAR_ZERO..=1.0 + NEAR_ZERO).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(e1);
    let v = direction.dot(qvec) * inv_det;
    if v < -NEAR_ZERO || u + v > 1.0 + NEAR_ZERO {
        return None;
    }
    Some(e2.dot(qvec) * inv_det)
}
