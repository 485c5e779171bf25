//! Planes in Hessian normal form.

use glam::{Mat3, Mat4, Vec3, Vec4};

use super::{Parabola, NEAR_ZERO};

/// A plane in 3D space defined by the equation `normal · p + distance = 0`.
///
/// Constructors normalize the normal, so `signed_distance` is a true
/// Euclidean distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal (a, b, c).
    pub normal: Vec3,
    /// Distance term (d).
    pub distance: f32,
}

impl Plane {
    /// Create a plane from a normal and distance term, normalizing both.
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }.normalize()
    }

    /// Create a plane from a Vec4 (xyz = normal, w = distance).
    pub fn from_vec4(v: Vec4) -> Self {
        Self::new(v.truncate(), v.w)
    }

    /// Create the plane through `point` facing along `normal`.
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Create the plane through three points, front face counter-clockwise.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::from_point_normal(a, (b - a).cross(c - a))
    }

    /// Normalize the plane equation.
    pub fn normalize(&self) -> Self {
        let len = self.normal.length();
        if len > 0.0 {
            Self {
                normal: self.normal / len,
                distance: self.distance / len,
            }
        } else {
            *self
        }
    }

    /// Get the signed distance from a point to the plane.
    /// Positive = in front (same side as normal), Negative = behind.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// The point on the plane closest to the origin.
    pub fn point(&self) -> Vec3 {
        -self.normal * self.distance
    }

    /// Orthogonal projection of `point` onto the plane.
    pub fn project(&self, point: Vec3) -> Vec3 {
        point - self.normal * self.signed_distance(point)
    }

    /// The same plane facing the other way.
    pub fn flip(&self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    pub fn to_vec4(&self) -> Vec4 {
        self.normal.extend(self.distance)
    }

    /// Parameter `t` at which the line `from + t * delta` crosses the plane.
    ///
    /// Returns `None` when the line is parallel to the plane.
    pub fn intersects_line(&self, from: Vec3, delta: Vec3) -> Option<f32> {
        let denom = self.normal.dot(delta);
        if denom.abs() < NEAR_ZERO {
            return None;
        }
        Some(-self.signed_distance(from) / denom)
    }

    /// Line of intersection with another plane as `(point, direction)`.
    ///
    /// Returns `None` for parallel planes.
    pub fn intersects_plane(&self, other: &Plane) -> Option<(Vec3, Vec3)> {
        let n1 = self.normal;
        let n2 = other.normal;
        let direction = n1.cross(n2);
        if direction.length_squared() < NEAR_ZERO * NEAR_ZERO {
            return None;
        }

        let n1n1 = n1.dot(n1);
        let n2n2 = n2.dot(n2);
        let n1n2 = n1.dot(n2);
        let det_inv = 1.0 / (n1n1 * n2n2 - n1n2 * n1n2);
        let c1 = (other.distance * n1n2 - self.distance * n2n2) * det_inv;
        let c2 = (self.distance * n1n2 - other.distance * n1n1) * det_inv;
        Some((n1 * c1 + n2 * c2, direction))
    }

    /// Parameters at which a parabola crosses the plane, sorted ascending.
    ///
    /// A single crossing is reported as a double root.
    pub fn intersects_parabola(&self, parabola: &Parabola) -> Option<(f32, f32)> {
        let a = self.normal.dot(parabola.a);
        let b = self.normal.dot(parabola.b);
        let c = self.signed_distance(parabola.c);

        if a.abs() < NEAR_ZERO {
            if b.abs() < NEAR_ZERO {
                return None;
            }
            let t = -c / b;
            return Some((t, t));
        }

        let radical = b * b - 4.0 * a * c;
        if radical < 0.0 {
            return None;
        }
        let sqrt_radical = radical.sqrt();
        let t1 = (-b - sqrt_radical) / (2.0 * a);
        let t2 = (-b + sqrt_radical) / (2.0 * a);
        Some((t1.min(t2), t1.max(t2)))
    }

    /// Transform the plane by an affine matrix.
    pub fn xform(&self, mat: &Mat4) -> Self {
        let point = mat.transform_point3(self.point());
        let normal_mat = Mat3::from_mat4(*mat).inverse().transpose();
        Self::from_point_normal(point, normal_mat * self.normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_distance() {
        let plane = Plane::from_point_normal(Vec3::new(0.0, 0.0, 2.0), Vec3::Z);
        assert!((plane.signed_distance(Vec3::new(5.0, 1.0, 5.0)) - 3.0).abs() < 1e-5);
        assert!((plane.signed_distance(Vec3::ZERO) + 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_from_points_winding() {
        let plane = Plane::from_points(Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!((plane.normal - Vec3::Z).length() < 1e-6);
        let flipped = Plane::from_points(Vec3::ZERO, Vec3::Y, Vec3::X);
        assert!((flipped.normal + Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_intersects_line() {
        let plane = Plane::from_point_normal(Vec3::ZERO, Vec3::Z);
        let t = plane
            .intersects_line(Vec3::new(0.0, 0.0, 4.0), Vec3::new(0.0, 0.0, -2.0))
            .unwrap();
        assert!((t - 2.0).abs() < 1e-6);
        assert!(plane.intersects_line(Vec3::Z, Vec3::X).is_none());
    }

    #[test]
    fn test_intersects_plane() {
        let floor = Plane::from_point_normal(Vec3::ZERO, Vec3::Z);
        let wall = Plane::from_point_normal(Vec3::new(3.0, 0.0, 0.0), Vec3::X);
        let (point, dir) = floor.intersects_plane(&wall).unwrap();
        assert!(floor.signed_distance(point).abs() < 1e-5);
        assert!(wall.signed_distance(point).abs() < 1e-5);
        assert!(dir.normalize().dot(Vec3::Y).abs() > 0.999);
        assert!(floor.intersects_plane(&floor.flip()).is_none());
    }

    #[test]
    fn test_intersects_parabola() {
        // Thrown upward from z = 0, lands again at t = 2.
        let parabola = Parabola::new(Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 2.0), Vec3::ZERO);
        let floor = Plane::from_point_normal(Vec3::ZERO, Vec3::Z);
        let (t1, t2) = floor.intersects_parabola(&parabola).unwrap();
        assert!(t1.abs() < 1e-5);
        assert!((t2 - 2.0).abs() < 1e-5);

        let ceiling = Plane::from_point_normal(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert!(ceiling.intersects_parabola(&parabola).is_none());
    }

    #[test]
    fn test_xform_roundtrip() {
        let plane = Plane::from_point_normal(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 1.0, 0.0));
        let mat = Mat4::from_rotation_z(0.7) * Mat4::from_translation(Vec3::new(4.0, -1.0, 2.0));
        let back = plane.xform(&mat).xform(&mat.inverse());
        assert!((back.normal - plane.normal).length() < 1e-5);
        assert!((back.distance - plane.distance).abs() < 1e-4);
    }
}
