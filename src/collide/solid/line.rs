//! Rays, infinite lines and line segments.
//!
//! None of these are ever into-shapes. Into-shape modules test them through
//! [`LineProbe`], which carries the parameter range each kind accepts.

use glam::{Mat4, Vec3};

use crate::math::NEAR_ZERO;

use crate::collide::contact::CollisionEntry;

/// A half-infinite line from `origin` along `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        debug_assert!(direction.length_squared() > NEAR_ZERO, "ray needs a direction");
        Self { origin, direction }
    }

    /// Ray from `origin` through `point`.
    pub fn through(origin: Vec3, point: Vec3) -> Self {
        Self::new(origin, point - origin)
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction;
    }

    pub(crate) fn xform(&mut self, mat: &Mat4) {
        self.origin = mat.transform_point3(self.origin);
        self.direction = mat.transform_vector3(self.direction);
    }
}

/// An infinite line through `origin` along `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    origin: Vec3,
    direction: Vec3,
}

impl Line {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        debug_assert!(direction.length_squared() > NEAR_ZERO, "line needs a direction");
        Self { origin, direction }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub(crate) fn xform(&mut self, mat: &Mat4) {
        self.origin = mat.transform_point3(self.origin);
        self.direction = mat.transform_vector3(self.direction);
    }
}

/// The finite segment from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    a: Vec3,
    b: Vec3,
}

impl Segment {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { a, b }
    }

    pub fn point_a(&self) -> Vec3 {
        self.a
    }

    pub fn point_b(&self) -> Vec3 {
        self.b
    }

    pub fn set_point_a(&mut self, a: Vec3) {
        self.a = a;
    }

    pub fn set_point_b(&mut self, b: Vec3) {
        self.b = b;
    }

    pub(crate) fn xform(&mut self, mat: &Mat4) {
        self.a = mat.transform_point3(self.a);
        self.b = mat.transform_point3(self.b);
    }
}

/// Which part of the parametric line `origin + t * direction` exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Extent {
    Line,
    Ray,
    Segment,
}

/// A ray, line or segment expressed in the into-shape's space.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineProbe {
    pub origin: Vec3,
    pub direction: Vec3,
    pub extent: Extent,
}

impl LineProbe {
    pub fn from_ray(ray: &Ray, entry: &CollisionEntry) -> Self {
        Self {
            origin: entry.wrt().transform_point3(ray.origin),
            direction: entry.wrt().transform_vector3(ray.direction),
            extent: Extent::Ray,
        }
    }

    pub fn from_line(line: &Line, entry: &CollisionEntry) -> Self {
        Self {
            origin: entry.wrt().transform_point3(line.origin),
            direction: entry.wrt().transform_vector3(line.direction),
            extent: Extent::Line,
        }
    }

    pub fn from_segment(segment: &Segment, entry: &CollisionEntry) -> Self {
        let a = entry.wrt().transform_point3(segment.a);
        let b = entry.wrt().transform_point3(segment.b);
        Self {
            origin: a,
            direction: b - a,
            extent: Extent::Segment,
        }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    pub fn is_degenerate(&self) -> bool {
        self.direction.length_squared() < NEAR_ZERO * NEAR_ZERO
    }

    /// Lowest parameter the probe covers.
    pub fn t_min(&self) -> f32 {
        match self.extent {
            Extent::Line => f32::NEG_INFINITY,
            Extent::Ray | Extent::Segment => 0.0,
        }
    }

    /// Highest parameter the probe covers.
    pub fn t_max(&self) -> f32 {
        match self.extent {
            Extent::Line | Extent::Ray => f32::INFINITY,
            Extent::Segment => 1.0,
        }
    }

    pub fn contains_t(&self, t: f32) -> bool {
        t >= self.t_min() && t <= self.t_max()
    }

    /// Clip an entry/exit interval to the probe's extent.
    ///
    /// Returns `None` when the interval misses the probe entirely; otherwise
    /// the first covered parameter.
    pub fn first_hit(&self, t1: f32, t2: f32) -> Option<f32> {
        if t2 < self.t_min() || t1 > self.t_max() {
            return None;
        }
        Some(t1.max(self.t_min()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_hit_by_extent() {
        let ray = LineProbe {
            origin: Vec3::ZERO,
            direction: Vec3::X,
            extent: Extent::Ray,
        };
        assert_eq!(ray.first_hit(-2.0, -1.0), None);
        assert_eq!(ray.first_hit(-1.0, 3.0), Some(0.0));
        assert_eq!(ray.first_hit(2.0, 3.0), Some(2.0));

        let segment = LineProbe {
            extent: Extent::Segment,
            ..ray
        };
        assert_eq!(segment.first_hit(2.0, 3.0), None);
        assert_eq!(segment.first_hit(0.5, 3.0), Some(0.5));

        let line = LineProbe {
            extent: Extent::Line,
            ..ray
        };
        assert_eq!(line.first_hit(-2.0, -1.0), Some(-2.0));
    }

    #[test]
    fn test_segment_xform() {
        let mut s = Segment::new(Vec3::ZERO, Vec3::X);
        s.xform(&Mat4::from_translation(Vec3::Z));
        assert_eq!(s.point_a(), Vec3::Z);
        assert_eq!(s.point_b(), Vec3::new(1.0, 0.0, 1.0));
    }
}
