//! Bounding volumes used to prune collision tests.
//!
//! Shapes and scene nodes each expose a [`BoundingVolume`]. The traverser and
//! the heightfield index only need three capabilities from it: overlap
//! testing, transforming in place, and building a volume around others.

use glam::{Mat4, Vec3};

use crate::math::{max_scale, NEAR_ZERO};

/// Result of a containment test between two volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// No overlap at all.
    Outside,
    /// The other volume lies completely inside this one.
    Inside,
    /// Partial overlap.
    Intersecting,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a set of points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);

        for p in points {
            min = min.min(p);
            max = max.max(p);
        }

        Self { min, max }
    }

    /// Get the center of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the AABB.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get all 8 corners of the AABB.
    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Check if a point is inside the AABB.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Merge two AABBs.
    pub fn merge(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Test whether two AABBs overlap.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Test whether a sphere touches the box.
    #[inline]
    pub fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }

    /// Slab test of the line `from + t * delta` against the box.
    ///
    /// Returns the entry and exit parameters, unclamped.
    pub fn intersects_line(&self, from: Vec3, delta: Vec3) -> Option<(f32, f32)> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for i in 0..3 {
            if delta[i].abs() < NEAR_ZERO {
                if from[i] < self.min[i] || from[i] > self.max[i] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / delta[i];
            let mut t1 = (self.min[i] - from[i]) * inv;
            let mut t2 = (self.max[i] - from[i]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some((t_min, t_max))
    }

    /// The box enclosing this one after an affine transform.
    pub fn xform(&self, mat: &Mat4) -> Self {
        Self::from_points(self.corners().map(|c| mat.transform_point3(c)))
    }
}

/// A bounding volume, or the absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BoundingVolume {
    /// Bounds nothing. Overlaps nothing.
    #[default]
    Empty,
    /// Bounds everything (planes, lines, inverted spheres).
    Infinite,
    Sphere { center: Vec3, radius: f32 },
    Box(Aabb),
}

impl BoundingVolume {
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::Sphere { center, radius }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let aabb = Aabb::from_points(points);
        if aabb.min.x > aabb.max.x {
            Self::Empty
        } else {
            Self::Box(aabb)
        }
    }

    /// Build a volume enclosing every one of `volumes`.
    pub fn around<'a>(volumes: impl IntoIterator<Item = &'a BoundingVolume>) -> Self {
        let mut result = Self::Empty;
        for volume in volumes {
            result.extend(volume);
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Axis-aligned box enclosing this volume, if it is finite and non-empty.
    pub fn aabb(&self) -> Option<Aabb> {
        match *self {
            Self::Sphere { center, radius } => {
                Some(Aabb::new(center - Vec3::splat(radius), center + Vec3::splat(radius)))
            }
            Self::Box(aabb) => Some(aabb),
            Self::Empty | Self::Infinite => None,
        }
    }

    /// Grow this volume to enclose `other`.
    pub fn extend(&mut self, other: &BoundingVolume) {
        *self = match (*self, *other) {
            (_, Self::Empty) => *self,
            (Self::Empty, _) => *other,
            (Self::Infinite, _) | (_, Self::Infinite) => Self::Infinite,
            (Self::Sphere { center: c1, radius: r1 }, Self::Sphere { center: c2, radius: r2 }) => {
                let d = c1.distance(c2);
                if d + r2 <= r1 {
                    *self
                } else if d + r1 <= r2 {
                    *other
                } else {
                    let radius = (d + r1 + r2) * 0.5;
                    let dir = if d > NEAR_ZERO { (c2 - c1) / d } else { Vec3::ZERO };
                    Self::Sphere {
                        center: c1 + dir * (radius - r1),
                        radius,
                    }
                }
            }
            (a, b) => match (a.aabb(), b.aabb()) {
                (Some(a), Some(b)) => Self::Box(a.merge(&b)),
                _ => Self::Infinite,
            },
        };
    }

    /// Transform the volume in place.
    pub fn xform(&mut self, mat: &Mat4) {
        match self {
            Self::Sphere { center, radius } => {
                *center = mat.transform_point3(*center);
                *radius *= max_scale(mat);
            }
            Self::Box(aabb) => *aabb = aabb.xform(mat),
            Self::Empty | Self::Infinite => {}
        }
    }

    /// Transformed copy of the volume.
    pub fn transformed(&self, mat: &Mat4) -> Self {
        let mut copy = *self;
        copy.xform(mat);
        copy
    }

    /// Classify `other` against this volume.
    pub fn contains(&self, other: &BoundingVolume) -> Intersection {
        match (self, other) {
            (Self::Empty, _) | (_, Self::Empty) => Intersection::Outside,
            (Self::Infinite, _) => Intersection::Inside,
            (_, Self::Infinite) => Intersection::Intersecting,
            (
                Self::Sphere { center: c1, radius: r1 },
                Self::Sphere { center: c2, radius: r2 },
            ) => {
                let d = c1.distance(*c2);
                if d > r1 + r2 {
                    Intersection::Outside
                } else if d + r2 <= *r1 {
                    Intersection::Inside
                } else {
                    Intersection::Intersecting
                }
            }
            (Self::Box(a), Self::Box(b)) => {
                if !a.overlaps(b) {
                    Intersection::Outside
                } else if a.contains_point(b.min) && a.contains_point(b.max) {
                    Intersection::Inside
                } else {
                    Intersection::Intersecting
                }
            }
            (Self::Box(a), Self::Sphere { center, radius }) => {
                if !a.overlaps_sphere(*center, *radius) {
                    Intersection::Outside
                } else if a.contains_point(*center - Vec3::splat(*radius))
                    && a.contains_point(*center + Vec3::splat(*radius))
                {
                    Intersection::Inside
                } else {
                    Intersection::Intersecting
                }
            }
            (Self::Sphere { center, radius }, Self::Box(b)) => {
                if !b.overlaps_sphere(*center, *radius) {
                    Intersection::Outside
                } else if b
                    .corners()
                    .iter()
                    .all(|c| c.distance_squared(*center) <= radius * radius)
                {
                    Intersection::Inside
                } else {
                    Intersection::Intersecting
                }
            }
        }
    }

    /// True when the two volumes overlap at all.
    pub fn intersects(&self, other: &BoundingVolume) -> bool {
        self.contains(other) != Intersection::Outside
    }
}
