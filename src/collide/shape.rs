//! The tagged shape type shared by every collision test.

use std::sync::OnceLock;

use glam::{Mat4, Vec3};

use crate::bounds::BoundingVolume;
use crate::error::CollideError;
use crate::math::{Parabola, Plane, NEAR_ZERO};

use super::solid::{
    BoxSolid, Capsule, Heightfield, InvSphere, Line, ParabolaArc, Polygon, Ray, Segment, Sphere,
};

/// Discriminant of a [`ShapeKind`], used to key the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeType {
    Sphere,
    InvSphere,
    Plane,
    Polygon,
    Box,
    Capsule,
    Ray,
    Line,
    Segment,
    Parabola,
    Heightfield,
}

impl ShapeType {
    pub const COUNT: usize = 11;

    pub const ALL: [ShapeType; Self::COUNT] = [
        ShapeType::Sphere,
        ShapeType::InvSphere,
        ShapeType::Plane,
        ShapeType::Polygon,
        ShapeType::Box,
        ShapeType::Capsule,
        ShapeType::Ray,
        ShapeType::Line,
        ShapeType::Segment,
        ShapeType::Parabola,
        ShapeType::Heightfield,
    ];

    /// Row/column of this type in the dispatch table.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeType::Sphere => "sphere",
            ShapeType::InvSphere => "inverted sphere",
            ShapeType::Plane => "plane",
            ShapeType::Polygon => "polygon",
            ShapeType::Box => "box",
            ShapeType::Capsule => "capsule",
            ShapeType::Ray => "ray",
            ShapeType::Line => "line",
            ShapeType::Segment => "segment",
            ShapeType::Parabola => "parabola",
            ShapeType::Heightfield => "heightfield",
        }
    }
}

impl std::fmt::Display for ShapeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind-specific geometric parameters.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    Sphere(Sphere),
    InvSphere(InvSphere),
    Plane(Plane),
    Polygon(Polygon),
    Box(BoxSolid),
    Capsule(Capsule),
    Ray(Ray),
    Line(Line),
    Segment(Segment),
    Parabola(ParabolaArc),
    Heightfield(Heightfield),
}

impl ShapeKind {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            ShapeKind::Sphere(_) => ShapeType::Sphere,
            ShapeKind::InvSphere(_) => ShapeType::InvSphere,
            ShapeKind::Plane(_) => ShapeType::Plane,
            ShapeKind::Polygon(_) => ShapeType::Polygon,
            ShapeKind::Box(_) => ShapeType::Box,
            ShapeKind::Capsule(_) => ShapeType::Capsule,
            ShapeKind::Ray(_) => ShapeType::Ray,
            ShapeKind::Line(_) => ShapeType::Line,
            ShapeKind::Segment(_) => ShapeType::Segment,
            ShapeKind::Parabola(_) => ShapeType::Parabola,
            ShapeKind::Heightfield(_) => ShapeType::Heightfield,
        }
    }

    fn xform(&mut self, mat: &Mat4) {
        match self {
            ShapeKind::Sphere(s) => s.xform(mat),
            ShapeKind::InvSphere(s) => s.xform(mat),
            ShapeKind::Plane(p) => *p = p.xform(mat),
            ShapeKind::Polygon(p) => p.xform(mat),
            ShapeKind::Box(b) => b.xform(mat),
            ShapeKind::Capsule(c) => c.xform(mat),
            ShapeKind::Ray(r) => r.xform(mat),
            ShapeKind::Line(l) => l.xform(mat),
            ShapeKind::Segment(s) => s.xform(mat),
            ShapeKind::Parabola(p) => p.xform(mat),
            ShapeKind::Heightfield(h) => h.xform(mat),
        }
    }

    /// Drop cached derived geometry after the parameters changed.
    fn invalidate(&mut self) {
        match self {
            ShapeKind::Polygon(p) => p.invalidate(),
            ShapeKind::Capsule(c) => c.invalidate(),
            ShapeKind::Heightfield(h) => h.invalidate(),
            _ => {}
        }
    }

    fn compute_bounds(&self) -> BoundingVolume {
        match self {
            ShapeKind::Sphere(s) => BoundingVolume::sphere(s.center(), s.radius()),
            ShapeKind::InvSphere(_) | ShapeKind::Plane(_) => BoundingVolume::Infinite,
            ShapeKind::Polygon(p) => BoundingVolume::from_points(p.points().iter().copied()),
            ShapeKind::Box(b) => BoundingVolume::sphere(b.center(), b.half_extents().length()),
            ShapeKind::Capsule(c) => BoundingVolume::sphere(
                (c.point_a() + c.point_b()) * 0.5,
                c.point_a().distance(c.point_b()) * 0.5 + c.radius(),
            ),
            ShapeKind::Ray(_) | ShapeKind::Line(_) => BoundingVolume::Infinite,
            ShapeKind::Segment(s) => BoundingVolume::from_points([s.point_a(), s.point_b()]),
            ShapeKind::Parabola(p) => p.bounds(),
            ShapeKind::Heightfield(h) => h.bounds(),
        }
    }

    fn origin(&self) -> Vec3 {
        match self {
            ShapeKind::Sphere(s) => s.center(),
            ShapeKind::InvSphere(s) => s.center(),
            ShapeKind::Plane(p) => p.point(),
            ShapeKind::Polygon(p) => p.median(),
            ShapeKind::Box(b) => b.center(),
            ShapeKind::Capsule(c) => c.point_a(),
            ShapeKind::Ray(r) => r.origin(),
            ShapeKind::Line(l) => l.origin(),
            ShapeKind::Segment(s) => s.point_a(),
            ShapeKind::Parabola(p) => p.parabola().calc_point(p.t1()),
            ShapeKind::Heightfield(h) => h.origin(),
        }
    }
}

/// A single collision primitive.
///
/// Geometry only changes through [`Shape::xform`] or [`Shape::edit`], which
/// drop the cached bounding volume and the kind's derived tables.
#[derive(Debug, Clone)]
pub struct Shape {
    kind: ShapeKind,
    tangible: bool,
    effective_normal: Option<Vec3>,
    respect_effective_normal: bool,
    bounds: OnceLock<BoundingVolume>,
}

impl Shape {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            tangible: true,
            effective_normal: None,
            respect_effective_normal: true,
            bounds: OnceLock::new(),
        }
    }

    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::new(ShapeKind::Sphere(Sphere::new(center, radius)))
    }

    pub fn inv_sphere(center: Vec3, radius: f32) -> Self {
        Self::new(ShapeKind::InvSphere(InvSphere::new(center, radius)))
    }

    pub fn plane(plane: Plane) -> Self {
        Self::new(ShapeKind::Plane(plane))
    }

    /// A convex polygon. Points are given counter-clockwise as seen from
    /// the front face.
    pub fn polygon(points: &[Vec3]) -> Result<Self, CollideError> {
        Ok(Self::new(ShapeKind::Polygon(Polygon::new(points)?)))
    }

    /// Axis-aligned box between two corners.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        Self::new(ShapeKind::Box(BoxSolid::from_min_max(min, max)))
    }

    pub fn capsule(a: Vec3, b: Vec3, radius: f32) -> Self {
        Self::new(ShapeKind::Capsule(Capsule::new(a, b, radius)))
    }

    pub fn ray(origin: Vec3, direction: Vec3) -> Self {
        Self::new(ShapeKind::Ray(Ray::new(origin, direction)))
    }

    pub fn line(origin: Vec3, direction: Vec3) -> Self {
        Self::new(ShapeKind::Line(Line::new(origin, direction)))
    }

    pub fn segment(a: Vec3, b: Vec3) -> Self {
        Self::new(ShapeKind::Segment(Segment::new(a, b)))
    }

    pub fn parabola(parabola: Parabola, t1: f32, t2: f32) -> Self {
        Self::new(ShapeKind::Parabola(ParabolaArc::new(parabola, t1, t2)))
    }

    pub fn heightfield(heightfield: Heightfield) -> Self {
        Self::new(ShapeKind::Heightfield(heightfield))
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn shape_type(&self) -> ShapeType {
        self.kind.shape_type()
    }

    /// Intangible shapes are still detected but produce no physical response.
    pub fn is_tangible(&self) -> bool {
        self.tangible
    }

    pub fn set_tangible(&mut self, tangible: bool) {
        self.tangible = tangible;
    }

    pub fn with_tangible(mut self, tangible: bool) -> Self {
        self.tangible = tangible;
        self
    }

    /// Normal reported for contacts into this shape in place of the true one,
    /// for movers that respect it.
    pub fn effective_normal(&self) -> Option<Vec3> {
        self.effective_normal
    }

    pub fn set_effective_normal(&mut self, normal: Option<Vec3>) -> Result<(), CollideError> {
        self.effective_normal = match normal {
            Some(n) => Some(n.try_normalize().ok_or(CollideError::DegenerateNormal(n))?),
            None => None,
        };
        Ok(())
    }

    pub fn respect_effective_normal(&self) -> bool {
        self.respect_effective_normal
    }

    pub fn set_respect_effective_normal(&mut self, respect: bool) {
        self.respect_effective_normal = respect;
    }

    /// Local-space bounding volume, computed on first use.
    pub fn bounds(&self) -> BoundingVolume {
        *self.bounds.get_or_init(|| self.kind.compute_bounds())
    }

    /// Significance anchor for sorting contacts.
    pub fn origin(&self) -> Vec3 {
        self.kind.origin()
    }

    /// Apply an affine transform to the shape's geometry.
    pub fn xform(&mut self, mat: &Mat4) {
        self.edit(|kind| kind.xform(mat));
        if let Some(normal) = self.effective_normal {
            let transformed = mat.transform_vector3(normal);
            self.effective_normal = if transformed.length_squared() > NEAR_ZERO {
                Some(transformed.normalize())
            } else {
                None
            };
        }
    }

    /// Mutate the shape's parameters in place.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut ShapeKind) -> R) -> R {
        let result = f(&mut self.kind);
        self.kind.invalidate();
        self.bounds = OnceLock::new();
        result
    }
}

impl From<ShapeKind> for Shape {
    fn from(kind: ShapeKind) -> Self {
        Self::new(kind)
    }
}
