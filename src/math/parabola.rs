use glam::{Mat4, Vec3};

/// A parabolic arc `p(t) = a t² + b t + c`, as traced by a thrown object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parabola {
    /// Half the acceleration.
    pub a: Vec3,
    /// Initial velocity.
    pub b: Vec3,
    /// Starting point.
    pub c: Vec3,
}

impl Parabola {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// The arc of a projectile launched from `start` with `velocity` under
    /// constant `acceleration`.
    pub fn from_launch(start: Vec3, velocity: Vec3, acceleration: Vec3) -> Self {
        Self {
            a: acceleration * 0.5,
            b: velocity,
            c: start,
        }
    }

    pub fn calc_point(&self, t: f32) -> Vec3 {
        self.a * t * t + self.b * t + self.c
    }

    pub fn calc_tangent(&self, t: f32) -> Vec3 {
        self.a * (2.0 * t) + self.b
    }

    /// Transform the arc; `a` and `b` are directions, `c` is a point.
    pub fn xform(&self, mat: &Mat4) -> Self {
        Self {
            a: mat.transform_vector3(self.a),
            b: mat.transform_vector3(self.b),
            c: mat.transform_point3(self.c),
        }
    }
}
