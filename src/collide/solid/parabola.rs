//! Parabolic arcs. Parabolas are only ever the from-shape; each into-shape
//! module tests them through [`first_chord_hit`] or an exact root solve.

use glam::{Mat4, Vec3};

use crate::bounds::{Aabb, BoundingVolume};
use crate::math::{Parabola, NEAR_ZERO};

/// Largest gap allowed between the arc and the chord standing in for it.
const CHORD_TOLERANCE: f32 = 0.001;

/// Subdivision stops here even if the chord is still too coarse.
const MAX_SUBDIVISIONS: u32 = 16;

/// The part of a [`Parabola`] between parameters `t1` and `t2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParabolaArc {
    parabola: Parabola,
    t1: f32,
    t2: f32,
}

impl ParabolaArc {
    pub fn new(parabola: Parabola, t1: f32, t2: f32) -> Self {
        let (t1, t2) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        Self { parabola, t1, t2 }
    }

    pub fn parabola(&self) -> &Parabola {
        &self.parabola
    }

    pub fn t1(&self) -> f32 {
        self.t1
    }

    pub fn t2(&self) -> f32 {
        self.t2
    }

    pub fn set_parabola(&mut self, parabola: Parabola) {
        self.parabola = parabola;
    }

    pub fn set_range(&mut self, t1: f32, t2: f32) {
        *self = Self::new(self.parabola, t1, t2);
    }

    pub fn contains_t(&self, t: f32) -> bool {
        t >= self.t1 && t <= self.t2
    }

    pub(crate) fn xform(&mut self, mat: &Mat4) {
        self.parabola = self.parabola.xform(mat);
    }

    /// Tight box around the arc: each coordinate is a quadratic in `t`, so
    /// its extremes sit at the range ends or at the vertex.
    pub fn bounds(&self) -> BoundingVolume {
        let lo = self.parabola.calc_point(self.t1);
        let hi = self.parabola.calc_point(self.t2);
        let mut min = lo.min(hi);
        let mut max = lo.max(hi);

        for axis in 0..3 {
            let a = self.parabola.a[axis];
            if a.abs() < NEAR_ZERO {
                continue;
            }
            let t = -self.parabola.b[axis] / (2.0 * a);
            if self.contains_t(t) {
                let v = self.parabola.calc_point(t)[axis];
                min[axis] = min[axis].min(v);
                max[axis] = max[axis].max(v);
            }
        }
        BoundingVolume::Box(Aabb::new(min, max))
    }
}

/// Earliest parameter in `[t1, t2]` at which `parabola` meets a shape.
///
/// The arc is split until each piece is within [`CHORD_TOLERANCE`] of its
/// chord. `test` gets a chord `p1..p2` and answers the fraction along it of
/// the first contact, or `None` if the chord misses.
pub(crate) fn first_chord_hit(
    parabola: &Parabola,
    t1: f32,
    t2: f32,
    mut test: impl FnMut(Vec3, Vec3) -> Option<f32>,
) -> Option<f32> {
    let p1 = parabola.calc_point(t1);
    let p2 = parabola.calc_point(t2);
    chord_hit(parabola, (t1, p1), (t2, p2), &mut test, 0)
}

fn chord_hit(
    parabola: &Parabola,
    (t1, p1): (f32, Vec3),
    (t2, p2): (f32, Vec3),
    test: &mut impl FnMut(Vec3, Vec3) -> Option<f32>,
    depth: u32,
) -> Option<f32> {
    let tmid = (t1 + t2) * 0.5;
    let pmid = parabola.calc_point(tmid);

    if depth >= MAX_SUBDIVISIONS || pmid.distance((p1 + p2) * 0.5) <= CHORD_TOLERANCE {
        let frac = test(p1, p2)?;
        return Some(t1 + (t2 - t1) * frac.clamp(0.0, 1.0));
    }

    chord_hit(parabola, (t1, p1), (tmid, pmid), test, depth + 1)
        .or_else(|| chord_hit(parabola, (tmid, pmid), (t2, p2), test, depth + 1))
}
