//! Heightfield terrain.
//!
//! A regular grid of height samples. In grid space sample `(x, y)` sits at
//! `(x, y, height)`; `transform` places the grid in shape space. Each cell
//! is split into two triangles, with the diagonal alternating between
//! cells like a checkerboard. A [`Quadtree`] over the cells prunes queries
//! before the per-triangle tests.

mod quadtree;

pub use quadtree::{QuadNode, Quadtree};

use std::sync::OnceLock;

use glam::{Mat4, Vec2, Vec3};

use crate::bounds::{Aabb, BoundingVolume};
use crate::collide::contact::CollisionEntry;
use crate::error::CollideError;
use crate::math::{closest_point_on_triangle, ray_triangle, Plane, NEAR_ZERO};

use super::box_solid::BoxSolid;
use super::line::{LineProbe, Ray, Segment};
use super::sphere::Sphere;
use super::xform_radius;

/// Default quadtree depth.
pub const DEFAULT_SUBDIVISIONS: u32 = 4;

/// Tolerance on a leaf's line span, so hits on a leaf's boundary are not
/// lost to rounding.
const T_SLACK: f32 = 1.0e-4;

pub type Triangle = [Vec3; 3];

/// A triangle hit by a line query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineHit {
    pub t: f32,
    pub cell: (usize, usize),
    pub normal: Vec3,
}

#[derive(Debug, Clone)]
pub struct Heightfield {
    cols: usize,
    rows: usize,
    heights: Vec<f32>,
    subdivisions: u32,
    transform: Mat4,
    inv_transform: Mat4,
    tree: OnceLock<Quadtree>,
}

impl Heightfield {
    /// A grid of `cols` x `rows` samples, stored row by row.
    pub fn new(cols: usize, rows: usize, heights: Vec<f32>) -> Result<Self, CollideError> {
        if cols < 2 || rows < 2 {
            return Err(CollideError::HeightfieldTooSmall { cols, rows });
        }
        if heights.len() != cols * rows {
            return Err(CollideError::HeightfieldSampleCount {
                expected: cols * rows,
                actual: heights.len(),
            });
        }
        Ok(Self {
            cols,
            rows,
            heights,
            subdivisions: DEFAULT_SUBDIVISIONS,
            transform: Mat4::IDENTITY,
            inv_transform: Mat4::IDENTITY,
            tree: OnceLock::new(),
        })
    }

    /// Space the samples `size` apart instead of one unit.
    pub fn with_cell_size(mut self, size: Vec2) -> Self {
        self.xform(&Mat4::from_scale(size.extend(1.0)));
        self
    }

    pub fn with_subdivisions(mut self, subdivisions: u32) -> Self {
        self.set_subdivisions(subdivisions);
        self
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn height(&self, x: usize, y: usize) -> f32 {
        self.heights[y * self.cols + x]
    }

    pub fn set_height(&mut self, x: usize, y: usize, height: f32) {
        self.heights[y * self.cols + x] = height;
        self.invalidate();
    }

    /// Requested quadtree depth. The built tree may be shallower, see
    /// [`Self::subdivisions`].
    pub fn requested_subdivisions(&self) -> u32 {
        self.subdivisions
    }

    /// Depth the quadtree actually uses: the requested depth, reduced until
    /// every leaf covers at least one cell.
    pub fn subdivisions(&self) -> u32 {
        self.tree().depth()
    }

    pub fn set_subdivisions(&mut self, subdivisions: u32) {
        self.subdivisions = subdivisions;
        self.invalidate();
    }

    /// Grid space to shape space.
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn tree(&self) -> &Quadtree {
        self.tree
            .get_or_init(|| Quadtree::build(&self.heights, self.cols, self.rows, self.subdivisions))
    }

    pub(crate) fn xform(&mut self, mat: &Mat4) {
        self.transform = *mat * self.transform;
        self.inv_transform = self.transform.inverse();
    }

    pub(crate) fn invalidate(&mut self) {
        self.tree = OnceLock::new();
    }

    pub(crate) fn bounds(&self) -> BoundingVolume {
        BoundingVolume::Box(self.tree().root().bounds().xform(&self.transform))
    }

    /// Center of the grid at mid height.
    pub(crate) fn origin(&self) -> Vec3 {
        self.transform.transform_point3(self.tree().root().bounds().center())
    }

    fn vertex(&self, x: usize, y: usize) -> Vec3 {
        self.transform
            .transform_point3(Vec3::new(x as f32, y as f32, self.height(x, y)))
    }

    /// The two shape-space triangles covering cell `(x, y)`, wound
    /// counter-clockwise seen from above.
    pub fn cell_triangles(&self, x: usize, y: usize) -> [Triangle; 2] {
        let v00 = self.vertex(x, y);
        let v10 = self.vertex(x + 1, y);
        let v01 = self.vertex(x, y + 1);
        let v11 = self.vertex(x + 1, y + 1);
        if (x + y) % 2 == 0 {
            [[v00, v10, v11], [v00, v11, v01]]
        } else {
            [[v00, v10, v01], [v10, v11, v01]]
        }
    }

    /// Leaves whose boxes overlap a shape-space box.
    fn leaves_overlapping(&self, shape_box: &Aabb) -> Vec<&QuadNode> {
        let grid_box = shape_box.xform(&self.inv_transform);
        self.tree().query(|node| node.bounds().overlaps(&grid_box))
    }

    /// First triangle hit by `origin + t * direction` for `t` in
    /// `[t_min, t_max]`.
    ///
    /// Candidate leaves are visited in order of entry, and within each leaf
    /// the cells under the line are walked in order, so the walk stops at
    /// the first hit.
    pub fn first_line_hit(&self, origin: Vec3, direction: Vec3, t_min: f32, t_max: f32) -> Option<LineHit> {
        let grid_origin = self.inv_transform.transform_point3(origin);
        let grid_dir = self.inv_transform.transform_vector3(direction);

        let span = |node: &QuadNode| -> Option<(f32, f32)> {
            let (enter, exit) = node.bounds().intersects_line(grid_origin, grid_dir)?;
            let (enter, exit) = (enter.max(t_min), exit.min(t_max));
            (enter <= exit).then_some((enter, exit))
        };
        let mut candidates: Vec<(f32, f32, &QuadNode)> = self
            .tree()
            .query(|node| span(node).is_some())
            .into_iter()
            .filter_map(|leaf| span(leaf).map(|(enter, exit)| (enter, exit, leaf)))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut best: Option<LineHit> = None;
        for (enter, exit, leaf) in candidates {
            if best.is_some_and(|hit| hit.t <= enter) {
                break;
            }
            let exit = best.map_or(exit, |hit| exit.min(hit.t));
            let walked = self.walk_leaf(leaf, origin, direction, grid_origin, grid_dir, (enter, exit), (t_min, t_max));
            if let Some(hit) = walked.filter(|hit| best.map_or(true, |b| hit.t < b.t)) {
                best = Some(hit);
            }
        }
        best
    }

    /// Step through the cells of `leaf` under the line between `enter` and
    /// `exit`, in order, testing each cell's triangles.
    #[allow(clippy::too_many_arguments)]
    fn walk_leaf(
        &self,
        leaf: &QuadNode,
        origin: Vec3,
        direction: Vec3,
        grid_origin: Vec3,
        grid_dir: Vec3,
        span: (f32, f32),
        limits: (f32, f32),
    ) -> Option<LineHit> {
        let (enter, exit) = span;
        let (t_min, t_max) = limits;
        let start = grid_origin + grid_dir * enter;
        let mut cx = (start.x.floor().max(0.0) as usize).clamp(leaf.x0, leaf.x1 - 1);
        let mut cy = (start.y.floor().max(0.0) as usize).clamp(leaf.y0, leaf.y1 - 1);

        let axis_setup = |o: f32, d: f32, c: usize| -> (i64, f32, f32) {
            if d > NEAR_ZERO {
                (1, (c as f32 + 1.0 - o) / d, 1.0 / d)
            } else if d < -NEAR_ZERO {
                (-1, (c as f32 - o) / d, -1.0 / d)
            } else {
                (0, f32::INFINITY, f32::INFINITY)
            }
        };
        let (step_x, mut next_x, delta_x) = axis_setup(grid_origin.x, grid_dir.x, cx);
        let (step_y, mut next_y, delta_y) = axis_setup(grid_origin.y, grid_dir.y, cy);

        loop {
            let hit = self
                .cell_triangles(cx, cy)
                .into_iter()
                .filter_map(|tri| {
                    let t = ray_triangle(origin, direction, tri[0], tri[1], tri[2])?;
                    (t >= enter - T_SLACK && t <= exit + T_SLACK && t >= t_min && t <= t_max).then_some((t, tri))
                })
                .min_by(|a, b| a.0.total_cmp(&b.0));
            if let Some((t, tri)) = hit {
                return Some(LineHit {
                    t,
                    cell: (cx, cy),
                    normal: triangle_normal(&tri),
                });
            }

            let (next, step, along_x) = if next_x < next_y {
                (next_x, step_x, true)
            } else {
                (next_y, step_y, false)
            };
            if next > exit || step == 0 {
                return None;
            }
            if along_x {
                let moved = cx as i64 + step;
                if moved < leaf.x0 as i64 || moved >= leaf.x1 as i64 {
                    return None;
                }
                cx = moved as usize;
                next_x += delta_x;
            } else {
                let moved = cy as i64 + step;
                if moved < leaf.y0 as i64 || moved >= leaf.y1 as i64 {
                    return None;
                }
                cy = moved as usize;
                next_y += delta_y;
            }
        }
    }

    /// Every triangle, tested one by one. Reference for the quadtree walk.
    pub fn first_line_hit_brute_force(
        &self,
        origin: Vec3,
        direction: Vec3,
        t_min: f32,
        t_max: f32,
    ) -> Option<LineHit> {
        let mut best: Option<LineHit> = None;
        for y in 0..self.rows - 1 {
            for x in 0..self.cols - 1 {
                for tri in self.cell_triangles(x, y) {
                    let Some(t) = ray_triangle(origin, direction, tri[0], tri[1], tri[2]) else {
                        continue;
                    };
                    if t >= t_min && t <= t_max && best.map_or(true, |b| t < b.t) {
                        best = Some(LineHit {
                            t,
                            cell: (x, y),
                            normal: triangle_normal(&tri),
                        });
                    }
                }
            }
        }
        best
    }
}

fn triangle_normal(tri: &Triangle) -> Vec3 {
    (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize_or(Vec3::Z)
}

/// Thirteen-axis separating-axis test between a box and a triangle.
fn box_overlaps_triangle(solid: &BoxSolid, tri: &Triangle) -> bool {
    let edges = [tri[1] - tri[0], tri[2] - tri[1], tri[0] - tri[2]];
    let box_axes = solid.axes();
    let mut axes = vec![edges[0].cross(edges[1]), box_axes.x_axis, box_axes.y_axis, box_axes.z_axis];
    for i in 0..3 {
        for edge in &edges {
            axes.push(box_axes.col(i).cross(*edge));
        }
    }

    axes.into_iter().filter_map(|a| a.try_normalize()).all(|axis| {
        let center = solid.center().dot(axis);
        let reach = solid.projected_radius(axis);
        let (lo, hi) = tri
            .iter()
            .map(|p| p.dot(axis))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| (lo.min(d), hi.max(d)));
        center + reach >= lo && center - reach <= hi
    })
}

fn from_linear(probe: LineProbe, into: &Heightfield, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let hit = into.first_line_hit(probe.origin, probe.direction, probe.t_min(), probe.t_max())?;
    let mut result = entry.hit();
    result.set_surface_point(probe.point_at(hit.t));
    result.set_surface_normal(entry.pick_normal(hit.normal));
    result.set_t(hit.t);
    Some(result)
}

pub fn from_ray(from: &Ray, into: &Heightfield, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_ray(from, entry), into, entry)
}

pub fn from_segment(from: &Segment, into: &Heightfield, entry: &CollisionEntry) -> Option<CollisionEntry> {
    from_linear(LineProbe::from_segment(from, entry), into, entry)
}

pub fn from_sphere(from: &Sphere, into: &Heightfield, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let center = entry.wrt().transform_point3(from.center());
    let radius = xform_radius(from.radius(), entry.wrt());
    let reach = Aabb::new(center - Vec3::splat(radius), center + Vec3::splat(radius));

    // Deepest contact over every triangle in reach: (depth, surface, normal).
    let mut best: Option<(f32, Vec3, Vec3)> = None;
    for leaf in into.leaves_overlapping(&reach) {
        for (x, y) in leaf.cells() {
            for tri in into.cell_triangles(x, y) {
                let closest = closest_point_on_triangle(center, tri[0], tri[1], tri[2]);
                let face = triangle_normal(&tri);
                let offset = center - closest;
                let dist = offset.length();
                let (depth, normal) = if face.dot(offset) < 0.0 {
                    // Center under the surface.
                    (radius + dist, face)
                } else if dist > NEAR_ZERO {
                    (radius - dist, offset / dist)
                } else {
                    (radius, face)
                };
                if depth >= 0.0 && best.map_or(true, |(d, _, _)| depth > d) {
                    best = Some((depth, closest, normal));
                }
            }
        }
    }

    let (depth, surface, normal) = best?;
    let normal = entry.pick_normal(normal);
    let mut hit = entry.hit();
    hit.set_surface_point(surface);
    hit.set_surface_normal(normal);
    hit.set_interior_point(surface - normal * depth);
    hit.set_depth(depth);
    Some(hit)
}

pub fn from_box(from: &BoxSolid, into: &Heightfield, entry: &CollisionEntry) -> Option<CollisionEntry> {
    let solid = from.frame_in(entry.wrt());
    let reach = Aabb::from_points(solid.corners());

    // Deepest triangle the box overlaps: (depth, corner, face plane).
    let mut best: Option<(f32, Vec3, Plane)> = None;
    for leaf in into.leaves_overlapping(&reach) {
        for (x, y) in leaf.cells() {
            for tri in into.cell_triangles(x, y) {
                if !box_overlaps_triangle(&solid, &tri) {
                    continue;
                }
                let plane = Plane::from_point_normal(tri[0], triangle_normal(&tri));
                let corner = solid.support(-plane.normal);
                let depth = -plane.signed_distance(corner);
                if best.map_or(true, |(d, _, _)| depth > d) {
                    best = Some((depth, corner, plane));
                }
            }
        }
    }

    let (depth, corner, plane) = best?;
    let mut hit = entry.hit();
    hit.set_surface_point(plane.project(corner));
    hit.set_surface_normal(entry.pick_normal(plane.normal));
    hit.set_interior_point(corner);
    hit.set_depth(depth);
    Some(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collide::testing::collide;
    use crate::collide::Shape;

    fn flat(cols: usize, rows: usize, height: f32) -> Heightfield {
        Heightfield::new(cols, rows, vec![height; cols * rows]).unwrap()
    }

    fn bumpy(cols: usize, rows: usize, rng: &mut fastrand::Rng) -> Heightfield {
        let heights = (0..cols * rows).map(|_| rng.f32() * 4.0 - 2.0).collect();
        Heightfield::new(cols, rows, heights).unwrap()
    }

    #[test]
    fn test_new_validates() {
        assert_eq!(
            Heightfield::new(1, 5, vec![0.0; 5]).unwrap_err(),
            CollideError::HeightfieldTooSmall { cols: 1, rows: 5 }
        );
        assert_eq!(
            Heightfield::new(3, 3, vec![0.0; 8]).unwrap_err(),
            CollideError::HeightfieldSampleCount { expected: 9, actual: 8 }
        );
    }

    #[test]
    fn test_subdivisions_reduced_for_small_grids() {
        let mut field = flat(5, 5, 0.0);
        field.set_subdivisions(6);
        assert_eq!(field.requested_subdivisions(), 6);
        assert_eq!(field.subdivisions(), 2);
        field.set_subdivisions(1);
        assert_eq!(field.subdivisions(), 1);
    }

    #[test]
    fn test_checkerboard_diagonals() {
        let field = flat(3, 3, 0.0);
        let [even, _] = field.cell_triangles(0, 0);
        let [odd, _] = field.cell_triangles(1, 0);
        // Even cells split (0,0)-(1,1); odd cells split (1,0)-(0,1).
        assert!(even.contains(&Vec3::new(1.0, 1.0, 0.0)));
        assert!(!odd.contains(&Vec3::new(2.0, 1.0, 0.0)));
        for tri in field.cell_triangles(1, 1) {
            assert!(triangle_normal(&tri).z > 0.99);
        }
    }

    #[test]
    fn test_bounds_follow_transform() {
        let field = flat(3, 5, 2.0).with_cell_size(Vec2::new(2.0, 0.5));
        let aabb = field.bounds().aabb().unwrap();
        assert!((aabb.max - Vec3::new(4.0, 2.0, 2.0)).length() < 1e-5);
        assert!((aabb.min - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_ray_down_onto_flat_ground() {
        let field = flat(9, 9, 1.0);
        let shape = Shape::heightfield(field);
        let hit = collide(&Shape::ray(Vec3::new(3.3, 4.7, 10.0), -Vec3::Z), &shape).unwrap();
        assert!((hit.t() - 9.0).abs() < 1e-4);
        assert!((hit.surface_normal().unwrap() - Vec3::Z).length() < 1e-5);

        assert!(collide(&Shape::ray(Vec3::new(3.3, 4.7, 10.0), Vec3::Z), &shape).is_none());
        assert!(collide(&Shape::ray(Vec3::new(30.0, 4.7, 10.0), -Vec3::Z), &shape).is_none());
        let short = Shape::segment(Vec3::new(3.3, 4.7, 10.0), Vec3::new(3.3, 4.7, 2.0));
        assert!(collide(&short, &shape).is_none());
    }

    #[test]
    fn test_quadtree_ray_matches_brute_force() {
        let mut rng = fastrand::Rng::with_seed(7);
        for &(cols, rows) in &[(2, 2), (3, 7), (9, 9), (17, 12)] {
            for subdivisions in [0, 1, 2, 3, 5] {
                let field = bumpy(cols, rows, &mut rng).with_subdivisions(subdivisions);
                for _ in 0..60 {
                    let origin = Vec3::new(
                        rng.f32() * (cols as f32 + 4.0) - 2.0,
                        rng.f32() * (rows as f32 + 4.0) - 2.0,
                        rng.f32() * 6.0 + 2.5,
                    );
                    let target = Vec3::new(rng.f32() * cols as f32, rng.f32() * rows as f32, -3.0);
                    let direction = target - origin;

                    let fast = field.first_line_hit(origin, direction, 0.0, f32::INFINITY);
                    let slow = field.first_line_hit_brute_force(origin, direction, 0.0, f32::INFINITY);
                    match (fast, slow) {
                        (Some(a), Some(b)) => assert!(
                            (a.t - b.t).abs() < 1e-4,
                            "{cols}x{rows}/{subdivisions}: {} vs {}",
                            a.t,
                            b.t
                        ),
                        (None, None) => {}
                        (a, b) => panic!("{cols}x{rows}/{subdivisions}: {a:?} vs {b:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn test_sphere_resting_on_ground() {
        let shape = Shape::heightfield(flat(6, 6, 0.0));
        let hit = collide(&Shape::sphere(Vec3::new(2.5, 2.5, 0.75), 1.0), &shape).unwrap();
        assert!((hit.depth().unwrap() - 0.25).abs() < 1e-5);
        assert!((hit.surface_normal().unwrap() - Vec3::Z).length() < 1e-5);
        assert!((hit.surface_point().unwrap() - Vec3::new(2.5, 2.5, 0.0)).length() < 1e-5);

        assert!(collide(&Shape::sphere(Vec3::new(2.5, 2.5, 1.5), 1.0), &shape).is_none());
        assert!(collide(&Shape::sphere(Vec3::new(12.0, 2.5, 0.0), 1.0), &shape).is_none());
    }

    #[test]
    fn test_box_on_slope() {
        // Height rises along x: z = x.
        let heights = (0..4).flat_map(|_| (0..4).map(|x| x as f32)).collect();
        let shape = Shape::heightfield(Heightfield::new(4, 4, heights).unwrap());

        let sunk = Shape::cuboid(Vec3::new(1.0, 1.0, 0.5), Vec3::new(1.5, 1.5, 2.0));
        let hit = collide(&sunk, &shape).unwrap();
        let n = hit.surface_normal().unwrap();
        assert!((n - Vec3::new(-1.0, 0.0, 1.0).normalize()).length() < 1e-4);
        // Corner (1.5, _, 0.5) sits 1.0 below z = x, i.e. 1/sqrt(2) along the normal.
        assert!((hit.depth().unwrap() - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);

        let above = Shape::cuboid(Vec3::new(1.0, 1.0, 2.0), Vec3::new(1.5, 1.5, 3.0));
        assert!(collide(&above, &shape).is_none());
    }
}
