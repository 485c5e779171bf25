//! Scene builders shared by the collision benchmarks.

use glam::Vec3;
use rein_collide::collide::solid::Heightfield;
use rein_collide::ecs::components::{CollideMask, CollisionNode, Transform};
use rein_collide::ecs::hierarchy::attach_child;
use rein_collide::{CollideError, Shape};

/// Deterministic pseudo-random source so every run builds the same scene.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 40) as f32) / ((1u64 << 24) as f32)
    }

    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }
}

/// A scene root plus the handles a benchmark needs.
pub struct Scene {
    pub world: hecs::World,
    pub root: hecs::Entity,
    pub colliders: Vec<hecs::Entity>,
}

impl Scene {
    pub fn new() -> Self {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        Self {
            world,
            root,
            colliders: Vec::new(),
        }
    }

    /// Spawn a node under `parent`.
    pub fn add(&mut self, parent: hecs::Entity, position: Vec3, node: CollisionNode) -> anyhow::Result<hecs::Entity> {
        let entity = self.world.spawn((Transform::from_position(position), node));
        attach_child(&mut self.world, parent, entity)?;
        Ok(entity)
    }

    /// Spawn an empty grouping node under `parent`.
    pub fn group(&mut self, parent: hecs::Entity, position: Vec3) -> anyhow::Result<hecs::Entity> {
        let entity = self.world.spawn((Transform::from_position(position),));
        attach_child(&mut self.world, parent, entity)?;
        Ok(entity)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// `n` static spheres scattered over a square of side `extent`, grouped in
/// blocks of 16 so bounds pruning has a hierarchy to work with.
pub fn scatter_spheres(scene: &mut Scene, n: usize, extent: f32, rng: &mut Lcg) -> anyhow::Result<()> {
    let mut group = scene.root;
    for i in 0..n {
        if i % 16 == 0 {
            group = scene.group(scene.root, Vec3::ZERO)?;
        }
        let pos = Vec3::new(rng.range(0.0, extent), rng.range(0.0, extent), 0.0);
        let node = CollisionNode::new()
            .with_shape(Shape::sphere(Vec3::ZERO, rng.range(0.5, 1.5)))
            .with_from_mask(CollideMask::NONE);
        scene.add(group, pos, node)?;
    }
    Ok(())
}

/// `n` sphere colliders spread over the same square, registered in
/// `scene.colliders`.
pub fn add_sphere_movers(scene: &mut Scene, n: usize, extent: f32, rng: &mut Lcg) -> anyhow::Result<()> {
    for _ in 0..n {
        let pos = Vec3::new(rng.range(0.0, extent), rng.range(0.0, extent), 0.0);
        let node = CollisionNode::new()
            .with_shape(Shape::sphere(Vec3::ZERO, 0.5))
            .with_into_mask(CollideMask::NONE);
        let entity = scene.add(scene.root, pos, node)?;
        scene.colliders.push(entity);
    }
    Ok(())
}

/// Rolling terrain of `size` x `size` samples.
pub fn terrain(size: usize, subdivisions: u32) -> Result<Heightfield, CollideError> {
    let heights = (0..size * size)
        .map(|i| {
            let (x, y) = ((i % size) as f32, (i / size) as f32);
            (x * 0.3).sin() * 2.0 + (y * 0.2).cos() * 1.5
        })
        .collect();
    Ok(Heightfield::new(size, size, heights)?.with_subdivisions(subdivisions))
}
