//! Keeps a walking collider standing on the highest surface below it.

use glam::{Mat4, Vec3};

use crate::collide::contact::CollisionEntry;
use crate::ecs::hierarchy;

use super::{physical_handler_api, CollisionHandler, ColliderDef, EventConfig, PhysicalCore};

/// Configuration for a [`FloorHandler`].
#[derive(Debug, Clone)]
pub struct FloorConfig {
    /// Height kept between the floor and the target's origin. Default: 0.
    pub offset: f32,
    /// Surfaces further than this below the target's resting height are
    /// ignored. Zero means no limit. Default: 0.
    pub reach: f32,
    /// Fastest the target may drop, in units per second. Zero means it snaps
    /// down immediately. Default: 0.
    pub max_velocity: f32,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            offset: 0.0,
            reach: 0.0,
            max_velocity: 0.0,
        }
    }
}

/// Snaps each target's Z to the highest contact surface plus an offset.
///
/// Meant for a downward ray (or segment) collider.
#[derive(Debug)]
pub struct FloorHandler {
    config: FloorConfig,
    dt: f32,
    core: PhysicalCore,
}

physical_handler_api!(FloorHandler);

impl FloorHandler {
    pub fn new(config: FloorConfig) -> Self {
        Self {
            config,
            dt: 1.0 / 60.0,
            core: PhysicalCore::new(EventConfig::none()),
        }
    }

    pub fn config(&self) -> &FloorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FloorConfig {
        &mut self.config
    }

    /// Frame time used to limit the drop speed. Default: 1/60 s.
    pub fn set_dt(&mut self, dt: f32) {
        self.dt = dt;
    }
}

impl Default for FloorHandler {
    fn default() -> Self {
        Self::new(FloorConfig::default())
    }
}

/// Highest world-space surface Z among `entries` within reach of a target
/// standing at `target_z`.
pub(crate) fn highest_floor(entries: &[CollisionEntry], target_z: f32, offset: f32, reach: f32) -> Option<(f32, &CollisionEntry)> {
    entries
        .iter()
        .filter_map(|entry| Some((entry.surface_point_in(&Mat4::IDENTITY)?.z, entry)))
        .filter(|(z, _)| reach <= 0.0 || z + offset - target_z >= -reach)
        .max_by(|a, b| a.0.total_cmp(&b.0))
}

fn snap(config: &FloorConfig, dt: f32, world: &mut hecs::World, def: &mut ColliderDef, entries: &[CollisionEntry]) {
    let target_z = hierarchy::world_position(world, def.target()).z;
    let Some((floor_z, _)) = highest_floor(entries, target_z, config.offset, config.reach) else {
        return;
    };

    let mut adjust = floor_z + config.offset - target_z;
    if config.max_velocity > 0.0 {
        adjust = adjust.max(-config.max_velocity * dt);
    }
    if adjust != 0.0 {
        tracing::debug!(collider = ?def.collider(), floor_z, adjust, "adjusting height to floor");
        def.reposition(world, Vec3::Z * adjust);
        def.apply_linear_force(Vec3::Z * adjust);
    }
}

impl CollisionHandler for FloorHandler {
    fn begin_group(&mut self) {
        self.core.begin_group();
    }

    fn add_entry(&mut self, entry: CollisionEntry) {
        self.core.add_entry(entry);
    }

    fn end_group(&mut self, world: &mut hecs::World) -> bool {
        let (config, dt) = (&self.config, self.dt);
        self.core
            .end_group(world, |world, def, entries| snap(config, dt, world, def, &entries))
    }
}
