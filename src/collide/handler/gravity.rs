//! Floor following with falling: a target above the floor accelerates
//! down until it lands.

use glam::{Mat4, Vec3};

use crate::collide::contact::CollisionEntry;
use crate::ecs::hierarchy;

use super::floor::highest_floor;
use super::{physical_handler_api, CollisionHandler, ColliderDef, EventConfig, PhysicalCore};

/// Heights and speeds below this count as zero.
const REST_EPSILON: f32 = 0.001;

/// Configuration for a [`GravityHandler`].
#[derive(Debug, Clone)]
pub struct GravityConfig {
    /// Downward acceleration in units per second squared. Default: 9.81.
    pub gravity: f32,
    /// Height kept between the floor and the target's origin. Default: 0.
    pub offset: f32,
    /// Surfaces further than this below the target's resting height are
    /// ignored. Zero means no limit. Default: 0.
    pub reach: f32,
    /// Terminal falling speed. Zero means unlimited. Default: 0.
    pub max_velocity: f32,
    /// Longest frame integrated in one step, in seconds. Default: 0.1.
    pub max_dt: f32,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            offset: 0.0,
            reach: 0.0,
            max_velocity: 0.0,
            max_dt: 0.1,
        }
    }
}

/// Vertical motion state, shared by every collider of the handler.
#[derive(Debug, Clone, Copy, Default)]
struct Fall {
    velocity: f32,
    airborne_height: f32,
    impact_velocity: f32,
    contact_normal: Vec3,
}

impl Fall {
    fn step(&mut self, config: &GravityConfig, dt: f32, world: &mut hecs::World, def: &mut ColliderDef, entries: &[CollisionEntry]) {
        let target_z = hierarchy::world_position(world, def.target()).z;
        let Some((floor_z, highest)) = highest_floor(entries, target_z, config.offset, config.reach) else {
            return;
        };

        // Height of the resting position relative to the target.
        let rest = floor_z + config.offset - target_z;
        let mut adjust = rest;

        if self.velocity > 0.0 || adjust < -REST_EPSILON {
            // Airborne.
            let dt = dt.min(config.max_dt);
            let fall = self.velocity * dt - 0.5 * config.gravity * dt * dt;
            if adjust > 0.0 {
                // Below the floor while moving: come up, plus any upward motion.
                adjust += fall.max(0.0);
            } else {
                adjust = adjust.max(fall);
            }
            self.velocity -= config.gravity * dt;
            if config.max_velocity > 0.0 {
                self.velocity = self.velocity.max(-config.max_velocity);
            }
            self.airborne_height = adjust - rest;
        }

        if self.airborne_height < REST_EPSILON && self.velocity < REST_EPSILON {
            if self.velocity != 0.0 {
                tracing::debug!(collider = ?def.collider(), velocity = self.velocity, "landed");
            }
            self.impact_velocity = self.velocity;
            self.velocity = 0.0;
            self.airborne_height = 0.0;
        }

        if let Some(normal) = highest.surface_normal_in(&Mat4::IDENTITY) {
            self.contact_normal = normal;
        }

        if adjust.abs() > f32::EPSILON {
            def.reposition(world, Vec3::Z * adjust);
            def.apply_linear_force(Vec3::Z * adjust);
        }
    }
}

/// Like [`FloorHandler`](super::FloorHandler), but a target above the
/// floor falls under gravity instead of snapping down.
#[derive(Debug)]
pub struct GravityHandler {
    config: GravityConfig,
    dt: f32,
    fall: Fall,
    core: PhysicalCore,
}

physical_handler_api!(GravityHandler);

impl GravityHandler {
    pub fn new(config: GravityConfig) -> Self {
        Self {
            config,
            dt: 1.0 / 60.0,
            fall: Fall::default(),
            core: PhysicalCore::new(EventConfig::none()),
        }
    }

    pub fn config(&self) -> &GravityConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GravityConfig {
        &mut self.config
    }

    /// Frame time integrated by the next traversal. Default: 1/60 s.
    pub fn set_dt(&mut self, dt: f32) {
        self.dt = dt;
    }

    /// Current vertical speed; positive is up.
    pub fn velocity(&self) -> f32 {
        self.fall.velocity
    }

    pub fn set_velocity(&mut self, velocity: f32) {
        self.fall.velocity = velocity;
    }

    /// Add vertical speed, e.g. to jump.
    pub fn add_velocity(&mut self, velocity: f32) {
        self.fall.velocity += velocity;
    }

    /// True when resting on the floor.
    pub fn is_on_ground(&self) -> bool {
        self.fall.airborne_height == 0.0 && self.fall.velocity == 0.0
    }

    /// Height above the resting position as of the last traversal.
    pub fn airborne_height(&self) -> f32 {
        self.fall.airborne_height
    }

    /// Vertical speed at the moment of the last landing.
    pub fn impact_velocity(&self) -> f32 {
        self.fall.impact_velocity
    }

    /// World-space normal of the floor under the target.
    pub fn contact_normal(&self) -> Vec3 {
        self.fall.contact_normal
    }
}

impl Default for GravityHandler {
    fn default() -> Self {
        Self::new(GravityConfig::default())
    }
}

impl CollisionHandler for GravityHandler {
    fn begin_group(&mut self) {
        self.core.begin_group();
    }

    fn add_entry(&mut self, entry: CollisionEntry) {
        self.core.add_entry(entry);
    }

    fn end_group(&mut self, world: &mut hecs::World) -> bool {
        let (config, dt, fall) = (&self.config, self.dt, &mut self.fall);
        self.core
            .end_group(world, |world, def, entries| fall.step(config, dt, world, def, &entries))
    }
}
