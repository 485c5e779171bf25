//! A pusher that replays the frame's motion contact by contact, sliding
//! along each surface, so fast movers cannot squeeze through corners.

use glam::{Mat4, Vec3};

use crate::collide::contact::CollisionEntry;
use crate::collide::narrowphase::IntersectionEngine;
use crate::collide::shape::ShapeKind;

use super::pusher::net_shove;
use super::{physical_handler_api, CollisionHandler, ColliderDef, EventConfig, PhysicalCore};

/// Motion shorter than this is treated as no motion at all.
const MIN_MOTION: f32 = 1e-6;

/// Configuration for a [`FluidPusherHandler`].
#[derive(Debug, Clone)]
pub struct FluidPusherConfig {
    /// Only slide sideways: the vertical part of each normal is dropped.
    /// Default: false.
    pub horizontal: bool,
    /// Upper bound on contacts resolved per collider per traversal.
    /// Default: 16.
    pub max_iterations: usize,
}

impl Default for FluidPusherConfig {
    fn default() -> Self {
        Self {
            horizontal: false,
            max_iterations: 16,
        }
    }
}

/// Resolves a sphere collider's motion one contact at a time.
///
/// Requires swept entries, so the traverser should respect previous
/// transforms. Each collider's contacts are replayed in time-of-impact
/// order: the sphere stops at the first contact, the rest of its motion is
/// projected onto that surface, and the remaining contacts are re-tested
/// against the slid path. Motion stops when contacts block it from both
/// sides.
///
/// Only [`Transform`](crate::ecs::components::Transform) is written, so the
/// target's previous-frame transform still describes where it started.
#[derive(Debug)]
pub struct FluidPusherHandler {
    config: FluidPusherConfig,
    engine: IntersectionEngine,
    core: PhysicalCore,
}

physical_handler_api!(FluidPusherHandler);

impl FluidPusherHandler {
    pub fn new(config: FluidPusherConfig) -> Self {
        Self {
            config,
            engine: IntersectionEngine::default(),
            core: PhysicalCore::new(EventConfig::none()),
        }
    }

    /// Re-test contacts with `engine` instead of the standard one.
    pub fn with_engine(mut self, engine: IntersectionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &FluidPusherConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FluidPusherConfig {
        &mut self.config
    }
}

impl Default for FluidPusherHandler {
    fn default() -> Self {
        Self::new(FluidPusherConfig::default())
    }
}

impl CollisionHandler for FluidPusherHandler {
    fn begin_group(&mut self) {
        self.core.begin_group();
    }

    fn add_entry(&mut self, entry: CollisionEntry) {
        self.core.add_entry(entry);
    }

    fn end_group(&mut self, world: &mut hecs::World) -> bool {
        let (config, engine) = (&self.config, &mut self.engine);
        self.core.end_group(world, |world, def, entries| {
            resolve(config, engine, world, def, entries);
        })
    }
}

/// Which side of the direction of travel a blocking surface faces.
#[derive(Debug, Default)]
struct Blocked {
    left: bool,
    right: bool,
}

fn resolve(
    config: &FluidPusherConfig,
    engine: &mut IntersectionEngine,
    world: &mut hecs::World,
    def: &mut ColliderDef,
    mut entries: Vec<CollisionEntry>,
) {
    let Some(first) = entries.first() else {
        return;
    };
    let ShapeKind::Sphere(sphere) = first.from_shape().kind() else {
        tracing::warn!(collider = ?def.collider(), "fluid pusher needs a sphere collider; shape ignored");
        return;
    };
    let net = first.from_side().net;
    let prev_center = first.from_side().prev_net.transform_point3(sphere.center());
    let start = net.transform_point3(sphere.center());
    let motion = start - prev_center;

    if motion.length_squared() < MIN_MOTION * MIN_MOTION {
        // Nothing to replay; resolve the overlap in place.
        let (shove, force) = net_shove(&entries, config.horizontal);
        if shove != Vec3::ZERO {
            def.reposition(world, shove);
            def.apply_linear_force(force);
        }
        return;
    }

    // The collider's net transform with its sphere centered at `center`.
    let net_at = |center: Vec3| Mat4::from_translation(center - start) * net;

    let reverse = -motion.normalize();
    let right = Vec3::Z.cross(reverse);
    let mut candidate = start;
    let mut force = Vec3::ZERO;
    let mut blocked = Blocked::default();

    for _ in 0..config.max_iterations {
        let Some(index) = entries
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.t().total_cmp(&b.1.t()))
            .map(|(i, _)| i)
        else {
            break;
        };
        let contact = entries.swap_remove(index);
        let Some((contact_pos, contact_normal)) = contact.all_contact_info_in(&Mat4::IDENTITY) else {
            tracing::warn!(
                collider = ?def.collider(),
                into = ?contact.into_node(),
                "cannot shove: contact has no position or normal"
            );
            break;
        };

        let normal = if config.horizontal {
            Vec3::new(contact_normal.x, contact_normal.y, 0.0).normalize_or_zero()
        } else {
            contact_normal
        };
        let uncollided = candidate;
        candidate = contact_pos;
        force += normal;

        let side = right.dot(normal);
        if side > 0.0 {
            blocked.left = true;
        } else if side < 0.0 {
            blocked.right = true;
        }
        if blocked.left && blocked.right {
            tracing::debug!(collider = ?def.collider(), "wedged between surfaces, stopping");
            break;
        }

        // Slide the rest of the way along the surface.
        let remaining = uncollided - contact_pos;
        candidate += remaining - normal * remaining.dot(normal);

        let slid_from = net_at(contact_pos);
        let slid_to = net_at(candidate);
        entries = entries
            .iter()
            .filter_map(|entry| engine.test(&entry.with_from_transforms(slid_to, slid_from)))
            .filter(CollisionEntry::is_tangible)
            .collect();
    }

    let delta = candidate - start;
    if delta != Vec3::ZERO {
        tracing::debug!(collider = ?def.collider(), ?delta, "sliding collider");
        def.reposition(world, delta);
        def.apply_linear_force(force);
    }
}
