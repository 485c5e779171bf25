//! Collision handlers: what happens to the entries a traversal produces.
//!
//! Every handler runs the same cycle once per traversal:
//! `begin_group`, then `add_entry` for each contact, then `end_group`.
//! Returning `false` from `end_group` detaches the handler from the
//! traverser.
//!
//! The physical handlers (pusher, fluid pusher, floor, gravity) move a
//! *target* entity in response to contacts of a *collider* entity. The
//! collider is usually the target itself or one of its descendants.

pub mod event;
pub mod floor;
pub mod fluid_pusher;
pub mod gravity;
pub mod pusher;
pub mod queue;

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use crate::ecs::hierarchy;

use super::contact::CollisionEntry;

pub use event::{CollisionEvent, EventConfig, EventHandler, EventKind};
pub use floor::{FloorConfig, FloorHandler};
pub use fluid_pusher::{FluidPusherConfig, FluidPusherHandler};
pub use gravity::{GravityConfig, GravityHandler};
pub use pusher::{PusherConfig, PusherHandler};
pub use queue::QueueHandler;

/// Receives the entries of one traversal.
pub trait CollisionHandler {
    /// A traversal is starting.
    fn begin_group(&mut self) {}

    /// One confirmed contact for a collider registered with this handler.
    fn add_entry(&mut self, entry: CollisionEntry);

    /// The traversal finished. Return `false` to be detached.
    fn end_group(&mut self, world: &mut hecs::World) -> bool {
        let _ = world;
        true
    }
}

/// A handler as the traverser holds it. Several colliders may share one.
pub type SharedHandler = Rc<RefCell<dyn CollisionHandler>>;

/// Wrap a handler for registration, keeping typed access for the caller.
pub fn shared<H: CollisionHandler>(handler: H) -> Rc<RefCell<H>> {
    Rc::new(RefCell::new(handler))
}

/// An external driver of a target, such as a body in a separate physics
/// simulation, kept in sync with collision responses.
pub trait DriveInterface {
    /// The target was moved to `position` (world space).
    fn force_position(&mut self, position: Vec3);

    /// The response pushed along `force`, the sum of the contact normals
    /// involved.
    fn apply_linear_force(&mut self, force: Vec3) {
        let _ = force;
    }
}

/// One collider registered with a physical handler.
pub struct ColliderDef {
    collider: hecs::Entity,
    target: hecs::Entity,
    drive: Option<Box<dyn DriveInterface>>,
}

impl ColliderDef {
    pub fn collider(&self) -> hecs::Entity {
        self.collider
    }

    pub fn target(&self) -> hecs::Entity {
        self.target
    }

    /// Move the target by `delta` (world space) and tell its drive.
    pub(crate) fn reposition(&mut self, world: &mut hecs::World, delta: Vec3) {
        if !hierarchy::translate_world(world, self.target, delta) {
            tracing::warn!(target_entity = ?self.target, "collision target has no Transform to move");
            return;
        }
        if let Some(drive) = &mut self.drive {
            drive.force_position(hierarchy::world_position(world, self.target));
        }
    }

    pub(crate) fn apply_linear_force(&mut self, force: Vec3) {
        if let Some(drive) = &mut self.drive {
            drive.apply_linear_force(force);
        }
    }
}

impl std::fmt::Debug for ColliderDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColliderDef")
            .field("collider", &self.collider)
            .field("target", &self.target)
            .field("drive", &self.drive.is_some())
            .finish()
    }
}

/// State shared by every physical handler: the collider registrations, the
/// tangible entries of the current traversal grouped by collider, and an
/// event handler fed with every entry.
#[derive(Debug)]
pub(crate) struct PhysicalCore {
    pub(crate) events: EventHandler,
    defs: Vec<ColliderDef>,
    pending: Vec<(hecs::Entity, Vec<CollisionEntry>)>,
}

impl PhysicalCore {
    pub(crate) fn new(events: EventConfig) -> Self {
        Self {
            events: EventHandler::new(events),
            defs: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub(crate) fn add_collider(
        &mut self,
        collider: hecs::Entity,
        target: hecs::Entity,
        drive: Option<Box<dyn DriveInterface>>,
    ) {
        let def = ColliderDef {
            collider,
            target,
            drive,
        };
        match self.defs.iter_mut().find(|d| d.collider == collider) {
            Some(existing) => *existing = def,
            None => self.defs.push(def),
        }
    }

    pub(crate) fn remove_collider(&mut self, collider: hecs::Entity) -> bool {
        let before = self.defs.len();
        self.defs.retain(|d| d.collider != collider);
        self.defs.len() != before
    }

    pub(crate) fn has_collider(&self, collider: hecs::Entity) -> bool {
        self.defs.iter().any(|d| d.collider == collider)
    }

    pub(crate) fn clear_colliders(&mut self) {
        self.defs.clear();
    }

    pub(crate) fn begin_group(&mut self) {
        self.events.begin_group();
        self.pending.clear();
    }

    pub(crate) fn add_entry(&mut self, entry: CollisionEntry) {
        self.events.record(&entry);
        if !entry.is_tangible() {
            return;
        }
        let from = entry.from_node();
        match self.pending.iter_mut().find(|(node, _)| *node == from) {
            Some((_, entries)) => entries.push(entry),
            None => self.pending.push((from, vec![entry])),
        }
    }

    /// Fire this traversal's events, then hand each collider's entries to
    /// `respond`. Returns false if some collider was not registered.
    pub(crate) fn end_group(
        &mut self,
        world: &mut hecs::World,
        mut respond: impl FnMut(&mut hecs::World, &mut ColliderDef, Vec<CollisionEntry>),
    ) -> bool {
        self.events.end_group(world);

        let mut ok = true;
        for (collider, entries) in std::mem::take(&mut self.pending) {
            match self.defs.iter_mut().find(|d| d.collider == collider) {
                Some(def) => respond(world, def, entries),
                None => {
                    tracing::error!(?collider, "collision handler received entries for an unregistered collider");
                    ok = false;
                }
            }
        }
        ok
    }
}

/// Collider registration shared by the physical handlers.
macro_rules! physical_handler_api {
    ($handler:ty) => {
        impl $handler {
            /// Also fire enter/again/exit events for this handler's contacts.
            pub fn with_events(mut self, events: $crate::collide::handler::EventConfig) -> Self {
                self.core.events = $crate::collide::handler::EventHandler::new(events);
                self
            }

            /// Move `target` in response to contacts of `collider`.
            /// Replaces any earlier registration of `collider`.
            pub fn add_collider(&mut self, collider: hecs::Entity, target: hecs::Entity) {
                self.core.add_collider(collider, target, None);
            }

            /// Like [`Self::add_collider`], also keeping `drive` in sync.
            pub fn add_collider_with_drive(
                &mut self,
                collider: hecs::Entity,
                target: hecs::Entity,
                drive: Box<dyn $crate::collide::handler::DriveInterface>,
            ) {
                self.core.add_collider(collider, target, Some(drive));
            }

            pub fn remove_collider(&mut self, collider: hecs::Entity) -> bool {
                self.core.remove_collider(collider)
            }

            pub fn has_collider(&self, collider: hecs::Entity) -> bool {
                self.core.has_collider(collider)
            }

            pub fn clear_colliders(&mut self) {
                self.core.clear_colliders();
            }

            /// Events fired by this handler, in firing order.
            pub fn drain_events(&mut self) -> impl Iterator<Item = $crate::collide::handler::CollisionEvent> + '_ {
                self.core.events.drain_events()
            }
        }
    };
}
pub(crate) use physical_handler_api;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collide::{Shape, Traverser};
    use crate::ecs::components::{CollisionNode, Name, Transform};
    use crate::ecs::hierarchy::attach_child;
    use crate::math::Plane;

    #[derive(Default)]
    struct Recorded {
        positions: Vec<Vec3>,
        forces: Vec<Vec3>,
    }

    struct Recorder(Rc<RefCell<Recorded>>);

    impl DriveInterface for Recorder {
        fn force_position(&mut self, position: Vec3) {
            self.0.borrow_mut().positions.push(position);
        }

        fn apply_linear_force(&mut self, force: Vec3) {
            self.0.borrow_mut().forces.push(force);
        }
    }

    /// A named unit ball resting 0.25 deep in a named floor plane.
    fn sunk_ball() -> (hecs::World, hecs::Entity, hecs::Entity) {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        let floor = world.spawn((
            Transform::identity(),
            Name::new("floor"),
            CollisionNode::new().with_shape(Shape::plane(Plane::from_point_normal(Vec3::ZERO, Vec3::Z))),
        ));
        attach_child(&mut world, root, floor).unwrap();
        let ball = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, 0.75)),
            Name::new("ball"),
            CollisionNode::new().with_shape(Shape::sphere(Vec3::ZERO, 1.0)),
        ));
        attach_child(&mut world, root, ball).unwrap();
        (world, root, ball)
    }

    #[test]
    fn test_drive_follows_response() {
        let (mut world, root, ball) = sunk_ball();
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let pusher = shared(PusherHandler::default());
        pusher
            .borrow_mut()
            .add_collider_with_drive(ball, ball, Box::new(Recorder(recorded.clone())));
        let mut traverser = Traverser::default();
        traverser.add_collider(ball, pusher.clone());
        traverser.traverse(&mut world, root);

        let recorded = recorded.borrow();
        assert_eq!(recorded.positions.len(), 1);
        assert!((recorded.positions[0] - Vec3::Z).length() < 1e-4);
        assert_eq!(recorded.forces.len(), 1);
        assert!((recorded.forces[0] - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_physical_handler_fires_events() {
        let (mut world, root, ball) = sunk_ball();
        let pusher = shared(PusherHandler::default().with_events(EventConfig::default()));
        pusher.borrow_mut().add_collider(ball, ball);
        let mut traverser = Traverser::default();
        traverser.add_collider(ball, pusher.clone());

        traverser.traverse(&mut world, root);
        let events: Vec<_> = pusher.borrow_mut().drain_events().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::In);
        assert_eq!(events[0].name, "ball-into-floor");
        assert_eq!(events[0].from, ball);
    }

    #[test]
    fn test_registration_replaces() {
        let mut world = hecs::World::new();
        let collider = world.spawn(());
        let (first, second) = (world.spawn(()), world.spawn(()));
        let mut core = PhysicalCore::new(EventConfig::none());
        core.add_collider(collider, first, None);
        core.add_collider(collider, second, None);
        assert_eq!(core.defs.len(), 1);
        assert_eq!(core.defs[0].target(), second);

        assert!(core.remove_collider(collider));
        assert!(!core.remove_collider(collider));
        assert!(!core.has_collider(collider));
    }
}
