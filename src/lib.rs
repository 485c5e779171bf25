//! Rein Collide
//!
//! Collision detection and response for a hecs scene graph.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **math** - Planes, parabolas and the closest-point helpers
//! 2. **bounds** - Bounding spheres and boxes used to prune the scene walk
//! 3. **ecs** - Transform hierarchy and the collision components
//! 4. **collide** - Shapes, the intersection engine, the traverser and handlers
//!
//! A frame typically looks like:
//!
//! ```ignore
//! let pusher = shared(PusherHandler::default());
//! pusher.borrow_mut().add_collider(avatar_collider, avatar);
//! traverser.add_collider(avatar_collider, pusher.clone());
//!
//! // every frame
//! reset_prev_transform_system(&mut world);
//! move_things(&mut world);
//! traverser.traverse(&mut world, root);
//! ```

pub mod bounds;
pub mod collide;
pub mod ecs;
pub mod error;
pub mod math;

// Re-export commonly used types
pub use bounds::{Aabb, BoundingVolume, Intersection};

pub use collide::{
    shared, CollisionEntry, CollisionEvent, CollisionHandler, CollisionMetrics, CountingMetrics,
    DispatchTable, DriveInterface, EntrySide, EventConfig, EventHandler, FloorConfig,
    FloorHandler, FluidPusherConfig, FluidPusherHandler, GravityConfig, GravityHandler,
    IntersectionEngine, NoMetrics, PusherConfig, PusherHandler, QueueHandler, Shape, ShapeKind,
    ShapeType, SharedHandler, TestFn, Traverser, TraverserConfig,
};

pub use error::CollideError;

pub use math::{Parabola, Plane};

pub use ecs::prelude::*;

pub use glam;
pub use hecs;
