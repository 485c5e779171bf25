//! Collision detection and response over a hecs scene graph.
//!
//! # Architecture
//!
//! One call to [`Traverser::traverse`] runs the whole pipeline:
//!
//! 1. Prepare: snapshot each registered collider's shapes and net transforms
//! 2. Walk the scene depth first, dropping colliders whose bounds miss a branch
//! 3. Test every live collider against each collidable node it reaches
//! 4. Hand each confirmed [`CollisionEntry`] to the collider's handler
//! 5. Let every handler react once (push, snap to floor, fire events)

pub mod contact;
pub mod handler;
pub mod metrics;
pub mod narrowphase;
pub mod shape;
pub mod solid;
pub mod traverser;

#[cfg(test)]
pub(crate) mod testing;

pub use contact::{CollisionEntry, EntrySide};
pub use handler::{
    shared, CollisionEvent, CollisionHandler, DriveInterface, EventConfig, EventHandler,
    FloorConfig, FloorHandler, FluidPusherConfig, FluidPusherHandler, GravityConfig,
    GravityHandler, PusherConfig, PusherHandler, QueueHandler, SharedHandler,
};
pub use metrics::{CollisionMetrics, CountingMetrics, NoMetrics};
pub use narrowphase::{DispatchTable, IntersectionEngine, TestFn};
pub use shape::{Shape, ShapeKind, ShapeType};
pub use traverser::Traverser;

/// Configuration for a [`Traverser`].
#[derive(Debug, Clone)]
pub struct TraverserConfig {
    /// Sweep movers from their previous-frame transform to the current one.
    /// Default: false.
    pub respect_prev_transform: bool,
    /// Colliders tested per scene walk. Larger collider sets take several
    /// walks. Clamped to 1..=64. Default: 64.
    pub movers_per_pass: usize,
}

impl Default for TraverserConfig {
    fn default() -> Self {
        Self {
            respect_prev_transform: false,
            movers_per_pass: 64,
        }
    }
}
