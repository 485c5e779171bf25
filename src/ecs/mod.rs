//! Entity Component System integration with hecs.
//!
//! The scene graph is a hecs world: entities with a
//! [`Transform`](components::Transform) form a tree through
//! [`Parent`](components::Parent)/[`Children`](components::Children), and
//! collidable leaves carry a [`CollisionNode`](components::CollisionNode).

pub mod components;
pub mod hierarchy;
pub mod systems;

pub mod prelude {
    pub use super::components::*;
    pub use super::hierarchy::{attach_child, net_prev_transform, net_transform};
    pub use super::systems::reset_prev_transform_system;
}
