//! Previous-frame transform bookkeeping.
//!
//! World matrices are not cached: collision composes them on demand
//! through [`hierarchy::net_transform`](crate::ecs::hierarchy::net_transform).

use crate::ecs::components::transform::{PrevTransform, Transform};

/// Record every entity's current [`Transform`] as its [`PrevTransform`].
///
/// Run once per frame before moving anything, so swept tests see this
/// frame's motion only.
pub fn reset_prev_transform_system(world: &mut hecs::World) {
    for (_, (transform, prev)) in world.query_mut::<(&Transform, &mut PrevTransform)>() {
        prev.0 = *transform;
    }
}
