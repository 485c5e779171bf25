//! Shorthand for running one pair test outside a scene.

use std::sync::Arc;

use glam::Mat4;

use crate::math::Plane;

use super::contact::{CollisionEntry, EntrySide};
use super::narrowphase::IntersectionEngine;
use super::shape::Shape;

fn side(shape: &Shape, net: Mat4, prev_net: Mat4) -> EntrySide {
    EntrySide {
        shape: Arc::new(shape.clone()),
        node: hecs::Entity::DANGLING,
        index: 0,
        net,
        prev_net,
    }
}

fn run(entry: &CollisionEntry) -> Option<CollisionEntry> {
    IntersectionEngine::default().test(entry)
}

/// Both shapes at the origin, no motion.
pub(crate) fn collide(from: &Shape, into: &Shape) -> Option<CollisionEntry> {
    let entry = CollisionEntry::new(
        side(from, Mat4::IDENTITY, Mat4::IDENTITY),
        side(into, Mat4::IDENTITY, Mat4::IDENTITY),
        false,
    );
    run(&entry)
}

/// `from` moved from `prev` to `now` this frame; `into` sits at the origin.
pub(crate) fn collide_moving(from: &Shape, into: &Shape, prev: Mat4, now: Mat4) -> Option<CollisionEntry> {
    let entry = CollisionEntry::new(
        side(from, now, prev),
        side(into, Mat4::IDENTITY, Mat4::IDENTITY),
        true,
    );
    run(&entry)
}

/// Static test with clip planes on the into-side.
pub(crate) fn collide_clipped(from: &Shape, into: &Shape, planes: &[Plane]) -> Option<CollisionEntry> {
    let entry = CollisionEntry::new(
        side(from, Mat4::IDENTITY, Mat4::IDENTITY),
        side(into, Mat4::IDENTITY, Mat4::IDENTITY),
        false,
    )
    .with_into_clip_planes(planes.iter().copied().collect());
    run(&entry)
}
