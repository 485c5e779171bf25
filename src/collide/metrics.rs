//! Instrumentation sink for the traverser and intersection engine.

use std::sync::atomic::{AtomicU64, Ordering};

use super::shape::ShapeType;

/// Receives a callback for every bounding-volume test and every pair test.
///
/// All methods default to doing nothing, so an implementation only
/// overrides what it wants to record.
pub trait CollisionMetrics: Send + Sync {
    /// A collider's bound was tested against a shape's bound of type `into`.
    fn volume_test(&self, into: ShapeType) {
        let _ = into;
    }

    /// A pair test was dispatched (or found missing) for `from` into `into`.
    fn intersection_test(&self, from: ShapeType, into: ShapeType) {
        let _ = (from, into);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMetrics;

impl CollisionMetrics for NoMetrics {}

/// Counts volume tests and intersection tests per into-shape type.
#[derive(Debug)]
pub struct CountingMetrics {
    volume: [AtomicU64; ShapeType::COUNT],
    intersection: [AtomicU64; ShapeType::COUNT],
}

impl Default for CountingMetrics {
    fn default() -> Self {
        Self {
            volume: std::array::from_fn(|_| AtomicU64::new(0)),
            intersection: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volume_tests(&self, into: ShapeType) -> u64 {
        self.volume[into.index()].load(Ordering::Relaxed)
    }

    pub fn intersection_tests(&self, into: ShapeType) -> u64 {
        self.intersection[into.index()].load(Ordering::Relaxed)
    }

    pub fn total_volume_tests(&self) -> u64 {
        self.volume.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn total_intersection_tests(&self) -> u64 {
        self.intersection.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    /// Zero every counter, typically at the start of a frame.
    pub fn reset(&self) {
        for counter in self.volume.iter().chain(&self.intersection) {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl CollisionMetrics for CountingMetrics {
    fn volume_test(&self, into: ShapeType) {
        self.volume[into.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn intersection_test(&self, _from: ShapeType, into: ShapeType) {
        self.intersection[into.index()].fetch_add(1, Ordering::Relaxed);
    }
}
