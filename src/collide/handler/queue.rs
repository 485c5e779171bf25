//! A handler that just keeps the entries for the caller to inspect.

use crate::collide::contact::CollisionEntry;

use super::CollisionHandler;

/// Collects every entry of the last traversal, typically for picking.
#[derive(Debug, Default)]
pub struct QueueHandler {
    entries: Vec<CollisionEntry>,
}

impl QueueHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CollisionEntry] {
        &self.entries
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, index: usize) -> Option<&CollisionEntry> {
        self.entries.get(index)
    }

    pub fn clear_entries(&mut self) {
        self.entries.clear();
    }

    pub fn take_entries(&mut self) -> Vec<CollisionEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Sort nearest first, by the distance from each from-shape's origin to
    /// the surface point. Entries without a surface point go last.
    pub fn sort_entries(&mut self) {
        let mut keyed: Vec<(f32, CollisionEntry)> = self
            .entries
            .drain(..)
            .map(|entry| {
                let origin = entry.from_shape().origin();
                let distance = entry
                    .surface_point_in(&entry.from_side().net)
                    .map_or(f32::INFINITY, |p| p.distance(origin));
                (distance, entry)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.entries = keyed.into_iter().map(|(_, entry)| entry).collect();
    }
}

impl CollisionHandler for QueueHandler {
    fn begin_group(&mut self) {
        self.entries.clear();
    }

    fn add_entry(&mut self, entry: CollisionEntry) {
        self.entries.push(entry);
    }
}
