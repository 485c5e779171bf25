//! Pair-test dispatch: a fixed table keyed by (from, into) shape type.

use std::collections::HashSet;
use std::sync::Arc;

use super::contact::CollisionEntry;
use super::metrics::{CollisionMetrics, NoMetrics};
use super::shape::{ShapeKind, ShapeType};
use super::solid::{box_solid, capsule, heightfield, inv_sphere, plane, polygon, sphere};

/// A pair test. Receives the probe entry and returns a filled-in copy on
/// contact.
pub type TestFn = fn(&CollisionEntry) -> Option<CollisionEntry>;

const N: usize = ShapeType::COUNT;

/// Register `$test` for the pair, unwrapping both shapes' parameters.
macro_rules! pair {
    ($table:ident, $from:ident => $into:ident, $test:path) => {
        $table.set(ShapeType::$from, ShapeType::$into, |entry| {
            match (entry.from_shape().kind(), entry.into_shape().kind()) {
                (ShapeKind::$from(from), ShapeKind::$into(into)) => $test(from, into, entry),
                // The slot is keyed by exactly these kinds.
                _ => None,
            }
        });
    };
}

/// Which test handles each ordered pair of shape types.
#[derive(Clone)]
pub struct DispatchTable {
    slots: [[Option<TestFn>; N]; N],
}

impl DispatchTable {
    /// A table with no tests at all.
    pub fn empty() -> Self {
        Self { slots: [[None; N]; N] }
    }

    /// Every pair this crate implements.
    pub fn standard() -> Self {
        let mut t = Self::empty();

        pair!(t, Sphere => Sphere, sphere::from_sphere);
        pair!(t, Line => Sphere, sphere::from_line);
        pair!(t, Ray => Sphere, sphere::from_ray);
        pair!(t, Segment => Sphere, sphere::from_segment);
        pair!(t, Capsule => Sphere, sphere::from_capsule);
        pair!(t, Parabola => Sphere, sphere::from_parabola);
        pair!(t, Box => Sphere, sphere::from_box);

        pair!(t, Sphere => InvSphere, inv_sphere::from_sphere);
        pair!(t, Line => InvSphere, inv_sphere::from_line);
        pair!(t, Ray => InvSphere, inv_sphere::from_ray);
        pair!(t, Segment => InvSphere, inv_sphere::from_segment);
        pair!(t, Capsule => InvSphere, inv_sphere::from_capsule);

        pair!(t, Sphere => Plane, plane::from_sphere);
        pair!(t, Line => Plane, plane::from_line);
        pair!(t, Ray => Plane, plane::from_ray);
        pair!(t, Segment => Plane, plane::from_segment);
        pair!(t, Capsule => Plane, plane::from_capsule);
        pair!(t, Parabola => Plane, plane::from_parabola);
        pair!(t, Box => Plane, plane::from_box);

        pair!(t, Sphere => Polygon, polygon::from_sphere);
        pair!(t, Line => Polygon, polygon::from_line);
        pair!(t, Ray => Polygon, polygon::from_ray);
        pair!(t, Segment => Polygon, polygon::from_segment);
        pair!(t, Capsule => Polygon, polygon::from_capsule);
        pair!(t, Parabola => Polygon, polygon::from_parabola);
        pair!(t, Box => Polygon, polygon::from_box);

        pair!(t, Sphere => Box, box_solid::from_sphere);
        pair!(t, Line => Box, box_solid::from_line);
        pair!(t, Ray => Box, box_solid::from_ray);
        pair!(t, Segment => Box, box_solid::from_segment);
        pair!(t, Capsule => Box, box_solid::from_capsule);
        pair!(t, Parabola => Box, box_solid::from_parabola);
        pair!(t, Box => Box, box_solid::from_box);

        pair!(t, Sphere => Capsule, capsule::from_sphere);
        pair!(t, Line => Capsule, capsule::from_line);
        pair!(t, Ray => Capsule, capsule::from_ray);
        pair!(t, Segment => Capsule, capsule::from_segment);
        pair!(t, Capsule => Capsule, capsule::from_capsule);
        pair!(t, Parabola => Capsule, capsule::from_parabola);
        pair!(t, Box => Capsule, capsule::from_box);

        pair!(t, Sphere => Heightfield, heightfield::from_sphere);
        pair!(t, Ray => Heightfield, heightfield::from_ray);
        pair!(t, Segment => Heightfield, heightfield::from_segment);
        pair!(t, Box => Heightfield, heightfield::from_box);

        t
    }

    pub fn get(&self, from: ShapeType, into: ShapeType) -> Option<TestFn> {
        self.slots[from.index()][into.index()]
    }

    /// Install or replace the test for a pair.
    pub fn set(&mut self, from: ShapeType, into: ShapeType, test: TestFn) {
        self.slots[from.index()][into.index()] = Some(test);
    }

    pub fn clear(&mut self, from: ShapeType, into: ShapeType) {
        self.slots[from.index()][into.index()] = None;
    }

    /// Implemented pairs in (from, into) order.
    pub fn pairs(&self) -> impl Iterator<Item = (ShapeType, ShapeType)> + '_ {
        ShapeType::ALL.into_iter().flat_map(move |from| {
            ShapeType::ALL
                .into_iter()
                .filter(move |&into| self.get(from, into).is_some())
                .map(move |into| (from, into))
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable").field("pairs", &self.len()).finish()
    }
}

/// Runs pair tests through a [`DispatchTable`].
///
/// A pair with no test reports no contact and logs a warning the first time
/// it is seen.
pub struct IntersectionEngine {
    table: DispatchTable,
    metrics: Arc<dyn CollisionMetrics>,
    warned: HashSet<(ShapeType, ShapeType)>,
}

impl IntersectionEngine {
    pub fn new(table: DispatchTable, metrics: Arc<dyn CollisionMetrics>) -> Self {
        Self {
            table,
            metrics,
            warned: HashSet::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn CollisionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut DispatchTable {
        &mut self.table
    }

    pub fn metrics(&self) -> &Arc<dyn CollisionMetrics> {
        &self.metrics
    }

    pub fn has_test(&self, from: ShapeType, into: ShapeType) -> bool {
        self.table.get(from, into).is_some()
    }

    /// Test the entry's from-shape against its into-shape.
    pub fn test(&mut self, entry: &CollisionEntry) -> Option<CollisionEntry> {
        let from = entry.from_shape().shape_type();
        let into = entry.into_shape().shape_type();
        self.metrics.intersection_test(from, into);

        match self.table.get(from, into) {
            Some(test) => test(entry),
            None => {
                if self.warned.insert((from, into)) {
                    tracing::warn!(%from, %into, "no intersection test for shape pair");
                }
                None
            }
        }
    }
}

impl Default for IntersectionEngine {
    fn default() -> Self {
        Self::new(DispatchTable::standard(), Arc::new(NoMetrics))
    }
}

impl std::fmt::Debug for IntersectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntersectionEngine")
            .field("table", &self.table)
            .field("warned", &self.warned.len())
            .finish()
    }
}
