//! Collision components: the shapes a node hosts and the clip planes that
//! trim them.

use std::ops::{BitAnd, BitOr, Not};
use std::sync::{Arc, OnceLock};

use crate::bounds::BoundingVolume;
use crate::collide::{EntrySide, Shape};
use crate::error::CollideError;
use crate::math::Plane;

/// 32-bit collide mask. A mover's from-mask must share a bit with a node's
/// into-mask for the pair to be tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CollideMask(pub u32);

impl CollideMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);
    /// Mask given to new nodes.
    pub const DEFAULT: Self = Self::bit(20);

    pub const fn bit(index: u32) -> Self {
        Self(1 << index)
    }

    pub fn overlaps(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitAnd for CollideMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for CollideMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Not for CollideMask {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// The shapes hosted by one scene node, in node-local space.
#[derive(Debug, Clone)]
pub struct CollisionNode {
    shapes: Vec<Arc<Shape>>,
    from_mask: CollideMask,
    into_mask: CollideMask,
    bounds: OnceLock<BoundingVolume>,
}

impl CollisionNode {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            from_mask: CollideMask::DEFAULT,
            into_mask: CollideMask::DEFAULT,
            bounds: OnceLock::new(),
        }
    }

    pub fn with_shape(mut self, shape: impl Into<Arc<Shape>>) -> Self {
        self.add_shape(shape);
        self
    }

    pub fn with_from_mask(mut self, mask: CollideMask) -> Self {
        self.from_mask = mask;
        self
    }

    pub fn with_into_mask(mut self, mask: CollideMask) -> Self {
        self.into_mask = mask;
        self
    }

    /// Append a shape and return its index.
    pub fn add_shape(&mut self, shape: impl Into<Arc<Shape>>) -> usize {
        self.shapes.push(shape.into());
        self.bounds = OnceLock::new();
        self.shapes.len() - 1
    }

    /// Replace the shape at `index`.
    pub fn set_shape(&mut self, index: usize, shape: impl Into<Arc<Shape>>) -> Result<(), CollideError> {
        let len = self.shapes.len();
        let slot = self
            .shapes
            .get_mut(index)
            .ok_or(CollideError::ShapeIndexOutOfRange { index, len })?;
        *slot = shape.into();
        self.bounds = OnceLock::new();
        Ok(())
    }

    pub fn remove_shape(&mut self, index: usize) -> Result<Arc<Shape>, CollideError> {
        if index >= self.shapes.len() {
            return Err(CollideError::ShapeIndexOutOfRange {
                index,
                len: self.shapes.len(),
            });
        }
        self.bounds = OnceLock::new();
        Ok(self.shapes.remove(index))
    }

    pub fn clear_shapes(&mut self) {
        self.shapes.clear();
        self.bounds = OnceLock::new();
    }

    pub fn shapes(&self) -> &[Arc<Shape>] {
        &self.shapes
    }

    pub fn num_shapes(&self) -> usize {
        self.shapes.len()
    }

    pub fn shape(&self, index: usize) -> Option<&Arc<Shape>> {
        self.shapes.get(index)
    }

    pub fn shape_checked(&self, index: usize) -> Result<&Arc<Shape>, CollideError> {
        self.shapes.get(index).ok_or(CollideError::ShapeIndexOutOfRange {
            index,
            len: self.shapes.len(),
        })
    }

    /// The shape an entry side refers to, provided the node still holds that
    /// same shape at the recorded index.
    pub fn entry_shape(&self, side: &EntrySide) -> Option<&Arc<Shape>> {
        match self.shapes.get(side.index) {
            Some(shape) if Arc::ptr_eq(shape, &side.shape) => Some(shape),
            other => {
                tracing::warn!(
                    index = side.index,
                    len = self.shapes.len(),
                    replaced = other.is_some(),
                    "entry no longer matches the node's shape list"
                );
                None
            }
        }
    }

    pub fn from_mask(&self) -> CollideMask {
        self.from_mask
    }

    pub fn into_mask(&self) -> CollideMask {
        self.into_mask
    }

    pub fn set_from_mask(&mut self, mask: CollideMask) {
        self.from_mask = mask;
    }

    pub fn set_into_mask(&mut self, mask: CollideMask) {
        self.into_mask = mask;
    }

    /// Union of every shape's bound, in node space.
    pub fn bounds(&self) -> &BoundingVolume {
        self.bounds.get_or_init(|| {
            let volumes: Vec<BoundingVolume> = self.shapes.iter().map(|s| s.bounds()).collect();
            BoundingVolume::around(&volumes)
        })
    }
}

impl Default for CollisionNode {
    fn default() -> Self {
        Self::new()
    }
}

/// World-space planes clipping the polygons and box faces of the node they
/// are attached to. Only the part behind every plane stays solid.
#[derive(Debug, Clone)]
pub struct ClipPlanes(pub Arc<[Plane]>);

impl ClipPlanes {
    pub fn new(planes: impl IntoIterator<Item = Plane>) -> Self {
        Self(planes.into_iter().collect())
    }
}
