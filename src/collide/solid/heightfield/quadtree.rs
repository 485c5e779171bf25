//! Quadtree over a heightfield's cells.
//!
//! The tree is complete and stored level by level in one array: node `i`
//! has children `4i + 1 ..= 4i + 4`. Each node covers a rectangle of cells
//! and the height range of every sample on that rectangle.

use std::collections::VecDeque;

use glam::Vec3;

use crate::bounds::Aabb;

/// One quadtree node.
///
/// `x0..x1` and `y0..y1` are half-open cell ranges. Cell `(x, y)` spans
/// samples `x..=x + 1` by `y..=y + 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadNode {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
    pub height_min: f32,
    pub height_max: f32,
}

impl QuadNode {
    fn footprint(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            height_min: f32::INFINITY,
            height_max: f32::NEG_INFINITY,
        }
    }

    /// The node's box in grid space: cells are unit squares, z is height.
    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            Vec3::new(self.x0 as f32, self.y0 as f32, self.height_min),
            Vec3::new(self.x1 as f32, self.y1 as f32, self.height_max),
        )
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.y0..self.y1).flat_map(move |y| (self.x0..self.x1).map(move |x| (x, y)))
    }

    pub fn contains_cell(&self, x: usize, y: usize) -> bool {
        (self.x0..self.x1).contains(&x) && (self.y0..self.y1).contains(&y)
    }
}

#[derive(Debug, Clone)]
pub struct Quadtree {
    nodes: Vec<QuadNode>,
    depth: u32,
}

impl Quadtree {
    /// Deepest subdivision that still leaves every leaf at least one cell
    /// wide in both directions.
    pub fn effective_depth(cells_x: usize, cells_y: usize, requested: u32) -> u32 {
        let mut depth = requested;
        while depth > 0
            && (cells_x.checked_shr(depth).unwrap_or(0) == 0 || cells_y.checked_shr(depth).unwrap_or(0) == 0)
        {
            depth -= 1;
        }
        if depth != requested {
            tracing::debug!(requested, depth, cells_x, cells_y, "heightfield subdivision reduced");
        }
        depth
    }

    /// Build the tree over a `cols` x `rows` sample grid stored row by row.
    pub fn build(heights: &[f32], cols: usize, rows: usize, requested_depth: u32) -> Self {
        let (cells_x, cells_y) = (cols - 1, rows - 1);
        let depth = Self::effective_depth(cells_x, cells_y, requested_depth);
        let count = (4usize.pow(depth + 1) - 1) / 3;
        let first_leaf = (4usize.pow(depth) - 1) / 3;

        let mut nodes = vec![QuadNode::footprint(0, 0, cells_x, cells_y); count];
        for i in 0..first_leaf {
            let QuadNode { x0, y0, x1, y1, .. } = nodes[i];
            let (mx, my) = ((x0 + x1) / 2, (y0 + y1) / 2);
            nodes[4 * i + 1] = QuadNode::footprint(x0, y0, mx, my);
            nodes[4 * i + 2] = QuadNode::footprint(mx, y0, x1, my);
            nodes[4 * i + 3] = QuadNode::footprint(x0, my, mx, y1);
            nodes[4 * i + 4] = QuadNode::footprint(mx, my, x1, y1);
        }

        for leaf in &mut nodes[first_leaf..] {
            for y in leaf.y0..=leaf.y1 {
                for &h in &heights[y * cols + leaf.x0..=y * cols + leaf.x1] {
                    leaf.height_min = leaf.height_min.min(h);
                    leaf.height_max = leaf.height_max.max(h);
                }
            }
        }
        for i in (0..first_leaf).rev() {
            let (lo, hi) = (1..=4).map(|k| nodes[4 * i + k]).fold(
                (f32::INFINITY, f32::NEG_INFINITY),
                |(lo, hi), child| (lo.min(child.height_min), hi.max(child.height_max)),
            );
            nodes[i].height_min = lo;
            nodes[i].height_max = hi;
        }

        Self { nodes, depth }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn root(&self) -> &QuadNode {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn first_leaf(&self) -> usize {
        (4usize.pow(self.depth) - 1) / 3
    }

    pub fn leaves(&self) -> &[QuadNode] {
        &self.nodes[self.first_leaf()..]
    }

    /// Breadth-first descent, pruning every node `accept` rejects. Returns
    /// the leaves that survive.
    pub fn query(&self, mut accept: impl FnMut(&QuadNode) -> bool) -> Vec<&QuadNode> {
        let first_leaf = self.first_leaf();
        let mut found = Vec::new();
        let mut queue = VecDeque::from([0usize]);
        while let Some(i) = queue.pop_front() {
            let node = &self.nodes[i];
            if !accept(node) {
                continue;
            }
            if i >= first_leaf {
                found.push(node);
            } else {
                queue.extend(4 * i + 1..=4 * i + 4);
            }
        }
        found
    }
}
