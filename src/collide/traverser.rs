//! Per-frame scene walk testing registered colliders against every
//! collidable node.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use glam::Mat4;

use crate::bounds::BoundingVolume;
use crate::ecs::components::{ClipPlanes, CollisionNode};
use crate::ecs::hierarchy;
use crate::math::Plane;

use super::contact::{CollisionEntry, EntrySide};
use super::handler::SharedHandler;
use super::narrowphase::IntersectionEngine;
use super::TraverserConfig;

/// Largest number of colliders one walk can track.
const MAX_MOVERS_PER_PASS: usize = 64;

fn same_handler(a: &SharedHandler, b: &SharedHandler) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

struct Collider {
    node: hecs::Entity,
    handler: SharedHandler,
    in_graph: bool,
}

struct HandlerSlot {
    handler: SharedHandler,
    colliders: usize,
}

/// One from-shape of one collider, snapshotted for this traversal.
struct Mover {
    node: hecs::Entity,
    index: usize,
    shape: Arc<super::Shape>,
    from_mask: crate::ecs::components::CollideMask,
    net: Mat4,
    prev_net: Mat4,
    bounds: BoundingVolume,
    handler: SharedHandler,
}

/// What the walk needs to know about a scene node.
struct NodeInfo {
    net: Mat4,
    prev_net: Mat4,
    /// World-space bound of the node's shapes and all its descendants.
    bounds: BoundingVolume,
}

/// Tests registered colliders against the scene and feeds the results to
/// their handlers.
pub struct Traverser {
    config: TraverserConfig,
    engine: IntersectionEngine,
    colliders: Vec<Collider>,
    handlers: Vec<HandlerSlot>,
}

impl Traverser {
    pub fn new(config: TraverserConfig) -> Self {
        Self {
            config,
            engine: IntersectionEngine::default(),
            colliders: Vec::new(),
            handlers: Vec::new(),
        }
    }

    pub fn with_engine(mut self, engine: IntersectionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &TraverserConfig {
        &self.config
    }

    pub fn engine(&self) -> &IntersectionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut IntersectionEngine {
        &mut self.engine
    }

    pub fn respect_prev_transform(&self) -> bool {
        self.config.respect_prev_transform
    }

    pub fn set_respect_prev_transform(&mut self, respect: bool) {
        self.config.respect_prev_transform = respect;
    }

    /// Register `node` as a collider whose entries go to `handler`.
    /// Re-registering a node replaces its handler.
    pub fn add_collider(&mut self, node: hecs::Entity, handler: SharedHandler) {
        if let Some(existing) = self.colliders.iter_mut().find(|c| c.node == node) {
            if same_handler(&existing.handler, &handler) {
                return;
            }
            let old = std::mem::replace(&mut existing.handler, handler.clone());
            self.release_handler(&old);
        } else {
            self.colliders.push(Collider {
                node,
                handler: handler.clone(),
                in_graph: true,
            });
        }
        match self.handlers.iter_mut().find(|slot| same_handler(&slot.handler, &handler)) {
            Some(slot) => slot.colliders += 1,
            None => self.handlers.push(HandlerSlot { handler, colliders: 1 }),
        }
    }

    /// Unregister `node`. Returns false if it was not a collider.
    pub fn remove_collider(&mut self, node: hecs::Entity) -> bool {
        let Some(index) = self.colliders.iter().position(|c| c.node == node) else {
            return false;
        };
        let collider = self.colliders.remove(index);
        self.release_handler(&collider.handler);
        true
    }

    pub fn has_collider(&self, node: hecs::Entity) -> bool {
        self.colliders.iter().any(|c| c.node == node)
    }

    /// Registered colliders in registration order.
    pub fn colliders(&self) -> impl Iterator<Item = hecs::Entity> + '_ {
        self.colliders.iter().map(|c| c.node)
    }

    pub fn num_colliders(&self) -> usize {
        self.colliders.len()
    }

    pub fn handler_for(&self, node: hecs::Entity) -> Option<SharedHandler> {
        self.colliders
            .iter()
            .find(|c| c.node == node)
            .map(|c| c.handler.clone())
    }

    pub fn clear_colliders(&mut self) {
        self.colliders.clear();
        self.handlers.clear();
    }

    /// Drop one reference to `handler`, detaching it with its last collider.
    fn release_handler(&mut self, handler: &SharedHandler) {
        if let Some(index) = self.handlers.iter().position(|s| same_handler(&s.handler, handler)) {
            self.handlers[index].colliders -= 1;
            if self.handlers[index].colliders == 0 {
                self.handlers.remove(index);
            }
        }
    }

    /// Detach `handler` and every collider using it.
    fn remove_handler(&mut self, handler: &SharedHandler) {
        self.colliders.retain(|c| !same_handler(&c.handler, handler));
        self.handlers.retain(|s| !same_handler(&s.handler, handler));
    }

    /// Test every collider reachable from `root` against the scene under
    /// `root`, then let each handler respond.
    pub fn traverse(&mut self, world: &mut hecs::World, root: hecs::Entity) {
        // Prepare may drop colliders, and with them handlers; only the
        // handlers left afterwards start a group.
        let movers = self.prepare_colliders(world, root);
        for slot in &self.handlers {
            slot.handler.borrow_mut().begin_group();
        }

        if !movers.is_empty() {
            let mut scene = HashMap::new();
            let root_net = hierarchy::net_transform(world, root);
            let root_prev = hierarchy::net_prev_transform(world, root);
            scene_bounds(world, root, root_net, root_prev, &mut scene);

            let per_pass = self.config.movers_per_pass.clamp(1, MAX_MOVERS_PER_PASS);
            for pass in movers.chunks(per_pass) {
                let live = u64::MAX >> (MAX_MOVERS_PER_PASS - pass.len());
                self.walk(world, root, pass, live, &scene);
            }
        }

        let handlers: Vec<SharedHandler> = self.handlers.iter().map(|s| s.handler.clone()).collect();
        for handler in handlers {
            let keep = handler.borrow_mut().end_group(world);
            if !keep {
                tracing::info!("detaching collision handler that rejected its entries");
                self.remove_handler(&handler);
            }
        }
    }

    /// Snapshot every collider's shapes and transforms.
    fn prepare_colliders(&mut self, world: &hecs::World, root: hecs::Entity) -> Vec<Mover> {
        let respect_prev = self.config.respect_prev_transform;
        let mut movers = Vec::new();
        let mut broken = Vec::new();

        for collider in &mut self.colliders {
            let node = match world.get::<&CollisionNode>(collider.node) {
                Ok(node) if hierarchy::is_descendant_or_self(world, collider.node, root) => node,
                _ => {
                    if collider.in_graph {
                        tracing::info!(collider = ?collider.node, "collider is not in the traversed scene");
                        collider.in_graph = false;
                    }
                    continue;
                }
            };
            collider.in_graph = true;

            let net = hierarchy::net_transform(world, collider.node);
            let prev_net = if respect_prev {
                hierarchy::net_prev_transform(world, collider.node)
            } else {
                net
            };
            if !net.is_finite() || !prev_net.is_finite() {
                tracing::error!(collider = ?collider.node, "collider transform is not finite; removing it");
                broken.push(collider.node);
                continue;
            }

            for (index, shape) in node.shapes().iter().enumerate() {
                let mut bounds = shape.bounds().transformed(&net);
                if respect_prev {
                    bounds.extend(&shape.bounds().transformed(&prev_net));
                }
                movers.push(Mover {
                    node: collider.node,
                    index,
                    shape: shape.clone(),
                    from_mask: node.from_mask(),
                    net,
                    prev_net,
                    bounds,
                    handler: collider.handler.clone(),
                });
            }
        }

        for node in broken {
            self.remove_collider(node);
        }
        movers
    }

    fn walk(
        &mut self,
        world: &hecs::World,
        node: hecs::Entity,
        movers: &[Mover],
        mut live: u64,
        scene: &HashMap<hecs::Entity, NodeInfo>,
    ) {
        let Some(info) = scene.get(&node) else {
            return;
        };
        for (bit, mover) in movers.iter().enumerate() {
            if live & (1 << bit) != 0 && !info.bounds.intersects(&mover.bounds) {
                live &= !(1 << bit);
            }
        }
        if live == 0 {
            return;
        }

        if let Ok(collision) = world.get::<&CollisionNode>(node) {
            let clip = clip_planes_for(world, node, &info.net);
            self.compare(node, &collision, info, clip, movers, live);
        }

        for child in hierarchy::children_of(world, node) {
            self.walk(world, child, movers, live, scene);
        }
    }

    fn compare(
        &mut self,
        node: hecs::Entity,
        collision: &CollisionNode,
        info: &NodeInfo,
        clip: Option<Arc<[Plane]>>,
        movers: &[Mover],
        live: u64,
    ) {
        let per_shape_bounds = collision.num_shapes() > 1;
        for (bit, mover) in movers.iter().enumerate() {
            if live & (1 << bit) == 0 || mover.node == node {
                continue;
            }
            if !mover.from_mask.overlaps(collision.into_mask()) {
                continue;
            }

            for (index, shape) in collision.shapes().iter().enumerate() {
                if per_shape_bounds {
                    self.engine.metrics().volume_test(shape.shape_type());
                    if !shape.bounds().transformed(&info.net).intersects(&mover.bounds) {
                        continue;
                    }
                }

                let from = EntrySide {
                    shape: mover.shape.clone(),
                    node: mover.node,
                    index: mover.index,
                    net: mover.net,
                    prev_net: mover.prev_net,
                };
                let into = EntrySide {
                    shape: shape.clone(),
                    node,
                    index,
                    net: info.net,
                    prev_net: info.prev_net,
                };
                let mut entry = CollisionEntry::new(from, into, self.config.respect_prev_transform);
                if let Some(planes) = &clip {
                    entry = entry.with_into_clip_planes(planes.clone());
                }

                if let Some(hit) = self.engine.test(&entry) {
                    mover.handler.borrow_mut().add_entry(hit);
                }
            }
        }
    }
}

impl Default for Traverser {
    fn default() -> Self {
        Self::new(TraverserConfig::default())
    }
}

impl std::fmt::Debug for Traverser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Traverser")
            .field("config", &self.config)
            .field("colliders", &self.colliders.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// The node's world-space clip planes, re-expressed in its own space.
fn clip_planes_for(world: &hecs::World, node: hecs::Entity, net: &Mat4) -> Option<Arc<[Plane]>> {
    let planes = world.get::<&ClipPlanes>(node).ok()?;
    let to_local = net.inverse();
    Some(planes.0.iter().map(|p| p.xform(&to_local)).collect())
}

/// Record every node's net transforms and subtree bound, returning the
/// bound of `node`'s subtree. A subtree under a non-finite transform is
/// left out of the walk.
fn scene_bounds(
    world: &hecs::World,
    node: hecs::Entity,
    net: Mat4,
    prev_net: Mat4,
    out: &mut HashMap<hecs::Entity, NodeInfo>,
) -> BoundingVolume {
    if !net.is_finite() {
        tracing::debug!(?node, "skipping scene branch with a non-finite transform");
        return BoundingVolume::Empty;
    }
    let mut bounds = match world.get::<&CollisionNode>(node) {
        Ok(collision) => collision.bounds().transformed(&net),
        Err(_) => BoundingVolume::Empty,
    };
    for child in hierarchy::children_of(world, node) {
        let child_net = net * hierarchy::local_matrix(world, child);
        let child_prev = prev_net * hierarchy::local_prev_matrix(world, child);
        bounds.extend(&scene_bounds(world, child, child_net, child_prev, out));
    }
    out.insert(
        node,
        NodeInfo {
            net,
            prev_net,
            bounds,
        },
    );
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collide::handler::{shared, CollisionHandler, QueueHandler};
    use crate::collide::metrics::CountingMetrics;
    use crate::collide::{Shape, ShapeType};
    use crate::ecs::components::{CollideMask, PrevTransform, Transform};
    use crate::ecs::hierarchy::attach_child;
    use glam::Vec3;
    use std::cell::RefCell;

    fn spawn(world: &mut hecs::World, parent: hecs::Entity, pos: Vec3, node: CollisionNode) -> hecs::Entity {
        let e = world.spawn((Transform::from_position(pos), node));
        attach_child(world, parent, e).unwrap();
        e
    }

    fn ball(radius: f32) -> CollisionNode {
        CollisionNode::new().with_shape(Shape::sphere(Vec3::ZERO, radius))
    }

    #[test]
    fn test_queue_collects_hits() {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        let target = spawn(&mut world, root, Vec3::new(1.5, 0.0, 0.0), ball(1.0));
        spawn(&mut world, root, Vec3::new(10.0, 0.0, 0.0), ball(1.0));
        let mover = spawn(&mut world, root, Vec3::ZERO, ball(1.0));

        let queue = shared(QueueHandler::new());
        let mut traverser = Traverser::default();
        traverser.add_collider(mover, queue.clone());
        traverser.traverse(&mut world, root);

        let queue = queue.borrow();
        assert_eq!(queue.num_entries(), 1);
        let entry = &queue.entries()[0];
        assert_eq!(entry.into_node(), target);
        assert_eq!(entry.from_node(), mover);
        assert!((entry.depth().unwrap() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_masks_filter_pairs() {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        spawn(
            &mut world,
            root,
            Vec3::X,
            ball(1.0).with_into_mask(CollideMask::bit(2)),
        );
        let mover = spawn(
            &mut world,
            root,
            Vec3::ZERO,
            ball(1.0).with_from_mask(CollideMask::bit(1)),
        );

        let queue = shared(QueueHandler::new());
        let mut traverser = Traverser::default();
        traverser.add_collider(mover, queue.clone());
        traverser.traverse(&mut world, root);
        assert_eq!(queue.borrow().num_entries(), 0);

        world
            .get::<&mut CollisionNode>(mover)
            .unwrap()
            .set_from_mask(CollideMask::bit(1) | CollideMask::bit(2));
        traverser.traverse(&mut world, root);
        assert_eq!(queue.borrow().num_entries(), 1);
    }

    #[test]
    fn test_child_transforms_compose() {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        let group = world.spawn((Transform::from_position(Vec3::new(0.0, 5.0, 0.0)),));
        attach_child(&mut world, root, group).unwrap();
        let target = spawn(&mut world, group, Vec3::new(0.0, 0.0, 0.0), ball(1.0));
        let mover = spawn(&mut world, root, Vec3::new(0.0, 4.0, 0.0), ball(0.5));

        let queue = shared(QueueHandler::new());
        let mut traverser = Traverser::default();
        traverser.add_collider(mover, queue.clone());
        traverser.traverse(&mut world, root);

        let queue = queue.borrow();
        assert_eq!(queue.num_entries(), 1);
        let p = queue.entries()[0].surface_point_in(&Mat4::IDENTITY).unwrap();
        assert!((p - Vec3::new(0.0, 4.0, 0.0)).length() < 1e-4, "p = {p}");
        assert_eq!(queue.entries()[0].into_node(), target);
    }

    #[test]
    fn test_swept_mover_hits_thin_wall() {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        let wall = Shape::polygon(&[
            Vec3::new(5.0, -1.0, -1.0),
            Vec3::new(5.0, 1.0, -1.0),
            Vec3::new(5.0, 1.0, 1.0),
            Vec3::new(5.0, -1.0, 1.0),
        ])
        .unwrap();
        spawn(&mut world, root, Vec3::ZERO, CollisionNode::new().with_shape(wall));
        let mover = world.spawn((
            Transform::identity(),
            PrevTransform(Transform::from_position(Vec3::new(10.0, 0.0, 0.0))),
            ball(0.25),
        ));
        attach_child(&mut world, root, mover).unwrap();

        let queue = shared(QueueHandler::new());
        let mut traverser = Traverser::default();
        traverser.add_collider(mover, queue.clone());

        traverser.traverse(&mut world, root);
        assert_eq!(queue.borrow().num_entries(), 0);

        traverser.set_respect_prev_transform(true);
        traverser.traverse(&mut world, root);
        assert_eq!(queue.borrow().num_entries(), 1);
    }

    #[test]
    fn test_nan_mover_is_removed() {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        spawn(&mut world, root, Vec3::ZERO, ball(1.0));
        let mover = spawn(
            &mut world,
            root,
            Vec3::new(f32::NAN, 0.0, 0.0),
            ball(1.0).with_into_mask(CollideMask::NONE),
        );
        let healthy = spawn(&mut world, root, Vec3::new(0.5, 0.0, 0.0), ball(1.0));

        let queue = shared(QueueHandler::new());
        let mut traverser = Traverser::default();
        traverser.add_collider(mover, queue.clone());
        traverser.add_collider(healthy, queue.clone());
        traverser.traverse(&mut world, root);

        assert!(!traverser.has_collider(mover));
        assert!(traverser.has_collider(healthy));
        assert!(queue.borrow().num_entries() > 0);
        assert!(queue.borrow().entries().iter().all(|e| e.from_node() == healthy));
    }

    #[test]
    fn test_unreachable_collider_is_skipped() {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        let other_root = world.spawn((Transform::identity(),));
        spawn(&mut world, root, Vec3::ZERO, ball(1.0));
        let stray = spawn(&mut world, other_root, Vec3::ZERO, ball(1.0));

        let queue = shared(QueueHandler::new());
        let mut traverser = Traverser::default();
        traverser.add_collider(stray, queue.clone());
        traverser.traverse(&mut world, root);
        assert_eq!(queue.borrow().num_entries(), 0);
        assert!(traverser.has_collider(stray));
    }

    #[derive(Default)]
    struct CountingHandler {
        begins: usize,
        ends: usize,
        entries: usize,
    }

    impl CollisionHandler for CountingHandler {
        fn begin_group(&mut self) {
            self.begins += 1;
        }
        fn add_entry(&mut self, _entry: CollisionEntry) {
            self.entries += 1;
        }
        fn end_group(&mut self, _world: &mut hecs::World) -> bool {
            self.ends += 1;
            true
        }
    }

    #[test]
    fn test_shared_handler_runs_once_per_traversal() {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        spawn(&mut world, root, Vec3::ZERO, ball(1.0));
        let a = spawn(&mut world, root, Vec3::X * 0.5, ball(1.0));
        let b = spawn(&mut world, root, Vec3::X * -0.5, ball(1.0));

        let handler = Rc::new(RefCell::new(CountingHandler::default()));
        let mut traverser = Traverser::default();
        traverser.add_collider(a, handler.clone());
        traverser.add_collider(b, handler.clone());
        traverser.traverse(&mut world, root);

        let h = handler.borrow();
        assert_eq!((h.begins, h.ends), (1, 1));
        // Each mover hits the static ball; a and b also overlap each other.
        assert_eq!(h.entries, 4);
    }

    #[test]
    fn test_removed_nan_collider_keeps_group_cycle() {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        spawn(&mut world, root, Vec3::ZERO, ball(1.0));
        let lost = spawn(&mut world, root, Vec3::new(f32::NAN, 0.0, 0.0), ball(1.0));
        let shared_bad = spawn(&mut world, root, Vec3::new(0.0, f32::NAN, 0.0), ball(1.0));
        let shared_good = spawn(&mut world, root, Vec3::new(0.5, 0.0, 0.0), ball(1.0));

        // Its only collider is removed: the handler sees no group at all.
        let alone = Rc::new(RefCell::new(CountingHandler::default()));
        // One of two colliders is removed: the group still completes.
        let pair = Rc::new(RefCell::new(CountingHandler::default()));

        let mut traverser = Traverser::default();
        traverser.add_collider(lost, alone.clone());
        traverser.add_collider(shared_bad, pair.clone());
        traverser.add_collider(shared_good, pair.clone());
        traverser.traverse(&mut world, root);

        assert!(!traverser.has_collider(lost));
        assert!(!traverser.has_collider(shared_bad));
        assert!(traverser.has_collider(shared_good));

        let alone = alone.borrow();
        assert_eq!((alone.begins, alone.ends), (0, 0));
        let pair = pair.borrow();
        assert_eq!((pair.begins, pair.ends), (1, 1));
        assert!(pair.entries > 0);
    }

    #[test]
    fn test_handler_refcount() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let first = shared(QueueHandler::new());
        let second = shared(QueueHandler::new());

        let mut traverser = Traverser::default();
        traverser.add_collider(a, first.clone());
        traverser.add_collider(b, first.clone());
        assert_eq!(traverser.handlers.len(), 1);
        assert_eq!(traverser.handlers[0].colliders, 2);

        traverser.add_collider(a, second.clone());
        assert_eq!(traverser.handlers.len(), 2);
        let for_a = traverser.handler_for(a).unwrap();
        let expected: SharedHandler = second.clone();
        assert!(same_handler(&for_a, &expected));

        assert!(traverser.remove_collider(b));
        assert!(!traverser.remove_collider(b));
        assert_eq!(traverser.handlers.len(), 1);
        assert_eq!(traverser.colliders().collect::<Vec<_>>(), vec![a]);

        traverser.clear_colliders();
        assert_eq!(traverser.num_colliders(), 0);
    }

    #[test]
    fn test_many_movers_take_several_passes() {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        spawn(&mut world, root, Vec3::ZERO, ball(100.0));

        let queue = shared(QueueHandler::new());
        let mut traverser = Traverser::new(TraverserConfig {
            movers_per_pass: 3,
            ..TraverserConfig::default()
        });
        for i in 0..7 {
            let mover = spawn(
                &mut world,
                root,
                Vec3::new(i as f32 * 300.0, 0.0, 0.0),
                ball(1.0).with_into_mask(CollideMask::NONE),
            );
            traverser.add_collider(mover, queue.clone());
        }
        traverser.traverse(&mut world, root);
        // Only the mover at the origin reaches the big ball.
        assert_eq!(queue.borrow().num_entries(), 1);
    }

    #[test]
    fn test_per_shape_bounds_are_counted() {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        let multi = CollisionNode::new()
            .with_shape(Shape::sphere(Vec3::ZERO, 1.0))
            .with_shape(Shape::sphere(Vec3::new(50.0, 0.0, 0.0), 1.0));
        spawn(&mut world, root, Vec3::ZERO, multi);
        let mover = spawn(&mut world, root, Vec3::X, ball(0.5));

        let metrics = Arc::new(CountingMetrics::new());
        let engine = IntersectionEngine::default().with_metrics(metrics.clone());
        let queue = shared(QueueHandler::new());
        let mut traverser = Traverser::default().with_engine(engine);
        traverser.add_collider(mover, queue.clone());
        traverser.traverse(&mut world, root);

        assert_eq!(metrics.volume_tests(ShapeType::Sphere), 2);
        assert_eq!(metrics.intersection_tests(ShapeType::Sphere), 1);
        assert_eq!(queue.borrow().num_entries(), 1);
    }

    #[test]
    fn test_clip_planes_reach_the_test() -> anyhow::Result<()> {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        let floor = Shape::polygon(&[
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ])?;
        let node = world.spawn((
            Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),
            CollisionNode::new().with_shape(floor),
            // Keep only the half with world x below 10.
            ClipPlanes::new([Plane::from_point_normal(Vec3::new(10.0, 0.0, 0.0), Vec3::X)]),
        ));
        attach_child(&mut world, root, node)?;
        let probe = |x: f32| {
            CollisionNode::new()
                .with_shape(Shape::ray(Vec3::new(x, 0.0, 1.0), -Vec3::Z))
                .with_into_mask(CollideMask::NONE)
        };
        let left = spawn(&mut world, root, Vec3::ZERO, probe(9.5));
        let right = spawn(&mut world, root, Vec3::ZERO, probe(10.5));

        let queue = shared(QueueHandler::new());
        let mut traverser = Traverser::default();
        traverser.add_collider(left, queue.clone());
        traverser.add_collider(right, queue.clone());
        traverser.traverse(&mut world, root);

        let queue = queue.borrow();
        assert_eq!(queue.num_entries(), 1);
        assert_eq!(queue.entries()[0].from_node(), left);
        Ok(())
    }
}
