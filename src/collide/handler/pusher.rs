//! Pushes colliders back out of whatever they walked into.

use glam::{Mat4, Vec3};

use crate::collide::contact::CollisionEntry;
use crate::collide::shape::ShapeKind;

use super::{physical_handler_api, CollisionHandler, EventConfig, PhysicalCore};

/// Shoves pointing within this cosine of each other count as one.
const SAME_DIRECTION: f32 = 0.9;

/// Configuration for a [`PusherHandler`].
#[derive(Debug, Clone, Default)]
pub struct PusherConfig {
    /// Only push sideways: the vertical part of each normal is dropped.
    /// Default: false.
    pub horizontal: bool,
}

/// Moves each collider's target by the sum of its contacts' shoves.
#[derive(Debug)]
pub struct PusherHandler {
    config: PusherConfig,
    core: PhysicalCore,
}

physical_handler_api!(PusherHandler);

impl PusherHandler {
    pub fn new(config: PusherConfig) -> Self {
        Self {
            config,
            core: PhysicalCore::new(EventConfig::none()),
        }
    }

    pub fn config(&self) -> &PusherConfig {
        &self.config
    }

    pub fn set_horizontal(&mut self, horizontal: bool) {
        self.config.horizontal = horizontal;
    }
}

impl Default for PusherHandler {
    fn default() -> Self {
        Self::new(PusherConfig::default())
    }
}

impl CollisionHandler for PusherHandler {
    fn begin_group(&mut self) {
        self.core.begin_group();
    }

    fn add_entry(&mut self, entry: CollisionEntry) {
        self.core.add_entry(entry);
    }

    fn end_group(&mut self, world: &mut hecs::World) -> bool {
        let horizontal = self.config.horizontal;
        self.core.end_group(world, |world, def, entries| {
            let (shove, force) = net_shove(&entries, horizontal);
            if shove != Vec3::ZERO {
                tracing::debug!(collider = ?def.collider(), ?shove, "pushing collider");
                def.reposition(world, shove);
                def.apply_linear_force(force);
            }
        })
    }
}

struct Shove<'a> {
    direction: Vec3,
    length: f32,
    valid: bool,
    entry: &'a CollisionEntry,
}

/// World-space shove resolving `entries`, and the sum of the normals used.
pub(crate) fn net_shove(entries: &[CollisionEntry], horizontal: bool) -> (Vec3, Vec3) {
    let mut shoves: Vec<Shove<'_>> = entries
        .iter()
        .filter_map(|entry| {
            let Some((surface, normal, interior)) = entry.all_in(&Mat4::IDENTITY) else {
                tracing::warn!(
                    from = ?entry.from_node(),
                    into = ?entry.into_node(),
                    "cannot shove: contact has no surface normal or interior point"
                );
                return None;
            };
            let length = (surface - interior).dot(normal);
            if length <= 0.0 {
                return None;
            }
            let direction = if horizontal {
                Vec3::new(normal.x, normal.y, 0.0).try_normalize()?
            } else {
                normal
            };
            Some(Shove {
                direction,
                length,
                valid: true,
                entry,
            })
        })
        .collect();

    for i in 0..shoves.len() {
        for j in 0..i {
            if !shoves[j].valid {
                continue;
            }
            let (a, b) = (&shoves[i], &shoves[j]);
            let redundant = a.direction.dot(b.direction) > SAME_DIRECTION || {
                let corner = is_convex_corner(a.entry, b.entry);
                if corner {
                    tracing::debug!(into = ?a.entry.into_node(), "convex corner, keeping the larger shove");
                }
                corner
            };
            if redundant {
                if shoves[j].length < shoves[i].length {
                    shoves[j].valid = false;
                } else {
                    shoves[i].valid = false;
                }
            }
        }
    }

    shoves
        .iter()
        .filter(|s| s.valid)
        .fold((Vec3::ZERO, Vec3::ZERO), |(shove, force), s| {
            (shove + s.direction * s.length, force + s.direction)
        })
}

/// Two polygons of one node, each behind the other's plane.
fn is_convex_corner(a: &CollisionEntry, b: &CollisionEntry) -> bool {
    if a.into_node() != b.into_node() {
        return false;
    }
    match (a.into_shape().kind(), b.into_shape().kind()) {
        (ShapeKind::Polygon(p1), ShapeKind::Polygon(p2)) => {
            p1.dist_to_plane(p2.median()) < 0.0 && p2.dist_to_plane(p1.median()) < 0.0
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collide::handler::shared;
    use crate::collide::{Shape, Traverser, TraverserConfig};
    use crate::ecs::components::{CollisionNode, Transform};
    use crate::ecs::hierarchy::{attach_child, world_position};
    use crate::math::Plane;

    fn scene() -> (hecs::World, hecs::Entity) {
        let mut world = hecs::World::new();
        let root = world.spawn((Transform::identity(),));
        (world, root)
    }

    fn add_node(world: &mut hecs::World, root: hecs::Entity, pos: Vec3, node: CollisionNode) -> hecs::Entity {
        let e = world.spawn((Transform::from_position(pos), node));
        attach_child(world, root, e).unwrap();
        e
    }

    #[test]
    fn test_push_out_of_floor() {
        let (mut world, root) = scene();
        let floor = Shape::plane(Plane::from_point_normal(Vec3::ZERO, Vec3::Z));
        add_node(&mut world, root, Vec3::ZERO, CollisionNode::new().with_shape(floor));
        let ball = add_node(
            &mut world,
            root,
            Vec3::new(0.0, 0.0, 0.75),
            CollisionNode::new().with_shape(Shape::sphere(Vec3::ZERO, 1.0)),
        );

        let pusher = shared(PusherHandler::default());
        pusher.borrow_mut().add_collider(ball, ball);
        let mut traverser = Traverser::new(TraverserConfig::default());
        traverser.add_collider(ball, pusher.clone());
        traverser.traverse(&mut world, root);

        let z = world_position(&world, ball).z;
        assert!((z - 1.0).abs() < 1e-4, "z = {z}");

        // Already clear: a second pass does not move it.
        traverser.traverse(&mut world, root);
        assert!((world_position(&world, ball).z - z).abs() < 1e-6);
    }

    #[test]
    fn test_parallel_walls_not_double_counted() {
        let (mut world, root) = scene();
        let wall = |x: f32| Shape::plane(Plane::from_point_normal(Vec3::new(x, 0.0, 0.0), -Vec3::X));
        add_node(&mut world, root, Vec3::ZERO, CollisionNode::new().with_shape(wall(1.0)));
        add_node(&mut world, root, Vec3::ZERO, CollisionNode::new().with_shape(wall(1.2)));
        let ball = add_node(
            &mut world,
            root,
            Vec3::new(0.5, 0.0, 0.0),
            CollisionNode::new().with_shape(Shape::sphere(Vec3::ZERO, 1.0)),
        );

        let pusher = shared(PusherHandler::default());
        pusher.borrow_mut().add_collider(ball, ball);
        let mut traverser = Traverser::default();
        traverser.add_collider(ball, pusher.clone());
        traverser.traverse(&mut world, root);

        // The deeper wall wins; the shallower one is not added on top.
        let x = world_position(&world, ball).x;
        assert!((x - 0.0).abs() < 1e-4, "x = {x}");
    }

    #[test]
    fn test_horizontal_drops_vertical() {
        let (mut world, root) = scene();
        let slope = Plane::from_point_normal(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0).normalize());
        add_node(&mut world, root, Vec3::ZERO, CollisionNode::new().with_shape(Shape::plane(slope)));
        let ball = add_node(
            &mut world,
            root,
            Vec3::ZERO,
            CollisionNode::new().with_shape(Shape::sphere(Vec3::ZERO, 1.0)),
        );

        let pusher = shared(PusherHandler::new(PusherConfig { horizontal: true }));
        pusher.borrow_mut().add_collider(ball, ball);
        let mut traverser = Traverser::default();
        traverser.add_collider(ball, pusher.clone());
        traverser.traverse(&mut world, root);

        let p = world_position(&world, ball);
        assert!(p.x > 0.9 && p.z.abs() < 1e-6, "p = {p}");
    }

    #[test]
    fn test_convex_corner_keeps_one_shove() {
        let front = Shape::polygon(&[
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, 1.0),
        ])
        .unwrap();
        let side = Shape::polygon(&[
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(1.0, 2.0, -1.0),
            Vec3::new(1.0, 2.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        ])
        .unwrap();
        let (ShapeKind::Polygon(f), ShapeKind::Polygon(s)) = (front.kind(), side.kind()) else {
            unreachable!()
        };
        // Behind each other's plane: a convex edge of a solid block.
        assert!(f.dist_to_plane(s.median()) < 0.0);
        assert!(s.dist_to_plane(f.median()) < 0.0);

        let (mut world, root) = scene();
        add_node(
            &mut world,
            root,
            Vec3::ZERO,
            CollisionNode::new().with_shape(front).with_shape(side),
        );
        let ball = add_node(
            &mut world,
            root,
            Vec3::new(1.3, -0.3, 0.0),
            CollisionNode::new().with_shape(Shape::sphere(Vec3::ZERO, 0.5)),
        );

        let pusher = shared(PusherHandler::default());
        pusher.borrow_mut().add_collider(ball, ball);
        let mut traverser = Traverser::default();
        traverser.add_collider(ball, pusher.clone());
        traverser.traverse(&mut world, root);

        let moved = world_position(&world, ball) - Vec3::new(1.3, -0.3, 0.0);
        // One axis-aligned shove, not the diagonal sum of both.
        assert!(moved.length() > 0.0);
        assert!(moved.x.abs() < 1e-5 || moved.y.abs() < 1e-5, "moved = {moved}");
    }

    #[test]
    fn test_unknown_collider_detaches_handler() {
        let (mut world, root) = scene();
        add_node(
            &mut world,
            root,
            Vec3::ZERO,
            CollisionNode::new().with_shape(Shape::sphere(Vec3::ZERO, 1.0)),
        );
        let ball = add_node(
            &mut world,
            root,
            Vec3::X,
            CollisionNode::new().with_shape(Shape::sphere(Vec3::ZERO, 1.0)),
        );

        let pusher = shared(PusherHandler::default());
        let mut traverser = Traverser::default();
        traverser.add_collider(ball, pusher.clone());
        traverser.traverse(&mut world, root);
        assert!(!traverser.has_collider(ball));
    }
}
