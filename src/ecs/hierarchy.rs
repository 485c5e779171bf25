//! Scene-graph queries over the Parent/Children hierarchy.
//!
//! Net transforms are composed from the local [`Transform`]s on demand, so
//! they stay correct while handlers move nodes in the middle of a frame.

use glam::{Mat4, Vec3};

use crate::ecs::components::transform::{Children, Parent, PrevTransform, Tags, Transform};

/// Make `child` a child of `parent`, detaching it from any previous parent.
pub fn attach_child(
    world: &mut hecs::World,
    parent: hecs::Entity,
    child: hecs::Entity,
) -> Result<(), hecs::NoSuchEntity> {
    if !world.contains(parent) {
        return Err(hecs::NoSuchEntity);
    }
    if let Some(old) = parent_of(world, child) {
        if let Ok(mut children) = world.get::<&mut Children>(old) {
            children.0.retain(|&c| c != child);
        }
    }
    world.insert_one(child, Parent(parent))?;

    let has_children = world.satisfies::<&Children>(parent).unwrap_or(false);
    if has_children {
        if let Ok(mut children) = world.get::<&mut Children>(parent) {
            children.0.push(child);
        }
    } else {
        world.insert_one(parent, Children(vec![child]))?;
    }
    Ok(())
}

pub fn parent_of(world: &hecs::World, entity: hecs::Entity) -> Option<hecs::Entity> {
    world.get::<&Parent>(entity).ok().map(|p| p.0)
}

pub fn children_of(world: &hecs::World, entity: hecs::Entity) -> Vec<hecs::Entity> {
    world
        .get::<&Children>(entity)
        .map(|c| c.0.clone())
        .unwrap_or_default()
}

/// The entity's local matrix; identity when it has no [`Transform`].
pub fn local_matrix(world: &hecs::World, entity: hecs::Entity) -> Mat4 {
    world
        .get::<&Transform>(entity)
        .map(|t| t.to_matrix())
        .unwrap_or(Mat4::IDENTITY)
}

/// The entity's previous-frame local matrix, falling back to the current one.
pub fn local_prev_matrix(world: &hecs::World, entity: hecs::Entity) -> Mat4 {
    match world.get::<&PrevTransform>(entity) {
        Ok(prev) => prev.0.to_matrix(),
        Err(_) => local_matrix(world, entity),
    }
}

fn compose_up(world: &hecs::World, entity: hecs::Entity, local: fn(&hecs::World, hecs::Entity) -> Mat4) -> Mat4 {
    let mut net = local(world, entity);
    let mut node = entity;
    while let Some(parent) = parent_of(world, node) {
        net = local(world, parent) * net;
        node = parent;
    }
    net
}

/// World-space transform of `entity`.
pub fn net_transform(world: &hecs::World, entity: hecs::Entity) -> Mat4 {
    compose_up(world, entity, local_matrix)
}

/// World-space transform of `entity` as of the previous frame.
pub fn net_prev_transform(world: &hecs::World, entity: hecs::Entity) -> Mat4 {
    compose_up(world, entity, local_prev_matrix)
}

/// True when `ancestor` is `entity` or lies on its parent chain.
pub fn is_descendant_or_self(world: &hecs::World, entity: hecs::Entity, ancestor: hecs::Entity) -> bool {
    let mut node = Some(entity);
    while let Some(current) = node {
        if current == ancestor {
            return true;
        }
        node = parent_of(world, current);
    }
    false
}

pub fn world_position(world: &hecs::World, entity: hecs::Entity) -> Vec3 {
    net_transform(world, entity).w_axis.truncate()
}

/// Move `entity` by `delta`, given in world space. Returns false when the
/// entity has no [`Transform`] to move.
pub fn translate_world(world: &mut hecs::World, entity: hecs::Entity, delta: Vec3) -> bool {
    let local_delta = match parent_of(world, entity) {
        Some(parent) => net_transform(world, parent).inverse().transform_vector3(delta),
        None => delta,
    };
    match world.get::<&mut Transform>(entity) {
        Ok(mut transform) => {
            transform.position += local_delta;
            true
        }
        Err(_) => false,
    }
}

/// Tag value on `entity` or its nearest tagged ancestor.
pub fn net_tag(world: &hecs::World, entity: hecs::Entity, key: &str) -> Option<String> {
    let mut node = Some(entity);
    while let Some(current) = node {
        if let Ok(tags) = world.get::<&Tags>(current) {
            if let Some(value) = tags.get(key) {
                return Some(value.to_owned());
            }
        }
        node = parent_of(world, current);
    }
    None
}
