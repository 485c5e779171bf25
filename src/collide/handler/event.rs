//! Enter / again / exit events for colliding node pairs.

use std::collections::{BTreeMap, VecDeque};

use glam::{Mat4, Vec3};

use crate::collide::contact::CollisionEntry;
use crate::ecs::components::Name;
use crate::ecs::hierarchy;

use super::CollisionHandler;

/// Event name patterns. Each pattern that formats successfully fires one
/// event.
///
/// Pattern codes:
///
/// | code        | expands to                                          |
/// |-------------|-----------------------------------------------------|
/// | `%fn` `%in` | name of the from / into node                        |
/// | `%fs` `%is` | `t` if the from / into shape is tangible, else `i`  |
/// | `%ig`       | `c` (the into node is a collision node)             |
/// | `%(tag)fh`  | nothing; suppresses the event unless from has `tag` |
/// | `%(tag)fx`  | nothing; suppresses the event if from has `tag`     |
/// | `%(tag)ih`  | as `fh`, for the into node                          |
/// | `%(tag)ix`  | as `fx`, for the into node                          |
/// | `%(tag)ft`  | value of `tag` on the from node                     |
/// | `%(tag)it`  | value of `tag` on the into node                     |
///
/// Tags are looked up on the node and then its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventConfig {
    /// Fired the first traversal a pair collides. Default: `["%fn-into-%in"]`.
    pub in_patterns: Vec<String>,
    /// Fired every later traversal the pair still collides. Default:
    /// `["%fn-again-%in"]`.
    pub again_patterns: Vec<String>,
    /// Fired the first traversal the pair no longer collides. Default:
    /// `["%fn-out-%in"]`.
    pub out_patterns: Vec<String>,
}

impl EventConfig {
    /// No patterns: nothing fires.
    pub fn none() -> Self {
        Self {
            in_patterns: Vec::new(),
            again_patterns: Vec::new(),
            out_patterns: Vec::new(),
        }
    }

    pub fn with_in(mut self, pattern: impl Into<String>) -> Self {
        self.in_patterns.push(pattern.into());
        self
    }

    pub fn with_again(mut self, pattern: impl Into<String>) -> Self {
        self.again_patterns.push(pattern.into());
        self
    }

    pub fn with_out(mut self, pattern: impl Into<String>) -> Self {
        self.out_patterns.push(pattern.into());
        self
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self::none()
            .with_in("%fn-into-%in")
            .with_again("%fn-again-%in")
            .with_out("%fn-out-%in")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    In,
    Again,
    Out,
}

/// A fired event.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    pub name: String,
    pub kind: EventKind,
    pub from: hecs::Entity,
    pub into: hecs::Entity,
    /// Index of the into-shape within its node.
    pub into_index: usize,
    /// World-space surface point of the contact, when the test computed one.
    pub surface_point: Option<Vec3>,
    pub surface_normal: Option<Vec3>,
}

/// What we keep of an entry between traversals.
#[derive(Debug, Clone, Copy)]
struct Touch {
    from: hecs::Entity,
    into: hecs::Entity,
    into_index: usize,
    from_tangible: bool,
    into_tangible: bool,
    surface_point: Option<Vec3>,
    surface_normal: Option<Vec3>,
}

impl Touch {
    fn new(entry: &CollisionEntry) -> Self {
        Self {
            from: entry.from_node(),
            into: entry.into_node(),
            into_index: entry.into_side().index,
            from_tangible: entry.from_shape().is_tangible(),
            into_tangible: entry.into_shape().is_tangible(),
            surface_point: entry.surface_point_in(&Mat4::IDENTITY),
            surface_normal: entry.surface_normal_in(&Mat4::IDENTITY),
        }
    }
}

type PairKey = (u64, u64);

fn pair_key(entry: &CollisionEntry) -> PairKey {
    (entry.from_node().to_bits().get(), entry.into_node().to_bits().get())
}

/// Tracks which (from, into) node pairs collide and fires events as pairs
/// start colliding, keep colliding and stop colliding.
#[derive(Debug, Default)]
pub struct EventHandler {
    config: EventConfig,
    current: BTreeMap<PairKey, Touch>,
    last: BTreeMap<PairKey, Touch>,
    events: VecDeque<CollisionEvent>,
}

impl EventHandler {
    pub fn new(config: EventConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EventConfig {
        &mut self.config
    }

    /// Note a contact. Only the first entry per node pair counts.
    pub(crate) fn record(&mut self, entry: &CollisionEntry) {
        self.current
            .entry(pair_key(entry))
            .or_insert_with(|| Touch::new(entry));
    }

    /// Forget every pair without firing anything.
    pub fn clear(&mut self) {
        self.current.clear();
        self.last.clear();
    }

    /// Fire exit events for every pair still colliding and forget them.
    pub fn flush(&mut self, world: &hecs::World) {
        self.begin_group();
        self.fire_diff(world);
    }

    pub fn num_events(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.events.iter()
    }

    /// Take every fired event, oldest first.
    pub fn drain_events(&mut self) -> impl Iterator<Item = CollisionEvent> + '_ {
        self.events.drain(..)
    }

    /// Merge the sorted previous and current pair sets, firing `in` for
    /// pairs only in current, `again` for pairs in both and `out` for pairs
    /// only in previous.
    fn fire_diff(&mut self, world: &hecs::World) {
        let mut last = std::mem::take(&mut self.last).into_iter().peekable();
        let mut current = self.current.iter().peekable();
        let config = &self.config;
        let events = &mut self.events;

        loop {
            let (kind, touch) = match (last.peek(), current.peek()) {
                (None, None) => break,
                (Some(_), None) => match last.next() {
                    Some((_, touch)) => (EventKind::Out, touch),
                    None => break,
                },
                (None, Some(_)) => match current.next() {
                    Some((_, touch)) => (EventKind::In, *touch),
                    None => break,
                },
                (Some((lk, _)), Some((ck, _))) => match lk.cmp(*ck) {
                    std::cmp::Ordering::Less => match last.next() {
                        Some((_, touch)) => (EventKind::Out, touch),
                        None => break,
                    },
                    std::cmp::Ordering::Greater => match current.next() {
                        Some((_, touch)) => (EventKind::In, *touch),
                        None => break,
                    },
                    std::cmp::Ordering::Equal => {
                        last.next();
                        match current.next() {
                            Some((_, touch)) => (EventKind::Again, *touch),
                            None => break,
                        }
                    }
                },
            };

            let patterns = match kind {
                EventKind::In => &config.in_patterns,
                EventKind::Again => &config.again_patterns,
                EventKind::Out => &config.out_patterns,
            };
            for pattern in patterns {
                if let Some(name) = format_event(world, pattern, &touch) {
                    if name.is_empty() {
                        continue;
                    }
                    events.push_back(CollisionEvent {
                        name,
                        kind,
                        from: touch.from,
                        into: touch.into,
                        into_index: touch.into_index,
                        surface_point: touch.surface_point,
                        surface_normal: touch.surface_normal,
                    });
                }
            }
        }
    }
}

impl CollisionHandler for EventHandler {
    fn begin_group(&mut self) {
        self.last = std::mem::take(&mut self.current);
    }

    fn add_entry(&mut self, entry: CollisionEntry) {
        self.record(&entry);
    }

    fn end_group(&mut self, world: &mut hecs::World) -> bool {
        self.fire_diff(world);
        true
    }
}

fn node_name(world: &hecs::World, node: hecs::Entity) -> String {
    world
        .get::<&Name>(node)
        .map(|name| name.0.clone())
        .unwrap_or_default()
}

fn tangible_flag(tangible: bool) -> char {
    if tangible {
        't'
    } else {
        'i'
    }
}

/// Expand `pattern` for `touch`; `None` when a tag condition fails.
fn format_event(world: &hecs::World, pattern: &str, touch: &Touch) -> Option<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let tag: Option<String> = if chars.peek() == Some(&'(') {
            chars.next();
            Some(chars.by_ref().take_while(|&c| c != ')').collect())
        } else {
            None
        };
        let code: String = chars.by_ref().take(2).collect();

        match (tag.as_deref(), code.as_str()) {
            (None, "fn") => out.push_str(&node_name(world, touch.from)),
            (None, "in") => out.push_str(&node_name(world, touch.into)),
            (None, "fs") => out.push(tangible_flag(touch.from_tangible)),
            (None, "is") => out.push(tangible_flag(touch.into_tangible)),
            (None, "ig") => out.push('c'),
            (Some(tag), "fh") => {
                hierarchy::net_tag(world, touch.from, tag)?;
            }
            (Some(tag), "ih") => {
                hierarchy::net_tag(world, touch.into, tag)?;
            }
            (Some(tag), "fx") => {
                if hierarchy::net_tag(world, touch.from, tag).is_some() {
                    return None;
                }
            }
            (Some(tag), "ix") => {
                if hierarchy::net_tag(world, touch.into, tag).is_some() {
                    return None;
                }
            }
            (Some(tag), "ft") => {
                out.push_str(&hierarchy::net_tag(world, touch.from, tag).unwrap_or_default());
            }
            (Some(tag), "it") => {
                out.push_str(&hierarchy::net_tag(world, touch.into, tag).unwrap_or_default());
            }
            (tag, code) => {
                tracing::warn!(pattern, code, ?tag, "unrecognized event pattern code");
                out.push('%');
                if let Some(tag) = tag {
                    out.push('(');
                    out.push_str(tag);
                    out.push(')');
                }
                out.push_str(code);
            }
        }
    }
    Some(out)
}
