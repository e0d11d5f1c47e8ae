use bevy::prelude::*;
use num_bigint::BigUint;

use crate::pick_field::PickedObject;

/// Children per node assumed when encoding hierarchy order.
pub const MAX_CHILDREN: u32 = 100;
/// Hierarchy depth assumed when encoding hierarchy order.
pub const MAX_DEPTH: usize = 100;

const RADIX: u32 = MAX_CHILDREN + 1;

/// A scene object offered to the field being picked.
///
/// Candidates hold no ownership: if the object or its anchor is despawned
/// while picking, the candidate stops being valid and is skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub object: PickedObject,
    /// Entity whose transform positions the candidate on screen.
    pub anchor: Entity,
    pub hierarchy_order: BigUint,
    /// Name of the anchor.
    pub name: String,
    /// `Root/Parent/Anchor (Type Name)`, shown in the disambiguation menu.
    pub display_label: String,
}

impl Candidate {
    pub fn new(
        world: &World,
        object: PickedObject,
        anchor: Entity,
        hierarchy_order: BigUint,
        type_name: &str,
    ) -> Self {
        Self {
            object,
            anchor,
            hierarchy_order,
            name: entity_name(world, anchor),
            display_label: format!(
                "{} ({})",
                hierarchy_path(world, anchor),
                nicify_type_name(type_name)
            ),
        }
    }

    /// Build a candidate without looking anything up in a world.
    pub fn from_parts(
        object: PickedObject,
        anchor: Entity,
        hierarchy_order: impl Into<BigUint>,
        name: impl Into<String>,
        display_label: impl Into<String>,
    ) -> Self {
        Self {
            object,
            anchor,
            hierarchy_order: hierarchy_order.into(),
            name: name.into(),
            display_label: display_label.into(),
        }
    }

    /// Live position of the anchor. Never cached, so moving objects can be tracked.
    pub fn world_position(&self, world: &World) -> Option<Vec3> {
        world
            .get::<GlobalTransform>(self.anchor)
            .map(GlobalTransform::translation)
    }

    pub fn is_valid(&self, world: &World) -> bool {
        let Ok(object) = world.get_entity(self.object.entity) else {
            return false;
        };
        let component_present = self.object.component.is_none_or(|type_id| {
            world
                .components()
                .get_id(type_id)
                .is_some_and(|id| object.contains_id(id))
        });
        component_present && self.world_position(world).is_some()
    }
}

pub fn entity_name(world: &World, entity: Entity) -> String {
    world
        .get::<Name>(entity)
        .map_or_else(|| format!("{entity}"), |name| name.as_str().to_string())
}

/// Names from the root down to `entity`, joined with `/`.
pub fn hierarchy_path(world: &World, entity: Entity) -> String {
    let mut names = vec![entity_name(world, entity)];
    let mut current = entity;
    while let Some(child_of) = world.get::<ChildOf>(current) {
        current = child_of.parent();
        names.push(entity_name(world, current));
    }
    names.reverse();
    names.join("/")
}

/// Depth-first, sibling-ordered position of `entity` as a single integer.
///
/// Every node contributes `(sibling index + 1) * RADIX^(MAX_DEPTH - depth)`.
/// `roots` are the top-level nodes in sibling order; an entity listed there is
/// treated as a root even if it has a parent.
pub fn hierarchy_order(world: &World, entity: Entity, roots: &[Entity]) -> BigUint {
    let mut chain = vec![entity];
    let mut current = entity;
    while !roots.contains(&current) {
        let Some(child_of) = world.get::<ChildOf>(current) else {
            break;
        };
        current = child_of.parent();
        chain.push(current);
    }

    let depth = chain.len() - 1;
    let radix = BigUint::from(RADIX);
    let mut order = BigUint::default();
    for (steps_up, node) in chain.into_iter().enumerate() {
        let node_depth = depth - steps_up;
        let exponent = MAX_DEPTH.saturating_sub(node_depth) as u32;
        let slot = sibling_index(world, node, roots) as u64 + 1;
        order += BigUint::from(slot) * radix.pow(exponent);
    }
    order
}

fn sibling_index(world: &World, entity: Entity, roots: &[Entity]) -> usize {
    if let Some(index) = roots.iter().position(|&root| root == entity) {
        return index;
    }
    world
        .get::<ChildOf>(entity)
        .and_then(|child_of| world.get::<Children>(child_of.parent()))
        .and_then(|children| children.iter().position(|child| child == entity))
        .unwrap_or(0)
}

/// `PointLight` -> `Point Light`, `HTMLButton` -> `HTML Button`, `m_target` -> `Target`.
pub fn nicify_type_name(name: &str) -> String {
    let trimmed = name
        .strip_prefix("m_")
        .or_else(|| name.strip_prefix('_'))
        .unwrap_or(name);
    let chars: Vec<char> = trimmed.chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            if !out.ends_with(' ') && !out.is_empty() {
                out.push(' ');
            }
            continue;
        }
        if i > 0 && c.is_uppercase() && !out.ends_with(' ') {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push(' ');
            }
        }
        if out.is_empty() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
