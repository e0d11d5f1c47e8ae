use bevy::{ecs::reflect::AppTypeRegistry, prelude::*};

use crate::{
    EditorEntity,
    candidate::{Candidate, hierarchy_order},
    pick_field::{PickTarget, PickedObject},
    scope::{EditorScene, SearchScope, owning_scene},
};

/// Collect every object in `scope` that a field of `target` kind accepts.
///
/// Candidates come out in depth-first, sibling order so repeated builds over
/// an unchanged scene are identical. Editor-owned entities and their
/// descendants are never offered, nor are entities without a positioned
/// ancestor-or-self.
pub fn build_candidates(world: &mut World, target: &PickTarget, scope: &SearchScope) -> Vec<Candidate> {
    let roots = scope_roots(world, scope);
    let registry = world.resource::<AppTypeRegistry>().clone();
    let registry = registry.read();
    let world: &World = world;

    let mut candidates = Vec::new();
    let mut stack: Vec<Entity> = roots.iter().rev().copied().collect();
    while let Some(entity) = stack.pop() {
        if world.get::<EditorEntity>(entity).is_some() {
            continue;
        }
        if let Some(children) = world.get::<Children>(entity) {
            stack.extend(children.iter().rev());
        }
        if let SearchScope::Scene(scene) = scope {
            if owning_scene(world, entity) != *scene {
                continue;
            }
        }
        let Some(anchor) = find_anchor(world, entity) else {
            continue;
        };

        let objects: Vec<(PickedObject, &'static str)> = match target {
            PickTarget::Node => vec![(PickedObject::node(entity), target.type_name())],
            PickTarget::Component { type_id, .. } => world
                .components()
                .get_id(*type_id)
                .filter(|&id| world.entity(entity).contains_id(id))
                .map(|_| (PickedObject::component(entity, *type_id), target.type_name()))
                .into_iter()
                .collect(),
            PickTarget::Capability { data, .. } => {
                let Ok(components) = world.inspect_entity(entity) else {
                    continue;
                };
                components
                    .filter_map(|info| info.type_id())
                    .filter_map(|type_id| registry.get(type_id))
                    .filter(|registration| registration.data_by_id(*data).is_some())
                    .map(|registration| {
                        (
                            PickedObject::component(entity, registration.type_id()),
                            registration.type_info().type_path_table().short_path(),
                        )
                    })
                    .collect()
            }
        };
        if objects.is_empty() {
            continue;
        }

        let order = hierarchy_order(world, entity, &roots);
        for (object, type_name) in objects {
            candidates.push(Candidate::new(world, object, anchor, order.clone(), type_name));
        }
    }
    candidates
}

/// Top-level nodes of `scope`, in sibling order.
pub fn scope_roots(world: &mut World, scope: &SearchScope) -> Vec<Entity> {
    match scope {
        SearchScope::Isolated(roots) => roots.clone(),
        SearchScope::Scene(Some(scene)) => world
            .get::<Children>(*scene)
            .map(|children| children.iter().collect())
            .unwrap_or_default(),
        SearchScope::Scene(None) => {
            let mut roots: Vec<Entity> = world
                .query_filtered::<Entity, (Without<ChildOf>, Without<EditorScene>, Without<EditorEntity>)>()
                .iter(world)
                .collect();
            roots.sort();
            roots
        }
    }
}

/// The entity itself if it is positioned, else its nearest positioned ancestor.
pub fn find_anchor(world: &World, entity: Entity) -> Option<Entity> {
    let mut current = entity;
    loop {
        if world.get::<GlobalTransform>(current).is_some() {
            return Some(current);
        }
        current = world.get::<ChildOf>(current)?.parent();
    }
}

/// Whether `candidate` is still present and still has what `target` asks for.
pub fn still_matches(world: &World, candidate: &Candidate, target: &PickTarget) -> bool {
    if !candidate.is_valid(world) {
        return false;
    }
    match (target, candidate.object.component) {
        (PickTarget::Node, _) => true,
        (PickTarget::Component { type_id, .. }, Some(component)) => *type_id == component,
        (PickTarget::Capability { data, .. }, Some(component)) => world
            .resource::<AppTypeRegistry>()
            .read()
            .get(component)
            .is_some_and(|registration| registration.data_by_id(*data).is_some()),
        (_, None) => false,
    }
}
