use bevy::prelude::*;

/// Root of a loaded scene. Entities belong to the nearest ancestor carrying
/// this marker; entities with none belong to the unnamed world scene.
#[derive(Component, Reflect, Default, Debug, Clone, Copy)]
#[reflect(Component, Default)]
pub struct EditorScene;

/// Marks a library/template asset instance. Fields on such entities (or their
/// descendants) are never picked from the scene.
#[derive(Component, Reflect, Default, Debug, Clone, Copy)]
#[reflect(Component, Default)]
pub struct TemplateAsset;

/// Set while a sub-scene is edited in isolation (e.g. a template opened on
/// its own). Candidates are then searched under `roots` only.
#[derive(Resource, Default, Debug, Clone)]
pub struct IsolatedEditing {
    pub roots: Vec<Entity>,
}

/// Where candidates for a pick are searched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchScope {
    /// The given roots and their descendants.
    Isolated(Vec<Entity>),
    /// Every entity of one scene. `None` is the unnamed world scene.
    Scene(Option<Entity>),
}

pub fn owning_scene(world: &World, entity: Entity) -> Option<Entity> {
    let mut current = entity;
    loop {
        if world.get::<EditorScene>(current).is_some() {
            return Some(current);
        }
        current = world.get::<ChildOf>(current)?.parent();
    }
}

/// Scope for a pick started from a field on `source`.
pub fn search_scope(world: &World, source: Entity) -> SearchScope {
    match world.get_resource::<IsolatedEditing>() {
        Some(isolated) if !isolated.roots.is_empty() => SearchScope::Isolated(isolated.roots.clone()),
        _ => SearchScope::Scene(owning_scene(world, source)),
    }
}

pub fn is_template(world: &World, entity: Entity) -> bool {
    let mut current = entity;
    loop {
        if world.get::<TemplateAsset>(current).is_some() {
            return true;
        }
        match world.get::<ChildOf>(current) {
            Some(child_of) => current = child_of.parent(),
            None => return false,
        }
    }
}
