//! The single in-progress pick.
//!
//! At most one field is picked at a time; starting a pick on another field
//! ends the current one. All state lives in the [`PickSession`] resource and
//! is dropped in full by [`stop_picking`].

use bevy::prelude::*;
use picker_widgets::{icons::IconFont, toast::toast};

use crate::{
    EditorEntity, FieldPicked, PickerSettings,
    callback::dispatch_named_callback,
    candidate::Candidate,
    candidate_index::{build_candidates, still_matches},
    commands::{CommandHistory, SetPickedField},
    error::{PickError, ResolutionError},
    field::FieldHandle,
    field_drawer::acknowledge_field_value,
    pick_field::{FieldShape, PickTarget, PickedObject},
    proximity::Proximity,
    scope::search_scope,
};

pub const HINT_TEXT: &str = "Left click: Pick an object in scene\n\n\
    Middle click: Choose from nearby objects\n\n\
    Right click: Cancel";

#[derive(Resource, Default)]
pub struct PickSession {
    active: Option<ActivePick>,
    hint_shown: bool,
}

impl PickSession {
    pub fn active(&self) -> Option<&ActivePick> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActivePick> {
        self.active.as_mut()
    }

    pub fn is_picking(&self, field: &FieldHandle) -> bool {
        self.active.as_ref().is_some_and(|active| active.field == *field)
    }

    pub fn hint_shown(&self) -> bool {
        self.hint_shown
    }
}

/// Run condition: a pick is in progress.
pub fn picking_active(session: Res<PickSession>) -> bool {
    session.active.is_some()
}

pub struct ActivePick {
    pub field: FieldHandle,
    pub target: PickTarget,
    pub callback: Option<String>,
    /// Every object the field accepts, collected once when picking starts.
    pub candidates: Vec<Candidate>,
    pub proximity: Proximity,
    /// Cursor over the scene view, `None` while it is elsewhere.
    pub pointer: Option<PickPointer>,
    pub menu: Option<Entity>,
    /// Candidates listed by the open menu, in entry order.
    pub menu_entries: Vec<Candidate>,
    pub label: Option<Entity>,
}

impl ActivePick {
    pub fn best(&self) -> Option<&Candidate> {
        self.proximity.best.and_then(|index| self.candidates.get(index))
    }

    pub fn nearby(&self) -> impl Iterator<Item = &Candidate> {
        self.proximity
            .nearby
            .iter()
            .filter_map(|&index| self.candidates.get(index))
    }

    pub fn nearby_count(&self) -> usize {
        self.proximity.nearby.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickPointer {
    /// Logical window coordinates.
    pub window: Vec2,
    /// Camera viewport coordinates.
    pub viewport: Vec2,
}

/// What to pick into.
#[derive(Clone, Debug)]
pub struct PickRequest {
    pub field: FieldHandle,
    /// Kind of object accepted. Read from the field's type when `None`.
    pub target: Option<PickTarget>,
    /// Callback fired on commit. Read from the field's attribute when `None`.
    pub callback: Option<String>,
}

impl PickRequest {
    pub fn new(field: FieldHandle) -> Self {
        Self {
            field,
            target: None,
            callback: None,
        }
    }

    pub fn with_target(mut self, target: PickTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }
}

pub fn start_picking(world: &mut World, request: PickRequest) -> Result<(), PickError> {
    stop_picking(world);

    let PickRequest {
        field,
        target,
        callback,
    } = request;
    let target = match target {
        Some(target) => target,
        None => match field.shape(world)? {
            Some(FieldShape::Single(target)) => target,
            _ => {
                return Err(ResolutionError::NotPickable {
                    path: field.path.to_string(),
                }
                .into());
            }
        },
    };
    let callback = match callback {
        Some(callback) => Some(callback),
        None => field.callback_name(world)?,
    };

    let scope = search_scope(world, field.entity);
    let candidates = build_candidates(world, &target, &scope);
    debug!(
        "Picking `{}` on {}: {} candidate(s) for {}",
        field.path,
        field.entity,
        candidates.len(),
        target.type_name()
    );

    show_hint_once(world);

    world.resource_mut::<PickSession>().active = Some(ActivePick {
        field,
        target,
        callback,
        candidates,
        proximity: Proximity::default(),
        pointer: None,
        menu: None,
        menu_entries: Vec::new(),
        label: None,
    });
    Ok(())
}

fn show_hint_once(world: &mut World) {
    if world.resource::<PickSession>().hint_shown {
        return;
    }
    world.resource_mut::<PickSession>().hint_shown = true;
    let duration = world
        .get_resource::<PickerSettings>()
        .map(|settings| settings.hint_duration)
        .unwrap_or_default();
    let icon_font = world.get_resource::<IconFont>().cloned();
    world.spawn((toast(HINT_TEXT, duration, icon_font.as_ref()), EditorEntity));
}

/// End the current pick. Returns `false` if nothing was being picked.
pub fn stop_picking(world: &mut World) -> bool {
    let Some(active) = world.resource_mut::<PickSession>().active.take() else {
        return false;
    };
    for entity in [active.label, active.menu].into_iter().flatten() {
        if let Ok(entity) = world.get_entity_mut(entity) {
            entity.despawn();
        }
    }
    debug!("Stopped picking `{}` on {}", active.field.path, active.field.entity);
    true
}

/// Write `candidate` into the field being picked, record it for undo, fire
/// the callback and end the pick.
///
/// Returns `Ok(false)` without ending the pick if the candidate is no longer
/// valid. A field that cannot be resolved ends the pick.
pub fn commit_candidate(world: &mut World, candidate: &Candidate) -> Result<bool, PickError> {
    let (field, target, callback) = {
        let session = world.resource::<PickSession>();
        let active = session.active.as_ref().ok_or(PickError::NotPicking)?;
        (active.field.clone(), active.target, active.callback.clone())
    };
    if !still_matches(world, candidate, &target) {
        return Ok(false);
    }

    let change = match field.assign(world, Some(candidate.object)) {
        Ok(change) => change,
        Err(err) => {
            warn!(
                "Failed to assign picked {} to `{}` on {}: {err}",
                candidate.name, field.path, field.entity
            );
            stop_picking(world);
            return Err(err);
        }
    };

    if let Some(mut history) = world.get_resource_mut::<CommandHistory>() {
        history.record(Box::new(SetPickedField {
            field: field.clone(),
            previous: change.previous,
            current: change.current,
        }));
    }
    if let Some(name) = &callback {
        dispatch_named_callback(world, &field, name, change.previous, change.current);
    }
    acknowledge_field_value(world, &field, change.current);
    world.trigger(FieldPicked {
        field,
        previous: change.previous,
        current: change.current,
    });
    stop_picking(world);
    Ok(true)
}

/// Fire the active pick's callback for a value assigned by other means.
pub fn fire_pick_callback(
    world: &mut World,
    previous: Option<PickedObject>,
    current: Option<PickedObject>,
) -> Result<(), PickError> {
    let (field, callback) = {
        let session = world.resource::<PickSession>();
        let active = session.active.as_ref().ok_or(PickError::NotPicking)?;
        (active.field.clone(), active.callback.clone())
    };
    if let Some(name) = callback {
        dispatch_named_callback(world, &field, &name, previous, current);
    }
    Ok(())
}
