use bevy::prelude::*;

use crate::{
    PickerSettings,
    field::{FieldHandle, describe_picked},
    pick_field::PickedObject,
};

pub struct CommandHistoryPlugin;

impl Plugin for CommandHistoryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CommandHistory>()
            .add_systems(Update, handle_undo_redo_keys);
    }
}

// ---------------------------------------------------------------------------
// EditorCommand trait
// ---------------------------------------------------------------------------

pub trait EditorCommand: Send + Sync + 'static {
    fn execute(&self, world: &mut World);
    fn undo(&self, world: &mut World);
    fn description(&self) -> &str;
}

// ---------------------------------------------------------------------------
// CommandHistory resource
// ---------------------------------------------------------------------------

#[derive(Resource, Default)]
pub struct CommandHistory {
    pub undo_stack: Vec<Box<dyn EditorCommand>>,
    pub redo_stack: Vec<Box<dyn EditorCommand>>,
}

impl CommandHistory {
    /// Push a command whose effect has already been applied.
    pub fn record(&mut self, command: Box<dyn EditorCommand>) {
        self.undo_stack.push(command);
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

/// Apply `command` and push it onto the undo stack.
pub fn execute_command(world: &mut World, command: Box<dyn EditorCommand>) {
    command.execute(world);
    world.resource_mut::<CommandHistory>().record(command);
}

/// Undo the most recent command. Returns `false` if there was nothing to undo.
pub fn undo(world: &mut World) -> bool {
    // Take ownership to avoid borrow conflict with world
    let Some(command) = world.resource_mut::<CommandHistory>().undo_stack.pop() else {
        return false;
    };
    command.undo(world);
    world.resource_mut::<CommandHistory>().redo_stack.push(command);
    true
}

pub fn redo(world: &mut World) -> bool {
    let Some(command) = world.resource_mut::<CommandHistory>().redo_stack.pop() else {
        return false;
    };
    command.execute(world);
    world.resource_mut::<CommandHistory>().undo_stack.push(command);
    true
}

// ---------------------------------------------------------------------------
// SetPickedField
// ---------------------------------------------------------------------------

/// A picked object written into a field.
pub struct SetPickedField {
    pub field: FieldHandle,
    pub previous: Option<PickedObject>,
    pub current: Option<PickedObject>,
}

impl SetPickedField {
    fn apply(&self, world: &mut World, value: Option<PickedObject>) {
        if let Err(err) = self.field.assign(world, value) {
            warn!(
                "Failed to restore `{}` on {} to {}: {err}",
                self.field.path,
                self.field.entity,
                describe_picked(world, value)
            );
        }
    }
}

impl EditorCommand for SetPickedField {
    fn execute(&self, world: &mut World) {
        self.apply(world, self.current);
    }

    fn undo(&self, world: &mut World) {
        self.apply(world, self.previous);
    }

    fn description(&self) -> &str {
        "Pick object"
    }
}

// ---------------------------------------------------------------------------
// Keyboard shortcut system
// ---------------------------------------------------------------------------

fn handle_undo_redo_keys(world: &mut World) {
    if !world
        .get_resource::<PickerSettings>()
        .is_some_and(|settings| settings.undo_shortcuts)
    {
        return;
    }
    let Some(keyboard) = world.get_resource::<ButtonInput<KeyCode>>() else {
        return;
    };
    let ctrl = keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]);
    let shift = keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let z_pressed = keyboard.just_pressed(KeyCode::KeyZ);

    if !ctrl || !z_pressed {
        return;
    }

    if shift {
        redo(world);
    } else {
        undo(world);
    }
}
