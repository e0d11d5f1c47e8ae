pub mod callback;
pub mod candidate;
pub mod candidate_index;
pub mod commands;
pub mod error;
pub mod field;
pub mod field_drawer;
pub mod pick_field;
pub mod property_path;
pub mod proximity;
pub mod scene_gui;
pub mod scope;
pub mod session;
mod viewport_util;

use std::time::Duration;

use bevy::{
    prelude::*,
    reflect::{GetTypeRegistration, TypePath},
};
use picker_widgets::PickerWidgetsPlugin;

pub use callback::{IntoPickCallback, PickCallback, PickCallbacks, PickParam};
pub use candidate::Candidate;
pub use error::{CallbackError, CastError, PickError, ResolutionError};
pub use field::FieldHandle;
pub use pick_field::{Capability, CapabilityRef, ComponentRef, PickField, PickTarget, PickedObject, ReflectPickField};
pub use property_path::PropertyPath;
pub use scope::{EditorScene, IsolatedEditing, TemplateAsset};
pub use session::{PickRequest, PickSession};

/// Editor-owned entity (cameras, gizmos, UI). Never offered as a candidate.
#[derive(Component, Default)]
pub struct EditorEntity;

/// The camera rendering the scene that objects are picked from.
#[derive(Component, Default)]
pub struct PickCamera;

/// UI node displaying the [`PickCamera`] output. Without one, the camera is
/// assumed to fill the window.
#[derive(Component, Default)]
pub struct PickViewport;

#[derive(Resource, Reflect, Debug, Clone)]
#[reflect(Resource)]
pub struct PickerSettings {
    /// Screen-space radius around the best candidate in which other candidates count as nearby.
    pub group_distance: f32,
    /// How much the depth axis counts in screen-space distances.
    pub depth_weight: f32,
    /// Distance along the cursor ray where the leader line ends.
    pub leader_ray_distance: f32,
    pub leader_dash_length: f32,
    pub leader_color: Color,
    /// Vertical offset of the candidate label above the cursor (pixels).
    pub label_offset: f32,
    /// Width of the pick toggle next to a field (pixels).
    pub button_width: f32,
    pub button_spacing: f32,
    /// How long the one-time usage hint stays on screen.
    pub hint_duration: Duration,
    /// Whether Ctrl+Z / Ctrl+Shift+Z undo and redo picks.
    pub undo_shortcuts: bool,
}

impl Default for PickerSettings {
    fn default() -> Self {
        Self {
            group_distance: 25.0,
            depth_weight: 0.1,
            leader_ray_distance: 10.0,
            leader_dash_length: 0.1,
            leader_color: Color::srgba(1.0, 1.0, 1.0, 0.75),
            label_offset: 10.0,
            button_width: 18.0,
            button_spacing: 4.0,
            hint_duration: Duration::from_secs(3),
            undo_shortcuts: true,
        }
    }
}

/// Triggered after a picked object has been written into a field.
#[derive(Event, Debug, Clone)]
pub struct FieldPicked {
    pub field: FieldHandle,
    pub previous: Option<PickedObject>,
    pub current: Option<PickedObject>,
}

pub struct ScenePickerPlugin;

impl Plugin for ScenePickerPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<PickerWidgetsPlugin>() {
            app.add_plugins(PickerWidgetsPlugin);
        }
        app.add_plugins((
            commands::CommandHistoryPlugin,
            scene_gui::SceneGuiPlugin,
            field_drawer::FieldDrawerPlugin,
        ))
        .init_resource::<PickerSettings>()
        .init_resource::<PickSession>()
        .init_resource::<PickCallbacks>()
        .register_type::<PickerSettings>()
        .register_type::<EditorScene>()
        .register_type::<TemplateAsset>()
        .register_pick_field::<Entity>()
        .register_pick_field::<Option<Entity>>();
    }
}

pub trait PickerAppExt {
    /// Register `callback` under `name` for fields declared on `Owner`.
    fn register_pick_callback<Owner, M>(
        &mut self,
        name: impl Into<String>,
        callback: impl IntoPickCallback<Owner, M>,
    ) -> &mut Self
    where
        Owner: Reflect + TypePath;

    /// Make `ComponentRef<T>` fields pickable.
    fn register_pick_component<T>(&mut self) -> &mut Self
    where
        T: Component + TypePath,
        ComponentRef<T>: GetTypeRegistration;

    /// Make `CapabilityRef<C>` fields pickable.
    fn register_pick_capability<C>(&mut self) -> &mut Self
    where
        C: Capability,
        CapabilityRef<C>: GetTypeRegistration;

    fn register_pick_field<T>(&mut self) -> &mut Self
    where
        T: PickField + Reflect + TypePath + GetTypeRegistration;
}

impl PickerAppExt for App {
    fn register_pick_callback<Owner, M>(
        &mut self,
        name: impl Into<String>,
        callback: impl IntoPickCallback<Owner, M>,
    ) -> &mut Self
    where
        Owner: Reflect + TypePath,
    {
        self.world_mut()
            .get_resource_or_init::<PickCallbacks>()
            .register(name, callback);
        self
    }

    fn register_pick_component<T>(&mut self) -> &mut Self
    where
        T: Component + TypePath,
        ComponentRef<T>: GetTypeRegistration,
    {
        self.register_pick_field::<ComponentRef<T>>()
    }

    fn register_pick_capability<C>(&mut self) -> &mut Self
    where
        C: Capability,
        CapabilityRef<C>: GetTypeRegistration,
    {
        self.register_pick_field::<CapabilityRef<C>>()
    }

    fn register_pick_field<T>(&mut self) -> &mut Self
    where
        T: PickField + Reflect + TypePath + GetTypeRegistration,
    {
        self.register_type::<T>()
            .register_type_data::<T, ReflectPickField>()
    }
}
