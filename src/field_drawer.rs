//! Inspector rows for fields that hold scene references.
//!
//! A pickable field gets a toggle button next to it that starts or stops
//! picking. Fields that cannot be picked, or that live on a template, are drawn
//! the normal way.

use std::sync::Arc;

use bevy::prelude::*;
use picker_widgets::{
    icons::{Icon, IconFont, icon_colored},
    tokens,
};

use crate::{
    PickerSettings,
    callback::dispatch_field_callback,
    commands::{CommandHistory, SetPickedField},
    error::ResolutionError,
    field::{FieldHandle, describe_picked},
    pick_field::{FieldShape, PickedObject},
    scope::is_template,
    session::{PickRequest, PickSession, start_picking, stop_picking},
};

pub struct FieldDrawerPlugin;

impl Plugin for FieldDrawerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (watch_pickable_fields, sync_pick_toggles).chain());
    }
}

/// Draws the value part of a field row in place of the default value text.
/// Receives the container to fill, the field and its label.
#[derive(Clone)]
pub struct FieldDrawer(pub Arc<dyn Fn(&mut World, Entity, &FieldHandle, &str) + Send + Sync>);

impl FieldDrawer {
    pub fn new(draw: impl Fn(&mut World, Entity, &FieldHandle, &str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(draw))
    }
}

/// The button that toggles picking for `field`.
#[derive(Component)]
pub struct PickToggle {
    pub field: FieldHandle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickToggleState {
    Idle,
    /// Another field is being picked. Drawn like `Idle`.
    OtherFieldActive,
    Active,
}

impl PickToggleState {
    pub fn of(session: &PickSession, field: &FieldHandle) -> Self {
        match session.active() {
            None => Self::Idle,
            Some(active) if active.field == *field => Self::Active,
            Some(_) => Self::OtherFieldActive,
        }
    }

    fn color(self) -> Color {
        match self {
            Self::Active => tokens::TEXT_ACCENT,
            Self::Idle | Self::OtherFieldActive => tokens::TEXT_MUTED,
        }
    }
}

/// Last value shown for `field`. A different value in the component means it
/// was edited by something other than the picker.
#[derive(Component, Debug)]
pub struct FieldWatch {
    pub field: FieldHandle,
    pub last: Option<PickedObject>,
}

/// Text showing the current value of a watched field.
#[derive(Component)]
pub struct FieldValueText;

/// Draw `field` under `parent`. Collections get one row per element.
/// Returns the row (or the collection container).
pub fn spawn_pickable_field(
    world: &mut World,
    parent: Entity,
    field: FieldHandle,
    label: &str,
    drawer: Option<&FieldDrawer>,
) -> Entity {
    let shape = field.shape(world).unwrap_or_else(|err| {
        warn!("Failed to inspect `{}` on {}: {err}", field.path, field.entity);
        None
    });
    let pickable = shape.is_some() && !is_template(world, field.entity);

    match shape {
        Some(FieldShape::Collection(_)) if pickable => {
            let container = world
                .spawn((
                    Node {
                        flex_direction: FlexDirection::Column,
                        row_gap: px(tokens::SPACING_XS),
                        ..default()
                    },
                    ChildOf(parent),
                ))
                .id();
            spawn_label(world, container, label);
            let count = field.element_count(world).ok().flatten().unwrap_or(0);
            for index in 0..count {
                spawn_pickable_row(
                    world,
                    container,
                    field.element(index),
                    &format!("Element {index}"),
                    drawer,
                );
            }
            container
        }
        Some(FieldShape::Single(_)) if pickable => spawn_pickable_row(world, parent, field, label, drawer),
        _ => {
            let row = spawn_row(world, parent);
            draw_value(world, row, &field, label, drawer);
            row
        }
    }
}

fn spawn_pickable_row(
    world: &mut World,
    parent: Entity,
    field: FieldHandle,
    label: &str,
    drawer: Option<&FieldDrawer>,
) -> Entity {
    let (button_width, button_spacing) = world
        .get_resource::<PickerSettings>()
        .map_or((18.0, 4.0), |settings| (settings.button_width, settings.button_spacing));
    let icon_font = world.get_resource::<IconFont>().cloned();
    let last = field.read(world).ok().flatten();

    let row = spawn_row(world, parent);
    world.entity_mut(row).insert(FieldWatch {
        field: field.clone(),
        last,
    });
    let value_area = world
        .spawn((
            Node {
                flex_grow: 1.0,
                flex_basis: px(0.0),
                margin: UiRect::right(px(button_spacing)),
                ..default()
            },
            ChildOf(row),
        ))
        .id();
    draw_value(world, value_area, &field, label, drawer);

    let toggle_field = field.clone();
    world
        .spawn((
            PickToggle { field },
            Node {
                width: px(button_width),
                height: px(button_width),
                flex_shrink: 0.0,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                border_radius: BorderRadius::all(tokens::CORNER_RADIUS),
                ..default()
            },
            BackgroundColor(Color::NONE),
            ChildOf(row),
            children![(
                icon_colored(Icon::Pointer, tokens::ICON_SIZE, icon_font.as_ref(), tokens::TEXT_MUTED),
                Pickable::IGNORE,
            )],
        ))
        .observe(move |click: On<Pointer<Click>>, mut commands: Commands| {
            if click.button != PointerButton::Primary {
                return;
            }
            let field = toggle_field.clone();
            commands.queue(move |world: &mut World| toggle_picking(world, field));
        })
        .observe(|hover: On<Pointer<Over>>, mut q: Query<&mut BackgroundColor>| {
            if let Ok(mut bg) = q.get_mut(hover.event_target()) {
                bg.0 = tokens::HOVER_BG;
            }
        })
        .observe(|out: On<Pointer<Out>>, mut q: Query<&mut BackgroundColor>| {
            if let Ok(mut bg) = q.get_mut(out.event_target()) {
                bg.0 = Color::NONE;
            }
        });
    row
}

fn spawn_row(world: &mut World, parent: Entity) -> Entity {
    world
        .spawn((
            Node {
                flex_direction: FlexDirection::Row,
                align_items: AlignItems::Center,
                column_gap: px(tokens::SPACING_XS),
                ..default()
            },
            ChildOf(parent),
        ))
        .id()
}

fn spawn_label(world: &mut World, parent: Entity, label: &str) {
    world.spawn((
        Text::new(format!("{label}:")),
        TextFont {
            font_size: tokens::FONT_SM,
            ..default()
        },
        TextColor(tokens::TEXT_MUTED),
        Node {
            flex_shrink: 0.0,
            ..default()
        },
        ChildOf(parent),
    ));
}

/// Default value rendering: `label: value`, kept current by
/// [`watch_pickable_fields`] for watched rows.
fn draw_value(world: &mut World, parent: Entity, field: &FieldHandle, label: &str, drawer: Option<&FieldDrawer>) {
    if let Some(drawer) = drawer {
        (drawer.0)(world, parent, field, label);
        return;
    }
    spawn_label(world, parent, label);
    let value = value_text(world, field);
    world.spawn((
        FieldValueText,
        Text::new(value),
        TextFont {
            font_size: tokens::FONT_SM,
            ..default()
        },
        TextColor(tokens::TEXT_BODY),
        ChildOf(parent),
    ));
}

fn value_text(world: &World, field: &FieldHandle) -> String {
    match field.read(world) {
        Ok(picked) => describe_picked(world, picked),
        Err(_) => field
            .inspect_component(world, |_, component| {
                field
                    .path
                    .resolve(component)
                    .map(|value| format!("{value:?}"))
            })
            .unwrap_or_else(|err: ResolutionError| err.to_string()),
    }
}

/// Start picking into `field`, or stop if it is already being picked.
pub fn toggle_picking(world: &mut World, field: FieldHandle) {
    if world.resource::<PickSession>().is_picking(&field) {
        stop_picking(world);
        return;
    }
    if let Err(err) = start_picking(world, PickRequest::new(field.clone())) {
        warn!("Failed to start picking `{}` on {}: {err}", field.path, field.entity);
    }
}

/// Assign a value as if edited by hand in the inspector, with undo.
pub fn set_field_manually(world: &mut World, field: &FieldHandle, value: Option<PickedObject>) {
    match field.assign(world, value) {
        Ok(change) if change.is_change() => {
            if let Some(mut history) = world.get_resource_mut::<CommandHistory>() {
                history.record(Box::new(SetPickedField {
                    field: field.clone(),
                    previous: change.previous,
                    current: change.current,
                }));
            }
        }
        Ok(_) => {}
        Err(err) => warn!("Failed to set `{}` on {}: {err}", field.path, field.entity),
    }
}

/// Mark `value` as already seen for every row watching `field`, so the
/// watcher does not treat a committed pick as a manual edit.
pub(crate) fn acknowledge_field_value(world: &mut World, field: &FieldHandle, value: Option<PickedObject>) {
    let mut watches = world.query::<&mut FieldWatch>();
    for mut watch in watches.iter_mut(world) {
        if watch.field == *field {
            watch.last = value;
        }
    }
    refresh_value_texts(world, field);
}

fn refresh_value_texts(world: &mut World, field: &FieldHandle) {
    let text = value_text(world, field);
    let mut rows = world.query::<(&FieldWatch, &Children)>();
    let value_areas: Vec<Entity> = rows
        .iter(world)
        .filter(|(watch, _)| watch.field == *field)
        .flat_map(|(_, children)| children.iter())
        .collect();
    let mut texts = world.query_filtered::<(&mut Text, &ChildOf), With<FieldValueText>>();
    for (mut value, child_of) in texts.iter_mut(world) {
        if value_areas.contains(&child_of.parent()) && value.0 != text {
            value.0 = text.clone();
        }
    }
}

/// Detect values changed outside the picker (typed in, undone, set by a
/// script). Fires the field's callback and stops picking that field.
pub fn watch_pickable_fields(world: &mut World) {
    let mut watches = world.query::<&FieldWatch>();
    let watched: Vec<(FieldHandle, Option<PickedObject>)> = watches
        .iter(world)
        .map(|watch| (watch.field.clone(), watch.last))
        .collect();

    for (field, last) in watched {
        let Ok(current) = field.read(world) else {
            continue;
        };
        if current == last {
            continue;
        }
        acknowledge_field_value(world, &field, current);
        if world.resource::<PickSession>().is_picking(&field) {
            stop_picking(world);
        }
        dispatch_field_callback(world, &field, last, current);
    }
}

fn sync_pick_toggles(
    session: Res<PickSession>,
    toggles: Query<(&PickToggle, &Children)>,
    mut icons: Query<&mut TextColor>,
) {
    for (toggle, children) in &toggles {
        let color = PickToggleState::of(&session, &toggle.field).color();
        for child in children.iter() {
            if let Ok(mut icon) = icons.get_mut(child) {
                icon.set_if_neq(TextColor(color));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::reflect::AppTypeRegistry;

    use crate::{PickCallbacks, ReflectPickField, TemplateAsset};

    #[derive(Component, Reflect, Default)]
    #[reflect(Component)]
    struct Spawner {
        #[reflect(@crate::PickCallback::new("on_point"))]
        point: Option<Entity>,
        points: Vec<Option<Entity>>,
        rate: f32,
        #[reflect(ignore)]
        changes: Vec<(Option<Entity>, Option<Entity>)>,
    }

    fn world() -> World {
        let mut world = World::new();
        world.init_resource::<AppTypeRegistry>();
        world.init_resource::<PickSession>();
        world.init_resource::<PickCallbacks>();
        world.init_resource::<PickerSettings>();
        world.init_resource::<CommandHistory>();
        {
            let registry = world.resource::<AppTypeRegistry>();
            let mut registry = registry.write();
            registry.register::<Spawner>();
            registry.register::<Option<Entity>>();
            registry.register_type_data::<Option<Entity>, ReflectPickField>();
        }
        world.resource_mut::<PickCallbacks>().register(
            "on_point",
            |spawner: &mut Spawner, previous: Option<Entity>, current: Option<Entity>| {
                spawner.changes.push((previous, current));
            },
        );
        world
    }

    fn toggles(world: &mut World) -> Vec<FieldHandle> {
        world
            .query::<&PickToggle>()
            .iter(world)
            .map(|toggle| toggle.field.clone())
            .collect()
    }

    #[test]
    fn pickable_field_gets_a_toggle() {
        let mut world = world();
        let panel = world.spawn(Node::default()).id();
        let spawner = world.spawn(Spawner::default()).id();
        let field = FieldHandle::parse::<Spawner>(spawner, "point").unwrap();
        spawn_pickable_field(&mut world, panel, field.clone(), "Point", None);
        assert_eq!(toggles(&mut world), vec![field]);
    }

    #[test]
    fn collections_get_one_toggle_per_element() {
        let mut world = world();
        let panel = world.spawn(Node::default()).id();
        let spawner = world
            .spawn(Spawner {
                points: vec![None, None, None],
                ..default()
            })
            .id();
        let field = FieldHandle::parse::<Spawner>(spawner, "points").unwrap();
        spawn_pickable_field(&mut world, panel, field.clone(), "Points", None);
        let mut found = toggles(&mut world);
        found.sort_by_key(|handle| handle.path.to_string());
        assert_eq!(found, (0..3).map(|i| field.element(i)).collect::<Vec<_>>());
    }

    #[test]
    fn plain_and_template_fields_have_no_toggle() {
        let mut world = world();
        let panel = world.spawn(Node::default()).id();
        let spawner = world.spawn(Spawner::default()).id();
        let template = world.spawn((Spawner::default(), TemplateAsset)).id();
        let rate = FieldHandle::parse::<Spawner>(spawner, "rate").unwrap();
        let templated = FieldHandle::parse::<Spawner>(template, "point").unwrap();
        spawn_pickable_field(&mut world, panel, rate, "Rate", None);
        spawn_pickable_field(&mut world, panel, templated, "Point", None);
        assert!(toggles(&mut world).is_empty());
    }

    #[test]
    fn custom_drawer_replaces_the_value() {
        let mut world = world();
        let panel = world.spawn(Node::default()).id();
        let spawner = world.spawn(Spawner::default()).id();
        let field = FieldHandle::parse::<Spawner>(spawner, "rate").unwrap();
        #[derive(Component)]
        struct Custom;
        let drawer = FieldDrawer::new(|world, parent, _, _| {
            world.spawn((Custom, ChildOf(parent)));
        });
        spawn_pickable_field(&mut world, panel, field, "Rate", Some(&drawer));
        assert_eq!(world.query::<&Custom>().iter(&world).count(), 1);
        assert_eq!(world.query::<&FieldValueText>().iter(&world).count(), 0);
    }

    #[test]
    fn toggling_starts_and_stops() {
        let mut world = world();
        let spawner = world.spawn(Spawner::default()).id();
        let field = FieldHandle::parse::<Spawner>(spawner, "point").unwrap();
        toggle_picking(&mut world, field.clone());
        assert_eq!(
            PickToggleState::of(world.resource::<PickSession>(), &field),
            PickToggleState::Active
        );
        let other = FieldHandle::parse::<Spawner>(spawner, "points[0]").unwrap();
        assert_eq!(
            PickToggleState::of(world.resource::<PickSession>(), &other),
            PickToggleState::OtherFieldActive
        );
        toggle_picking(&mut world, field.clone());
        assert_eq!(
            PickToggleState::of(world.resource::<PickSession>(), &field),
            PickToggleState::Idle
        );
    }

    #[test]
    fn manual_edit_fires_callback_and_stops_picking() {
        let mut world = world();
        let panel = world.spawn(Node::default()).id();
        let spawner = world.spawn(Spawner::default()).id();
        let target = world.spawn(Name::new("Spawn Point")).id();
        let field = FieldHandle::parse::<Spawner>(spawner, "point").unwrap();
        spawn_pickable_field(&mut world, panel, field.clone(), "Point", None);
        toggle_picking(&mut world, field.clone());

        set_field_manually(&mut world, &field, Some(PickedObject::node(target)));
        watch_pickable_fields(&mut world);

        assert_eq!(world.get::<Spawner>(spawner).unwrap().changes, vec![(None, Some(target))]);
        assert!(world.resource::<PickSession>().active().is_none());
        assert!(world.resource::<CommandHistory>().can_undo());
        let mut texts = world.query_filtered::<&Text, With<FieldValueText>>();
        let text = texts.single(&world).unwrap();
        assert_eq!(text.0, "Spawn Point");

        // Seen once; nothing fires again.
        watch_pickable_fields(&mut world);
        assert_eq!(world.get::<Spawner>(spawner).unwrap().changes.len(), 1);
    }
}
