//! Scene-view side of picking: pointer tracking, clicks, the leader line,
//! the floating label and the nearby-objects menu.

use bevy::{
    input::InputSystems,
    picking::hover::HoverMap,
    prelude::*,
    ui::UiGlobalTransform,
    window::PrimaryWindow,
};
use picker_widgets::{
    choice_menu::{ChoiceMenuDismissed, ChoiceMenuSelected, spawn_choice_menu},
    tokens,
};

use crate::{
    EditorEntity, PickCamera, PickViewport, PickerSettings,
    candidate::Candidate,
    proximity::{CameraProjection, Proximity, refresh_proximity},
    session::{PickPointer, PickSession, commit_candidate, picking_active, stop_picking},
    viewport_util::{dash_segments, pointer_over, window_to_viewport_cursor},
};

pub struct SceneGuiPlugin;

impl Plugin for SceneGuiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PreUpdate,
            handle_pick_input
                .after(InputSystems)
                .run_if(picking_active),
        )
        .add_systems(
            Update,
            (
                track_pick_pointer,
                update_pick_candidates,
                (draw_pick_leader, sync_pick_label),
            )
                .chain()
                .run_if(picking_active),
        )
        .add_observer(on_menu_selected)
        .add_observer(on_menu_dismissed);
    }
}

/// The floating name label next to the cursor.
#[derive(Component)]
pub struct PickLabel;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickAction {
    /// Assign the best candidate.
    Commit,
    /// List the nearby candidates to choose from.
    OpenMenu,
    Cancel,
}

/// Left click picks, middle click chooses among several nearby candidates,
/// anything else cancels. Clicks made while a navigation modifier (Alt or
/// Ctrl) is held cancel as well.
pub fn classify_click(button: MouseButton, navigating: bool, nearby_count: usize) -> ClickAction {
    if navigating {
        return ClickAction::Cancel;
    }
    match button {
        MouseButton::Left => ClickAction::Commit,
        MouseButton::Middle if nearby_count > 1 => ClickAction::OpenMenu,
        _ => ClickAction::Cancel,
    }
}

/// `Turret + 2 nearby`. The nearby count includes the best candidate itself.
pub fn label_text(name: &str, nearby_count: usize) -> String {
    if nearby_count > 1 {
        format!("{name} + {} nearby", nearby_count - 1)
    } else {
        name.to_string()
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Consumes clicks over the scene view so editor systems reading mouse input
/// later in the frame never see them.
fn handle_pick_input(world: &mut World) {
    let Some(button) = world
        .get_resource::<ButtonInput<MouseButton>>()
        .and_then(|mouse| mouse.get_just_pressed().next().copied())
    else {
        return;
    };
    let navigating = world
        .get_resource::<ButtonInput<KeyCode>>()
        .is_some_and(|keyboard| {
            keyboard.any_pressed([
                KeyCode::AltLeft,
                KeyCode::AltRight,
                KeyCode::ControlLeft,
                KeyCode::ControlRight,
            ])
        });

    let session = world.resource::<PickSession>();
    let Some(active) = session.active() else {
        return;
    };
    if active.menu.is_some() {
        return;
    }
    let Some(pointer) = active.pointer else {
        return;
    };
    let best = active.best().cloned();
    let action = classify_click(button, navigating, active.nearby_count());

    world
        .resource_mut::<ButtonInput<MouseButton>>()
        .clear_just_pressed(button);

    match action {
        ClickAction::Commit => {
            let Some(best) = best else {
                return;
            };
            if let Err(err) = commit_candidate(world, &best) {
                debug!("Pick of {} not committed: {err}", best.name);
            }
        }
        ClickAction::OpenMenu => open_nearby_menu(world, pointer.window),
        ClickAction::Cancel => {
            stop_picking(world);
        }
    }
}

fn open_nearby_menu(world: &mut World, position: Vec2) {
    let Some(entries) = world
        .resource::<PickSession>()
        .active()
        .map(|active| active.nearby().cloned().collect::<Vec<Candidate>>())
    else {
        return;
    };
    let menu = {
        let mut commands = world.commands();
        let menu = spawn_choice_menu(
            &mut commands,
            position,
            entries.iter().map(|candidate| candidate.display_label.clone()),
        );
        commands.entity(menu).insert(EditorEntity);
        menu
    };
    world.flush();

    let mut session = world.resource_mut::<PickSession>();
    if let Some(active) = session.active_mut() {
        active.menu = Some(menu);
        active.menu_entries = entries;
    }
}

fn on_menu_selected(selected: On<ChoiceMenuSelected>, mut commands: Commands) {
    let ChoiceMenuSelected { menu, index } = *selected;
    commands.queue(move |world: &mut World| {
        commit_menu_entry(world, menu, index);
    });
}

fn on_menu_dismissed(dismissed: On<ChoiceMenuDismissed>, mut session: ResMut<PickSession>) {
    let Some(active) = session.active_mut() else {
        return;
    };
    if active.menu == Some(dismissed.menu) {
        active.menu = None;
        active.menu_entries.clear();
    }
}

/// Commit entry `index` of `menu`. Each entry carries its own candidate, so
/// entries with identical labels still commit distinct objects.
pub fn commit_menu_entry(world: &mut World, menu: Entity, index: usize) -> bool {
    let candidate = {
        let mut session = world.resource_mut::<PickSession>();
        let Some(active) = session.active_mut() else {
            return false;
        };
        if active.menu != Some(menu) {
            return false;
        }
        active.menu = None;
        std::mem::take(&mut active.menu_entries)
            .into_iter()
            .nth(index)
    };
    let Some(candidate) = candidate else {
        return false;
    };
    match commit_candidate(world, &candidate) {
        Ok(committed) => committed,
        Err(err) => {
            debug!("Pick of {} not committed: {err}", candidate.name);
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Pointer and proximity
// ---------------------------------------------------------------------------

fn track_pick_pointer(
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<&Camera, With<PickCamera>>,
    viewports: Query<(&ComputedNode, &UiGlobalTransform), With<PickViewport>>,
    ui_nodes: Query<(), (With<Node>, Without<PickViewport>)>,
    hover_map: Option<Res<HoverMap>>,
    mut session: ResMut<PickSession>,
) {
    let pointer = if pointer_over(hover_map.as_deref(), |entity| ui_nodes.contains(entity)) {
        None
    } else {
        scene_pointer(&windows, &cameras, &viewports)
    };
    if let Some(active) = session.active_mut() {
        if active.pointer != pointer {
            active.pointer = pointer;
        }
    }
}

fn scene_pointer(
    windows: &Query<&Window, With<PrimaryWindow>>,
    cameras: &Query<&Camera, With<PickCamera>>,
    viewports: &Query<(&ComputedNode, &UiGlobalTransform), With<PickViewport>>,
) -> Option<PickPointer> {
    let cursor = windows.single().ok()?.cursor_position()?;
    let camera = cameras.single().ok()?;
    let viewport = window_to_viewport_cursor(cursor, camera, viewports.single().ok())?;
    Some(PickPointer {
        window: cursor,
        viewport,
    })
}

/// Recomputed every frame: candidates and the camera may move while the
/// pointer stays still.
fn update_pick_candidates(world: &mut World) {
    let mut cameras = world.query_filtered::<(&Camera, &GlobalTransform), With<PickCamera>>();
    world.resource_scope(|world, mut session: Mut<PickSession>| {
        let Some(active) = session.active_mut() else {
            return;
        };
        let world: &World = world;
        let (Some(pointer), Ok((camera, transform))) = (active.pointer, cameras.single(world)) else {
            active.proximity = Proximity::default();
            return;
        };
        let projection = CameraProjection { camera, transform };
        let proximity = refresh_proximity(
            world,
            &active.candidates,
            &active.target,
            &projection,
            pointer.viewport,
            world.resource::<PickerSettings>(),
        );
        if active.proximity != proximity {
            active.proximity = proximity;
        }
    });
}

// ---------------------------------------------------------------------------
// Leader line and label
// ---------------------------------------------------------------------------

fn draw_pick_leader(
    mut gizmos: Gizmos,
    session: Res<PickSession>,
    settings: Res<PickerSettings>,
    cameras: Query<(&Camera, &GlobalTransform), With<PickCamera>>,
    transforms: Query<&GlobalTransform>,
) {
    let Some(active) = session.active() else {
        return;
    };
    let (Some(best), Some(pointer)) = (active.best(), active.pointer) else {
        return;
    };
    let Ok((camera, camera_transform)) = cameras.single() else {
        return;
    };
    let Ok(anchor) = transforms.get(best.anchor) else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(camera_transform, pointer.viewport) else {
        return;
    };
    let end = ray.get_point(settings.leader_ray_distance);
    for (start, end) in dash_segments(anchor.translation(), end, settings.leader_dash_length) {
        gizmos.line(start, end, settings.leader_color);
    }
}

fn sync_pick_label(
    mut commands: Commands,
    mut session: ResMut<PickSession>,
    settings: Res<PickerSettings>,
    mut labels: Query<(&mut Node, &mut Text, &mut Visibility), With<PickLabel>>,
) {
    let Some(active) = session.active_mut() else {
        return;
    };
    let content = match (active.best(), active.pointer) {
        (Some(best), Some(pointer)) => Some((label_text(&best.name, active.nearby_count()), pointer)),
        _ => None,
    };

    let Some(label) = active.label else {
        if let Some((text, pointer)) = content {
            let position = pointer.window - Vec2::Y * settings.label_offset;
            active.label = Some(commands.spawn(pick_label(text, position)).id());
        }
        return;
    };
    let Ok((mut node, mut text, mut visibility)) = labels.get_mut(label) else {
        return;
    };
    match content {
        Some((content, pointer)) => {
            let position = pointer.window - Vec2::Y * settings.label_offset;
            node.left = px(position.x);
            node.top = px(position.y);
            if text.0 != content {
                text.0 = content;
            }
            visibility.set_if_neq(Visibility::Inherited);
        }
        None => {
            visibility.set_if_neq(Visibility::Hidden);
        }
    }
}

/// Centered on `position`, white text over a dark shadow.
fn pick_label(text: String, position: Vec2) -> impl Bundle {
    (
        PickLabel,
        EditorEntity,
        Node {
            position_type: PositionType::Absolute,
            left: px(position.x),
            top: px(position.y),
            padding: UiRect::axes(px(tokens::SPACING_SM), px(tokens::SPACING_XS)),
            border_radius: BorderRadius::all(tokens::CORNER_RADIUS),
            ..default()
        },
        UiTransform {
            translation: Val2 {
                x: percent(-50),
                y: percent(-50),
            },
            ..default()
        },
        Text::new(text),
        TextFont {
            font_size: tokens::FONT_MD,
            ..default()
        },
        TextColor(Color::WHITE),
        TextShadow {
            offset: Vec2::ONE,
            color: Color::BLACK,
        },
        BackgroundColor(Color::BLACK.with_alpha(0.35)),
        Visibility::Inherited,
        GlobalZIndex(800),
        Pickable::IGNORE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::{camera::RenderTargetInfo, ecs::reflect::AppTypeRegistry, ecs::system::RunSystemOnce};
    use picker_widgets::choice_menu::ChoiceMenuItem;
    use rstest::rstest;

    use crate::{
        PickCallbacks, ReflectPickField,
        commands::CommandHistory,
        field::FieldHandle,
        pick_field::PickedObject,
        session::{PickRequest, start_picking},
    };

    #[rstest]
    #[case(MouseButton::Left, false, 0, ClickAction::Commit)]
    #[case(MouseButton::Left, false, 3, ClickAction::Commit)]
    #[case(MouseButton::Middle, false, 2, ClickAction::OpenMenu)]
    #[case(MouseButton::Middle, false, 1, ClickAction::Cancel)]
    #[case(MouseButton::Right, false, 2, ClickAction::Cancel)]
    #[case(MouseButton::Back, false, 2, ClickAction::Cancel)]
    #[case(MouseButton::Left, true, 2, ClickAction::Cancel)]
    #[case(MouseButton::Middle, true, 5, ClickAction::Cancel)]
    fn clicks_are_classified(
        #[case] button: MouseButton,
        #[case] navigating: bool,
        #[case] nearby: usize,
        #[case] expected: ClickAction,
    ) {
        assert_eq!(classify_click(button, navigating, nearby), expected);
    }

    #[rstest]
    #[case("Turret", 0, "Turret")]
    #[case("Turret", 1, "Turret")]
    #[case("Turret", 3, "Turret + 2 nearby")]
    fn label_counts_the_others(#[case] name: &str, #[case] nearby: usize, #[case] expected: &str) {
        assert_eq!(label_text(name, nearby), expected);
    }

    #[derive(Component, Reflect, Default)]
    #[reflect(Component)]
    struct Sensor {
        watched: Option<Entity>,
    }

    fn base_world() -> World {
        let mut world = World::new();
        world.init_resource::<AppTypeRegistry>();
        world.init_resource::<PickSession>();
        world.init_resource::<PickCallbacks>();
        world.init_resource::<PickerSettings>();
        world.init_resource::<CommandHistory>();
        {
            let registry = world.resource::<AppTypeRegistry>();
            let mut registry = registry.write();
            registry.register::<Sensor>();
            registry.register::<Option<Entity>>();
            registry.register_type_data::<Option<Entity>, ReflectPickField>();
        }
        world
    }

    fn picking_world() -> (World, Entity, [Entity; 2]) {
        let mut world = base_world();
        let sensor = world.spawn(Sensor::default()).id();
        // Identical names give identical menu labels.
        let twins = [0.0, 1.0].map(|x| {
            world
                .spawn((
                    Name::new("Twin"),
                    Transform::from_xyz(x, 0.0, 0.0),
                    GlobalTransform::from_xyz(x, 0.0, 0.0),
                ))
                .id()
        });
        let field = FieldHandle::parse::<Sensor>(sensor, "watched").unwrap();
        start_picking(&mut world, PickRequest::new(field)).unwrap();
        (world, sensor, twins)
    }

    const VIEW_CENTER: Vec2 = Vec2::new(400.0, 300.0);

    /// An 800x600 perspective camera, as if its render target had been sized.
    fn sized_camera() -> Camera {
        let mut camera = Camera::default();
        camera.computed.target_info = Some(RenderTargetInfo {
            physical_size: UVec2::new(800, 600),
            scale_factor: 1.0,
        });
        camera.computed.clip_from_view =
            Mat4::perspective_infinite_reverse_rh(std::f32::consts::FRAC_PI_4, 800.0 / 600.0, 0.1);
        camera
    }

    /// Three targets clustered around the origin and one far to the right,
    /// seen head-on from ten units back. The view center lands on the middle
    /// target; the outer two are a few pixels away.
    fn scene_world() -> (World, Entity, [Entity; 4]) {
        let mut world = base_world();
        world.init_resource::<ButtonInput<MouseButton>>();
        world.init_resource::<ButtonInput<KeyCode>>();
        world.spawn((Window::default(), PrimaryWindow));
        world.spawn((
            sized_camera(),
            PickCamera,
            EditorEntity,
            GlobalTransform::from(Transform::from_xyz(0.0, 0.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y)),
        ));
        let sensor = world.spawn(Sensor::default()).id();
        let targets = [("Left", -0.1), ("Middle", 0.0), ("Right", 0.1), ("Far", 3.0)].map(|(name, x)| {
            world
                .spawn((
                    Name::new(name),
                    Transform::from_xyz(x, 0.0, 0.0),
                    GlobalTransform::from_xyz(x, 0.0, 0.0),
                ))
                .id()
        });
        let field = FieldHandle::parse::<Sensor>(sensor, "watched").unwrap();
        start_picking(&mut world, PickRequest::new(field)).unwrap();
        (world, sensor, targets)
    }

    fn point_at(world: &mut World, cursor: Option<Vec2>) {
        let mut windows = world.query_filtered::<&mut Window, With<PrimaryWindow>>();
        windows.single_mut(world).unwrap().set_cursor_position(cursor);
        world.run_system_once(track_pick_pointer).unwrap();
        world.run_system_once(update_pick_candidates).unwrap();
    }

    fn click(world: &mut World, button: MouseButton, modifier: Option<KeyCode>) {
        if let Some(key) = modifier {
            world.resource_mut::<ButtonInput<KeyCode>>().press(key);
        }
        world.resource_mut::<ButtonInput<MouseButton>>().press(button);
        world.run_system_once(handle_pick_input).unwrap();
    }

    fn click_was_consumed(world: &World, button: MouseButton) -> bool {
        !world.resource::<ButtonInput<MouseButton>>().just_pressed(button)
    }

    fn picking(world: &World) -> bool {
        world.resource::<PickSession>().active().is_some()
    }

    #[test]
    fn pointer_over_the_cluster_finds_best_and_nearby() {
        let (mut world, _, [left, middle, right, _]) = scene_world();
        point_at(&mut world, Some(VIEW_CENTER));

        let session = world.resource::<PickSession>();
        let active = session.active().unwrap();
        assert_eq!(active.pointer.map(|pointer| pointer.viewport), Some(VIEW_CENTER));
        assert_eq!(active.best().map(|best| best.object.entity), Some(middle));
        let nearby: Vec<Entity> = active.nearby().map(|candidate| candidate.object.entity).collect();
        assert_eq!(nearby, vec![middle, left, right]);
    }

    #[test]
    fn pointer_leaving_the_view_clears_proximity() {
        let (mut world, _, _) = scene_world();
        point_at(&mut world, Some(VIEW_CENTER));
        point_at(&mut world, None);

        let session = world.resource::<PickSession>();
        let active = session.active().unwrap();
        assert_eq!(active.pointer, None);
        assert_eq!(active.proximity, Proximity::default());
    }

    #[test]
    fn middle_click_lists_nearby_and_second_entry_commits() {
        let (mut world, sensor, [left, ..]) = scene_world();
        world.add_observer(on_menu_selected);
        point_at(&mut world, Some(VIEW_CENTER));
        click(&mut world, MouseButton::Middle, None);

        assert!(click_was_consumed(&world, MouseButton::Middle));
        let mut items = world.query::<&ChoiceMenuItem>();
        assert_eq!(items.iter(&world).count(), 3);
        let menu = {
            let session = world.resource::<PickSession>();
            let active = session.active().unwrap();
            assert_eq!(active.menu_entries.len(), 3);
            assert_eq!(active.menu_entries[1].object.entity, left);
            active.menu.unwrap()
        };

        world.trigger(ChoiceMenuSelected { menu, index: 1 });
        world.flush();
        assert_eq!(world.get::<Sensor>(sensor).unwrap().watched, Some(left));
        assert!(!picking(&world));
    }

    #[test]
    fn left_click_commits_the_best_candidate() {
        let (mut world, sensor, [_, middle, ..]) = scene_world();
        point_at(&mut world, Some(VIEW_CENTER));
        click(&mut world, MouseButton::Left, None);

        assert!(click_was_consumed(&world, MouseButton::Left));
        assert_eq!(world.get::<Sensor>(sensor).unwrap().watched, Some(middle));
        assert!(!picking(&world));
    }

    #[rstest]
    #[case(MouseButton::Right, None)]
    #[case(MouseButton::Left, Some(KeyCode::ControlLeft))]
    #[case(MouseButton::Left, Some(KeyCode::AltRight))]
    #[case(MouseButton::Middle, Some(KeyCode::ControlRight))]
    fn cancelling_clicks_end_the_pick(#[case] button: MouseButton, #[case] modifier: Option<KeyCode>) {
        let (mut world, sensor, _) = scene_world();
        point_at(&mut world, Some(VIEW_CENTER));
        click(&mut world, button, modifier);

        assert!(click_was_consumed(&world, button));
        assert_eq!(world.get::<Sensor>(sensor).unwrap().watched, None);
        assert!(!picking(&world));
    }

    #[test]
    fn left_click_without_a_best_candidate_keeps_picking() {
        let (mut world, sensor, _) = scene_world();
        point_at(&mut world, Some(VIEW_CENTER));
        world
            .resource_mut::<PickSession>()
            .active_mut()
            .unwrap()
            .proximity = Proximity::default();
        click(&mut world, MouseButton::Left, None);

        assert!(click_was_consumed(&world, MouseButton::Left));
        assert_eq!(world.get::<Sensor>(sensor).unwrap().watched, None);
        assert!(picking(&world));
    }

    #[test]
    fn clicks_off_the_scene_view_are_left_alone() {
        let (mut world, _, _) = scene_world();
        point_at(&mut world, None);
        click(&mut world, MouseButton::Right, None);

        assert!(!click_was_consumed(&world, MouseButton::Right));
        assert!(picking(&world));
    }

    fn open_menu_on_all(world: &mut World) -> Entity {
        let menu = world.spawn_empty().id();
        let mut session = world.resource_mut::<PickSession>();
        let active = session.active_mut().unwrap();
        active.proximity = Proximity {
            best: Some(0),
            nearby: vec![0, 1],
        };
        active.menu_entries = active.nearby().cloned().collect();
        active.menu = Some(menu);
        menu
    }

    #[test]
    fn menu_entries_commit_their_own_candidate() {
        let (mut world, sensor, twins) = picking_world();
        let menu = open_menu_on_all(&mut world);
        {
            let session = world.resource::<PickSession>();
            let entries = &session.active().unwrap().menu_entries;
            assert_eq!(entries[0].display_label, entries[1].display_label);
        }

        assert!(commit_menu_entry(&mut world, menu, 1));
        assert_eq!(world.get::<Sensor>(sensor).unwrap().watched, Some(twins[1]));
        assert!(world.resource::<PickSession>().active().is_none());
    }

    #[test]
    fn selection_from_a_stale_menu_is_ignored() {
        let (mut world, sensor, _) = picking_world();
        open_menu_on_all(&mut world);
        let stale = world.spawn_empty().id();
        assert!(!commit_menu_entry(&mut world, stale, 0));
        assert_eq!(world.get::<Sensor>(sensor).unwrap().watched, None);
        assert!(world.resource::<PickSession>().active().is_some());
    }

    #[test]
    fn despawned_menu_entry_keeps_picking() {
        let (mut world, sensor, twins) = picking_world();
        let menu = open_menu_on_all(&mut world);
        world.despawn(twins[0]);
        assert!(!commit_menu_entry(&mut world, menu, 0));
        assert_eq!(world.get::<Sensor>(sensor).unwrap().watched, None);
        let session = world.resource::<PickSession>();
        let active = session.active().unwrap();
        assert_eq!(active.menu, None);
        assert_eq!(active.candidates[1].object, PickedObject::node(twins[1]));
    }
}
