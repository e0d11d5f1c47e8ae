//! A small scene with a turret whose references can be picked from the view.
//!
//! Click the pointer button next to a field in the panel, then left click near
//! an object. Middle click lists every object near the cursor.
//!
//! ```sh
//! cargo run --example turret_scene
//! ```

use bevy::{
    prelude::*,
    reflect::{FromType, TypePath},
};
use scene_picker::{
    Capability, CapabilityRef, ComponentRef, EditorEntity, PickCallback, PickCamera, PickerAppExt,
    ScenePickerPlugin, field::FieldHandle, field_drawer::spawn_pickable_field,
};

#[derive(Clone)]
struct ReflectPowered;

impl<T> FromType<T> for ReflectPowered {
    fn from_type() -> Self {
        Self
    }
}

#[derive(TypePath)]
struct Powered;

impl Capability for Powered {
    type Data = ReflectPowered;
}

#[derive(Component, Reflect, Default)]
#[reflect(Component, Powered)]
struct Generator;

#[derive(Component, Reflect, Default)]
#[reflect(Component, Powered)]
struct Battery;

#[derive(Component, Reflect, Default)]
#[reflect(Component)]
struct Turret {
    #[reflect(@PickCallback::new("retarget"))]
    target: Option<Entity>,
    #[reflect(@PickCallback::new("repower"))]
    power: CapabilityRef<Powered>,
    ammo: ComponentRef<Crate>,
    patrol: Vec<Option<Entity>>,
}

#[derive(Component, Reflect, Default)]
#[reflect(Component)]
struct Crate;

impl Turret {
    fn retarget(&mut self, previous: Option<Entity>, current: Option<Entity>) {
        info!("Turret retargeted from {previous:?} to {current:?}");
    }
}

fn main() -> AppExit {
    App::new()
        .add_plugins((DefaultPlugins, ScenePickerPlugin))
        .register_type::<Turret>()
        .register_type::<Generator>()
        .register_type::<Battery>()
        .register_type::<Crate>()
        .register_pick_component::<Crate>()
        .register_pick_capability::<Powered>()
        .register_pick_callback("retarget", Turret::retarget)
        .register_pick_callback("repower", |_: &mut Turret| {
            info!("Turret power source changed");
        })
        .add_systems(Startup, (spawn_scene, spawn_panel).chain())
        .run()
}

fn spawn_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        PickCamera,
        EditorEntity,
        Transform::from_xyz(0.0, 8.0, 12.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            shadows_enabled: true,
            illuminance: 10000.0,
            ..default()
        },
        Transform::from_xyz(10.0, 20.0, 10.0)
            .with_rotation(Quat::from_euler(EulerRot::XYZ, -0.8, 0.4, 0.0)),
    ));

    let cube = meshes.add(Cuboid::new(1.0, 1.0, 1.0));
    let grey = materials.add(Color::srgb(0.6, 0.6, 0.6));
    let yellow = materials.add(Color::srgb(0.9, 0.8, 0.2));

    commands.spawn((
        Name::new("Turret"),
        Turret {
            patrol: vec![None; 3],
            ..default()
        },
        Mesh3d(cube.clone()),
        MeshMaterial3d(grey.clone()),
        Transform::default(),
    ));
    for (i, x) in [-4.0, -3.2, 4.0].into_iter().enumerate() {
        commands.spawn((
            Name::new(format!("Generator {i}")),
            Generator,
            Mesh3d(cube.clone()),
            MeshMaterial3d(yellow.clone()),
            Transform::from_xyz(x, 0.0, -3.0),
        ));
    }
    commands
        .spawn((
            Name::new("Depot"),
            Transform::from_xyz(0.0, 0.0, 4.0),
            Visibility::default(),
        ))
        .with_children(|depot| {
            depot.spawn((
                Name::new("Battery"),
                Battery,
                Mesh3d(cube.clone()),
                MeshMaterial3d(yellow.clone()),
                Transform::from_xyz(-1.0, 0.0, 0.0),
            ));
            depot.spawn((
                Name::new("Crate"),
                Crate,
                Mesh3d(cube.clone()),
                MeshMaterial3d(grey.clone()),
                Transform::from_xyz(1.0, 0.0, 0.0),
            ));
        });
}

fn spawn_panel(mut commands: Commands, turrets: Query<Entity, With<Turret>>) {
    let Ok(turret) = turrets.single() else {
        return;
    };
    commands.queue(move |world: &mut World| {
        let panel = world
            .spawn((
                EditorEntity,
                Node {
                    position_type: PositionType::Absolute,
                    top: px(8),
                    right: px(8),
                    width: px(280),
                    flex_direction: FlexDirection::Column,
                    row_gap: px(4),
                    padding: UiRect::all(px(8)),
                    ..default()
                },
                BackgroundColor(Color::srgba(0.1, 0.1, 0.12, 0.9)),
            ))
            .id();
        for (path, label) in [
            ("target", "Target"),
            ("power", "Power"),
            ("ammo", "Ammo"),
            ("patrol", "Patrol"),
        ] {
            match FieldHandle::parse::<Turret>(turret, path) {
                Ok(field) => {
                    spawn_pickable_field(world, panel, field, label, None);
                }
                Err(err) => warn!("Failed to address `{path}`: {err}"),
            }
        }
    });
}
