use bevy::prelude::*;

use crate::tokens;

/// System set containing the choice menu close systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChoiceMenuCloseSet;

pub struct ChoiceMenuPlugin;

impl Plugin for ChoiceMenuPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (close_choice_menu_on_click, close_choice_menu_on_escape).in_set(ChoiceMenuCloseSet),
        );
    }
}

/// Marker component for the choice menu container.
#[derive(Component)]
pub struct ChoiceMenu;

/// One entry of a choice menu. Entries are identified by position, never by
/// label, so two entries may carry identical text.
#[derive(Component, Debug, Clone, Copy)]
pub struct ChoiceMenuItem {
    pub menu: Entity,
    pub index: usize,
}

/// Fired when an entry is clicked. The menu is despawned right after.
#[derive(Event, Debug, Clone, Copy)]
pub struct ChoiceMenuSelected {
    pub menu: Entity,
    pub index: usize,
}

/// Fired when a menu closes without a selection (click outside, Escape).
#[derive(Event, Debug, Clone, Copy)]
pub struct ChoiceMenuDismissed {
    pub menu: Entity,
}

/// Spawn a choice menu at `position` (window coordinates) listing `labels` in order.
pub fn spawn_choice_menu<I, S>(commands: &mut Commands, position: Vec2, labels: I) -> Entity
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let menu = commands
        .spawn((
            ChoiceMenu,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(position.x),
                top: Val::Px(position.y),
                flex_direction: FlexDirection::Column,
                min_width: Val::Px(160.0),
                padding: UiRect::axes(Val::Px(tokens::SPACING_XS), Val::Px(tokens::SPACING_SM)),
                border: UiRect::all(Val::Px(1.0)),
                border_radius: BorderRadius::all(Val::Px(tokens::CORNER_RADIUS_MD)),
                ..Default::default()
            },
            BackgroundColor(tokens::MENU_BG),
            BorderColor::all(tokens::BORDER_SUBTLE),
            GlobalZIndex(1000),
        ))
        .id();

    for (index, label) in labels.into_iter().enumerate() {
        commands
            .spawn((
                ChoiceMenuItem { menu, index },
                Node {
                    padding: UiRect::axes(Val::Px(tokens::SPACING_MD), Val::Px(tokens::SPACING_SM)),
                    ..Default::default()
                },
                BackgroundColor(Color::NONE),
                ChildOf(menu),
                children![(
                    Text::new(label.into()),
                    TextFont {
                        font_size: tokens::FONT_SM,
                        ..Default::default()
                    },
                    TextColor(tokens::TEXT_BODY),
                    Pickable::IGNORE,
                )],
            ))
            .observe(on_choice_item_click)
            .observe(
                |hover: On<Pointer<Over>>, mut q: Query<&mut BackgroundColor>| {
                    if let Ok(mut bg) = q.get_mut(hover.event_target()) {
                        bg.0 = tokens::HOVER_BG;
                    }
                },
            )
            .observe(|out: On<Pointer<Out>>, mut q: Query<&mut BackgroundColor>| {
                if let Ok(mut bg) = q.get_mut(out.event_target()) {
                    bg.0 = Color::NONE;
                }
            });
    }

    menu
}

fn on_choice_item_click(
    click: On<Pointer<Click>>,
    items: Query<&ChoiceMenuItem>,
    mut commands: Commands,
) {
    if click.button != PointerButton::Primary {
        return;
    }
    let Ok(&item) = items.get(click.event_target()) else {
        return;
    };
    commands.trigger(ChoiceMenuSelected {
        menu: item.menu,
        index: item.index,
    });
    commands.entity(item.menu).try_despawn();
}

/// Close open menus when a click lands outside of them. Entry clicks are
/// delivered by the picking backend before `Update`, so a menu still alive
/// here was not clicked.
fn close_choice_menu_on_click(
    mouse: Res<ButtonInput<MouseButton>>,
    menus: Query<Entity, With<ChoiceMenu>>,
    mut commands: Commands,
) {
    if !mouse.just_released(MouseButton::Left) && !mouse.just_pressed(MouseButton::Right) {
        return;
    }
    for menu in &menus {
        dismiss(&mut commands, menu);
    }
}

/// Close on Escape key.
fn close_choice_menu_on_escape(
    keyboard: Res<ButtonInput<KeyCode>>,
    menus: Query<Entity, With<ChoiceMenu>>,
    mut commands: Commands,
) {
    if !keyboard.just_pressed(KeyCode::Escape) {
        return;
    }
    for menu in &menus {
        dismiss(&mut commands, menu);
    }
}

fn dismiss(commands: &mut Commands, menu: Entity) {
    commands.entity(menu).try_despawn();
    commands.trigger(ChoiceMenuDismissed { menu });
}
