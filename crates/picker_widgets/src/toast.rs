use std::time::Duration;

use bevy::prelude::*;

use crate::icons::{Icon, IconFont, icon_colored};
use crate::tokens::{CORNER_RADIUS, FONT_MD, ICON_SIZE, TEXT_BODY, TOAST_BG};

pub const TOAST_BOTTOM_OFFSET: f32 = 12.0;
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

pub fn plugin(app: &mut App) {
    app.add_systems(Update, tick_toast_duration);
}

#[derive(Component)]
pub struct Toast;

#[derive(Component)]
pub struct ToastDuration(pub Timer);

/// A bottom-centered notification that despawns itself after `duration`.
/// Multi-line `content` is rendered as-is.
pub fn toast(content: impl Into<String>, duration: Duration, icon_font: Option<&IconFont>) -> impl Bundle {
    (
        Toast,
        ToastDuration(Timer::new(duration, TimerMode::Once)),
        Node {
            position_type: PositionType::Absolute,
            left: percent(50),
            bottom: px(TOAST_BOTTOM_OFFSET),
            column_gap: px(12),
            padding: UiRect::axes(px(12), px(8)),
            border: UiRect::all(px(1)),
            border_radius: BorderRadius::all(CORNER_RADIUS),
            box_sizing: BoxSizing::BorderBox,
            align_items: AlignItems::Center,
            ..default()
        },
        UiTransform {
            translation: Val2 {
                x: percent(-50),
                y: px(0),
            },
            ..default()
        },
        BackgroundColor(TOAST_BG.into()),
        BorderColor::all(TEXT_BODY.with_alpha(0.15)),
        GlobalZIndex(900),
        Pickable::IGNORE,
        children![
            (
                icon_colored(Icon::Info, ICON_SIZE, icon_font, TEXT_BODY),
                Pickable::IGNORE,
            ),
            (
                Text::new(content),
                TextFont {
                    font_size: FONT_MD,
                    ..default()
                },
                TextColor(TEXT_BODY),
                Pickable::IGNORE,
            ),
        ],
    )
}

fn tick_toast_duration(
    mut commands: Commands,
    time: Res<Time>,
    mut toasts: Query<(Entity, &mut ToastDuration), With<Toast>>,
) {
    for (entity, mut duration) in &mut toasts {
        duration.0.tick(time.delta());
        if duration.0.is_finished() {
            commands.entity(entity).try_despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_and_its_contents_ignore_the_pointer() {
        let mut world = World::new();
        let toast = world.spawn(toast("hint", DEFAULT_TOAST_DURATION, None)).id();

        let mut nodes = vec![toast];
        if let Some(children) = world.get::<Children>(toast) {
            nodes.extend(children.iter());
        }
        assert_eq!(nodes.len(), 3);
        for node in nodes {
            assert_eq!(world.get::<Pickable>(node), Some(&Pickable::IGNORE));
        }
    }
}
