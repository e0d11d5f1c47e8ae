pub mod choice_menu;
pub mod icons;
pub mod toast;
pub mod tokens;

use bevy::app::Plugin;

pub struct PickerWidgetsPlugin;

impl Plugin for PickerWidgetsPlugin {
    fn build(&self, app: &mut bevy::app::App) {
        app.add_plugins((
            icons::IconFontPlugin,
            choice_menu::ChoiceMenuPlugin,
            toast::plugin,
        ));
    }
}
