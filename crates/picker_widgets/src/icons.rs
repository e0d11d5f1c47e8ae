use bevy::prelude::*;
pub use lucide_icons::Icon;

/// Resource holding the loaded Lucide icon font handle.
#[derive(Resource, Clone)]
pub struct IconFont(pub Handle<Font>);

pub struct IconFontPlugin;

impl Plugin for IconFontPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_icon_font);
    }
}

fn load_icon_font(mut commands: Commands, fonts: Option<ResMut<Assets<Font>>>) {
    let Some(mut fonts) = fonts else {
        return;
    };
    match Font::try_from_bytes(lucide_icons::LUCIDE_FONT_BYTES.to_vec()) {
        Ok(font) => commands.insert_resource(IconFont(fonts.add(font))),
        Err(err) => warn!("Failed to load Lucide icon font: {err}"),
    }
}

/// Create a text bundle that renders a single Lucide icon glyph.
///
/// Falls back to the default font when the icon font is not loaded, which
/// renders a placeholder glyph rather than failing.
pub fn icon_colored(icon: Icon, size: f32, font: Option<&IconFont>, color: Color) -> impl Bundle {
    (
        Text::new(String::from(icon.unicode())),
        TextFont {
            font: font.map(|f| f.0.clone()).unwrap_or_default(),
            font_size: size,
            ..Default::default()
        },
        TextColor(color),
    )
}
