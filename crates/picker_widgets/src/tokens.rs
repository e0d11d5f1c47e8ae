use bevy::color::palettes::tailwind;
use bevy::prelude::*;

// ---------------------------------------------------------------------------
// Spacing & sizes
// ---------------------------------------------------------------------------

pub const SPACING_XS: f32 = 2.0;
pub const SPACING_SM: f32 = 4.0;
pub const SPACING_MD: f32 = 8.0;

pub const FONT_SM: f32 = 12.0;
pub const FONT_MD: f32 = 13.0;
pub const ICON_SIZE: f32 = 14.0;

pub const CORNER_RADIUS: Val = Val::Px(2.0);
pub const CORNER_RADIUS_MD: f32 = 4.0;

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Choice menu background
pub const MENU_BG: Color = Color::Srgba(Srgba {
    red: tailwind::ZINC_800.red,
    green: tailwind::ZINC_800.green,
    blue: tailwind::ZINC_800.blue,
    alpha: 0.98,
});
pub const BORDER_SUBTLE: Color = Color::Srgba(tailwind::ZINC_700);
pub const HOVER_BG: Color = Color::srgba(1.0, 1.0, 1.0, 0.1);

pub const TEXT_BODY: Color = Color::Srgba(tailwind::ZINC_200);
pub const TEXT_MUTED: Color = Color::Srgba(tailwind::ZINC_400);
pub const TEXT_ACCENT: Color = Color::Srgba(tailwind::BLUE_400);

pub const TOAST_BG: Srgba = tailwind::ZINC_700;
