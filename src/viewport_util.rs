use bevy::{picking::hover::HoverMap, prelude::*, ui::UiGlobalTransform};

/// Convert window cursor position to viewport-local coordinates in camera space.
///
/// The camera renders to an off-screen image whose logical size may differ from
/// the UI node's logical size (they diverge on HiDPI/fractional-scaling displays).
/// This function remaps from UI-logical space into the camera's viewport space so
/// that `camera.viewport_to_world()` and `camera.world_to_viewport()` produce
/// correct results. Without a viewport node the camera fills the window.
pub(crate) fn window_to_viewport_cursor(
    cursor_pos: Vec2,
    camera: &Camera,
    viewport: Option<(&ComputedNode, &UiGlobalTransform)>,
) -> Option<Vec2> {
    let Some((computed, vp_transform)) = viewport else {
        return Some(cursor_pos);
    };
    // Convert from physical pixels to logical pixels to match cursor_position()
    let scale = computed.inverse_scale_factor();
    let vp_pos = vp_transform.translation * scale;
    let vp_size = computed.size() * scale;
    // ComputedNode position is the center, convert to top-left
    let vp_top_left = vp_pos - vp_size / 2.0;
    let local = cursor_pos - vp_top_left;
    if local.x >= 0.0 && local.y >= 0.0 && local.x <= vp_size.x && local.y <= vp_size.y {
        // Remap from UI-logical space to camera render-target space
        let target_size = camera.logical_viewport_size().unwrap_or(vp_size);
        Some(local * target_size / vp_size)
    } else {
        None
    }
}

/// Whether any pointer hovers one of `blocking`, i.e. a UI panel drawn over
/// the scene.
pub(crate) fn pointer_over(hover_map: Option<&HoverMap>, blocking: impl Fn(Entity) -> bool) -> bool {
    hover_map.is_some_and(|hover_map| {
        hover_map
            .values()
            .any(|pointer_map| pointer_map.keys().any(|&entity| blocking(entity)))
    })
}

/// World-space dashes from `start` to `end`. The last dash is cut short at `end`.
pub(crate) fn dash_segments(start: Vec3, end: Vec3, dash_length: f32) -> Vec<(Vec3, Vec3)> {
    let length = start.distance(end);
    if length <= f32::EPSILON || dash_length <= 0.0 {
        return vec![(start, end)];
    }
    let direction = (end - start) / length;
    let mut dashes = Vec::new();
    let mut travelled = 0.0;
    while travelled < length {
        let dash_end = (travelled + dash_length).min(length);
        dashes.push((start + direction * travelled, start + direction * dash_end));
        travelled += dash_length * 2.0;
    }
    dashes
}
