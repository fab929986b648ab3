//! Painter's-algorithm helpers shared by the engine's frame and the editor.

use crate::collision::Collider;
use crate::math::Color;
use crate::render::{Bitmap, RasterBackend, RENDER_LAYER_MAX};

/// Blit one bitmap. Suppressed bitmaps and bitmaps without an atlas are skipped.
pub fn draw_bitmap(backend: &mut dyn RasterBackend, bitmap: &Bitmap) {
    let Some(atlas) = bitmap.atlas else {
        return;
    };
    if bitmap.suppressed {
        return;
    }
    backend.draw_bitmap(atlas, bitmap.destination(), bitmap.source, bitmap.opacity, true);
}

/// Draw bitmaps bucketed by ascending render layer.
///
/// Within a layer the iterator order is kept, so callers pass bitmaps in
/// insertion order.
pub fn draw_layers<'a, I>(backend: &mut dyn RasterBackend, bitmaps: I)
where
    I: IntoIterator<Item = &'a Bitmap>,
{
    let mut buckets: [Vec<&Bitmap>; RENDER_LAYER_MAX as usize + 1] = Default::default();
    for bitmap in bitmaps {
        buckets[bitmap.render_layer.min(RENDER_LAYER_MAX) as usize].push(bitmap);
    }

    for bitmap in buckets.iter().flatten() {
        draw_bitmap(backend, bitmap);
    }
}

/// Outline colliders. `only_flagged` restricts the pass to colliders marked
/// for debug rendering; disabled colliders are never drawn.
pub fn stroke_colliders<'a, I>(backend: &mut dyn RasterBackend, colliders: I, only_flagged: bool)
where
    I: IntoIterator<Item = &'a Collider>,
{
    for collider in colliders {
        if collider.disabled || (only_flagged && !collider.render_debug) {
            continue;
        }
        let color = if only_flagged {
            collider.debug_color
        } else {
            Color::GREEN
        };
        backend.draw_rect(collider.rect(), color, 1.0, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Rect, Vec2};
    use crate::render::{AtlasHandle, DrawCommand, RecordingBackend};

    fn sprite(atlas: u32, layer: u8) -> Bitmap {
        Bitmap::new(Some(AtlasHandle(atlas)), Rect::from_xywh(0.0, 0.0, 8.0, 8.0)).on_layer(layer)
    }

    fn drawn_atlases(backend: &RecordingBackend) -> Vec<u32> {
        backend
            .log()
            .borrow()
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Bitmap { atlas, .. } => Some(atlas.raw()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn lower_layers_draw_first_with_insertion_tie_break() {
        let bitmaps = vec![sprite(1, 5), sprite(2, 0), sprite(3, 5), sprite(4, 2)];
        let mut backend = RecordingBackend::new();
        draw_layers(&mut backend, &bitmaps);
        assert_eq!(drawn_atlases(&backend), vec![2, 4, 1, 3]);
    }

    #[test]
    fn suppressed_and_unloaded_bitmaps_are_skipped() {
        let mut hidden = sprite(1, 0);
        hidden.suppressed = true;
        let missing = Bitmap::new(None, Rect::default());
        let mut backend = RecordingBackend::new();
        draw_layers(&mut backend, [&hidden, &missing, &sprite(2, 0)]);
        assert_eq!(drawn_atlases(&backend), vec![2]);
    }

    #[test]
    fn only_flagged_colliders_are_stroked_in_the_debug_pass() {
        let mut shown = Collider::new(Vec2::new(4.0, 4.0), 1);
        shown.render_debug = true;
        let quiet = Collider::new(Vec2::new(4.0, 4.0), 2);
        let mut backend = RecordingBackend::new();
        stroke_colliders(&mut backend, [&shown, &quiet], true);
        assert_eq!(backend.log().borrow().len(), 1);
    }
}
