use crate::math::{Rect, Vec2};

/// Highest render layer index; layers run `0..=RENDER_LAYER_MAX`.
pub const RENDER_LAYER_MAX: u8 = 10;

/// Number of distinct render layers.
pub const RENDER_LAYER_COUNT: usize = RENDER_LAYER_MAX as usize + 1;

/// Opaque handle used to reference atlases owned by a raster backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AtlasHandle(pub(crate) u32);

impl AtlasHandle {
    /// Build a handle from a backend-specific id.
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Sprite part: a window onto an atlas drawn at a world location.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    /// `None` when the atlas failed to load; such bitmaps are skipped.
    pub atlas: Option<AtlasHandle>,
    pub location: Vec2,
    /// Source window on the atlas, in atlas pixels.
    pub source: Rect,
    /// Destination size; equals the source size unless scaled on purpose.
    pub size: Vec2,
    pub render_layer: u8,
    pub opacity: f32,
    pub suppressed: bool,
}

impl Bitmap {
    pub fn new(atlas: Option<AtlasHandle>, source: Rect) -> Self {
        Self {
            atlas,
            location: Vec2::ZERO,
            source,
            size: source.size,
            render_layer: 0,
            opacity: 1.0,
            suppressed: false,
        }
    }

    /// Frame a grid slot of an atlas: column `col`, row `row`, slot size `slot`.
    pub fn from_slot(atlas: Option<AtlasHandle>, slot: Vec2, col: u32, row: u32) -> Self {
        let source = Rect::new(
            Vec2::new(slot.x * col as f32, slot.y * row as f32),
            slot,
        );
        Self::new(atlas, source)
    }

    #[must_use]
    pub fn at(mut self, location: Vec2) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn on_layer(mut self, layer: u8) -> Self {
        self.render_layer = layer.min(RENDER_LAYER_MAX);
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    pub fn set_render_layer(&mut self, layer: u8) {
        self.render_layer = layer.min(RENDER_LAYER_MAX);
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Screen-space destination rectangle.
    pub fn destination(&self) -> Rect {
        Rect::new(self.location, self.size)
    }

    /// True when the bitmap would produce a draw call.
    pub fn is_drawable(&self) -> bool {
        self.atlas.is_some() && !self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_framing_uses_column_and_row() {
        let bitmap = Bitmap::from_slot(Some(AtlasHandle(1)), Vec2::new(32.0, 16.0), 2, 3);
        assert_eq!(bitmap.source, Rect::from_xywh(64.0, 48.0, 32.0, 16.0));
        assert_eq!(bitmap.size, Vec2::new(32.0, 16.0));
    }

    #[test]
    fn layer_is_clamped_to_max() {
        let bitmap = Bitmap::new(None, Rect::default()).on_layer(42);
        assert_eq!(bitmap.render_layer, RENDER_LAYER_MAX);
        assert!(!bitmap.is_drawable());
    }
}
