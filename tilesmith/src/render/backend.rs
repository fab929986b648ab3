use std::path::Path;

use anyhow::Result;

use crate::math::{Color, Rect};
use crate::render::AtlasHandle;

/// Font settings passed to [`RasterBackend::draw_text`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextFormat {
    /// Pixel height of the font.
    pub size: f32,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self { size: 18.0 }
    }
}

/// Contract of the 2D drawing context the engine renders through.
///
/// Destination rectangles are screen pixels and source rectangles are atlas
/// pixels, both with a top-left origin.
pub trait RasterBackend {
    /// Decode an image from disk into an atlas.
    fn load_atlas(&mut self, path: &Path) -> Result<AtlasHandle>;

    /// Free an atlas. Unknown handles are ignored.
    fn release(&mut self, atlas: AtlasHandle);

    /// Pixel size of a loaded atlas.
    fn atlas_size(&self, atlas: AtlasHandle) -> Option<(u32, u32)>;

    /// Start a frame cleared to `clear`.
    fn begin_frame(&mut self, clear: Color) -> Result<()>;

    /// Blit `src` of `atlas` into `dst`.
    fn draw_bitmap(
        &mut self,
        atlas: AtlasHandle,
        dst: Rect,
        src: Rect,
        opacity: f32,
        nearest: bool,
    );

    /// Fill or stroke an axis-aligned rectangle.
    fn draw_rect(&mut self, rect: Rect, color: Color, opacity: f32, filled: bool);

    /// Lay out `text` inside `rect`.
    fn draw_text(&mut self, text: &str, format: &TextFormat, rect: Rect, color: Color);

    /// Submit and present the frame.
    fn end_frame(&mut self) -> Result<()>;

    /// React to a window resize.
    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Current drawable size in pixels.
    fn surface_size(&self) -> (u32, u32);
}
