//! Bitmap-font text built from letter sprites.

use crate::math::Vec2;
use crate::render::{draw_bitmap, AtlasHandle, Bitmap, RasterBackend};

/// Horizontal advance between two letters, in pixels.
pub const LETTER_SPACE: f32 = 12.0;

/// Vertical distance between two screen-print rows.
pub const LINE_HEIGHT: f32 = 20.0;

/// Atlas slot of a character in the monospace font atlas.
///
/// Returns `None` for characters drawn as whitespace. Characters the font has
/// no glyph for fall back to slot 0.
pub fn letter_slot(ch: char) -> Option<u32> {
    match ch.to_ascii_lowercase() {
        ' ' | '_' => None,
        c @ 'a'..='z' => Some(c as u32 - 'a' as u32 + 1),
        '.' => Some(27),
        ',' => Some(28),
        '?' => Some(29),
        '!' => Some(30),
        _ => Some(0),
    }
}

/// A monospace font atlas laid out as a grid of equally sized glyph slots.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontAtlas {
    pub atlas: Option<AtlasHandle>,
    pub glyph_size: Vec2,
    pub columns: u32,
}

impl FontAtlas {
    pub fn new(atlas: Option<AtlasHandle>, glyph_size: Vec2, columns: u32) -> Self {
        Self {
            atlas,
            glyph_size,
            columns: columns.max(1),
        }
    }

    fn letter(&self, slot: u32) -> Bitmap {
        Bitmap::from_slot(
            self.atlas,
            self.glyph_size,
            slot % self.columns,
            slot / self.columns,
        )
    }
}

impl Default for FontAtlas {
    fn default() -> Self {
        Self::new(None, Vec2::new(16.0, 16.0), 31)
    }
}

/// A string composited from letter bitmaps.
#[derive(Clone, Debug, PartialEq)]
pub struct Text {
    content: String,
    location: Vec2,
    letters: Vec<(usize, Bitmap)>,
    hidden: bool,
}

impl Text {
    pub fn new(font: &FontAtlas, content: &str, location: Vec2) -> Self {
        let letters = content
            .chars()
            .enumerate()
            .filter_map(|(column, ch)| letter_slot(ch).map(|slot| (column, font.letter(slot))))
            .collect();

        let mut text = Self {
            content: content.to_string(),
            location,
            letters,
            hidden: false,
        };
        text.set_location(location);
        text
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn location(&self) -> Vec2 {
        self.location
    }

    pub fn set_location(&mut self, location: Vec2) {
        self.location = location;
        for (column, letter) in &mut self.letters {
            letter.location = location + Vec2::new(*column as f32 * LETTER_SPACE, 0.0);
        }
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Letter bitmaps, whitespace excluded.
    pub fn letters(&self) -> impl Iterator<Item = &Bitmap> {
        self.letters.iter().map(|(_, letter)| letter)
    }

    pub fn draw(&self, backend: &mut dyn RasterBackend) {
        if self.hidden {
            return;
        }
        for letter in self.letters() {
            draw_bitmap(backend, letter);
        }
    }
}

/// On-screen debug printing: each print appends a row below the previous one.
#[derive(Clone, Debug)]
pub struct ScreenPrinter {
    font: FontAtlas,
    origin: Vec2,
    rows: Vec<Text>,
}

impl ScreenPrinter {
    pub fn new(font: FontAtlas) -> Self {
        Self {
            font,
            origin: Vec2::new(8.0, 8.0),
            rows: Vec::new(),
        }
    }

    pub fn print(&mut self, message: &str) {
        let location = self.origin + Vec2::new(0.0, self.rows.len() as f32 * LINE_HEIGHT);
        self.rows.push(Text::new(&self.font, message, location));
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn rows(&self) -> &[Text] {
        &self.rows
    }

    pub fn set_font(&mut self, font: FontAtlas) {
        self.font = font;
    }

    pub fn draw(&self, backend: &mut dyn RasterBackend) {
        for row in &self.rows {
            row.draw(backend);
        }
    }
}

impl Default for ScreenPrinter {
    fn default() -> Self {
        Self::new(FontAtlas::default())
    }
}
