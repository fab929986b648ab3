use std::ops::Range;

use crate::math::{Rect, Vec2};

pub const COLUMNS: usize = 3;
pub const ROWS: usize = 9;
/// Thumbnails per page.
pub const PAGE_SIZE: usize = COLUMNS * ROWS;

const GRID_ORIGIN: Vec2 = Vec2 { x: 976.0, y: 96.0 };
const CELL: Vec2 = Vec2 { x: 72.0, y: 64.0 };
const THUMBNAIL: f32 = 56.0;

/// Paging window over the flat list of asset buttons.
///
/// Keeps `min <= max <= count` and `max - min <= PAGE_SIZE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetBrowser {
    count: usize,
    min: usize,
    max: usize,
}

impl AssetBrowser {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            min: 0,
            max: count.min(PAGE_SIZE),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn window(&self) -> Range<usize> {
        self.min..self.max
    }

    pub fn contains(&self, index: usize) -> bool {
        self.window().contains(&index)
    }

    pub fn has_next(&self) -> bool {
        self.max < self.count
    }

    pub fn has_previous(&self) -> bool {
        self.min > 0
    }

    /// Advance one page; returns false when already on the last page.
    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.min = (self.min + PAGE_SIZE).min(self.count);
        self.max = (self.min + PAGE_SIZE).min(self.count);
        true
    }

    /// Go back one page; returns false when already on the first page.
    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.min = self.min.saturating_sub(PAGE_SIZE);
        self.max = (self.min + PAGE_SIZE).min(self.count);
        true
    }

    /// Thumbnail rectangle of asset `index`, if it is on the current page.
    pub fn cell_rect(&self, index: usize) -> Option<Rect> {
        if !self.contains(index) {
            return None;
        }
        Some(grid_cell(index - self.min))
    }
}

/// Thumbnail rectangle of the `local`-th cell of a page.
pub fn grid_cell(local: usize) -> Rect {
    let local = local % PAGE_SIZE;
    let (column, row) = (local % COLUMNS, local / COLUMNS);
    let cell = GRID_ORIGIN + Vec2::new(CELL.x * column as f32, CELL.y * row as f32);
    let inset = Vec2::new((CELL.x - THUMBNAIL) / 2.0, (CELL.y - THUMBNAIL) / 2.0);
    Rect::new(cell + inset, Vec2::new(THUMBNAIL, THUMBNAIL))
}
