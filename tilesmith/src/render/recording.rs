use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;

use crate::error::EngineError;
use crate::math::{Color, Rect};
use crate::render::{AtlasHandle, RasterBackend, TextFormat};

/// One call made against a [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Bitmap {
        atlas: AtlasHandle,
        dst: Rect,
        src: Rect,
        opacity: f32,
        nearest: bool,
    },
    Rect {
        rect: Rect,
        color: Color,
        opacity: f32,
        filled: bool,
    },
    Text {
        text: String,
        rect: Rect,
        color: Color,
    },
    Present,
    Release(AtlasHandle),
}

/// Shared view of the recorded command stream.
pub type DrawLog = Rc<RefCell<Vec<DrawCommand>>>;

/// Headless backend that records draw calls instead of rasterizing them.
///
/// Every path loads successfully unless marked missing with
/// [`RecordingBackend::with_missing`]. The log is shared, so callers can keep a
/// [`DrawLog`] after handing the backend to an engine context.
pub struct RecordingBackend {
    log: DrawLog,
    missing: HashSet<PathBuf>,
    atlases: HashMap<AtlasHandle, PathBuf>,
    next_id: u32,
    loads: usize,
    size: (u32, u32),
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            missing: HashSet::new(),
            atlases: HashMap::new(),
            next_id: 1,
            loads: 0,
            size: (1280, 720),
        }
    }

    /// Make loads of `path` fail as if the file did not exist.
    #[must_use]
    pub fn with_missing(mut self, path: impl Into<PathBuf>) -> Self {
        self.missing.insert(path.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn log(&self) -> DrawLog {
        Rc::clone(&self.log)
    }

    /// Number of successful atlas loads.
    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Path an atlas was loaded from.
    pub fn atlas_path(&self, atlas: AtlasHandle) -> Option<&Path> {
        self.atlases.get(&atlas).map(PathBuf::as_path)
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterBackend for RecordingBackend {
    fn load_atlas(&mut self, path: &Path) -> Result<AtlasHandle> {
        if self.missing.contains(path) {
            return Err(EngineError::ResourceMissing {
                path: path.to_path_buf(),
            }
            .into());
        }
        let handle = AtlasHandle(self.next_id);
        self.next_id += 1;
        self.loads += 1;
        self.atlases.insert(handle, path.to_path_buf());
        Ok(handle)
    }

    fn release(&mut self, atlas: AtlasHandle) {
        if self.atlases.remove(&atlas).is_some() {
            self.log.borrow_mut().push(DrawCommand::Release(atlas));
        }
    }

    fn atlas_size(&self, atlas: AtlasHandle) -> Option<(u32, u32)> {
        self.atlases.contains_key(&atlas).then_some((256, 256))
    }

    fn begin_frame(&mut self, clear: Color) -> Result<()> {
        self.log.borrow_mut().push(DrawCommand::Clear(clear));
        Ok(())
    }

    fn draw_bitmap(
        &mut self,
        atlas: AtlasHandle,
        dst: Rect,
        src: Rect,
        opacity: f32,
        nearest: bool,
    ) {
        self.log.borrow_mut().push(DrawCommand::Bitmap {
            atlas,
            dst,
            src,
            opacity,
            nearest,
        });
    }

    fn draw_rect(&mut self, rect: Rect, color: Color, opacity: f32, filled: bool) {
        self.log.borrow_mut().push(DrawCommand::Rect {
            rect,
            color,
            opacity,
            filled,
        });
    }

    fn draw_text(&mut self, text: &str, _format: &TextFormat, rect: Rect, color: Color) {
        self.log.borrow_mut().push(DrawCommand::Text {
            text: text.to_string(),
            rect,
            color,
        });
    }

    fn end_frame(&mut self) -> Result<()> {
        self.log.borrow_mut().push(DrawCommand::Present);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }
}

/// Commands of the most recent complete or in-progress frame.
pub fn last_frame(log: &DrawLog) -> Vec<DrawCommand> {
    let log = log.borrow();
    let start = log
        .iter()
        .rposition(|cmd| matches!(cmd, DrawCommand::Clear(_)))
        .unwrap_or(0);
    log[start..].to_vec()
}
