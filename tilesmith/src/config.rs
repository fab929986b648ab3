use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::EngineError;
use crate::math::Color;

/// Name of the flag file read from the content root.
pub const CONFIG_FILE: &str = "EngineConfig.txt";

/// Configuration values for the engine window and runtime behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// Target frame rate used by the frame pacer.
    pub fps: u32,
    /// Draw collider outlines, editor hit boxes and screen prints.
    pub debug_mode: bool,
    /// Start in the level editor instead of playing right away.
    pub editor_mode: bool,
    /// Gizmo grid size in pixels.
    pub snap_size: f32,
    pub clear_color: Color,
    /// Directory that `EngineContent/` and game content paths resolve against.
    pub content_root: PathBuf,
    /// Level opened and saved by the editor buttons when no other is active.
    pub level_path: PathBuf,
    /// TrueType font used for legend and label text.
    pub font_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Tilesmith Game".into(),
            width: 1280,
            height: 720,
            vsync: true,
            fps: 60,
            debug_mode: false,
            editor_mode: false,
            snap_size: 32.0,
            clear_color: Color::rgb(0.1, 0.1, 0.12),
            content_root: PathBuf::from("."),
            level_path: PathBuf::from("Game/Levels/Level.txt"),
            font_path: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Override the initial window size in logical pixels.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    #[must_use]
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    #[must_use]
    pub fn with_editor(mut self, editor_mode: bool) -> Self {
        self.editor_mode = editor_mode;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    #[must_use]
    pub fn with_snap_size(mut self, snap_size: f32) -> Self {
        self.snap_size = snap_size;
        self
    }

    #[must_use]
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color.clamped();
        self
    }

    #[must_use]
    pub fn with_content_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.content_root = root.into();
        self
    }

    #[must_use]
    pub fn with_level_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.level_path = path.into();
        self
    }

    #[must_use]
    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Resolve a content-relative path against the content root.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.content_root.join(relative)
        }
    }

    /// Target frame interval in seconds.
    pub fn frame_interval(&self) -> f32 {
        1.0 / self.fps.max(1) as f32
    }

    /// Apply the flag file at `path`. A missing file keeps the current values.
    pub fn load_flags(&mut self, path: &Path) -> Result<()> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!("{} not found, using defaults", path.display());
                return Ok(());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };

        for (number, line) in contents.lines().enumerate() {
            if let Err(err) = self.apply_line(line) {
                log::warn!("{}:{}: {err}", path.display(), number + 1);
            }
        }
        Ok(())
    }

    /// Apply one flag line. Blank lines and `#` comments are accepted and ignored.
    pub fn apply_line(&mut self, line: &str) -> Result<(), EngineError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        match line {
            "DebugModeTrue" => self.debug_mode = true,
            "DebugModeFalse" => self.debug_mode = false,
            "EditorModeTrue" => self.editor_mode = true,
            "EditorModeFalse" => self.editor_mode = false,
            other => return Err(EngineError::InvalidConfig(format!("unknown flag {other:?}"))),
        }
        Ok(())
    }
}
