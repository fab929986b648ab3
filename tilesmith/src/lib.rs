//! Tilesmith - a 2D tile and sprite engine with an in-process level editor.
//!
//! Games register assets, install a spawn callback that attaches behaviors,
//! and hand control to [`Engine::run`]. The same [`EngineContext`] drives
//! a headless [`render::RecordingBackend`] in tests.

pub mod arena;
pub mod assets;
pub mod collision;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod input;
pub mod level;
pub mod math;
pub mod movement;
pub mod object;
pub mod render;
pub mod text;
pub mod time;
pub mod world;

pub use crate::assets::{AssetEntry, AssetId, AssetRegistry};
pub use crate::collision::{Collider, ColliderId, CollisionKind, OverlapEvent};
pub use crate::config::EngineConfig;
pub use crate::editor::{Editor, EditorMode};
pub use crate::engine::{Engine, EngineContext, Game};
pub use crate::error::EngineError;
pub use crate::input::{keys, InputState, KeyCode, MouseButton};
pub use crate::level::LoadMode;
pub use crate::math::{Color, Rect, Vec2};
pub use crate::movement::{Movement, Side};
pub use crate::object::{Capabilities, ObjectBehavior, ObjectContext, ObjectId};
pub use crate::render::{Bitmap, RasterBackend};
pub use crate::world::{RelationTarget, World};
