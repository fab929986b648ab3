use std::path::PathBuf;

use thiserror::Error;

use crate::assets::AssetId;

/// Errors surfaced by the engine through return values.
///
/// Engine APIs return `anyhow::Result`; these variants are wrapped inside and
/// can be recovered with `downcast_ref::<EngineError>()`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("resource missing: {}", path.display())]
    ResourceMissing { path: PathBuf },

    #[error("unknown asset id {0}")]
    UnknownAsset(AssetId),

    #[error("malformed level line {line}: {content:?}")]
    MalformedLevelLine { line: usize, content: String },

    #[error("handle refers to a destroyed {0}")]
    StaleHandle(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
