use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::collision::CollisionKind;
use crate::error::EngineError;
use crate::math::{Rect, Vec2};
use crate::render::{AtlasHandle, RasterBackend, RENDER_LAYER_MAX};

/// Identifier of a registry entry; always non-negative.
pub type AssetId = u32;

/// Where an asset's editor thumbnail sits in its atlas.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct ThumbnailSlot {
    pub slot_height: f32,
    #[serde(default)]
    pub row: u32,
}

/// Describes how to create one class of game object.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AssetEntry {
    /// Atlas image path; also the thumbnail source.
    pub path: PathBuf,
    pub slot: Vec2,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub render_layer: u8,
    /// Install the default collision outside the editor too.
    #[serde(default)]
    pub runtime_collision: bool,
    #[serde(default)]
    pub collision_kind: CollisionKind,
    pub thumbnail: Option<ThumbnailSlot>,
    /// Editor marker whose location the player starts from.
    #[serde(default)]
    pub player_start: bool,
}

impl AssetEntry {
    pub fn new(path: impl Into<PathBuf>, slot: Vec2) -> Self {
        Self {
            path: path.into(),
            slot,
            column: 0,
            row: 0,
            render_layer: 0,
            runtime_collision: false,
            collision_kind: CollisionKind::Block,
            thumbnail: None,
            player_start: false,
        }
    }

    #[must_use]
    pub fn with_slot_index(mut self, column: u32, row: u32) -> Self {
        self.column = column;
        self.row = row;
        self
    }

    #[must_use]
    pub fn with_render_layer(mut self, layer: u8) -> Self {
        self.render_layer = layer.min(RENDER_LAYER_MAX);
        self
    }

    #[must_use]
    pub fn with_runtime_collision(mut self, enabled: bool) -> Self {
        self.runtime_collision = enabled;
        self
    }

    #[must_use]
    pub fn with_collision_kind(mut self, kind: CollisionKind) -> Self {
        self.collision_kind = kind;
        self
    }

    #[must_use]
    pub fn with_thumbnail(mut self, slot_height: f32, row: u32) -> Self {
        self.thumbnail = Some(ThumbnailSlot { slot_height, row });
        self
    }

    #[must_use]
    pub fn as_player_start(mut self) -> Self {
        self.player_start = true;
        self
    }

    /// Source window of the object's sprite on its atlas.
    pub fn source_rect(&self) -> Rect {
        Rect::new(
            Vec2::new(self.slot.x * self.column as f32, self.slot.y * self.row as f32),
            self.slot,
        )
    }

    /// Source window used for the asset-browser thumbnail.
    ///
    /// Without explicit thumbnail metadata the sprite slot itself is used.
    pub fn thumbnail_rect(&self) -> Rect {
        match self.thumbnail {
            Some(thumb) => Rect::new(
                Vec2::new(0.0, thumb.slot_height * thumb.row as f32),
                Vec2::new(thumb.slot_height, thumb.slot_height),
            ),
            None => self.source_rect(),
        }
    }
}

#[derive(Deserialize)]
struct Manifest {
    assets: Vec<ManifestAsset>,
}

#[derive(Deserialize)]
struct ManifestAsset {
    id: AssetId,
    #[serde(flatten)]
    entry: AssetEntry,
}

/// Mapping from asset id to entry, configured before any level loads.
///
/// Entries iterate in ascending id order, which is also the asset-browser order.
#[derive(Clone, Debug, Default)]
pub struct AssetRegistry {
    entries: BTreeMap<AssetId, AssetEntry>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an entry.
    pub fn register(&mut self, id: AssetId, mut entry: AssetEntry) {
        entry.render_layer = entry.render_layer.min(RENDER_LAYER_MAX);
        if self.entries.insert(id, entry).is_some() {
            log::debug!("asset {id} re-registered");
        }
    }

    pub fn get(&self, id: AssetId) -> Option<&AssetEntry> {
        self.entries.get(&id)
    }

    /// Look up an entry, failing with [`EngineError::UnknownAsset`].
    pub fn entry(&self, id: AssetId) -> Result<&AssetEntry> {
        self.entries
            .get(&id)
            .ok_or_else(|| EngineError::UnknownAsset(id).into())
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetId, &AssetEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    /// Merge entries from a JSON manifest of the form
    /// `{"assets": [{"id": 1, "path": "...", "slot": {"x": 32, "y": 32}, ...}]}`.
    pub fn load_manifest_str(&mut self, json: &str) -> Result<usize> {
        let manifest: Manifest =
            serde_json::from_str(json).context("failed to parse asset manifest")?;
        let count = manifest.assets.len();
        for asset in manifest.assets {
            self.register(asset.id, asset.entry);
        }
        Ok(count)
    }

    /// Merge entries from a manifest file; relative atlas paths resolve
    /// against the manifest's directory.
    pub fn load_manifest(&mut self, path: &Path) -> Result<usize> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut staged = AssetRegistry::new();
        let count = staged.load_manifest_str(&json)?;
        for (id, mut entry) in staged.entries {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
            self.register(id, entry);
        }
        log::info!("loaded {count} assets from {}", path.display());
        Ok(count)
    }
}

/// Lazily created atlases, keyed by image path.
///
/// A failed load is cached as `None` so the warning is logged once and every
/// bitmap using that atlas is skipped at draw time.
#[derive(Default)]
pub struct AtlasCache {
    atlases: HashMap<PathBuf, Option<AtlasHandle>>,
}

impl AtlasCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the atlas for `path`, loading it on first reference.
    pub fn atlas(&mut self, backend: &mut dyn RasterBackend, path: &Path) -> Option<AtlasHandle> {
        if let Some(cached) = self.atlases.get(path) {
            return *cached;
        }

        let handle = match backend.load_atlas(path) {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::warn!("{}", EngineError::ResourceMissing { path: path.to_path_buf() });
                log::debug!("atlas load error: {err:?}");
                None
            }
        };
        self.atlases.insert(path.to_path_buf(), handle);
        handle
    }

    /// Drop the cached atlas (releasing it) and load it again.
    pub fn reload(&mut self, backend: &mut dyn RasterBackend, path: &Path) -> Option<AtlasHandle> {
        if let Some(Some(old)) = self.atlases.remove(path) {
            backend.release(old);
        }
        self.atlas(backend, path)
    }

    /// Check if an atlas was already requested (loaded or not).
    pub fn is_cached(&self, path: &Path) -> bool {
        self.atlases.contains_key(path)
    }

    /// Release every atlas; called at shutdown.
    pub fn release_all(&mut self, backend: &mut dyn RasterBackend) {
        for handle in self.atlases.drain().filter_map(|(_, handle)| handle) {
            backend.release(handle);
        }
    }
}
