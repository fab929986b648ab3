//! Game objects and the capability hooks behaviors plug into.

use std::path::Path;

use crate::arena::Handle;
use crate::assets::AssetId;
use crate::collision::ColliderId;
use crate::input::{InputState, KeyCode, MouseButton};
use crate::math::Vec2;
use crate::render::{Bitmap, RasterBackend};
use crate::text::ScreenPrinter;
use crate::world::World;

pub type ObjectId = Handle<GameObject>;
pub type BitmapId = Handle<Bitmap>;

/// World-space placement of an object. There is no rotation or scale.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub location: Vec2,
}

/// Listener sequences a behavior wants to be registered in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub update: bool,
    pub input: bool,
    pub render: bool,
    pub game_state: bool,
}

impl Capabilities {
    pub const NONE: Self = Self {
        update: false,
        input: false,
        render: false,
        game_state: false,
    };

    #[must_use]
    pub const fn with_update(mut self) -> Self {
        self.update = true;
        self
    }

    #[must_use]
    pub const fn with_input(mut self) -> Self {
        self.input = true;
        self
    }

    #[must_use]
    pub const fn with_render(mut self) -> Self {
        self.render = true;
        self
    }

    #[must_use]
    pub const fn with_game_state(mut self) -> Self {
        self.game_state = true;
        self
    }
}

/// What a hook may touch while it runs.
///
/// Spawns and deletes requested here are queued and applied by the engine
/// once the current phase finishes.
pub struct ObjectContext<'a> {
    /// The object whose hook is running.
    pub id: ObjectId,
    pub world: &'a mut World,
    pub input: &'a InputState,
    pub printer: &'a mut ScreenPrinter,
    pub game_running: bool,
}

impl ObjectContext<'_> {
    pub fn location(&self) -> Vec2 {
        self.world.object_location(self.id).unwrap_or_default()
    }

    pub fn set_location(&mut self, location: Vec2) {
        self.world.set_object_location(self.id, location);
    }

    pub fn spawn(&mut self, asset_id: AssetId, location: Vec2) {
        self.world.queue_spawn(asset_id, location);
    }

    pub fn delete(&mut self, id: ObjectId) {
        self.world.queue_delete(id);
    }

    pub fn delete_self(&mut self) {
        self.world.queue_delete(self.id);
    }

    pub fn print(&mut self, message: &str) {
        self.printer.print(message);
    }
}

/// Per-object game logic.
///
/// Every hook has a no-op default; a behavior overrides the ones it cares
/// about and declares in [`ObjectBehavior::capabilities`] which per-frame,
/// input, render and game-state sequences it joins.
pub trait ObjectBehavior {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    fn on_created(&mut self, _ctx: &mut ObjectContext<'_>) {}

    fn on_deleted(&mut self, _ctx: &mut ObjectContext<'_>) {}

    /// A collider of this object started overlapping `other_tag`.
    fn on_begin_overlap(
        &mut self,
        _ctx: &mut ObjectContext<'_>,
        _own_tag: i32,
        _other_tag: i32,
        _other: Option<ObjectId>,
    ) {
    }

    fn on_end_overlap(&mut self, _ctx: &mut ObjectContext<'_>, _own_tag: i32, _other_tag: i32) {}

    fn update(&mut self, _ctx: &mut ObjectContext<'_>, _dt: f32) {}

    fn on_key(&mut self, _ctx: &mut ObjectContext<'_>, _key: KeyCode, _pressed: bool) {}

    fn on_mouse(&mut self, _ctx: &mut ObjectContext<'_>, _button: MouseButton, _pressed: bool) {}

    /// Draw on top of the world layers.
    fn on_render(&self, _world: &World, _backend: &mut dyn RasterBackend) {}

    fn on_game_start(&mut self, _ctx: &mut ObjectContext<'_>) {}

    fn on_game_stop(&mut self, _ctx: &mut ObjectContext<'_>) {}

    fn on_level_activated(&mut self, _ctx: &mut ObjectContext<'_>, _level: &Path) {}
}

/// An object placed in the world from an asset registry entry.
pub struct GameObject {
    pub asset_id: AssetId,
    pub transform: Transform,
    /// Sprite slot size; also the default collision size.
    pub size: Vec2,
    pub bitmap: BitmapId,
    /// Default collision, present in the editor or when the asset asks for it.
    pub collision: Option<ColliderId>,
    pub player_start: bool,
    pub(crate) capabilities: Capabilities,
    pub(crate) behavior: Option<Box<dyn ObjectBehavior>>,
}

impl GameObject {
    pub fn location(&self) -> Vec2 {
        self.transform.location
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }
}

impl std::fmt::Debug for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObject")
            .field("asset_id", &self.asset_id)
            .field("location", &self.transform.location)
            .field("bitmap", &self.bitmap)
            .field("collision", &self.collision)
            .field("player_start", &self.player_start)
            .finish_non_exhaustive()
    }
}
