//! In-process level editor: mode tabs, asset browser, render-layer toggles,
//! play/stop and the transform gizmo.
//!
//! Every widget is a bitmap plus a collider in the world's editor sequences.
//! Which widgets are shown is recomputed from the editor state each time the
//! state changes, so the visible UI is always a function of
//! `(mode, visible, playing, dirty, page, layer visibility)`.

mod browser;
mod gizmo;

use std::path::{Path, PathBuf};

pub use browser::{grid_cell, AssetBrowser, COLUMNS, PAGE_SIZE, ROWS};
pub use gizmo::{Gizmo, GIZMO_SIZE};

use crate::assets::{AssetId, AssetRegistry};
use crate::collision::{Collider, ColliderId};
use crate::math::{Color, Rect, Vec2};
use crate::object::{BitmapId, ObjectId};
use crate::render::{
    AtlasHandle, Bitmap, RasterBackend, TextFormat, RENDER_LAYER_COUNT, RENDER_LAYER_MAX,
};
use crate::text::{FontAtlas, Text};
use crate::world::World;

pub const OVERLAY_PATH: &str = "EngineContent/LevelEditor/Overlay.png";
pub const BUTTON_PATH: &str = "EngineContent/LevelEditor/Button.png";
pub const EYE_PATH: &str = "EngineContent/LevelEditor/Eye.png";
pub const GIZMO_PATH: &str = "EngineContent/LevelEditor/Gizmo.png";

/// Right-hand panel covered by the overlay.
pub const PANEL: Rect = Rect {
    location: Vec2 { x: 960.0, y: 0.0 },
    size: Vec2 { x: 320.0, y: 720.0 },
};

const BUTTON_SIZE: Vec2 = Vec2 { x: 96.0, y: 32.0 };
const EYE_SIZE: Vec2 = Vec2 { x: 32.0, y: 32.0 };
const COLUMN_X: [f32; 3] = [968.0, 1072.0, 1176.0];
const TAB_Y: f32 = 8.0;
const FILE_ROW_Y: f32 = 48.0;
const PAGE_ROW_Y: f32 = 680.0;
const LAYER_ROW_Y: f32 = 96.0;
const LAYER_ROW_HEIGHT: f32 = 48.0;
const LEGEND_X: f32 = 976.0;
const EYE_X: f32 = 1200.0;
const LABEL_INSET: Vec2 = Vec2 { x: 8.0, y: 8.0 };

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditorMode {
    #[default]
    None,
    AssetBrowser,
    RenderLayer,
    ViewMode,
}

/// What a button does when clicked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    Mode(EditorMode),
    Save,
    Open,
    Play,
    Stop,
    PreviousPage,
    NextPage,
    Asset(AssetId),
    LayerEye(u8),
}

impl ButtonAction {
    /// Reserved negative collision tag carried by the button's collider.
    pub fn tag(self) -> i32 {
        match self {
            ButtonAction::Mode(EditorMode::AssetBrowser) => -1,
            ButtonAction::Mode(EditorMode::RenderLayer) => -2,
            ButtonAction::Mode(EditorMode::ViewMode) => -3,
            ButtonAction::Mode(EditorMode::None) => -4,
            ButtonAction::Save => -5,
            ButtonAction::Open => -6,
            ButtonAction::Play => -7,
            ButtonAction::Stop => -8,
            ButtonAction::PreviousPage => -9,
            ButtonAction::NextPage => -10,
            ButtonAction::LayerEye(row) => -20 - i32::from(row),
            ButtonAction::Asset(id) => {
                (-1000i32).saturating_sub(i32::try_from(id).unwrap_or(i32::MAX))
            }
        }
    }

    fn label(self) -> Option<&'static str> {
        match self {
            ButtonAction::Mode(EditorMode::AssetBrowser) => Some("assets"),
            ButtonAction::Mode(EditorMode::RenderLayer) => Some("layers"),
            ButtonAction::Mode(EditorMode::ViewMode) => Some("view"),
            ButtonAction::Save => Some("save"),
            ButtonAction::Open => Some("open"),
            ButtonAction::Play => Some("play"),
            ButtonAction::Stop => Some("stop"),
            ButtonAction::PreviousPage => Some("prev"),
            ButtonAction::NextPage => Some("next"),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    Default,
    /// Drawn pressed-in and ignores clicks.
    Disabled,
    Hidden,
}

/// Requests the editor cannot satisfy on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorCommand {
    Spawn(AssetId),
    Save,
    Open,
    Play,
    Stop,
}

#[derive(Debug)]
struct Button {
    action: ButtonAction,
    rect: Rect,
    bitmap: BitmapId,
    collider: ColliderId,
    /// Source window of the default look; the pressed look is the next row.
    source: Rect,
    label: Option<Text>,
    state: ButtonState,
}

/// Atlas lookups the editor needs while building its widgets.
pub trait AtlasSource {
    fn ui_atlas(&mut self, relative: &str) -> Option<AtlasHandle>;
    fn asset_atlas(&mut self, path: &Path) -> Option<AtlasHandle>;
}

/// Editor state machine.
#[derive(Debug)]
pub struct Editor {
    mode: EditorMode,
    visible: bool,
    playing: bool,
    dirty: bool,
    level_path: Option<PathBuf>,
    overlay: BitmapId,
    buttons: Vec<Button>,
    browser: AssetBrowser,
    layer_visible: [bool; RENDER_LAYER_COUNT],
    gizmo: Gizmo,
    legend_format: TextFormat,
}

impl Editor {
    /// Build every widget. `mouse` is the engine's cursor collider.
    pub fn new(
        world: &mut World,
        registry: &AssetRegistry,
        atlases: &mut dyn AtlasSource,
        font: &FontAtlas,
        mouse: ColliderId,
        snap: f32,
    ) -> Self {
        let overlay_atlas = atlases.ui_atlas(OVERLAY_PATH);
        let overlay = world.add_editor_bitmap(
            Bitmap::new(overlay_atlas, Rect::new(Vec2::ZERO, PANEL.size)).at(PANEL.location),
        );

        let button_atlas = atlases.ui_atlas(BUTTON_PATH);
        let eye_atlas = atlases.ui_atlas(EYE_PATH);
        let mut buttons = Vec::new();
        let mut add = |world: &mut World, action: ButtonAction, rect: Rect, atlas, source: Rect| {
            let label = action
                .label()
                .map(|label| Text::new(font, label, rect.location + LABEL_INSET));
            buttons.push(Button {
                action,
                rect,
                bitmap: world.add_editor_bitmap(
                    Bitmap::new(atlas, source).at(rect.location).with_size(rect.size),
                ),
                collider: world.add_editor_collider(
                    Collider::new(rect.size, action.tag()).at(rect.location),
                ),
                source,
                label,
                state: ButtonState::Default,
            });
        };

        let button_source = Rect::new(Vec2::ZERO, BUTTON_SIZE);
        let fixed = [
            (ButtonAction::Mode(EditorMode::AssetBrowser), COLUMN_X[0], TAB_Y),
            (ButtonAction::Mode(EditorMode::RenderLayer), COLUMN_X[1], TAB_Y),
            (ButtonAction::Mode(EditorMode::ViewMode), COLUMN_X[2], TAB_Y),
            (ButtonAction::Save, COLUMN_X[0], FILE_ROW_Y),
            (ButtonAction::Open, COLUMN_X[1], FILE_ROW_Y),
            (ButtonAction::Play, COLUMN_X[2], FILE_ROW_Y),
            (ButtonAction::Stop, COLUMN_X[2], FILE_ROW_Y),
            (ButtonAction::PreviousPage, COLUMN_X[0], PAGE_ROW_Y),
            (ButtonAction::NextPage, COLUMN_X[2], PAGE_ROW_Y),
        ];
        for (action, x, y) in fixed {
            let rect = Rect::new(Vec2::new(x, y), BUTTON_SIZE);
            add(world, action, rect, button_atlas, button_source);
        }

        for (index, (id, entry)) in registry.iter().enumerate() {
            let atlas = atlases.asset_atlas(&entry.path);
            add(world, ButtonAction::Asset(id), grid_cell(index), atlas, entry.thumbnail_rect());
        }

        for row in 0..=RENDER_LAYER_MAX {
            let rect = Rect::new(Vec2::new(EYE_X, layer_row_y(row)), EYE_SIZE);
            let source = Rect::new(Vec2::ZERO, EYE_SIZE);
            add(world, ButtonAction::LayerEye(row), rect, eye_atlas, source);
        }

        let gizmo_atlas = atlases.ui_atlas(GIZMO_PATH);
        let gizmo = Gizmo::new(world, gizmo_atlas, mouse, snap);

        let mut editor = Self {
            mode: EditorMode::None,
            visible: true,
            playing: false,
            dirty: false,
            level_path: None,
            overlay,
            buttons,
            browser: AssetBrowser::new(registry.len()),
            layer_visible: [true; RENDER_LAYER_COUNT],
            gizmo,
            legend_format: TextFormat::default(),
        };
        editor.refresh(world);
        editor
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn level_path(&self) -> Option<&Path> {
        self.level_path.as_deref()
    }

    pub fn set_level_path(&mut self, path: impl Into<PathBuf>) {
        self.level_path = Some(path.into());
    }

    pub fn browser(&self) -> &AssetBrowser {
        &self.browser
    }

    pub fn gizmo(&self) -> &Gizmo {
        &self.gizmo
    }

    pub fn is_layer_visible(&self, layer: u8) -> bool {
        self.layer_visible
            .get(usize::from(layer))
            .copied()
            .unwrap_or(true)
    }

    pub fn overlay_visible(&self, world: &World) -> bool {
        world.bitmap(self.overlay).is_some_and(|bitmap| !bitmap.suppressed)
    }

    /// Screen rectangle of the first button bound to `action`.
    pub fn button_rect(&self, action: ButtonAction) -> Option<Rect> {
        self.button(action).map(|button| button.rect)
    }

    pub fn button_state(&self, action: ButtonAction) -> Option<ButtonState> {
        self.button(action).map(|button| button.state)
    }

    fn button(&self, action: ButtonAction) -> Option<&Button> {
        self.buttons.iter().find(|button| button.action == action)
    }

    // State transitions.

    pub fn set_mode(&mut self, world: &mut World, mode: EditorMode) {
        if self.mode != mode {
            log::info!("editor mode {:?} -> {mode:?}", self.mode);
        }
        self.mode = mode;
        self.refresh(world);
    }

    /// Show or hide the editor UI. Ignored while playing.
    pub fn toggle_visible(&mut self, world: &mut World) {
        if self.playing {
            return;
        }
        self.visible = !self.visible;
        self.refresh(world);
    }

    pub fn mark_dirty(&mut self, world: &mut World) {
        if !self.dirty {
            self.dirty = true;
            self.refresh(world);
        }
    }

    pub fn mark_saved(&mut self, world: &mut World) {
        self.dirty = false;
        self.refresh(world);
    }

    pub fn next_page(&mut self, world: &mut World) {
        if self.browser.next() {
            self.refresh(world);
        }
    }

    pub fn previous_page(&mut self, world: &mut World) {
        if self.browser.previous() {
            self.refresh(world);
        }
    }

    /// Flip a render layer's visibility and apply it to every object on it.
    pub fn toggle_layer(&mut self, world: &mut World, layer: u8) {
        let Some(visible) = self.layer_visible.get_mut(usize::from(layer)) else {
            return;
        };
        *visible = !*visible;
        log::info!("render layer {layer} visible: {}", *visible);

        for id in world.object_ids() {
            if object_layer(world, id) == Some(layer) {
                self.apply_object_state(world, id);
            }
        }
        if self.gizmo.selected().is_some_and(|id| object_layer(world, id) == Some(layer)) {
            self.gizmo.reset(world);
        }
        self.refresh(world);
    }

    /// Enter play mode: hide edit-only collisions, player-start markers and
    /// every widget but Stop.
    pub fn play(&mut self, world: &mut World) {
        if self.playing {
            return;
        }
        self.playing = true;
        self.gizmo.reset(world);
        for id in world.object_ids() {
            self.apply_object_state(world, id);
        }
        self.refresh(world);
    }

    /// Leave play mode and restore the last active mode.
    pub fn stop(&mut self, world: &mut World) {
        if !self.playing {
            return;
        }
        self.playing = false;
        for id in world.object_ids() {
            self.apply_object_state(world, id);
        }
        self.refresh(world);
    }

    /// Apply layer visibility and play state to a freshly spawned object.
    pub fn on_object_spawned(&mut self, world: &mut World, id: ObjectId) {
        self.apply_object_state(world, id);
    }

    pub fn on_object_deleted(&mut self, world: &mut World, id: ObjectId) {
        if self.gizmo.selected() == Some(id) {
            self.gizmo.reset(world);
        }
    }

    pub fn select(&mut self, world: &mut World, id: ObjectId, mouse: Vec2) {
        if !self.playing {
            self.gizmo.select(world, id, mouse);
        }
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.gizmo.selected()
    }

    pub fn reset_gizmo(&mut self, world: &mut World) {
        self.gizmo.reset(world);
    }

    // Input.

    /// Handle a primary-button press at `mouse`.
    pub fn on_mouse_down(&mut self, world: &mut World, mouse: Vec2) -> Option<EditorCommand> {
        // Disabled buttons still swallow the click.
        let hit = self
            .buttons
            .iter()
            .find(|button| button.state != ButtonState::Hidden && button.rect.contains(mouse))
            .map(|button| (button.action, button.state));
        match hit {
            Some((action, ButtonState::Default)) => return self.activate(world, action),
            Some(_) => return None,
            None => {}
        }

        if self.playing || (self.overlay_visible(world) && PANEL.contains(mouse)) {
            return None;
        }
        self.gizmo.on_mouse_down(world, mouse);
        None
    }

    pub fn on_mouse_up(&mut self) {
        self.gizmo.on_mouse_up();
    }

    /// Per-tick update while editing. Returns true when the gizmo moved
    /// the selection.
    pub fn update(&mut self, world: &mut World, mouse: Vec2, left_down: bool) -> bool {
        if self.playing {
            return false;
        }
        let moved = self.gizmo.update(world, mouse, left_down);
        if moved {
            self.mark_dirty(world);
        }
        moved
    }

    fn activate(&mut self, world: &mut World, action: ButtonAction) -> Option<EditorCommand> {
        log::debug!("editor button {action:?}");
        match action {
            ButtonAction::Mode(mode) => {
                self.set_mode(world, mode);
                None
            }
            ButtonAction::PreviousPage => {
                self.previous_page(world);
                None
            }
            ButtonAction::NextPage => {
                self.next_page(world);
                None
            }
            ButtonAction::LayerEye(layer) => {
                self.toggle_layer(world, layer);
                None
            }
            ButtonAction::Asset(id) => Some(EditorCommand::Spawn(id)),
            ButtonAction::Save => Some(EditorCommand::Save),
            ButtonAction::Open => Some(EditorCommand::Open),
            ButtonAction::Play => Some(EditorCommand::Play),
            ButtonAction::Stop => Some(EditorCommand::Stop),
        }
    }

    // Presentation.

    fn apply_object_state(&self, world: &mut World, id: ObjectId) {
        let Some(object) = world.object(id) else {
            return;
        };
        let (bitmap, collision, player_start) =
            (object.bitmap, object.collision, object.player_start);
        let layer_visible =
            object_layer(world, id).map_or(true, |layer| self.is_layer_visible(layer));

        if let Some(bitmap) = world.bitmap_mut(bitmap) {
            bitmap.suppressed = !layer_visible || (self.playing && player_start);
        }
        if let Some(collider) = collision.and_then(|c| world.collider_mut(c)) {
            collider.disabled = !layer_visible || (self.playing && collider.edit_only);
        }
    }

    fn state_for(&self, action: ButtonAction, index: usize) -> ButtonState {
        if self.playing {
            return if action == ButtonAction::Stop {
                ButtonState::Default
            } else {
                ButtonState::Hidden
            };
        }
        if !self.visible {
            return ButtonState::Hidden;
        }

        let enabled = |on: bool| if on { ButtonState::Default } else { ButtonState::Disabled };
        let shown_in = |mode: EditorMode, state: ButtonState| {
            if self.mode == mode {
                state
            } else {
                ButtonState::Hidden
            }
        };

        match action {
            ButtonAction::Mode(mode) => enabled(self.mode != mode),
            ButtonAction::Save => enabled(self.dirty),
            ButtonAction::Open | ButtonAction::Play => ButtonState::Default,
            ButtonAction::Stop => ButtonState::Hidden,
            ButtonAction::PreviousPage => {
                shown_in(EditorMode::AssetBrowser, enabled(self.browser.has_previous()))
            }
            ButtonAction::NextPage => {
                shown_in(EditorMode::AssetBrowser, enabled(self.browser.has_next()))
            }
            ButtonAction::Asset(_) if self.browser.contains(index) => {
                shown_in(EditorMode::AssetBrowser, ButtonState::Default)
            }
            ButtonAction::Asset(_) => ButtonState::Hidden,
            ButtonAction::LayerEye(_) => shown_in(EditorMode::RenderLayer, ButtonState::Default),
        }
    }

    /// Recompute every widget from the current state.
    fn refresh(&mut self, world: &mut World) {
        if let Some(overlay) = world.bitmap_mut(self.overlay) {
            overlay.suppressed = !self.visible || self.playing || self.mode == EditorMode::ViewMode;
        }

        let mut asset_index = 0;
        for i in 0..self.buttons.len() {
            let action = self.buttons[i].action;
            let state = self.state_for(action, asset_index);
            if matches!(action, ButtonAction::Asset(_)) {
                asset_index += 1;
            }

            let pressed_row = match action {
                ButtonAction::LayerEye(layer) => !self.is_layer_visible(layer),
                ButtonAction::Asset(_) => false,
                _ => state == ButtonState::Disabled,
            };

            let button = &mut self.buttons[i];
            button.state = state;
            if let Some(label) = button.label.as_mut() {
                label.set_hidden(state == ButtonState::Hidden);
            }
            if let Some(bitmap) = world.bitmap_mut(button.bitmap) {
                bitmap.suppressed = state == ButtonState::Hidden;
                bitmap.source = button.source;
                if pressed_row {
                    bitmap.source.location.y += button.source.size.y;
                }
            }
            if let Some(collider) = world.collider_mut(button.collider) {
                collider.disabled = state == ButtonState::Hidden;
            }
        }
    }

    /// Draw widgets, labels and the render-layer legend.
    pub fn draw(&self, world: &World, backend: &mut dyn RasterBackend) {
        for bitmap in world.editor_bitmaps() {
            crate::render::draw_bitmap(backend, bitmap);
        }
        for label in self.buttons.iter().filter_map(|button| button.label.as_ref()) {
            label.draw(backend);
        }

        if self.visible && !self.playing && self.mode == EditorMode::RenderLayer {
            for layer in 0..=RENDER_LAYER_MAX {
                let color = if self.is_layer_visible(layer) {
                    Color::WHITE
                } else {
                    Color::BLACK
                };
                let rect = Rect::from_xywh(LEGEND_X, layer_row_y(layer), 200.0, 32.0);
                backend.draw_text(&format!("Layer {layer}"), &self.legend_format, rect, color);
            }
        }
    }
}

fn layer_row_y(layer: u8) -> f32 {
    LAYER_ROW_Y + f32::from(layer) * LAYER_ROW_HEIGHT
}

fn object_layer(world: &World, id: ObjectId) -> Option<u8> {
    let object = world.object(id)?;
    world.bitmap(object.bitmap).map(|bitmap| bitmap.render_layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetEntry;
    use crate::collision::MOUSE_TAG;
    use crate::world::DefaultCollision;

    struct NoAtlases;

    impl AtlasSource for NoAtlases {
        fn ui_atlas(&mut self, _relative: &str) -> Option<AtlasHandle> {
            None
        }

        fn asset_atlas(&mut self, _path: &Path) -> Option<AtlasHandle> {
            None
        }
    }

    fn registry(count: u32) -> AssetRegistry {
        let mut registry = AssetRegistry::new();
        for id in 0..count {
            registry.register(id, AssetEntry::new("Game/tiles.png", Vec2::new(32.0, 32.0)));
        }
        registry
    }

    fn editor(world: &mut World, assets: u32) -> Editor {
        let mouse = world.add_editor_collider(Collider::new(Vec2::ONE, MOUSE_TAG));
        Editor::new(world, &registry(assets), &mut NoAtlases, &FontAtlas::default(), mouse, 32.0)
    }

    fn click(
        editor: &mut Editor,
        world: &mut World,
        action: ButtonAction,
    ) -> Option<EditorCommand> {
        let rect = editor.button_rect(action).unwrap();
        editor.on_mouse_down(world, rect.location + Vec2::new(1.0, 1.0))
    }

    #[test]
    fn clicked_mode_tab_is_disabled_and_others_default() {
        let mut world = World::new();
        let mut editor = editor(&mut world, 3);
        assert_eq!(editor.mode(), EditorMode::None);

        click(&mut editor, &mut world, ButtonAction::Mode(EditorMode::RenderLayer));
        assert_eq!(editor.mode(), EditorMode::RenderLayer);
        assert_eq!(
            editor.button_state(ButtonAction::Mode(EditorMode::RenderLayer)),
            Some(ButtonState::Disabled)
        );
        assert_eq!(
            editor.button_state(ButtonAction::Mode(EditorMode::AssetBrowser)),
            Some(ButtonState::Default)
        );
        assert_eq!(editor.button_state(ButtonAction::LayerEye(0)), Some(ButtonState::Default));
        assert_eq!(editor.button_state(ButtonAction::Asset(0)), Some(ButtonState::Hidden));

        // A disabled tab ignores clicks.
        let tab = ButtonAction::Mode(EditorMode::RenderLayer);
        assert_eq!(click(&mut editor, &mut world, tab), None);
        assert_eq!(editor.mode(), EditorMode::RenderLayer);
    }

    #[test]
    fn view_mode_hides_overlay_and_submenus() {
        let mut world = World::new();
        let mut editor = editor(&mut world, 3);
        assert!(editor.overlay_visible(&world));
        editor.set_mode(&mut world, EditorMode::ViewMode);
        assert!(!editor.overlay_visible(&world));
        assert_eq!(editor.button_state(ButtonAction::Asset(1)), Some(ButtonState::Hidden));
        assert_eq!(editor.button_state(ButtonAction::LayerEye(3)), Some(ButtonState::Hidden));
        assert_eq!(editor.button_state(ButtonAction::NextPage), Some(ButtonState::Hidden));
    }

    #[test]
    fn disabled_tab_keeps_the_selection_in_view_mode() {
        let mut world = World::new();
        let mouse = world.add_editor_collider(Collider::new(Vec2::ONE, MOUSE_TAG));
        let font = FontAtlas::default();
        let mut editor = Editor::new(&mut world, &registry(1), &mut NoAtlases, &font, mouse, 32.0);
        let entry = AssetEntry::new("Game/tiles.png", Vec2::new(32.0, 32.0));
        let at = Vec2::new(100.0, 100.0);
        let id = world.insert_object(0, &entry, None, at, DefaultCollision::EditOnly, None);
        editor.set_mode(&mut world, EditorMode::ViewMode);

        let pick = Vec2::new(110.0, 110.0);
        world.collider_mut(mouse).unwrap().location = pick;
        assert_eq!(editor.on_mouse_down(&mut world, pick), None);
        editor.on_mouse_up();
        assert_eq!(editor.selected(), Some(id));

        let tab = editor.button_rect(ButtonAction::Mode(EditorMode::ViewMode)).unwrap().location
            + Vec2::new(1.0, 1.0);
        world.collider_mut(mouse).unwrap().location = tab;
        assert_eq!(editor.on_mouse_down(&mut world, tab), None);
        assert_eq!(editor.selected(), Some(id));
        assert_eq!(editor.mode(), EditorMode::ViewMode);
    }

    #[test]
    fn asset_pages_show_only_their_window() {
        let mut world = World::new();
        let mut editor = editor(&mut world, 30);
        editor.set_mode(&mut world, EditorMode::AssetBrowser);
        assert_eq!(editor.button_state(ButtonAction::Asset(26)), Some(ButtonState::Default));
        assert_eq!(editor.button_state(ButtonAction::Asset(27)), Some(ButtonState::Hidden));
        assert_eq!(editor.button_state(ButtonAction::PreviousPage), Some(ButtonState::Disabled));

        click(&mut editor, &mut world, ButtonAction::NextPage);
        assert_eq!(editor.browser().window(), 27..30);
        assert_eq!(editor.button_state(ButtonAction::Asset(0)), Some(ButtonState::Hidden));
        assert_eq!(editor.button_state(ButtonAction::Asset(28)), Some(ButtonState::Default));
        assert_eq!(editor.button_state(ButtonAction::NextPage), Some(ButtonState::Disabled));

        let rect = editor.button_rect(ButtonAction::Asset(28)).unwrap();
        assert_eq!(
            editor.on_mouse_down(&mut world, rect.location + Vec2::new(4.0, 4.0)),
            Some(EditorCommand::Spawn(28))
        );
    }

    #[test]
    fn save_button_tracks_dirtiness() {
        let mut world = World::new();
        let mut editor = editor(&mut world, 1);
        assert_eq!(editor.button_state(ButtonAction::Save), Some(ButtonState::Disabled));
        editor.mark_dirty(&mut world);
        assert_eq!(editor.button_state(ButtonAction::Save), Some(ButtonState::Default));
        assert_eq!(click(&mut editor, &mut world, ButtonAction::Save), Some(EditorCommand::Save));
        editor.mark_saved(&mut world);
        assert_eq!(editor.button_state(ButtonAction::Save), Some(ButtonState::Disabled));
    }

    #[test]
    fn hiding_the_editor_hides_every_widget() {
        let mut world = World::new();
        let mut editor = editor(&mut world, 1);
        editor.toggle_visible(&mut world);
        assert!(!editor.overlay_visible(&world));
        assert_eq!(editor.button_state(ButtonAction::Play), Some(ButtonState::Hidden));
        editor.toggle_visible(&mut world);
        assert_eq!(editor.button_state(ButtonAction::Play), Some(ButtonState::Default));
    }

    #[test]
    fn play_and_stop_swap_the_file_row_button() {
        let mut world = World::new();
        let mut editor = editor(&mut world, 1);
        let entry = AssetEntry::new("Game/start.png", Vec2::new(32.0, 32.0)).as_player_start();
        let marker =
            world.insert_object(0, &entry, None, Vec2::ZERO, DefaultCollision::EditOnly, None);

        assert_eq!(click(&mut editor, &mut world, ButtonAction::Play), Some(EditorCommand::Play));
        editor.play(&mut world);
        assert_eq!(editor.button_state(ButtonAction::Play), Some(ButtonState::Hidden));
        assert_eq!(editor.button_state(ButtonAction::Stop), Some(ButtonState::Default));
        let object = world.object(marker).unwrap();
        assert!(world.bitmap(object.bitmap).unwrap().suppressed);
        assert!(world.collider(object.collision.unwrap()).unwrap().disabled);

        assert_eq!(click(&mut editor, &mut world, ButtonAction::Stop), Some(EditorCommand::Stop));
        editor.stop(&mut world);
        let object = world.object(marker).unwrap();
        assert!(!world.bitmap(object.bitmap).unwrap().suppressed);
        assert!(!world.collider(object.collision.unwrap()).unwrap().disabled);
        assert_eq!(editor.button_state(ButtonAction::Stop), Some(ButtonState::Hidden));
    }

    #[test]
    fn button_tags_are_reserved_negatives() {
        assert!(ButtonAction::Asset(0).tag() <= -1000);
        assert_eq!(ButtonAction::Asset(u32::MAX).tag(), i32::MIN);
        assert_eq!(ButtonAction::LayerEye(10).tag(), -30);
    }
}
