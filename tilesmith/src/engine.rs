use std::path::{Path, PathBuf};

use anyhow::Result;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    window::Window,
};

use crate::assets::{AssetEntry, AssetId, AssetRegistry, AtlasCache};
use crate::collision::{Collider, ColliderId, OverlapEvent, MOUSE_TAG};
use crate::config::{EngineConfig, CONFIG_FILE};
use crate::editor::{AtlasSource, Editor, EditorCommand};
use crate::error::EngineError;
use crate::input::{keys, InputState, KeyCode, MouseButton};
use crate::level::{self, LoadMode};
use crate::math::{Color, Rect, Vec2};
use crate::object::{ObjectBehavior, ObjectContext, ObjectId};
use crate::render::{
    draw_bitmap, draw_layers, stroke_colliders, AtlasHandle, Bitmap, RasterBackend, WgpuBackend,
};
use crate::text::{FontAtlas, ScreenPrinter};
use crate::time::FramePacer;
use crate::world::{DefaultCollision, Listener, World, WorldCommand};

pub const FONT_PATH: &str = "EngineContent/Font/Font.png";
pub const CURSOR_PATH: &str = "EngineContent/Mouse/Cursor.png";

const CURSOR_SIZE: Vec2 = Vec2 { x: 32.0, y: 32.0 };
const FONT_GLYPH: Vec2 = Vec2 { x: 16.0, y: 16.0 };
const FONT_COLUMNS: u32 = 31;

/// Assets picked in the browser land here, snapped, before the user drags them.
const PLACEMENT_POINT: Vec2 = Vec2 { x: 480.0, y: 360.0 };

/// Creates the behavior for a freshly spawned object, keyed on its asset id.
pub type SpawnCallback = Box<dyn FnMut(AssetId) -> Option<Box<dyn ObjectBehavior>>>;

/// Chooses the level the editor's Open button loads.
pub type LevelPicker = Box<dyn FnMut() -> Option<PathBuf>>;

/// Main entrypoint for running a Tilesmith game.
pub struct Engine {
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create a new engine instance with default configuration.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Override the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    /// Override the initial window size in physical pixels.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable or disable vertical sync.
    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.config.vsync = vsync;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the provided game until the window is closed or Escape is pressed.
    ///
    /// `EngineConfig.txt` under the content root is applied on top of the
    /// configured values before the window opens.
    pub fn run<G: Game + 'static>(self, mut game: G) -> Result<()> {
        let mut config = self.config;
        let flags = config.resolve(CONFIG_FILE);
        config.load_flags(&flags)?;

        let event_loop = EventLoop::new()?;
        let mut window_attributes = Window::default_attributes();
        window_attributes.title = config.title.clone();
        window_attributes.inner_size = Some(PhysicalSize::new(config.width, config.height).into());
        window_attributes.resizable = false;
        let window = event_loop.create_window(window_attributes)?;

        // The surface borrows the window for the rest of the process.
        let window: &'static Window = Box::leak(Box::new(window));
        window.set_cursor_visible(false);

        let font = config.font_path.as_ref().map(|path| config.resolve(path));
        let backend = WgpuBackend::new(window, config.vsync, font.as_deref())?;
        let mut pacer = FramePacer::new(config.fps);

        let mut ctx = EngineContext::new(config, Box::new(backend));
        game.init(&mut ctx)?;
        ctx.start();

        event_loop.run(move |event, elwt| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => ctx.request_exit(),
                WindowEvent::KeyboardInput { event, .. } => ctx.handle_key_event(&event),
                WindowEvent::MouseInput { state, button, .. } => {
                    ctx.handle_mouse_button(button, state == ElementState::Pressed);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    ctx.handle_cursor_moved(position.x, position.y);
                }
                WindowEvent::Resized(size) => ctx.resize(size.width, size.height),
                WindowEvent::RedrawRequested => ctx.render(),
                _ => {}
            },
            Event::AboutToWait => {
                if !ctx.is_running() {
                    elwt.exit();
                    return;
                }

                let dt = pacer.tick();
                if let Err(err) = game.update(&mut ctx, dt) {
                    log::error!("game update failed: {err:?}");
                    ctx.request_exit();
                    return;
                }
                ctx.tick(dt);
                window.request_redraw();
            }
            Event::LoopExiting => ctx.shutdown(),
            _ => {}
        })?;

        Ok(())
    }
}

/// Trait implemented by user code to hook into the engine lifecycle.
pub trait Game {
    /// Called once after the window is created and before the editor is built.
    /// Register assets and the spawn callback here.
    fn init(&mut self, _ctx: &mut EngineContext) -> Result<()> {
        Ok(())
    }

    /// Called once per frame before the world ticks.
    fn update(&mut self, _ctx: &mut EngineContext, _dt: f32) -> Result<()> {
        Ok(())
    }
}

/// Resolves editor atlas requests through the engine's atlas cache.
struct ContentAtlases<'a> {
    cache: &'a mut AtlasCache,
    backend: &'a mut dyn RasterBackend,
    config: &'a EngineConfig,
}

impl AtlasSource for ContentAtlases<'_> {
    fn ui_atlas(&mut self, relative: &str) -> Option<AtlasHandle> {
        self.cache.atlas(&mut *self.backend, &self.config.resolve(relative))
    }

    fn asset_atlas(&mut self, path: &Path) -> Option<AtlasHandle> {
        self.cache.atlas(&mut *self.backend, &self.config.resolve(path))
    }
}

/// Edited objects and dirtiness captured when play starts.
struct PlaySnapshot {
    objects: Vec<(ObjectId, AssetId, Vec2)>,
    dirty: bool,
}

impl PlaySnapshot {
    fn capture(world: &World, dirty: bool) -> Self {
        let objects = world
            .objects()
            .map(|(id, object)| (id, object.asset_id, object.location()))
            .collect();
        Self { objects, dirty }
    }
}

/// Everything a running game owns: world, registry, atlases, input, editor
/// and the raster backend.
pub struct EngineContext {
    config: EngineConfig,
    world: World,
    registry: AssetRegistry,
    atlases: AtlasCache,
    backend: Box<dyn RasterBackend>,
    input: InputState,
    printer: ScreenPrinter,
    font: FontAtlas,
    editor: Option<Editor>,
    mouse: ColliderId,
    cursor: Option<Bitmap>,
    background: Option<Bitmap>,
    spawner: Option<SpawnCallback>,
    level_picker: Option<LevelPicker>,
    /// Edited layout taken at Play, put back at Stop.
    play_snapshot: Option<PlaySnapshot>,
    game_running: bool,
    pending_game_start: bool,
    running: bool,
}

impl EngineContext {
    pub fn new(config: EngineConfig, backend: Box<dyn RasterBackend>) -> Self {
        let mut world = World::new();
        world.set_debug_colliders(config.debug_mode);
        let mouse = world.add_editor_collider(Collider::new(Vec2::ONE, MOUSE_TAG));
        let game_running = !config.editor_mode;

        Self {
            config,
            world,
            registry: AssetRegistry::new(),
            atlases: AtlasCache::new(),
            backend,
            input: InputState::new(),
            printer: ScreenPrinter::default(),
            font: FontAtlas::default(),
            editor: None,
            mouse,
            cursor: None,
            background: None,
            spawner: None,
            level_picker: None,
            play_snapshot: None,
            game_running,
            pending_game_start: false,
            running: true,
        }
    }

    /// Load engine content and build the editor. Call after the registry is
    /// filled; the asset browser lists what is registered at this point.
    pub fn start(&mut self) {
        let font = self.content_atlas(Path::new(FONT_PATH));
        self.font = FontAtlas::new(font, FONT_GLYPH, FONT_COLUMNS);
        self.printer.set_font(self.font);

        self.cursor = self
            .content_atlas(Path::new(CURSOR_PATH))
            .map(|atlas| Bitmap::new(Some(atlas), Rect::new(Vec2::ZERO, CURSOR_SIZE)));

        if self.config.editor_mode && self.editor.is_none() {
            let mut atlases = ContentAtlases {
                cache: &mut self.atlases,
                backend: self.backend.as_mut(),
                config: &self.config,
            };
            let mut editor = Editor::new(
                &mut self.world,
                &self.registry,
                &mut atlases,
                &self.font,
                self.mouse,
                self.config.snap_size,
            );
            editor.set_level_path(self.config.resolve(&self.config.level_path));
            for id in self.world.object_ids() {
                editor.on_object_spawned(&mut self.world, id);
            }
            self.editor = Some(editor);
        }

        self.pending_game_start = self.game_running;
        log::debug!(
            "engine started (editor: {}, debug: {})",
            self.config.editor_mode,
            self.config.debug_mode
        );
    }

    // Setup.

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn register_asset(&mut self, id: AssetId, entry: AssetEntry) {
        self.registry.register(id, entry);
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AssetRegistry {
        &mut self.registry
    }

    pub fn set_spawn_callback(
        &mut self,
        callback: impl FnMut(AssetId) -> Option<Box<dyn ObjectBehavior>> + 'static,
    ) {
        self.spawner = Some(Box::new(callback));
    }

    pub fn set_level_picker(&mut self, picker: impl FnMut() -> Option<PathBuf> + 'static) {
        self.level_picker = Some(Box::new(picker));
    }

    /// Stretch an image over the whole window behind every layer.
    pub fn set_background(&mut self, path: impl AsRef<Path>) {
        let Some(atlas) = self.content_atlas(path.as_ref()) else {
            self.background = None;
            return;
        };
        let (width, height) = self.backend.atlas_size(atlas).unwrap_or((1, 1));
        let screen = Vec2::new(self.config.width as f32, self.config.height as f32);
        self.background = Some(
            Bitmap::new(Some(atlas), Rect::new(Vec2::ZERO, Vec2::new(width as f32, height as f32)))
                .with_size(screen),
        );
    }

    // Accessors.

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn editor(&self) -> Option<&Editor> {
        self.editor.as_ref()
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn printer(&self) -> &ScreenPrinter {
        &self.printer
    }

    pub fn backend_mut(&mut self) -> &mut dyn RasterBackend {
        self.backend.as_mut()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_game_running(&self) -> bool {
        self.game_running
    }

    /// True while the editor is up and the game is stopped.
    pub fn is_editing(&self) -> bool {
        self.editor.is_some() && !self.game_running
    }

    /// Request that the engine exit after the current frame.
    pub fn request_exit(&mut self) {
        self.running = false;
    }

    pub fn print(&mut self, message: &str) {
        self.printer.print(message);
    }

    pub fn player_start(&self) -> Option<Vec2> {
        self.world.player_start()
    }

    // Objects.

    /// Create an object from its registry entry.
    ///
    /// An unknown id fails with [`EngineError::UnknownAsset`] and leaves the
    /// world untouched.
    pub fn spawn(&mut self, asset_id: AssetId, location: Vec2) -> Result<ObjectId> {
        let entry = self.registry.entry(asset_id)?.clone();
        let atlas = self.content_atlas(&entry.path);

        let collision = if entry.runtime_collision {
            DefaultCollision::Runtime
        } else if self.config.editor_mode {
            DefaultCollision::EditOnly
        } else {
            DefaultCollision::None
        };
        let behavior = self.spawner.as_mut().and_then(|spawner| spawner(asset_id));
        let id = self
            .world
            .insert_object(asset_id, &entry, atlas, location, collision, behavior);

        if let Some(editor) = self.editor.as_mut() {
            editor.on_object_spawned(&mut self.world, id);
            editor.mark_dirty(&mut self.world);
        }
        self.run_hook(id, |behavior, ctx| behavior.on_created(ctx));
        self.apply_commands();
        Ok(id)
    }

    /// Destroy an object and every part it owns.
    pub fn delete(&mut self, id: ObjectId) -> Result<()> {
        if !self.world.contains_object(id) {
            return Err(EngineError::StaleHandle("game object").into());
        }
        self.run_hook(id, |behavior, ctx| behavior.on_deleted(ctx));
        self.world.remove_object(id);
        log::debug!("object {id:?} deleted");

        if let Some(editor) = self.editor.as_mut() {
            editor.on_object_deleted(&mut self.world, id);
            editor.mark_dirty(&mut self.world);
        }
        self.apply_commands();
        Ok(())
    }

    /// Move an object with all of its parts.
    pub fn set_location(&mut self, id: ObjectId, location: Vec2) -> bool {
        self.world.set_object_location(id, location)
    }

    // Levels.

    /// Load a level file through the spawn path.
    ///
    /// Unknown asset ids are skipped with a warning. A malformed line stops
    /// the load; objects from earlier lines stay and the level still becomes
    /// the active one before the error is returned.
    pub fn open_level(&mut self, path: impl AsRef<Path>, mode: LoadMode) -> Result<usize> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(EngineError::ResourceMissing {
                path: path.to_path_buf(),
            }
            .into());
        }

        if mode == LoadMode::Replace {
            for id in self.world.object_ids() {
                if let Err(err) = self.delete(id) {
                    log::debug!("skipping {id:?} while clearing the level: {err}");
                }
            }
        }

        let loaded = level::load_level(path, |asset_id, location| {
            if let Err(err) = self.spawn(asset_id, location) {
                log::warn!("{}: skipping asset {asset_id}: {err}", path.display());
            }
            Ok(())
        });
        match &loaded {
            Ok(count) => log::info!("opened {} ({count} objects)", path.display()),
            Err(err) => log::warn!("{}: {err}", path.display()),
        }

        if let Some(editor) = self.editor.as_mut() {
            editor.set_level_path(path);
            editor.mark_dirty(&mut self.world);
        }
        if self.play_snapshot.is_some() {
            // A level opened mid-play becomes the layout Stop returns to.
            self.play_snapshot = Some(PlaySnapshot::capture(&self.world, true));
        }
        for id in self.world.listeners(Listener::GameState) {
            self.run_hook(id, |behavior, ctx| behavior.on_level_activated(ctx, path));
        }
        self.apply_commands();
        loaded
    }

    /// Save the world's objects. Without a path the editor's current level
    /// is used, falling back to the configured level path.
    pub fn save_level(&mut self, path: Option<&Path>) -> Result<usize> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self.current_level_path(),
        };
        let count = level::save_level(&path, &self.world)?;
        if let Some(editor) = self.editor.as_mut() {
            editor.set_level_path(&path);
            editor.mark_saved(&mut self.world);
        }
        Ok(count)
    }

    fn current_level_path(&self) -> PathBuf {
        self.editor
            .as_ref()
            .and_then(|editor| editor.level_path().map(Path::to_path_buf))
            .unwrap_or_else(|| self.config.resolve(&self.config.level_path))
    }

    // Play state.

    /// Switch from editing to playing.
    pub fn play(&mut self) {
        if self.game_running {
            return;
        }
        self.game_running = true;
        if let Some(editor) = self.editor.as_mut() {
            self.play_snapshot = Some(PlaySnapshot::capture(&self.world, editor.is_dirty()));
            editor.play(&mut self.world);
        }
        log::info!("game started");
        self.fire_game_state(true);
    }

    /// Switch from playing back to editing. No-op without an editor.
    pub fn stop(&mut self) {
        if !self.game_running || self.editor.is_none() {
            return;
        }
        self.game_running = false;
        if let Some(editor) = self.editor.as_mut() {
            editor.stop(&mut self.world);
        }
        log::info!("game stopped");
        self.fire_game_state(false);
        self.restore_play_snapshot();
    }

    /// Undo what the game did to the edited layout: objects spawned while
    /// playing go away, deleted ones come back, moved ones return.
    fn restore_play_snapshot(&mut self) {
        let Some(snapshot) = self.play_snapshot.take() else {
            return;
        };
        for id in self.world.object_ids() {
            if !snapshot.objects.iter().any(|(kept, ..)| *kept == id) {
                if let Err(err) = self.delete(id) {
                    log::debug!("skipping {id:?} while restoring the level: {err}");
                }
            }
        }
        for (id, asset_id, location) in snapshot.objects {
            if self.world.contains_object(id) {
                self.world.set_object_location(id, location);
            } else if let Err(err) = self.spawn(asset_id, location) {
                log::warn!("could not restore asset {asset_id}: {err}");
            }
        }
        if let Some(editor) = self.editor.as_mut() {
            if snapshot.dirty {
                editor.mark_dirty(&mut self.world);
            } else {
                editor.mark_saved(&mut self.world);
            }
        }
    }

    fn fire_game_state(&mut self, started: bool) {
        for id in self.world.listeners(Listener::GameState) {
            self.run_hook(id, |behavior, ctx| {
                if started {
                    behavior.on_game_start(ctx);
                } else {
                    behavior.on_game_stop(ctx);
                }
            });
        }
        self.apply_commands();
        self.deliver_overlaps();
    }

    // Input.

    /// Translate a winit key event. Auto-repeats are ignored.
    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        if event.repeat {
            return;
        }
        if let Some(key) = self.input.handle_key(event) {
            self.dispatch_key(key, event.state == ElementState::Pressed);
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        self.input.set_key(key, pressed);
        self.dispatch_key(key, pressed);
    }

    fn dispatch_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            match key {
                keys::ESCAPE => {
                    self.request_exit();
                    return;
                }
                keys::TAB if self.is_editing() => {
                    if let Some(editor) = self.editor.as_mut() {
                        editor.toggle_visible(&mut self.world);
                    }
                }
                keys::DELETE => self.delete_pressed(),
                _ => {}
            }
        }

        for id in self.world.listeners(Listener::Input) {
            self.run_hook(id, |behavior, ctx| behavior.on_key(ctx, key, pressed));
        }
        self.apply_commands();
    }

    fn delete_pressed(&mut self) {
        if self.is_editing() {
            if let Some(selected) = self.editor.as_ref().and_then(Editor::selected) {
                if let Err(err) = self.delete(selected) {
                    log::debug!("delete ignored: {err}");
                }
            }
        }
        if self.config.debug_mode {
            self.printer.clear();
        }
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        self.input.set_mouse_button(button, pressed);

        if button == MouseButton::Left {
            let mouse = self.input.mouse_position();
            let command = match self.editor.as_mut() {
                Some(editor) if pressed => editor.on_mouse_down(&mut self.world, mouse),
                Some(editor) => {
                    editor.on_mouse_up();
                    None
                }
                None => None,
            };
            if let Some(command) = command {
                self.run_editor_command(command);
            }
        }

        for id in self.world.listeners(Listener::Input) {
            self.run_hook(id, |behavior, ctx| behavior.on_mouse(ctx, button, pressed));
        }
        self.apply_commands();
    }

    pub fn handle_cursor_moved(&mut self, x: f64, y: f64) {
        self.input.set_cursor(x, y);
        let mouse = self.input.mouse_position();
        if let Some(collider) = self.world.collider_mut(self.mouse) {
            collider.location = mouse;
        }
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.location = mouse;
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.backend.resize(width, height);
    }

    fn run_editor_command(&mut self, command: EditorCommand) {
        log::debug!("editor command {command:?}");
        match command {
            EditorCommand::Spawn(asset_id) => {
                let location = PLACEMENT_POINT.snapped(self.config.snap_size);
                match self.spawn(asset_id, location) {
                    Ok(id) => {
                        let mouse = self.input.mouse_position();
                        if let Some(editor) = self.editor.as_mut() {
                            editor.select(&mut self.world, id, mouse);
                        }
                    }
                    Err(err) => log::warn!("{err}"),
                }
            }
            EditorCommand::Save => {
                if let Err(err) = self.save_level(None) {
                    log::error!("save failed: {err:?}");
                }
            }
            EditorCommand::Open => {
                let path = self
                    .level_picker
                    .as_mut()
                    .and_then(|picker| picker())
                    .unwrap_or_else(|| self.current_level_path());
                if let Err(err) = self.open_level(&path, LoadMode::Replace) {
                    log::warn!("open failed: {err}");
                }
            }
            EditorCommand::Play => self.play(),
            EditorCommand::Stop => self.stop(),
        }
    }

    // Loop phases.

    /// Advance one frame: update listeners, editor, then relation broadcasts.
    pub fn tick(&mut self, dt: f32) {
        if std::mem::take(&mut self.pending_game_start) {
            self.fire_game_state(true);
        }

        for id in self.world.listeners(Listener::Update) {
            self.run_hook(id, |behavior, ctx| behavior.update(ctx, dt));
        }
        self.deliver_overlaps();
        self.apply_commands();

        if self.is_editing() {
            let mouse = self.input.mouse_position();
            let left_down = self.input.is_mouse_down(MouseButton::Left);
            if let Some(editor) = self.editor.as_mut() {
                editor.update(&mut self.world, mouse, left_down);
            }
        }

        self.world.broadcast_relations();
        self.deliver_overlaps();
        self.apply_commands();

        self.input.begin_frame();
    }

    /// Draw one frame. Backend failures are logged and the frame is dropped.
    pub fn render(&mut self) {
        if let Err(err) = self.draw_frame() {
            log::error!("frame failed: {err:?}");
        }
    }

    fn draw_frame(&mut self) -> Result<()> {
        let backend = self.backend.as_mut();
        backend.begin_frame(self.config.clear_color)?;

        if let Some(background) = &self.background {
            draw_bitmap(backend, background);
        }
        draw_layers(backend, self.world.bitmaps());
        stroke_colliders(backend, self.world.colliders().map(|(_, collider)| collider), true);

        for id in self.world.listeners(Listener::Render) {
            if let Some(behavior) = self.world.behavior(id) {
                behavior.on_render(&self.world, backend);
            }
        }

        if let Some(editor) = &self.editor {
            editor.draw(&self.world, backend);
        }
        if self.config.debug_mode {
            stroke_colliders(backend, self.world.editor_colliders(), false);
            self.printer.draw(backend);
        }

        match &self.cursor {
            Some(cursor) => draw_bitmap(backend, cursor),
            None => {
                if let Some(mouse) = self.world.collider(self.mouse) {
                    backend.draw_rect(mouse.rect(), Color::WHITE, 1.0, false);
                }
            }
        }

        backend.end_frame()
    }

    /// Release every atlas. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.atlases.release_all(self.backend.as_mut());
        log::debug!("engine shut down");
    }

    // Hook plumbing.

    fn content_atlas(&mut self, path: &Path) -> Option<AtlasHandle> {
        let resolved = self.config.resolve(path);
        self.atlases.atlas(self.backend.as_mut(), &resolved)
    }

    fn run_hook<F>(&mut self, id: ObjectId, hook: F)
    where
        F: FnOnce(&mut dyn ObjectBehavior, &mut ObjectContext<'_>),
    {
        let Some(mut behavior) = self.world.take_behavior(id) else {
            return;
        };
        let mut ctx = ObjectContext {
            id,
            world: &mut self.world,
            input: &self.input,
            printer: &mut self.printer,
            game_running: self.game_running,
        };
        hook(behavior.as_mut(), &mut ctx);
        self.world.restore_behavior(id, behavior);
    }

    fn deliver_overlaps(&mut self) {
        for (owner, event) in self.world.take_overlap_events() {
            match event {
                OverlapEvent::Begin {
                    sender_tag,
                    target_tag,
                    target_owner,
                } => self.run_hook(owner, |behavior, ctx| {
                    behavior.on_begin_overlap(ctx, sender_tag, target_tag, target_owner);
                }),
                OverlapEvent::End {
                    sender_tag,
                    target_tag,
                } => self.run_hook(owner, |behavior, ctx| {
                    behavior.on_end_overlap(ctx, sender_tag, target_tag);
                }),
            }
        }
    }

    fn apply_commands(&mut self) {
        loop {
            let commands = self.world.take_commands();
            if commands.is_empty() {
                break;
            }
            for command in commands {
                let result = match command {
                    WorldCommand::Spawn { asset_id, location } => {
                        self.spawn(asset_id, location).map(|_| ())
                    }
                    WorldCommand::Delete(id) => self.delete(id),
                };
                if let Err(err) = result {
                    log::warn!("queued {command:?} failed: {err}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::render::{DrawCommand, RecordingBackend};

    fn context(config: EngineConfig) -> (EngineContext, crate::render::DrawLog) {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut ctx = EngineContext::new(config, Box::new(backend));
        ctx.register_asset(1, AssetEntry::new("Game/tiles.png", Vec2::new(32.0, 32.0)));
        (ctx, log)
    }

    #[derive(Default)]
    struct Trace {
        events: Vec<&'static str>,
    }

    struct Spy(Rc<RefCell<Trace>>);

    impl ObjectBehavior for Spy {
        fn capabilities(&self) -> crate::object::Capabilities {
            crate::object::Capabilities::NONE
                .with_update()
                .with_input()
                .with_game_state()
        }

        fn on_created(&mut self, _ctx: &mut ObjectContext<'_>) {
            self.0.borrow_mut().events.push("created");
        }

        fn on_deleted(&mut self, _ctx: &mut ObjectContext<'_>) {
            self.0.borrow_mut().events.push("deleted");
        }

        fn update(&mut self, ctx: &mut ObjectContext<'_>, _dt: f32) {
            if ctx.game_running {
                self.0.borrow_mut().events.push("update");
            }
        }

        fn on_key(&mut self, _ctx: &mut ObjectContext<'_>, key: KeyCode, pressed: bool) {
            if key == keys::SPACE && pressed {
                self.0.borrow_mut().events.push("space");
            }
        }

        fn on_game_start(&mut self, _ctx: &mut ObjectContext<'_>) {
            self.0.borrow_mut().events.push("start");
        }

        fn on_game_stop(&mut self, _ctx: &mut ObjectContext<'_>) {
            self.0.borrow_mut().events.push("stop");
        }
    }

    #[test]
    fn unknown_asset_leaves_the_world_untouched() {
        let (mut ctx, _) = context(EngineConfig::default());
        let err = ctx.spawn(99, Vec2::ZERO).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::UnknownAsset(99))
        ));
        assert_eq!(ctx.world().object_count(), 0);
        assert_eq!(ctx.world().bitmaps().count(), 0);
    }

    #[test]
    fn default_collision_depends_on_editor_mode() {
        let (mut ctx, _) = context(EngineConfig::default());
        let id = ctx.spawn(1, Vec2::ZERO).unwrap();
        assert!(ctx.world().object(id).unwrap().collision.is_none());

        let (mut ctx, _) = context(EngineConfig::default().with_editor(true));
        ctx.start();
        let id = ctx.spawn(1, Vec2::ZERO).unwrap();
        let collision = ctx.world().object(id).unwrap().collision.unwrap();
        assert!(ctx.world().collider(collision).unwrap().edit_only);
    }

    #[test]
    fn hooks_follow_the_object_lifecycle() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let (mut ctx, _) = context(EngineConfig::default());
        let shared = trace.clone();
        ctx.set_spawn_callback(move |_| {
            Some(Box::new(Spy(shared.clone())) as Box<dyn ObjectBehavior>)
        });
        ctx.start();

        let id = ctx.spawn(1, Vec2::ZERO).unwrap();
        ctx.tick(1.0 / 60.0);
        ctx.handle_key(keys::SPACE, true);
        ctx.delete(id).unwrap();
        assert!(ctx.delete(id).is_err());

        assert_eq!(trace.borrow().events, vec!["created", "start", "update", "space", "deleted"]);
    }

    #[test]
    fn editor_games_only_update_after_play() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let (mut ctx, _) = context(EngineConfig::default().with_editor(true));
        let shared = trace.clone();
        ctx.set_spawn_callback(move |_| {
            Some(Box::new(Spy(shared.clone())) as Box<dyn ObjectBehavior>)
        });
        ctx.start();
        ctx.spawn(1, Vec2::ZERO).unwrap();

        ctx.tick(0.016);
        assert_eq!(trace.borrow().events, vec!["created"]);

        ctx.play();
        ctx.tick(0.016);
        ctx.stop();
        ctx.tick(0.016);
        assert_eq!(trace.borrow().events, vec!["created", "start", "update", "stop"]);
    }

    #[test]
    fn escape_stops_the_engine() {
        let (mut ctx, _) = context(EngineConfig::default());
        assert!(ctx.is_running());
        ctx.handle_key(keys::ESCAPE, true);
        assert!(!ctx.is_running());
    }

    #[test]
    fn delete_key_removes_the_selection_in_edit_mode() {
        let (mut ctx, _) = context(EngineConfig::default().with_editor(true));
        ctx.start();
        let id = ctx.spawn(1, Vec2::new(100.0, 100.0)).unwrap();
        ctx.handle_cursor_moved(110.0, 110.0);
        ctx.handle_mouse_button(MouseButton::Left, true);
        assert_eq!(ctx.editor().unwrap().selected(), Some(id));

        ctx.handle_key(keys::DELETE, true);
        assert!(!ctx.world().contains_object(id));
        assert!(ctx.editor().unwrap().is_dirty());
    }

    #[test]
    fn missing_cursor_falls_back_to_the_mouse_outline() {
        let backend = RecordingBackend::new().with_missing("./EngineContent/Mouse/Cursor.png");
        let log = backend.log();
        let mut ctx = EngineContext::new(EngineConfig::default(), Box::new(backend));
        ctx.start();
        ctx.handle_cursor_moved(40.0, 50.0);
        ctx.render();

        let frame = crate::render::last_frame(&log);
        assert!(frame.contains(&DrawCommand::Rect {
            rect: Rect::from_xywh(40.0, 50.0, 1.0, 1.0),
            color: Color::WHITE,
            opacity: 1.0,
            filled: false,
        }));
        assert_eq!(frame.last(), Some(&DrawCommand::Present));
    }

    #[test]
    fn shutdown_releases_atlases() {
        let (mut ctx, log) = context(EngineConfig::default());
        ctx.start();
        ctx.spawn(1, Vec2::ZERO).unwrap();
        ctx.shutdown();
        let releases = log
            .borrow()
            .iter()
            .filter(|command| matches!(command, DrawCommand::Release(_)))
            .count();
        assert_eq!(releases, 3);
    }
}
