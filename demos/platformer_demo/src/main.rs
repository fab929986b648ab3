use std::path::PathBuf;

use anyhow::Result;
use tilesmith::{
    keys, AssetEntry, AssetId, Capabilities, CollisionKind, Engine, EngineConfig, EngineContext,
    EngineError, Game, KeyCode, LoadMode, Movement, ObjectBehavior, ObjectContext, ObjectId, Vec2,
};

const GROUND: AssetId = 0;
const BRICK: AssetId = 1;
const COIN: AssetId = 2;
const PLAYER_START: AssetId = 3;
const PLAYER: AssetId = 4;
const LADDER: AssetId = 5;

const TILE: Vec2 = Vec2 { x: 32.0, y: 32.0 };

/// Walks, jumps and climbs with the arrow keys and space; collects coins.
#[derive(Default)]
struct Player {
    movement: Option<Movement>,
    /// Location in the edited level, restored when play stops.
    home: Option<Vec2>,
    ladders: u32,
    coins: u32,
}

impl ObjectBehavior for Player {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
            .with_update()
            .with_input()
            .with_game_state()
    }

    fn on_created(&mut self, ctx: &mut ObjectContext<'_>) {
        self.movement = Some(Movement::attach(ctx.world, ctx.id, TILE).with_speed(180.0));
    }

    fn on_begin_overlap(
        &mut self,
        ctx: &mut ObjectContext<'_>,
        _own_tag: i32,
        other_tag: i32,
        other: Option<ObjectId>,
    ) {
        match (other_tag, other) {
            (tag, Some(coin)) if tag == COIN as i32 => {
                ctx.delete(coin);
                self.coins += 1;
                ctx.print(&format!("coins {}", self.coins));
            }
            (tag, _) if tag == LADDER as i32 => self.ladders += 1,
            _ => {}
        }
    }

    fn on_end_overlap(&mut self, _ctx: &mut ObjectContext<'_>, _own_tag: i32, other_tag: i32) {
        if other_tag == LADDER as i32 {
            self.ladders = self.ladders.saturating_sub(1);
            if self.ladders == 0 {
                if let Some(movement) = self.movement.as_mut() {
                    movement.stop_climbing();
                }
            }
        }
    }

    fn update(&mut self, ctx: &mut ObjectContext<'_>, dt: f32) {
        if !ctx.game_running {
            return;
        }
        let Some(movement) = self.movement.as_mut() else {
            return;
        };

        movement.direction = Vec2::new(
            ctx.input.axis(keys::LEFT, keys::RIGHT),
            ctx.input.axis(keys::UP, keys::DOWN),
        );
        if self.ladders > 0 && movement.direction.y != 0.0 {
            movement.climb();
        }
        movement.tick(ctx.world, dt);
    }

    fn on_key(&mut self, ctx: &mut ObjectContext<'_>, key: KeyCode, pressed: bool) {
        if !(ctx.game_running && pressed && key == keys::SPACE) {
            return;
        }
        if let Some(movement) = self.movement.as_mut() {
            movement.jump();
        }
    }

    fn on_game_start(&mut self, ctx: &mut ObjectContext<'_>) {
        self.home = Some(ctx.location());
        self.coins = 0;
        if let Some(start) = ctx.world.player_start() {
            ctx.set_location(start);
        }
        if let Some(movement) = self.movement.as_mut() {
            movement.force_reset_jump();
        }
    }

    fn on_game_stop(&mut self, ctx: &mut ObjectContext<'_>) {
        if let Some(home) = self.home.take() {
            ctx.set_location(home);
        }
        self.ladders = 0;
    }

    fn on_level_activated(&mut self, _ctx: &mut ObjectContext<'_>, level: &std::path::Path) {
        log::info!("player ready in {}", level.display());
    }
}

struct PlatformerDemo;

impl PlatformerDemo {
    fn register_assets(ctx: &mut EngineContext) -> Result<()> {
        let manifest = ctx.config().resolve("Game/assets.json");
        if manifest.is_file() {
            ctx.registry_mut().load_manifest(&manifest)?;
            return Ok(());
        }

        let tiles = "Game/Tiles.png";
        ctx.register_asset(GROUND, AssetEntry::new(tiles, TILE).with_runtime_collision(true));
        ctx.register_asset(
            BRICK,
            AssetEntry::new(tiles, TILE)
                .with_slot_index(1, 0)
                .with_render_layer(1)
                .with_runtime_collision(true),
        );
        ctx.register_asset(
            COIN,
            AssetEntry::new(tiles, TILE)
                .with_slot_index(2, 0)
                .with_render_layer(2)
                .with_runtime_collision(true)
                .with_collision_kind(CollisionKind::Overlap),
        );
        ctx.register_asset(
            PLAYER_START,
            AssetEntry::new("EngineContent/LevelEditor/PlayerStart.png", TILE)
                .with_render_layer(9)
                .as_player_start(),
        );
        ctx.register_asset(
            PLAYER,
            AssetEntry::new("Game/Player.png", TILE)
                .with_render_layer(5)
                .with_thumbnail(32.0, 0),
        );
        ctx.register_asset(
            LADDER,
            AssetEntry::new(tiles, TILE)
                .with_slot_index(3, 0)
                .with_render_layer(1)
                .with_runtime_collision(true)
                .with_collision_kind(CollisionKind::Overlap),
        );
        Ok(())
    }

    fn build_default_level(ctx: &mut EngineContext) -> Result<()> {
        for column in 0..30 {
            ctx.spawn(GROUND, Vec2::new(column as f32 * TILE.x, 640.0))?;
        }
        for column in 8..12 {
            ctx.spawn(BRICK, Vec2::new(column as f32 * TILE.x, 512.0))?;
        }
        for row in 0..4 {
            ctx.spawn(LADDER, Vec2::new(416.0, 512.0 + row as f32 * TILE.y))?;
        }
        for column in [5, 9, 10, 14] {
            ctx.spawn(COIN, Vec2::new(column as f32 * TILE.x, 448.0))?;
        }
        ctx.spawn(PLAYER_START, Vec2::new(64.0, 576.0))?;
        ctx.spawn(PLAYER, Vec2::new(64.0, 576.0))?;
        Ok(())
    }
}

impl Game for PlatformerDemo {
    fn init(&mut self, ctx: &mut EngineContext) -> Result<()> {
        Self::register_assets(ctx)?;
        ctx.set_spawn_callback(|asset_id| match asset_id {
            PLAYER => Some(Box::new(Player::default()) as Box<dyn ObjectBehavior>),
            _ => None,
        });
        ctx.set_background("Game/Background.png");

        let level = ctx.config().resolve(&ctx.config().level_path);
        match ctx.open_level(&level, LoadMode::Replace) {
            Ok(count) => log::info!("loaded {count} objects"),
            Err(err)
                if matches!(
                    err.downcast_ref::<EngineError>(),
                    Some(EngineError::ResourceMissing { .. })
                ) =>
            {
                log::info!("no level at {}, building the default one", level.display());
                Self::build_default_level(ctx)?;
            }
            Err(err) => log::warn!("level {} only partly loaded: {err}", level.display()),
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let content_root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let config = EngineConfig::default()
        .with_title("Tilesmith Platformer")
        .with_size(1280, 720)
        .with_content_root(content_root);

    Engine::new().with_config(config).run(PlatformerDemo)
}
