//! Four-sensor platformer controller.
//!
//! Each side of the owner carries a thin sensor collider. Every tick the
//! sensors are moved next to the owner, broadcast against the collision
//! sequence, and the sides touching a blocking collider clamp movement.

use crate::collision::{Collider, ColliderId, CollisionKind};
use crate::math::{Rect, Vec2};
use crate::object::ObjectId;
use crate::world::World;

pub const SENSOR_LEFT_TAG: i32 = -71;
pub const SENSOR_RIGHT_TAG: i32 = -72;
pub const SENSOR_UP_TAG: i32 = -73;
pub const SENSOR_DOWN_TAG: i32 = -74;

const SENSOR_THICKNESS: f32 = 2.0;
const SENSOR_INSET: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Up,
    Down,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Up, Side::Down];

    fn index(self) -> usize {
        self as usize
    }

    pub fn tag(self) -> i32 {
        match self {
            Side::Left => SENSOR_LEFT_TAG,
            Side::Right => SENSOR_RIGHT_TAG,
            Side::Up => SENSOR_UP_TAG,
            Side::Down => SENSOR_DOWN_TAG,
        }
    }
}

/// Gravity, jump and climb state for one owner object.
#[derive(Debug)]
pub struct Movement {
    owner: ObjectId,
    size: Vec2,
    sensors: [ColliderId; 4],

    pub gravity: bool,
    /// Velocity gained per tick while airborne.
    pub gravity_scale: f32,
    pub jump_height: f32,
    pub max_fall_speed: f32,
    /// Horizontal speed in pixels per second.
    pub speed: f32,
    /// Desired direction; x drives walking, y drives climbing.
    pub direction: Vec2,

    velocity: f32,
    jumping: bool,
    falling: bool,
    jump_requested: bool,
    climbing: bool,
    blocked: [bool; 4],
    hits: [f32; 4],
}

impl Movement {
    /// Create the sensors for an owner of `size` and add them to the world.
    pub fn attach(world: &mut World, owner: ObjectId, size: Vec2) -> Self {
        let sensors = Side::ALL.map(|side| {
            world.add_collider(
                Collider::new(Vec2::ONE, side.tag())
                    .with_kind(CollisionKind::Overlap)
                    .owned_by(owner),
            )
        });

        let movement = Self {
            owner,
            size,
            sensors,
            gravity: true,
            gravity_scale: 1.0,
            jump_height: 12.0,
            max_fall_speed: 16.0,
            speed: 160.0,
            direction: Vec2::ZERO,
            velocity: 0.0,
            jumping: false,
            falling: false,
            jump_requested: false,
            climbing: false,
            blocked: [false; 4],
            hits: [0.0; 4],
        };
        if let Some(location) = world.object_location(owner) {
            movement.place_sensors(world, location, Vec2::ZERO);
        }
        movement
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn with_jump_height(mut self, jump_height: f32) -> Self {
        self.jump_height = jump_height;
        self
    }

    #[must_use]
    pub fn with_gravity(mut self, gravity: bool, scale: f32) -> Self {
        self.gravity = gravity;
        self.gravity_scale = scale;
        self
    }

    /// Remove the sensors from the world.
    pub fn detach(self, world: &mut World) {
        for sensor in self.sensors {
            world.remove_collider(sensor);
        }
    }

    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn sensor(&self, side: Side) -> ColliderId {
        self.sensors[side.index()]
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn is_jumping(&self) -> bool {
        self.jumping
    }

    pub fn is_falling(&self) -> bool {
        self.falling
    }

    pub fn is_climbing(&self) -> bool {
        self.climbing
    }

    pub fn is_blocked(&self, side: Side) -> bool {
        self.blocked[side.index()]
    }

    pub fn set_gravity(&mut self, gravity: bool) {
        self.gravity = gravity;
        if !gravity {
            self.velocity = 0.0;
            self.falling = false;
        }
    }

    /// Start a jump. Refused without gravity or while airborne.
    pub fn jump(&mut self) -> bool {
        if !self.gravity || self.jumping || self.falling {
            return false;
        }
        self.velocity = -self.jump_height;
        self.jumping = true;
        self.jump_requested = true;
        true
    }

    /// Start climbing. Refused while airborne.
    pub fn climb(&mut self) -> bool {
        if self.jumping || self.falling {
            return false;
        }
        self.climbing = true;
        true
    }

    pub fn stop_climbing(&mut self) {
        self.climbing = false;
    }

    /// Clear every jump and fall latch, e.g. after a teleport.
    pub fn force_reset_jump(&mut self) {
        self.jumping = false;
        self.falling = false;
        self.jump_requested = false;
        self.velocity = 0.0;
    }

    /// Advance one tick and move the owner.
    pub fn tick(&mut self, world: &mut World, dt: f32) {
        let Some(mut location) = world.object_location(self.owner) else {
            return;
        };

        let climb_step = if self.climbing {
            self.direction.y * self.speed * dt
        } else {
            0.0
        };
        let step = Vec2::new(self.direction.x * self.speed * dt, climb_step);

        self.place_sensors(world, location, step);
        self.sense(world);

        if !self.gravity {
            self.velocity = 0.0;
            self.falling = false;
        } else if self.is_blocked(Side::Down) {
            self.falling = false;
            self.jumping = false;
            if !self.jump_requested {
                self.velocity = 0.0;
            }
        } else {
            self.velocity = (self.velocity + self.gravity_scale).min(self.max_fall_speed);
            self.falling = true;
            self.jump_requested = false;
        }

        if step.x < 0.0 {
            if self.is_blocked(Side::Left) {
                location.x = self.hits[Side::Left.index()];
            } else {
                location.x += step.x;
            }
        } else if step.x > 0.0 {
            if self.is_blocked(Side::Right) {
                location.x = self.hits[Side::Right.index()];
            } else {
                location.x += step.x;
            }
        }

        let dy = self.velocity + step.y;
        location.y += dy;
        if dy >= 0.0 && self.is_blocked(Side::Down) {
            location.y = self.hits[Side::Down.index()];
        } else if dy < 0.0 && self.is_blocked(Side::Up) {
            location.y = self.hits[Side::Up.index()];
            self.velocity = self.velocity.max(0.0);
        }

        world.set_object_location(self.owner, location);
    }

    fn sensor_rect(&self, side: Side, location: Vec2, step: Vec2) -> Rect {
        let (w, h) = (self.size.x, self.size.y);
        let t = SENSOR_THICKNESS;
        let inset = SENSOR_INSET;
        let gravity_step = if self.gravity { self.gravity_scale } else { 0.0 };
        let down = (self.velocity + gravity_step).max(0.0) + step.y.max(0.0);
        let up = (-self.velocity).max(0.0) + (-step.y).max(0.0);

        match side {
            Side::Left => {
                let reach = t + (-step.x).max(0.0);
                Rect::from_xywh(location.x - reach, location.y + inset, reach, h - 2.0 * inset)
            }
            Side::Right => {
                let reach = t + step.x.max(0.0);
                Rect::from_xywh(location.x + w, location.y + inset, reach, h - 2.0 * inset)
            }
            Side::Up => {
                Rect::from_xywh(location.x + inset, location.y - t - up, w - 2.0 * inset, t + up)
            }
            Side::Down => {
                Rect::from_xywh(location.x + inset, location.y + h, w - 2.0 * inset, t + down)
            }
        }
    }

    fn place_sensors(&self, world: &mut World, location: Vec2, step: Vec2) {
        for side in Side::ALL {
            let rect = self.sensor_rect(side, location, step);
            if let Some(sensor) = world.collider_mut(self.sensor(side)) {
                sensor.location = rect.location;
                sensor.size = rect.size;
            }
        }
    }

    // Latch blocked flags and hit locations, and queue overlap edges for the owner.
    fn sense(&mut self, world: &mut World) {
        for side in Side::ALL {
            let sensor_id = self.sensor(side);
            world.broadcast_against_all(Some(self.owner), sensor_id);

            let Some(sensor) = world.collider(sensor_id) else {
                self.blocked[side.index()] = false;
                continue;
            };

            let mut hit: Option<f32> = None;
            for (_, target) in world.colliders() {
                if target.owner == Some(self.owner)
                    || target.kind != CollisionKind::Block
                    || !sensor.test(target)
                {
                    continue;
                }
                let rect = target.rect();
                let candidate = match side {
                    Side::Left => rect.right(),
                    Side::Right => rect.left() - self.size.x,
                    Side::Up => rect.bottom(),
                    Side::Down => rect.top() - self.size.y,
                };
                hit = Some(match (hit, side) {
                    (None, _) => candidate,
                    (Some(best), Side::Left | Side::Up) => best.max(candidate),
                    (Some(best), Side::Right | Side::Down) => best.min(candidate),
                });
            }

            self.blocked[side.index()] = hit.is_some();
            if let Some(hit) = hit {
                self.hits[side.index()] = hit;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetEntry;
    use crate::collision::OverlapEvent;
    use crate::world::DefaultCollision;

    fn place(world: &mut World, asset_id: u32, location: Vec2, kind: CollisionKind) -> ObjectId {
        let entry =
            AssetEntry::new("Game/tiles.png", Vec2::new(32.0, 32.0)).with_collision_kind(kind);
        world.insert_object(asset_id, &entry, None, location, DefaultCollision::Runtime, None)
    }

    #[test]
    fn gravity_off_keeps_velocity_and_falling_zero() {
        let mut world = World::new();
        let player = place(&mut world, 1, Vec2::new(0.0, 0.0), CollisionKind::Block);
        let mut movement = Movement::attach(&mut world, player, Vec2::new(32.0, 32.0));
        movement.set_gravity(false);
        assert!(!movement.jump());

        for _ in 0..50 {
            movement.tick(&mut world, 1.0 / 60.0);
            assert_eq!(movement.velocity(), 0.0);
            assert!(!movement.is_falling());
        }
        assert_eq!(world.object_location(player), Some(Vec2::ZERO));
    }

    #[test]
    fn falling_object_lands_on_the_floor() {
        let mut world = World::new();
        let player = place(&mut world, 1, Vec2::new(0.0, 0.0), CollisionKind::Block);
        place(&mut world, 2, Vec2::new(0.0, 100.0), CollisionKind::Block);
        let mut movement = Movement::attach(&mut world, player, Vec2::new(32.0, 32.0));

        movement.tick(&mut world, 1.0 / 60.0);
        assert!(movement.is_falling());
        assert!(!movement.jump());

        for _ in 0..30 {
            movement.tick(&mut world, 1.0 / 60.0);
        }
        assert_eq!(world.object_location(player), Some(Vec2::new(0.0, 68.0)));
        assert!(!movement.is_falling());
        assert!(movement.is_blocked(Side::Down));
        assert_eq!(movement.velocity(), 0.0);
    }

    #[test]
    fn jump_leaves_the_ground_once() {
        let mut world = World::new();
        let player = place(&mut world, 1, Vec2::new(0.0, 68.0), CollisionKind::Block);
        place(&mut world, 2, Vec2::new(0.0, 100.0), CollisionKind::Block);
        let mut movement =
            Movement::attach(&mut world, player, Vec2::new(32.0, 32.0)).with_jump_height(10.0);

        movement.tick(&mut world, 1.0 / 60.0);
        assert!(movement.jump());
        assert!(!movement.jump());

        movement.tick(&mut world, 1.0 / 60.0);
        assert_eq!(world.object_location(player), Some(Vec2::new(0.0, 58.0)));

        movement.tick(&mut world, 1.0 / 60.0);
        assert!(movement.is_falling());
        assert!(!movement.jump());

        for _ in 0..60 {
            movement.tick(&mut world, 1.0 / 60.0);
        }
        assert_eq!(world.object_location(player), Some(Vec2::new(0.0, 68.0)));
        assert!(movement.jump());
    }

    #[test]
    fn walls_stop_horizontal_movement() {
        let mut world = World::new();
        let player = place(&mut world, 1, Vec2::ZERO, CollisionKind::Block);
        place(&mut world, 2, Vec2::new(40.0, 0.0), CollisionKind::Block);
        let mut movement =
            Movement::attach(&mut world, player, Vec2::new(32.0, 32.0)).with_speed(100.0);
        movement.set_gravity(false);
        movement.direction = Vec2::new(1.0, 0.0);

        for _ in 0..5 {
            movement.tick(&mut world, 0.1);
        }
        assert_eq!(world.object_location(player), Some(Vec2::new(8.0, 0.0)));
        assert!(movement.is_blocked(Side::Right));

        movement.direction = Vec2::new(-1.0, 0.0);
        movement.tick(&mut world, 0.1);
        assert_eq!(world.object_location(player), Some(Vec2::new(-2.0, 0.0)));
    }

    #[test]
    fn overlap_targets_do_not_block_but_report_edges() {
        let mut world = World::new();
        let player = place(&mut world, 1, Vec2::ZERO, CollisionKind::Block);
        let coin = place(&mut world, 9, Vec2::new(33.0, 0.0), CollisionKind::Overlap);
        let mut movement =
            Movement::attach(&mut world, player, Vec2::new(32.0, 32.0)).with_speed(100.0);
        movement.set_gravity(false);
        movement.direction = Vec2::new(1.0, 0.0);

        movement.tick(&mut world, 0.1);
        assert!(!movement.is_blocked(Side::Right));
        assert_eq!(world.object_location(player), Some(Vec2::new(10.0, 0.0)));

        let events = world.take_overlap_events();
        assert!(events.contains(&(
            player,
            OverlapEvent::Begin {
                sender_tag: SENSOR_RIGHT_TAG,
                target_tag: 9,
                target_owner: Some(coin)
            }
        )));
    }

    #[test]
    fn climbing_moves_vertically_without_gravity() {
        let mut world = World::new();
        let player = place(&mut world, 1, Vec2::new(0.0, 100.0), CollisionKind::Block);
        let mut movement =
            Movement::attach(&mut world, player, Vec2::new(32.0, 32.0)).with_speed(50.0);
        movement.set_gravity(false);
        assert!(movement.climb());
        movement.direction = Vec2::new(0.0, -1.0);
        movement.tick(&mut world, 0.2);
        assert_eq!(world.object_location(player), Some(Vec2::new(0.0, 90.0)));

        movement.stop_climbing();
        movement.tick(&mut world, 0.2);
        assert_eq!(world.object_location(player), Some(Vec2::new(0.0, 90.0)));
    }
}
