use crate::config::SimulationConfig;
use crate::geometry::{circle_bounding_box, wall_blocks};
use crate::types::{PlayerView, Rect, RoomId, TransitionLock, Vec2};
use crate::world::Room;

/// Movement and fire intent for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub shoot: bool,
}

/// What enemies get to see of the player each tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerProxy {
    pub center: Vec2,
    pub bounds: Rect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.current = (self.current - amount).max(0);
        self.is_alive()
    }

    pub fn heal(&mut self, amount: i32) {
        self.current = (self.current + amount).min(self.max);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bullet {
    pub pos: Vec2,
    pub angle_deg: f32,
    pub speed: f32,
    pub damage: i32,
    pub radius: f32,
    pub lifetime_left: u32,
}

impl Bullet {
    pub fn bounds(&self) -> Rect {
        circle_bounding_box(self.pos, self.radius)
    }

    /// Returns false once the bullet has expired or left the screen.
    fn advance(&mut self, config: &SimulationConfig) -> bool {
        let rad = self.angle_deg.to_radians();
        self.pos.x += rad.cos() * self.speed;
        self.pos.y -= rad.sin() * self.speed;
        self.lifetime_left = self.lifetime_left.saturating_sub(1);
        self.lifetime_left > 0
            && self.pos.x >= 0.0
            && self.pos.x <= config.screen_width
            && self.pos.y >= 0.0
            && self.pos.y <= config.screen_height
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub pos: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub current_room: RoomId,
    pub lock: TransitionLock,
    pub health: Health,
    pub ammo: i32,
    pub max_ammo: i32,
    pub bullet_damage: i32,
    pub bullets: Vec<Bullet>,
    pub facing_deg: f32,
    pub shoot_cooldown: u32,
    pub invincible_ticks: u32,
}

impl PlayerState {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            pos: config.initial_position,
            radius: config.player.radius,
            speed: config.player.speed,
            current_room: config.initial_room,
            lock: TransitionLock::Free,
            health: Health::new(config.player.max_health),
            ammo: config.player.initial_ammo,
            max_ammo: config.player.max_ammo,
            bullet_damage: config.bullet.damage,
            bullets: Vec::new(),
            facing_deg: 0.0,
            shoot_cooldown: 0,
            invincible_ticks: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        circle_bounding_box(self.pos, self.radius)
    }

    pub fn proxy(&self) -> PlayerProxy {
        PlayerProxy {
            center: self.pos,
            bounds: self.bounds(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    /// Moves one step per pressed axis, clamps to the screen, and undoes any
    /// axis whose move ends inside a wall.
    pub fn apply_input(&mut self, input: &PlayerInput, room: &Room, config: &SimulationConfig) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if input.up {
            dy -= self.speed;
            self.facing_deg = 90.0;
        }
        if input.down {
            dy += self.speed;
            self.facing_deg = 270.0;
        }
        if input.left {
            dx -= self.speed;
            self.facing_deg = 180.0;
        }
        if input.right {
            dx += self.speed;
            self.facing_deg = 0.0;
        }

        let min_x = self.radius;
        let max_x = config.screen_width - self.radius;
        let min_y = self.radius;
        let max_y = config.screen_height - self.radius;

        if dx != 0.0 {
            let next = Vec2::new((self.pos.x + dx).clamp(min_x, max_x), self.pos.y);
            if !wall_blocks(next, self.radius, room) {
                self.pos = next;
            }
        }
        if dy != 0.0 {
            let next = Vec2::new(self.pos.x, (self.pos.y + dy).clamp(min_y, max_y));
            if !wall_blocks(next, self.radius, room) {
                self.pos = next;
            }
        }
    }

    pub fn shoot(&mut self, config: &SimulationConfig) -> bool {
        if self.shoot_cooldown > 0
            || self.bullets.len() >= config.bullet.max_bullets
            || !self.is_alive()
            || self.ammo <= 0
        {
            return false;
        }
        self.bullets.push(Bullet {
            pos: self.pos,
            angle_deg: self.facing_deg,
            speed: config.bullet.speed,
            damage: self.bullet_damage,
            radius: config.bullet.radius,
            lifetime_left: config.bullet.lifetime_ticks,
        });
        self.shoot_cooldown = config.bullet.cooldown_ticks;
        self.ammo -= 1;
        true
    }

    /// Cooldowns and bullet flight for one tick.
    pub fn tick(&mut self, config: &SimulationConfig) {
        self.shoot_cooldown = self.shoot_cooldown.saturating_sub(1);
        self.invincible_ticks = self.invincible_ticks.saturating_sub(1);
        self.bullets.retain_mut(|bullet| bullet.advance(config));
    }

    /// Ignored while invincible or dead. Returns whether damage landed.
    pub fn take_damage(&mut self, amount: i32, config: &SimulationConfig) -> bool {
        if self.invincible_ticks > 0 || !self.is_alive() {
            return false;
        }
        self.health.take_damage(amount);
        self.invincible_ticks = config.player.invincible_ticks;
        true
    }

    pub fn heal(&mut self, amount: i32) {
        self.health.heal(amount);
    }

    pub fn to_view(&self) -> PlayerView {
        PlayerView {
            x: self.pos.x,
            y: self.pos.y,
            radius: self.radius,
            current_room: self.current_room,
            lock: self.lock,
            health: self.health.current,
            max_health: self.health.max,
            alive: self.is_alive(),
            ammo: self.ammo,
            max_ammo: self.max_ammo,
            bullet_damage: self.bullet_damage,
            bullet_count: self.bullets.len(),
            invincible: self.invincible_ticks > 0,
        }
    }
}
