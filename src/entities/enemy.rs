use crate::config::SimulationConfig;
use crate::constants::{
    get_enemy_stats, CASTER_ATTACK_COOLDOWN_TICKS, CASTER_ATTACK_RANGE, CASTER_RETREAT_DISTANCE,
    GUARD_ALERT_MARGIN, GUARD_ALERT_RADIUS,
};
use crate::error::LoadError;
use crate::geometry::circle_bounding_box;
use crate::player::PlayerProxy;
use crate::types::{EnemyId, EnemyKind, EnemyView, Rect, RoomId, RuntimeEvent, Vec2};
use crate::world::{EnemySpec, Room};

use super::projectile::Projectile;

/// Variant-specific transient state.
#[derive(Clone, Debug, PartialEq)]
pub enum Behavior {
    Chaser,
    Caster { cooldown: u32 },
    Guard { guard_point: Vec2, alert: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub hp: i32,
    pub max_hp: i32,
    pub speed: f32,
    pub radius: f32,
    pub behavior: Behavior,
    /// Area the center may occupy: the room interior inset by the radius.
    arena: Rect,
}

impl Enemy {
    pub fn new(id: EnemyId, kind: EnemyKind, pos: Vec2, config: &SimulationConfig) -> Self {
        let (max_hp, speed, radius) = get_enemy_stats(kind);
        let behavior = match kind {
            EnemyKind::Slime | EnemyKind::Bat => Behavior::Chaser,
            EnemyKind::Wizard => Behavior::Caster {
                cooldown: CASTER_ATTACK_COOLDOWN_TICKS,
            },
            EnemyKind::Guard => Behavior::Guard {
                guard_point: pos,
                alert: false,
            },
        };
        let inset = config.wall_width + radius;
        let arena = Rect::new(
            inset,
            inset,
            (config.screen_width - 2.0 * inset).max(0.0),
            (config.screen_height - 2.0 * inset).max(0.0),
        );
        Self {
            id,
            kind,
            pos,
            hp: max_hp,
            max_hp,
            speed,
            radius,
            behavior,
            arena,
        }
    }

    /// Builds a live enemy from a static record. The guard point falls back to
    /// the room's first chest, then to the spawn point.
    pub fn from_spec(
        id: EnemyId,
        spec: &EnemySpec,
        room: &Room,
        config: &SimulationConfig,
    ) -> Result<Self, LoadError> {
        let kind = spec.parsed_kind().ok_or_else(|| LoadError::UnknownEnemyType {
            room_id: room.room_id,
            tag: spec.kind.clone(),
        })?;
        let pos = spec.spawn_position().ok_or_else(|| LoadError::MissingPosition {
            room_id: room.room_id,
            tag: spec.kind.clone(),
        })?;
        if let Some(hp) = spec.hp {
            if hp <= 0 {
                return Err(LoadError::InvalidRecord {
                    room_id: room.room_id,
                    reason: format!("{} has non-positive hp {hp}", spec.kind),
                });
            }
        }

        let mut enemy = Self::new(id, kind, pos, config);
        if let Some(hp) = spec.hp {
            enemy.hp = hp;
            enemy.max_hp = hp;
        }
        if let Some(speed) = spec.speed {
            enemy.speed = speed.max(0.0);
        }
        if let Behavior::Guard { guard_point, .. } = &mut enemy.behavior {
            *guard_point = spec
                .guard_point
                .or_else(|| room.chests.first().map(|chest| chest.pos))
                .unwrap_or(pos);
        }
        Ok(enemy)
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn bounds(&self) -> Rect {
        circle_bounding_box(self.pos, self.radius)
    }

    /// Clamps at zero. Returns whether the enemy is still alive.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.hp = (self.hp - amount.max(0)).max(0);
        self.is_alive()
    }

    pub fn on_death(&self, room: RoomId) -> RuntimeEvent {
        RuntimeEvent::EnemyDefeated {
            enemy_id: self.id,
            kind: self.kind,
            room,
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self.behavior, Behavior::Guard { alert: true, .. })
    }

    /// One tick of behavior. Casters may hand back a projectile.
    pub fn update(&mut self, player: &PlayerProxy) -> Option<Projectile> {
        let target = player.center;
        let distance = self.pos.distance(target);
        let mut fired = None;

        match &mut self.behavior {
            Behavior::Chaser => {
                self.pos = step_toward(self.pos, target, self.speed);
            }
            Behavior::Caster { cooldown } => {
                *cooldown = cooldown.saturating_sub(1);
                if *cooldown == 0 && distance <= CASTER_ATTACK_RANGE {
                    fired = Some(Projectile::spawn(self.pos, target));
                    *cooldown = CASTER_ATTACK_COOLDOWN_TICKS;
                }
                if distance < CASTER_RETREAT_DISTANCE && distance > 0.0 {
                    self.pos.x -= (target.x - self.pos.x) / distance * self.speed;
                    self.pos.y -= (target.y - self.pos.y) / distance * self.speed;
                }
            }
            Behavior::Guard { guard_point, alert } => {
                if distance < GUARD_ALERT_RADIUS {
                    *alert = true;
                } else if distance > GUARD_ALERT_RADIUS + GUARD_ALERT_MARGIN {
                    *alert = false;
                }
                if *alert {
                    let block_point = target.midpoint(*guard_point);
                    self.pos = step_toward(self.pos, block_point, self.speed);
                }
            }
        }

        self.pos = clamp_to(self.pos, &self.arena);
        fired
    }

    pub fn to_view(&self) -> EnemyView {
        EnemyView {
            id: self.id,
            kind: self.kind,
            x: self.pos.x,
            y: self.pos.y,
            radius: self.radius,
            hp: self.hp,
            max_hp: self.max_hp,
            alert: self.is_alert(),
        }
    }
}

/// Moves each axis independently by up to `speed`, so diagonal approaches
/// close faster than straight ones.
pub fn step_toward(from: Vec2, to: Vec2, speed: f32) -> Vec2 {
    Vec2::new(
        step_axis(from.x, to.x, speed),
        step_axis(from.y, to.y, speed),
    )
}

fn step_axis(from: f32, to: f32, speed: f32) -> f32 {
    let delta = to - from;
    if delta.abs() <= speed {
        to
    } else {
        from + speed * delta.signum()
    }
}

fn clamp_to(pos: Vec2, arena: &Rect) -> Vec2 {
    Vec2::new(
        pos.x.clamp(arena.x, arena.right().max(arena.x)),
        pos.y.clamp(arena.y, arena.bottom().max(arena.y)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Chest;

    fn proxy_at(x: f32, y: f32) -> PlayerProxy {
        let center = Vec2::new(x, y);
        PlayerProxy {
            center,
            bounds: circle_bounding_box(center, 15.0),
        }
    }

    fn enemy(kind: EnemyKind, x: f32, y: f32) -> Enemy {
        Enemy::new(EnemyId(1), kind, Vec2::new(x, y), &SimulationConfig::default())
    }

    #[test]
    fn chaser_steps_both_axes() {
        let mut bat = enemy(EnemyKind::Bat, 100.0, 100.0);
        bat.update(&proxy_at(200.0, 50.0));
        assert_eq!(bat.pos, Vec2::new(101.5, 98.5));
    }

    #[test]
    fn chaser_does_not_overshoot() {
        let mut slime = enemy(EnemyKind::Slime, 100.0, 100.0);
        slime.update(&proxy_at(100.2, 100.0));
        assert_eq!(slime.pos, Vec2::new(100.2, 100.0));
    }

    #[test]
    fn caster_fires_once_at_player_and_resets_cooldown() {
        let mut wizard = enemy(EnemyKind::Wizard, 300.0, 300.0);
        wizard.behavior = Behavior::Caster { cooldown: 0 };
        let shot = wizard.update(&proxy_at(400.0, 300.0)).expect("fires");
        assert_eq!(shot.origin, Vec2::new(300.0, 300.0));
        assert!((shot.velocity.x - 5.0).abs() < 1e-4);
        assert!(shot.velocity.y.abs() < 1e-4);
        assert_eq!(
            wizard.behavior,
            Behavior::Caster {
                cooldown: CASTER_ATTACK_COOLDOWN_TICKS
            }
        );
        assert!(wizard.update(&proxy_at(400.0, 300.0)).is_none());
    }

    #[test]
    fn caster_holds_fire_out_of_range() {
        let mut wizard = enemy(EnemyKind::Wizard, 100.0, 300.0);
        wizard.behavior = Behavior::Caster { cooldown: 1 };
        assert!(wizard.update(&proxy_at(700.0, 300.0)).is_none());
        assert_eq!(wizard.behavior, Behavior::Caster { cooldown: 0 });
        assert_eq!(wizard.pos, Vec2::new(100.0, 300.0));
    }

    #[test]
    fn caster_backs_away_when_close() {
        let mut wizard = enemy(EnemyKind::Wizard, 300.0, 300.0);
        wizard.update(&proxy_at(400.0, 300.0));
        assert_eq!(wizard.pos, Vec2::new(299.5, 300.0));
    }

    #[test]
    fn guard_alert_has_hysteresis() {
        let mut guard = enemy(EnemyKind::Guard, 400.0, 300.0);
        guard.update(&proxy_at(400.0 + 290.0, 300.0));
        assert!(guard.is_alert());
        guard.pos = Vec2::new(400.0, 300.0);
        guard.update(&proxy_at(400.0 + 330.0, 300.0));
        assert!(guard.is_alert());
        guard.pos = Vec2::new(400.0, 300.0);
        guard.update(&proxy_at(400.0 + 360.0, 300.0));
        assert!(!guard.is_alert());
    }

    #[test]
    fn alert_guard_steps_toward_block_point() {
        let mut guard = enemy(EnemyKind::Guard, 400.0, 300.0);
        let guard_point = Vec2::new(400.0, 300.0);
        let player = proxy_at(600.0, 200.0);
        guard.update(&player);
        assert!(guard.is_alert());
        assert_eq!(player.center.midpoint(guard_point), Vec2::new(500.0, 250.0));
        assert_eq!(guard.pos, Vec2::new(401.5, 298.5));
        guard.update(&player);
        assert_eq!(guard.pos, Vec2::new(403.0, 297.0));
    }

    #[test]
    fn idle_guard_stays_put() {
        let mut guard = enemy(EnemyKind::Guard, 400.0, 300.0);
        guard.update(&proxy_at(400.0, 700.0));
        assert!(!guard.is_alert());
        assert_eq!(guard.pos, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn guard_point_falls_back_to_first_chest() {
        let config = SimulationConfig::default();
        let mut room = Room::new(4);
        room.chests.push(Chest {
            pos: Vec2::new(600.0, 450.0),
            is_got: false,
        });
        let spec = EnemySpec::new(EnemyKind::Guard, Vec2::new(200.0, 200.0));
        let guard = Enemy::from_spec(EnemyId(3), &spec, &room, &config).expect("valid spec");
        assert_eq!(
            guard.behavior,
            Behavior::Guard {
                guard_point: Vec2::new(600.0, 450.0),
                alert: false
            }
        );
    }

    #[test]
    fn from_spec_reports_unknown_type() {
        let config = SimulationConfig::default();
        let room = Room::new(2);
        let mut spec = EnemySpec::new(EnemyKind::Slime, Vec2::new(1.0, 1.0));
        spec.kind = "dragon".to_string();
        let result = Enemy::from_spec(EnemyId(1), &spec, &room, &config);
        assert_eq!(
            result,
            Err(LoadError::UnknownEnemyType {
                room_id: 2,
                tag: "dragon".to_string()
            })
        );
    }

    #[test]
    fn take_damage_clamps_at_zero() {
        let mut slime = enemy(EnemyKind::Slime, 100.0, 100.0);
        assert!(slime.take_damage(20));
        assert!(!slime.take_damage(100));
        assert_eq!(slime.hp, 0);
    }
}
