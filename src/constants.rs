use crate::types::{EnemyKind, ItemKind};

pub const TICK_RATE: u32 = 60;

pub const ENEMY_CONTACT_DAMAGE: i32 = 10;

pub const CASTER_ATTACK_COOLDOWN_TICKS: u32 = 120;
pub const CASTER_ATTACK_RANGE: f32 = 300.0;
pub const CASTER_RETREAT_DISTANCE: f32 = 150.0;

pub const GUARD_ALERT_RADIUS: f32 = 300.0;
pub const GUARD_ALERT_MARGIN: f32 = 50.0;

pub const FIREBALL_SPEED: f32 = 5.0;
pub const FIREBALL_DAMAGE: i32 = 10;
pub const FIREBALL_LIFETIME_TICKS: u32 = 180;
pub const FIREBALL_RADIUS: f32 = 8.0;

pub const ITEM_HALF_SIZE: f32 = 15.0;
pub const CHEST_HALF_SIZE: f32 = 15.0;
pub const TRAP_TRIGGER_TICKS: u32 = 60;

pub const PLACEMENT_BORDER_MARGIN: f32 = 40.0;
pub const PLACEMENT_RANDOM_MARGIN: f32 = 60.0;
pub const PLACEMENT_MIN_SPACING: f32 = 50.0;
pub const PLACEMENT_RANDOM_ATTEMPTS: usize = 20;
pub const PLACEMENT_MIN_SAFE_ZONES: usize = 8;
pub const PLACEMENT_MAX_SAFE_ZONES: usize = 12;
pub const PLACEMENT_OPEN_AREA_PROBE: f32 = 40.0;
pub const PLACEMENT_OPEN_AREA_MIN_CLEAR: usize = 5;

/// (max_hp, speed, radius)
pub fn get_enemy_stats(kind: EnemyKind) -> (i32, f32, f32) {
    match kind {
        EnemyKind::Slime => (50, 0.5, 20.0),
        EnemyKind::Bat => (30, 1.5, 14.0),
        EnemyKind::Wizard => (75, 0.5, 20.0),
        EnemyKind::Guard => (150, 1.5, 24.0),
    }
}

/// Spawn weight of each item kind; rarer kinds weigh less.
pub fn get_item_weight(kind: ItemKind) -> u32 {
    match kind {
        ItemKind::Food => 30,
        ItemKind::Ammo => 25,
        ItemKind::FallingRocksTrap => 20,
        ItemKind::Medkit => 10,
        ItemKind::Gun => 0,
        ItemKind::ExtendedMagazine => 4,
        ItemKind::EnhancedBullets => 3,
    }
}

/// Inclusive item-count range for a room tier.
pub fn get_item_count_range(is_entrance_or_exit: bool, is_key_room: bool) -> (i32, i32) {
    if is_entrance_or_exit {
        return (1, 2);
    }
    if is_key_room {
        return (2, 4);
    }
    (1, 3)
}
