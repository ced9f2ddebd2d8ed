use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type RoomId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyId(pub u64);

/// Wall side a gap sits on. The derived ordering is the order transitions are
/// tested in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Top,
    Bottom,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Top,
        Direction::Bottom,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "top" | "up" => Some(Self::Top),
            "bottom" | "down" => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }

    /// Unit grid offset (dx, dy) with y growing downwards.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::Top => (0, -1),
            Self::Bottom => (0, 1),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Slow ground chaser.
    Slime,
    /// Fast flying chaser.
    Bat,
    /// Ranged caster that fires fireballs.
    Wizard,
    /// Interposes itself between the player and a guarded point.
    Guard,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 4] = [
        EnemyKind::Slime,
        EnemyKind::Bat,
        EnemyKind::Wizard,
        EnemyKind::Guard,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "slime" | "mummy" => Some(Self::Slime),
            "bat" => Some(Self::Bat),
            "wizard" => Some(Self::Wizard),
            "guard" => Some(Self::Guard),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Slime => "slime",
            Self::Bat => "bat",
            Self::Wizard => "wizard",
            Self::Guard => "guard",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Consumable,
    Ammo,
    Upgrade,
    Trap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(rename = "food")]
    Food,
    #[serde(rename = "medkit")]
    Medkit,
    #[serde(rename = "gun")]
    Gun,
    #[serde(rename = "ammo")]
    Ammo,
    #[serde(rename = "magazine")]
    ExtendedMagazine,
    #[serde(rename = "enhanced_bullets")]
    EnhancedBullets,
    #[serde(rename = "trap")]
    FallingRocksTrap,
}

impl ItemKind {
    pub const ALL: [ItemKind; 7] = [
        ItemKind::Food,
        ItemKind::Medkit,
        ItemKind::Gun,
        ItemKind::Ammo,
        ItemKind::ExtendedMagazine,
        ItemKind::EnhancedBullets,
        ItemKind::FallingRocksTrap,
    ];

    /// Accepts both the short tag and the display-type name used by older saves.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "food" | "Food" => Some(Self::Food),
            "medkit" | "Medkit" => Some(Self::Medkit),
            "gun" | "Gun" => Some(Self::Gun),
            "ammo" | "Ammo" => Some(Self::Ammo),
            "magazine" | "ExtendedMagazine" => Some(Self::ExtendedMagazine),
            "enhanced_bullets" | "EnhancedBullets" => Some(Self::EnhancedBullets),
            "trap" | "FallingRocksTrap" => Some(Self::FallingRocksTrap),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Medkit => "medkit",
            Self::Gun => "gun",
            Self::Ammo => "ammo",
            Self::ExtendedMagazine => "magazine",
            Self::EnhancedBullets => "enhanced_bullets",
            Self::FallingRocksTrap => "trap",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Medkit => "Medkit",
            Self::Gun => "Gun",
            Self::Ammo => "Ammo",
            Self::ExtendedMagazine => "Extended Magazine",
            Self::EnhancedBullets => "Enhanced Bullets",
            Self::FallingRocksTrap => "Falling Rocks Trap",
        }
    }

    pub fn category(self) -> ItemCategory {
        match self {
            Self::Food | Self::Medkit => ItemCategory::Consumable,
            Self::Gun | Self::Ammo => ItemCategory::Ammo,
            Self::ExtendedMagazine | Self::EnhancedBullets => ItemCategory::Upgrade,
            Self::FallingRocksTrap => ItemCategory::Trap,
        }
    }

    pub fn is_trap(self) -> bool {
        self == Self::FallingRocksTrap
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn midpoint(self, other: Vec2) -> Vec2 {
        Vec2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Axis-aligned rectangle, top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionLock {
    Free,
    Locked,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    #[serde(rename = "currentRoom")]
    pub current_room: RoomId,
    pub lock: TransitionLock,
    pub health: i32,
    #[serde(rename = "maxHealth")]
    pub max_health: i32,
    pub alive: bool,
    pub ammo: i32,
    #[serde(rename = "maxAmmo")]
    pub max_ammo: i32,
    #[serde(rename = "bulletDamage")]
    pub bullet_damage: i32,
    #[serde(rename = "bulletCount")]
    pub bullet_count: usize,
    pub invincible: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnemyView {
    pub id: EnemyId,
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub hp: i32,
    #[serde(rename = "maxHp")]
    pub max_hp: i32,
    pub alert: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProjectileView {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub damage: i32,
    #[serde(rename = "lifetimeLeft")]
    pub lifetime_left: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct ItemView {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub category: ItemCategory,
    pub x: f32,
    pub y: f32,
    pub collected: bool,
    pub triggered: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    RoomEntered {
        from: RoomId,
        to: RoomId,
        direction: Direction,
        #[serde(rename = "firstVisit")]
        first_visit: bool,
    },
    EnemyDefeated {
        #[serde(rename = "enemyId")]
        enemy_id: EnemyId,
        #[serde(rename = "enemyType")]
        kind: EnemyKind,
        room: RoomId,
    },
    FireballCast {
        #[serde(rename = "enemyId")]
        enemy_id: EnemyId,
        room: RoomId,
    },
    PlayerHit {
        damage: i32,
        source: String,
    },
    ItemCollected {
        #[serde(rename = "itemType")]
        kind: ItemKind,
        room: RoomId,
        message: String,
    },
    TrapTriggered {
        room: RoomId,
        damage: i32,
    },
    TreasureFound {
        room: RoomId,
    },
    ExitLocked,
    Victory,
    PlayerDied,
    PopulationChanged {
        totals: BTreeMap<EnemyKind, usize>,
    },
    Toast {
        message: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Victory,
    Died,
}

#[derive(Clone, Debug, Serialize)]
pub struct TipView {
    pub text: String,
    #[serde(rename = "ticksLeft")]
    pub ticks_left: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub player: PlayerView,
    pub enemies: Vec<EnemyView>,
    pub projectiles: Vec<ProjectileView>,
    pub items: Vec<ItemView>,
    #[serde(rename = "exploredRooms")]
    pub explored_rooms: Vec<RoomId>,
    #[serde(rename = "minimapPositions")]
    pub minimap_positions: BTreeMap<RoomId, (i32, i32)>,
    #[serde(rename = "hasTreasure")]
    pub has_treasure: bool,
    pub tip: Option<TipView>,
    pub outcome: Option<GameOutcome>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub outcome: Option<GameOutcome>,
    #[serde(rename = "roomsExplored")]
    pub rooms_explored: usize,
    #[serde(rename = "roomsTotal")]
    pub rooms_total: usize,
    #[serde(rename = "hasTreasure")]
    pub has_treasure: bool,
    pub transitions: u32,
    #[serde(rename = "enemiesDefeated")]
    pub enemies_defeated: u32,
    #[serde(rename = "itemsCollected")]
    pub items_collected: u32,
    #[serde(rename = "trapsTriggered")]
    pub traps_triggered: u32,
    #[serde(rename = "damageTaken")]
    pub damage_taken: i32,
    pub health: i32,
    #[serde(rename = "enemiesRemaining")]
    pub enemies_remaining: BTreeMap<EnemyKind, usize>,
}
