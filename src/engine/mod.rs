use std::collections::BTreeMap;
use std::path::Path;

use crate::config::SimulationConfig;
use crate::constants::CHEST_HALF_SIZE;
use crate::entities::{Enemy, EntityStateManager, Projectile};
use crate::error::LoadReport;
use crate::geometry::{centered_box, overlaps};
use crate::items::{Item, ItemManager};
use crate::player::{PlayerInput, PlayerState};
use crate::population::{self, DesiredCounts, PopulationReport};
use crate::rng::Rng;
use crate::store::{JsonFileStore, MemoryStore, RecordStore};
use crate::types::{
    Direction, EnemyKind, GameOutcome, RoomId, RunSummary, RuntimeEvent, Snapshot, TipView,
    TransitionLock,
};
use crate::world::{DungeonData, Room};

mod combat_system;
mod objective_system;
mod spawn_system;
mod transition_system;
mod utils;

use self::utils::{clear_of_walls, crosses_gap, entry_position, minimap_step};

/// Where item state and the room configuration are kept between runs.
pub struct EngineStores {
    pub items: Box<dyn RecordStore>,
    pub rooms: Box<dyn RecordStore>,
}

impl EngineStores {
    pub fn in_memory() -> Self {
        Self {
            items: Box::new(MemoryStore::new()),
            rooms: Box::new(MemoryStore::new()),
        }
    }

    pub fn on_disk(dir: &Path) -> Self {
        Self {
            items: Box::new(JsonFileStore::new(
                dir.join("items_state.json"),
                "item-store",
            )),
            rooms: Box::new(JsonFileStore::new(
                dir.join("rooms_config.json"),
                "room-store",
            )),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct RunStats {
    transitions: u32,
    enemies_defeated: u32,
    items_collected: u32,
    traps_triggered: u32,
    damage_taken: i32,
}

#[derive(Clone, Debug)]
struct Tip {
    text: String,
    ticks_left: u32,
}

pub struct GameEngine {
    pub config: SimulationConfig,

    /// Room configuration as loaded or last randomized, chests untouched.
    base_dungeon: DungeonData,
    dungeon: DungeonData,
    rng: Rng,
    player: PlayerState,
    entities: EntityStateManager,
    items: ItemManager,
    stores: EngineStores,

    explored_rooms: Vec<RoomId>,
    minimap_positions: BTreeMap<RoomId, (i32, i32)>,
    has_treasure: bool,
    outcome: Option<GameOutcome>,
    tip: Option<Tip>,
    events: Vec<RuntimeEvent>,
    stats: RunStats,
    tick_counter: u64,
    load_report: LoadReport,
}

impl GameEngine {
    pub fn new(dungeon: DungeonData, config: SimulationConfig, seed: u32) -> Self {
        Self::with_stores(dungeon, config, seed, EngineStores::in_memory())
    }

    /// A saved room configuration in `stores.rooms` takes precedence over
    /// `dungeon`; saved items are restored when readable.
    pub fn with_stores(
        dungeon: DungeonData,
        config: SimulationConfig,
        seed: u32,
        stores: EngineStores,
    ) -> Self {
        let mut base_dungeon = match stores.rooms.read() {
            Some(value) => match serde_json::from_value::<DungeonData>(value) {
                Ok(saved) => {
                    tracing::debug!("[engine] using saved room configuration");
                    saved
                }
                Err(error) => {
                    tracing::warn!("[room-store] ignoring unreadable room configuration: {error}");
                    dungeon
                }
            },
            None => dungeon,
        };
        base_dungeon.reset_chests();

        let mut load_report = base_dungeon.validate();
        load_report.log("rooms");

        let mut rng = Rng::new(seed);
        let player = PlayerState::new(&config);
        let dungeon = base_dungeon.clone();
        let mut entities = EntityStateManager::new(config.clone());
        load_report.merge(entities.load_all(&dungeon.rooms));
        entities.activate(player.current_room);
        let (items, item_report) =
            ItemManager::load_or_generate(stores.items.as_ref(), &dungeon.rooms, &config, &mut rng);
        load_report.merge(item_report);

        let mut engine = Self {
            config,
            base_dungeon,
            dungeon,
            rng,
            player,
            entities,
            items,
            stores,
            explored_rooms: Vec::new(),
            minimap_positions: BTreeMap::new(),
            has_treasure: false,
            outcome: None,
            tip: None,
            events: Vec::new(),
            stats: RunStats::default(),
            tick_counter: 0,
            load_report,
        };
        engine.reset_exploration();
        engine
    }

    /// One fixed step: input, transition, entities, collisions, traps.
    pub fn step(&mut self, input: &PlayerInput) {
        if self.outcome.is_some() {
            return;
        }
        self.tick_counter += 1;
        self.tick_tip();

        let room_id = self.player.current_room;
        let fallback = Room::new(room_id);
        let room = self.dungeon.room(room_id).unwrap_or(&fallback);
        self.player.apply_input(input, room, &self.config);
        if input.shoot {
            self.player.shoot(&self.config);
        }
        self.player.tick(&self.config);

        self.resolve_transition();
        self.update_entities();
        self.resolve_bullet_hits();
        self.resolve_enemy_contact();
        self.resolve_projectile_hits();
        self.check_item_collisions();
        self.check_chest_and_exit();
        self.items.update_traps();

        if !self.player.is_alive() && self.outcome.is_none() {
            self.outcome = Some(GameOutcome::Died);
            self.show_tip("You Died!", 1);
            self.events.push(RuntimeEvent::PlayerDied);
            tracing::debug!("[engine] player died at tick {}", self.tick_counter);
        }
    }

    pub fn update_entities(&mut self) {
        let proxy = self.player.proxy();
        let events = self.entities.update(&proxy);
        self.events.extend(events);
    }

    pub fn show_tip(&mut self, text: &str, duration_secs: u32) {
        self.tip = Some(Tip {
            text: text.to_string(),
            ticks_left: duration_secs * crate::constants::TICK_RATE,
        });
    }

    fn tick_tip(&mut self) {
        if let Some(tip) = &mut self.tip {
            tip.ticks_left = tip.ticks_left.saturating_sub(1);
            if tip.ticks_left == 0 {
                self.tip = None;
            }
        }
    }

    pub fn current_room(&self) -> RoomId {
        self.player.current_room
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn active_enemies(&self) -> &[Enemy] {
        self.entities.active_enemies()
    }

    pub fn active_projectiles(&self) -> &[Projectile] {
        self.entities.active_projectiles()
    }

    pub fn current_room_items(&self) -> &[Item] {
        self.items.items_in(self.player.current_room)
    }

    pub fn explored_rooms(&self) -> &[RoomId] {
        &self.explored_rooms
    }

    pub fn minimap_positions(&self) -> &BTreeMap<RoomId, (i32, i32)> {
        &self.minimap_positions
    }

    pub fn dungeon(&self) -> &DungeonData {
        &self.dungeon
    }

    pub fn has_treasure(&self) -> bool {
        self.has_treasure
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// Live enemies per kind across all rooms.
    pub fn enemy_totals(&self) -> BTreeMap<EnemyKind, usize> {
        self.entities.enemy_totals()
    }

    /// Enemies per kind in the room configuration, for prefilling a
    /// population request.
    pub fn configured_totals(&self) -> BTreeMap<EnemyKind, usize> {
        population::configured_totals(&self.base_dungeon)
    }

    /// Projectiles parked in rooms other than the current one.
    pub fn leaked_projectiles(&self) -> usize {
        self.entities.inactive_projectile_count()
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            player: self.player.to_view(),
            enemies: self
                .entities
                .active_enemies()
                .iter()
                .map(Enemy::to_view)
                .collect(),
            projectiles: self
                .entities
                .active_projectiles()
                .iter()
                .map(Projectile::to_view)
                .collect(),
            items: self.current_room_items().iter().map(Item::to_view).collect(),
            explored_rooms: self.explored_rooms.clone(),
            minimap_positions: self.minimap_positions.clone(),
            has_treasure: self.has_treasure,
            tip: self.tip.as_ref().map(|tip| TipView {
                text: tip.text.clone(),
                ticks_left: tip.ticks_left,
            }),
            outcome: self.outcome,
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn build_summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.tick_counter,
            outcome: self.outcome,
            rooms_explored: self.explored_rooms.len(),
            rooms_total: self.dungeon.rooms.len(),
            has_treasure: self.has_treasure,
            transitions: self.stats.transitions,
            enemies_defeated: self.stats.enemies_defeated,
            items_collected: self.stats.items_collected,
            traps_triggered: self.stats.traps_triggered,
            damage_taken: self.stats.damage_taken,
            health: self.player.health.current,
            enemies_remaining: self.entities.enemy_totals(),
        }
    }
}
