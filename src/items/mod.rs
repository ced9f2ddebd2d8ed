//! Procedurally placed pickups and traps, one list per room, with a JSON
//! record for carrying the lists across sessions.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::constants::{get_item_count_range, get_item_weight, ITEM_HALF_SIZE, TRAP_TRIGGER_TICKS};
use crate::error::{LoadError, LoadReport};
use crate::geometry::{centered_box, overlaps};
use crate::player::PlayerState;
use crate::rng::Rng;
use crate::store::RecordStore;
use crate::types::{ItemKind, ItemView, Rect, RoomId, Vec2};
use crate::world::Room;

pub mod placement;

const ITEM_STORE_VERSION: u8 = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    pub pos: Vec2,
    pub collected: bool,
    /// Ticks left in a trap's triggered window.
    pub trap_timer: u32,
}

/// Outcome of walking over an item.
#[derive(Clone, Debug, PartialEq)]
pub struct Pickup {
    pub kind: ItemKind,
    pub message: String,
    /// Damage dealt by a trap, zero otherwise.
    pub damage: i32,
}

impl Item {
    pub fn new(kind: ItemKind, pos: Vec2) -> Self {
        Self {
            kind,
            pos,
            collected: false,
            trap_timer: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        centered_box(self.pos, ITEM_HALF_SIZE)
    }

    pub fn is_triggered(&self) -> bool {
        self.trap_timer > 0
    }

    /// Applies the effect once. A collected item yields nothing.
    pub fn collect(&mut self, player: &mut PlayerState, config: &SimulationConfig) -> Option<Pickup> {
        if self.collected {
            return None;
        }
        self.collected = true;
        let max_health = player.health.max;
        let (message, damage) = match self.kind {
            ItemKind::Medkit => {
                let amount = max_health * 50 / 100;
                player.heal(amount);
                (format!("Picked up Medkit! Restored {amount} HP."), 0)
            }
            ItemKind::Food => {
                let amount = max_health * 20 / 100;
                player.heal(amount);
                (format!("Ate Food! Restored {amount} HP."), 0)
            }
            ItemKind::Gun => {
                player.ammo = (player.ammo + 15).min(player.max_ammo);
                ("Picked up Gun! +15 ammo.".to_string(), 0)
            }
            ItemKind::Ammo => {
                player.ammo = (player.ammo + 10).min(player.max_ammo);
                ("Picked up Ammo! +10 ammo.".to_string(), 0)
            }
            ItemKind::ExtendedMagazine => {
                player.max_ammo += 10;
                ("Extended Magazine! Max ammo +10.".to_string(), 0)
            }
            ItemKind::EnhancedBullets => {
                player.bullet_damage += 5;
                ("Enhanced Bullets! Damage +5.".to_string(), 0)
            }
            ItemKind::FallingRocksTrap => {
                let amount = max_health * 40 / 100;
                self.trap_timer = TRAP_TRIGGER_TICKS;
                if player.take_damage(amount, config) {
                    (format!("Hit by falling rocks! Took {amount} damage!"), amount)
                } else {
                    ("Falling rocks! You shrugged them off.".to_string(), 0)
                }
            }
        };
        Some(Pickup {
            kind: self.kind,
            message,
            damage,
        })
    }

    pub fn to_view(&self) -> ItemView {
        ItemView {
            kind: self.kind,
            category: self.kind.category(),
            x: self.pos.x,
            y: self.pos.y,
            collected: self.collected,
            triggered: self.is_triggered(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredItem {
    #[serde(rename = "type")]
    kind: String,
    position: [f32; 2],
    collected: bool,
    #[serde(rename = "trapTimer", default)]
    trap_timer: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ItemStoreFile {
    version: u8,
    #[serde(rename = "savedAt")]
    saved_at: String,
    rooms: BTreeMap<RoomId, Vec<StoredItem>>,
}

#[derive(Clone, Debug, Deserialize)]
struct ItemStoreFileRaw {
    version: u8,
    rooms: BTreeMap<RoomId, Vec<serde_json::Value>>,
}

#[derive(Clone, Debug, Default)]
pub struct ItemManager {
    room_items: BTreeMap<RoomId, Vec<Item>>,
}

impl ItemManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh placement for every room. Rooms without a single valid spot get
    /// an empty list.
    pub fn generate(rooms: &[Room], config: &SimulationConfig, rng: &mut Rng) -> Self {
        let weights: Vec<u32> = ItemKind::ALL.iter().map(|kind| get_item_weight(*kind)).collect();
        let mut room_items = BTreeMap::new();
        for room in rooms {
            let is_entrance_or_exit = room.room_id == config.initial_room || room.is_exit;
            let is_key_room = config.key_rooms.contains(&room.room_id);
            let (min, max) = get_item_count_range(is_entrance_or_exit, is_key_room);
            let target = rng.int(min, max).max(0) as usize;

            let positions = placement::candidate_positions(room, config, rng);
            let mut items = Vec::new();
            for pos in positions.into_iter().take(target) {
                let Some(index) = rng.weighted_index(&weights) else {
                    break;
                };
                items.push(Item::new(ItemKind::ALL[index], pos));
            }
            room_items.insert(room.room_id, items);
        }
        Self { room_items }
    }

    /// Saved lists when the record is usable, otherwise a fresh placement.
    pub fn load_or_generate(
        store: &dyn RecordStore,
        rooms: &[Room],
        config: &SimulationConfig,
        rng: &mut Rng,
    ) -> (Self, LoadReport) {
        match Self::load_state(store) {
            Some((manager, report)) => (manager, report),
            None => {
                tracing::debug!("[item-store] no usable saved items, generating");
                let manager = Self::generate(rooms, config, rng);
                let loaded = manager.room_items.values().map(Vec::len).sum();
                (
                    manager,
                    LoadReport {
                        loaded,
                        skipped: Vec::new(),
                    },
                )
            }
        }
    }

    pub fn items_in(&self, room_id: RoomId) -> &[Item] {
        self.room_items
            .get(&room_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_items(&mut self, room_id: RoomId, items: Vec<Item>) {
        self.room_items.insert(room_id, items);
    }

    pub fn total_items(&self) -> usize {
        self.room_items.values().map(Vec::len).sum()
    }

    /// Collects every uncollected item the player overlaps. Collected
    /// non-trap items leave the room; traps stay behind, inert.
    pub fn check_collisions(
        &mut self,
        player: &mut PlayerState,
        room_id: RoomId,
        config: &SimulationConfig,
    ) -> Vec<Pickup> {
        let Some(items) = self.room_items.get_mut(&room_id) else {
            return Vec::new();
        };
        let player_rect = player.bounds();
        let mut pickups = Vec::new();
        for item in items.iter_mut() {
            if item.collected || !overlaps(&player_rect, &item.bounds()) {
                continue;
            }
            if let Some(pickup) = item.collect(player, config) {
                pickups.push(pickup);
            }
        }
        items.retain(|item| !item.collected || item.kind.is_trap());
        pickups
    }

    pub fn update_traps(&mut self) {
        for item in self.room_items.values_mut().flatten() {
            item.trap_timer = item.trap_timer.saturating_sub(1);
        }
    }

    pub fn save_state(&self, store: &mut dyn RecordStore) -> bool {
        let rooms = self
            .room_items
            .iter()
            .map(|(room_id, items)| {
                let stored = items
                    .iter()
                    .map(|item| StoredItem {
                        kind: item.kind.tag().to_string(),
                        position: [item.pos.x, item.pos.y],
                        collected: item.collected,
                        trap_timer: item.trap_timer,
                    })
                    .collect();
                (*room_id, stored)
            })
            .collect();
        let payload = ItemStoreFile {
            version: ITEM_STORE_VERSION,
            saved_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            rooms,
        };
        match serde_json::to_value(&payload) {
            Ok(value) => store.write(&value),
            Err(error) => {
                tracing::warn!("[item-store] failed to serialize items: {error}");
                false
            }
        }
    }

    /// `None` when the record is missing or unusable as a whole. Individual
    /// bad entries are skipped and reported.
    pub fn load_state(store: &dyn RecordStore) -> Option<(Self, LoadReport)> {
        let value = store.read()?;
        let parsed = match serde_json::from_value::<ItemStoreFileRaw>(value) {
            Ok(parsed) if parsed.version == ITEM_STORE_VERSION => parsed,
            Ok(parsed) => {
                tracing::warn!("[item-store] unsupported version {}", parsed.version);
                return None;
            }
            Err(error) => {
                tracing::warn!("[item-store] failed to parse saved items: {error}");
                return None;
            }
        };

        let mut report = LoadReport::default();
        let mut room_items = BTreeMap::new();
        for (room_id, entries) in parsed.rooms {
            let mut items = Vec::new();
            for raw in entries {
                let stored: StoredItem = match serde_json::from_value(raw) {
                    Ok(stored) => stored,
                    Err(error) => {
                        report.skipped.push(LoadError::InvalidRecord {
                            room_id,
                            reason: error.to_string(),
                        });
                        continue;
                    }
                };
                let Some(kind) = ItemKind::parse(&stored.kind) else {
                    report.skipped.push(LoadError::UnknownItemType {
                        room_id,
                        tag: stored.kind,
                    });
                    continue;
                };
                items.push(Item {
                    kind,
                    pos: Vec2::new(stored.position[0], stored.position[1]),
                    collected: stored.collected,
                    trap_timer: stored.trap_timer,
                });
                report.loaded += 1;
            }
            room_items.insert(room_id, items);
        }
        report.log("item-store");
        Some((Self { room_items }, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::world::generate_dungeon;
    use serde_json::json;

    fn player_at(x: f32, y: f32) -> (PlayerState, SimulationConfig) {
        let config = SimulationConfig::default();
        let mut player = PlayerState::new(&config);
        player.pos = Vec2::new(x, y);
        (player, config)
    }

    #[test]
    fn generated_counts_follow_room_tiers() {
        let config = SimulationConfig::default();
        let dungeon = generate_dungeon(4, 21, &config);
        let mut rng = Rng::new(21);
        let manager = ItemManager::generate(&dungeon.rooms, &config, &mut rng);
        for room in &dungeon.rooms {
            let count = manager.items_in(room.room_id).len() as i32;
            let is_entrance_or_exit = room.room_id == config.initial_room || room.is_exit;
            let (min, max) =
                get_item_count_range(is_entrance_or_exit, config.key_rooms.contains(&room.room_id));
            assert!(
                (min..=max).contains(&count),
                "room {} has {count} items",
                room.room_id
            );
            for item in manager.items_in(room.room_id) {
                assert!(placement::is_valid_position(item.pos, room, &config));
                assert_ne!(item.kind, ItemKind::Gun);
            }
        }
    }

    #[test]
    fn collision_is_idempotent_and_removes_pickups() {
        let (mut player, config) = player_at(400.0, 300.0);
        player.health.current = 50;
        let mut manager = ItemManager::new();
        manager.set_items(3, vec![Item::new(ItemKind::Medkit, Vec2::new(410.0, 300.0))]);

        let pickups = manager.check_collisions(&mut player, 3, &config);
        assert_eq!(pickups.len(), 1);
        assert_eq!(player.health.current, 100);
        assert!(manager.items_in(3).is_empty());

        player.health.current = 50;
        assert!(manager.check_collisions(&mut player, 3, &config).is_empty());
        assert_eq!(player.health.current, 50);
    }

    #[test]
    fn trap_hits_once_and_stays_inert() {
        let (mut player, config) = player_at(400.0, 300.0);
        let mut manager = ItemManager::new();
        manager.set_items(
            3,
            vec![Item::new(ItemKind::FallingRocksTrap, Vec2::new(400.0, 310.0))],
        );

        let pickups = manager.check_collisions(&mut player, 3, &config);
        assert_eq!(pickups[0].damage, 40);
        assert_eq!(player.health.current, 60);
        assert_eq!(manager.items_in(3).len(), 1);
        assert!(manager.items_in(3)[0].is_triggered());

        player.invincible_ticks = 0;
        assert!(manager.check_collisions(&mut player, 3, &config).is_empty());
        assert_eq!(player.health.current, 60);

        for _ in 0..TRAP_TRIGGER_TICKS {
            manager.update_traps();
        }
        assert!(!manager.items_in(3)[0].is_triggered());
    }

    #[test]
    fn trap_during_invincibility_deals_nothing() {
        let (mut player, config) = player_at(400.0, 300.0);
        player.invincible_ticks = 30;
        let mut trap = Item::new(ItemKind::FallingRocksTrap, player.pos);

        let pickup = trap.collect(&mut player, &config).expect("first trigger");
        assert_eq!(pickup.damage, 0);
        assert!(!pickup.message.contains("Took"));
        assert_eq!(player.health.current, 100);
        assert!(trap.is_triggered());
        assert!(trap.collect(&mut player, &config).is_none());
    }

    #[test]
    fn ammo_pickups_respect_capacity() {
        let (mut player, config) = player_at(400.0, 300.0);
        player.ammo = 25;
        let mut gun = Item::new(ItemKind::Gun, player.pos);
        gun.collect(&mut player, &config);
        assert_eq!(player.ammo, player.max_ammo);

        let mut magazine = Item::new(ItemKind::ExtendedMagazine, player.pos);
        magazine.collect(&mut player, &config);
        assert_eq!(player.max_ammo, 40);

        let mut bullets = Item::new(ItemKind::EnhancedBullets, player.pos);
        bullets.collect(&mut player, &config);
        assert_eq!(player.bullet_damage, config.bullet.damage + 5);
    }

    #[test]
    fn save_and_load_round_trip_mixed_room() {
        let mut manager = ItemManager::new();
        let mut collected = Item::new(ItemKind::Medkit, Vec2::new(300.0, 100.0));
        collected.collected = true;
        let items = vec![
            Item::new(ItemKind::Food, Vec2::new(100.0, 100.0)),
            Item::new(ItemKind::FallingRocksTrap, Vec2::new(500.0, 300.0)),
            collected,
        ];
        manager.set_items(3, items.clone());

        let mut store = MemoryStore::new();
        assert!(manager.save_state(&mut store));
        let (restored, report) = ItemManager::load_state(&store).expect("record exists");
        assert!(report.is_clean());
        assert_eq!(report.loaded, 3);
        assert_eq!(restored.items_in(3), items.as_slice());
    }

    #[test]
    fn unknown_tags_are_skipped() {
        let mut store = MemoryStore::new();
        store.write(&json!({
            "version": 1,
            "savedAt": "2026-01-01T00:00:00.000Z",
            "rooms": {
                "2": [
                    { "type": "Ammo", "position": [120.0, 140.0], "collected": false },
                    { "type": "laser", "position": [200.0, 200.0], "collected": false },
                    { "type": "food" }
                ]
            }
        }));
        let (restored, report) = ItemManager::load_state(&store).expect("record exists");
        assert_eq!(restored.items_in(2).len(), 1);
        assert_eq!(restored.items_in(2)[0].kind, ItemKind::Ammo);
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(
            &report.skipped[0],
            LoadError::UnknownItemType { room_id: 2, tag } if tag == "laser"
        ));
    }

    #[test]
    fn missing_or_foreign_record_falls_back_to_generation() {
        let config = SimulationConfig::default();
        let dungeon = generate_dungeon(3, 2, &config);
        let mut store = MemoryStore::new();
        assert!(ItemManager::load_state(&store).is_none());

        store.write(&json!({ "version": 9, "rooms": {} }));
        let mut rng = Rng::new(2);
        let (manager, report) =
            ItemManager::load_or_generate(&store, &dungeon.rooms, &config, &mut rng);
        assert!(report.is_clean());
        assert_eq!(report.loaded, manager.total_items());
        assert!(manager.total_items() > 0);
    }
}
