use super::*;

impl GameEngine {
    /// Fresh run on the current base configuration: saved items are
    /// discarded, chests refilled, every enemy reloaded at full health.
    pub fn restart(&mut self) {
        self.stores.items.remove();
        self.dungeon = self.base_dungeon.clone();
        self.dungeon.reset_chests();

        self.player = PlayerState::new(&self.config);
        self.reset_exploration();
        self.has_treasure = false;
        self.outcome = None;
        self.tip = None;
        self.stats = RunStats::default();

        let report = self
            .entities
            .reset_all(&self.dungeon.rooms, self.player.current_room);
        self.items = ItemManager::generate(&self.dungeon.rooms, &self.config, &mut self.rng);
        tracing::debug!(
            "[engine] restarted: {} enemies, {} items",
            report.loaded,
            self.items.total_items()
        );
        self.load_report = report;
    }

    /// Redistributes configured enemies, persists the new room configuration
    /// and reloads every pool. Chest and item state is kept.
    pub fn randomize_population(&mut self, desired: &DesiredCounts) -> PopulationReport {
        let report = population::randomize_population(
            &mut self.base_dungeon,
            desired,
            &self.config,
            &mut self.rng,
        );
        self.persist_room_config();

        for room in &mut self.dungeon.rooms {
            if let Some(base) = self.base_dungeon.room(room.room_id) {
                room.enemies = base.enemies.clone();
            }
        }
        self.load_report = self
            .entities
            .reset_all(&self.dungeon.rooms, self.player.current_room);
        self.events.push(RuntimeEvent::PopulationChanged {
            totals: self.entities.enemy_totals(),
        });
        report
    }

    pub fn save_item_state(&mut self) -> bool {
        self.items.save_state(self.stores.items.as_mut())
    }

    fn persist_room_config(&mut self) {
        match serde_json::to_value(&self.base_dungeon) {
            Ok(value) => {
                if !self.stores.rooms.write(&value) {
                    tracing::warn!("[engine] room configuration was not persisted");
                }
            }
            Err(error) => {
                tracing::warn!("[engine] failed to serialize room configuration: {error}");
            }
        }
    }

    pub(super) fn reset_exploration(&mut self) {
        let start = self.config.initial_room;
        self.explored_rooms = vec![start];
        self.minimap_positions = BTreeMap::from([(start, (0, 0))]);
    }
}
