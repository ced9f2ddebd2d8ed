use super::*;

const TREASURE_TIP: &str = "Found the treasure! You can go to the exit!";
const EXIT_LOCKED_TIP: &str = "Treasure not found yet!";

impl GameEngine {
    /// Applies pickups under the player and returns their messages in
    /// pickup order.
    pub fn check_item_collisions(&mut self) -> Vec<String> {
        let room = self.player.current_room;
        let pickups = self
            .items
            .check_collisions(&mut self.player, room, &self.config);
        let mut messages = Vec::with_capacity(pickups.len());
        for pickup in pickups {
            if pickup.kind.is_trap() {
                self.stats.traps_triggered += 1;
                self.stats.damage_taken += pickup.damage;
                self.events.push(RuntimeEvent::TrapTriggered {
                    room,
                    damage: pickup.damage,
                });
            } else {
                self.stats.items_collected += 1;
            }
            self.show_tip(&pickup.message, self.config.tip_duration_secs);
            self.events.push(RuntimeEvent::ItemCollected {
                kind: pickup.kind,
                room,
                message: pickup.message.clone(),
            });
            messages.push(pickup.message);
        }
        messages
    }

    /// Picks up chests and checks the exit. Returns the outcome once the run
    /// is won.
    pub fn check_chest_and_exit(&mut self) -> Option<GameOutcome> {
        let room_id = self.player.current_room;
        let player_rect = self.player.bounds();
        let exit_rect = self.config.exit_rect();
        let room = self.dungeon.room_mut(room_id)?;

        let mut found = false;
        for chest in room.chests.iter_mut().filter(|chest| !chest.is_got) {
            if overlaps(&player_rect, &centered_box(chest.pos, CHEST_HALF_SIZE)) {
                chest.is_got = true;
                found = true;
            }
        }
        let at_exit = room.is_exit && overlaps(&player_rect, &exit_rect);

        if found {
            self.has_treasure = true;
            self.show_tip(TREASURE_TIP, 3);
            self.events.push(RuntimeEvent::TreasureFound { room: room_id });
        }
        if !at_exit {
            return None;
        }
        if self.has_treasure {
            self.outcome = Some(GameOutcome::Victory);
            self.show_tip("You win!", 2);
            self.events.push(RuntimeEvent::Victory);
            tracing::debug!("[objective] victory at tick {}", self.tick_counter);
            return self.outcome;
        }
        let already_told = self
            .tip
            .as_ref()
            .map(|tip| tip.text == EXIT_LOCKED_TIP)
            .unwrap_or(false);
        if !already_told {
            self.events.push(RuntimeEvent::ExitLocked);
        }
        self.show_tip(EXIT_LOCKED_TIP, 2);
        None
    }
}
