use super::*;

impl GameEngine {
    /// Moves the player through a gap when one is reached. At most one
    /// transition per call; returns the room entered.
    pub fn resolve_transition(&mut self) -> Option<RoomId> {
        let radius = self.player.radius;
        if self.player.lock == TransitionLock::Locked {
            if clear_of_walls(self.player.pos, radius, &self.config) {
                self.player.lock = TransitionLock::Free;
            }
            return None;
        }

        let from = self.player.current_room;
        let room = self.dungeon.room(from)?;
        let (dir, to) = Direction::ALL.iter().find_map(|&dir| {
            let gap = room.gaps.get(&dir)?;
            let to = self.dungeon.room_neighbors.neighbor(from, dir)?;
            if self.dungeon.room(to).is_none() {
                return None;
            }
            crosses_gap(dir, gap, self.player.pos, radius).then_some((dir, to))
        })?;

        self.player.pos = entry_position(dir, self.player.pos, radius, &self.config);
        self.player.current_room = to;
        self.player.lock = TransitionLock::Locked;
        self.player.bullets.clear();
        self.entities.activate(to);
        self.stats.transitions += 1;

        let first_visit = !self.explored_rooms.contains(&to);
        if first_visit {
            self.explored_rooms.push(to);
            let prev = self.minimap_positions.get(&from).copied().unwrap_or((0, 0));
            self.minimap_positions
                .insert(to, minimap_step(prev, dir, self.config.minimap_cell_size));
        }
        tracing::debug!(
            "[transition] room {from} -> {to} via {dir:?} (first visit: {first_visit})"
        );
        self.events.push(RuntimeEvent::RoomEntered {
            from,
            to,
            direction: dir,
            first_visit,
        });
        Some(to)
    }
}
