//! Per-room enemy and projectile pools. Only the active room ticks; the
//! others keep their enemies as they were left.

use std::collections::BTreeMap;

use crate::config::SimulationConfig;
use crate::error::LoadReport;
use crate::player::PlayerProxy;
use crate::types::{EnemyId, EnemyKind, Rect, RoomId, RuntimeEvent, Vec2};
use crate::world::Room;

mod enemy;
mod projectile;

pub use self::enemy::{step_toward, Behavior, Enemy};
pub use self::projectile::Projectile;

/// What survives of an enemy while its room is inactive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    pub hp: i32,
    pub pos: Vec2,
}

#[derive(Clone, Debug, Default)]
struct RoomPool {
    enemies: Vec<Enemy>,
    projectiles: Vec<Projectile>,
}

#[derive(Clone, Debug)]
pub struct EntityStateManager {
    config: SimulationConfig,
    pools: BTreeMap<RoomId, RoomPool>,
    snapshots: BTreeMap<RoomId, BTreeMap<EnemyId, EnemySnapshot>>,
    active: Option<RoomId>,
    next_id: u64,
}

impl EntityStateManager {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            pools: BTreeMap::new(),
            snapshots: BTreeMap::new(),
            active: None,
            next_id: 1,
        }
    }

    /// Instantiates enemies for every room that has no pool yet. Bad records
    /// are skipped and reported.
    pub fn load_all(&mut self, rooms: &[Room]) -> LoadReport {
        let mut report = LoadReport::default();
        for room in rooms {
            if self.pools.contains_key(&room.room_id) {
                continue;
            }
            let mut pool = RoomPool::default();
            for spec in &room.enemies {
                let id = self.allocate_id();
                match Enemy::from_spec(id, spec, room, &self.config) {
                    Ok(enemy) => {
                        pool.enemies.push(enemy);
                        report.loaded += 1;
                    }
                    Err(error) => report.skipped.push(error),
                }
            }
            self.pools.insert(room.room_id, pool);
        }
        report.log("entities");
        report
    }

    /// Switches the ticking room. The room being left is snapshotted and its
    /// projectiles are dropped.
    pub fn activate(&mut self, room_id: RoomId) {
        if self.active == Some(room_id) {
            return;
        }
        if let Some(previous) = self.active {
            if let Some(pool) = self.pools.get_mut(&previous) {
                let snapshot = pool
                    .enemies
                    .iter()
                    .map(|enemy| {
                        (
                            enemy.id,
                            EnemySnapshot {
                                hp: enemy.hp,
                                pos: enemy.pos,
                            },
                        )
                    })
                    .collect();
                self.snapshots.insert(previous, snapshot);
                pool.projectiles.clear();
            }
        }

        let pool = self.pools.entry(room_id).or_insert_with(|| {
            tracing::debug!("[entities] room {room_id} had no pool, creating an empty one");
            RoomPool::default()
        });
        if let Some(snapshot) = self.snapshots.get(&room_id) {
            for enemy in &mut pool.enemies {
                if let Some(saved) = snapshot.get(&enemy.id) {
                    enemy.hp = saved.hp;
                    enemy.pos = saved.pos;
                }
            }
        }
        self.active = Some(room_id);
        tracing::debug!(
            "[entities] activated room {room_id} with {} enemies",
            pool.enemies.len()
        );
    }

    /// Advances projectiles, then runs every enemy in the active room.
    pub fn update(&mut self, player: &PlayerProxy) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        let Some(room_id) = self.active else {
            return events;
        };
        let pool = self.pools.entry(room_id).or_default();

        for projectile in &mut pool.projectiles {
            projectile.advance();
        }
        pool.projectiles.retain(|projectile| !projectile.is_expired());

        for enemy in &mut pool.enemies {
            if let Some(projectile) = enemy.update(player) {
                events.push(RuntimeEvent::FireballCast {
                    enemy_id: enemy.id,
                    room: room_id,
                });
                pool.projectiles.push(projectile);
            }
        }
        events
    }

    /// Applies damage to an enemy of the active room. Returns the defeat
    /// event when the enemy dies and is removed.
    pub fn damage_enemy(&mut self, id: EnemyId, amount: i32) -> Option<RuntimeEvent> {
        let room_id = self.active?;
        let pool = self.pools.get_mut(&room_id)?;
        let index = pool.enemies.iter().position(|enemy| enemy.id == id)?;
        if pool.enemies[index].take_damage(amount) {
            return None;
        }
        let enemy = pool.enemies.remove(index);
        if let Some(snapshot) = self.snapshots.get_mut(&room_id) {
            snapshot.remove(&id);
        }
        Some(enemy.on_death(room_id))
    }

    /// Removes and returns every active projectile overlapping `bounds`.
    pub fn take_projectiles_hitting(&mut self, bounds: &Rect) -> Vec<Projectile> {
        let Some(pool) = self.active.and_then(|room_id| self.pools.get_mut(&room_id)) else {
            return Vec::new();
        };
        let (hits, rest): (Vec<_>, Vec<_>) = pool
            .projectiles
            .drain(..)
            .partition(|projectile| crate::geometry::overlaps(&projectile.bounds(), bounds));
        pool.projectiles = rest;
        hits
    }

    pub fn clear_room(&mut self, room_id: RoomId) {
        self.pools.remove(&room_id);
        self.snapshots.remove(&room_id);
    }

    pub fn clear_all(&mut self) {
        self.pools.clear();
        self.snapshots.clear();
        self.active = None;
    }

    /// Drops every pool and snapshot, reloads from `rooms` and reactivates
    /// `active`.
    pub fn reset_all(&mut self, rooms: &[Room], active: RoomId) -> LoadReport {
        self.clear_all();
        let report = self.load_all(rooms);
        self.activate(active);
        tracing::debug!(
            "[entities] reset: {} enemies loaded, {} skipped",
            report.loaded,
            report.skipped.len()
        );
        report
    }

    pub fn active_room(&self) -> Option<RoomId> {
        self.active
    }

    pub fn active_enemies(&self) -> &[Enemy] {
        self.active
            .and_then(|room_id| self.pools.get(&room_id))
            .map(|pool| pool.enemies.as_slice())
            .unwrap_or(&[])
    }

    pub fn active_projectiles(&self) -> &[Projectile] {
        self.active
            .and_then(|room_id| self.pools.get(&room_id))
            .map(|pool| pool.projectiles.as_slice())
            .unwrap_or(&[])
    }

    pub fn enemies_in(&self, room_id: RoomId) -> &[Enemy] {
        self.pools
            .get(&room_id)
            .map(|pool| pool.enemies.as_slice())
            .unwrap_or(&[])
    }

    /// Projectiles held by rooms other than the active one. Always zero
    /// unless a pool leaked.
    pub fn inactive_projectile_count(&self) -> usize {
        self.pools
            .iter()
            .filter(|(room_id, _)| Some(**room_id) != self.active)
            .map(|(_, pool)| pool.projectiles.len())
            .sum()
    }

    pub fn snapshot_of(&self, room_id: RoomId) -> Option<&BTreeMap<EnemyId, EnemySnapshot>> {
        self.snapshots.get(&room_id)
    }

    /// Live enemies per kind across every pool.
    pub fn enemy_totals(&self) -> BTreeMap<EnemyKind, usize> {
        let mut totals: BTreeMap<EnemyKind, usize> =
            EnemyKind::ALL.iter().map(|kind| (*kind, 0)).collect();
        for pool in self.pools.values() {
            for enemy in &pool.enemies {
                *totals.entry(enemy.kind).or_insert(0) += 1;
            }
        }
        totals
    }

    fn allocate_id(&mut self) -> EnemyId {
        let id = EnemyId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::geometry::circle_bounding_box;
    use crate::world::EnemySpec;

    fn proxy_at(x: f32, y: f32) -> PlayerProxy {
        let center = Vec2::new(x, y);
        PlayerProxy {
            center,
            bounds: circle_bounding_box(center, 15.0),
        }
    }

    fn rooms() -> Vec<Room> {
        let mut first = Room::new(1);
        first
            .enemies
            .push(EnemySpec::new(EnemyKind::Slime, Vec2::new(200.0, 200.0)));
        let mut second = Room::new(2);
        second
            .enemies
            .push(EnemySpec::new(EnemyKind::Wizard, Vec2::new(400.0, 300.0)));
        second
            .enemies
            .push(EnemySpec::new(EnemyKind::Bat, Vec2::new(600.0, 150.0)));
        vec![first, second]
    }

    fn manager() -> EntityStateManager {
        let mut manager = EntityStateManager::new(SimulationConfig::default());
        let report = manager.load_all(&rooms());
        assert!(report.is_clean());
        manager.activate(1);
        manager
    }

    #[test]
    fn load_skips_bad_records_and_keeps_the_rest() {
        let mut room = Room::new(3);
        room.enemies
            .push(EnemySpec::new(EnemyKind::Bat, Vec2::new(100.0, 100.0)));
        let mut unknown = EnemySpec::new(EnemyKind::Bat, Vec2::new(100.0, 100.0));
        unknown.kind = "ghost".to_string();
        room.enemies.push(unknown);
        let mut no_pos = EnemySpec::new(EnemyKind::Slime, Vec2::new(0.0, 0.0));
        no_pos.pos = None;
        room.enemies.push(no_pos);

        let mut manager = EntityStateManager::new(SimulationConfig::default());
        let report = manager.load_all(&[room]);
        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(
            report.skipped[1],
            LoadError::MissingPosition { room_id: 3, .. }
        ));
        assert_eq!(manager.enemies_in(3).len(), 1);
    }

    #[test]
    fn revisit_restores_damaged_hp() {
        let mut manager = manager();
        let id = manager.active_enemies()[0].id;
        assert!(manager.damage_enemy(id, 20).is_none());
        manager.activate(2);
        assert_eq!(manager.snapshot_of(1).map(|snap| snap[&id].hp), Some(30));
        manager.activate(1);
        assert_eq!(manager.active_enemies()[0].hp, 30);
    }

    #[test]
    fn lethal_damage_removes_enemy_and_reports_defeat() {
        let mut manager = manager();
        let id = manager.active_enemies()[0].id;
        let event = manager.damage_enemy(id, 500);
        assert!(matches!(
            event,
            Some(RuntimeEvent::EnemyDefeated {
                kind: EnemyKind::Slime,
                room: 1,
                ..
            })
        ));
        assert!(manager.active_enemies().is_empty());
        assert!(manager.damage_enemy(id, 1).is_none());
    }

    #[test]
    fn projectiles_do_not_leak_between_rooms() {
        let mut manager = manager();
        manager.activate(2);
        for _ in 0..130 {
            manager.update(&proxy_at(450.0, 300.0));
        }
        assert!(!manager.active_projectiles().is_empty());
        manager.activate(1);
        assert!(manager.active_projectiles().is_empty());
        assert_eq!(manager.inactive_projectile_count(), 0);
        manager.activate(2);
        assert!(manager.active_projectiles().is_empty());
    }

    #[test]
    fn unknown_room_gets_an_empty_pool() {
        let mut manager = manager();
        manager.activate(42);
        assert_eq!(manager.active_room(), Some(42));
        assert!(manager.update(&proxy_at(100.0, 100.0)).is_empty());
        assert!(manager.active_enemies().is_empty());
    }

    #[test]
    fn reset_all_restores_full_health_and_fresh_ids() {
        let mut manager = manager();
        let id = manager.active_enemies()[0].id;
        manager.damage_enemy(id, 10);
        let report = manager.reset_all(&rooms(), 1);
        assert_eq!(report.loaded, 3);
        assert_eq!(manager.active_enemies()[0].hp, 50);
        assert_ne!(manager.active_enemies()[0].id, id);
        assert!(manager.snapshot_of(1).is_none());
    }

    #[test]
    fn totals_count_every_pool() {
        let manager = manager();
        let totals = manager.enemy_totals();
        assert_eq!(totals[&EnemyKind::Slime], 1);
        assert_eq!(totals[&EnemyKind::Wizard], 1);
        assert_eq!(totals[&EnemyKind::Bat], 1);
        assert_eq!(totals[&EnemyKind::Guard], 0);
    }

    #[test]
    fn clear_room_forgets_its_enemies() {
        let mut manager = manager();
        manager.clear_room(2);
        assert!(manager.enemies_in(2).is_empty());
        manager.clear_all();
        assert_eq!(manager.active_room(), None);
        assert!(manager.enemies_in(1).is_empty());
    }
}
