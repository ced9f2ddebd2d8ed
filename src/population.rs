//! Redistributes configured enemies so each kind reaches a requested total.
//! Works on the static room records; the caller reloads live entities after.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::items::placement::candidate_positions;
use crate::rng::Rng;
use crate::types::{EnemyKind, RoomId, Vec2};
use crate::world::{DungeonData, EnemySpec, Room};

/// Requested total per kind. `None` leaves that kind alone.
pub type DesiredCounts = BTreeMap<EnemyKind, Option<usize>>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KindChange {
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    pub before: usize,
    pub after: usize,
    /// Requested enemies that found no free slot.
    pub shortfall: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PopulationReport {
    pub changes: Vec<KindChange>,
}

impl PopulationReport {
    pub fn is_satisfied(&self) -> bool {
        self.changes.iter().all(|change| change.shortfall == 0)
    }
}

/// Parses `slime=4,bat=2,wizard=keep`. Unknown kinds and bad counts are
/// rejected with a message.
pub fn parse_desired_counts(text: &str) -> Result<DesiredCounts, String> {
    let mut out = DesiredCounts::new();
    for part in text.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let Some((name, value)) = part.split_once('=') else {
            return Err(format!("expected kind=count, got '{part}'"));
        };
        let kind = EnemyKind::parse(name).ok_or_else(|| format!("unknown enemy type '{name}'"))?;
        let value = value.trim();
        let desired = if value.eq_ignore_ascii_case("keep") {
            None
        } else {
            Some(
                value
                    .parse::<usize>()
                    .map_err(|_| format!("invalid count '{value}' for {name}"))?,
            )
        };
        out.insert(kind, desired);
    }
    Ok(out)
}

/// Configured enemies per kind across every room. Unknown tags are ignored.
pub fn configured_totals(dungeon: &DungeonData) -> BTreeMap<EnemyKind, usize> {
    EnemyKind::ALL
        .iter()
        .map(|kind| {
            let total = dungeon.rooms.iter().map(|room| room.count_enemies(*kind)).sum();
            (*kind, total)
        })
        .collect()
}

/// Removals for every kind run before any additions, so slots freed by a
/// shrinking kind are available to a growing one.
pub fn randomize_population(
    dungeon: &mut DungeonData,
    desired: &DesiredCounts,
    config: &SimulationConfig,
    rng: &mut Rng,
) -> PopulationReport {
    let before_totals = configured_totals(dungeon);
    let requests: Vec<(EnemyKind, usize, usize)> = desired
        .iter()
        .filter_map(|(kind, wanted)| {
            let wanted = (*wanted)?;
            let before = before_totals.get(kind).copied().unwrap_or(0);
            Some((*kind, wanted, before))
        })
        .collect();

    for &(kind, wanted, before) in &requests {
        if wanted < before {
            remove_enemies(dungeon, kind, before - wanted);
        }
    }

    let mut shortfalls = BTreeMap::new();
    for &(kind, wanted, before) in &requests {
        if wanted > before {
            let need = wanted - before;
            let placed = add_enemies(dungeon, kind, need, config, rng);
            shortfalls.insert(kind, need - placed);
        }
    }

    let after_totals = configured_totals(dungeon);
    let mut report = PopulationReport::default();
    for (kind, wanted, before) in requests {
        let after = after_totals.get(&kind).copied().unwrap_or(0);
        tracing::debug!(
            "[population] {}: {before} -> {after} (wanted {wanted})",
            kind.tag()
        );
        report.changes.push(KindChange {
            kind,
            before,
            after,
            shortfall: shortfalls.get(&kind).copied().unwrap_or(0),
        });
    }
    report
}

fn has_free_slot(room: &Room, config: &SimulationConfig) -> bool {
    room.enemies.len() < config.max_enemies_per_room
}

/// Returns how many enemies were actually placed.
fn add_enemies(
    dungeon: &mut DungeonData,
    kind: EnemyKind,
    need: usize,
    config: &SimulationConfig,
    rng: &mut Rng,
) -> usize {
    let candidates: Vec<(RoomId, usize)> = dungeon
        .rooms
        .iter()
        .filter(|room| room.room_id != config.initial_room && has_free_slot(room, config))
        .map(|room| (room.room_id, room.enemies.len()))
        .collect();
    if candidates.is_empty() || need == 0 {
        return 0;
    }

    if need < candidates.len() {
        // Weighted sampling without replacement: key = u^(1/w), w = 1/(1+n).
        let mut keyed: Vec<(f64, RoomId)> = candidates
            .iter()
            .map(|(room_id, count)| {
                let weight = 1.0 / (1.0 + *count as f64);
                let u = (rng.next_f32() as f64).max(f64::MIN_POSITIVE);
                (u.powf(1.0 / weight), *room_id)
            })
            .collect();
        keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));
        let mut placed = 0;
        for (_, room_id) in keyed.into_iter().take(need) {
            if let Some(room) = dungeon.room_mut(room_id) {
                push_enemy(room, kind, config, rng);
                placed += 1;
            }
        }
        return placed;
    }

    let candidate_ids: Vec<RoomId> = candidates.iter().map(|(room_id, _)| *room_id).collect();
    let mut placed = 0;
    while placed < need {
        let mut order: Vec<(usize, RoomId)> = dungeon
            .rooms
            .iter()
            .filter(|room| candidate_ids.contains(&room.room_id) && has_free_slot(room, config))
            .map(|room| (room.enemies.len(), room.room_id))
            .collect();
        if order.is_empty() {
            break;
        }
        order.sort();
        for (_, room_id) in order {
            if placed == need {
                break;
            }
            if let Some(room) = dungeon.room_mut(room_id) {
                push_enemy(room, kind, config, rng);
                placed += 1;
            }
        }
    }
    placed
}

fn push_enemy(room: &mut Room, kind: EnemyKind, config: &SimulationConfig, rng: &mut Rng) {
    let taken: Vec<Vec2> = room
        .enemies
        .iter()
        .filter_map(EnemySpec::spawn_position)
        .collect();
    let spots = candidate_positions(room, config, rng);
    let pos = spots
        .iter()
        .copied()
        .find(|spot| !taken.contains(spot))
        .or_else(|| spots.first().copied())
        .unwrap_or(Vec2::new(config.screen_width / 2.0, config.screen_height / 2.0));
    let mut spec = EnemySpec::new(kind, pos);
    if kind == EnemyKind::Guard {
        spec.guard_point = room.chests.first().map(|chest| chest.pos);
    }
    room.enemies.push(spec);
}

fn remove_enemies(dungeon: &mut DungeonData, kind: EnemyKind, excess: usize) {
    for _ in 0..excess {
        let target = dungeon
            .rooms
            .iter()
            .map(|room| (room.count_enemies(kind), room.room_id))
            .filter(|(count, _)| *count > 0)
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        let Some((_, room_id)) = target else {
            break;
        };
        if let Some(room) = dungeon.room_mut(room_id) {
            if let Some(index) = room
                .enemies
                .iter()
                .rposition(|spec| spec.parsed_kind() == Some(kind))
            {
                room.enemies.remove(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::generate_dungeon;

    fn desired(pairs: &[(EnemyKind, Option<usize>)]) -> DesiredCounts {
        pairs.iter().copied().collect()
    }

    #[test]
    fn totals_match_requested_counts() {
        let config = SimulationConfig::default();
        for seed in 0..20u32 {
            let mut dungeon = generate_dungeon(4, seed, &config);
            let mut rng = Rng::new(seed);
            let request = desired(&[
                (EnemyKind::Slime, Some(9)),
                (EnemyKind::Bat, Some(0)),
                (EnemyKind::Wizard, Some(3)),
            ]);
            let guards_before = configured_totals(&dungeon)[&EnemyKind::Guard];
            let report = randomize_population(&mut dungeon, &request, &config, &mut rng);
            assert!(report.is_satisfied());
            let totals = configured_totals(&dungeon);
            assert_eq!(totals[&EnemyKind::Slime], 9, "seed={seed}");
            assert_eq!(totals[&EnemyKind::Bat], 0);
            assert_eq!(totals[&EnemyKind::Wizard], 3);
            assert_eq!(totals[&EnemyKind::Guard], guards_before);
            for room in &dungeon.rooms {
                assert!(room.enemies.len() <= config.max_enemies_per_room);
            }
            assert!(dungeon
                .room(config.initial_room)
                .map(|room| room.enemies.is_empty())
                .unwrap_or(false));
        }
    }

    #[test]
    fn shortfall_reported_when_rooms_are_full() {
        let config = SimulationConfig {
            max_enemies_per_room: 2,
            ..SimulationConfig::default()
        };
        let mut dungeon = generate_dungeon(2, 4, &config);
        let mut rng = Rng::new(4);
        let report = randomize_population(
            &mut dungeon,
            &desired(&[(EnemyKind::Bat, Some(50))]),
            &config,
            &mut rng,
        );
        let change = &report.changes[0];
        assert!(!report.is_satisfied());
        assert_eq!(change.after + change.shortfall, 50);
        for room in &dungeon.rooms {
            assert!(room.enemies.len() <= 2);
        }
    }

    #[test]
    fn shrinking_kind_frees_slots_for_growing_kind() {
        let config = SimulationConfig {
            max_enemies_per_room: 2,
            ..SimulationConfig::default()
        };
        let mut dungeon = DungeonData::default();
        for room_id in 1..=3 {
            dungeon.rooms.push(Room::new(room_id));
        }
        let bat = |x| EnemySpec::new(EnemyKind::Bat, Vec2::new(x, 200.0));
        dungeon.rooms[1].enemies = vec![bat(100.0), bat(200.0)];
        dungeon.rooms[2].enemies = vec![bat(100.0), bat(200.0)];

        let mut rng = Rng::new(2);
        let report = randomize_population(
            &mut dungeon,
            &desired(&[(EnemyKind::Slime, Some(2)), (EnemyKind::Bat, Some(0))]),
            &config,
            &mut rng,
        );
        assert!(report.is_satisfied(), "{:?}", report.changes);
        let totals = configured_totals(&dungeon);
        assert_eq!(totals[&EnemyKind::Slime], 2);
        assert_eq!(totals[&EnemyKind::Bat], 0);
        assert!(dungeon.rooms[0].enemies.is_empty());
        assert_eq!(
            report.changes,
            vec![
                KindChange {
                    kind: EnemyKind::Slime,
                    before: 0,
                    after: 2,
                    shortfall: 0
                },
                KindChange {
                    kind: EnemyKind::Bat,
                    before: 4,
                    after: 0,
                    shortfall: 0
                },
            ]
        );
    }

    #[test]
    fn removal_drains_the_most_crowded_room_first() {
        let config = SimulationConfig::default();
        let mut dungeon = DungeonData::default();
        for room_id in 1..=3 {
            dungeon.rooms.push(Room::new(room_id));
        }
        let slime = |x| EnemySpec::new(EnemyKind::Slime, Vec2::new(x, 200.0));
        dungeon.rooms[1].enemies = vec![slime(100.0), slime(200.0)];
        dungeon.rooms[2].enemies = vec![slime(100.0), slime(200.0), slime(300.0)];

        let mut rng = Rng::new(1);
        randomize_population(
            &mut dungeon,
            &desired(&[(EnemyKind::Slime, Some(3))]),
            &config,
            &mut rng,
        );
        // 3 -> 2 in room 3, then the 2/2 tie goes to the lower id.
        assert_eq!(dungeon.rooms[1].enemies.len(), 1);
        assert_eq!(dungeon.rooms[2].enemies.len(), 2);
    }

    #[test]
    fn new_guards_watch_the_room_chest() {
        let config = SimulationConfig::default();
        let mut dungeon = generate_dungeon(3, 8, &config);
        for room in &mut dungeon.rooms {
            room.enemies.clear();
        }
        let mut rng = Rng::new(8);
        randomize_population(
            &mut dungeon,
            &desired(&[(EnemyKind::Guard, Some(16))]),
            &config,
            &mut rng,
        );
        for room in &dungeon.rooms {
            for spec in &room.enemies {
                assert_eq!(spec.guard_point, room.chests.first().map(|chest| chest.pos));
            }
        }
    }

    #[test]
    fn parses_cli_style_counts() {
        let parsed = parse_desired_counts("slime=4, bat=keep,guard=0").expect("valid");
        assert_eq!(parsed[&EnemyKind::Slime], Some(4));
        assert_eq!(parsed[&EnemyKind::Bat], None);
        assert_eq!(parsed[&EnemyKind::Guard], Some(0));
        assert!(parse_desired_counts("dragon=2").is_err());
        assert!(parse_desired_counts("slime").is_err());
    }
}
