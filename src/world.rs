use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::{LoadError, LoadReport};
use crate::rng::Rng;
use crate::types::{Direction, EnemyKind, Rect, RoomId, Vec2};

const GAP_HALF_SPAN: f32 = 50.0;
const PILLAR_SIZE: f32 = 50.0;
const EXTRA_EDGE_CHANCE: f32 = 0.15;

/// Opening in one wall: `fixed` is the wall-aligned coordinate (x for
/// left/right gaps, y for top/bottom), `min..=max` the perpendicular range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub fixed: f32,
    pub min: f32,
    pub max: f32,
}

impl Gap {
    pub fn contains(&self, perpendicular: f32) -> bool {
        self.min <= perpendicular && perpendicular <= self.max
    }

    pub fn center(&self) -> f32 {
        (self.min + self.max) / 2.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chest {
    pub pos: Vec2,
    #[serde(default)]
    pub is_got: bool,
}

/// Static enemy record as it comes from the maze definition. The type tag is
/// kept raw so unknown tags can be reported instead of failing the load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemySpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard_point: Option<Vec2>,
}

impl EnemySpec {
    pub fn new(kind: EnemyKind, pos: Vec2) -> Self {
        Self {
            kind: kind.tag().to_string(),
            pos: Some(pos),
            x: None,
            y: None,
            hp: None,
            speed: None,
            guard_point: None,
        }
    }

    pub fn parsed_kind(&self) -> Option<EnemyKind> {
        EnemyKind::parse(&self.kind)
    }

    /// `pos` wins over the split `x`/`y` fields.
    pub fn spawn_position(&self) -> Option<Vec2> {
        if let Some(pos) = self.pos {
            return Some(pos);
        }
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Vec2::new(x, y)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: RoomId,
    #[serde(default)]
    pub walls: Vec<Rect>,
    #[serde(default)]
    pub gaps: BTreeMap<Direction, Gap>,
    #[serde(default)]
    pub chests: Vec<Chest>,
    #[serde(default)]
    pub enemies: Vec<EnemySpec>,
    #[serde(default)]
    pub is_exit: bool,
}

impl Room {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            walls: Vec::new(),
            gaps: BTreeMap::new(),
            chests: Vec::new(),
            enemies: Vec::new(),
            is_exit: false,
        }
    }

    pub fn count_enemies(&self, kind: EnemyKind) -> usize {
        self.enemies
            .iter()
            .filter(|spec| spec.parsed_kind() == Some(kind))
            .count()
    }
}

/// Directed adjacency: room → direction → neighbor. Reverse edges are never
/// assumed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomGraph {
    edges: BTreeMap<RoomId, BTreeMap<Direction, RoomId>>,
}

impl RoomGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: RoomId, direction: Direction, to: RoomId) {
        self.edges.entry(from).or_default().insert(direction, to);
    }

    pub fn neighbor(&self, room_id: RoomId, direction: Direction) -> Option<RoomId> {
        self.edges
            .get(&room_id)
            .and_then(|by_dir| by_dir.get(&direction))
            .copied()
    }

    pub fn neighbors(&self, room_id: RoomId) -> impl Iterator<Item = (Direction, RoomId)> + '_ {
        self.edges
            .get(&room_id)
            .into_iter()
            .flat_map(|by_dir| by_dir.iter().map(|(dir, id)| (*dir, *id)))
    }

    pub fn referenced_rooms(&self) -> BTreeSet<RoomId> {
        let mut out = BTreeSet::new();
        for (from, by_dir) in &self.edges {
            out.insert(*from);
            out.extend(by_dir.values().copied());
        }
        out
    }
}

/// Parsed maze definition: the rooms plus their adjacency table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonData {
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub room_neighbors: RoomGraph,
}

impl DungeonData {
    pub fn room(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| room.room_id == room_id)
    }

    pub fn room_mut(&mut self, room_id: RoomId) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|room| room.room_id == room_id)
    }

    /// Reports graph references to rooms that have no definition. Such
    /// neighbors behave as "no such room" at runtime.
    pub fn validate(&self) -> LoadReport {
        let known: BTreeSet<RoomId> = self.rooms.iter().map(|room| room.room_id).collect();
        let mut report = LoadReport {
            loaded: known.len(),
            skipped: Vec::new(),
        };
        for room_id in self.room_neighbors.referenced_rooms() {
            if !known.contains(&room_id) {
                report.skipped.push(LoadError::MissingRoom { room_id });
            }
        }
        report
    }

    pub fn reset_chests(&mut self) {
        for room in &mut self.rooms {
            for chest in &mut room.chests {
                chest.is_got = false;
            }
        }
    }
}

pub fn room_id_at(row: i32, col: i32, side: i32) -> RoomId {
    (row * side + col + 1) as RoomId
}

/// Builds a `side`×`side` grid maze: a random spanning tree plus a few extra
/// doors, room 1 as entrance, the last room as exit, and one chest.
pub fn generate_dungeon(side: i32, seed: u32, config: &SimulationConfig) -> DungeonData {
    let side = side.max(2);
    let mut rng = Rng::new(seed);
    let mut graph = RoomGraph::new();

    let mut visited = BTreeSet::new();
    let mut stack = vec![(0, 0)];
    visited.insert((0, 0));
    while let Some(&(row, col)) = stack.last() {
        let options: Vec<(Direction, i32, i32)> = Direction::ALL
            .iter()
            .filter_map(|&dir| {
                let (dx, dy) = dir.offset();
                let (nr, nc) = (row + dy, col + dx);
                if nr < 0 || nc < 0 || nr >= side || nc >= side || visited.contains(&(nr, nc)) {
                    return None;
                }
                Some((dir, nr, nc))
            })
            .collect();
        if options.is_empty() {
            stack.pop();
            continue;
        }
        let (dir, nr, nc) = options[rng.pick_index(options.len())];
        connect(&mut graph, side, (row, col), dir, (nr, nc));
        visited.insert((nr, nc));
        stack.push((nr, nc));
    }

    for row in 0..side {
        for col in 0..side {
            let from = room_id_at(row, col, side);
            if col < side - 1
                && graph.neighbor(from, Direction::Right).is_none()
                && rng.bool(EXTRA_EDGE_CHANCE)
            {
                connect(&mut graph, side, (row, col), Direction::Right, (row, col + 1));
            }
            if row < side - 1
                && graph.neighbor(from, Direction::Bottom).is_none()
                && rng.bool(EXTRA_EDGE_CHANCE)
            {
                connect(&mut graph, side, (row, col), Direction::Bottom, (row + 1, col));
            }
        }
    }

    let entrance_id = config.initial_room.clamp(1, (side * side) as RoomId);
    let exit_id = (side * side) as RoomId;
    let chest_candidates: Vec<RoomId> = (1..=exit_id)
        .filter(|&id| id != entrance_id && id != exit_id)
        .collect();
    let chest_room = if chest_candidates.is_empty() {
        exit_id
    } else {
        chest_candidates[rng.pick_index(chest_candidates.len())]
    };

    let w = config.screen_width;
    let h = config.screen_height;
    let mut rooms = Vec::new();
    for row in 0..side {
        for col in 0..side {
            let room_id = room_id_at(row, col, side);
            let mut room = Room::new(room_id);
            for dir in Direction::ALL {
                if graph.neighbor(room_id, dir).is_some() {
                    room.gaps.insert(dir, gap_for(dir, config));
                }
            }
            room.walls = build_walls(&room.gaps, config);

            if rng.bool(0.5) {
                let cx = w / 4.0 + rng.range_f32(-30.0, 30.0);
                let cy = h / 4.0 + rng.range_f32(-30.0, 30.0);
                room.walls.push(Rect::new(
                    cx - PILLAR_SIZE / 2.0,
                    cy - PILLAR_SIZE / 2.0,
                    PILLAR_SIZE,
                    PILLAR_SIZE,
                ));
            }

            if room_id == chest_room {
                room.chests.push(Chest {
                    pos: Vec2::new(
                        w * 0.75 + rng.range_f32(-40.0, 40.0),
                        h * 0.75 + rng.range_f32(-30.0, 30.0),
                    ),
                    is_got: false,
                });
            }

            if room_id != entrance_id {
                let count = rng.int(0, 2);
                for slot in 0..count {
                    let kind = EnemyKind::ALL[rng.pick_index(EnemyKind::ALL.len())];
                    let anchor = if slot == 0 {
                        Vec2::new(w * 0.25, h * 0.75)
                    } else {
                        Vec2::new(w * 0.75, h * 0.25)
                    };
                    let pos = Vec2::new(
                        anchor.x + rng.range_f32(-30.0, 30.0),
                        anchor.y + rng.range_f32(-30.0, 30.0),
                    );
                    let mut spec = EnemySpec::new(kind, pos);
                    if kind == EnemyKind::Guard {
                        spec.guard_point = room.chests.first().map(|chest| chest.pos);
                    }
                    room.enemies.push(spec);
                }
            }

            room.is_exit = room_id == exit_id;
            rooms.push(room);
        }
    }

    DungeonData {
        rooms,
        room_neighbors: graph,
    }
}

fn connect(
    graph: &mut RoomGraph,
    side: i32,
    from: (i32, i32),
    dir: Direction,
    to: (i32, i32),
) {
    let from_id = room_id_at(from.0, from.1, side);
    let to_id = room_id_at(to.0, to.1, side);
    graph.insert(from_id, dir, to_id);
    graph.insert(to_id, dir.opposite(), from_id);
}

pub fn gap_for(dir: Direction, config: &SimulationConfig) -> Gap {
    let w = config.screen_width;
    let h = config.screen_height;
    let ww = config.wall_width;
    match dir {
        Direction::Left => Gap {
            fixed: ww,
            min: h / 2.0 - GAP_HALF_SPAN,
            max: h / 2.0 + GAP_HALF_SPAN,
        },
        Direction::Right => Gap {
            fixed: w - ww,
            min: h / 2.0 - GAP_HALF_SPAN,
            max: h / 2.0 + GAP_HALF_SPAN,
        },
        Direction::Top => Gap {
            fixed: ww,
            min: w / 2.0 - GAP_HALF_SPAN,
            max: w / 2.0 + GAP_HALF_SPAN,
        },
        Direction::Bottom => Gap {
            fixed: h - ww,
            min: w / 2.0 - GAP_HALF_SPAN,
            max: w / 2.0 + GAP_HALF_SPAN,
        },
    }
}

/// Border walls, each split in two around its gap when one exists.
pub fn build_walls(gaps: &BTreeMap<Direction, Gap>, config: &SimulationConfig) -> Vec<Rect> {
    let w = config.screen_width;
    let h = config.screen_height;
    let ww = config.wall_width;
    let mut walls = Vec::new();
    for dir in Direction::ALL {
        let gap = gaps.get(&dir);
        match dir {
            Direction::Left | Direction::Right => {
                let x = if dir == Direction::Left { 0.0 } else { w - ww };
                match gap {
                    Some(gap) => {
                        walls.push(Rect::new(x, 0.0, ww, gap.min));
                        walls.push(Rect::new(x, gap.max, ww, h - gap.max));
                    }
                    None => walls.push(Rect::new(x, 0.0, ww, h)),
                }
            }
            Direction::Top | Direction::Bottom => {
                let y = if dir == Direction::Top { 0.0 } else { h - ww };
                match gap {
                    Some(gap) => {
                        walls.push(Rect::new(0.0, y, gap.min, ww));
                        walls.push(Rect::new(gap.max, y, w - gap.max, ww));
                    }
                    None => walls.push(Rect::new(0.0, y, w, ww)),
                }
            }
        }
    }
    walls
}

/// Breadth-first walk over the directed graph, skipping undefined rooms.
pub fn reachable_rooms(dungeon: &DungeonData, start: RoomId) -> BTreeSet<RoomId> {
    let mut out = BTreeSet::new();
    if dungeon.room(start).is_none() {
        return out;
    }
    let mut queue = VecDeque::new();
    out.insert(start);
    queue.push_back(start);
    while let Some(room_id) = queue.pop_front() {
        for (_, next) in dungeon.room_neighbors.neighbors(room_id) {
            if dungeon.room(next).is_none() {
                continue;
            }
            if out.insert(next) {
                queue.push_back(next);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_room_is_reachable_from_entrance() {
        let config = SimulationConfig::default();
        for seed in 0..100u32 {
            let dungeon = generate_dungeon(4, seed, &config);
            let reachable = reachable_rooms(&dungeon, 1);
            assert_eq!(reachable.len(), 16, "seed={seed}");
        }
    }

    #[test]
    fn gaps_match_graph_edges_in_both_directions() {
        let config = SimulationConfig::default();
        for seed in 0..50u32 {
            let dungeon = generate_dungeon(3, seed, &config);
            for room in &dungeon.rooms {
                for dir in Direction::ALL {
                    let neighbor = dungeon.room_neighbors.neighbor(room.room_id, dir);
                    assert_eq!(neighbor.is_some(), room.gaps.contains_key(&dir));
                    if let Some(next) = neighbor {
                        assert_eq!(
                            dungeon.room_neighbors.neighbor(next, dir.opposite()),
                            Some(room.room_id)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn exactly_one_chest_and_one_exit() {
        let config = SimulationConfig::default();
        for seed in 0..50u32 {
            let dungeon = generate_dungeon(3, seed, &config);
            let chests: usize = dungeon.rooms.iter().map(|room| room.chests.len()).sum();
            let exits = dungeon.rooms.iter().filter(|room| room.is_exit).count();
            assert_eq!(chests, 1);
            assert_eq!(exits, 1);
            assert!(dungeon.room(1).map(|room| room.enemies.is_empty()).unwrap_or(false));
        }
    }

    #[test]
    fn validate_reports_dangling_neighbor() {
        let mut dungeon = DungeonData::default();
        dungeon.rooms.push(Room::new(1));
        dungeon.room_neighbors.insert(1, Direction::Right, 9);
        let report = dungeon.validate();
        assert_eq!(report.skipped, vec![LoadError::MissingRoom { room_id: 9 }]);
    }

    #[test]
    fn enemy_spec_prefers_pos_over_split_fields() {
        let spec: EnemySpec = serde_json::from_str(
            r#"{ "type": "bat", "pos": { "x": 1.0, "y": 2.0 }, "x": 5.0, "y": 6.0 }"#,
        )
        .expect("spec parses");
        assert_eq!(spec.spawn_position(), Some(Vec2::new(1.0, 2.0)));

        let split: EnemySpec =
            serde_json::from_str(r#"{ "type": "bat", "x": 5.0 }"#).expect("spec parses");
        assert_eq!(split.spawn_position(), None);
    }
}
