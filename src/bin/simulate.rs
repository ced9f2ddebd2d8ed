use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tomb_maze_engine::config::SimulationConfig;
use tomb_maze_engine::engine::{EngineStores, GameEngine};
use tomb_maze_engine::player::PlayerInput;
use tomb_maze_engine::population::{parse_desired_counts, DesiredCounts};
use tomb_maze_engine::rng::Rng;
use tomb_maze_engine::types::{
    Direction, GameOutcome, RoomId, RunSummary, RuntimeEvent, Snapshot, Vec2,
};
use tomb_maze_engine::world::{generate_dungeon, DungeonData, Gap, Room};

const STUCK_TICKS: u32 = 20;
const DETOUR_TICKS: u32 = 15;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u32>,
    /// Tick limit per run.
    #[arg(long, default_value_t = 18_000)]
    ticks: u64,
    /// Rooms per side of the generated maze.
    #[arg(long, default_value_t = 3)]
    side: i32,
    #[arg(long, default_value_t = 1)]
    runs: u32,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Keeps item state and the room configuration between invocations.
    #[arg(long)]
    state_dir: Option<PathBuf>,
    /// Population request, e.g. `slime=4,bat=keep`.
    #[arg(long)]
    enemies: Option<String>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u32,
    side: i32,
    #[serde(rename = "tickLimit")]
    tick_limit: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
struct EventCounts {
    #[serde(rename = "roomsEntered")]
    rooms_entered: u32,
    #[serde(rename = "fireballsCast")]
    fireballs_cast: u32,
    #[serde(rename = "playerHits")]
    player_hits: u32,
    #[serde(rename = "exitLocked")]
    exit_locked: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    side: i32,
    reason: String,
    #[serde(flatten)]
    summary: RunSummary,
    events: EventCounts,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct BatchSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageTicks")]
    average_ticks: u64,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let run_started_at_ms = now_ms();
    let scenarios = resolve_scenarios(&cli);
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));

    let config = match cli.config.as_deref() {
        Some(path) => match SimulationConfig::load(path) {
            Ok(config) => config,
            Err(error) => {
                emit_log(
                    "error",
                    "config_invalid",
                    &match_id,
                    None,
                    None,
                    None,
                    json!({
                        "path": path.to_string_lossy(),
                        "error": error.to_string(),
                    }),
                );
                std::process::exit(2);
            }
        },
        None => SimulationConfig::default(),
    };
    let desired = match cli.enemies.as_deref().map(parse_desired_counts).transpose() {
        Ok(desired) => desired,
        Err(error) => {
            emit_log(
                "error",
                "population_request_invalid",
                &match_id,
                None,
                None,
                None,
                json!({ "error": error }),
            );
            std::process::exit(2);
        }
    };

    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_ticks = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "side": scenario.side,
                "tickLimit": scenario.tick_limit,
            }),
        );
        let stores = match cli.state_dir.as_deref() {
            Some(dir) => EngineStores::on_disk(&dir.join(&scenario.name)),
            None => EngineStores::in_memory(),
        };
        let scenario_run = run_scenario(
            &scenario,
            &config,
            stores,
            desired.as_ref(),
            &match_id,
        );

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_ticks += scenario_run.result.summary.ticks;
        *reason_counts
            .entry(scenario_run.result.reason.clone())
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.result.summary.ticks),
            json!({
                "reason": scenario_run.result.reason,
                "roomsExplored": scenario_run.result.summary.rooms_explored,
                "enemiesDefeated": scenario_run.result.summary.enemies_defeated,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => tracing::error!("[simulate] failed to serialize scenario result: {error}"),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_batch_summary(
        match_id.clone(),
        run_started_at_ms,
        now_ms(),
        scenario_results,
        reason_counts,
        total_anomalies,
        total_ticks,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageTicks": summary.average_ticks,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(
    scenario: &Scenario,
    config: &SimulationConfig,
    stores: EngineStores,
    desired: Option<&DesiredCounts>,
    match_id: &str,
) -> ScenarioRunResult {
    let dungeon = generate_dungeon(scenario.side, scenario.seed, config);
    let mut engine = GameEngine::with_stores(dungeon, config.clone(), scenario.seed, stores);

    let load_report = engine.load_report();
    if !load_report.is_clean() {
        emit_log(
            "warn",
            "records_skipped",
            match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "loaded": load_report.loaded,
                "skipped": load_report
                    .skipped
                    .iter()
                    .map(|error| error.to_string())
                    .collect::<Vec<_>>(),
            }),
        );
    }

    if let Some(desired) = desired {
        let report = engine.randomize_population(desired);
        emit_log(
            if report.is_satisfied() { "info" } else { "warn" },
            "population_randomized",
            match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "changes": report.changes,
                "totals": engine.enemy_totals(),
            }),
        );
    }

    let mut autopilot = Autopilot::new(&engine, scenario.seed);
    let mut counts = EventCounts::default();
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();

    while engine.outcome().is_none() && engine.tick() < scenario.tick_limit {
        let input = autopilot.next_input(&engine);
        engine.step(&input);
        let snapshot = engine.build_snapshot(true);
        for message in collect_snapshot_anomalies(&engine, &snapshot) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        for event in &snapshot.events {
            match event {
                RuntimeEvent::RoomEntered { .. } => counts.rooms_entered += 1,
                RuntimeEvent::FireballCast { .. } => counts.fireballs_cast += 1,
                RuntimeEvent::PlayerHit { .. } => counts.player_hits += 1,
                RuntimeEvent::ExitLocked => counts.exit_locked += 1,
                _ => {}
            }
        }
    }

    if !engine.save_item_state() {
        tracing::warn!("[simulate] item state for {} was not saved", scenario.name);
    }

    let summary = engine.build_summary();
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            side: scenario.side,
            reason: outcome_key(summary.outcome),
            summary,
            events: counts,
            anomalies,
        },
        anomaly_records,
    }
}

fn collect_snapshot_anomalies(engine: &GameEngine, snapshot: &Snapshot) -> Vec<String> {
    let mut anomalies = Vec::new();
    let leaked = engine.leaked_projectiles();
    if leaked > 0 {
        anomalies.push(format!("projectiles left in inactive rooms: {leaked}"));
    }

    let player = &snapshot.player;
    if player.health < 0 || player.health > player.max_health {
        anomalies.push(format!(
            "player health out of range: {}/{}",
            player.health, player.max_health
        ));
    }
    let config = &engine.config;
    if player.x < 0.0
        || player.y < 0.0
        || player.x > config.screen_width
        || player.y > config.screen_height
    {
        anomalies.push(format!("player off screen: ({}, {})", player.x, player.y));
    }
    if engine.dungeon().room(player.current_room).is_none() {
        anomalies.push(format!("player in undefined room {}", player.current_room));
    }

    for enemy in &snapshot.enemies {
        if enemy.hp <= 0 {
            anomalies.push(format!("enemy hp <= 0 remains: {}", enemy.id.0));
        } else if enemy.hp > enemy.max_hp {
            anomalies.push(format!(
                "enemy hp above max: {} {}/{}",
                enemy.id.0, enemy.hp, enemy.max_hp
            ));
        }
    }
    anomalies
}

/// Drives the player toward the chest, then the exit, shooting whenever
/// the room has enemies.
struct Autopilot {
    room: RoomId,
    passed_center: bool,
    last_pos: Vec2,
    stuck_ticks: u32,
    detour: Option<(PlayerInput, u32)>,
    rng: Rng,
}

impl Autopilot {
    fn new(engine: &GameEngine, seed: u32) -> Self {
        Self {
            room: engine.current_room(),
            passed_center: false,
            last_pos: engine.player().pos,
            stuck_ticks: 0,
            detour: None,
            rng: Rng::new(seed ^ 0x5eed),
        }
    }

    fn next_input(&mut self, engine: &GameEngine) -> PlayerInput {
        let player = engine.player();
        if player.current_room != self.room {
            self.room = player.current_room;
            self.passed_center = false;
            self.detour = None;
        }
        let shoot = !engine.active_enemies().is_empty();

        if player.pos.distance(self.last_pos) < 0.5 {
            self.stuck_ticks += 1;
        } else {
            self.stuck_ticks = 0;
        }
        self.last_pos = player.pos;

        if let Some((input, ticks_left)) = self.detour.as_mut() {
            if *ticks_left > 0 {
                *ticks_left -= 1;
                return PlayerInput { shoot, ..*input };
            }
            self.detour = None;
        }
        if self.stuck_ticks >= STUCK_TICKS {
            self.stuck_ticks = 0;
            let input = random_heading(&mut self.rng);
            self.detour = Some((input, DETOUR_TICKS));
            return PlayerInput { shoot, ..input };
        }

        let target = self.target(engine, player.pos);
        PlayerInput {
            shoot,
            ..steer(player.pos, target, player.speed / 2.0)
        }
    }

    fn target(&mut self, engine: &GameEngine, pos: Vec2) -> Vec2 {
        let config = &engine.config;
        let center = Vec2::new(config.screen_width / 2.0, config.screen_height / 2.0);
        let Some(room) = engine.dungeon().room(self.room) else {
            return center;
        };
        if let Some(chest) = room.chests.iter().find(|chest| !chest.is_got) {
            return chest.pos;
        }
        if engine.has_treasure() && room.is_exit {
            return config.exit_rect().center();
        }

        let has_treasure = engine.has_treasure();
        let step = first_step(engine.dungeon(), self.room, |room| {
            if has_treasure {
                room.is_exit
            } else {
                room.chests.iter().any(|chest| !chest.is_got)
            }
        });
        let Some((direction, gap)) = step.and_then(|dir| room.gaps.get(&dir).map(|gap| (dir, *gap)))
        else {
            return center;
        };

        if !self.passed_center {
            if pos.distance(center) > engine.player().speed {
                return center;
            }
            self.passed_center = true;
        }
        beyond_gap(direction, &gap, config)
    }
}

/// Direction of the first door on a shortest route to a room matching
/// `is_goal`. Doors need a gap on this side and a defined destination.
fn first_step(
    dungeon: &DungeonData,
    start: RoomId,
    is_goal: impl Fn(&Room) -> bool,
) -> Option<Direction> {
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::new();
    for (direction, next) in passable(dungeon, start) {
        if seen.insert(next) {
            queue.push_back((next, direction));
        }
    }
    while let Some((room_id, first)) = queue.pop_front() {
        let Some(room) = dungeon.room(room_id) else {
            continue;
        };
        if is_goal(room) {
            return Some(first);
        }
        for (_, next) in passable(dungeon, room_id) {
            if seen.insert(next) {
                queue.push_back((next, first));
            }
        }
    }
    None
}

fn passable(dungeon: &DungeonData, room_id: RoomId) -> Vec<(Direction, RoomId)> {
    let Some(room) = dungeon.room(room_id) else {
        return Vec::new();
    };
    dungeon
        .room_neighbors
        .neighbors(room_id)
        .filter(|(direction, next)| {
            room.gaps.contains_key(direction) && dungeon.room(*next).is_some()
        })
        .collect()
}

/// A point past the wall, centered on the gap.
fn beyond_gap(direction: Direction, gap: &Gap, config: &SimulationConfig) -> Vec2 {
    match direction {
        Direction::Left => Vec2::new(0.0, gap.center()),
        Direction::Right => Vec2::new(config.screen_width, gap.center()),
        Direction::Top => Vec2::new(gap.center(), 0.0),
        Direction::Bottom => Vec2::new(gap.center(), config.screen_height),
    }
}

fn steer(from: Vec2, to: Vec2, tolerance: f32) -> PlayerInput {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    PlayerInput {
        left: dx < -tolerance,
        right: dx > tolerance,
        up: dy < -tolerance,
        down: dy > tolerance,
        shoot: false,
    }
}

fn random_heading(rng: &mut Rng) -> PlayerInput {
    let mut input = PlayerInput::default();
    match rng.pick_index(4) {
        0 => input.left = true,
        1 => input.right = true,
        2 => input.up = true,
        _ => input.down = true,
    }
    input
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    let side = cli.side.clamp(2, 8);
    (0..cli.runs.max(1))
        .map(|idx| {
            let seed = seed.wrapping_add(idx);
            Scenario {
                name: format!("maze{side}-seed{seed}"),
                seed,
                side,
                tick_limit: cli.ticks,
            }
        })
        .collect()
}

fn outcome_key(outcome: Option<GameOutcome>) -> String {
    match outcome {
        Some(GameOutcome::Victory) => "victory",
        Some(GameOutcome::Died) => "died",
        None => "timeout",
    }
    .to_string()
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_batch_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_ticks: u64,
) -> BatchSummary {
    let scenario_count = scenarios.len();
    let average_ticks = if scenario_count == 0 {
        0
    } else {
        total_ticks / scenario_count as u64
    };
    BatchSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_ticks,
        reason_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    if let Ok(line) = serde_json::to_string(&log_line) {
        eprintln!("{line}");
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &BatchSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(seed: u32) -> Scenario {
        Scenario {
            name: format!("test-{seed}"),
            seed,
            side: 2,
            tick_limit: 600,
        }
    }

    fn make_result(reason: &str, ticks: u64) -> ScenarioResultLine {
        let config = SimulationConfig::default();
        let engine = GameEngine::new(generate_dungeon(2, 1, &config), config, 1);
        let mut summary = engine.build_summary();
        summary.ticks = ticks;
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 1,
            side: 2,
            reason: reason.to_string(),
            summary,
            events: EventCounts::default(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn default_match_id_contains_seed_and_timestamp() {
        assert_eq!(default_match_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_batch_summary_calculates_average_ticks() {
        let summary = build_batch_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![make_result("timeout", 600), make_result("victory", 900)],
            BTreeMap::from([("timeout".to_string(), 1usize), ("victory".to_string(), 1usize)]),
            0,
            1500,
        );
        assert_eq!(summary.average_ticks, 750);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("missing").join("summary.json");
        let summary = build_batch_summary(
            "sim-1-1".to_string(),
            1,
            2,
            vec![make_result("timeout", 600)],
            BTreeMap::from([("timeout".to_string(), 1usize)]),
            0,
            600,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same".to_string());

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tick, 11);
    }

    #[test]
    fn steer_stops_inside_tolerance() {
        let input = steer(Vec2::new(100.0, 100.0), Vec2::new(102.0, 50.0), 2.5);
        assert!(!input.left && !input.right);
        assert!(input.up && !input.down);
    }

    #[test]
    fn first_step_follows_doors_to_the_exit() {
        let config = SimulationConfig::default();
        let dungeon = generate_dungeon(3, 11, &config);
        let start = config.initial_room;
        let direction = first_step(&dungeon, start, |room| room.is_exit).expect("exit reachable");
        let next = dungeon
            .room_neighbors
            .neighbor(start, direction)
            .expect("door leads somewhere");
        assert!(dungeon.room(start).expect("start room").gaps.contains_key(&direction));
        assert_ne!(next, start);
    }

    #[test]
    fn resolve_scenarios_uses_consecutive_seeds() {
        let cli = Cli::parse_from(["simulate", "--seed", "7", "--runs", "3", "--side", "20"]);
        let scenarios = resolve_scenarios(&cli);
        let seeds: Vec<u32> = scenarios.iter().map(|scenario| scenario.seed).collect();
        assert_eq!(seeds, vec![7, 8, 9]);
        assert_eq!(scenarios[0].side, 8);
    }

    #[test]
    fn short_run_reports_no_anomalies() {
        let config = SimulationConfig::default();
        let run = run_scenario(&scenario(3), &config, EngineStores::in_memory(), None, "test");
        assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
        assert!(run.result.summary.ticks <= 600);
        assert!(run.result.summary.rooms_explored >= 1);
    }
}
