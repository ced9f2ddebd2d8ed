use crate::config::SimulationConfig;
use crate::constants::{
    ITEM_HALF_SIZE, PLACEMENT_BORDER_MARGIN, PLACEMENT_MAX_SAFE_ZONES, PLACEMENT_MIN_SAFE_ZONES,
    PLACEMENT_MIN_SPACING, PLACEMENT_OPEN_AREA_MIN_CLEAR, PLACEMENT_OPEN_AREA_PROBE,
    PLACEMENT_RANDOM_ATTEMPTS, PLACEMENT_RANDOM_MARGIN,
};
use crate::geometry::{centered_box, overlaps, rect_hits_any_wall};
use crate::rng::Rng;
use crate::types::Vec2;
use crate::world::Room;

pub fn is_valid_position(pos: Vec2, room: &Room, config: &SimulationConfig) -> bool {
    let item_rect = centered_box(pos, ITEM_HALF_SIZE);
    if rect_hits_any_wall(&item_rect, room) {
        return false;
    }
    if room.is_exit && overlaps(&item_rect, &config.exit_rect()) {
        return false;
    }
    if room.room_id == config.initial_room && overlaps(&item_rect, &config.entrance_zone) {
        return false;
    }

    let margin = PLACEMENT_BORDER_MARGIN;
    pos.x >= margin
        && pos.x <= config.screen_width - margin
        && pos.y >= margin
        && pos.y <= config.screen_height - margin
}

/// Curated grid points that survive validation, topped up with spaced random
/// points when too few do.
pub fn safe_zones(room: &Room, config: &SimulationConfig, rng: &mut Rng) -> Vec<Vec2> {
    let w = config.screen_width;
    let h = config.screen_height;
    let mut zones = Vec::new();
    for y in [h / 6.0, h / 2.0, 5.0 * h / 6.0] {
        for x in [w / 8.0, 3.0 * w / 8.0, 5.0 * w / 8.0, 7.0 * w / 8.0] {
            let pos = Vec2::new(x, y);
            if is_valid_position(pos, room, config) {
                zones.push(pos);
            }
        }
    }

    if zones.len() < PLACEMENT_MIN_SAFE_ZONES {
        let margin = PLACEMENT_RANDOM_MARGIN as i32;
        for _ in 0..PLACEMENT_RANDOM_ATTEMPTS {
            let pos = Vec2::new(
                rng.int(margin, w as i32 - margin) as f32,
                rng.int(margin, h as i32 - margin) as f32,
            );
            if !is_valid_position(pos, room, config) {
                continue;
            }
            let too_close = zones.iter().any(|existing| {
                (existing.x - pos.x).abs() < PLACEMENT_MIN_SPACING
                    && (existing.y - pos.y).abs() < PLACEMENT_MIN_SPACING
            });
            if too_close {
                continue;
            }
            zones.push(pos);
            if zones.len() >= PLACEMENT_MAX_SAFE_ZONES {
                break;
            }
        }
    }
    zones
}

/// Probe points whose surrounding 3x3 neighborhood is mostly placeable.
pub fn open_areas(room: &Room, config: &SimulationConfig) -> Vec<Vec2> {
    let w = config.screen_width;
    let h = config.screen_height;
    let step = PLACEMENT_OPEN_AREA_PROBE;
    let mut areas = Vec::new();
    for y in [h / 4.0, h / 2.0, 3.0 * h / 4.0] {
        for x in [w / 4.0, w / 2.0, 3.0 * w / 4.0] {
            let probe = Vec2::new(x, y);
            if !is_valid_position(probe, room, config) {
                continue;
            }
            let mut clear = 0;
            for dx in [-step, 0.0, step] {
                for dy in [-step, 0.0, step] {
                    if is_valid_position(Vec2::new(x + dx, y + dy), room, config) {
                        clear += 1;
                    }
                }
            }
            if clear >= PLACEMENT_OPEN_AREA_MIN_CLEAR {
                areas.push(probe);
            }
        }
    }
    areas
}

/// Every candidate spot for the room, deduplicated and shuffled.
pub fn candidate_positions(room: &Room, config: &SimulationConfig, rng: &mut Rng) -> Vec<Vec2> {
    let mut all = safe_zones(room, config, rng);
    for pos in open_areas(room, config) {
        if !all.contains(&pos) {
            all.push(pos);
        }
    }
    rng.shuffle(&mut all);
    all
}
