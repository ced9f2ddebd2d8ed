use crate::config::SimulationConfig;
use crate::types::{Direction, Vec2};
use crate::world::Gap;

/// Whether a body crossing `gap` on side `dir` has reached the opening.
pub(super) fn crosses_gap(dir: Direction, gap: &Gap, pos: Vec2, radius: f32) -> bool {
    match dir {
        Direction::Left => pos.x - radius <= gap.fixed && gap.contains(pos.y),
        Direction::Right => pos.x + radius >= gap.fixed && gap.contains(pos.y),
        Direction::Top => pos.y - radius <= gap.fixed && gap.contains(pos.x),
        Direction::Bottom => pos.y + radius >= gap.fixed && gap.contains(pos.x),
    }
}

/// Spawn point against the wall opposite the one that was crossed.
pub(super) fn entry_position(
    dir: Direction,
    pos: Vec2,
    radius: f32,
    config: &SimulationConfig,
) -> Vec2 {
    let ww = config.wall_width;
    match dir {
        Direction::Left => Vec2::new(config.screen_width - ww - radius, pos.y),
        Direction::Right => Vec2::new(ww + radius, pos.y),
        Direction::Top => Vec2::new(pos.x, config.screen_height - ww - radius),
        Direction::Bottom => Vec2::new(pos.x, ww + radius),
    }
}

/// Strictly inside the wall band on every side, whole body included.
pub(super) fn clear_of_walls(pos: Vec2, radius: f32, config: &SimulationConfig) -> bool {
    let ww = config.wall_width;
    ww < pos.x - radius
        && pos.x + radius < config.screen_width - ww
        && ww < pos.y - radius
        && pos.y + radius < config.screen_height - ww
}

pub(super) fn minimap_step(from: (i32, i32), dir: Direction, cell_size: i32) -> (i32, i32) {
    let (dx, dy) = dir.offset();
    (from.0 + dx * cell_size, from.1 + dy * cell_size)
}
