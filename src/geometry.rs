//! Overlap tests and gap-aware wall collision. Everything here is pure.

use crate::types::{Direction, Rect, Vec2};
use crate::world::Room;

const EDGE_EPSILON: f32 = 1e-3;

/// Strict overlap: rectangles that only share an edge do not collide.
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

pub fn circle_bounding_box(center: Vec2, radius: f32) -> Rect {
    Rect::new(
        center.x - radius,
        center.y - radius,
        radius * 2.0,
        radius * 2.0,
    )
}

/// Square box of `half_size` around a center point.
pub fn centered_box(center: Vec2, half_size: f32) -> Rect {
    circle_bounding_box(center, half_size)
}

fn same_edge(a: f32, b: f32) -> bool {
    (a - b).abs() < EDGE_EPSILON
}

/// Whether `wall` is carved out by one of the room's gaps for an entity whose
/// center is at `pos`.
pub fn wall_in_gap(wall: &Rect, pos: Vec2, room: &Room) -> bool {
    room.gaps.iter().any(|(dir, gap)| match dir {
        Direction::Right => same_edge(wall.x, gap.fixed) && gap.contains(pos.y),
        Direction::Left => same_edge(wall.right(), gap.fixed) && gap.contains(pos.y),
        Direction::Top => same_edge(wall.bottom(), gap.fixed) && gap.contains(pos.x),
        Direction::Bottom => same_edge(wall.y, gap.fixed) && gap.contains(pos.x),
    })
}

pub fn wall_blocks(new_pos: Vec2, radius: f32, room: &Room) -> bool {
    let body = circle_bounding_box(new_pos, radius);
    room.walls
        .iter()
        .any(|wall| !wall_in_gap(wall, new_pos, room) && overlaps(&body, wall))
}

pub fn rect_hits_any_wall(rect: &Rect, room: &Room) -> bool {
    room.walls.iter().any(|wall| overlaps(rect, wall))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Gap;

    fn room_with_right_gap() -> Room {
        let mut room = Room::new(1);
        room.walls.push(Rect::new(780.0, 0.0, 20.0, 600.0));
        room.gaps.insert(
            Direction::Right,
            Gap {
                fixed: 780.0,
                min: 200.0,
                max: 300.0,
            },
        );
        room
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!overlaps(&a, &b));
        let c = Rect::new(9.5, 9.5, 10.0, 10.0);
        assert!(overlaps(&a, &c));
    }

    #[test]
    fn bounding_box_is_centered() {
        let rect = circle_bounding_box(Vec2::new(40.0, 250.0), 15.0);
        assert_eq!(rect, Rect::new(25.0, 235.0, 30.0, 30.0));
    }

    #[test]
    fn wall_blocks_outside_gap_range() {
        let room = room_with_right_gap();
        assert!(wall_blocks(Vec2::new(775.0, 100.0), 15.0, &room));
    }

    #[test]
    fn gap_carves_wall_inside_range() {
        let room = room_with_right_gap();
        assert!(!wall_blocks(Vec2::new(775.0, 250.0), 15.0, &room));
    }

    #[test]
    fn gap_on_other_edge_does_not_carve() {
        let mut room = room_with_right_gap();
        room.walls.push(Rect::new(0.0, 0.0, 20.0, 600.0));
        assert!(wall_blocks(Vec2::new(25.0, 250.0), 15.0, &room));
    }

    #[test]
    fn free_space_is_not_blocked() {
        let room = room_with_right_gap();
        assert!(!wall_blocks(Vec2::new(400.0, 300.0), 15.0, &room));
    }
}
