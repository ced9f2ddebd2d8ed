use crate::constants::{FIREBALL_DAMAGE, FIREBALL_LIFETIME_TICKS, FIREBALL_RADIUS, FIREBALL_SPEED};
use crate::geometry::circle_bounding_box;
use crate::types::{ProjectileView, Rect, Vec2};

/// Enemy-fired shot. Lives in the pool of the room it was fired in.
#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub origin: Vec2,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub damage: i32,
    pub radius: f32,
    pub lifetime_left: u32,
}

impl Projectile {
    /// Aims at `target` as it is right now; a coincident target yields a
    /// projectile that never moves.
    pub fn spawn(origin: Vec2, target: Vec2) -> Self {
        let dx = target.x - origin.x;
        let dy = target.y - origin.y;
        let distance = dx.hypot(dy);
        let velocity = if distance > 0.0 {
            Vec2::new(dx / distance * FIREBALL_SPEED, dy / distance * FIREBALL_SPEED)
        } else {
            Vec2::default()
        };
        Self {
            origin,
            pos: origin,
            velocity,
            damage: FIREBALL_DAMAGE,
            radius: FIREBALL_RADIUS,
            lifetime_left: FIREBALL_LIFETIME_TICKS,
        }
    }

    pub fn advance(&mut self) {
        self.pos.x += self.velocity.x;
        self.pos.y += self.velocity.y;
        self.lifetime_left = self.lifetime_left.saturating_sub(1);
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime_left == 0
    }

    pub fn bounds(&self) -> Rect {
        circle_bounding_box(self.pos, self.radius)
    }

    /// Damage to apply. The caller drops the projectile from its pool.
    pub fn hit_player(&self) -> i32 {
        self.damage
    }

    pub fn to_view(&self) -> ProjectileView {
        ProjectileView {
            x: self.pos.x,
            y: self.pos.y,
            radius: self.radius,
            damage: self.damage,
            lifetime_left: self.lifetime_left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_is_normalized_toward_target() {
        let shot = Projectile::spawn(Vec2::new(0.0, 0.0), Vec2::new(30.0, 40.0));
        assert!((shot.velocity.x - 3.0).abs() < 1e-4);
        assert!((shot.velocity.y - 4.0).abs() < 1e-4);
        assert_eq!(shot.damage, 10);
    }

    #[test]
    fn coincident_target_gives_zero_velocity() {
        let mut shot = Projectile::spawn(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0));
        shot.advance();
        assert_eq!(shot.pos, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn expires_after_lifetime() {
        let mut shot = Projectile::spawn(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
        for _ in 0..FIREBALL_LIFETIME_TICKS - 1 {
            shot.advance();
            assert!(!shot.is_expired());
        }
        shot.advance();
        assert!(shot.is_expired());
    }
}
