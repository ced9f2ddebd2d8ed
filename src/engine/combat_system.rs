use super::*;

impl GameEngine {
    /// Each bullet hits the first enemy it overlaps and is spent.
    pub(super) fn resolve_bullet_hits(&mut self) {
        let mut remaining = Vec::with_capacity(self.player.bullets.len());
        for bullet in std::mem::take(&mut self.player.bullets) {
            let bounds = bullet.bounds();
            let target = self
                .entities
                .active_enemies()
                .iter()
                .find(|enemy| overlaps(&bounds, &enemy.bounds()))
                .map(|enemy| enemy.id);
            let Some(enemy_id) = target else {
                remaining.push(bullet);
                continue;
            };
            if let Some(event) = self.entities.damage_enemy(enemy_id, bullet.damage) {
                self.stats.enemies_defeated += 1;
                self.events.push(event);
            }
        }
        self.player.bullets = remaining;
    }

    pub(super) fn resolve_enemy_contact(&mut self) {
        let bounds = self.player.bounds();
        let touching = self
            .entities
            .active_enemies()
            .iter()
            .any(|enemy| overlaps(&bounds, &enemy.bounds()));
        if touching {
            let damage = self.config.enemy_contact_damage;
            self.hurt_player(damage, "enemy");
        }
    }

    pub(super) fn resolve_projectile_hits(&mut self) {
        let bounds = self.player.bounds();
        for projectile in self.entities.take_projectiles_hitting(&bounds) {
            self.hurt_player(projectile.hit_player(), "fireball");
        }
    }

    fn hurt_player(&mut self, damage: i32, source: &str) {
        if self.player.take_damage(damage, &self.config) {
            self.stats.damage_taken += damage;
            self.events.push(RuntimeEvent::PlayerHit {
                damage,
                source: source.to_string(),
            });
        }
    }
}
