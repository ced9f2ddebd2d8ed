//! Tuning values threaded explicitly into every subsystem.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Rect, RoomId, Vec2};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    pub radius: f32,
    pub speed: f32,
    pub max_health: i32,
    pub invincible_ticks: u32,
    pub initial_ammo: i32,
    pub max_ammo: i32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            radius: 15.0,
            speed: 5.0,
            max_health: 100,
            invincible_ticks: 60,
            initial_ammo: 20,
            max_ammo: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BulletConfig {
    pub radius: f32,
    pub speed: f32,
    pub damage: i32,
    pub max_bullets: usize,
    pub cooldown_ticks: u32,
    pub lifetime_ticks: u32,
}

impl Default for BulletConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            speed: 8.0,
            damage: 10,
            max_bullets: 5,
            cooldown_ticks: 15,
            lifetime_ticks: 180,
        }
    }
}

/// Exit strip: from `x_min` to the right screen edge, `y_min..y_max` tall.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitZone {
    pub x_min: f32,
    pub y_min: f32,
    pub y_max: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    pub screen_width: f32,
    pub screen_height: f32,
    pub wall_width: f32,
    pub minimap_cell_size: i32,
    pub initial_room: RoomId,
    pub initial_position: Vec2,
    pub player: PlayerConfig,
    pub bullet: BulletConfig,
    pub enemy_contact_damage: i32,
    pub exit_zone: ExitZone,
    pub entrance_zone: Rect,
    pub key_rooms: Vec<RoomId>,
    pub tip_duration_secs: u32,
    pub max_enemies_per_room: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            screen_width: 800.0,
            screen_height: 600.0,
            wall_width: 20.0,
            minimap_cell_size: 20,
            initial_room: 1,
            initial_position: Vec2::new(80.0, 300.0),
            player: PlayerConfig::default(),
            bullet: BulletConfig::default(),
            enemy_contact_damage: crate::constants::ENEMY_CONTACT_DAMAGE,
            exit_zone: ExitZone {
                x_min: 740.0,
                y_min: 250.0,
                y_max: 350.0,
            },
            entrance_zone: Rect::new(0.0, 250.0, 50.0, 100.0),
            key_rooms: vec![5, 10, 15],
            tip_duration_secs: 2,
            max_enemies_per_room: 8,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wall_width < 0.0 {
            return Err(ConfigError::Invalid("wallWidth must not be negative".into()));
        }
        let min_side = 2.0 * (self.wall_width + self.player.radius);
        if self.screen_width <= min_side || self.screen_height <= min_side {
            return Err(ConfigError::Invalid(format!(
                "screen {}x{} is too small for wallWidth {} and player radius {}",
                self.screen_width, self.screen_height, self.wall_width, self.player.radius
            )));
        }
        if self.player.radius <= 0.0 {
            return Err(ConfigError::Invalid("player.radius must be positive".into()));
        }
        if self.player.max_health <= 0 {
            return Err(ConfigError::Invalid("player.maxHealth must be positive".into()));
        }
        if self.minimap_cell_size <= 0 {
            return Err(ConfigError::Invalid("minimapCellSize must be positive".into()));
        }
        if self.exit_zone.y_max < self.exit_zone.y_min {
            return Err(ConfigError::Invalid("exitZone.yMax is below exitZone.yMin".into()));
        }
        Ok(())
    }

    pub fn exit_rect(&self) -> Rect {
        Rect::new(
            self.exit_zone.x_min,
            self.exit_zone.y_min,
            self.screen_width - self.exit_zone.x_min,
            self.exit_zone.y_max - self.exit_zone.y_min,
        )
    }

    pub fn tip_ticks(&self) -> u32 {
        self.tip_duration_secs * crate::constants::TICK_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = SimulationConfig::from_json_str(
            r#"{ "screenWidth": 1024, "player": { "radius": 12 } }"#,
        )
        .expect("valid config");
        assert_eq!(config.screen_width, 1024.0);
        assert_eq!(config.screen_height, 600.0);
        assert_eq!(config.player.radius, 12.0);
        assert_eq!(config.player.max_health, 100);
    }

    #[test]
    fn rejects_screen_smaller_than_walls() {
        let result = SimulationConfig::from_json_str(r#"{ "screenWidth": 40, "wallWidth": 20 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_malformed_json() {
        let result = SimulationConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn exit_rect_spans_to_right_edge() {
        let config = SimulationConfig::default();
        let rect = config.exit_rect();
        assert_eq!(rect.x, 740.0);
        assert_eq!(rect.right(), config.screen_width);
        assert_eq!(rect.h, 100.0);
    }
}
