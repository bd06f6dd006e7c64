//! Controller tunables loaded from `assets/config/controller.ron`.
use crate::char_controller::prelude::*;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

pub const SETTINGS_PATH: &str = "assets/config/controller.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("skin width must be positive, got {0}")]
    NonPositiveSkinWidth(f32),
    #[error("ray spacing must be positive, got {0}")]
    NonPositiveRaySpacing(f32),
    #[error("collider of size {size} is too small for a skin width of {skin_width}")]
    ColliderTooSmall { size: Vec2, skin_width: f32 },
    #[error("max slope angle must be in [0, 90) degrees, got {0}")]
    MaxSlopeAngle(f32),
    #[error("a moving platform needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("invalid platform {field}: {value}")]
    InvalidPlatform { field: &'static str, value: f32 },
    #[error("invalid player {field}: {value}")]
    InvalidPlayer { field: &'static str, value: f32 },
    #[error("could not read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Movement tunables for the player.
#[derive(Clone, Copy, Debug, PartialEq, Reflect, Deserialize, Serialize)]
#[reflect(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub size: Vec2,
    /// Units per second.
    pub move_speed: f32,
    /// Units per second squared. Negative pulls down.
    pub gravity: f32,
    pub jump_velocity: f32,
    /// Upward speed a jump is cut to when the button is released early.
    pub min_jump_velocity: f32,
    /// Gravity scale while falling.
    pub fall_multiplier: f32,
    /// Seconds a jump press stays buffered before landing.
    pub jump_buffer: f32,
    /// Seconds after leaving the ground during which a jump is still allowed.
    pub coyote_time: f32,
    /// Horizontal smoothing time on the ground.
    pub smooth_time_grounded: f32,
    /// Horizontal smoothing time in the air.
    pub smooth_time_airborne: f32,
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, value: f32| ConfigError::InvalidPlayer { field, value };
        if !(0.0..=self.jump_velocity).contains(&self.min_jump_velocity) {
            return Err(invalid("min_jump_velocity", self.min_jump_velocity));
        }
        for (field, value) in [
            ("jump_buffer", self.jump_buffer),
            ("coyote_time", self.coyote_time),
            ("smooth_time_grounded", self.smooth_time_grounded),
            ("smooth_time_airborne", self.smooth_time_airborne),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, value));
            }
        }
        Ok(())
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            size: Vec2::new(0.8, 1.2),
            move_speed: 6.0,
            gravity: -40.0,
            jump_velocity: 14.0,
            min_jump_velocity: 6.0,
            fall_multiplier: 1.5,
            jump_buffer: 0.1,
            coyote_time: 0.05,
            smooth_time_grounded: 0.05,
            smooth_time_airborne: 0.1,
        }
    }
}

#[derive(Resource, Clone, Debug, Default, PartialEq, Reflect, Deserialize, Serialize)]
#[reflect(Resource, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    pub raycast: RaycastConfig,
    pub collision: CollisionConfig,
    pub player: PlayerConfig,
    pub platform: PlatformConfig,
}

impl ControllerSettings {
    /// Reads settings from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading controller settings from {}", path.display());
        match read_to_string(path) {
            Ok(source) => Self::from_ron(&source),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("no settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let settings: Self = ron::de::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.raycast.validate()?;
        self.collision.validate()?;
        self.player.validate()?;
        self.platform.validate()
    }
}

fn load_settings(mut commands: Commands) -> Result {
    commands.insert_resource(ControllerSettings::load(SETTINGS_PATH)?);
    Ok(())
}

pub(crate) fn plugin(app: &mut App) {
    app.register_type::<ControllerSettings>()
        .add_systems(PreStartup, load_settings);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings = ControllerSettings::from_ron(
            "(raycast: (skin_width: 0.05), collision: (max_slope_angle: 60.0))",
        )
        .unwrap();

        assert_eq!(settings.raycast.skin_width, 0.05);
        assert_eq!(settings.raycast.ray_spacing, 0.2);
        assert_eq!(settings.collision.max_slope_angle, 60.0);
        assert_eq!(settings.collision.one_way_tag, "JumpThrough");
        assert_eq!(settings.platform.speed, 1.0);
        assert_eq!(settings.platform.wait_time, 0.5);
        assert_eq!(settings.platform.easing, 1.0);
        assert!(!settings.platform.cyclic);
    }

    #[test]
    fn platform_waypoints_parse_as_tuples() {
        let settings = ControllerSettings::from_ron(
            "(platform: (waypoints: [(0.0, 0.0), (0.0, 3.0), (4.0, 3.0)], cyclic: true))",
        )
        .unwrap();

        assert_eq!(
            settings.platform.waypoints,
            vec![Vec2::ZERO, Vec2::new(0.0, 3.0), Vec2::new(4.0, 3.0)]
        );
        assert!(settings.platform.cyclic);
    }

    #[test]
    fn malformed_settings_are_a_parse_error() {
        assert!(matches!(
            ControllerSettings::from_ron("(raycast: (skin_width: \"wide\"))"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn out_of_range_settings_are_rejected() {
        assert!(matches!(
            ControllerSettings::from_ron("(collision: (max_slope_angle: 95.0))"),
            Err(ConfigError::MaxSlopeAngle(_))
        ));
        assert!(matches!(
            ControllerSettings::from_ron("(raycast: (ray_spacing: 0.0))"),
            Err(ConfigError::NonPositiveRaySpacing(_))
        ));
        assert!(matches!(
            ControllerSettings::from_ron("(player: (jump_velocity: 10.0, min_jump_velocity: 12.0))"),
            Err(ConfigError::InvalidPlayer { field: "min_jump_velocity", .. })
        ));
        assert!(matches!(
            ControllerSettings::from_ron("(player: (coyote_time: -0.1))"),
            Err(ConfigError::InvalidPlayer { field: "coyote_time", .. })
        ));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let settings = ControllerSettings::load("assets/config/does_not_exist.ron").unwrap();
        assert_eq!(settings, ControllerSettings::default());
    }

    #[test]
    fn shipped_settings_are_valid() {
        let source = include_str!("../assets/config/controller.ron");
        ControllerSettings::from_ron(source).unwrap();
    }
}
