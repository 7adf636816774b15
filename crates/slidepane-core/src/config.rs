use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::easing::EasingType;

/// Tunable parameters for panel motion and gesture handling.
///
/// All fields have defaults matching the stock panel feel; a partial TOML
/// file only needs to name the fields it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Fixed offset of the TOP resting position from the screen top, in
    /// device-independent units.
    #[serde(default = "default_top_offset")]
    pub top_offset: f64,
    /// Fraction of overscroll distance the panel actually travels beyond
    /// its boundaries.
    #[serde(default = "default_resistance_factor")]
    pub resistance_factor: f64,
    /// Maximum units the panel may sit beyond a boundary, regardless of
    /// how far the drag travels.
    #[serde(default = "default_max_overflow")]
    pub max_overflow: f64,
    /// Tween duration in milliseconds.
    #[serde(default = "default_animation_duration")]
    pub animation_duration_ms: u64,
    /// Tween update rate in frames per second.
    #[serde(default = "default_animation_fps")]
    pub animation_fps: u32,
    /// Easing curve for tweens.
    #[serde(default)]
    pub easing: EasingType,
    /// How long the command lock is held after a programmatic move
    /// completes, to absorb trailing gesture events.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Tweens shorter than this distance are skipped entirely.
    #[serde(default = "default_min_tween_distance")]
    pub min_tween_distance: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            top_offset: default_top_offset(),
            resistance_factor: default_resistance_factor(),
            max_overflow: default_max_overflow(),
            animation_duration_ms: default_animation_duration(),
            animation_fps: default_animation_fps(),
            easing: EasingType::default(),
            settle_delay_ms: default_settle_delay(),
            min_tween_distance: default_min_tween_distance(),
        }
    }
}

fn default_top_offset() -> f64 {
    50.0
}

fn default_resistance_factor() -> f64 {
    0.1 // Panel moves 10x slower when out of bounds
}

fn default_max_overflow() -> f64 {
    10.0 // Maximum units beyond boundaries
}

fn default_animation_duration() -> u64 {
    300
}

fn default_animation_fps() -> u32 {
    60
}

fn default_settle_delay() -> u64 {
    50
}

fn default_min_tween_distance() -> f64 {
    1.0
}

impl PanelConfig {
    /// Load configuration from the default path or return defaults.
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file path.
    pub fn load_from(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the default configuration file path
    /// (`~/.config/slidepane/config.toml`).
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("slidepane")
            .join("config.toml")
    }

    /// Tween duration as a `Duration`.
    #[inline]
    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }

    /// Interval between tween frames.
    #[inline]
    pub fn frame_interval(&self) -> Duration {
        if self.animation_fps == 0 {
            Duration::from_millis(16) // ~60fps fallback
        } else {
            Duration::from_millis(1000 / self.animation_fps as u64)
        }
    }

    /// Settle window held after a command-driven move.
    #[inline]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
