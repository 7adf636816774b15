//! Pure easing and interpolation functions for panel tweens.
//!
//! Easing maps progress `t` in [0, 1] to an eased value in [0, 1] with the
//! selected acceleration curve. All functions clamp their input.

use serde::{Deserialize, Serialize};

/// Easing curve applied to tween progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    /// Constant velocity.
    Linear,
    /// Quadratic ease-in (slow start).
    EaseIn,
    /// Quadratic ease-out (slow end).
    EaseOut,
    /// Quadratic ease-in-out (slow start and end).
    EaseInOut,
}

impl Default for EasingType {
    fn default() -> Self {
        EasingType::EaseInOut
    }
}

impl EasingType {
    /// Apply the easing function to a progress value in [0, 1].
    #[inline]
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingType::Linear => t,
            EasingType::EaseIn => t * t,
            EasingType::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            EasingType::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Linear interpolation between two values.
#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}
