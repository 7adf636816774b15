//! Legal resting positions for the sliding panel.
//!
//! The panel may settle at one of three named positions, each mapped to an
//! offset from the screen top in device-independent units. TOP is a fixed
//! offset; MIDDLE and BOTTOM are derived from screen metrics and recomputed
//! on every layout or orientation change, together with the snap thresholds.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Identifier of a legal resting position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionId {
    Top,
    Middle,
    Bottom,
}

impl PositionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionId::Top => "TOP",
            PositionId::Middle => "MIDDLE",
            PositionId::Bottom => "BOTTOM",
        }
    }
}

impl std::fmt::Display for PositionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Screen measurements the registry derives its values from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenMetrics {
    /// Full screen height in device-independent units.
    pub screen_height: f64,
    /// Height of the panel strip that stays visible when closed.
    pub visible_height_closed: f64,
}

/// Minimum displacement required for a gesture to commit to the next
/// position. Each threshold is one fifth of the gap between the two
/// adjacent positions, so a drag only needs to travel 20% of the way.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnapThresholds {
    pub top_to_middle: f64,
    pub middle_to_bottom: f64,
}

/// Holds the numeric offsets of the legal positions and the derived snap
/// thresholds. Pure data; callers propagate recomputed values to the state
/// machine.
#[derive(Debug, Clone)]
pub struct PositionRegistry {
    top: f64,
    middle: f64,
    bottom: f64,
    thresholds: SnapThresholds,
    landscape: bool,
}

impl PositionRegistry {
    /// Build a registry from the fixed TOP offset and current metrics.
    pub fn new(top_offset: f64, metrics: ScreenMetrics) -> Self {
        let mut registry = Self {
            top: top_offset,
            middle: 0.0,
            bottom: 0.0,
            thresholds: SnapThresholds::default(),
            landscape: false,
        };
        registry.recompute(metrics);
        registry
    }

    /// Recompute MIDDLE, BOTTOM and the snap thresholds from new metrics.
    ///
    /// Maintains the ordering invariant `TOP < MIDDLE < BOTTOM`; degenerate
    /// metrics (screen smaller than the panel strip) are nudged apart and
    /// logged rather than allowed to collapse the range.
    pub fn recompute(&mut self, metrics: ScreenMetrics) {
        let mut middle = metrics.screen_height / 2.0;
        let mut bottom = metrics.screen_height - metrics.visible_height_closed;

        if middle <= self.top || bottom <= middle {
            warn!(
                screen_height = metrics.screen_height,
                visible_height_closed = metrics.visible_height_closed,
                "degenerate screen metrics, forcing position ordering"
            );
            middle = middle.max(self.top + 1.0);
            bottom = bottom.max(middle + 1.0);
        }

        self.middle = middle;
        self.bottom = bottom;
        self.thresholds = SnapThresholds {
            top_to_middle: (self.middle - self.top) / 5.0,
            middle_to_bottom: (self.bottom - self.middle) / 5.0,
        };
    }

    /// Numeric offset of a position.
    #[inline]
    pub fn value_of(&self, id: PositionId) -> f64 {
        match id {
            PositionId::Top => self.top,
            PositionId::Middle => self.middle,
            PositionId::Bottom => self.bottom,
        }
    }

    /// Current snap thresholds.
    #[inline]
    pub fn thresholds(&self) -> SnapThresholds {
        self.thresholds
    }

    /// Numeric range the panel may occupy: `(TOP, BOTTOM)` offsets.
    #[inline]
    pub fn bounds(&self) -> (f64, f64) {
        (self.top, self.bottom)
    }

    pub fn set_landscape(&mut self, landscape: bool) {
        self.landscape = landscape;
    }

    #[inline]
    pub fn is_landscape(&self) -> bool {
        self.landscape
    }

    /// Rewrite a requested position to one reachable in the current
    /// orientation. In landscape MIDDLE is excluded and maps to TOP.
    #[inline]
    pub fn effective(&self, id: PositionId) -> PositionId {
        if self.landscape && id == PositionId::Middle {
            PositionId::Top
        } else {
            id
        }
    }

    /// Whether a direct transition between two positions is legal.
    ///
    /// The adjacency table is `TOP <-> MIDDLE <-> BOTTOM`; there is no
    /// direct TOP <-> BOTTOM edge, so programmatic moves between the
    /// extremes hop through MIDDLE.
    pub fn can_transition(from: PositionId, to: PositionId) -> bool {
        matches!(
            (from, to),
            (PositionId::Top, PositionId::Middle)
                | (PositionId::Middle, PositionId::Top)
                | (PositionId::Middle, PositionId::Bottom)
                | (PositionId::Bottom, PositionId::Middle)
        )
    }

    /// The reachable position numerically closest to `value`.
    pub fn nearest(&self, value: f64) -> PositionId {
        let dist_top = (value - self.top).abs();
        let dist_bottom = (value - self.bottom).abs();

        if !self.landscape {
            let dist_middle = (value - self.middle).abs();
            if dist_middle <= dist_top && dist_middle <= dist_bottom {
                return PositionId::Middle;
            }
        }
        if dist_top <= dist_bottom {
            PositionId::Top
        } else {
            PositionId::Bottom
        }
    }
}
