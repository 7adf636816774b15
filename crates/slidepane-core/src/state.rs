//! Snap decision state machine.
//!
//! Owns the current legal position and the last stable numeric offset, and
//! decides which position a released gesture resolves to. Decisions are
//! directional: they depend on which position the motion started from, and
//! a single gesture commits at most one step along the adjacency chain.
//! Programmatic moves between non-adjacent positions are routed through
//! MIDDLE by [`SnapStateMachine::route_to`].

use tracing::debug;

use crate::positions::{PositionId, PositionRegistry};

/// Tolerance when matching the last stable offset against position values.
const STABLE_EPSILON: f64 = 1e-6;

#[inline]
fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < STABLE_EPSILON
}

/// Finite-state machine over the legal panel positions.
#[derive(Debug, Clone)]
pub struct SnapStateMachine {
    current: PositionId,
    last_stable: Option<f64>,
}

impl Default for SnapStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapStateMachine {
    /// A fresh machine starts closed, with no motion context yet.
    pub fn new() -> Self {
        Self {
            current: PositionId::Bottom,
            last_stable: None,
        }
    }

    #[inline]
    pub fn current(&self) -> PositionId {
        self.current
    }

    #[inline]
    pub fn last_stable(&self) -> Option<f64> {
        self.last_stable
    }

    /// Record a settled position together with its numeric offset.
    pub fn commit(&mut self, id: PositionId, value: f64) {
        if self.current != id {
            debug!(from = %self.current, to = %id, "panel position transition");
        }
        self.current = id;
        self.last_stable = Some(value);
    }

    /// Set the current position without touching the stable offset. Used
    /// mid-route, before the hop's tween has finished.
    pub fn set_current(&mut self, id: PositionId) {
        self.current = id;
    }

    /// Refresh the stable offset after the registry was recomputed.
    pub fn set_last_stable(&mut self, value: f64) {
        self.last_stable = Some(value);
    }

    /// Decide which position a gesture ending at `current_value` resolves
    /// to.
    ///
    /// Thresholds commit strictly beyond the boundary: a displacement
    /// exactly at the threshold springs back. With no stable context (first
    /// decision after mount) the numerically nearest position wins.
    pub fn decide(&self, current_value: f64, registry: &PositionRegistry) -> PositionId {
        if registry.is_landscape() {
            return self.decide_landscape(current_value, registry);
        }

        let top = registry.value_of(PositionId::Top);
        let middle = registry.value_of(PositionId::Middle);
        let bottom = registry.value_of(PositionId::Bottom);
        let th = registry.thresholds();

        match self.last_stable {
            Some(last) if approx(last, top) => {
                // Moving away from TOP.
                if current_value - top > th.top_to_middle {
                    PositionId::Middle
                } else if current_value > middle {
                    PositionId::Bottom
                } else {
                    PositionId::Top
                }
            }
            Some(last) if approx(last, bottom) => {
                // Moving away from BOTTOM.
                if bottom - current_value > th.middle_to_bottom {
                    PositionId::Middle
                } else if current_value < middle {
                    PositionId::Top
                } else {
                    PositionId::Bottom
                }
            }
            Some(last) if approx(last, middle) => {
                // Moving away from MIDDLE, toward whichever side.
                if current_value < middle {
                    if middle - current_value > th.top_to_middle {
                        PositionId::Top
                    } else {
                        PositionId::Middle
                    }
                } else if current_value - middle > th.middle_to_bottom {
                    PositionId::Bottom
                } else {
                    PositionId::Middle
                }
            }
            _ => registry.nearest(current_value),
        }
    }

    /// Two-position variant for landscape, where MIDDLE is unreachable.
    /// Sensitivity is one fifth of the full TOP-to-BOTTOM span.
    fn decide_landscape(&self, current_value: f64, registry: &PositionRegistry) -> PositionId {
        let (top, bottom) = registry.bounds();
        let sensitivity = (bottom - top) / 5.0;

        match self.last_stable {
            Some(last) if approx(last, top) => {
                if current_value - top > sensitivity {
                    PositionId::Bottom
                } else {
                    PositionId::Top
                }
            }
            Some(last) if approx(last, bottom) => {
                if bottom - current_value > sensitivity {
                    PositionId::Top
                } else {
                    PositionId::Bottom
                }
            }
            _ => {
                if current_value < (top + bottom) / 2.0 {
                    PositionId::Top
                } else {
                    PositionId::Bottom
                }
            }
        }
    }

    /// Plan the hops a programmatic move must take to reach `target`.
    ///
    /// Returns an empty route when already at the target, a single hop when
    /// the direct edge exists, and a two-hop route through MIDDLE when it
    /// does not (TOP <-> BOTTOM). In landscape MIDDLE is unreachable and
    /// the adjacency collapses to a direct TOP <-> BOTTOM edge.
    pub fn route_to(&self, target: PositionId, landscape: bool) -> Vec<PositionId> {
        if self.current == target {
            Vec::new()
        } else if landscape || PositionRegistry::can_transition(self.current, target) {
            vec![target]
        } else {
            vec![PositionId::Middle, target]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::ScreenMetrics;

    fn registry() -> PositionRegistry {
        // TOP = 50, MIDDLE = 400, BOTTOM = 690
        // thresholds: top_to_middle = 70, middle_to_bottom = 58
        PositionRegistry::new(
            50.0,
            ScreenMetrics {
                screen_height: 800.0,
                visible_height_closed: 110.0,
            },
        )
    }

    fn machine_at(id: PositionId, registry: &PositionRegistry) -> SnapStateMachine {
        let mut machine = SnapStateMachine::new();
        machine.commit(id, registry.value_of(id));
        machine
    }

    #[test]
    fn test_initial_state_is_bottom() {
        let machine = SnapStateMachine::new();
        assert_eq!(machine.current(), PositionId::Bottom);
        assert_eq!(machine.last_stable(), None);
    }

    #[test]
    fn test_decide_from_bottom_reference_scenario() {
        let registry = registry();
        let machine = machine_at(PositionId::Bottom, &registry);
        // Displacement 690 - 340 = 350 > 58 commits to MIDDLE.
        assert_eq!(machine.decide(340.0, &registry), PositionId::Middle);
    }

    #[test]
    fn test_decide_springs_back_within_threshold() {
        let registry = registry();
        let machine = machine_at(PositionId::Bottom, &registry);
        assert_eq!(machine.decide(650.0, &registry), PositionId::Bottom);

        let machine = machine_at(PositionId::Top, &registry);
        assert_eq!(machine.decide(100.0, &registry), PositionId::Top);
    }

    #[test]
    fn test_decide_exact_threshold_springs_back() {
        let registry = registry();
        // Strictly-greater policy: displacement of exactly one threshold
        // does not commit.
        let machine = machine_at(PositionId::Bottom, &registry);
        assert_eq!(machine.decide(690.0 - 58.0, &registry), PositionId::Bottom);
        assert_eq!(machine.decide(690.0 - 58.1, &registry), PositionId::Middle);

        let machine = machine_at(PositionId::Top, &registry);
        assert_eq!(machine.decide(50.0 + 70.0, &registry), PositionId::Top);
        assert_eq!(machine.decide(50.0 + 70.1, &registry), PositionId::Middle);
    }

    #[test]
    fn test_decide_is_monotonic_from_bottom() {
        let registry = registry();
        let machine = machine_at(PositionId::Bottom, &registry);
        // A single decision starting at BOTTOM never reaches TOP, no
        // matter how far the gesture travelled.
        for value in [600.0, 400.0, 200.0, 60.0, 50.0] {
            assert_ne!(machine.decide(value, &registry), PositionId::Top, "at {value}");
        }
        // Reaching TOP takes a second decision from MIDDLE.
        let machine = machine_at(PositionId::Middle, &registry);
        assert_eq!(machine.decide(200.0, &registry), PositionId::Top);
    }

    #[test]
    fn test_decide_from_middle_both_directions() {
        let registry = registry();
        let machine = machine_at(PositionId::Middle, &registry);
        assert_eq!(machine.decide(320.0, &registry), PositionId::Top); // 80 > 70
        assert_eq!(machine.decide(340.0, &registry), PositionId::Middle); // 60 <= 70
        assert_eq!(machine.decide(460.0, &registry), PositionId::Bottom); // 60 > 58
        assert_eq!(machine.decide(450.0, &registry), PositionId::Middle); // 50 <= 58
    }

    #[test]
    fn test_decide_without_context_uses_nearest() {
        let registry = registry();
        let machine = SnapStateMachine::new();
        assert_eq!(machine.decide(70.0, &registry), PositionId::Top);
        assert_eq!(machine.decide(420.0, &registry), PositionId::Middle);
        assert_eq!(machine.decide(600.0, &registry), PositionId::Bottom);
    }

    #[test]
    fn test_decide_landscape_two_positions() {
        let mut registry = registry();
        registry.set_landscape(true);
        // Span 640, sensitivity 128.
        let machine = machine_at(PositionId::Bottom, &registry);
        assert_eq!(machine.decide(500.0, &registry), PositionId::Top); // 190 > 128
        assert_eq!(machine.decide(600.0, &registry), PositionId::Bottom); // 90 <= 128

        let machine = machine_at(PositionId::Top, &registry);
        assert_eq!(machine.decide(200.0, &registry), PositionId::Bottom); // 150 > 128
        assert_eq!(machine.decide(150.0, &registry), PositionId::Top);
    }

    #[test]
    fn test_route_to_direct_and_two_hop() {
        let registry = registry();
        let machine = machine_at(PositionId::Top, &registry);
        assert_eq!(
            machine.route_to(PositionId::Middle, false),
            vec![PositionId::Middle]
        );
        assert_eq!(
            machine.route_to(PositionId::Bottom, false),
            vec![PositionId::Middle, PositionId::Bottom]
        );
        assert!(machine.route_to(PositionId::Top, false).is_empty());

        let machine = machine_at(PositionId::Bottom, &registry);
        assert_eq!(
            machine.route_to(PositionId::Top, false),
            vec![PositionId::Middle, PositionId::Top]
        );
    }

    #[test]
    fn test_route_to_is_direct_in_landscape() {
        let registry = registry();
        let machine = machine_at(PositionId::Bottom, &registry);
        assert_eq!(
            machine.route_to(PositionId::Top, true),
            vec![PositionId::Top]
        );
    }
}
