//! Tween driver for panel moves.
//!
//! Runs the async tween from the panel's current offset to a target,
//! writing interpolated values frame by frame. At most one tween is active
//! at a time; a gesture can cancel it synchronously and the loop exits on
//! its next frame without writing again.

use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::config::PanelConfig;
use crate::easing::{lerp, EasingType};
use crate::shared::SharedPanel;

/// How a tween finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenOutcome {
    /// The panel's offset when the tween stopped. Equals the target on
    /// completion; on cancellation it is the last interpolated frame.
    pub value: f64,
    /// False when the tween was preempted, refused, or the panel
    /// unmounted mid-flight.
    pub completed: bool,
}

/// Drives tweens over shared panel state.
#[derive(Debug, Clone)]
pub struct MotionController {
    shared: SharedPanel,
    duration: Duration,
    frame_interval: Duration,
    easing: EasingType,
    min_distance: f64,
}

impl MotionController {
    pub(crate) fn new(shared: SharedPanel, config: &PanelConfig) -> Self {
        Self {
            shared,
            duration: config.animation_duration(),
            frame_interval: config.frame_interval(),
            easing: config.easing,
            min_distance: config.min_tween_distance,
        }
    }

    /// Animate the panel to `target`, resolving with the final offset.
    ///
    /// Never errors: an unmounted panel, a live tween, or a mid-flight
    /// cancellation all resolve with `completed = false` and the panel
    /// left wherever it visually is. Targets within `min_distance` of the
    /// current offset resolve immediately without a tween.
    pub async fn animate_to(&self, target: f64) -> TweenOutcome {
        let (from, my_epoch) = {
            let mut guard = self.shared.lock();
            let Some(body) = guard.as_mut() else {
                debug!(target, "tween dropped: panel not mounted");
                return TweenOutcome {
                    value: target,
                    completed: false,
                };
            };
            if body.is_animating {
                debug!(target, "tween refused: another tween is in flight");
                return TweenOutcome {
                    value: body.current_value,
                    completed: false,
                };
            }
            let from = body.current_value;
            if (from - target).abs() < self.min_distance {
                body.current_value = target;
                return TweenOutcome {
                    value: target,
                    completed: true,
                };
            }
            body.is_animating = true;
            body.tween_epoch = body.tween_epoch.wrapping_add(1);
            (from, body.tween_epoch)
        };

        let start = Instant::now();
        let mut ticker = time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // first tick resolves immediately

        loop {
            ticker.tick().await;
            let t = progress(start, self.duration);

            let mut guard = self.shared.lock();
            let Some(body) = guard.as_mut() else {
                debug!("tween aborted: panel unmounted mid-flight");
                return TweenOutcome {
                    value: from,
                    completed: false,
                };
            };
            if body.tween_epoch != my_epoch || !body.is_animating {
                // Preempted; the offset stays frozen at the last frame.
                return TweenOutcome {
                    value: body.current_value,
                    completed: false,
                };
            }
            if t >= 1.0 {
                body.current_value = target;
                body.is_animating = false;
                return TweenOutcome {
                    value: target,
                    completed: true,
                };
            }
            body.current_value = lerp(from, target, self.easing.apply(t));
        }
    }

    /// Stop the in-flight tween at its current interpolated value.
    ///
    /// Synchronous: `is_animating` clears and the offset is frozen before
    /// this returns; the tween task observes the bumped epoch on its next
    /// frame and exits without writing.
    pub fn cancel(&self) {
        let mut guard = self.shared.lock();
        if let Some(body) = guard.as_mut() {
            if body.is_animating {
                body.is_animating = false;
                body.tween_epoch = body.tween_epoch.wrapping_add(1);
                debug!(value = body.current_value, "tween cancelled");
            }
        }
    }

    /// Whether a tween is currently writing the panel offset.
    pub fn is_animating(&self) -> bool {
        self.shared
            .lock()
            .as_ref()
            .map(|body| body.is_animating)
            .unwrap_or(false)
    }
}

/// Tween progress in [0, 1] from start time and duration.
#[inline]
fn progress(start: Instant, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = start.elapsed();
    (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}
