//! Gesture arbitration for the two pointer sources that drag the panel.
//!
//! Raw pointer phases arrive both from the panel's own drag handle and
//! from a companion status-bar control. Both are reduced to the same
//! start/move/end protocol; the arbiter owns the per-session bookkeeping
//! (start offset, external delta baseline) and applies overscroll
//! resistance, producing continuous numeric position updates.

use tracing::debug;

/// Which control originated a pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureSource {
    /// The panel's own drag handle.
    Panel,
    /// The companion status-bar control elsewhere in the UI.
    StatusBar,
}

/// Phase of a pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// One pointer sample. Deltas are cumulative from the toolkit's gesture
/// origin, in device-independent units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub phase: PointerPhase,
    pub delta_x: f64,
    pub delta_y: f64,
}

impl PointerSample {
    pub fn start() -> Self {
        Self {
            phase: PointerPhase::Start,
            delta_x: 0.0,
            delta_y: 0.0,
        }
    }

    pub fn moved(delta_x: f64, delta_y: f64) -> Self {
        Self {
            phase: PointerPhase::Move,
            delta_x,
            delta_y,
        }
    }

    pub fn end() -> Self {
        Self {
            phase: PointerPhase::End,
            delta_x: 0.0,
            delta_y: 0.0,
        }
    }

    pub fn cancel() -> Self {
        Self {
            phase: PointerPhase::Cancel,
            delta_x: 0.0,
            delta_y: 0.0,
        }
    }
}

/// Outcome of feeding one sample through the arbiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureUpdate {
    /// A session opened; no position change yet.
    Started,
    /// The panel should move to this numeric value (resistance applied).
    Moved(f64),
    /// The session ended; the panel should snap from its current value.
    Released,
    /// The session was cancelled by the toolkit.
    Cancelled,
    /// Sample did not apply (no session, or a different source owns it).
    Ignored,
}

/// Live drag bookkeeping. Exactly one session exists at a time.
#[derive(Debug, Clone, Copy)]
struct GestureSession {
    source: GestureSource,
    /// Panel offset when the session opened.
    start_value: f64,
    /// Delta already accumulated by the toolkit when the session opened.
    /// Non-zero only for the status-bar source, whose gesture may be picked
    /// up mid-flight; subtracting it avoids a discontinuous jump.
    baseline_delta: f64,
}

/// Converts pointer-phase streams into continuous position updates.
#[derive(Debug, Clone)]
pub struct GestureArbiter {
    session: Option<GestureSession>,
    resistance_factor: f64,
    max_overflow: f64,
}

impl GestureArbiter {
    pub fn new(resistance_factor: f64, max_overflow: f64) -> Self {
        Self {
            session: None,
            resistance_factor,
            max_overflow,
        }
    }

    /// Whether a drag session is currently live.
    #[inline]
    pub fn in_session(&self) -> bool {
        self.session.is_some()
    }

    /// Feed one pointer sample through the arbiter.
    ///
    /// `current_value` is the panel's present numeric offset and `bounds`
    /// the legal `(TOP, BOTTOM)` range. A `Start` always opens a fresh
    /// session, replacing any live one (last writer wins). A status-bar
    /// `Move` with no live session opens one implicitly, using that move's
    /// delta as the baseline.
    pub fn handle(
        &mut self,
        source: GestureSource,
        sample: PointerSample,
        current_value: f64,
        bounds: (f64, f64),
    ) -> GestureUpdate {
        match sample.phase {
            PointerPhase::Start => {
                if let Some(session) = &self.session {
                    debug!(
                        old = ?session.source,
                        new = ?source,
                        "gesture session replaced by new start"
                    );
                }
                self.session = Some(GestureSession {
                    source,
                    start_value: current_value,
                    baseline_delta: match source {
                        GestureSource::Panel => 0.0,
                        GestureSource::StatusBar => sample.delta_y,
                    },
                });
                GestureUpdate::Started
            }
            PointerPhase::Move => {
                let session = match self.session {
                    Some(session) if session.source == source => session,
                    Some(_) => return GestureUpdate::Ignored,
                    None if source == GestureSource::StatusBar => {
                        // The companion control's start phase can be
                        // missed when its gesture began before the panel
                        // was ready; open the session here.
                        let session = GestureSession {
                            source,
                            start_value: current_value,
                            baseline_delta: sample.delta_y,
                        };
                        self.session = Some(session);
                        session
                    }
                    None => return GestureUpdate::Ignored,
                };

                let proposed = session.start_value + (sample.delta_y - session.baseline_delta);
                GestureUpdate::Moved(self.resist(proposed, bounds))
            }
            PointerPhase::End => match self.session {
                Some(session) if session.source == source => {
                    self.session = None;
                    GestureUpdate::Released
                }
                _ => GestureUpdate::Ignored,
            },
            PointerPhase::Cancel => match self.session {
                Some(session) if session.source == source => {
                    self.session = None;
                    GestureUpdate::Cancelled
                }
                _ => GestureUpdate::Ignored,
            },
        }
    }

    /// Clamp a proposed offset into the legal range with a rubber-band
    /// feel: beyond a boundary the panel travels `resistance_factor` of
    /// the overflow, capped at `max_overflow` units.
    pub fn resist(&self, proposed: f64, bounds: (f64, f64)) -> f64 {
        let (top, bottom) = bounds;
        if proposed >= top && proposed <= bottom {
            return proposed;
        }

        let over_top = proposed < top;
        let boundary = if over_top { top } else { bottom };
        let overflow = (proposed - boundary).abs();
        let resistance = (overflow * self.resistance_factor).min(self.max_overflow);

        if over_top {
            boundary - resistance
        } else {
            boundary + resistance
        }
    }
}
