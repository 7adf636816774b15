//! Boundary reporting to the host application state.
//!
//! The only component that talks outward. After every settled transition
//! it reports the legal position, the numeric offset, the derived open
//! flag and the active subpanel over an injected channel; no component
//! reaches into host state directly.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::positions::PositionId;
use crate::shared::PanelBody;

/// Sub-view shown inside the open panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subpanel {
    Quick,
    Search,
    Layers,
}

impl Default for Subpanel {
    fn default() -> Self {
        Subpanel::Quick
    }
}

impl Subpanel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subpanel::Quick => "quick",
            Subpanel::Search => "search",
            Subpanel::Layers => "layers",
        }
    }
}

impl std::fmt::Display for Subpanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted to the host after settled transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// The panel settled on a legal position.
    PositionChanged { position: PositionId, value: f64 },
    /// The derived open flag flipped. False only at BOTTOM.
    OpenStateChanged { is_open: bool },
    /// Closing forced the subpanel back to the default, so the panel does
    /// not reopen into a stale deep sub-view.
    ActiveSubpanelChanged { subpanel: Subpanel },
}

/// Reports panel state outward over an injected sink.
#[derive(Debug, Clone)]
pub struct PositionSync {
    tx: mpsc::UnboundedSender<PanelEvent>,
}

impl PositionSync {
    pub fn new(tx: mpsc::UnboundedSender<PanelEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: PanelEvent) {
        if self.tx.send(event).is_err() {
            warn!("failed to send panel event: receiver dropped");
        }
    }

    /// Report a settled transition, updating the derived open flag and
    /// forcing the subpanel default when the panel closes.
    pub(crate) fn report(&self, body: &mut PanelBody, position: PositionId, value: f64) {
        self.send(PanelEvent::PositionChanged { position, value });

        let is_open = position != PositionId::Bottom;
        if is_open != body.is_open {
            body.is_open = is_open;
            self.send(PanelEvent::OpenStateChanged { is_open });
        }
        if !is_open && body.active_subpanel != Subpanel::Quick {
            body.active_subpanel = Subpanel::Quick;
            self.send(PanelEvent::ActiveSubpanelChanged {
                subpanel: Subpanel::Quick,
            });
        }
    }

    /// Report the initial snapshot right after mount, when the host has
    /// no previous state to diff against.
    pub(crate) fn report_mounted(&self, body: &PanelBody, position: PositionId, value: f64) {
        self.send(PanelEvent::PositionChanged { position, value });
        self.send(PanelEvent::OpenStateChanged {
            is_open: body.is_open,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::GestureArbiter;
    use crate::positions::{PositionRegistry, ScreenMetrics};
    use crate::state::SnapStateMachine;

    fn body(is_open: bool, subpanel: Subpanel) -> PanelBody {
        PanelBody {
            registry: PositionRegistry::new(
                50.0,
                ScreenMetrics {
                    screen_height: 800.0,
                    visible_height_closed: 110.0,
                },
            ),
            machine: SnapStateMachine::new(),
            arbiter: GestureArbiter::new(0.1, 10.0),
            current_value: 690.0,
            is_open,
            active_subpanel: subpanel,
            is_animating: false,
            is_locked: false,
            tween_epoch: 0,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PanelEvent>) -> Vec<PanelEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_open_flag_flips_only_on_change() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sync = PositionSync::new(tx);
        let mut body = body(false, Subpanel::Quick);

        sync.report(&mut body, PositionId::Middle, 400.0);
        let events = drain(&mut rx);
        assert!(events.contains(&PanelEvent::OpenStateChanged { is_open: true }));
        assert!(body.is_open);

        // Settling open again does not re-announce the flag.
        sync.report(&mut body, PositionId::Top, 50.0);
        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![PanelEvent::PositionChanged {
                position: PositionId::Top,
                value: 50.0
            }]
        );
    }

    #[test]
    fn test_close_forces_default_subpanel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sync = PositionSync::new(tx);
        let mut body = body(true, Subpanel::Layers);

        sync.report(&mut body, PositionId::Bottom, 690.0);
        let events = drain(&mut rx);
        assert!(events.contains(&PanelEvent::OpenStateChanged { is_open: false }));
        assert!(events.contains(&PanelEvent::ActiveSubpanelChanged {
            subpanel: Subpanel::Quick
        }));
        assert_eq!(body.active_subpanel, Subpanel::Quick);
        assert!(!body.is_open);
    }

    #[test]
    fn test_close_with_default_subpanel_stays_quiet() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sync = PositionSync::new(tx);
        let mut body = body(true, Subpanel::Quick);

        sync.report(&mut body, PositionId::Bottom, 690.0);
        let events = drain(&mut rx);
        assert!(!events
            .iter()
            .any(|e| matches!(e, PanelEvent::ActiveSubpanelChanged { .. })));
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sync = PositionSync::new(tx);
        let mut body = body(false, Subpanel::Quick);
        sync.report(&mut body, PositionId::Middle, 400.0);
    }
}
