//! Panel controller: explicit composition of the five components.
//!
//! Owns the mount lifecycle and wires the gesture arbiter, state machine,
//! motion controller and position sync together. Pointer handling is
//! synchronous and cheap; tweens and settle delays are the only points of
//! suspension. Methods that animate spawn onto the current Tokio runtime,
//! so the controller must be used inside one.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::PanelConfig;
use crate::gesture::{GestureArbiter, GestureSource, GestureUpdate, PointerPhase, PointerSample};
use crate::motion::MotionController;
use crate::positions::{PositionId, PositionRegistry, ScreenMetrics};
use crate::shared::{PanelBody, SharedPanel};
use crate::state::SnapStateMachine;
use crate::sync::{PanelEvent, PositionSync, Subpanel};

/// Decision logic turning pointer streams and commands into one consistent
/// panel position.
///
/// Cheap to clone; clones share the same panel state.
#[derive(Debug, Clone)]
pub struct PanelController {
    shared: SharedPanel,
    motion: MotionController,
    sync: PositionSync,
    config: PanelConfig,
}

impl PanelController {
    /// Create an unmounted controller. Settled transitions are reported
    /// over `events`; commands arriving before [`mount`](Self::mount) are
    /// dropped.
    pub fn new(config: PanelConfig, events: mpsc::UnboundedSender<PanelEvent>) -> Self {
        let shared: SharedPanel = Default::default();
        let motion = MotionController::new(shared.clone(), &config);
        Self {
            shared,
            motion,
            sync: PositionSync::new(events),
            config,
        }
    }

    /// Attach the panel to a screen. The panel starts closed at BOTTOM and
    /// the initial snapshot is reported immediately.
    pub fn mount(&self, metrics: ScreenMetrics, landscape: bool) {
        let mut guard = self.shared.lock();

        let mut registry = PositionRegistry::new(self.config.top_offset, metrics);
        registry.set_landscape(landscape);
        let bottom = registry.value_of(PositionId::Bottom);

        let mut machine = SnapStateMachine::new();
        machine.set_last_stable(bottom);

        let body = PanelBody {
            registry,
            machine,
            arbiter: GestureArbiter::new(self.config.resistance_factor, self.config.max_overflow),
            current_value: bottom,
            is_open: false,
            active_subpanel: Subpanel::Quick,
            is_animating: false,
            is_locked: false,
            tween_epoch: 0,
        };
        self.sync.report_mounted(&body, PositionId::Bottom, bottom);
        *guard = Some(body);
        info!(bottom, landscape, "panel mounted");
    }

    /// Detach the panel, cancelling any in-flight tween.
    pub fn unmount(&self) {
        self.motion.cancel();
        let mut guard = self.shared.lock();
        if guard.take().is_some() {
            info!("panel unmounted");
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.lock().is_some()
    }

    /// The tween driver, for hosts that need to cancel or inspect motion
    /// directly.
    pub fn motion(&self) -> &MotionController {
        &self.motion
    }

    /// The panel's live numeric offset, if mounted.
    pub fn current_value(&self) -> Option<f64> {
        self.shared.lock().as_ref().map(|body| body.current_value)
    }

    /// The current legal position, if mounted.
    pub fn current_position(&self) -> Option<PositionId> {
        self.shared
            .lock()
            .as_ref()
            .map(|body| body.machine.current())
    }

    /// Whether the panel is open (anywhere but BOTTOM). False while
    /// unmounted.
    pub fn is_open(&self) -> bool {
        self.shared
            .lock()
            .as_ref()
            .map(|body| body.is_open)
            .unwrap_or(false)
    }

    pub fn active_subpanel(&self) -> Option<Subpanel> {
        self.shared
            .lock()
            .as_ref()
            .map(|body| body.active_subpanel)
    }

    /// Record the host's choice of sub-view. No event is emitted; the host
    /// already knows.
    pub fn set_active_subpanel(&self, subpanel: Subpanel) {
        if let Some(body) = self.shared.lock().as_mut() {
            body.active_subpanel = subpanel;
        }
    }

    /// Push new screen metrics (layout or orientation change). Recomputes
    /// the registry and thresholds, then re-seats the panel on its current
    /// position's new offset.
    pub fn set_metrics(&self, metrics: ScreenMetrics) {
        let current = {
            let mut guard = self.shared.lock();
            let Some(body) = guard.as_mut() else {
                debug!("set_metrics dropped: panel not mounted");
                return;
            };
            body.registry.recompute(metrics);
            body.machine.current()
        };

        let controller = self.clone();
        tokio::spawn(async move {
            controller.move_to(current).await;
        });
    }

    /// Flip the orientation flag. The numeric values follow on the next
    /// metrics push, which the host sends alongside orientation changes.
    pub fn set_orientation(&self, landscape: bool) {
        if let Some(body) = self.shared.lock().as_mut() {
            body.registry.set_landscape(landscape);
        }
    }

    /// Feed one pointer sample from either drag source.
    ///
    /// Start/move phases run to completion synchronously; a released or
    /// cancelled session resolves its snap target and animates there on a
    /// spawned task. All phases are no-ops while a programmatic move holds
    /// the lock.
    pub fn handle_pointer(&self, source: GestureSource, sample: PointerSample) {
        let update = {
            let mut guard = self.shared.lock();
            let Some(body) = guard.as_mut() else {
                debug!("pointer sample dropped: panel not mounted");
                return;
            };
            if body.is_locked {
                return;
            }

            // User input always preempts programmatic motion: cancel the
            // tween the instant a sample opens a session.
            let opens_session = sample.phase == PointerPhase::Start
                || (sample.phase == PointerPhase::Move
                    && !body.arbiter.in_session()
                    && source == GestureSource::StatusBar);
            if opens_session && body.is_animating {
                body.is_animating = false;
                body.tween_epoch = body.tween_epoch.wrapping_add(1);
                debug!(value = body.current_value, "gesture preempted tween");
            }

            let bounds = body.registry.bounds();
            let current = body.current_value;
            let update = body.arbiter.handle(source, sample, current, bounds);
            if let GestureUpdate::Moved(value) = update {
                body.current_value = value;
            }
            update
        };

        match update {
            GestureUpdate::Released | GestureUpdate::Cancelled => self.spawn_snap(),
            _ => {}
        }
    }

    /// Resolve the released gesture to a legal position and animate there.
    fn spawn_snap(&self) {
        let shared = self.shared.clone();
        let motion = self.motion.clone();
        let sync = self.sync.clone();

        tokio::spawn(async move {
            let (target_id, target) = {
                let mut guard = shared.lock();
                let Some(body) = guard.as_mut() else {
                    return;
                };
                if body.is_locked {
                    return;
                }
                // A new drag opened between the release and this task
                // being polled; its own release snaps instead.
                if body.arbiter.in_session() {
                    debug!("snap superseded by a new drag session");
                    return;
                }
                let id = body.machine.decide(body.current_value, &body.registry);
                let value = body.registry.value_of(id);
                body.machine.commit(id, value);
                (id, value)
            };

            let outcome = motion.animate_to(target).await;
            if outcome.completed {
                let mut guard = shared.lock();
                if let Some(body) = guard.as_mut() {
                    sync.report(body, target_id, outcome.value);
                }
            }
        });
    }

    /// Programmatically move the panel to a legal position.
    ///
    /// Illegal direct transitions are routed through MIDDLE automatically,
    /// so callers issue one logical command. In landscape a MIDDLE request
    /// is rewritten to TOP. Resolves immediately, without a tween, when the
    /// panel already rests on the target. The lock is held through the
    /// move and for a short settle window afterwards, absorbing trailing
    /// gesture events.
    pub async fn move_to(&self, target: PositionId) {
        let route = {
            let mut guard = self.shared.lock();
            let Some(body) = guard.as_mut() else {
                debug!(%target, "move_to dropped: panel not mounted");
                return;
            };
            if body.is_locked {
                debug!(%target, "move_to ignored: another command is settling");
                return;
            }
            if body.arbiter.in_session() {
                debug!(%target, "move_to ignored: drag in progress");
                return;
            }

            let target = body.registry.effective(target);
            let landscape = body.registry.is_landscape();
            let mut route = body.machine.route_to(target, landscape);
            if route.is_empty() {
                let value = body.registry.value_of(target);
                if (body.current_value - value).abs() < self.config.min_tween_distance {
                    // Already settled there.
                    return;
                }
                // Same position, new offset (metrics changed): re-seat.
                route.push(target);
            }

            // A passive snap tween still in flight yields to the command.
            if body.is_animating {
                body.is_animating = false;
                body.tween_epoch = body.tween_epoch.wrapping_add(1);
            }
            body.is_locked = true;
            route
        };

        for hop in route {
            let value = {
                let mut guard = self.shared.lock();
                let Some(body) = guard.as_mut() else {
                    break;
                };
                body.machine.set_current(hop);
                body.registry.value_of(hop)
            };

            let outcome = self.motion.animate_to(value).await;
            if !outcome.completed {
                debug!(%hop, "move_to hop interrupted");
                break;
            }

            let mut guard = self.shared.lock();
            if let Some(body) = guard.as_mut() {
                body.machine.set_last_stable(value);
                self.sync.report(body, hop, value);
            }
        }

        // Hold the lock briefly past completion so trailing touch events
        // from the toolkit are not misread as a new gesture.
        let shared = self.shared.clone();
        let settle = self.config.settle_delay();
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            if let Some(body) = shared.lock().as_mut() {
                body.is_locked = false;
            }
        });
    }

    /// Open the panel: MIDDLE in portrait, TOP in landscape.
    pub async fn open(&self) {
        self.move_to(PositionId::Middle).await;
    }

    /// Close the panel to BOTTOM.
    pub async fn close(&self) {
        self.move_to(PositionId::Bottom).await;
    }

    /// Open or close depending on the current open flag.
    pub async fn toggle(&self) {
        if self.is_open() {
            self.close().await;
        } else {
            self.open().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const METRICS: ScreenMetrics = ScreenMetrics {
        screen_height: 800.0,
        visible_height_closed: 110.0,
    };

    fn mounted() -> (PanelController, mpsc::UnboundedReceiver<PanelEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = PanelController::new(PanelConfig::default(), tx);
        controller.mount(METRICS, false);
        (controller, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PanelEvent>) -> Vec<PanelEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn positions(events: &[PanelEvent]) -> Vec<(PositionId, f64)> {
        events
            .iter()
            .filter_map(|e| match e {
                PanelEvent::PositionChanged { position, value } => Some((*position, *value)),
                _ => None,
            })
            .collect()
    }

    /// Let spawned snap/settle tasks run to completion on the paused clock.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_reports_closed_snapshot() {
        let (controller, mut rx) = mounted();
        let events = drain(&mut rx);
        assert_eq!(positions(&events), vec![(PositionId::Bottom, 690.0)]);
        assert!(events.contains(&PanelEvent::OpenStateChanged { is_open: false }));
        assert_eq!(controller.current_position(), Some(PositionId::Bottom));
        assert_eq!(controller.current_value(), Some(690.0));
        assert!(!controller.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_before_mount_are_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller = PanelController::new(PanelConfig::default(), tx);
        controller.move_to(PositionId::Top).await;
        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(controller.current_value(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gesture_from_bottom_snaps_to_middle() {
        let (controller, mut rx) = mounted();
        drain(&mut rx);

        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        controller.handle_pointer(GestureSource::Panel, PointerSample::moved(0.0, -350.0));
        assert_eq!(controller.current_value(), Some(340.0));
        controller.handle_pointer(GestureSource::Panel, PointerSample::end());
        settle().await;

        assert_eq!(controller.current_position(), Some(PositionId::Middle));
        assert_eq!(controller.current_value(), Some(400.0));
        let events = drain(&mut rx);
        assert_eq!(positions(&events), vec![(PositionId::Middle, 400.0)]);
        assert!(events.contains(&PanelEvent::OpenStateChanged { is_open: true }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_gesture_springs_back() {
        let (controller, mut rx) = mounted();
        drain(&mut rx);

        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        controller.handle_pointer(GestureSource::Panel, PointerSample::moved(0.0, -40.0));
        controller.handle_pointer(GestureSource::Panel, PointerSample::end());
        settle().await;

        assert_eq!(controller.current_position(), Some(PositionId::Bottom));
        assert_eq!(controller.current_value(), Some(690.0));
        // Still closed, so no open-state flip.
        let events = drain(&mut rx);
        assert!(!events
            .iter()
            .any(|e| matches!(e, PanelEvent::OpenStateChanged { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_to_two_hop_emits_two_tweens() {
        let (controller, mut rx) = mounted();
        controller.move_to(PositionId::Top).await;
        settle().await;
        drain(&mut rx);
        assert_eq!(controller.current_position(), Some(PositionId::Top));

        controller.move_to(PositionId::Bottom).await;
        settle().await;

        assert_eq!(controller.current_value(), Some(690.0));
        let events = drain(&mut rx);
        assert_eq!(
            positions(&events),
            vec![(PositionId::Middle, 400.0), (PositionId::Bottom, 690.0)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_to_is_idempotent_at_target() {
        let (controller, mut rx) = mounted();
        drain(&mut rx);

        let before = tokio::time::Instant::now();
        controller.move_to(PositionId::Bottom).await;
        // Resolved without a tween or a settle window.
        assert_eq!(before.elapsed(), Duration::ZERO);
        assert!(drain(&mut rx).is_empty());

        // And gestures are not locked out afterwards.
        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        controller.handle_pointer(GestureSource::Panel, PointerSample::moved(0.0, -350.0));
        assert_eq!(controller.current_value(), Some(340.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_lock_absorbs_trailing_gestures() {
        let (controller, mut rx) = mounted();
        controller.move_to(PositionId::Middle).await;
        drain(&mut rx);

        // Trailing toolkit noise right after the command completes.
        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        controller.handle_pointer(GestureSource::Panel, PointerSample::moved(0.0, 100.0));
        assert_eq!(controller.current_value(), Some(400.0));

        // Once the settle window passes, gestures apply again.
        tokio::time::sleep(Duration::from_millis(60)).await;
        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        controller.handle_pointer(GestureSource::Panel, PointerSample::moved(0.0, 100.0));
        assert_eq!(controller.current_value(), Some(500.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gesture_preempts_snap_tween() {
        let (controller, _rx) = mounted();

        // Release a drag mid-range so a snap tween starts.
        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        controller.handle_pointer(GestureSource::Panel, PointerSample::moved(0.0, -350.0));
        controller.handle_pointer(GestureSource::Panel, PointerSample::end());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(controller.motion().is_animating());

        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        assert!(!controller.motion().is_animating());
        let frozen = controller.current_value().unwrap();
        assert!(frozen > 340.0 && frozen < 690.0, "frozen at {frozen}");

        // The preempted tween writes nothing further.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(controller.current_value(), Some(frozen));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_drag_supersedes_pending_snap() {
        let (controller, mut rx) = mounted();
        drain(&mut rx);

        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        controller.handle_pointer(GestureSource::Panel, PointerSample::moved(0.0, -350.0));
        controller.handle_pointer(GestureSource::Panel, PointerSample::end());
        // A second drag opens before the snap task gets polled. Only the
        // drag may write the offset from here on.
        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        controller.handle_pointer(GestureSource::Panel, PointerSample::moved(0.0, -20.0));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!controller.motion().is_animating());
        assert_eq!(controller.current_value(), Some(320.0));
        assert!(drain(&mut rx).is_empty());

        // The live drag's own release still snaps normally.
        controller.handle_pointer(GestureSource::Panel, PointerSample::end());
        settle().await;
        assert_eq!(controller.current_position(), Some(PositionId::Middle));
        assert_eq!(controller.current_value(), Some(400.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_forces_quick_subpanel() {
        let (controller, mut rx) = mounted();
        controller.move_to(PositionId::Middle).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        controller.set_active_subpanel(Subpanel::Layers);
        drain(&mut rx);

        controller.move_to(PositionId::Bottom).await;
        settle().await;

        let events = drain(&mut rx);
        assert!(events.contains(&PanelEvent::OpenStateChanged { is_open: false }));
        assert!(events.contains(&PanelEvent::ActiveSubpanelChanged {
            subpanel: Subpanel::Quick
        }));
        assert_eq!(controller.active_subpanel(), Some(Subpanel::Quick));
    }

    #[tokio::test(start_paused = true)]
    async fn test_landscape_rewrites_middle_to_top() {
        let (controller, mut rx) = mounted();
        controller.set_orientation(true);
        drain(&mut rx);

        controller.move_to(PositionId::Middle).await;
        settle().await;

        assert_eq!(controller.current_position(), Some(PositionId::Top));
        assert_eq!(controller.current_value(), Some(50.0));
        let events = drain(&mut rx);
        assert_eq!(positions(&events), vec![(PositionId::Top, 50.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_metrics_reseats_panel() {
        let (controller, mut rx) = mounted();
        drain(&mut rx);

        controller.set_metrics(ScreenMetrics {
            screen_height: 900.0,
            visible_height_closed: 110.0,
        });
        settle().await;

        assert_eq!(controller.current_value(), Some(790.0));
        let events = drain(&mut rx);
        assert_eq!(positions(&events), vec![(PositionId::Bottom, 790.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_opens_then_closes() {
        let (controller, _rx) = mounted();

        controller.toggle().await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(controller.is_open());
        assert_eq!(controller.current_position(), Some(PositionId::Middle));

        controller.toggle().await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!controller.is_open());
        assert_eq!(controller.current_position(), Some(PositionId::Bottom));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_cancels_tween() {
        let (controller, _rx) = mounted();

        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        controller.handle_pointer(GestureSource::Panel, PointerSample::moved(0.0, -350.0));
        controller.handle_pointer(GestureSource::Panel, PointerSample::end());
        tokio::time::sleep(Duration::from_millis(50)).await;

        controller.unmount();
        assert!(!controller.is_mounted());
        assert_eq!(controller.current_value(), None);
        // Nothing resurrects the panel afterwards.
        settle().await;
        assert!(!controller.is_mounted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_during_drag_is_dropped() {
        let (controller, mut rx) = mounted();
        drain(&mut rx);

        controller.handle_pointer(GestureSource::Panel, PointerSample::start());
        controller.handle_pointer(GestureSource::Panel, PointerSample::moved(0.0, -200.0));
        controller.move_to(PositionId::Top).await;

        // The drag still owns the panel.
        assert_eq!(controller.current_value(), Some(490.0));
        assert!(drain(&mut rx).is_empty());
    }
}
