//! Shared mutable panel state.
//!
//! All state the five components write lives in one [`PanelBody`] behind a
//! single mutex: the tween loop, gesture handlers and commands each take
//! the lock briefly and never hold it across an await, so exactly one
//! writer is live at any instant.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::gesture::GestureArbiter;
use crate::positions::PositionRegistry;
use crate::state::SnapStateMachine;
use crate::sync::Subpanel;

/// Everything mutable about a mounted panel.
#[derive(Debug)]
pub(crate) struct PanelBody {
    pub registry: PositionRegistry,
    pub machine: SnapStateMachine,
    pub arbiter: GestureArbiter,
    /// The panel's live numeric offset, mutated mid-gesture and mid-tween.
    pub current_value: f64,
    pub is_open: bool,
    pub active_subpanel: Subpanel,
    /// A tween is writing `current_value`.
    pub is_animating: bool,
    /// A programmatic move (plus its settle window) is in flight; gesture
    /// phases and further commands are ignored until it clears.
    pub is_locked: bool,
    /// Bumped on every tween start and cancellation; a tween tick that
    /// observes a stale epoch exits without writing.
    pub tween_epoch: u64,
}

/// Handle to the panel state. `None` while unmounted.
#[derive(Debug, Default)]
pub(crate) struct PanelShared {
    inner: Mutex<Option<PanelBody>>,
}

pub(crate) type SharedPanel = Arc<PanelShared>;

impl PanelShared {
    pub fn lock(&self) -> MutexGuard<'_, Option<PanelBody>> {
        // A poisoned lock means a panic elsewhere; the state itself is
        // still coherent (single writer per turn), so recover it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
