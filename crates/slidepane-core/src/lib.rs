//! Positioning controller for a draggable, multi-position sliding panel.
//!
//! Reconciles three concurrent sources of motion (raw pointer drags from
//! two controls, programmatic move commands, and tween animations) into a
//! single consistent panel position that always lands on a legal resting
//! position. See [`controller::PanelController`] for the entry point.

pub mod config;
pub mod controller;
pub mod easing;
pub mod error;
pub mod gesture;
pub mod motion;
pub mod positions;
mod shared;
pub mod state;
pub mod sync;

pub use config::PanelConfig;
pub use controller::PanelController;
pub use easing::EasingType;
pub use error::{Error, Result};
pub use gesture::{GestureArbiter, GestureSource, GestureUpdate, PointerPhase, PointerSample};
pub use motion::{MotionController, TweenOutcome};
pub use positions::{PositionId, PositionRegistry, ScreenMetrics, SnapThresholds};
pub use state::SnapStateMachine;
pub use sync::{PanelEvent, PositionSync, Subpanel};
