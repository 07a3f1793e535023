//! Events module for gesture side effects
//!
//! The gesture machine announces every effect it performs so the daemon's
//! main loop can log them away from the hook thread.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::gesture::{ScrollDirection, StepMode};

/// Events emitted by the gesture machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GestureEvent {
    /// Middle click during a chord switched the step size
    StepModeToggled { mode: StepMode },

    /// A fine step wrote a new level to the endpoint
    VolumeSet {
        direction: ScrollDirection,
        /// Level before the step
        from: f32,
        /// Level written
        to: f32,
    },

    /// A coarse step replayed a volume key
    VolumeKeySent { direction: ScrollDirection },

    /// A fine step was skipped because the endpoint failed
    VolumeStepFailed {
        direction: ScrollDirection,
        reason: String,
    },

    /// Trigger released after chord activity; the release was swallowed
    ChordEnded,

    /// The audio endpoint handle was dropped
    AudioReleased,
}

impl std::fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GestureEvent::StepModeToggled { mode } => write!(f, "STEP_MODE_TOGGLED ({})", mode),
            GestureEvent::VolumeSet { from, to, .. } => {
                write!(f, "VOLUME_SET ({:.2} -> {:.2})", from, to)
            }
            GestureEvent::VolumeKeySent { direction } => {
                write!(f, "VOLUME_KEY_SENT ({:?})", direction)
            }
            GestureEvent::VolumeStepFailed { reason, .. } => {
                write!(f, "VOLUME_STEP_FAILED ({})", reason)
            }
            GestureEvent::ChordEnded => write!(f, "CHORD_ENDED"),
            GestureEvent::AudioReleased => write!(f, "AUDIO_RELEASED"),
        }
    }
}

/// Log gesture events until every sender is gone
///
/// Returns the number of events received.
pub async fn log_events(mut event_rx: broadcast::Receiver<GestureEvent>) -> u64 {
    let mut received = 0;
    loop {
        match event_rx.recv().await {
            Ok(event) => {
                received += 1;
                info!(%event, "gesture event");
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "gesture event receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    received
}
