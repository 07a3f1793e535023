//! Fallback for platforms without a global mouse hook backend

use tokio::sync::broadcast;

use crate::events::GestureEvent;
use crate::gesture::StepMode;

use super::HookError;

pub fn run(
    _initial_step: StepMode,
    _event_tx: broadcast::Sender<GestureEvent>,
    _on_ready: impl FnOnce(u32),
) -> Result<(), HookError> {
    Err(HookError::Unsupported)
}

pub fn request_quit(_thread_id: u32) {}
