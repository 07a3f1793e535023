//! Dispatch boundary between the OS hook and the gesture machine
//!
//! Nothing raised while classifying an event may escape to the OS. A
//! panic abandons that event's effect, releases the audio handle and lets
//! the raw event through unmodified.

use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::gesture::{Decision, GestureHandler};

use super::raw::RawMouseEvent;

/// Decide the fate of one raw hook record
pub fn dispatch<H: GestureHandler + ?Sized>(handler: &mut H, raw: &RawMouseEvent) -> Decision {
    if raw.is_tagged() {
        return Decision::PassThrough;
    }

    let Some(event) = raw.decode() else {
        return Decision::PassThrough;
    };

    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle_event(event))) {
        Ok(decision) => decision,
        Err(payload) => {
            error!(?event, reason = %panic_message(&*payload), "gesture handler panicked");
            if panic::catch_unwind(AssertUnwindSafe(|| handler.recover())).is_err() {
                error!("gesture handler panicked during recovery");
            }
            Decision::PassThrough
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
