//! Gesture module for chorded volume control
//!
//! Turns a serialized stream of pointer events into suppress/pass-through
//! decisions and volume side effects:
//! - Back button held: chord open, the press itself is swallowed
//! - Wheel while held: one fine (1%) or coarse (OS key) volume step
//! - Middle click while held: toggle fine/coarse steps
//! - Back button released after any of the above: swallowed, audio released

mod machine;
mod pointer;
pub mod step;

pub use machine::{ChordState, GestureHandler, GestureMachine};
pub use pointer::{Decision, PointerEvent, ScrollDirection, StepMode};
