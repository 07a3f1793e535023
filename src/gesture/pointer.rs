//! Pointer event vocabulary and its derived value types

use serde::{Deserialize, Serialize};

/// Mouse input the gesture machine understands
///
/// Anything else the hook sees never becomes a `PointerEvent` and is
/// passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    /// Trigger (back) button pressed
    SecondaryButtonDown,
    /// Trigger (back) button released
    SecondaryButtonUp,
    /// Middle button pressed
    MiddleButtonDown,
    /// Middle button released
    MiddleButtonUp,
    /// Vertical wheel moved; only the sign of `delta` matters
    WheelScroll { delta: i32 },
}

/// Whether the hook should swallow an event or hand it to the next hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Consume the event, the rest of the OS never sees it
    Suppress,
    /// Forward the event unmodified
    PassThrough,
}

impl Decision {
    pub fn is_suppress(self) -> bool {
        matches!(self, Decision::Suppress)
    }
}

/// Direction of a wheel tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Direction for a wheel delta, `None` for a zero delta
    pub fn from_delta(delta: i32) -> Option<Self> {
        match delta.signum() {
            1 => Some(Self::Up),
            -1 => Some(Self::Down),
            _ => None,
        }
    }
}

/// Size of a volume step taken per wheel tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// 1% gain written straight to the endpoint
    #[default]
    Fine,
    /// The OS's own volume-key increment
    Coarse,
}

impl StepMode {
    pub fn is_fine(self) -> bool {
        matches!(self, StepMode::Fine)
    }

    pub fn from_fine(fine: bool) -> Self {
        if fine {
            StepMode::Fine
        } else {
            StepMode::Coarse
        }
    }
}

impl std::fmt::Display for StepMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepMode::Fine => write!(f, "fine"),
            StepMode::Coarse => write!(f, "coarse"),
        }
    }
}
