//! Volume key replay
//!
//! Coarse steps are delegated to the OS by synthesising a volume key
//! press, which also brings up the system volume indicator.

#[cfg(windows)]
mod windows;

use serde::{Deserialize, Serialize};

#[cfg(windows)]
pub use self::windows::SendInputKeys;

use crate::gesture::ScrollDirection;

/// Logical volume keys that can be replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeKey {
    VolumeUp,
    VolumeDown,
}

impl From<ScrollDirection> for VolumeKey {
    fn from(direction: ScrollDirection) -> Self {
        match direction {
            ScrollDirection::Up => VolumeKey::VolumeUp,
            ScrollDirection::Down => VolumeKey::VolumeDown,
        }
    }
}

/// Sends a synthetic press+release of a volume key
pub trait KeyReplay {
    fn press_and_release(&self, key: VolumeKey) -> Result<(), KeyReplayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum KeyReplayError {
    #[error("OS accepted {sent} of {expected} synthetic key events")]
    Partial { sent: u32, expected: u32 },
}
