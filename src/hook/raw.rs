//! Raw low-level mouse message decoding
//!
//! Translates the message id and `mouseData` word of a low-level mouse
//! hook record into the gesture vocabulary.

use crate::gesture::PointerEvent;

/// Low-level mouse message identifiers
pub mod messages {
    pub const WM_MBUTTONDOWN: u32 = 0x0207;
    pub const WM_MBUTTONUP: u32 = 0x0208;
    pub const WM_MOUSEWHEEL: u32 = 0x020A;
    pub const WM_XBUTTONDOWN: u32 = 0x020B;
    pub const WM_XBUTTONUP: u32 = 0x020C;
    pub const WM_MOUSEHWHEEL: u32 = 0x020E;
}

/// X button id of the back button, the chord trigger
pub const XBUTTON1: u16 = 0x0001;

/// The fields of one hook record the gesture machine cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMouseEvent {
    /// Window message id (`wParam`)
    pub message: u32,
    /// `MSLLHOOKSTRUCT::mouseData`
    pub mouse_data: u32,
    /// `MSLLHOOKSTRUCT::dwExtraInfo`
    pub extra_info: usize,
}

impl RawMouseEvent {
    pub fn new(message: u32, mouse_data: u32, extra_info: usize) -> Self {
        Self {
            message,
            mouse_data,
            extra_info,
        }
    }

    /// Events tagged by another program's synthetic input are left alone
    pub fn is_tagged(&self) -> bool {
        self.extra_info != 0
    }

    fn high_word(&self) -> u16 {
        (self.mouse_data >> 16) as u16
    }

    /// Map to a gesture event, `None` for anything outside the vocabulary
    pub fn decode(&self) -> Option<PointerEvent> {
        use messages::*;

        match self.message {
            WM_XBUTTONDOWN if self.high_word() == XBUTTON1 => Some(PointerEvent::SecondaryButtonDown),
            WM_XBUTTONUP if self.high_word() == XBUTTON1 => Some(PointerEvent::SecondaryButtonUp),
            WM_MBUTTONDOWN => Some(PointerEvent::MiddleButtonDown),
            WM_MBUTTONUP => Some(PointerEvent::MiddleButtonUp),
            WM_MOUSEWHEEL => Some(PointerEvent::WheelScroll {
                delta: i32::from(self.high_word() as i16),
            }),
            _ => None,
        }
    }
}
