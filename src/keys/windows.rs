//! `SendInput` implementation of volume key replay

use std::mem;

use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    VIRTUAL_KEY, VK_VOLUME_DOWN, VK_VOLUME_UP,
};

use super::{KeyReplay, KeyReplayError, VolumeKey};

/// Replays volume keys through `SendInput`
#[derive(Debug, Default, Clone, Copy)]
pub struct SendInputKeys;

impl KeyReplay for SendInputKeys {
    fn press_and_release(&self, key: VolumeKey) -> Result<(), KeyReplayError> {
        let vk = match key {
            VolumeKey::VolumeUp => VK_VOLUME_UP,
            VolumeKey::VolumeDown => VK_VOLUME_DOWN,
        };
        let inputs = [
            keyboard_input(vk, KEYBD_EVENT_FLAGS(0)),
            keyboard_input(vk, KEYEVENTF_KEYUP),
        ];

        // SAFETY: inputs is a valid, correctly sized INPUT array
        let sent = unsafe { SendInput(&inputs, mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(KeyReplayError::Partial {
                sent,
                expected: inputs.len() as u32,
            });
        }

        Ok(())
    }
}

fn keyboard_input(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}
