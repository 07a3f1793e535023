//! Core Audio backend for the default render endpoint
//!
//! COM must already be initialised on the calling thread; the hook thread
//! does that before building the gesture machine.

use tracing::debug;
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::Media::Audio::{eConsole, eRender, IMMDeviceEnumerator, MMDeviceEnumerator};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL};

use super::{AudioEndpoint, AudioError, EndpointProvider};

/// HRESULT_FROM_WIN32(ERROR_NOT_FOUND)
const E_NOTFOUND: u32 = 0x8007_0490;
/// AUDCLNT_E_DEVICE_INVALIDATED
const DEVICE_INVALIDATED: u32 = 0x8889_0004;

/// Opens the console-role default render endpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreAudioProvider;

/// Master volume control of one render endpoint
pub struct CoreAudioEndpoint {
    volume: IAudioEndpointVolume,
}

impl EndpointProvider for CoreAudioProvider {
    type Endpoint = CoreAudioEndpoint;

    fn open(&self) -> Result<CoreAudioEndpoint, AudioError> {
        // SAFETY: plain COM activation on a thread that called CoInitializeEx
        let volume = unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(map_com)?;
            let device = enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(map_com)?;
            device
                .Activate::<IAudioEndpointVolume>(CLSCTX_ALL, None)
                .map_err(map_com)?
        };

        Ok(CoreAudioEndpoint { volume })
    }
}

impl AudioEndpoint for CoreAudioEndpoint {
    fn volume(&self) -> Option<f32> {
        // SAFETY: the interface pointer is owned by self and still alive
        match unsafe { self.volume.GetMasterVolumeLevelScalar() } {
            Ok(level) => Some(level),
            Err(e) => {
                debug!(error = %map_com(e), "master volume read failed");
                None
            }
        }
    }

    fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        // SAFETY: as above; a null event context GUID is allowed
        unsafe { self.volume.SetMasterVolumeLevelScalar(level, std::ptr::null()) }
                .map_err(|e| match map_com(e) {
                AudioError::Com(_) => AudioError::Rejected(level),
                other => other,
            })
    }
}

fn map_com(err: windows::core::Error) -> AudioError {
    match err.code().0 as u32 {
        E_NOTFOUND => AudioError::NoDefaultEndpoint,
        DEVICE_INVALIDATED => AudioError::DeviceChanged,
        _ => AudioError::Com(err.to_string()),
    }
}
