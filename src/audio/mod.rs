//! Audio endpoint module
//!
//! Abstracts the default render endpoint's master volume behind two
//! traits so the gesture machine can be driven without a sound card.
//! The Windows backend talks to Core Audio.

mod slot;
#[cfg(windows)]
mod windows;

pub use slot::AudioSlot;
#[cfg(windows)]
pub use self::windows::CoreAudioProvider;

/// An open handle to an audio endpoint's master volume
///
/// Dropping the handle releases the underlying device objects.
pub trait AudioEndpoint {
    /// Current master volume as a scalar in `0.0..=1.0`, `None` if unreadable
    fn volume(&self) -> Option<f32>;

    /// Write the master volume as a scalar in `0.0..=1.0`
    fn set_volume(&self, level: f32) -> Result<(), AudioError>;
}

/// Opens handles to the default audio endpoint
pub trait EndpointProvider {
    type Endpoint: AudioEndpoint;

    fn open(&self) -> Result<Self::Endpoint, AudioError>;
}

/// Errors from opening or driving an audio endpoint
///
/// All of these are transient from the gesture machine's point of view:
/// the step is skipped and the handle re-acquired on the next attempt.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no default audio render endpoint")]
    NoDefaultEndpoint,

    #[error("audio device changed or was removed")]
    DeviceChanged,

    #[error("endpoint rejected volume level {0}")]
    Rejected(f32),

    #[error("COM call failed: {0}")]
    Com(String),

    #[error("endpoint volume level could not be read")]
    Unreadable,
}
