//! Lazily opened, explicitly released audio endpoint slot

use tracing::debug;

use super::{AudioError, EndpointProvider};

/// Holds at most one live endpoint handle
///
/// The handle is opened on first use and dropped by `release()`. There is
/// no closed state: after a release the next `ensure_open()` opens a fresh
/// handle.
pub struct AudioSlot<P: EndpointProvider> {
    provider: P,
    endpoint: Option<P::Endpoint>,
}

impl<P: EndpointProvider> AudioSlot<P> {
    /// Create an empty slot backed by `provider`
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            endpoint: None,
        }
    }

    /// Return the open endpoint, opening it if the slot is empty
    pub fn ensure_open(&mut self) -> Result<&P::Endpoint, AudioError> {
        if self.endpoint.is_none() {
            let endpoint = self.provider.open()?;
            debug!("audio endpoint opened");
            self.endpoint = Some(endpoint);
        }

        self.endpoint.as_ref().ok_or(AudioError::NoDefaultEndpoint)
    }

    /// Drop the held endpoint, if any
    ///
    /// Returns `true` when a handle was actually released.
    pub fn release(&mut self) -> bool {
        match self.endpoint.take() {
            Some(endpoint) => {
                drop(endpoint);
                debug!("audio endpoint released");
                true
            }
            None => false,
        }
    }

    /// Check whether a handle is currently held
    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.endpoint.is_some()
    }

    #[cfg(test)]
    pub fn provider(&self) -> &P {
        &self.provider
    }
}
