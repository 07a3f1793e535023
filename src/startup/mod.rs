//! Run-at-login registration

#[cfg(windows)]
mod windows;

use tracing::{info, warn};

#[cfg(windows)]
pub use self::windows::RunKeyRegistrar;

/// Persists a "launch this program at login" flag
pub trait StartupRegistrar {
    fn is_enabled(&self) -> Result<bool, StartupError>;

    fn enable(&self) -> Result<(), StartupError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[cfg(windows)]
    #[error("registry access failed: {0}")]
    Registry(String),

    #[error("cannot resolve current executable: {0}")]
    Executable(#[from] std::io::Error),

    #[cfg(not(windows))]
    #[error("run at login is not supported on this platform")]
    Unsupported,
}

/// Registrar for platforms without an implementation
#[cfg(not(windows))]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedRegistrar;

#[cfg(not(windows))]
impl StartupRegistrar for UnsupportedRegistrar {
    fn is_enabled(&self) -> Result<bool, StartupError> {
        Err(StartupError::Unsupported)
    }

    fn enable(&self) -> Result<(), StartupError> {
        Err(StartupError::Unsupported)
    }
}

/// Enable run-at-login if it is not already on
///
/// Failures are logged and otherwise ignored; the daemon works without it.
/// Returns whether registration is in place afterwards.
pub fn ensure_registered<R: StartupRegistrar + ?Sized>(registrar: &R) -> bool {
    match registrar.is_enabled() {
        Ok(true) => {
            info!("run at login already registered");
            true
        }
        Ok(false) => match registrar.enable() {
            Ok(()) => {
                info!("registered to run at login");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to register run at login");
                false
            }
        },
        Err(e) => {
            warn!(error = %e, "cannot check run at login registration");
            false
        }
    }
}
