//! Global mouse hook lifecycle
//!
//! Owns the dedicated hook thread. The thread builds the gesture machine,
//! installs the system-wide hook and pumps messages until asked to quit.
//! All event handling happens on that one thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::events::GestureEvent;
use crate::gesture::StepMode;

use super::platform;

/// Global mouse hook driving the gesture machine
pub struct MouseHook {
    initial_step: StepMode,
    /// Handed to the hook thread on start so the channel closes with it
    event_tx: Option<broadcast::Sender<GestureEvent>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    thread_id: u32,
}

impl MouseHook {
    /// Create a new mouse hook, not yet installed
    pub fn new(initial_step: StepMode, event_tx: broadcast::Sender<GestureEvent>) -> Self {
        Self {
            initial_step,
            event_tx: Some(event_tx),
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            thread_id: 0,
        }
    }

    /// Install the hook
    ///
    /// Spawns the hook thread and waits until the hook is either installed
    /// or has failed to install. No gesture can be observed before this
    /// returns `Ok`.
    pub fn start(&mut self) -> Result<(), HookError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HookError::AlreadyStarted);
        }
        let Some(event_tx) = self.event_tx.take() else {
            self.running.store(false, Ordering::SeqCst);
            return Err(HookError::AlreadyStarted);
        };

        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, HookError>>();
        let initial_step = self.initial_step;
        let running = Arc::clone(&self.running);

        let spawned = thread::Builder::new()
            .name("mouse-hook".to_string())
            .spawn(move || {
                info!("mouse hook thread started");

                let ready = ready_tx.clone();
                let result = platform::run(initial_step, event_tx, move |thread_id| {
                    let _ = ready.send(Ok(thread_id));
                });
                if let Err(e) = result {
                    error!(error = %e, "mouse hook error");
                    let _ = ready_tx.send(Err(e));
                }

                running.store(false, Ordering::SeqCst);
                info!("mouse hook thread stopped");
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(HookError::ThreadSpawn(e.to_string()));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                self.thread_id = thread_id;
                self.thread = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(HookError::ThreadExited)
            }
        }
    }

    /// Uninstall the hook and wait for the hook thread to finish
    ///
    /// The thread drops the gesture machine on its way out, which releases
    /// any held audio handle. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(handle) = self.thread.take() {
            platform::request_quit(self.thread_id);
            if handle.join().is_err() {
                warn!("mouse hook thread panicked");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the hook thread is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for MouseHook {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Errors that can occur installing or running the mouse hook
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("mouse hook has already been started")]
    AlreadyStarted,

    #[cfg(windows)]
    #[error("failed to install low-level mouse hook: {0}")]
    Install(String),

    #[cfg(windows)]
    #[error("failed to initialise COM on the hook thread: {0}")]
    Com(String),

    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(String),

    #[error("hook thread exited before reporting readiness")]
    ThreadExited,

    #[cfg(windows)]
    #[error("hook message loop failed")]
    MessageLoop,

    #[cfg(not(windows))]
    #[error("global mouse hooks are not supported on this platform")]
    Unsupported,
}
