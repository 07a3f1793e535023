//! sound-wheel: back-button + wheel chords as a system volume control
//!
//! This daemon provides:
//! - A global low-level mouse hook on a dedicated thread
//! - A gesture state machine deciding which mouse events are swallowed
//! - Fine (1%) volume steps through the audio endpoint, coarse steps
//!   through replayed volume keys
//! - Run-at-login registration
//!
//! Gestures:
//! - Hold back + scroll: step the volume
//! - Hold back + middle click: toggle fine/coarse steps

#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

// The gesture pipeline is only driven by the Windows hook backend
#[cfg_attr(not(windows), allow(dead_code))]
mod audio;
mod config;
#[cfg_attr(not(windows), allow(dead_code))]
mod events;
#[cfg_attr(not(windows), allow(dead_code))]
mod gesture;
mod hook;
#[cfg_attr(not(windows), allow(dead_code))]
mod keys;
mod lifecycle;
mod startup;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::config::Config;
use crate::events::GestureEvent;
use crate::hook::MouseHook;
use crate::lifecycle::ShutdownSignal;
use crate::startup::StartupRegistrar;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;

    // Initialize logging
    let log_dir = config.log_dir();
    lifecycle::init_logging(config.log_to_file.then_some(log_dir.as_path()))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "sound-wheel starting"
    );
    info!(?config.data_dir, mode = %config.initial_step, "configuration loaded");

    if config.run_at_login {
        startup::ensure_registered(registrar().as_ref());
    }

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Gesture machine -> main loop (for logging)
    let (event_tx, event_rx) = broadcast::channel::<GestureEvent>(64);

    // Install the hook; without it there is nothing to do
    let mut mouse_hook = MouseHook::new(config.initial_step, event_tx);
    mouse_hook
        .start()
        .context("failed to install global mouse hook")?;
    info!("mouse hook started");

    info!("daemon initialized, entering main loop");

    tokio::select! {
        count = events::log_events(event_rx) => {
            // Only happens if the hook thread exits on its own
            error!(
                events = count,
                hook_running = mouse_hook.is_running(),
                "gesture event stream closed"
            );
        }

        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(error = %e, "failed to listen for shutdown signals"),
            }
        }
    }

    // Cleanup
    info!("shutting down...");

    mouse_hook.stop();

    info!("sound-wheel stopped");

    Ok(())
}

#[cfg(windows)]
fn registrar() -> Box<dyn StartupRegistrar> {
    Box::new(startup::RunKeyRegistrar)
}

#[cfg(not(windows))]
fn registrar() -> Box<dyn StartupRegistrar> {
    Box::new(startup::UnsupportedRegistrar)
}
