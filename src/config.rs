//! Configuration loading and management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::gesture::StepMode;

/// Name of the optional settings file inside the data directory
pub const CONFIG_FILE: &str = "config.json";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for logs and the settings file
    pub data_dir: PathBuf,

    /// Register the daemon to start at login
    pub run_at_login: bool,

    /// Step mode the first chord starts in
    pub initial_step: StepMode,

    /// Also write logs to rolling files under `data_dir/logs`
    pub log_to_file: bool,
}

/// User-editable settings, every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    run_at_login: Option<bool>,
    initial_step: Option<StepMode>,
    log_to_file: Option<bool>,
}

impl Config {
    /// Load configuration from environment, settings file and defaults
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os("SOUND_WHEEL_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        Self::load_from(data_dir)
    }

    /// Load configuration rooted at an explicit data directory
    pub fn load_from(data_dir: PathBuf) -> Result<Self> {
        let settings = read_settings(&data_dir.join(CONFIG_FILE))?;

        Ok(Self {
            run_at_login: settings.run_at_login.unwrap_or(true),
            initial_step: settings.initial_step.unwrap_or_default(),
            log_to_file: settings.log_to_file.unwrap_or(true),
            data_dir,
        })
    }

    /// Directory for rolling log files
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(windows)]
fn default_data_dir() -> Result<PathBuf> {
    let app_data = std::env::var("APPDATA")?;
    Ok(PathBuf::from(app_data).join("sound-wheel"))
}

#[cfg(not(windows))]
fn default_data_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("sound-wheel"))
}

fn read_settings(path: &Path) -> Result<FileSettings> {
    match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text)
            .with_context(|| format!("invalid settings in {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileSettings::default()),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}
