//! `HKCU\...\Run` registry value registrar

use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, WIN32_ERROR};
use windows::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY,
    HKEY_CURRENT_USER, KEY_QUERY_VALUE, KEY_SET_VALUE, REG_OPTION_NON_VOLATILE, REG_SZ,
};

use super::{StartupError, StartupRegistrar};

const RUN_KEY: PCWSTR = w!("SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Run");
const VALUE_NAME: PCWSTR = w!("SoundWheel");

/// Registers the current executable under the per-user Run key
#[derive(Debug, Default, Clone, Copy)]
pub struct RunKeyRegistrar;

impl StartupRegistrar for RunKeyRegistrar {
    fn is_enabled(&self) -> Result<bool, StartupError> {
        // A fresh profile may not have a Run key at all
        let Some(key) = RunKey::open_existing()? else {
            return Ok(false);
        };
        presence(unsafe { RegQueryValueExW(key.0, VALUE_NAME, None, None, None, None) })
    }

    fn enable(&self) -> Result<(), StartupError> {
        let exe = std::env::current_exe()?;
        let quoted = format!("\"{}\"", exe.display());
        let data: Vec<u8> = quoted
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect();

        let key = RunKey::create()?;
        check(unsafe { RegSetValueExW(key.0, VALUE_NAME, 0, REG_SZ, Some(&data)) })
    }
}

struct RunKey(HKEY);

impl RunKey {
    /// Open the Run key for reading, `None` if it does not exist
    fn open_existing() -> Result<Option<Self>, StartupError> {
        let mut key = HKEY::default();
        let status =
            unsafe { RegOpenKeyExW(HKEY_CURRENT_USER, RUN_KEY, 0, KEY_QUERY_VALUE, &mut key) };
        if presence(status)? {
            Ok(Some(Self(key)))
        } else {
            Ok(None)
        }
    }

    /// Open the Run key for writing, creating it if needed
    fn create() -> Result<Self, StartupError> {
        let mut key = HKEY::default();
        check(unsafe {
            RegCreateKeyExW(
                HKEY_CURRENT_USER,
                RUN_KEY,
                0,
                PCWSTR::null(),
                REG_OPTION_NON_VOLATILE,
                KEY_SET_VALUE,
                None,
                &mut key,
                None,
            )
        })?;
        Ok(Self(key))
    }
}

impl Drop for RunKey {
    fn drop(&mut self) {
        let _ = unsafe { RegCloseKey(self.0) };
    }
}

fn check(status: WIN32_ERROR) -> Result<(), StartupError> {
    status
        .ok()
        .map_err(|e| StartupError::Registry(e.to_string()))
}

/// Map a key or value lookup status to whether it exists
fn presence(status: WIN32_ERROR) -> Result<bool, StartupError> {
    match status {
        ERROR_FILE_NOT_FOUND => Ok(false),
        status => check(status).map(|()| true),
    }
}
