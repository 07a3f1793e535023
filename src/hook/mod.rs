//! Hook module for global mouse interception
//!
//! Installs a system-wide low-level mouse hook on a dedicated thread and
//! routes each event through the gesture machine, which decides whether
//! the event is swallowed or forwarded.

#[cfg_attr(not(windows), allow(dead_code))]
mod dispatch;
mod listener;
#[cfg_attr(not(windows), allow(dead_code))]
mod raw;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use self::windows as platform;

#[cfg(not(windows))]
mod unsupported;
#[cfg(not(windows))]
use self::unsupported as platform;

pub use listener::{HookError, MouseHook};
