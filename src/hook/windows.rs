//! `WH_MOUSE_LL` backend
//!
//! The hook procedure is a plain C callback, so the gesture machine lives
//! in a thread-local slot on the hook thread. Windows calls the procedure
//! on that same thread from inside `GetMessageW`.

use std::cell::RefCell;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HHOOK, MSG, MSLLHOOKSTRUCT,
    PM_NOREMOVE, WH_MOUSE_LL, WM_QUIT,
};

use crate::audio::CoreAudioProvider;
use crate::events::GestureEvent;
use crate::gesture::{Decision, GestureHandler, GestureMachine, StepMode};
use crate::keys::SendInputKeys;

use super::dispatch::dispatch;
use super::raw::RawMouseEvent;
use super::HookError;

thread_local! {
    static HANDLER: RefCell<Option<Box<dyn GestureHandler>>> = const { RefCell::new(None) };
}

/// Build the machine, install the hook and pump messages until `WM_QUIT`
pub fn run(
    initial_step: StepMode,
    event_tx: broadcast::Sender<GestureEvent>,
    on_ready: impl FnOnce(u32),
) -> Result<(), HookError> {
    // Guards drop in reverse order: unhook, then the machine, then COM
    let _com = ComApartment::init()?;

    let machine = GestureMachine::new(CoreAudioProvider, SendInputKeys, initial_step, event_tx);
    let _handler = HandlerSlot::fill(Box::new(machine));

    let hook = InstalledHook::install()?;

    // Make sure the thread has a message queue before anyone posts to it
    let mut msg = MSG::default();
    unsafe {
        let _ = PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_NOREMOVE);
    }

    let thread_id = unsafe { GetCurrentThreadId() };
    info!(thread_id, "low-level mouse hook installed");
    on_ready(thread_id);

    loop {
        let result = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };
        match result.0 {
            -1 => return Err(HookError::MessageLoop),
            0 => break,
            _ => unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            },
        }
    }

    debug!("hook message loop exited");
    drop(hook);
    Ok(())
}

/// Ask the hook thread's message loop to exit
pub fn request_quit(thread_id: u32) {
    if let Err(e) = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
        warn!(error = %e, "failed to post quit to hook thread");
    }
}

unsafe extern "system" fn mouse_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
        let raw = RawMouseEvent::new(wparam.0 as u32, info.mouseData, info.dwExtraInfo);

        let decision = HANDLER.with(|slot| match slot.try_borrow_mut() {
            Ok(mut guard) => match guard.as_mut() {
                Some(handler) => dispatch(&mut **handler, &raw),
                None => Decision::PassThrough,
            },
            // Re-entered from inside our own handler
            Err(_) => Decision::PassThrough,
        });

        if decision.is_suppress() {
            return LRESULT(1);
        }
    }

    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}

struct ComApartment;

impl ComApartment {
    fn init() -> Result<Self, HookError> {
        unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }
            .ok()
            .map_err(|e| HookError::Com(e.to_string()))?;
        Ok(Self)
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        unsafe { CoUninitialize() };
    }
}

/// Owns the thread-local handler for the lifetime of the hook thread
struct HandlerSlot;

impl HandlerSlot {
    fn fill(handler: Box<dyn GestureHandler>) -> Self {
        HANDLER.with(|slot| *slot.borrow_mut() = Some(handler));
        Self
    }
}

impl Drop for HandlerSlot {
    fn drop(&mut self) {
        let handler = HANDLER.with(|slot| slot.borrow_mut().take());
        drop(handler);
        debug!("gesture machine dropped");
    }
}

struct InstalledHook(HHOOK);

impl InstalledHook {
    fn install() -> Result<Self, HookError> {
        let module = unsafe { GetModuleHandleW(PCWSTR::null()) }
            .map_err(|e| HookError::Install(e.to_string()))?;
        let hook = unsafe {
            SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_proc), HINSTANCE(module.0), 0)
        }
        .map_err(|e| HookError::Install(e.to_string()))?;
        Ok(Self(hook))
    }
}

impl Drop for InstalledHook {
    fn drop(&mut self) {
        // Best effort: nothing useful can be done if this fails at exit
        match unsafe { UnhookWindowsHookEx(self.0) } {
            Ok(()) => info!("low-level mouse hook removed"),
            Err(e) => warn!(error = %e, "failed to remove mouse hook"),
        }
    }
}
