//! Windows implementation of the host sensor using Win32 APIs.
//!
//! Foreground window and title come from `user32`, idle time from
//! `GetLastInputInfo`, and process metadata from a limited-information
//! process handle so that elevated processes can still be named.

use crate::sensor::types::{format_extra_info, ProcessIdentity, Sensor, SensorError, WindowHandle};
use std::ffi::c_void;
use std::path::Path;
use windows::Wdk::System::Threading::{NtQueryInformationProcess, PROCESSINFOCLASS};
use windows::Win32::Foundation::{CloseHandle, HANDLE, HWND, RECT, UNICODE_STRING};
use windows::Win32::Graphics::Gdi::{
    GetMonitorInfoW, MonitorFromWindow, MONITORINFO, MONITOR_DEFAULTTONEAREST,
};
use windows::Win32::System::SystemInformation::GetTickCount;
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO};
use windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId,
};

/// `ProcessCommandLineInformation`, available since Windows 8.1.
const PROCESS_COMMAND_LINE_INFORMATION: PROCESSINFOCLASS = PROCESSINFOCLASS(60);

/// Sensor backed by the interactive Win32 desktop.
#[derive(Debug, Default)]
pub struct WindowsSensor;

impl WindowsSensor {
    pub fn new() -> Self {
        Self
    }
}

fn to_hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as usize as *mut c_void)
}

/// Process handle closed on drop.
struct OwnedProcess(HANDLE);

impl OwnedProcess {
    fn open(pid: u32) -> Result<Self, SensorError> {
        unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }
            .map(Self)
            .map_err(|e| SensorError::ProcessLookup {
                pid,
                reason: e.message().to_string(),
            })
    }

    fn image_path(&self) -> Option<String> {
        let mut buf = vec![0u16; 1024];
        let mut len = buf.len() as u32;
        unsafe {
            QueryFullProcessImageNameW(
                self.0,
                PROCESS_NAME_WIN32,
                windows::core::PWSTR(buf.as_mut_ptr()),
                &mut len,
            )
        }
        .ok()?;
        Some(String::from_utf16_lossy(&buf[..len as usize]))
    }

    fn command_line(&self) -> Option<String> {
        let mut needed = 0u32;
        // The first call only reports the buffer size.
        let _ = unsafe {
            NtQueryInformationProcess(
                self.0,
                PROCESS_COMMAND_LINE_INFORMATION,
                std::ptr::null_mut(),
                0,
                &mut needed,
            )
        };
        if (needed as usize) < std::mem::size_of::<UNICODE_STRING>() {
            return None;
        }

        // u64 backing keeps the UNICODE_STRING header aligned.
        let mut buf = vec![0u64; (needed as usize + 7) / 8];
        let status = unsafe {
            NtQueryInformationProcess(
                self.0,
                PROCESS_COMMAND_LINE_INFORMATION,
                buf.as_mut_ptr() as *mut c_void,
                needed,
                &mut needed,
            )
        };
        if status.is_err() {
            return None;
        }

        let header = unsafe { &*(buf.as_ptr() as *const UNICODE_STRING) };
        if header.Buffer.is_null() || header.Length == 0 {
            return None;
        }
        let chars = unsafe {
            std::slice::from_raw_parts(header.Buffer.0, header.Length as usize / 2)
        };
        Some(String::from_utf16_lossy(chars))
    }
}

impl Drop for OwnedProcess {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

impl Sensor for WindowsSensor {
    fn foreground_window(&self) -> Result<WindowHandle, SensorError> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0.is_null() {
            return Err(SensorError::NoForegroundWindow);
        }
        Ok(WindowHandle(hwnd.0 as usize as u64))
    }

    fn foreground_process(&self, window: WindowHandle) -> Result<ProcessIdentity, SensorError> {
        let mut pid = 0u32;
        unsafe { GetWindowThreadProcessId(to_hwnd(window), Some(&mut pid as *mut u32)) };
        if pid == 0 {
            return Err(SensorError::ProcessLookup {
                pid: 0,
                reason: "window has no owning process".to_string(),
            });
        }

        let process = OwnedProcess::open(pid)?;
        let path = process.image_path().ok_or_else(|| SensorError::ProcessLookup {
            pid,
            reason: "image name unavailable".to_string(),
        })?;
        let name = Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(path);

        Ok(ProcessIdentity { name, pid })
    }

    fn window_title(&self, window: WindowHandle) -> Result<String, SensorError> {
        let hwnd = to_hwnd(window);
        let length = unsafe { GetWindowTextLengthW(hwnd) };
        if length <= 0 {
            return Ok(String::new());
        }

        let mut buf = vec![0u16; length as usize + 1];
        let copied = unsafe { GetWindowTextW(hwnd, &mut buf) };
        Ok(String::from_utf16_lossy(&buf[..copied.max(0) as usize]))
    }

    fn idle_seconds(&self) -> Result<u64, SensorError> {
        let mut info = LASTINPUTINFO {
            cbSize: std::mem::size_of::<LASTINPUTINFO>() as u32,
            dwTime: 0,
        };
        if !unsafe { GetLastInputInfo(&mut info) }.as_bool() {
            return Err(SensorError::InputInfoUnavailable(
                windows::core::Error::from_win32().message().to_string(),
            ));
        }

        // Both counters wrap after ~49 days; wrapping_sub keeps the delta right.
        let now = unsafe { GetTickCount() };
        Ok(u64::from(now.wrapping_sub(info.dwTime) / 1000))
    }

    fn is_fullscreen(&self, window: WindowHandle) -> bool {
        let hwnd = to_hwnd(window);
        let mut rect = RECT::default();
        if unsafe { GetWindowRect(hwnd, &mut rect) }.is_err() {
            return false;
        }

        let monitor = unsafe { MonitorFromWindow(hwnd, MONITOR_DEFAULTTONEAREST) };
        if monitor.0.is_null() {
            return false;
        }
        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
            return false;
        }

        let screen = info.rcMonitor;
        rect.left == screen.left
            && rect.top == screen.top
            && rect.right == screen.right
            && rect.bottom == screen.bottom
    }

    fn extra_info(&self, pid: u32) -> String {
        match OwnedProcess::open(pid) {
            Ok(process) => format_extra_info(
                process.image_path().as_deref(),
                process.command_line().as_deref(),
            ),
            Err(_) => String::new(),
        }
    }
}
