//! Privilege checks and elevated relaunch.

use crate::bootstrap::{BootstrapError, ELEVATED_FLAG};

/// Whether this process already runs elevated.
///
/// True when launched with the elevation marker or, on Windows, when the
/// process token is elevated.
pub fn is_elevated(args: &[String]) -> bool {
    has_elevated_flag(args) || imp::process_token_elevated()
}

/// Whether `args` (program name excluded) carries the elevation marker.
pub fn has_elevated_flag(args: &[String]) -> bool {
    args.iter().any(|a| a == ELEVATED_FLAG)
}

/// Parameter string for the elevated relaunch: the marker followed by the
/// original arguments, quoted where they contain whitespace.
pub fn relaunch_parameters(args: &[String]) -> String {
    std::iter::once(ELEVATED_FLAG.to_string())
        .chain(
            args.iter()
                .filter(|a| a.as_str() != ELEVATED_FLAG)
                .map(|a| {
                    if a.is_empty() || a.chars().any(char::is_whitespace) {
                        format!("\"{}\"", a.replace('"', "\\\""))
                    } else {
                        a.clone()
                    }
                }),
        )
        .collect::<Vec<_>>()
        .join(" ")
}

/// Start a hidden elevated copy of the current executable.
///
/// Returns once the copy has been launched; the caller is expected to exit.
pub fn relaunch_elevated(args: &[String]) -> Result<(), BootstrapError> {
    imp::relaunch_elevated(&relaunch_parameters(args))
}

#[cfg(target_os = "windows")]
mod imp {
    use crate::bootstrap::BootstrapError;
    use std::ffi::c_void;
    use windows::core::HSTRING;
    use windows::Win32::Foundation::{CloseHandle, HANDLE, HWND};
    use windows::Win32::Security::{GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};
    use windows::Win32::UI::Shell::ShellExecuteW;
    use windows::Win32::UI::WindowsAndMessaging::SW_HIDE;

    pub fn process_token_elevated() -> bool {
        unsafe {
            let mut token = HANDLE::default();
            if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).is_err() {
                return false;
            }

            let mut elevation = TOKEN_ELEVATION::default();
            let mut returned = 0u32;
            let queried = GetTokenInformation(
                token,
                TokenElevation,
                Some(&mut elevation as *mut TOKEN_ELEVATION as *mut c_void),
                std::mem::size_of::<TOKEN_ELEVATION>() as u32,
                &mut returned,
            )
            .is_ok();
            let _ = CloseHandle(token);

            queried && elevation.TokenIsElevated != 0
        }
    }

    pub fn relaunch_elevated(parameters: &str) -> Result<(), BootstrapError> {
        let exe = std::env::current_exe()?;
        let cwd = std::env::current_dir()?;

        let instance = unsafe {
            ShellExecuteW(
                HWND::default(),
                &HSTRING::from("runas"),
                &HSTRING::from(exe.as_os_str()),
                &HSTRING::from(parameters),
                &HSTRING::from(cwd.as_os_str()),
                SW_HIDE,
            )
        };

        // ShellExecuteW reports success with a value greater than 32.
        let code = instance.0 as isize;
        if code <= 32 {
            return Err(BootstrapError::Elevation(format!(
                "ShellExecuteW returned {code}"
            )));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "windows"))]
mod imp {
    use crate::bootstrap::BootstrapError;

    pub fn process_token_elevated() -> bool {
        false
    }

    pub fn relaunch_elevated(_parameters: &str) -> Result<(), BootstrapError> {
        Err(BootstrapError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_elevated_flag_detection() {
        assert!(has_elevated_flag(&args(&["--elevated", "run"])));
        assert!(has_elevated_flag(&args(&["run", "--elevated"])));
        assert!(!has_elevated_flag(&args(&["run", "--endpoint", "http://x"])));
        assert!(is_elevated(&args(&["--elevated"])));
    }

    #[test]
    fn test_relaunch_parameters_forward_arguments() {
        assert_eq!(relaunch_parameters(&[]), "--elevated");
        assert_eq!(
            relaunch_parameters(&args(&["run", "--endpoint", "http://10.0.0.2/activity"])),
            "--elevated run --endpoint http://10.0.0.2/activity"
        );
    }

    #[test]
    fn test_relaunch_parameters_quote_and_dedupe() {
        assert_eq!(
            relaunch_parameters(&args(&["--elevated", "run", "--config", r"C:\My Files\cfg.json"])),
            r#"--elevated run --config "C:\My Files\cfg.json""#
        );
    }
}
