//! Run-at-logon registration.
//!
//! Windows uses the per-user `Run` registry key; Linux uses an XDG autostart
//! desktop entry. Other platforms report [`BootstrapError::Unsupported`].

use crate::bootstrap::BootstrapError;
use std::path::{Path, PathBuf};

/// Name of the registry value and desktop entry.
pub const ENTRY_NAME: &str = "ActivitySampler";

/// Absolute path of the running executable.
pub fn current_exe() -> Result<PathBuf, BootstrapError> {
    let exe = std::env::current_exe()?;
    Ok(exe.canonicalize().unwrap_or(exe))
}

/// Command line stored in the auto-start entry.
pub fn launch_command(exe: &Path) -> String {
    format!("\"{}\"", exe.display())
}

#[cfg(target_os = "windows")]
mod imp {
    use super::{launch_command, ENTRY_NAME};
    use crate::bootstrap::BootstrapError;
    use std::path::Path;
    use windows::core::{HSTRING, PCWSTR};
    use windows::Win32::Foundation::{
        ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_SUCCESS, WIN32_ERROR,
    };
    use windows::Win32::System::Registry::{
        RegCloseKey, RegCreateKeyExW, RegDeleteValueW, RegSetValueExW, HKEY, HKEY_CURRENT_USER,
        KEY_SET_VALUE, REG_OPTION_NON_VOLATILE, REG_SZ,
    };

    const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

    fn check(status: WIN32_ERROR, what: &str) -> Result<(), BootstrapError> {
        if status == ERROR_SUCCESS {
            Ok(())
        } else if status == ERROR_ACCESS_DENIED {
            Err(BootstrapError::AccessDenied(what.to_string()))
        } else {
            Err(BootstrapError::Os(format!("{what}: Win32 error {}", status.0)))
        }
    }

    /// `HKCU\...\Run` opened for writing, closed on drop.
    struct RunKey(HKEY);

    impl RunKey {
        fn open() -> Result<Self, BootstrapError> {
            let mut key = HKEY::default();
            let status = unsafe {
                RegCreateKeyExW(
                    HKEY_CURRENT_USER,
                    &HSTRING::from(RUN_KEY),
                    0,
                    PCWSTR::null(),
                    REG_OPTION_NON_VOLATILE,
                    KEY_SET_VALUE,
                    None,
                    &mut key,
                    None,
                )
            };
            check(status, "open HKCU Run key")?;
            Ok(Self(key))
        }
    }

    impl Drop for RunKey {
        fn drop(&mut self) {
            unsafe {
                let _ = RegCloseKey(self.0);
            }
        }
    }

    pub fn register(exe: &Path) -> Result<(), BootstrapError> {
        let key = RunKey::open()?;
        let data: Vec<u8> = launch_command(exe)
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        let status = unsafe {
            RegSetValueExW(key.0, &HSTRING::from(ENTRY_NAME), 0, REG_SZ, Some(&data))
        };
        check(status, "write Run value")
    }

    pub fn unregister() -> Result<(), BootstrapError> {
        let key = RunKey::open()?;
        let status = unsafe { RegDeleteValueW(key.0, &HSTRING::from(ENTRY_NAME)) };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(());
        }
        check(status, "delete Run value")
    }
}

#[cfg(target_os = "linux")]
mod imp {
    use super::{launch_command, ENTRY_NAME};
    use crate::bootstrap::BootstrapError;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    fn autostart_dir() -> Result<PathBuf, BootstrapError> {
        dirs::config_dir()
            .map(|d| d.join("autostart"))
            .ok_or_else(|| BootstrapError::Os("no XDG config directory".to_string()))
    }

    fn map_io(e: std::io::Error, path: &Path) -> BootstrapError {
        if e.kind() == ErrorKind::PermissionDenied {
            BootstrapError::AccessDenied(path.display().to_string())
        } else {
            BootstrapError::Io(e)
        }
    }

    /// XDG desktop entry launching `exe` at login.
    pub fn desktop_entry(exe: &Path) -> String {
        format!(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name={ENTRY_NAME}\n\
             Exec={}\n\
             X-GNOME-Autostart-enabled=true\n\
             NoDisplay=true\n",
            launch_command(exe)
        )
    }

    pub fn entry_path_in(dir: &Path) -> PathBuf {
        dir.join("activity-sampler.desktop")
    }

    pub fn register_in(dir: &Path, exe: &Path) -> Result<(), BootstrapError> {
        std::fs::create_dir_all(dir).map_err(|e| map_io(e, dir))?;
        let path = entry_path_in(dir);
        std::fs::write(&path, desktop_entry(exe)).map_err(|e| map_io(e, &path))
    }

    pub fn unregister_in(dir: &Path) -> Result<(), BootstrapError> {
        let path = entry_path_in(dir);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io(e, &path)),
        }
    }

    pub fn register(exe: &Path) -> Result<(), BootstrapError> {
        register_in(&autostart_dir()?, exe)
    }

    pub fn unregister() -> Result<(), BootstrapError> {
        unregister_in(&autostart_dir()?)
    }
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
mod imp {
    use crate::bootstrap::BootstrapError;
    use std::path::Path;

    pub fn register(_exe: &Path) -> Result<(), BootstrapError> {
        Err(BootstrapError::Unsupported)
    }

    pub fn unregister() -> Result<(), BootstrapError> {
        Err(BootstrapError::Unsupported)
    }
}

#[cfg(target_os = "linux")]
pub use imp::{desktop_entry, register_in, unregister_in};

/// Register `exe` to start when the current user logs in.
///
/// Fails with [`BootstrapError::AccessDenied`] when the host refuses the
/// write for lack of privileges.
pub fn register(exe: &Path) -> Result<(), BootstrapError> {
    imp::register(exe)
}

/// Remove the auto-start entry. Removing a missing entry succeeds.
pub fn unregister() -> Result<(), BootstrapError> {
    imp::unregister()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_command_is_quoted() {
        let exe = Path::new("/opt/activity sampler/activity-sampler");
        assert_eq!(
            launch_command(exe),
            "\"/opt/activity sampler/activity-sampler\""
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_desktop_entry_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let autostart = dir.path().join("autostart");
        let exe = Path::new("/usr/local/bin/activity-sampler");

        register_in(&autostart, exe).unwrap();
        let content =
            std::fs::read_to_string(autostart.join("activity-sampler.desktop")).unwrap();
        assert!(content.starts_with("[Desktop Entry]"));
        assert!(content.contains("Exec=\"/usr/local/bin/activity-sampler\""));
        assert!(content.contains("Name=ActivitySampler"));

        unregister_in(&autostart).unwrap();
        assert!(!autostart.join("activity-sampler.desktop").exists());
        // Removing again is not an error.
        unregister_in(&autostart).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_desktop_entry_fields() {
        let entry = desktop_entry(Path::new("/bin/sampler"));
        assert!(entry.contains("Type=Application"));
        assert!(entry.contains("NoDisplay=true"));
    }
}
