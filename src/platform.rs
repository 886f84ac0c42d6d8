//! Platform detection utilities
//!
//! Kairos was originally deployed under WSL2, where audio leaves the VM
//! through the WSLg PulseAudio bridge. These helpers let the speech layer
//! pick the right backend and socket without user configuration.

use std::fs;
use std::path::{Path, PathBuf};

/// WSLg exposes its PulseAudio server at a fixed path inside the VM
const WSLG_PULSE_PATH: &str = "/mnt/wslg/PulseServer";

/// Detect if running in WSL (Windows Subsystem for Linux)
///
/// Checks for WSL-specific indicators in /proc/version and environment variables.
pub fn is_wsl() -> bool {
    if let Ok(contents) = fs::read_to_string("/proc/version") {
        let lower = contents.to_lowercase();
        if lower.contains("microsoft") || lower.contains("wsl") {
            return true;
        }
    }

    std::env::var("WSL_DISTRO_NAME").is_ok()
}

/// Locate the WSLg PulseAudio server socket, if present
///
/// Returns `None` outside WSLg or when WSLg is not running. The espeak
/// backend exports this as `PULSE_SERVER` so the subprocess can reach
/// the Windows-side audio server.
pub fn wslg_pulse_server() -> Option<PathBuf> {
    let path = Path::new(WSLG_PULSE_PATH);
    if path.exists() {
        Some(path.to_path_buf())
    } else {
        None
    }
}
