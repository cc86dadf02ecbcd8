//! Steam installation root discovery.
//!
//! Windows asks the registry first (the same value the Steam client writes
//! at install time), then probes the conventional install directories.
//! Linux and macOS only have conventional directories. Candidate order is
//! significant: primary source → user-specific path → system-wide path.
//! Every lookup failure collapses to `None`; this module never errors.

use std::path::PathBuf;

use tracing::{debug, info};

/// Resolve the Steam installation root. Read-only; the first existing
/// candidate wins.
pub fn resolve() -> Option<PathBuf> {
    if let Some(root) = registry_path() {
        info!(path = %root.display(), "steam root found via registry");
        return Some(root);
    }

    for candidate in conventional_paths() {
        if candidate.exists() {
            info!(path = %candidate.display(), "steam root found at conventional path");
            return Some(candidate);
        }
    }

    debug!("steam root not found in any known location");
    None
}

/// `HKCU\Software\Valve\Steam\SteamPath` — the value Steam itself maintains.
#[cfg(windows)]
fn registry_path() -> Option<PathBuf> {
    use winreg::RegKey;
    use winreg::enums::HKEY_CURRENT_USER;

    let key = RegKey::predef(HKEY_CURRENT_USER)
        .open_subkey(r"Software\Valve\Steam")
        .ok()?;
    let value: String = key.get_value("SteamPath").ok()?;
    let path = PathBuf::from(value);
    path.exists().then_some(path)
}

#[cfg(not(windows))]
fn registry_path() -> Option<PathBuf> {
    None
}

#[cfg(windows)]
fn conventional_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(r"C:\Program Files (x86)\Steam"),
        PathBuf::from(r"C:\Program Files\Steam"),
    ];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join("Steam"));
    }
    paths
}

#[cfg(target_os = "macos")]
fn conventional_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join("Library/Application Support/Steam"));
    }
    paths.push(PathBuf::from("/Applications/Steam.app"));
    paths
}

#[cfg(all(unix, not(target_os = "macos")))]
fn conventional_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".steam/steam"));
        paths.push(home.join(".local/share/Steam"));
    }
    paths.push(PathBuf::from("/usr/share/steam"));
    paths
}
