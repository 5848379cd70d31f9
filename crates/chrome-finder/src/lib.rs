//! # chrome-finder
//!
//! Locate a locally installed Chromium-family browser (Chrome, Chromium,
//! Edge) so that a headless automation library can launch it without the
//! user pointing at the executable by hand.
//!
//! ## How it works
//!
//! [`find_chrome`] walks an ordered candidate list and returns the first
//! path that exists:
//!
//! 1. `CHROME_PATH`: an explicit override, used when it names a file.
//! 2. Under WSL, the Windows installations reachable through `/mnt/c`.
//!    A Linux build of Chrome inside the distro is rarely present, while
//!    the host's Windows Chrome almost always is.
//! 3. The host platform's usual install locations.
//!
//! The resolved path is cached for the lifetime of the process.
//!
//! ## Platform support
//!
//! | OS      | Where we look                                             |
//! |---------|-----------------------------------------------------------|
//! | Linux   | `google-chrome-stable`, `chromium`, … on `PATH`, `/opt`   |
//! | WSL     | `/mnt/c/Program Files*/…/chrome.exe`, `msedge.exe`        |
//! | macOS   | `/Applications/*.app`, `~/Applications/*.app`             |
//! | Windows | `%ProgramFiles%`, `%ProgramFiles(x86)%`, `%LOCALAPPDATA%` |

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable naming an explicit browser executable.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by chrome-finder.
#[derive(Error, Debug)]
pub enum FinderError {
    /// No candidate location held an executable.
    #[error("No Chrome, Chromium or Edge installation found (searched {searched} locations).\nInstall one, or set {CHROME_PATH_ENV}=/path/to/chrome.")]
    NotFound { searched: usize },

    /// The current OS has no known install locations.
    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform { os: String },
}

// ── Platform detection ───────────────────────────────────────────────────────

/// The host flavour that decides which locations are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    /// Linux running under Windows Subsystem for Linux.
    Wsl,
    MacOs,
    Windows,
}

/// Detect the platform of the running process.
pub fn detect_platform() -> Result<Platform, FinderError> {
    match std::env::consts::OS {
        "linux" if is_wsl() => Ok(Platform::Wsl),
        "linux" | "freebsd" | "openbsd" | "netbsd" => Ok(Platform::Linux),
        "macos" => Ok(Platform::MacOs),
        "windows" => Ok(Platform::Windows),
        os => Err(FinderError::UnsupportedPlatform { os: os.to_string() }),
    }
}

/// Returns `true` when running inside WSL.
///
/// `WSL_DISTRO_NAME` is set by every WSL launcher; `/proc/version` catches
/// shells that scrubbed the environment.
pub fn is_wsl() -> bool {
    if std::env::var_os("WSL_DISTRO_NAME").is_some() {
        return true;
    }
    std::fs::read_to_string("/proc/version")
        .map(|v| kernel_is_wsl(&v))
        .unwrap_or(false)
}

fn kernel_is_wsl(proc_version: &str) -> bool {
    proc_version.to_ascii_lowercase().contains("microsoft")
}

// ── Candidate lists ──────────────────────────────────────────────────────────

const LINUX_EXECUTABLES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium-browser",
    "chromium",
    "microsoft-edge",
];

const LINUX_FIXED: &[&str] = &[
    "/opt/google/chrome/chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/snap/bin/chromium",
];

const WSL_FIXED: &[&str] = &[
    "/mnt/c/Program Files/Google/Chrome/Application/chrome.exe",
    "/mnt/c/Program Files (x86)/Google/Chrome/Application/chrome.exe",
    "/mnt/c/Program Files (x86)/Microsoft/Edge/Application/msedge.exe",
    "/mnt/c/Program Files/Microsoft/Edge/Application/msedge.exe",
];

const MAC_BUNDLES: &[&str] = &[
    "Google Chrome.app/Contents/MacOS/Google Chrome",
    "Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    "Chromium.app/Contents/MacOS/Chromium",
    "Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

const WINDOWS_SUFFIXES: &[&str] = &[
    r"Google\Chrome\Application\chrome.exe",
    r"Google\Chrome SxS\Application\chrome.exe",
    r"Chromium\Application\chrome.exe",
    r"Microsoft\Edge\Application\msedge.exe",
];

/// Ordered list of locations searched on `platform`, override excluded.
pub fn platform_candidates(platform: Platform) -> Vec<PathBuf> {
    match platform {
        Platform::Linux => {
            let mut out = Vec::new();
            if let Some(path_var) = std::env::var_os("PATH") {
                for dir in std::env::split_paths(&path_var) {
                    out.extend(LINUX_EXECUTABLES.iter().map(|exe| dir.join(exe)));
                }
            }
            out.extend(LINUX_FIXED.iter().map(PathBuf::from));
            out
        }
        Platform::Wsl => WSL_FIXED.iter().map(PathBuf::from).collect(),
        Platform::MacOs => {
            let mut roots = vec![PathBuf::from("/Applications")];
            if let Some(home) = dirs::home_dir() {
                roots.push(home.join("Applications"));
            }
            roots
                .iter()
                .flat_map(|root| MAC_BUNDLES.iter().map(move |b| root.join(b)))
                .collect()
        }
        Platform::Windows => {
            let roots: Vec<PathBuf> = ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"]
                .iter()
                .filter_map(|var| std::env::var_os(var).map(PathBuf::from))
                .collect();
            roots
                .iter()
                .flat_map(|root| WINDOWS_SUFFIXES.iter().map(move |s| root.join(s)))
                .collect()
        }
    }
}

/// Every location [`find_chrome`] would try, in order.
///
/// Useful for diagnostics when nothing was found.
pub fn candidates() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(p) = std::env::var_os(CHROME_PATH_ENV) {
        out.push(PathBuf::from(p));
    }
    if let Ok(platform) = detect_platform() {
        out.extend(platform_candidates(platform));
    }
    out
}

// ── Resolution ───────────────────────────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Find a browser executable, caching the answer for the process lifetime.
pub fn find_chrome() -> Result<PathBuf, FinderError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = resolve()?;
    // Ignore the race; both threads found the same file.
    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

fn resolve() -> Result<PathBuf, FinderError> {
    if let Some(p) = std::env::var_os(CHROME_PATH_ENV) {
        let p = PathBuf::from(p);
        if p.is_file() {
            return Ok(p);
        }
    }

    let platform = detect_platform()?;
    let list = platform_candidates(platform);
    first_existing(&list).ok_or(FinderError::NotFound {
        searched: list.len() + 1,
    })
}

/// First path in `list` that is an existing file.
pub fn first_existing(list: &[PathBuf]) -> Option<PathBuf> {
    list.iter().find(|p| is_executable_file(p)).cloned()
}

fn is_executable_file(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                // WSL mounts Windows binaries without the exec bit set.
                meta.permissions().mode() & 0o111 != 0
                    || path.extension().is_some_and(|e| e == "exe")
            }
            #[cfg(not(unix))]
            {
                true
            }
        }
        _ => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wsl_kernel_string_detected() {
        assert!(kernel_is_wsl(
            "Linux version 5.15.90.1-microsoft-standard-WSL2 (gcc ...)"
        ));
        assert!(kernel_is_wsl("Linux version 4.4.0-19041-Microsoft"));
        assert!(!kernel_is_wsl("Linux version 6.8.0-45-generic (buildd@lcy02)"));
    }

    #[test]
    fn wsl_candidates_point_into_windows_drive() {
        let list = platform_candidates(Platform::Wsl);
        assert!(!list.is_empty());
        assert!(list.iter().all(|p| p.starts_with("/mnt/c")));
    }

    #[test]
    fn mac_candidates_are_app_bundles() {
        let list = platform_candidates(Platform::MacOs);
        assert!(list.iter().all(|p| p.to_string_lossy().contains(".app/")));
        assert!(list[0].starts_with("/Applications"));
    }

    #[test]
    fn linux_candidates_end_with_fixed_paths() {
        let list = platform_candidates(Platform::Linux);
        assert_eq!(
            list.last().map(PathBuf::as_path),
            Some(Path::new("/snap/bin/chromium"))
        );
    }

    #[test]
    fn first_existing_skips_missing_and_directories() {
        let dir = std::env::temp_dir();
        let list = vec![
            PathBuf::from("/definitely/not/here/chrome"),
            dir.clone(),
        ];
        assert_eq!(first_existing(&list), None);
    }

    #[cfg(unix)]
    #[test]
    fn first_existing_requires_exec_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("chrome-finder-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let exe = dir.join("fake-chrome");
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();

        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert_eq!(first_existing(&[exe.clone()]), None);

        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(first_existing(&[exe.clone()]), Some(exe));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn not_found_message_mentions_override() {
        let e = FinderError::NotFound { searched: 7 };
        let msg = e.to_string();
        assert!(msg.contains("7 locations"), "got: {msg}");
        assert!(msg.contains(CHROME_PATH_ENV));
    }
}
