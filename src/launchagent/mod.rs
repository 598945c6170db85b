//! LaunchAgent management module for macOS.
//!
//! Installs the stopwatch daemon as a LaunchAgent running
//! `stopwatch daemon --boot`, so the auto-start preference is applied at
//! login.
//!
//! # Example
//!
//! ```no_run
//! use stopwatch::launchagent;
//! use stopwatch::types::AppPaths;
//!
//! let paths = AppPaths::resolve(None).expect("home directory");
//! let plist = launchagent::install(&paths)?;
//! println!("installed at {:?}", plist);
//!
//! launchagent::uninstall()?;
//! # Ok::<(), launchagent::LaunchAgentError>(())
//! ```

pub mod error;
pub mod launchctl;
pub mod plist;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::types::AppPaths;

pub use error::{LaunchAgentError, Result};
pub use plist::StopwatchLaunchAgent;

/// Returns `~/Library/LaunchAgents/com.example.stopwatch.plist`.
///
/// # Errors
/// Returns an error if the home directory cannot be determined.
pub fn plist_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or(LaunchAgentError::HomeDirectoryNotFound)?;
    Ok(home_dir.join(format!(
        "Library/LaunchAgents/{}.plist",
        StopwatchLaunchAgent::LABEL
    )))
}

/// Checks if the LaunchAgent plist file is installed.
pub fn is_installed() -> bool {
    plist_path().map(|path| path.exists()).unwrap_or(false)
}

/// Installs and loads the LaunchAgent for the daemon at `paths`.
///
/// Reinstalling replaces the previous plist. Returns the plist path.
///
/// # Errors
/// Returns an error if:
/// - The binary path cannot be resolved
/// - The home directory cannot be determined
/// - Directory creation or file writing fails
/// - launchctl fails to load the service
pub fn install(paths: &AppPaths) -> Result<PathBuf> {
    let binary_path = std::env::current_exe().map_err(LaunchAgentError::BinaryPathResolution)?;

    let log_dir = paths.log_dir();
    create_dir(&log_dir)?;

    let agent = StopwatchLaunchAgent::new(binary_path.to_string_lossy(), &log_dir)
        .with_home(paths.root());

    let plist_path = plist_path()?;
    write_plist(&agent, &plist_path)?;

    // A previous install may still be loaded.
    let _ = launchctl::unload(&plist_path);
    launchctl::load(&plist_path)?;

    tracing::info!("LaunchAgent installed successfully at {:?}", plist_path);
    Ok(plist_path)
}

/// Unloads and removes the LaunchAgent.
///
/// Returns `false` if nothing was installed.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or the plist
/// cannot be removed.
pub fn uninstall() -> Result<bool> {
    let plist_path = plist_path()?;

    if !plist_path.exists() {
        tracing::info!("LaunchAgent plist file does not exist, nothing to uninstall");
        return Ok(false);
    }

    // May already be unloaded.
    let _ = launchctl::unload(&plist_path);

    fs::remove_file(&plist_path).map_err(|source| LaunchAgentError::PlistRemove {
        path: plist_path.clone(),
        source,
    })?;

    tracing::info!("LaunchAgent uninstalled successfully");
    Ok(true)
}

/// Writes the plist with mode 0644, creating the parent directory.
fn write_plist(agent: &StopwatchLaunchAgent, plist_path: &Path) -> Result<()> {
    if let Some(parent) = plist_path.parent() {
        create_dir(parent)?;
    }

    fs::write(plist_path, agent.to_xml()?).map_err(|source| LaunchAgentError::PlistWrite {
        path: plist_path.to_path_buf(),
        source,
    })?;

    let mut perms = fs::metadata(plist_path)
        .map_err(LaunchAgentError::PermissionSet)?
        .permissions();
    perms.set_mode(0o644);
    fs::set_permissions(plist_path, perms).map_err(LaunchAgentError::PermissionSet)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| LaunchAgentError::DirectoryCreation {
        path: path.to_path_buf(),
        source,
    })
}
