//! Launchctl command execution wrapper.

use std::path::Path;
use std::process::Command;

use super::error::{LaunchAgentError, Result};

/// Loads a LaunchAgent service.
///
/// Executes `launchctl load <plist_path>` to register the service with launchd.
///
/// # Errors
/// - If the launchctl command fails to execute
/// - If the service fails to load
pub fn load(plist_path: &Path) -> Result<()> {
    run("load", plist_path).map_err(|e| match e {
        Failure::Exec(e) => LaunchAgentError::LaunchctlExecution(e),
        Failure::Status(stderr) => LaunchAgentError::ServiceLoad(stderr),
    })?;

    tracing::debug!("launchctl load succeeded for {:?}", plist_path);
    Ok(())
}

/// Unloads a LaunchAgent service.
///
/// Executes `launchctl unload <plist_path>`. Fails if the service is not
/// loaded, so callers preparing a clean state ignore the error.
pub fn unload(plist_path: &Path) -> Result<()> {
    run("unload", plist_path).map_err(|e| match e {
        Failure::Exec(e) => LaunchAgentError::LaunchctlExecution(e),
        Failure::Status(stderr) => {
            tracing::debug!("launchctl unload failed (may be already unloaded): {}", stderr);
            LaunchAgentError::ServiceUnload(stderr)
        }
    })?;

    tracing::debug!("launchctl unload succeeded for {:?}", plist_path);
    Ok(())
}

enum Failure {
    Exec(std::io::Error),
    Status(String),
}

fn run(subcommand: &str, plist_path: &Path) -> std::result::Result<(), Failure> {
    let output = Command::new("launchctl")
        .arg(subcommand)
        .arg(plist_path)
        .output()
        .map_err(Failure::Exec)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Failure::Status(stderr.trim().to_string()));
    }
    Ok(())
}
