//! Error types for LaunchAgent management.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// LaunchAgent management error type.
#[derive(Debug, Error)]
pub enum LaunchAgentError {
    /// The running executable could not be located.
    #[error("Cannot locate the stopwatch binary path: {0}")]
    BinaryPathResolution(#[source] io::Error),

    /// `~/Library/LaunchAgents` cannot be derived without a home directory.
    #[error("No home directory to install the LaunchAgent into")]
    HomeDirectoryNotFound,

    #[error("Cannot create {path:?}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write {path:?}: {source}")]
    PlistWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot remove {path:?}: {source}")]
    PlistRemove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Plist encoding failed: {0}")]
    PlistSerialize(#[source] plist::Error),

    #[error("Plist is not valid UTF-8: {0}")]
    PlistUtf8(#[source] std::string::FromUtf8Error),

    /// The plist mode could not be set to 0644.
    #[error("Cannot set plist permissions: {0}")]
    PermissionSet(#[source] io::Error),

    /// `launchctl` could not be spawned.
    #[error("Cannot run launchctl: {0}")]
    LaunchctlExecution(#[source] io::Error),

    /// `launchctl load` exited with an error; holds its stderr.
    #[error("launchctl load failed: {0}")]
    ServiceLoad(String),

    /// `launchctl unload` exited with an error; holds its stderr.
    #[error("launchctl unload failed: {0}")]
    ServiceUnload(String),
}

/// Result type for LaunchAgent operations.
pub type Result<T> = std::result::Result<T, LaunchAgentError>;
