//! Plist structure definition and generation logic for LaunchAgent.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{LaunchAgentError, Result};
use crate::types::HOME_ENV;

/// LaunchAgent plist that runs `stopwatch daemon --boot` at login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopwatchLaunchAgent {
    /// Service label (reverse domain format)
    #[serde(rename = "Label")]
    pub label: String,

    /// Program to execute with its arguments
    #[serde(rename = "ProgramArguments")]
    pub program_arguments: Vec<String>,

    /// Whether to start at login
    #[serde(rename = "RunAtLoad")]
    pub run_at_load: bool,

    /// Whether to automatically restart if the process terminates
    #[serde(rename = "KeepAlive")]
    pub keep_alive: bool,

    /// Path to stdout log file
    #[serde(rename = "StandardOutPath")]
    pub standard_out_path: String,

    /// Path to stderr log file
    #[serde(rename = "StandardErrorPath")]
    pub standard_error_path: String,

    /// Environment variables (optional)
    #[serde(
        rename = "EnvironmentVariables",
        skip_serializing_if = "Option::is_none"
    )]
    pub environment_variables: Option<BTreeMap<String, String>>,
}

impl StopwatchLaunchAgent {
    /// The service label for the stopwatch LaunchAgent.
    pub const LABEL: &'static str = "com.example.stopwatch";

    /// Creates the configuration for `binary_path`, logging into `log_dir`.
    pub fn new(binary_path: impl Into<String>, log_dir: &Path) -> Self {
        Self {
            label: Self::LABEL.to_string(),
            program_arguments: vec![
                binary_path.into(),
                "daemon".to_string(),
                "--boot".to_string(),
            ],
            run_at_load: true,
            keep_alive: true,
            standard_out_path: log_dir.join("stdout.log").to_string_lossy().into_owned(),
            standard_error_path: log_dir.join("stderr.log").to_string_lossy().into_owned(),
            environment_variables: None,
        }
    }

    /// Pins the daemon to a non-default runtime directory.
    pub fn with_home(self, home: &Path) -> Self {
        self.with_env(HOME_ENV, home.to_string_lossy())
    }

    /// Adds an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Generates the plist XML string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_xml(&self) -> Result<String> {
        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, self).map_err(LaunchAgentError::PlistSerialize)?;
        String::from_utf8(buf).map_err(LaunchAgentError::PlistUtf8)
    }
}
