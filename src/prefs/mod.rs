//! Flat key/value preference store shared by the daemon and the CLI.
//!
//! Each key lives in its own file holding a single JSON value, so writers in
//! different processes touching different keys never interfere. Writes go
//! through a temp file and a rename; the last write wins. Reads fall back to
//! the key's default when the file is missing or unreadable.
//!
//! # Example
//!
//! ```no_run
//! use stopwatch::prefs::{PrefKey, PreferenceStore};
//!
//! let store = PreferenceStore::open("/tmp/stopwatch/prefs")?;
//! store.set_bool(PrefKey::AutoStartTimer, true)?;
//! assert!(store.load().auto_start_timer());
//! # Ok::<(), stopwatch::prefs::PrefsError>(())
//! ```

pub mod error;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

pub use error::{PrefsError, Result};

/// Default overlay column.
pub const DEFAULT_WINDOW_X: i64 = 0;

/// Default overlay row.
pub const DEFAULT_WINDOW_Y: i64 = 100;

// ============================================================================
// PrefKey
// ============================================================================

/// Known preference keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKey {
    /// Start the timer when a surface opens or the daemon boots
    AutoStartTimer,
    /// Open the floating overlay instead of the panel when auto-starting
    AutoMinimize,
    /// Overlay column
    WindowX,
    /// Overlay row
    WindowY,
    /// Elapsed time recorded when the daemon was torn down while running
    LastElapsedTime,
    /// Whether the panel has never been opened
    FirstRun,
}

impl PrefKey {
    /// Every key, in display order.
    pub const ALL: [PrefKey; 6] = [
        PrefKey::AutoStartTimer,
        PrefKey::AutoMinimize,
        PrefKey::WindowX,
        PrefKey::WindowY,
        PrefKey::LastElapsedTime,
        PrefKey::FirstRun,
    ];

    /// Returns the stored key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefKey::AutoStartTimer => "auto_start_timer",
            PrefKey::AutoMinimize => "auto_minimize",
            PrefKey::WindowX => "window_x",
            PrefKey::WindowY => "window_y",
            PrefKey::LastElapsedTime => "last_elapsed_time",
            PrefKey::FirstRun => "first_run",
        }
    }
}

// ============================================================================
// Preferences
// ============================================================================

/// Snapshot of every preference, with defaults applied on access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    values: Vec<(PrefKey, Value)>,
}

impl Preferences {
    fn get(&self, key: PrefKey) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| value)
    }

    /// Reads a boolean, falling back to `default`.
    pub fn bool(&self, key: PrefKey, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Reads an integer, falling back to `default`.
    pub fn int(&self, key: PrefKey, default: i64) -> i64 {
        self.get(key).and_then(Value::as_i64).unwrap_or(default)
    }

    /// Whether the timer starts automatically.
    pub fn auto_start_timer(&self) -> bool {
        self.bool(PrefKey::AutoStartTimer, false)
    }

    /// Whether auto-start opens the overlay.
    pub fn auto_minimize(&self) -> bool {
        self.bool(PrefKey::AutoMinimize, false)
    }

    /// Saved overlay position as `(x, y)`.
    pub fn window_position(&self) -> (i64, i64) {
        (
            self.int(PrefKey::WindowX, DEFAULT_WINDOW_X),
            self.int(PrefKey::WindowY, DEFAULT_WINDOW_Y),
        )
    }

    /// Elapsed milliseconds recorded at the last teardown, if any.
    pub fn last_elapsed_time(&self) -> Option<i64> {
        self.get(PrefKey::LastElapsedTime).and_then(Value::as_i64)
    }

    /// Whether the panel has never been opened.
    pub fn first_run(&self) -> bool {
        self.bool(PrefKey::FirstRun, true)
    }
}

// ============================================================================
// PreferenceStore
// ============================================================================

/// File-backed preference store.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    dir: PathBuf,
}

impl PreferenceStore {
    /// Opens the store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| PrefsError::DirectoryCreation {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Returns the store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: PrefKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    /// Reads a single raw value.
    ///
    /// Returns `Ok(None)` when the key has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn get(&self, key: PrefKey) -> Result<Option<Value>> {
        let raw = match fs::read_to_string(self.key_path(key)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PrefsError::Read {
                    key: key.as_str(),
                    source,
                })
            }
        };

        match serde_json::from_str(raw.trim()) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = key.as_str(), error = %e, "Ignoring corrupt preference");
                Ok(None)
            }
        }
    }

    /// Loads a snapshot of every known key.
    ///
    /// Unreadable keys are logged and treated as absent.
    pub fn load(&self) -> Preferences {
        let mut values = Vec::new();
        for key in PrefKey::ALL {
            match self.get(key) {
                Ok(Some(value)) => values.push((key, value)),
                Ok(None) => {}
                Err(e) => tracing::warn!("{}", e),
            }
        }
        Preferences { values }
    }

    /// Writes a raw value for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn set(&self, key: PrefKey, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let json = serde_json::to_string(&value).map_err(|source| PrefsError::Serialize {
            key: key.as_str(),
            source,
        })?;

        let path = self.key_path(key);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", key.as_str(), std::process::id()));
        let write_err = |source: io::Error| PrefsError::Write {
            key: key.as_str(),
            source,
        };
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &path).map_err(write_err)?;

        tracing::debug!(key = key.as_str(), value = %value, "Preference saved");
        Ok(())
    }

    /// Writes a boolean preference.
    pub fn set_bool(&self, key: PrefKey, value: bool) -> Result<()> {
        self.set(key, value)
    }

    /// Writes an integer preference.
    pub fn set_int(&self, key: PrefKey, value: i64) -> Result<()> {
        self.set(key, value)
    }
}

// ============================================================================
// Tests
// ============================================================================
