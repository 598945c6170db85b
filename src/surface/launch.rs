//! Start-up policy shared by the panel and the boot path.

use crate::prefs::{self, PrefKey, PreferenceStore, Preferences};

/// What to do when a surface opens or the daemon boots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaunchPlan {
    /// Start the timer immediately
    pub start_timer: bool,
    /// Show the floating overlay instead of the panel
    pub open_overlay: bool,
}

impl LaunchPlan {
    /// Derives the plan from saved preferences.
    ///
    /// The overlay is only opened on its own when the timer is auto-started.
    pub fn from_preferences(prefs: &Preferences) -> Self {
        let start_timer = prefs.auto_start_timer();
        Self {
            start_timer,
            open_overlay: start_timer && prefs.auto_minimize(),
        }
    }
}

/// Clears the first-run flag.
///
/// Returns `true` if this was the first run.
///
/// # Errors
///
/// Returns an error if the flag cannot be written.
pub fn mark_first_run(store: &PreferenceStore) -> prefs::Result<bool> {
    if !store.load().first_run() {
        return Ok(false);
    }
    store.set_bool(PrefKey::FirstRun, false)?;
    Ok(true)
}
