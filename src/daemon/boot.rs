//! Boot-time auto-start.

use crate::prefs::Preferences;
use crate::surface::LaunchPlan;

use super::service::{TrackerError, TrackerHandle};

/// Applies the launch plan when the daemon is started at login.
///
/// Starts the timer if `auto_start_timer` is set. The overlay needs a
/// terminal, so it is left to the next `watch` session.
///
/// # Errors
///
/// Returns an error if the tracker is gone.
pub async fn apply_boot_plan(
    tracker: &TrackerHandle,
    prefs: &Preferences,
) -> Result<LaunchPlan, TrackerError> {
    let plan = LaunchPlan::from_preferences(prefs);

    if plan.start_timer {
        tracker.start().await?;
        tracing::info!("Timer auto-started at boot");
    } else {
        tracing::debug!("Auto-start disabled");
    }

    if plan.open_overlay {
        tracing::info!("Overlay requested at boot, deferred to the next watch session");
    }

    Ok(plan)
}
