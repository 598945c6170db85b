//! Display surfaces for the stopwatch.
//!
//! - `status`: persistent status line fed by the tracker (daemon side)
//! - `panel`: main view with start/pause/stop controls
//! - `overlay`: compact floating readout at a saved position
//! - `launch`: start-up policy derived from preferences
//!
//! Panel and overlay are observers only. They render the last update they
//! received and request every change from the tracker.

pub mod launch;
pub mod overlay;
pub mod panel;
pub mod status;

pub use launch::{mark_first_run, LaunchPlan};
pub use overlay::FloatingOverlay;
pub use panel::{PanelInput, PanelState, PauseLabel};
pub use status::{
    ChannelStatusSurface, MockStatusSurface, StatusFileWriter, StatusLine, StatusSurface,
    StatusUpdate,
};
