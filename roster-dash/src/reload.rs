//! Full roster reloads
//!
//! Used at startup, after edits and deletions, when a refresh wait times
//! out, and on the background interval. A failed reload leaves the current
//! snapshot in place.

use std::sync::Arc;
use std::time::Duration;

use roster_common::events::{AdoptOrigin, NoticeLevel};
use roster_common::Result;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::backend::RosterBackend;
use crate::state::SharedState;

/// Fetch the roster and adopt it. Returns the adopted record count.
///
/// Failures are logged and surfaced as an error notice before being returned.
pub async fn reload_roster(state: &SharedState, backend: &dyn RosterBackend) -> Result<usize> {
    match backend.fetch_artists().await {
        Ok(records) => {
            let count = records.len();
            let pruned = state.adopt(records, AdoptOrigin::Reload).await;
            info!(
                records = count,
                pruned_selections = pruned,
                "Roster reloaded"
            );
            Ok(count)
        }
        Err(e) => {
            error!("Roster reload failed: {}", e);
            state
                .events
                .notify(NoticeLevel::Error, format!("Error loading artists: {}", e));
            Err(e)
        }
    }
}

/// Reload on a fixed interval until the task is aborted
///
/// The first tick fires immediately. Missed ticks are skipped rather than
/// bunched up behind a slow backend.
pub fn spawn_auto_reload(
    state: Arc<SharedState>,
    backend: Arc<dyn RosterBackend>,
    period: Duration,
) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), "Starting auto reload");

    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            debug!("Auto reload tick");
            // Failure already reported; keep serving the loaded data
            let _ = reload_roster(&state, backend.as_ref()).await;
        }
    })
}
