//! Refresh reconciliation
//!
//! `RefreshJob` is the pure polling state machine; `RefreshCoordinator`
//! fires the backend requests and drives jobs on tokio timers.

mod coordinator;
mod job;

pub use coordinator::{JobProgress, RefreshCoordinator, RefreshHandle};
pub use job::{JobState, RefreshJob};
