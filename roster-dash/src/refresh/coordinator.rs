//! RefreshCoordinator: fires refresh requests and polls for their effects
//!
//! Each job runs in its own task with its own baselines, completion set
//! and deadline, so concurrent jobs never interfere. Trigger requests are
//! fire-and-forget; a failed trigger is only logged and the job simply
//! times out for that target.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use roster_common::events::{AdoptOrigin, DashEvent, NoticeLevel, RefreshOutcome};
use roster_common::{Error, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::job::{JobState, RefreshJob};
use crate::backend::RosterBackend;
use crate::columns::RefreshSource;
use crate::reload::reload_roster;
use crate::state::SharedState;

/// Notice shown when a job gives up waiting
const TIMEOUT_NOTICE: &str = "Refresh taking longer than expected. Check back later.";

/// Snapshot of a job published after every tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub state: JobState,
    pub completed: usize,
    pub targets: usize,
    pub ticks: u32,
}

impl JobProgress {
    fn of(job: &RefreshJob) -> Self {
        Self {
            state: job.state(),
            completed: job.completed_count(),
            targets: job.targets().len(),
            ticks: job.ticks(),
        }
    }
}

/// Handle to a running job
///
/// Dropping the handle does not stop polling.
#[derive(Debug)]
pub struct RefreshHandle {
    job_id: Uuid,
    progress: watch::Receiver<JobProgress>,
    task: JoinHandle<RefreshOutcome>,
}

impl RefreshHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Latest published progress
    pub fn progress(&self) -> JobProgress {
        self.progress.borrow().clone()
    }

    /// Receiver that wakes on every progress change
    pub fn watch(&self) -> watch::Receiver<JobProgress> {
        self.progress.clone()
    }

    /// Wait for the job to finish
    pub async fn wait(self) -> Result<RefreshOutcome> {
        self.task
            .await
            .map_err(|e| Error::Task(format!("Refresh job {} failed: {}", self.job_id, e)))
    }
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    backend: Arc<dyn RosterBackend>,
    state: Arc<SharedState>,
    poll_interval: Duration,
    deadline: Duration,
}

impl RefreshCoordinator {
    pub fn new(
        backend: Arc<dyn RosterBackend>,
        state: Arc<SharedState>,
        poll_interval: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            backend,
            state,
            poll_interval,
            deadline,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Fire one refresh request per target without awaiting them, then track
    /// completion. `source` of `None` refreshes every source.
    ///
    /// Baselines are taken from the store before any request goes out.
    pub async fn refresh(
        &self,
        targets: Vec<String>,
        source: Option<RefreshSource>,
        success_message: impl Into<String>,
    ) -> Result<RefreshHandle> {
        let job = self.begin(targets).await?;

        for name in job.targets() {
            let backend = Arc::clone(&self.backend);
            let name = name.clone();
            tokio::spawn(async move {
                if let Err(e) = backend.trigger_refresh(&name, source).await {
                    warn!(artist = %name, "Refresh request failed: {}", e);
                }
            });
        }

        Ok(self.spawn(job, success_message.into()))
    }

    /// Track targets whose refresh was already requested
    pub async fn track(
        &self,
        targets: Vec<String>,
        success_message: impl Into<String>,
    ) -> Result<RefreshHandle> {
        let job = self.begin(targets).await?;
        Ok(self.spawn(job, success_message.into()))
    }

    /// Build the job and capture its baselines from the current snapshot
    async fn begin(&self, targets: Vec<String>) -> Result<RefreshJob> {
        let mut job = RefreshJob::new(targets, self.deadline, self.poll_interval);
        if job.targets().is_empty() {
            return Err(Error::Validation("No artists to refresh".to_string()));
        }
        {
            let dash = self.state.dash.read().await;
            job.start(dash.store.all());
        }

        info!(
            job_id = %job.id(),
            targets = job.targets().len(),
            "Refresh job started"
        );
        self.state.events.emit_lossy(DashEvent::RefreshStarted {
            job_id: job.id(),
            targets: job.targets().to_vec(),
            timestamp: Utc::now(),
        });
        Ok(job)
    }

    fn spawn(&self, mut job: RefreshJob, success_message: String) -> RefreshHandle {
        let job_id = job.id();
        let (progress_tx, progress_rx) = watch::channel(JobProgress::of(&job));

        let this = self.clone();
        let task = tokio::spawn(async move {
            let outcome = this.poll(&mut job, &progress_tx, &success_message).await;

            info!(
                job_id = %job_id,
                outcome = ?outcome,
                completed = job.completed_count(),
                targets = job.targets().len(),
                "Refresh job finished"
            );
            this.state.events.emit_lossy(DashEvent::RefreshFinished {
                job_id,
                outcome,
                completed: job.completed_count(),
                targets: job.targets().len(),
                timestamp: Utc::now(),
            });
            outcome
        });

        RefreshHandle {
            job_id,
            progress: progress_rx,
            task,
        }
    }

    async fn poll(
        &self,
        job: &mut RefreshJob,
        progress: &watch::Sender<JobProgress>,
        success_message: &str,
    ) -> RefreshOutcome {
        loop {
            sleep(self.poll_interval).await;

            if job.deadline_reached() {
                job.time_out();
                let _ = progress.send(JobProgress::of(job));
                self.state.events.notify(NoticeLevel::Info, TIMEOUT_NOTICE);
                // Reload failures are reported by the reload itself
                let _ = reload_roster(&self.state, self.backend.as_ref()).await;
                return RefreshOutcome::TimedOut;
            }

            match self.backend.fetch_artists().await {
                Ok(records) => {
                    if job.observe(&records) == JobState::Completed {
                        let _ = progress.send(JobProgress::of(job));
                        self.state.adopt(records, AdoptOrigin::RefreshJob).await;
                        self.state
                            .events
                            .notify(NoticeLevel::Success, success_message);
                        return RefreshOutcome::Completed;
                    }
                    debug!(
                        job_id = %job.id(),
                        completed = job.completed_count(),
                        targets = job.targets().len(),
                        "Refresh still pending"
                    );
                }
                Err(e) if e.is_transient() => {
                    debug!(job_id = %job.id(), "Polling error, retrying: {}", e);
                }
                Err(e) => {
                    warn!(job_id = %job.id(), "Polling error: {}", e);
                }
            }

            job.advance();
            let _ = progress.send(JobProgress::of(job));
        }
    }
}
