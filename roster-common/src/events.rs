//! Event types for the roster dashboard
//!
//! Provides the dashboard event definitions and the EventBus that carries
//! user-facing notices, re-render triggers and refresh job lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Which path adopted a fresh record set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdoptOrigin {
    /// Full reload (startup, background interval, after edits, forced by timeout)
    Reload,
    /// A refresh job observed completion and adopted the data it fetched
    RefreshJob,
}

/// How a refresh job's wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    Completed,
    TimedOut,
}

/// Dashboard event types
///
/// Events are broadcast via EventBus and serialize with a `type` tag so a
/// front end can log or stream them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashEvent {
    /// Message for the user (the toast surface)
    Notice {
        level: NoticeLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// View state or data changed; the projected table must be redrawn
    ViewInvalidated {
        revision: u64,
        timestamp: DateTime<Utc>,
    },

    /// A record set became the current RecordStore snapshot
    RosterAdopted {
        origin: AdoptOrigin,
        record_count: usize,
        /// Selected identifiers dropped because they vanished from the roster
        pruned_selections: usize,
        timestamp: DateTime<Utc>,
    },

    /// Refresh requests were fired and polling began
    RefreshStarted {
        job_id: Uuid,
        targets: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Polling stopped
    RefreshFinished {
        job_id: Uuid,
        outcome: RefreshOutcome,
        completed: usize,
        targets: usize,
        timestamp: DateTime<Utc>,
    },
}

impl DashEvent {
    pub fn notice(level: NoticeLevel, message: impl Into<String>) -> Self {
        DashEvent::Notice {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast bus for dashboard events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DashEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DashEvent) {
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit_lossy(DashEvent::notice(level, message));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
