//! RefreshJob: completion tracking for one batch of refresh requests
//!
//! The backend has no job-status channel, so completion is inferred: a
//! target is done once a fetched roster shows its `updated_at` differing
//! from the value captured when the job started. A refresh that leaves
//! `updated_at` untouched is indistinguishable from one that never ran and
//! ends in a timeout.
//!
//! Elapsed time is counted per tick (each tick adds one poll interval),
//! which makes the deadline a whole number of ticks.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use roster_common::Record;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Polling,
    Completed,
    TimedOut,
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Completed | JobState::TimedOut)
    }
}

#[derive(Debug, Clone)]
pub struct RefreshJob {
    id: Uuid,
    /// De-duplicated, first-seen order
    targets: Vec<String>,
    /// Absent for targets missing from the roster at start
    baselines: HashMap<String, Value>,
    completed: HashSet<String>,
    deadline: Duration,
    poll_interval: Duration,
    elapsed: Duration,
    ticks: u32,
    state: JobState,
}

impl RefreshJob {
    pub fn new<I, S>(targets: I, deadline: Duration, poll_interval: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let targets = targets
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| seen.insert(t.clone()))
            .collect();

        Self {
            id: Uuid::new_v4(),
            targets,
            baselines: HashMap::new(),
            completed: HashSet::new(),
            deadline,
            poll_interval,
            elapsed: Duration::ZERO,
            ticks: 0,
            state: JobState::Idle,
        }
    }

    /// Capture baselines from the current snapshot and enter `Polling`
    pub fn start(&mut self, current: &[Record]) {
        if self.state != JobState::Idle {
            return;
        }
        for record in current {
            let name = record.name();
            if self.targets.iter().any(|t| t == name) {
                self.baselines.insert(name.to_string(), freshness(record));
            }
        }
        self.state = JobState::Polling;
    }

    /// True once the accumulated tick time has reached the deadline
    pub fn deadline_reached(&self) -> bool {
        self.elapsed >= self.deadline
    }

    /// Compare a fetched roster against the baselines.
    ///
    /// The completion set only ever grows. Returns the state after observing.
    pub fn observe(&mut self, fetched: &[Record]) -> JobState {
        if self.state != JobState::Polling {
            return self.state;
        }

        for record in fetched {
            let name = record.name();
            if self.completed.contains(name) || !self.targets.iter().any(|t| t == name) {
                continue;
            }
            let changed = match self.baselines.get(name) {
                Some(baseline) => *baseline != freshness(record),
                None => true,
            };
            if changed {
                self.completed.insert(name.to_string());
            }
        }

        if self.completed.len() == self.targets.len() {
            self.state = JobState::Completed;
        }
        self.state
    }

    /// Account one poll interval
    pub fn advance(&mut self) {
        self.elapsed += self.poll_interval;
        self.ticks += 1;
    }

    pub fn time_out(&mut self) {
        if self.state == JobState::Polling {
            self.state = JobState::TimedOut;
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.contains(name)
    }

    /// Completed targets in target order
    pub fn completed(&self) -> Vec<String> {
        self.targets
            .iter()
            .filter(|t| self.completed.contains(t.as_str()))
            .cloned()
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}

fn freshness(record: &Record) -> Value {
    record.updated_at().cloned().unwrap_or(Value::Null)
}
