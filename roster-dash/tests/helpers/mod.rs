//! Shared test utilities
//!
//! `FakeBackend` is an in-memory roster service with scriptable fetch
//! results, used with tokio's paused clock so polling runs instantly.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roster_common::config::DashConfig;
use roster_common::events::{DashEvent, NoticeLevel};
use roster_common::{Error, Record, Result};
use roster_dash::columns::RefreshSource;
use roster_dash::{Dashboard, RosterBackend};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

/// One scripted `fetch_artists` answer
#[derive(Debug, Clone)]
pub enum Fetch {
    Roster(Vec<Record>),
    Transport,
    Backend(String),
}

#[derive(Default)]
struct Inner {
    roster: Vec<Record>,
    scripted: VecDeque<Fetch>,
    fetch_count: usize,
    refresh_calls: Vec<(String, Option<RefreshSource>)>,
    deleted: Vec<String>,
    updates: Vec<(String, Map<String, Value>)>,
    fail_delete: HashSet<String>,
    update_error: Option<String>,
    refresh_error: Option<String>,
    bump_on_refresh: bool,
    bumps: usize,
}

/// In-memory roster service
#[derive(Default)]
pub struct FakeBackend {
    inner: Mutex<Inner>,
}

impl FakeBackend {
    pub fn new(roster: Vec<Record>) -> Arc<Self> {
        let backend = Self::default();
        backend.inner.lock().unwrap().roster = roster;
        Arc::new(backend)
    }

    /// Replace the roster returned once the script is exhausted
    pub fn set_roster(&self, roster: Vec<Record>) {
        self.inner.lock().unwrap().roster = roster;
    }

    /// Queue an answer for the next fetch
    pub fn push_fetch(&self, fetch: Fetch) {
        self.inner.lock().unwrap().scripted.push_back(fetch);
    }

    /// Accepted refreshes stamp a new `updated_at` on the record
    pub fn bump_on_refresh(&self) {
        self.inner.lock().unwrap().bump_on_refresh = true;
    }

    pub fn fail_delete(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_delete.insert(name.to_string());
    }

    pub fn fail_update(&self, message: &str) {
        self.inner.lock().unwrap().update_error = Some(message.to_string());
    }

    pub fn fail_refresh(&self, message: &str) {
        self.inner.lock().unwrap().refresh_error = Some(message.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.lock().unwrap().fetch_count
    }

    pub fn refresh_calls(&self) -> Vec<(String, Option<RefreshSource>)> {
        self.inner.lock().unwrap().refresh_calls.clone()
    }

    pub fn refreshed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .refresh_calls()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names
    }

    pub fn deleted(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }

    pub fn updates(&self) -> Vec<(String, Map<String, Value>)> {
        self.inner.lock().unwrap().updates.clone()
    }
}

#[async_trait]
impl RosterBackend for FakeBackend {
    async fn fetch_artists(&self) -> Result<Vec<Record>> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_count += 1;
        match inner.scripted.pop_front() {
            Some(Fetch::Roster(records)) => Ok(records),
            Some(Fetch::Transport) => Err(Error::Transport("connection refused".to_string())),
            Some(Fetch::Backend(message)) => Err(Error::Backend(message)),
            None => Ok(inner.roster.clone()),
        }
    }

    async fn trigger_refresh(&self, name: &str, source: Option<RefreshSource>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.refresh_calls.push((name.to_string(), source));
        if let Some(message) = &inner.refresh_error {
            return Err(Error::Backend(message.clone()));
        }
        if inner.bump_on_refresh {
            inner.bumps += 1;
            let stamp = format!("2024-06-01 00:00:{:02}", inner.bumps);
            if let Some(record) = inner.roster.iter_mut().find(|r| r.name() == name) {
                record.set("updated_at", stamp);
            }
        }
        Ok(())
    }

    async fn update_artist(&self, name: &str, fields: Map<String, Value>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = &inner.update_error {
            return Err(Error::Backend(message.clone()));
        }
        if let Some(record) = inner.roster.iter_mut().find(|r| r.name() == name) {
            for (field, value) in &fields {
                record.set(field, value.clone());
            }
            record.set("updated_at", "2024-07-01 00:00:00");
        }
        inner.updates.push((name.to_string(), fields));
        Ok(())
    }

    async fn delete_artist(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_delete.contains(name) {
            return Err(Error::Backend(format!("Artist {} not found", name)));
        }
        inner.roster.retain(|r| r.name() != name);
        inner.deleted.push(name.to_string());
        Ok(())
    }
}

/// Record with a name, `updated_at` and a couple of metrics
pub fn artist(name: &str, updated_at: &str) -> Record {
    Record::new()
        .with("name", name)
        .with("instagram_followers", 100)
        .with("spotify_followers", 200)
        .with("spotify_listeners", 300)
        .with("twitter_followers", 400)
        .with("spotify_genre", "pop")
        .with("updated_at", updated_at)
}

/// `artist` with a chosen follower count
pub fn artist_with_followers(name: &str, followers: i64) -> Record {
    artist(name, "2024-01-01 00:00:00").with("instagram_followers", followers)
}

/// Config with the default 3s polling and a deadline of `ticks` polls
pub fn config_with_ticks(ticks: u64) -> DashConfig {
    DashConfig {
        poll_interval_ms: 3000,
        refresh_timeout_secs: 3 * ticks,
        ..DashConfig::default()
    }
}

/// Dashboard over `backend` with the roster already loaded
pub async fn loaded_dashboard(backend: Arc<FakeBackend>, config: DashConfig) -> Dashboard {
    let dash = Dashboard::new(config, backend);
    dash.reload().await.unwrap();
    dash
}

/// Every event received so far
pub fn drain(rx: &mut broadcast::Receiver<DashEvent>) -> Vec<DashEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Notices among `events`
pub fn notices(events: &[DashEvent]) -> Vec<(NoticeLevel, String)> {
    events
        .iter()
        .filter_map(|event| match event {
            DashEvent::Notice { level, message, .. } => Some((*level, message.clone())),
            _ => None,
        })
        .collect()
}
