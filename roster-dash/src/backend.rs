//! Backend client
//!
//! `RosterBackend` is the seam between the dashboard and the roster web
//! service. `HttpBackend` is the reqwest implementation used in production;
//! tests substitute in-memory backends.

use std::time::Duration;

use async_trait::async_trait;
use roster_common::api::{
    DeleteArtistRequest, ErrorResponse, RefreshRequest, UpdateArtistRequest, ARTISTS_PATH,
    DELETE_ARTIST_PATH, REFRESH_PATH, UPDATE_ARTIST_PATH,
};
use roster_common::{Error, Record, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::columns::RefreshSource;

const USER_AGENT: &str = concat!("roster-dash/", env!("CARGO_PKG_VERSION"));

/// Operations the dashboard needs from the roster service
#[async_trait]
pub trait RosterBackend: Send + Sync {
    /// Full roster in backend order
    async fn fetch_artists(&self) -> Result<Vec<Record>>;

    /// Ask for an asynchronous refresh; success means the job was accepted
    async fn trigger_refresh(&self, name: &str, source: Option<RefreshSource>) -> Result<()>;

    /// Synchronous field edit
    async fn update_artist(&self, name: &str, fields: Map<String, Value>) -> Result<()>;

    /// Synchronous deletion
    async fn delete_artist(&self, name: &str) -> Result<()>;
}

/// reqwest-backed client for the roster web service
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.url(path);
        debug!(url = %url, "POST");

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(backend_error(status, &text))
    }
}

/// Surface the `{error}` payload verbatim, falling back to the status line
fn backend_error(status: reqwest::StatusCode, body: &str) -> Error {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(payload) => Error::Backend(payload.error),
        Err(_) => Error::Backend(format!("Request failed with status {}", status)),
    }
}

/// Interpret a roster payload: an array of objects, or an object carrying `error`
pub fn parse_roster(payload: Value) -> Result<Vec<Record>> {
    match payload {
        Value::Array(entries) => entries.into_iter().map(Record::try_from).collect(),
        Value::Object(map) => match map.get("error") {
            Some(err) => Err(Error::Backend(
                err.as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string()),
            )),
            None => Err(Error::Backend(
                "Unexpected roster payload (expected array)".to_string(),
            )),
        },
        other => Err(Error::Backend(format!(
            "Unexpected roster payload: {}",
            other
        ))),
    }
}

#[async_trait]
impl RosterBackend for HttpBackend {
    async fn fetch_artists(&self) -> Result<Vec<Record>> {
        let url = self.url(ARTISTS_PATH);
        debug!(url = %url, "Fetching roster");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let payload: Value = match serde_json::from_str(&text) {
            Ok(payload) => payload,
            Err(e) if status.is_success() => {
                return Err(Error::Transport(format!("Invalid roster body: {}", e)));
            }
            Err(_) => return Err(backend_error(status, &text)),
        };

        let records = parse_roster(payload)?;
        if !status.is_success() {
            return Err(Error::Backend(format!("Request failed with status {}", status)));
        }
        Ok(records)
    }

    async fn trigger_refresh(&self, name: &str, source: Option<RefreshSource>) -> Result<()> {
        let body = RefreshRequest {
            name: name.to_string(),
            source: source.map(|s| s.as_str().to_string()),
        };
        self.post(REFRESH_PATH, &body).await
    }

    async fn update_artist(&self, name: &str, fields: Map<String, Value>) -> Result<()> {
        let body = UpdateArtistRequest {
            name: name.to_string(),
            fields,
        };
        self.post(UPDATE_ARTIST_PATH, &body).await
    }

    async fn delete_artist(&self, name: &str) -> Result<()> {
        let body = DeleteArtistRequest {
            name: name.to_string(),
        };
        self.post(DELETE_ARTIST_PATH, &body).await
    }
}
