//! Backend API request/response types
//!
//! Endpoints consumed by the dashboard:
//! - `GET /api/artists` returns the ordered roster
//! - `POST /api/refresh` accepts a refresh job (acceptance only, not completion)
//! - `POST /api/update_artist` edits fields synchronously
//! - `POST /api/delete_artist` deletes synchronously

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ARTISTS_PATH: &str = "/api/artists";
pub const REFRESH_PATH: &str = "/api/refresh";
pub const UPDATE_ARTIST_PATH: &str = "/api/update_artist";
pub const DELETE_ARTIST_PATH: &str = "/api/delete_artist";

/// POST /api/refresh body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub name: String,
    /// Single source to refresh; all sources when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// POST /api/update_artist body: the name plus flattened field updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateArtistRequest {
    pub name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// POST /api/delete_artist body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteArtistRequest {
    pub name: String,
}

/// Error payload carried by non-OK responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Acknowledgement payload carried by OK responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
