//! Column catalogue and the ColumnModel
//!
//! The catalogue knows which columns are numeric, which are read-only and
//! which external source refreshes them. The ColumnModel tracks the known
//! column set (discovered once from the first fetched record) and the
//! ordered list of visible columns.

use std::fmt;
use std::str::FromStr;

use roster_common::{Error, Result};
use serde::{Deserialize, Serialize};

const NUMERIC_COLUMNS: &[&str] = &[
    "instagram_followers",
    "spotify_followers",
    "spotify_listeners",
    "spotify_popularity",
    "twitter_followers",
    "stubhub_favourites",
];

const READ_ONLY_COLUMNS: &[&str] = &["name", "updated_at", "created_at", "last_error"];

const SOURCE_COLUMNS: &[(&str, RefreshSource)] = &[
    ("instagram_followers", RefreshSource::Instagram),
    ("instagram_username", RefreshSource::Instagram),
    ("spotify_followers", RefreshSource::Spotify),
    ("spotify_listeners", RefreshSource::Spotify),
    ("spotify_popularity", RefreshSource::Spotify),
    ("spotify_id", RefreshSource::Spotify),
    ("spotify_genre", RefreshSource::Spotify),
    ("twitter_followers", RefreshSource::Twitter),
    ("twitter_username", RefreshSource::Twitter),
    ("stubhub_favourites", RefreshSource::Stubhub),
    ("stubhub_url", RefreshSource::Stubhub),
];

/// External data source that a backend refresh can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshSource {
    Instagram,
    Spotify,
    Twitter,
    Stubhub,
}

impl RefreshSource {
    /// Wire token sent as `source` in the refresh request
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Spotify => "spotify",
            Self::Twitter => "twitter",
            Self::Stubhub => "stubhub",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::Spotify => "Spotify",
            Self::Twitter => "Twitter",
            Self::Stubhub => "Stubhub",
        }
    }
}

impl fmt::Display for RefreshSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "instagram" => Ok(Self::Instagram),
            "spotify" => Ok(Self::Spotify),
            "twitter" => Ok(Self::Twitter),
            "stubhub" => Ok(Self::Stubhub),
            other => Err(Error::Validation(format!("Unknown refresh source: {}", other))),
        }
    }
}

/// Determines filter operators and sort comparison for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
}

/// Catalogue entry for one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub id: String,
    pub source: Option<RefreshSource>,
    pub kind: ColumnKind,
    pub read_only: bool,
}

impl ColumnDescriptor {
    pub fn for_column(id: &str) -> Self {
        Self {
            id: id.to_string(),
            source: source_for(id),
            kind: kind_of(id),
            read_only: is_read_only(id),
        }
    }

    pub fn label(&self) -> String {
        format_label(&self.id)
    }
}

pub fn source_for(column: &str) -> Option<RefreshSource> {
    SOURCE_COLUMNS
        .iter()
        .find(|(id, _)| *id == column)
        .map(|(_, source)| *source)
}

pub fn kind_of(column: &str) -> ColumnKind {
    if NUMERIC_COLUMNS.contains(&column) {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

pub fn is_read_only(column: &str) -> bool {
    READ_ONLY_COLUMNS.contains(&column)
}

/// `spotify_followers` -> `Spotify Followers`
pub fn format_label(column: &str) -> String {
    column
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Known columns plus the ordered visible subset
#[derive(Debug, Clone)]
pub struct ColumnModel {
    known: Vec<ColumnDescriptor>,
    visible: Vec<String>,
    discovered: bool,
}

impl ColumnModel {
    /// Start with a preferred visible list; it is pruned once the schema is known
    pub fn new(default_visible: Vec<String>) -> Self {
        let mut visible = Vec::with_capacity(default_visible.len());
        for col in default_visible {
            if !visible.contains(&col) {
                visible.push(col);
            }
        }
        Self {
            known: Vec::new(),
            visible,
            discovered: false,
        }
    }

    /// Adopt the record schema. Only the first non-empty schema is used.
    ///
    /// Returns true when this call performed the discovery.
    pub fn discover<S: AsRef<str>>(&mut self, schema: &[S]) -> bool {
        if self.discovered || schema.is_empty() {
            return false;
        }

        self.known = schema
            .iter()
            .map(|col| ColumnDescriptor::for_column(col.as_ref()))
            .collect();
        let known = &self.known;
        self.visible.retain(|col| known.iter().any(|d| &d.id == col));
        self.discovered = true;
        true
    }

    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    pub fn known(&self) -> &[ColumnDescriptor] {
        &self.known
    }

    pub fn is_known(&self, column: &str) -> bool {
        self.known.iter().any(|d| d.id == column)
    }

    /// Catalogue entry for a known column
    pub fn descriptor(&self, column: &str) -> Option<&ColumnDescriptor> {
        self.known.iter().find(|d| d.id == column)
    }

    pub fn visible(&self) -> &[String] {
        &self.visible
    }

    pub fn is_visible(&self, column: &str) -> bool {
        self.visible.iter().any(|c| c == column)
    }

    /// Show a hidden column (appended at the end) or hide a visible one.
    ///
    /// Returns the new visibility. Showing requires a known column.
    pub fn toggle_visibility(&mut self, column: &str) -> Result<bool> {
        if self.is_visible(column) {
            self.visible.retain(|c| c != column);
            return Ok(false);
        }
        if !self.is_known(column) {
            return Err(Error::Validation(format!("Unknown column: {}", column)));
        }
        self.visible.push(column.to_string());
        Ok(true)
    }

    /// Replace the visible list; every column must be known
    pub fn set_visible<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<()> {
        let mut visible: Vec<String> = Vec::with_capacity(columns.len());
        for col in columns {
            let col = col.as_ref();
            if self.discovered && !self.is_known(col) {
                return Err(Error::Validation(format!("Unknown column: {}", col)));
            }
            if !visible.iter().any(|c| c == col) {
                visible.push(col.to_string());
            }
        }
        self.visible = visible;
        Ok(())
    }

    /// Move `from` to the position currently occupied by `to` (insertion, not swap).
    ///
    /// No-op when either column is not visible or both are the same.
    pub fn reorder(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return false;
        }
        let (Some(from_idx), Some(to_idx)) = (
            self.visible.iter().position(|c| c == from),
            self.visible.iter().position(|c| c == to),
        ) else {
            return false;
        };

        let moved = self.visible.remove(from_idx);
        self.visible.insert(to_idx, moved);
        true
    }

    /// Drop a column from the visible list; true if it was visible
    pub fn remove(&mut self, column: &str) -> bool {
        let before = self.visible.len();
        self.visible.retain(|c| c != column);
        self.visible.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(cols: &[&str]) -> ColumnModel {
        let mut m = ColumnModel::new(cols.iter().map(|c| c.to_string()).collect());
        m.discover(&[
            "name",
            "instagram_followers",
            "spotify_followers",
            "twitter_followers",
            "spotify_genre",
            "updated_at",
        ]);
        m
    }

    #[test]
    fn test_reorder_is_insertion() {
        let mut m = model(&[
            "name",
            "instagram_followers",
            "spotify_followers",
            "twitter_followers",
        ]);

        assert!(m.reorder("spotify_followers", "twitter_followers"));
        assert_eq!(
            m.visible(),
            &[
                "name",
                "instagram_followers",
                "twitter_followers",
                "spotify_followers"
            ]
        );
    }

    #[test]
    fn test_reorder_backwards() {
        let mut m = model(&["name", "instagram_followers", "spotify_followers"]);
        assert!(m.reorder("spotify_followers", "name"));
        assert_eq!(
            m.visible(),
            &["spotify_followers", "name", "instagram_followers"]
        );
    }

    #[test]
    fn test_reorder_noops() {
        let mut m = model(&["name", "instagram_followers"]);
        assert!(!m.reorder("name", "name"));
        assert!(!m.reorder("name", "bogus"));
        assert!(!m.reorder("bogus", "name"));
        assert_eq!(m.visible(), &["name", "instagram_followers"]);
    }

    #[test]
    fn test_discovery_prunes_unknown_defaults_and_happens_once() {
        let mut m = ColumnModel::new(vec!["name".into(), "spotify_listeners".into()]);
        assert!(m.discover(&["name", "updated_at"]));
        assert_eq!(m.visible(), &["name"]);

        assert!(!m.discover(&["name", "updated_at", "brand_new"]));
        assert!(!m.is_known("brand_new"));
    }

    #[test]
    fn test_empty_schema_does_not_discover() {
        let mut m = ColumnModel::new(vec!["name".into()]);
        let empty: [&str; 0] = [];
        assert!(!m.discover(&empty));
        assert!(!m.is_discovered());
    }

    #[test]
    fn test_toggle_visibility() {
        let mut m = model(&["name"]);
        assert!(m.toggle_visibility("spotify_genre").unwrap());
        assert_eq!(m.visible(), &["name", "spotify_genre"]);
        assert!(!m.toggle_visibility("name").unwrap());
        assert_eq!(m.visible(), &["spotify_genre"]);
        assert!(m.toggle_visibility("not_a_column").is_err());
    }

    #[test]
    fn test_set_visible_dedupes_and_validates() {
        let mut m = model(&["name"]);
        m.set_visible(&["spotify_genre", "name", "spotify_genre"]).unwrap();
        assert_eq!(m.visible(), &["spotify_genre", "name"]);

        assert!(m.set_visible(&["name", "nope"]).is_err());
        assert_eq!(m.visible(), &["spotify_genre", "name"]);
    }

    #[test]
    fn test_remove_unknown_is_harmless() {
        let mut m = model(&["name"]);
        assert!(!m.remove("twitter_followers"));
        assert!(m.remove("name"));
        assert!(m.visible().is_empty());
    }

    #[test]
    fn test_catalogue() {
        assert_eq!(kind_of("spotify_popularity"), ColumnKind::Numeric);
        assert_eq!(kind_of("spotify_genre"), ColumnKind::Text);
        assert_eq!(source_for("stubhub_url"), Some(RefreshSource::Stubhub));
        assert_eq!(source_for("name"), None);
        assert!(is_read_only("last_error"));
        assert_eq!(format_label("spotify_followers"), "Spotify Followers");
        assert_eq!(
            "Twitter".parse::<RefreshSource>().unwrap(),
            RefreshSource::Twitter
        );
    }
}
