//! Record model
//!
//! A record is one tracked artist: a flat map from field name to value as
//! delivered by `GET /api/artists`. Field order is preserved because the
//! column schema is discovered from the key order of the first record.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::{Error, Result};

/// Identifier field, unique per record
pub const NAME_FIELD: &str = "name";

/// Freshness timestamp assigned by the backend on every refresh or edit
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// One tracked entity and its metric fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

/// Borrowed view of a single field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    /// Missing field, JSON null, or a nested value that has no cell form
    Null,
    Number(&'a Number),
    Text(&'a str),
    Flag(bool),
}

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style field setter
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// Unique identifier (empty when the backend omitted it)
    pub fn name(&self) -> &str {
        self.0
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Raw `updated_at` value, compared by equality only
    pub fn updated_at(&self) -> Option<&Value> {
        self.0.get(UPDATED_AT_FIELD).filter(|v| !v.is_null())
    }

    pub fn get(&self, field: &str) -> Cell<'_> {
        match self.0.get(field) {
            Some(Value::Number(n)) => Cell::Number(n),
            Some(Value::String(s)) => Cell::Text(s),
            Some(Value::Bool(b)) => Cell::Flag(*b),
            _ => Cell::Null,
        }
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// Field names in backend order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::Backend(format!(
                "Unexpected roster entry (expected object): {}",
                other
            ))),
        }
    }
}

impl<'a> Cell<'a> {
    /// Null, missing, or empty string
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric reading of the cell; text is parsed after trimming
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Cell::Number(n) => n.as_f64(),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        (!n.is_nan()).then_some(n)
    }

    /// Display text; null renders as the empty string
    pub fn to_text(&self) -> Cow<'a, str> {
        match *self {
            Cell::Null => Cow::Borrowed(""),
            Cell::Number(n) => Cow::Owned(n.to_string()),
            Cell::Text(s) => Cow::Borrowed(s),
            Cell::Flag(b) => Cow::Owned(b.to_string()),
        }
    }
}
