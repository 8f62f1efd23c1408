//! Per-column filtering
//!
//! Each column carries at most one FilterSpec. All active specs AND together.
//! Evaluation is a pure function of the records and the specs.

use std::collections::BTreeMap;

use roster_common::{Cell, Error, Record, Result};
use serde::{Deserialize, Serialize};

use crate::columns::ColumnKind;

/// Filter operators for column predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// No filter
    #[default]
    None,

    // Numeric comparisons
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    NumericEquals,

    // Case-insensitive text matching
    TextEquals,
    Contains,
    StartsWith,
    EndsWith,

    /// Null, missing or empty string (both kinds)
    IsNull,
}

const NUMERIC_OPERATORS: &[FilterOperator] = &[
    FilterOperator::None,
    FilterOperator::GreaterThan,
    FilterOperator::GreaterOrEqual,
    FilterOperator::LessThan,
    FilterOperator::LessOrEqual,
    FilterOperator::NumericEquals,
    FilterOperator::IsNull,
];

const TEXT_OPERATORS: &[FilterOperator] = &[
    FilterOperator::None,
    FilterOperator::TextEquals,
    FilterOperator::Contains,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
    FilterOperator::IsNull,
];

impl FilterOperator {
    /// Operators offered for a column kind, in display order
    pub fn for_kind(kind: ColumnKind) -> &'static [FilterOperator] {
        match kind {
            ColumnKind::Numeric => NUMERIC_OPERATORS,
            ColumnKind::Text => TEXT_OPERATORS,
        }
    }

    pub fn applies_to(&self, kind: ColumnKind) -> bool {
        Self::for_kind(kind).contains(self)
    }

    /// Short token used by the filter form and the command line
    pub fn token(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::NumericEquals => "=",
            Self::TextEquals => "equals",
            Self::Contains => "contains",
            Self::StartsWith => "starts",
            Self::EndsWith => "ends",
            Self::IsNull => "null",
        }
    }

    pub fn from_token(token: &str) -> Result<Self> {
        let op = match token.trim() {
            "" => Self::None,
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterOrEqual,
            "<" => Self::LessThan,
            "<=" => Self::LessOrEqual,
            "=" => Self::NumericEquals,
            "equals" => Self::TextEquals,
            "contains" => Self::Contains,
            "starts" => Self::StartsWith,
            "ends" => Self::EndsWith,
            "null" => Self::IsNull,
            other => {
                return Err(Error::Validation(format!(
                    "Unknown filter operator: {}",
                    other
                )))
            }
        };
        Ok(op)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "No filter",
            Self::GreaterThan => "Greater than",
            Self::GreaterOrEqual => "Greater or equal",
            Self::LessThan => "Less than",
            Self::LessOrEqual => "Less or equal",
            Self::NumericEquals | Self::TextEquals => "Equals",
            Self::Contains => "Contains",
            Self::StartsWith => "Starts with",
            Self::EndsWith => "Ends with",
            Self::IsNull => "Is null",
        }
    }

    /// Returns true if this operator reads the comparison value
    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::None | Self::IsNull)
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan
                | Self::GreaterOrEqual
                | Self::LessThan
                | Self::LessOrEqual
                | Self::NumericEquals
        )
    }
}

/// One column's operator and comparison value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

impl FilterSpec {
    pub fn new(operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            operator,
            value: value.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.operator != FilterOperator::None
    }

    /// Evaluate this spec against one cell
    pub fn matches(&self, cell: Cell<'_>) -> bool {
        match self.operator {
            FilterOperator::None => true,
            // Independent of the value text
            FilterOperator::IsNull => cell.is_blank(),
            _ if self.value.is_empty() => true,
            op if op.is_numeric() => {
                // Non-numeric filter text leaves the column unfiltered
                let Some(target) = parse_filter_number(&self.value) else {
                    return true;
                };
                let Some(n) = cell.as_number() else {
                    return false;
                };
                match op {
                    FilterOperator::GreaterThan => n > target,
                    FilterOperator::GreaterOrEqual => n >= target,
                    FilterOperator::LessThan => n < target,
                    FilterOperator::LessOrEqual => n <= target,
                    _ => n == target,
                }
            }
            op => {
                let text = cell.to_text().to_lowercase();
                let needle = self.value.to_lowercase();
                match op {
                    FilterOperator::TextEquals => text == needle,
                    FilterOperator::Contains => text.contains(&needle),
                    FilterOperator::StartsWith => text.starts_with(&needle),
                    _ => text.ends_with(&needle),
                }
            }
        }
    }
}

fn parse_filter_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Column -> FilterSpec mapping; only active specs are stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    specs: BTreeMap<String, FilterSpec>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a spec; an inactive spec removes the column's entry
    pub fn set(&mut self, column: &str, spec: FilterSpec) {
        if spec.is_active() {
            self.specs.insert(column.to_string(), spec);
        } else {
            self.specs.remove(column);
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<FilterSpec> {
        self.specs.remove(column)
    }

    pub fn clear(&mut self) {
        self.specs.clear();
    }

    pub fn get(&self, column: &str) -> Option<&FilterSpec> {
        self.specs.get(column)
    }

    pub fn has_active(&self) -> bool {
        self.specs.values().any(FilterSpec::is_active)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterSpec)> {
        self.specs.iter().map(|(col, spec)| (col.as_str(), spec))
    }

    /// True when every active spec passes for this record
    pub fn matches(&self, record: &Record) -> bool {
        self.specs
            .iter()
            .all(|(column, spec)| spec.matches(record.get(column)))
    }

    /// Keep the records that pass every active spec, preserving order
    pub fn apply<'a, I>(&self, records: I) -> Vec<&'a Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}
