//! Dashboard state
//!
//! All user-controlled display parameters live in one `DashState` owned by
//! `SharedState`. Mutations happen under the write lock between suspension
//! points and are never held across backend calls.

use std::collections::BTreeMap;

use chrono::Utc;
use roster_common::config::DashConfig;
use roster_common::events::{AdoptOrigin, DashEvent, EventBus};
use roster_common::{Error, Record, Result};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::columns::{self, ColumnModel};
use crate::filter::{FilterSet, FilterSpec};
use crate::selection::SelectionSet;
use crate::store::RecordStore;
use crate::table::TableView;
use crate::view::{self, SortDirection, SortSpec, PAGE_SIZE_ALL};

/// A batch of view settings, applied together by `ViewState::apply`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewRequest {
    pub columns: Option<Vec<String>>,
    pub sort: Option<(String, SortDirection)>,
    pub query: Option<String>,
    pub filters: Vec<(String, FilterSpec)>,
    /// Applied after the filters, so it overrides their switch to all rows
    pub page_size: Option<usize>,
    pub page: Option<usize>,
}

/// Filter, sort, page and column settings
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Free-text search on the identifier
    pub query: String,
    pub columns: ColumnModel,
    pub sort: SortSpec,
    /// 1-indexed
    pub page: usize,
    /// 0 shows every row
    pub page_size: usize,
    pub filters: FilterSet,
}

impl ViewState {
    pub fn from_config(config: &DashConfig) -> Self {
        let direction = if config.sort_descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        Self {
            query: String::new(),
            columns: ColumnModel::new(config.visible_columns.clone()),
            sort: SortSpec::new(config.sort_column.clone(), direction),
            page: 1,
            page_size: config.page_size,
            filters: FilterSet::new(),
        }
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.page = 1;
    }

    /// Store a column filter. Any active filter switches to showing all rows.
    pub fn set_filter(&mut self, column: &str, spec: FilterSpec) -> Result<()> {
        if self.columns.is_discovered() && !self.columns.is_known(column) {
            return Err(Error::Validation(format!("Unknown column: {}", column)));
        }
        let kind = columns::kind_of(column);
        if !spec.operator.applies_to(kind) {
            return Err(Error::Validation(format!(
                "Operator '{}' does not apply to {}",
                spec.operator.token(),
                columns::format_label(column)
            )));
        }

        self.filters.set(column, spec);
        if self.filters.has_active() {
            self.page_size = PAGE_SIZE_ALL;
        }
        self.page = 1;
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.page = 1;
    }

    pub fn sort_by(&mut self, column: &str) -> Result<()> {
        if self.columns.is_discovered() && !self.columns.is_known(column) {
            return Err(Error::Validation(format!("Unknown column: {}", column)));
        }
        self.sort.toggle(column);
        Ok(())
    }

    pub fn set_sort(&mut self, column: &str, direction: SortDirection) -> Result<()> {
        if self.columns.is_discovered() && !self.columns.is_known(column) {
            return Err(Error::Validation(format!("Unknown column: {}", column)));
        }
        self.sort = SortSpec::new(column, direction);
        Ok(())
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
        self.page = 1;
    }

    /// Apply every setting in `request`, or none of them on error
    pub fn apply(&mut self, request: &ViewRequest) -> Result<()> {
        let mut next = self.clone();
        if let Some(columns) = &request.columns {
            next.columns.set_visible(columns)?;
        }
        if let Some((column, direction)) = &request.sort {
            next.set_sort(column, *direction)?;
        }
        if let Some(query) = &request.query {
            next.set_query(query);
        }
        for (column, spec) in &request.filters {
            next.set_filter(column, spec.clone())?;
        }
        if let Some(page_size) = request.page_size {
            next.set_page_size(page_size);
        }
        if let Some(page) = request.page {
            next.page = page.max(1);
        }
        *self = next;
        Ok(())
    }

    /// Drop the column and its filter
    pub fn remove_column(&mut self, column: &str) -> bool {
        self.filters.remove(column);
        self.columns.remove(column)
    }
}

/// Unsaved cell edits, per record then per field
#[derive(Debug, Clone, Default)]
pub struct PendingEdits {
    rows: BTreeMap<String, Map<String, Value>>,
}

impl PendingEdits {
    pub fn set(&mut self, name: &str, field: &str, value: &str) {
        self.rows
            .entry(name.to_string())
            .or_default()
            .insert(field.to_string(), Value::String(value.to_string()));
    }

    pub fn get(&self, name: &str, field: &str) -> Option<&str> {
        self.rows.get(name)?.get(field)?.as_str()
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.rows.contains_key(name)
    }

    pub fn row(&self, name: &str) -> Option<&Map<String, Value>> {
        self.rows.get(name)
    }

    pub fn discard(&mut self, name: &str) -> Option<Map<String, Value>> {
        self.rows.remove(name)
    }
}

/// Everything the dashboard displays
#[derive(Debug, Clone)]
pub struct DashState {
    pub store: RecordStore,
    pub view: ViewState,
    pub selection: SelectionSet,
    pub edits: PendingEdits,
    revision: u64,
}

impl DashState {
    pub fn new(config: &DashConfig) -> Self {
        Self {
            store: RecordStore::new(),
            view: ViewState::from_config(config),
            selection: SelectionSet::new(),
            edits: PendingEdits::default(),
            revision: 0,
        }
    }

    /// Make `records` the current snapshot, discover the schema on first use and
    /// prune selections against the new identifier set.
    ///
    /// Returns the number of pruned selections.
    pub fn adopt(&mut self, records: Vec<Record>) -> usize {
        if self.store.adopt(records) {
            self.view.columns.discover(self.store.schema());
            debug!(
                columns = self.store.schema().len(),
                "Discovered record schema"
            );
        }
        let live = self.store.names();
        self.selection.prune(&live)
    }

    /// Identifiers passing search and column filters, across all pages
    pub fn matching_ids(&self) -> Vec<String> {
        view::matching(self.store.all(), &self.view.query, &self.view.filters)
            .into_iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Project the current page; a page beyond the end is clamped and remembered
    pub fn table(&mut self) -> TableView {
        let v = &self.view;
        let projection = view::project(
            self.store.all(),
            &v.query,
            &v.filters,
            &v.sort,
            v.page,
            v.page_size,
        );
        let matching = self.matching_ids();
        let table = TableView::build(&projection, v, &self.selection, &self.edits, &matching);
        self.view.page = projection.page;
        table
    }

    /// Mark the view as needing a redraw
    pub fn invalidate(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// State shared by the dashboard, the refresh coordinator and the reload task
#[derive(Debug)]
pub struct SharedState {
    pub dash: RwLock<DashState>,
    pub events: EventBus,
}

impl SharedState {
    pub fn new(config: &DashConfig, events: EventBus) -> Self {
        Self {
            dash: RwLock::new(DashState::new(config)),
            events,
        }
    }

    /// Adopt a fetched record set and announce it. The last adoption wins.
    pub async fn adopt(&self, records: Vec<Record>, origin: AdoptOrigin) -> usize {
        let record_count = records.len();
        let (pruned, revision) = {
            let mut dash = self.dash.write().await;
            let pruned = dash.adopt(records);
            (pruned, dash.invalidate())
        };

        self.events.emit_lossy(DashEvent::RosterAdopted {
            origin,
            record_count,
            pruned_selections: pruned,
            timestamp: Utc::now(),
        });
        self.events.emit_lossy(DashEvent::ViewInvalidated {
            revision,
            timestamp: Utc::now(),
        });
        pruned
    }
}
