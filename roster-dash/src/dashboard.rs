//! Dashboard controller
//!
//! `Dashboard` owns the shared state, the backend and the refresh
//! coordinator, and exposes every user command keyed by record name or
//! column id. Commands that change what is displayed emit
//! `ViewInvalidated`; user-facing outcomes are reported as notices on the
//! event bus.

use std::sync::Arc;

use chrono::Utc;
use roster_common::config::DashConfig;
use roster_common::events::{DashEvent, EventBus, NoticeLevel};
use roster_common::{Error, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::RosterBackend;
use crate::columns::{self, RefreshSource};
use crate::filter::{FilterOperator, FilterSpec};
use crate::refresh::{RefreshCoordinator, RefreshHandle};
use crate::reload::{reload_roster, spawn_auto_reload};
use crate::state::{DashState, SharedState, ViewRequest};
use crate::table::TableView;
use crate::view::{calculate_pagination, SortDirection};

const EVENT_CAPACITY: usize = 256;

/// Yes/no answers for destructive or large operations
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers yes to every prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Clone)]
pub struct Dashboard {
    state: Arc<SharedState>,
    backend: Arc<dyn RosterBackend>,
    coordinator: RefreshCoordinator,
    config: Arc<DashConfig>,
}

impl Dashboard {
    pub fn new(config: DashConfig, backend: Arc<dyn RosterBackend>) -> Self {
        let state = Arc::new(SharedState::new(&config, EventBus::new(EVENT_CAPACITY)));
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&backend),
            Arc::clone(&state),
            config.poll_interval(),
            config.refresh_timeout(),
        );
        Self {
            state,
            backend,
            coordinator,
            config: Arc::new(config),
        }
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn config(&self) -> &DashConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn events(&self) -> &EventBus {
        &self.state.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashEvent> {
        self.state.events.subscribe()
    }

    /// Apply a view mutation and announce the redraw
    async fn mutate<R>(&self, f: impl FnOnce(&mut DashState) -> R) -> R {
        let (result, revision) = {
            let mut dash = self.state.dash.write().await;
            let result = f(&mut dash);
            (result, dash.invalidate())
        };
        self.announce(revision);
        result
    }

    /// Like `mutate`, but only announces on success
    async fn try_mutate<R>(&self, f: impl FnOnce(&mut DashState) -> Result<R>) -> Result<R> {
        let (result, revision) = {
            let mut dash = self.state.dash.write().await;
            let result = f(&mut dash)?;
            (result, dash.invalidate())
        };
        self.announce(revision);
        Ok(result)
    }

    fn announce(&self, revision: u64) {
        self.state.events.emit_lossy(DashEvent::ViewInvalidated {
            revision,
            timestamp: Utc::now(),
        });
    }

    /// Surface a failed one-shot action: backend text verbatim, transport as `network_message`
    fn report(&self, err: &Error, network_message: &str) {
        let message = match err {
            Error::Backend(msg) => msg.clone(),
            Error::Transport(_) => network_message.to_string(),
            other => other.to_string(),
        };
        self.state.events.notify(NoticeLevel::Error, message);
    }

    // ------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------

    pub async fn reload(&self) -> Result<usize> {
        reload_roster(&self.state, self.backend.as_ref()).await
    }

    pub fn spawn_auto_reload(&self) -> JoinHandle<()> {
        spawn_auto_reload(
            Arc::clone(&self.state),
            Arc::clone(&self.backend),
            self.config.reload_interval(),
        )
    }

    /// Render-ready snapshot of the current page
    pub async fn table(&self) -> TableView {
        self.state.dash.write().await.table()
    }

    /// First names of the roster in backend order
    pub async fn recent(&self) -> Vec<String> {
        self.state
            .dash
            .read()
            .await
            .store
            .recent(self.config.recent_count)
    }

    // ------------------------------------------------------------------
    // View state
    // ------------------------------------------------------------------

    pub async fn set_query(&self, query: &str) {
        self.mutate(|d| d.view.set_query(query)).await
    }

    /// Sort by `column`; the same column again flips the direction
    pub async fn sort_by(&self, column: &str) -> Result<()> {
        self.try_mutate(|d| d.view.sort_by(column)).await
    }

    pub async fn set_sort(&self, column: &str, direction: SortDirection) -> Result<()> {
        self.try_mutate(|d| d.view.set_sort(column, direction)).await
    }

    /// Set or clear (with `FilterOperator::None`) one column filter
    pub async fn set_filter(
        &self,
        column: &str,
        operator: FilterOperator,
        value: &str,
    ) -> Result<()> {
        let spec = FilterSpec::new(operator, value);
        self.try_mutate(|d| d.view.set_filter(column, spec)).await
    }

    pub async fn clear_filters(&self) {
        self.mutate(|d| d.view.clear_filters()).await
    }

    /// Returns false on the last page
    pub async fn next_page(&self) -> bool {
        self.mutate(|d| {
            let total = d.matching_ids().len();
            let p = calculate_pagination(total, d.view.page, d.view.page_size);
            d.view.page = p.page;
            if p.page < p.total_pages {
                d.view.page += 1;
                true
            } else {
                false
            }
        })
        .await
    }

    /// Returns false on the first page
    pub async fn prev_page(&self) -> bool {
        self.mutate(|d| {
            if d.view.page > 1 {
                d.view.page -= 1;
                true
            } else {
                false
            }
        })
        .await
    }

    /// Jump to a page; out-of-range pages are clamped when the table is built
    pub async fn go_to_page(&self, page: usize) {
        self.mutate(|d| d.view.page = page.max(1)).await
    }

    /// 0 shows every row
    pub async fn set_page_size(&self, page_size: usize) {
        self.mutate(|d| d.view.set_page_size(page_size)).await
    }

    pub async fn set_visible_columns(&self, columns: &[String]) -> Result<()> {
        self.try_mutate(|d| d.view.columns.set_visible(columns)).await
    }

    /// Apply a batch of view settings with a single invalidation
    pub async fn apply_view(&self, request: &ViewRequest) -> Result<()> {
        self.try_mutate(|d| d.view.apply(request)).await
    }

    /// Returns the new visibility
    pub async fn toggle_column(&self, column: &str) -> Result<bool> {
        self.try_mutate(|d| d.view.columns.toggle_visibility(column)).await
    }

    pub async fn reorder_columns(&self, from: &str, to: &str) -> bool {
        self.mutate(|d| d.view.columns.reorder(from, to)).await
    }

    /// Remove the column and its filter
    pub async fn remove_column(&self, column: &str) -> bool {
        self.mutate(|d| d.view.remove_column(column)).await
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Returns true if the row is now selected
    pub async fn toggle_row(&self, name: &str) -> bool {
        self.mutate(|d| d.selection.toggle(name)).await
    }

    /// Header checkbox: checking selects every filtered row (all pages),
    /// unchecking clears the whole selection
    pub async fn set_all_selected(&self, checked: bool) {
        self.mutate(|d| {
            if checked {
                let ids = d.matching_ids();
                d.selection.select_all(ids);
            } else {
                d.selection.clear();
            }
        })
        .await
    }

    pub async fn clear_selection(&self) {
        self.mutate(|d| d.selection.clear()).await
    }

    pub async fn selected(&self) -> Vec<String> {
        self.state.dash.read().await.selection.to_vec()
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Record an unsaved edit
    pub async fn edit_cell(&self, name: &str, field: &str, value: &str) -> Result<()> {
        self.try_mutate(|d| {
            if columns::is_read_only(field) {
                return Err(Error::Validation(format!(
                    "{} is read-only",
                    columns::format_label(field)
                )));
            }
            if d.view.columns.is_discovered() && !d.view.columns.is_known(field) {
                return Err(Error::Validation(format!("Unknown column: {}", field)));
            }
            if d.store.find(name).is_none() {
                return Err(Error::Validation(format!("Unknown artist: {}", name)));
            }
            d.edits.set(name, field, value);
            Ok(())
        })
        .await
    }

    pub async fn discard_changes(&self, name: &str) -> bool {
        self.mutate(|d| d.edits.discard(name).is_some()).await
    }

    /// Post the pending edits of one row
    ///
    /// On failure the edits are kept so the user can retry.
    pub async fn save_changes(&self, name: &str) -> Result<()> {
        let fields = {
            let dash = self.state.dash.read().await;
            dash.edits.row(name).cloned()
        };
        let Some(fields) = fields else {
            return Err(Error::Validation(format!("No pending changes for {}", name)));
        };

        if let Err(e) = self.backend.update_artist(name, fields).await {
            warn!(artist = %name, "Update failed: {}", e);
            self.report(&e, "Connection error during save");
            return Err(e);
        }

        self.mutate(|d| d.edits.discard(name)).await;
        info!(artist = %name, "Saved changes");
        self.state
            .events
            .notify(NoticeLevel::Success, format!("Saved changes for {}", name));
        let _ = self.reload().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Returns false when the user declined
    pub async fn delete_artist(&self, name: &str, confirm: &dyn Confirm) -> Result<bool> {
        if !confirm.confirm(&format!("Delete \"{}\"? This cannot be undone.", name)) {
            return Ok(false);
        }

        if let Err(e) = self.backend.delete_artist(name).await {
            warn!(artist = %name, "Delete failed: {}", e);
            self.report(&e, "Network error during delete");
            return Err(e);
        }

        info!(artist = %name, "Deleted artist");
        self.state
            .events
            .notify(NoticeLevel::Success, format!("Deleted {}", name));
        let _ = self.reload().await;
        Ok(true)
    }

    /// Delete every selected row, one awaited request at a time
    ///
    /// Returns the number actually deleted, or `None` when the user declined.
    pub async fn bulk_delete(&self, confirm: &dyn Confirm) -> Result<Option<usize>> {
        let names = self.selected().await;
        if names.is_empty() {
            return Err(Error::Validation("No artists selected".to_string()));
        }
        if !confirm.confirm(&format!(
            "Delete {} artist(s)? This cannot be undone.",
            names.len()
        )) {
            return Ok(None);
        }

        let mut deleted = 0;
        for name in &names {
            match self.backend.delete_artist(name).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!(artist = %name, "Bulk delete failed: {}", e),
            }
        }

        self.clear_selection().await;
        info!(deleted, requested = names.len(), "Bulk delete finished");
        self.state.events.notify(
            NoticeLevel::Success,
            format!("Deleted {} artist(s)", deleted),
        );
        let _ = self.reload().await;
        Ok(Some(deleted))
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Refresh one record from every source
    ///
    /// The trigger is awaited; polling starts only once the backend accepted it.
    pub async fn refresh_artist(&self, name: &str) -> Result<RefreshHandle> {
        if let Err(e) = self.backend.trigger_refresh(name, None).await {
            warn!(artist = %name, "Refresh trigger failed: {}", e);
            self.report(&e, "Network error triggering scraper");
            return Err(e);
        }

        self.state.events.notify(
            NoticeLevel::Info,
            format!("Scraper started for {}...", name),
        );
        self.coordinator
            .track(
                vec![name.to_string()],
                format!("Data refreshed for {}", name),
            )
            .await
    }

    /// Refresh every selected row from every source
    pub async fn bulk_refresh(&self) -> Result<RefreshHandle> {
        let names = self.selected().await;
        if names.is_empty() {
            return Err(Error::Validation("No artists selected".to_string()));
        }
        let count = names.len();
        self.state.events.notify(
            NoticeLevel::Info,
            format!("Starting refresh for {} artist(s)...", count),
        );
        self.coordinator
            .refresh(
                names,
                None,
                format!("Refresh complete for {} artist(s)", count),
            )
            .await
    }

    /// Refresh one column's source for the selection, or for every filtered
    /// row when nothing is selected
    ///
    /// Returns `None` when the user declined a large refresh.
    pub async fn refresh_column(
        &self,
        column: &str,
        confirm: &dyn Confirm,
    ) -> Result<Option<RefreshHandle>> {
        let Some(source) = columns::source_for(column) else {
            let message = format!("No data source for {}", columns::format_label(column));
            self.state
                .events
                .notify(NoticeLevel::Error, message.clone());
            return Err(Error::Validation(message));
        };

        let targets = {
            let dash = self.state.dash.read().await;
            if dash.selection.is_empty() {
                dash.matching_ids()
            } else {
                dash.selection.to_vec()
            }
        };
        if targets.is_empty() {
            self.state
                .events
                .notify(NoticeLevel::Error, "No artists to refresh");
            return Err(Error::Validation("No artists to refresh".to_string()));
        }

        if targets.len() > self.config.bulk_confirm_threshold
            && !confirm.confirm(&format!(
                "Refresh {} for {} artists? This may take a while.",
                source,
                targets.len()
            ))
        {
            return Ok(None);
        }

        self.state.events.notify(
            NoticeLevel::Info,
            format!("Refreshing {} for {} artist(s)...", source, targets.len()),
        );
        self.coordinator
            .refresh(
                targets,
                Some(source),
                format!("{} refresh complete", source.label()),
            )
            .await
            .map(Some)
    }

    /// Refresh the first few records of the roster from every source
    pub async fn refresh_all(&self) -> Result<RefreshHandle> {
        let names = {
            let dash = self.state.dash.read().await;
            dash.store.recent(self.config.refresh_all_count)
        };
        if names.is_empty() {
            self.state
                .events
                .notify(NoticeLevel::Error, "No artists to refresh");
            return Err(Error::Validation("No artists to refresh".to_string()));
        }

        let count = names.len();
        self.state.events.notify(
            NoticeLevel::Info,
            format!("Starting batch refresh ({} artists)...", count),
        );
        self.coordinator
            .refresh(
                names,
                None,
                format!("Batch refresh complete for {} artist(s)", count),
            )
            .await
    }

    /// Refresh named records, optionally from a single source
    pub async fn refresh_names(
        &self,
        names: Vec<String>,
        source: Option<RefreshSource>,
    ) -> Result<RefreshHandle> {
        let count = names.len();
        self.coordinator
            .refresh(
                names,
                source,
                format!("Refresh complete for {} artist(s)", count),
            )
            .await
    }
}
