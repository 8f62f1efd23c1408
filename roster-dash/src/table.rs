//! Owned, render-ready snapshot of the projected table
//!
//! A `TableView` is built under the state lock and handed to the front end,
//! which never touches live state while drawing.

use std::fmt::Write as _;

use roster_common::Record;

use crate::columns::{self, RefreshSource};
use crate::selection::{HeaderCheckbox, SelectionSet};
use crate::state::{PendingEdits, ViewState};
use crate::view::{Projection, SortDirection};

/// Placeholder for empty read-only cells
const EMPTY_READ_ONLY: &str = "--";

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHeader {
    pub id: String,
    pub label: String,
    /// Source a per-column refresh would target
    pub source: Option<RefreshSource>,
    /// Set on the active sort column
    pub sort: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub name: String,
    /// Cell text in visible column order, pending edits applied
    pub cells: Vec<String>,
    pub selected: bool,
    /// Has unsaved edits
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub title: String,
    pub columns: Vec<ColumnHeader>,
    pub rows: Vec<TableRow>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matching: usize,
    pub header_checkbox: HeaderCheckbox,
    pub selected_count: usize,
}

impl TableView {
    pub fn build(
        projection: &Projection<'_>,
        view: &ViewState,
        selection: &SelectionSet,
        edits: &PendingEdits,
        matching_ids: &[String],
    ) -> Self {
        let columns = view
            .columns
            .visible()
            .iter()
            .map(|id| ColumnHeader {
                id: id.clone(),
                label: columns::format_label(id),
                source: columns::source_for(id),
                sort: (view.sort.column == *id).then_some(view.sort.direction),
            })
            .collect::<Vec<_>>();

        let rows = projection
            .rows
            .iter()
            .map(|record| build_row(record, &columns, selection, edits))
            .collect();

        let title = if view.query.is_empty() {
            "Artists".to_string()
        } else {
            format!("Results for \"{}\"", view.query)
        };

        Self {
            title,
            columns,
            rows,
            page: projection.page,
            total_pages: projection.total_pages,
            total_matching: projection.total_matching,
            header_checkbox: selection.header_state(matching_ids),
            selected_count: selection.len(),
        }
    }

    /// "Page 2 of 5 (212 artists)"
    pub fn page_label(&self) -> String {
        format!(
            "Page {} of {} ({} artists)",
            self.page, self.total_pages, self.total_matching
        )
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Plain-text rendering with aligned columns
    pub fn render_text(&self) -> String {
        let mut widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| header_text(c).chars().count())
            .collect();
        for row in &self.rows {
            for (i, cell) in row.cells.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);

        let check = match self.header_checkbox {
            HeaderCheckbox::Unchecked => "[ ]",
            HeaderCheckbox::Indeterminate => "[-]",
            HeaderCheckbox::Checked => "[x]",
        };
        out.push_str(check);
        for (col, width) in self.columns.iter().zip(&widths) {
            let _ = write!(out, "  {:<width$}", header_text(col), width = width);
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(if row.selected { "[x]" } else { "[ ]" });
            for (cell, width) in row.cells.iter().zip(&widths) {
                let _ = write!(out, "  {:<width$}", cell, width = width);
            }
            if row.dirty {
                out.push_str("  *");
            }
            out.push('\n');
        }

        let _ = write!(out, "{}", self.page_label());
        if self.selected_count > 0 {
            let _ = write!(out, "  |  {} selected", self.selected_count);
        }
        out.push('\n');
        out
    }
}

fn header_text(col: &ColumnHeader) -> String {
    match col.sort {
        Some(SortDirection::Ascending) => format!("{} ^", col.label),
        Some(SortDirection::Descending) => format!("{} v", col.label),
        None => col.label.clone(),
    }
}

fn build_row(
    record: &Record,
    columns: &[ColumnHeader],
    selection: &SelectionSet,
    edits: &PendingEdits,
) -> TableRow {
    let name = record.name().to_string();
    let cells = columns
        .iter()
        .map(|col| {
            if let Some(pending) = edits.get(&name, &col.id) {
                return pending.to_string();
            }
            let text = record.get(&col.id).to_text().into_owned();
            if text.is_empty() && columns::is_read_only(&col.id) {
                EMPTY_READ_ONLY.to_string()
            } else {
                text
            }
        })
        .collect();

    TableRow {
        selected: selection.contains(&name),
        dirty: edits.is_dirty(&name),
        cells,
        name,
    }
}
