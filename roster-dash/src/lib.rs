//! roster-dash library - roster dashboard view-state engine
//!
//! Derives the displayed table from the fetched roster under composable
//! search, filter, sort, pagination and column rules, tracks row selection
//! across re-renders, and detects completion of backend refresh jobs by
//! polling.

pub mod backend;
pub mod columns;
pub mod dashboard;
pub mod filter;
pub mod refresh;
pub mod reload;
pub mod selection;
pub mod state;
pub mod store;
pub mod table;
pub mod view;

pub use backend::{HttpBackend, RosterBackend};
pub use dashboard::{AssumeYes, Confirm, Dashboard};
pub use refresh::{RefreshCoordinator, RefreshHandle};
pub use table::TableView;
