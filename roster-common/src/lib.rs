//! # Roster Common Library
//!
//! Shared code for the roster dashboard crates:
//! - Record model (one tracked artist and its metric fields)
//! - Backend wire types for the `/api/*` endpoints
//! - Event types and the broadcast EventBus
//! - Configuration loading and resolution
//! - Error taxonomy

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod record;

pub use error::{Error, Result};
pub use record::{Cell, Record};
