//! # Podium Common Library
//!
//! Shared code for the Podium score-ingest services including:
//! - Error types (Error enum, Result alias)
//! - Ingest event types and the ProgressBus
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
