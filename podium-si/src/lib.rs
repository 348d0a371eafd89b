//! # Podium Score Ingest (podium-si)
//!
//! Ingestion decision engine for the Podium sheet-music library:
//! - Content/work/part fingerprinting
//! - Duplicate policy resolution (exact vs. fuzzy matches)
//! - PDF structural analysis (multi-part detection)
//! - Upload-session review state machine
//! - Ingestion pipeline with progress-event fan-out

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod workflow;
