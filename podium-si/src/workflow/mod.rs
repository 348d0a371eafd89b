//! Ingestion workflow orchestration

mod pipeline;

pub use pipeline::{IngestOutcome, IngestPipeline, IngestRequest};
