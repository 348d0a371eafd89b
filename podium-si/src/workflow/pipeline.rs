//! Ingestion pipeline orchestrator
//!
//! Runs one submitted file through the decision stages:
//! metadata validation → fingerprinting → dedup lookup → structural
//! analysis → session persistence. Each stage emits a progress event;
//! the job always ends with a terminal `completed` or `failed` event
//! regardless of whether anyone is observing.
//!
//! # Error handling
//! - Validation and fingerprinting failures are fatal to the job (no
//!   sensible fallback exists) and surface as a `failed` event.
//! - Structural-analysis failures are recoverable: the analyzer
//!   degrades to a confidence-0 result and the session still reaches
//!   PendingReview for human judgment.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::models::{
    DuplicateCheckResult, DuplicatePolicy, ExtractedMetadata, PartAnalysis, SessionDraft,
};
use crate::services::dedup_policy::DedupChecker;
use crate::services::fingerprinter::{
    compute_part_fingerprint, compute_sha256, compute_work_fingerprint,
};
use crate::services::pdf_analyzer::PdfAnalyzer;
use podium_common::events::{IngestEvent, IngestSummary, ProgressBus};
use podium_common::Result;

/// One submitted file, as handed over by the upload orchestration layer
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// Raw extractor output; validated once at the pipeline boundary
    pub metadata: serde_json::Value,
    /// Extractor's confidence in its own metadata (0-100)
    pub confidence_score: u8,
}

/// Final routing decision for one submission
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub job_id: Uuid,
    /// Session created in PendingReview; None for exact re-uploads
    pub session_id: Option<Uuid>,
    pub disposition: DuplicateCheckResult,
    /// Structural analysis; None when the dedup gate short-circuited
    pub analysis: Option<PartAnalysis>,
}

/// Pipeline orchestrator
pub struct IngestPipeline {
    db: SqlitePool,
    bus: ProgressBus,
    checker: DedupChecker,
    analyzer: PdfAnalyzer,
}

impl IngestPipeline {
    pub fn new(db: SqlitePool, bus: ProgressBus, analyzer: PdfAnalyzer) -> Self {
        let checker = DedupChecker::new(db.clone());
        Self {
            db,
            bus,
            checker,
            analyzer,
        }
    }

    /// Run the full ingestion job for one file.
    ///
    /// Always emits a terminal event before returning; observers never
    /// see a job end without one.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome> {
        let job_id = Uuid::new_v4();
        // Allocated up front so progress events carry the filter key
        // the uploading client was handed
        let session_id = Uuid::new_v4();

        tracing::info!(%job_id, file_name = %request.file_name, "Ingest job started");

        match self.run(job_id, session_id, request).await {
            Ok(outcome) => {
                let summary = IngestSummary {
                    policy: outcome.disposition.policy.to_string(),
                    session_id: outcome.session_id,
                    part_count: outcome
                        .analysis
                        .as_ref()
                        .map(|a| a.estimated_parts.len())
                        .unwrap_or(0),
                    confidence: outcome
                        .analysis
                        .as_ref()
                        .map(|a| a.confidence)
                        .unwrap_or(0),
                };
                self.bus
                    .emit(IngestEvent::completed(job_id, Some(session_id), summary));
                tracing::info!(
                    %job_id,
                    policy = %outcome.disposition.policy,
                    "Ingest job completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.bus
                    .emit(IngestEvent::failed(job_id, Some(session_id), e.to_string()));
                tracing::error!(%job_id, error = %e, "Ingest job failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        job_id: Uuid,
        session_id: Uuid,
        request: IngestRequest,
    ) -> Result<IngestOutcome> {
        // Stage 1: validate the extractor blob into the closed schema
        self.progress(job_id, session_id, "validating_metadata", 10);
        let metadata = ExtractedMetadata::from_value(&request.metadata)?;

        // Stage 2: fingerprints
        self.progress(job_id, session_id, "fingerprinting", 30);
        let source_sha256 = compute_sha256(&request.bytes);
        let work_fingerprint =
            compute_work_fingerprint(&metadata.title, metadata.composer.as_deref())?;

        // Stage 3: duplicate disposition
        self.progress(job_id, session_id, "duplicate_check", 55);
        let disposition = self
            .checker
            .resolve(&source_sha256, &work_fingerprint, session_id)
            .await?;

        if disposition.policy == DuplicatePolicy::SkipDuplicate {
            // Exact re-upload: no session row, no further work
            tracing::info!(%job_id, reason = %disposition.reason, "Skipping exact duplicate");
            return Ok(IngestOutcome {
                job_id,
                session_id: None,
                disposition,
                analysis: None,
            });
        }

        // Stage 4: structural analysis (never fails the job)
        self.progress(job_id, session_id, "structural_analysis", 80);
        let analysis = self.analyzer.analyze(request.bytes, Some(&metadata)).await;

        // Stage 5: persist the session in PendingReview
        self.progress(job_id, session_id, "persisting_session", 95);
        db::sessions::insert_session(
            &self.db,
            &SessionDraft {
                session_id,
                source_sha256,
                file_name: request.file_name,
                mime_type: request.mime_type,
                extracted_metadata: metadata.clone(),
                confidence_score: request.confidence_score,
            },
        )
        .await?;

        for (i, part) in analysis.estimated_parts.iter().enumerate() {
            let chair = metadata
                .asserts_multi_part()
                .then(|| metadata.parts.get(i).and_then(|p| p.chair.as_deref()))
                .flatten();

            let fingerprint = compute_part_fingerprint(
                session_id,
                &part.instrument_name,
                chair,
                part.page_range[0],
                part.page_range[1],
            )?;

            db::sessions::insert_part(&self.db, session_id, &fingerprint, part, chair).await?;
        }

        Ok(IngestOutcome {
            job_id,
            session_id: Some(session_id),
            disposition,
            analysis: Some(analysis),
        })
    }

    fn progress(&self, job_id: Uuid, session_id: Uuid, step: &str, percent: u8) {
        self.bus.emit(IngestEvent::progress(
            job_id,
            Some(session_id),
            step,
            percent,
            format!("running {}", step),
        ));
    }
}
