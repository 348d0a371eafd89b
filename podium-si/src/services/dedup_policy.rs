//! Duplicate policy resolution
//!
//! Two lookups feed one disposition. An exact source-hash match is
//! authoritative: reprocessing identical bytes wastes pipeline work and
//! risks duplicate library entries. A work-fingerprint match is only a
//! fuzzy signal: two arrangements can legitimately share a title, so it
//! always routes to a human, never to an automatic skip.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::models::{DuplicateCheckResult, DuplicatePolicy, PieceMatch, SessionMatch};
use crate::services::fingerprinter::WorkFingerprint;
use podium_common::Result;

/// Disposition for a source-hash lookup result.
pub fn check_source_duplicate(
    hash: &str,
    existing: Option<&SessionMatch>,
) -> DuplicateCheckResult {
    match existing {
        Some(found) => DuplicateCheckResult {
            policy: DuplicatePolicy::SkipDuplicate,
            is_duplicate: true,
            matching_session_id: Some(found.session_id),
            matching_piece_id: None,
            reason: format!(
                "Identical content (sha256 {}) already uploaded as session {}",
                &hash[..hash.len().min(12)],
                found.session_id
            ),
        },
        None => clean_new_piece(),
    }
}

/// Disposition for a work-fingerprint lookup result.
pub fn check_work_duplicate(
    fingerprint: &WorkFingerprint,
    existing: Option<&PieceMatch>,
) -> DuplicateCheckResult {
    match existing {
        Some(found) => DuplicateCheckResult {
            policy: DuplicatePolicy::ExceptionReview,
            is_duplicate: true,
            matching_session_id: None,
            matching_piece_id: Some(found.piece_id),
            reason: format!(
                "Existing piece '{}' matches normalized title/composer ({}); \
                 requires librarian review",
                found.title, fingerprint.hash
            ),
        },
        None => clean_new_piece(),
    }
}

/// Combine both checks into the final disposition.
///
/// Strict priority: an exact source match wins and is returned verbatim;
/// otherwise a work match is returned verbatim; otherwise a clean
/// NewPiece result is synthesized. The ordering encodes the confidence
/// asymmetry between byte-exact and fuzzy matching.
pub fn resolve_deduplication_policy(
    source_result: DuplicateCheckResult,
    work_result: DuplicateCheckResult,
) -> DuplicateCheckResult {
    if source_result.is_duplicate {
        return source_result;
    }
    if work_result.is_duplicate {
        return work_result;
    }
    clean_new_piece()
}

fn clean_new_piece() -> DuplicateCheckResult {
    DuplicateCheckResult {
        policy: DuplicatePolicy::NewPiece,
        is_duplicate: false,
        matching_session_id: None,
        matching_piece_id: None,
        reason: "No duplicate found".to_string(),
    }
}

/// Store-facing duplicate checker.
///
/// Performs the session-by-source-hash and piece-by-work-fingerprint
/// lookups and feeds the pure policy functions above.
pub struct DedupChecker {
    db: SqlitePool,
}

impl DedupChecker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Look up both match kinds and resolve the final disposition.
    ///
    /// `current_session_id` excludes the in-flight session itself from
    /// the source lookup, so a retried job does not match its own row.
    pub async fn resolve(
        &self,
        source_sha256: &str,
        fingerprint: &WorkFingerprint,
        current_session_id: Uuid,
    ) -> Result<DuplicateCheckResult> {
        let session_match =
            db::sessions::find_by_source_hash(&self.db, source_sha256, current_session_id)
                .await?;
        let source_result = check_source_duplicate(source_sha256, session_match.as_ref());

        let piece_match = db::pieces::find_by_fingerprint(&self.db, &fingerprint.hash).await?;
        let work_result = check_work_duplicate(fingerprint, piece_match.as_ref());

        let resolved = resolve_deduplication_policy(source_result, work_result);
        tracing::debug!(
            policy = %resolved.policy,
            is_duplicate = resolved.is_duplicate,
            "Resolved deduplication policy"
        );
        Ok(resolved)
    }
}
