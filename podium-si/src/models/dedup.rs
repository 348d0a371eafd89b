//! Duplicate disposition types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the pipeline routes an upload relative to existing library content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicatePolicy {
    /// No match anywhere; process as a brand-new work
    NewPiece,
    /// Byte-identical re-upload; do not reprocess
    SkipDuplicate,
    /// Reviewer upgraded a fuzzy match into a new version of an
    /// existing piece
    VersionUpdate,
    /// Fuzzy work match; a human must decide
    ExceptionReview,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::NewPiece => "NEW_PIECE",
            DuplicatePolicy::SkipDuplicate => "SKIP_DUPLICATE",
            DuplicatePolicy::VersionUpdate => "VERSION_UPDATE",
            DuplicatePolicy::ExceptionReview => "EXCEPTION_REVIEW",
        }
    }
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a duplicate check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCheckResult {
    pub policy: DuplicatePolicy,
    pub is_duplicate: bool,
    /// Session holding the byte-identical original, for source matches
    pub matching_session_id: Option<Uuid>,
    /// Library piece with the matching work fingerprint, for work matches
    pub matching_piece_id: Option<Uuid>,
    /// Human-readable explanation for the audit trail
    pub reason: String,
}

/// An existing session found by source-hash lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMatch {
    pub session_id: Uuid,
}

/// An existing library piece found by work-fingerprint lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceMatch {
    pub piece_id: Uuid,
    pub title: String,
}
