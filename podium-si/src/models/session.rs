//! Upload session model and review status
//!
//! A session is created in PendingReview when an upload survives the
//! dedup gate, mutated exactly once by a reviewer action, and archived
//! after reaching Rejected or Committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ExtractedMetadata;
use podium_common::{Error, Result};

/// Review status of an upload session.
///
/// Transitions are monotonic: PendingReview → Approved | Rejected,
/// Approved → Committed. Nothing ever returns to PendingReview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Awaiting human review; the only mutable state
    PendingReview,
    /// Accepted by a reviewer, handed to the library committer
    Approved,
    /// Declined by a reviewer
    Rejected,
    /// Committed into the permanent library
    Committed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::PendingReview => "PENDING_REVIEW",
            SessionStatus::Approved => "APPROVED",
            SessionStatus::Rejected => "REJECTED",
            SessionStatus::Committed => "COMMITTED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "PENDING_REVIEW" => Ok(SessionStatus::PendingReview),
            "APPROVED" => Ok(SessionStatus::Approved),
            "REJECTED" => Ok(SessionStatus::Rejected),
            "COMMITTED" => Ok(SessionStatus::Committed),
            other => Err(Error::Internal(format!(
                "Unknown session status in store: {}",
                other
            ))),
        }
    }

    /// Whether a reviewer action may still apply
    pub fn is_reviewable(&self) -> bool {
        matches!(self, SessionStatus::PendingReview)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An upload session row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub session_id: Uuid,

    /// SHA-256 of the raw uploaded bytes (64 hex chars)
    pub source_sha256: String,

    pub file_name: String,
    pub mime_type: String,

    /// Validated extractor output
    pub extracted_metadata: ExtractedMetadata,

    /// Extractor's own confidence in its metadata (0-100)
    pub confidence_score: u8,

    pub status: SessionStatus,

    /// Write-once: set on the first terminal review transition
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,

    /// Audit trail; set at transition time, never overwritten
    pub routing_decision: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a session in PendingReview
#[derive(Debug, Clone)]
pub struct SessionDraft {
    pub session_id: Uuid,
    pub source_sha256: String,
    pub file_name: String,
    pub mime_type: String,
    pub extracted_metadata: ExtractedMetadata,
    pub confidence_score: u8,
}
