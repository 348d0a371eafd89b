//! Upload session review state machine
//!
//! Guards the PendingReview → Approved | Rejected transitions. Every
//! transition is a compare-and-transition write: the status column is
//! updated only where it still holds the expected pre-state, so two
//! racing reviewer actions resolve to exactly one winner and the loser
//! observes an InvalidTransition reporting the status that actually
//! applied.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::models::{SessionStatus, UploadSession};
use crate::services::fingerprinter::compute_work_fingerprint;
use crate::services::temp_cleaner::{CleanupStatus, TempFileCleaner};
use podium_common::{Error, Result};

/// External collaborator that commits an approved session into the
/// permanent library.
pub trait LibraryCommitter: Send + Sync {
    /// Commit the approved session; returns the created piece id.
    fn commit(
        &self,
        session: &UploadSession,
    ) -> impl std::future::Future<Output = Result<Uuid>> + Send;
}

/// Result of a successful reviewer action
#[derive(Debug, Clone)]
pub struct ReviewReceipt {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub reviewed_at: DateTime<Utc>,
    /// Temp-file cleanup outcome, separate from the primary result
    pub cleanup: CleanupStatus,
}

/// Reviewer-facing service over the session state machine
pub struct ReviewService<C> {
    db: SqlitePool,
    cleaner: TempFileCleaner,
    committer: C,
}

impl<C: LibraryCommitter> ReviewService<C> {
    pub fn new(db: SqlitePool, cleaner: TempFileCleaner, committer: C) -> Self {
        Self {
            db,
            cleaner,
            committer,
        }
    }

    /// Reject a pending session.
    ///
    /// Guard order: unknown session, stale/terminal status, and finally
    /// the committed-origin check — a session that a library piece
    /// already references as its origin is never rejectable, even when
    /// its stored status still reads PendingReview.
    ///
    /// On success the audit fields are written once, atomically with the
    /// status change; temp-file cleanup is attempted afterwards and its
    /// failure never fails the reject.
    pub async fn reject(
        &self,
        session_id: Uuid,
        reviewer: &str,
        reason: Option<&str>,
    ) -> Result<ReviewReceipt> {
        let session = self.load_reviewable(session_id).await?;

        if db::pieces::find_by_origin(&self.db, session_id).await?.is_some() {
            tracing::warn!(
                %session_id,
                "Reject refused: session is already the origin of a library piece"
            );
            return Err(Error::InvalidTransition {
                current: SessionStatus::Committed.to_string(),
            });
        }

        let now = Utc::now();
        let routing = format!(
            "REJECTED by {}: {}",
            reviewer,
            reason.unwrap_or("no reason given")
        );

        self.transition(&session, SessionStatus::Rejected, reviewer, now, &routing)
            .await?;

        tracing::info!(%session_id, reviewer, "Session rejected");

        let cleanup = self.cleaner.remove_session_files(session_id).await;

        Ok(ReviewReceipt {
            session_id,
            status: SessionStatus::Rejected,
            reviewed_at: now,
            cleanup,
        })
    }

    /// Approve a pending session and hand it to the library committer.
    ///
    /// The state machine's responsibility ends at marking Approved; a
    /// committer failure propagates to the caller while the session
    /// stays Approved, so retrying the commit does not re-run the
    /// review transition.
    pub async fn approve(&self, session_id: Uuid, reviewer: &str) -> Result<ReviewReceipt> {
        let mut session = self.load_reviewable(session_id).await?;

        let now = Utc::now();
        let routing = format!("APPROVED by {} for library commit", reviewer);

        self.transition(&session, SessionStatus::Approved, reviewer, now, &routing)
            .await?;

        tracing::info!(%session_id, reviewer, "Session approved, handing off to committer");

        session.status = SessionStatus::Approved;
        session.reviewed_by = Some(reviewer.to_string());
        session.reviewed_at = Some(now);
        let piece_id = self.committer.commit(&session).await?;
        tracing::info!(%session_id, %piece_id, "Session committed to library");

        Ok(ReviewReceipt {
            session_id,
            status: SessionStatus::Approved,
            reviewed_at: now,
            cleanup: CleanupStatus::Skipped,
        })
    }

    async fn load_reviewable(&self, session_id: Uuid) -> Result<UploadSession> {
        let session = db::sessions::load_session(&self.db, session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;

        if !session.status.is_reviewable() {
            return Err(Error::InvalidTransition {
                current: session.status.to_string(),
            });
        }

        Ok(session)
    }

    async fn transition(
        &self,
        session: &UploadSession,
        next: SessionStatus,
        reviewer: &str,
        reviewed_at: DateTime<Utc>,
        routing: &str,
    ) -> Result<()> {
        let applied = db::sessions::try_transition(
            &self.db,
            session.session_id,
            SessionStatus::PendingReview,
            next,
            reviewer,
            reviewed_at,
            routing,
        )
        .await?;

        if applied {
            return Ok(());
        }

        // Lost the race: report whatever status the winner left behind
        let current = db::sessions::load_session(&self.db, session.session_id)
            .await?
            .map(|s| s.status.to_string())
            .ok_or_else(|| Error::NotFound(format!("session {}", session.session_id)))?;

        Err(Error::InvalidTransition { current })
    }
}

/// Default committer: creates the library piece row with this session as
/// its origin, then advances the session Approved → Committed.
pub struct PieceCommitter {
    db: SqlitePool,
}

impl PieceCommitter {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

impl LibraryCommitter for PieceCommitter {
    async fn commit(&self, session: &UploadSession) -> Result<Uuid> {
        let metadata = &session.extracted_metadata;
        let fingerprint = compute_work_fingerprint(
            &metadata.title,
            metadata.composer.as_deref(),
        )?;

        let piece_id = db::pieces::insert_piece(
            &self.db,
            &metadata.title,
            metadata.composer.as_deref(),
            &fingerprint.hash,
            Some(session.session_id),
        )
        .await?;

        db::sessions::mark_committed(&self.db, session.session_id).await?;

        Ok(piece_id)
    }
}
