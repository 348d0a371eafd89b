//! Review state machine integration tests
//!
//! Exercises the full guard ladder against a real (in-memory) store:
//! unknown sessions, stale statuses, committed-origin backreferences,
//! racing reviewers, and the cleanup side channel.

use std::sync::{Arc, Mutex};

use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use podium_common::{Error, Result};
use podium_si::db;
use podium_si::db::schema::create_schema;
use podium_si::models::{ExtractedMetadata, SessionDraft, SessionStatus, UploadSession};
use podium_si::services::fingerprinter::{compute_sha256, compute_work_fingerprint};
use podium_si::services::review_service::{LibraryCommitter, PieceCommitter, ReviewService};
use podium_si::services::temp_cleaner::{CleanupStatus, TempFileCleaner};

/// Committer double: records handed-off sessions, touches nothing.
#[derive(Clone, Default)]
struct RecordingCommitter {
    committed: Arc<Mutex<Vec<Uuid>>>,
}

impl LibraryCommitter for RecordingCommitter {
    async fn commit(&self, session: &UploadSession) -> Result<Uuid> {
        self.committed.lock().unwrap().push(session.session_id);
        Ok(Uuid::new_v4())
    }
}

async fn setup_pool() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    create_schema(&pool).await.unwrap();
    pool
}

async fn insert_pending(pool: &SqlitePool, title: &str) -> Uuid {
    let session_id = Uuid::new_v4();
    db::sessions::insert_session(
        pool,
        &SessionDraft {
            session_id,
            source_sha256: compute_sha256(session_id.as_bytes()),
            file_name: "upload.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            extracted_metadata: ExtractedMetadata::from_value(&json!({
                "title": title,
                "composer": "Sousa"
            }))
            .unwrap(),
            confidence_score: 70,
        },
    )
    .await
    .unwrap();
    session_id
}

fn service(
    pool: &SqlitePool,
    temp_root: &std::path::Path,
) -> ReviewService<RecordingCommitter> {
    ReviewService::new(
        pool.clone(),
        TempFileCleaner::new(temp_root),
        RecordingCommitter::default(),
    )
}

#[tokio::test]
async fn reject_writes_status_and_audit_fields_once() {
    let pool = setup_pool().await;
    let temp = tempfile::tempdir().unwrap();
    let session_id = insert_pending(&pool, "The Thunderer").await;

    let receipt = service(&pool, temp.path())
        .reject(session_id, "alex", Some("duplicate of shelf copy"))
        .await
        .unwrap();

    assert_eq!(receipt.status, SessionStatus::Rejected);
    assert_eq!(receipt.cleanup, CleanupStatus::NothingToClean);

    let session = db::sessions::load_session(&pool, session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Rejected);
    assert_eq!(session.reviewed_by.as_deref(), Some("alex"));
    assert!(session.reviewed_at.is_some());
    let routing = session.routing_decision.unwrap();
    assert!(routing.contains("alex"));
    assert!(routing.contains("duplicate of shelf copy"));
}

#[tokio::test]
async fn reject_unknown_session_is_not_found() {
    let pool = setup_pool().await;
    let temp = tempfile::tempdir().unwrap();

    let err = service(&pool, temp.path())
        .reject(Uuid::new_v4(), "alex", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn reject_approved_session_reports_current_status_and_changes_nothing() {
    let pool = setup_pool().await;
    let temp = tempfile::tempdir().unwrap();
    let session_id = insert_pending(&pool, "Washington Post").await;

    let svc = service(&pool, temp.path());
    svc.approve(session_id, "alex").await.unwrap();

    let before = db::sessions::load_session(&pool, session_id)
        .await
        .unwrap()
        .unwrap();

    let err = svc.reject(session_id, "sam", Some("late")).await.unwrap_err();
    assert_eq!(err.current_status(), Some("APPROVED"));

    // Status and write-once audit fields are untouched by the failed reject
    let after = db::sessions::load_session(&pool, session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.status, SessionStatus::Approved);
    assert_eq!(after.reviewed_by, before.reviewed_by);
    assert_eq!(after.reviewed_at, before.reviewed_at);
    assert_eq!(after.routing_decision, before.routing_decision);
}

#[tokio::test]
async fn second_reject_fails_without_double_writing_audit() {
    let pool = setup_pool().await;
    let temp = tempfile::tempdir().unwrap();
    let session_id = insert_pending(&pool, "Semper Fidelis").await;

    let svc = service(&pool, temp.path());
    svc.reject(session_id, "alex", Some("first")).await.unwrap();

    let err = svc
        .reject(session_id, "sam", Some("second"))
        .await
        .unwrap_err();
    assert_eq!(err.current_status(), Some("REJECTED"));

    let session = db::sessions::load_session(&pool, session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.reviewed_by.as_deref(), Some("alex"));
    assert!(session.routing_decision.unwrap().contains("first"));
}

#[tokio::test]
async fn reject_refused_when_a_piece_references_the_session_even_if_status_stale() {
    let pool = setup_pool().await;
    let temp = tempfile::tempdir().unwrap();
    let session_id = insert_pending(&pool, "El Capitan").await;

    // Some other code path committed a piece from this session but left
    // the session status stale at PENDING_REVIEW
    let fp = compute_work_fingerprint("El Capitan", Some("Sousa")).unwrap();
    db::pieces::insert_piece(&pool, "El Capitan", Some("Sousa"), &fp.hash, Some(session_id))
        .await
        .unwrap();

    let err = service(&pool, temp.path())
        .reject(session_id, "alex", None)
        .await
        .unwrap_err();
    assert_eq!(err.current_status(), Some("COMMITTED"));

    // The stale row itself is untouched
    let session = db::sessions::load_session(&pool, session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::PendingReview);
}

#[tokio::test]
async fn concurrent_rejects_resolve_to_exactly_one_winner() {
    let pool = setup_pool().await;
    let temp = tempfile::tempdir().unwrap();
    let session_id = insert_pending(&pool, "Hands Across the Sea").await;

    let svc = service(&pool, temp.path());
    let (a, b) = tokio::join!(
        svc.reject(session_id, "alex", Some("race a")),
        svc.reject(session_id, "sam", Some("race b")),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one concurrent reject must win");

    let loser_err = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert_eq!(loser_err.current_status(), Some("REJECTED"));
}

#[tokio::test]
async fn approve_hands_the_session_to_the_committer() {
    let pool = setup_pool().await;
    let temp = tempfile::tempdir().unwrap();
    let session_id = insert_pending(&pool, "The Liberty Bell").await;

    let committer = RecordingCommitter::default();
    let svc = ReviewService::new(
        pool.clone(),
        TempFileCleaner::new(temp.path()),
        committer.clone(),
    );

    let receipt = svc.approve(session_id, "alex").await.unwrap();
    assert_eq!(receipt.status, SessionStatus::Approved);
    assert_eq!(receipt.cleanup, CleanupStatus::Skipped);
    assert_eq!(*committer.committed.lock().unwrap(), vec![session_id]);

    let session = db::sessions::load_session(&pool, session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Approved);
    assert_eq!(session.reviewed_by.as_deref(), Some("alex"));
}

#[tokio::test]
async fn piece_committer_advances_to_committed_and_blocks_later_reject() {
    let pool = setup_pool().await;
    let temp = tempfile::tempdir().unwrap();
    let session_id = insert_pending(&pool, "King Cotton").await;

    let svc = ReviewService::new(
        pool.clone(),
        TempFileCleaner::new(temp.path()),
        PieceCommitter::new(pool.clone()),
    );
    svc.approve(session_id, "alex").await.unwrap();

    let session = db::sessions::load_session(&pool, session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Committed);

    // The committed piece backreferences the session
    assert!(db::pieces::find_by_origin(&pool, session_id)
        .await
        .unwrap()
        .is_some());

    let err = svc.reject(session_id, "sam", None).await.unwrap_err();
    assert_eq!(err.current_status(), Some("COMMITTED"));
}

#[tokio::test]
async fn cleanup_failure_reports_in_side_channel_and_reject_still_succeeds() {
    let pool = setup_pool().await;
    let temp = tempfile::tempdir().unwrap();
    let session_id = insert_pending(&pool, "Manhattan Beach").await;

    // Poison the session's temp path: a plain file where the cleaner
    // expects a directory
    let cleaner = TempFileCleaner::new(temp.path());
    std::fs::File::create(cleaner.session_dir(session_id)).unwrap();

    let svc = ReviewService::new(pool.clone(), cleaner, RecordingCommitter::default());
    let receipt = svc.reject(session_id, "alex", None).await.unwrap();

    assert_eq!(receipt.status, SessionStatus::Rejected);
    assert!(matches!(receipt.cleanup, CleanupStatus::Failed(_)));

    let session = db::sessions::load_session(&pool, session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Rejected);
}
