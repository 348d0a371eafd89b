//! Upload session database operations

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{
    ExtractedMetadata, PartInfo, SessionDraft, SessionMatch, SessionStatus, UploadSession,
};
use podium_common::{Error, Result};

/// Insert a new session in PendingReview.
pub async fn insert_session(pool: &SqlitePool, draft: &SessionDraft) -> Result<()> {
    let metadata = serde_json::to_string(&draft.extracted_metadata)
        .map_err(|e| Error::Internal(format!("Failed to serialize metadata: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO upload_sessions (
            session_id, source_sha256, file_name, mime_type,
            metadata, confidence_score, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(draft.session_id.to_string())
    .bind(&draft.source_sha256)
    .bind(&draft.file_name)
    .bind(&draft.mime_type)
    .bind(&metadata)
    .bind(draft.confidence_score as i64)
    .bind(SessionStatus::PendingReview.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a session by id.
pub async fn load_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<UploadSession>> {
    let row = sqlx::query(
        r#"
        SELECT session_id, source_sha256, file_name, mime_type,
               metadata, confidence_score, status,
               reviewed_by, reviewed_at, routing_decision, created_at
        FROM upload_sessions
        WHERE session_id = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let metadata: String = row.get("metadata");
            let extracted_metadata: ExtractedMetadata = serde_json::from_str(&metadata)
                .map_err(|e| Error::Internal(format!("Failed to deserialize metadata: {}", e)))?;

            let status: String = row.get("status");
            let status = SessionStatus::parse(&status)?;

            let reviewed_at: Option<String> = row.get("reviewed_at");
            let reviewed_at = reviewed_at
                .map(|s| parse_timestamp(&s, "reviewed_at"))
                .transpose()?;

            let created_at: String = row.get("created_at");
            let created_at = parse_timestamp(&created_at, "created_at")?;

            Ok(Some(UploadSession {
                session_id,
                source_sha256: row.get("source_sha256"),
                file_name: row.get("file_name"),
                mime_type: row.get("mime_type"),
                extracted_metadata,
                confidence_score: row.get::<i64, _>("confidence_score") as u8,
                status,
                reviewed_by: row.get("reviewed_by"),
                reviewed_at,
                routing_decision: row.get("routing_decision"),
                created_at,
            }))
        }
        None => Ok(None),
    }
}

/// Find another session with the same source hash (exact re-upload).
pub async fn find_by_source_hash(
    pool: &SqlitePool,
    source_sha256: &str,
    exclude_session_id: Uuid,
) -> Result<Option<SessionMatch>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT session_id FROM upload_sessions \
         WHERE source_sha256 = ? AND session_id != ? \
         ORDER BY created_at ASC LIMIT 1",
    )
    .bind(source_sha256)
    .bind(exclude_session_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some((session_id,)) => {
            let session_id = Uuid::parse_str(&session_id)
                .map_err(|e| Error::Internal(format!("Invalid UUID in store: {}", e)))?;
            Ok(Some(SessionMatch { session_id }))
        }
        None => Ok(None),
    }
}

/// Compare-and-transition: apply the status change and audit fields only
/// where the row still holds the expected pre-state and has never been
/// reviewed. Returns whether this call won the transition.
pub async fn try_transition(
    pool: &SqlitePool,
    session_id: Uuid,
    expected: SessionStatus,
    next: SessionStatus,
    reviewer: &str,
    reviewed_at: DateTime<Utc>,
    routing_decision: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE upload_sessions
        SET status = ?, reviewed_by = ?, reviewed_at = ?, routing_decision = ?
        WHERE session_id = ? AND status = ? AND reviewed_at IS NULL
        "#,
    )
    .bind(next.as_str())
    .bind(reviewer)
    .bind(reviewed_at.to_rfc3339())
    .bind(routing_decision)
    .bind(session_id.to_string())
    .bind(expected.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Advance Approved → Committed after the library commit lands.
pub async fn mark_committed(pool: &SqlitePool, session_id: Uuid) -> Result<()> {
    let result = sqlx::query(
        "UPDATE upload_sessions SET status = ? \
         WHERE session_id = ? AND status = ?",
    )
    .bind(SessionStatus::Committed.as_str())
    .bind(session_id.to_string())
    .bind(SessionStatus::Approved.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let current = load_session(pool, session_id)
            .await?
            .map(|s| s.status.to_string())
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;
        return Err(Error::InvalidTransition { current });
    }

    Ok(())
}

/// Record an estimated part. Keyed on the part fingerprint, so retries
/// are no-ops. Returns whether a new row was inserted.
pub async fn insert_part(
    pool: &SqlitePool,
    session_id: Uuid,
    part_fingerprint: &str,
    part: &PartInfo,
    chair: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO session_parts (
            part_fingerprint, session_id, instrument_name, part_name,
            chair, page_start, page_end, part_number
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(part_fingerprint)
    .bind(session_id.to_string())
    .bind(&part.instrument_name)
    .bind(&part.part_name)
    .bind(chair)
    .bind(part.page_range[0] as i64)
    .bind(part.page_range[1] as i64)
    .bind(part.estimated_part_number as i64)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Number of part rows recorded for a session.
pub async fn count_parts(pool: &SqlitePool, session_id: Uuid) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM session_parts WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_one(pool)
            .await?;
    Ok(count)
}

fn parse_timestamp(s: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", field, e)))
}
