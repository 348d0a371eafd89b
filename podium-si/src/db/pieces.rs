//! Library piece database operations

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::PieceMatch;
use podium_common::{Error, Result};

/// Insert a library piece. `origin_session_id` backreferences the upload
/// session the piece was committed from.
pub async fn insert_piece(
    pool: &SqlitePool,
    title: &str,
    composer: Option<&str>,
    work_fingerprint: &str,
    origin_session_id: Option<Uuid>,
) -> Result<Uuid> {
    let piece_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO pieces (
            piece_id, title, composer, work_fingerprint,
            origin_session_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(piece_id.to_string())
    .bind(title)
    .bind(composer)
    .bind(work_fingerprint)
    .bind(origin_session_id.map(|id| id.to_string()))
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(piece_id)
}

/// Find a piece whose normalized title+composer fingerprint matches.
pub async fn find_by_fingerprint(
    pool: &SqlitePool,
    work_fingerprint: &str,
) -> Result<Option<PieceMatch>> {
    let row: Option<(String, String)> = sqlx::query_as(
        "SELECT piece_id, title FROM pieces \
         WHERE work_fingerprint = ? \
         ORDER BY created_at ASC LIMIT 1",
    )
    .bind(work_fingerprint)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((piece_id, title)) => {
            let piece_id = Uuid::parse_str(&piece_id)
                .map_err(|e| Error::Internal(format!("Invalid UUID in store: {}", e)))?;
            Ok(Some(PieceMatch { piece_id, title }))
        }
        None => Ok(None),
    }
}

/// Find the piece (if any) that references this session as its origin.
/// Used by the reject guard: a session a piece was committed from is
/// never rejectable.
pub async fn find_by_origin(pool: &SqlitePool, session_id: Uuid) -> Result<Option<Uuid>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT piece_id FROM pieces WHERE origin_session_id = ? LIMIT 1",
    )
    .bind(session_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some((piece_id,)) => {
            let piece_id = Uuid::parse_str(&piece_id)
                .map_err(|e| Error::Internal(format!("Invalid UUID in store: {}", e)))?;
            Ok(Some(piece_id))
        }
        None => Ok(None),
    }
}
