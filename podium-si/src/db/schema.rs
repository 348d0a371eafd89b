//! Database schema

use sqlx::SqlitePool;

use podium_common::Result;

/// Create all tables and indexes if they do not exist.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS upload_sessions (
            session_id TEXT PRIMARY KEY,
            source_sha256 TEXT NOT NULL,
            file_name TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            metadata TEXT NOT NULL,
            confidence_score INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'PENDING_REVIEW',
            reviewed_by TEXT,
            reviewed_at TEXT,
            routing_decision TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_upload_sessions_hash \
         ON upload_sessions(source_sha256)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pieces (
            piece_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            composer TEXT,
            work_fingerprint TEXT NOT NULL,
            origin_session_id TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pieces_fingerprint \
         ON pieces(work_fingerprint)",
    )
    .execute(pool)
    .await?;

    // Part rows are keyed on the part fingerprint so creation is
    // idempotent under job retries
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_parts (
            part_fingerprint TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            instrument_name TEXT NOT NULL,
            part_name TEXT NOT NULL,
            chair TEXT,
            page_start INTEGER NOT NULL,
            page_end INTEGER NOT NULL,
            part_number INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_session_parts_session \
         ON session_parts(session_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
