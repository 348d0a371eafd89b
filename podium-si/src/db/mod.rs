//! SQLite store for upload sessions and library pieces

pub mod pieces;
pub mod schema;
pub mod sessions;

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use podium_common::Result;

/// Open (creating if missing) the database at `path` and ensure the
/// schema exists.
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    schema::create_schema(&pool).await?;
    Ok(pool)
}
