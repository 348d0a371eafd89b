//! Best-effort temporary-file cleanup
//!
//! Sessions reaching Rejected or Committed have their in-flight upload
//! files removed. Cleanup is a side channel: its outcome is reported
//! separately from the primary operation and a failure never fails the
//! caller.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Outcome of a cleanup attempt, kept separate from the primary
/// operation result so tests can assert on each independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStatus {
    /// Session files existed and were removed
    Clean,
    /// No files to remove
    NothingToClean,
    /// Cleanup was not attempted for this operation
    Skipped,
    /// Removal failed; logged, never surfaced as an operation failure
    Failed(String),
}

/// Removes per-session temp directories under a configured root
#[derive(Debug, Clone)]
pub struct TempFileCleaner {
    temp_root: PathBuf,
}

impl TempFileCleaner {
    pub fn new(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
        }
    }

    /// Directory holding a session's in-flight files
    pub fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.temp_root.join(session_id.to_string())
    }

    /// Remove a session's temp files, best-effort.
    pub async fn remove_session_files(&self, session_id: Uuid) -> CleanupStatus {
        let dir = self.session_dir(session_id);

        let status = tokio::task::spawn_blocking(move || remove_dir(&dir)).await;

        match status {
            Ok(status) => {
                if let CleanupStatus::Failed(reason) = &status {
                    tracing::warn!(%session_id, reason, "Temp cleanup failed (non-fatal)");
                }
                status
            }
            Err(join_err) => {
                tracing::warn!(%session_id, error = %join_err, "Temp cleanup task failed (non-fatal)");
                CleanupStatus::Failed(join_err.to_string())
            }
        }
    }
}

fn remove_dir(dir: &Path) -> CleanupStatus {
    if !dir.exists() {
        return CleanupStatus::NothingToClean;
    }
    match std::fs::remove_dir_all(dir) {
        Ok(()) => CleanupStatus::Clean,
        Err(e) => CleanupStatus::Failed(e.to_string()),
    }
}
