//! Storage module for the crawl savestate
//!
//! This module persists enough of a crawl to resume it later:
//! - Run tracking with status and config hash
//! - The pending queue with depth, parent and retry counts
//! - The set of URLs that already reached a terminal outcome

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::crawler::FrontierSnapshot;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

impl RunRecord {
    /// Whether the run ended in a state that may be picked up again
    pub fn is_resumable(&self) -> bool {
        matches!(self.status, RunStatus::Running | RunStatus::Interrupted)
    }
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// An opened savestate bound to the run that will write into it
pub struct Savestate {
    pub storage: Box<dyn Storage>,
    pub run_id: i64,
    /// Frontier left by a previous run, if one is being resumed
    pub restored: Option<FrontierSnapshot>,
}

impl Savestate {
    /// Opens the savestate and either resumes the latest unfinished run or
    /// starts a new one
    ///
    /// # Arguments
    ///
    /// * `storage` - The backend to use
    /// * `config_hash` - Hash of the current configuration
    /// * `fresh` - Discard all saved state before starting
    pub fn open(
        mut storage: Box<dyn Storage>,
        config_hash: &str,
        fresh: bool,
    ) -> StorageResult<Self> {
        if fresh {
            tracing::info!("Clearing saved crawl state");
            storage.clear()?;
        }

        if let Some(latest) = storage.get_latest_run()? {
            if latest.is_resumable() && storage.count_pending()? > 0 {
                if latest.config_hash != config_hash {
                    tracing::warn!(
                        "Configuration changed since run {} was started, resuming anyway",
                        latest.id
                    );
                }

                let restored = storage.load_frontier()?;
                tracing::info!(
                    "Resuming run {} with {} pending and {} visited URLs",
                    latest.id,
                    restored.pending.len(),
                    restored.visited.len()
                );
                storage.update_run_status(latest.id, RunStatus::Running)?;

                return Ok(Self {
                    storage,
                    run_id: latest.id,
                    restored: Some(restored),
                });
            }
        }

        // A finished run leaves nothing worth resuming.
        storage.clear()?;
        let run_id = storage.create_run(config_hash)?;
        tracing::info!("Starting new run {}", run_id);

        Ok(Self {
            storage,
            run_id,
            restored: None,
        })
    }
}
