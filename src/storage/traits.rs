//! Storage traits and error types
//!
//! This module defines the trait interface for savestate backends and
//! associated error types.

use crate::crawler::{FrontierSnapshot, PendingEntry};
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for savestate backends
///
/// The orchestrator is the only user, so implementations need not be
/// shareable between threads, only movable.
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Sets the final status and the finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Frontier Persistence =====

    /// Applies queue changes and newly visited URLs in one transaction
    ///
    /// `enqueued` entries go to the back of the saved queue, replacing any
    /// older row for the same URL, unless the URL is already visited. Each
    /// `visited` URL then leaves the queue for the visited set.
    fn record_progress(&mut self, enqueued: &[PendingEntry], visited: &[String])
        -> StorageResult<()>;

    /// Loads the saved frontier
    fn load_frontier(&self) -> StorageResult<FrontierSnapshot>;

    /// Number of saved pending URLs
    fn count_pending(&self) -> StorageResult<u64>;

    /// Number of saved visited URLs
    fn count_visited(&self) -> StorageResult<u64>;

    /// Removes all runs and frontier data
    fn clear(&mut self) -> StorageResult<()>;
}
