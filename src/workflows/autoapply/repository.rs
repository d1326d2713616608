use std::collections::HashSet;

use super::domain::{ApplicationEntry, JobId, ListingRecord, RunState};

/// Durable run state and deferred-job set.
pub trait StateStore {
    fn load_state(&self) -> Result<RunState, RepositoryError>;
    fn save_state(&self, state: &RunState) -> Result<(), RepositoryError>;
    fn load_deferred(&self) -> Result<Vec<ListingRecord>, RepositoryError>;
    /// Replaces the whole deferred set.
    fn save_deferred(&self, deferred: &[ListingRecord]) -> Result<(), RepositoryError>;
}

/// Append-only record of successful applications.
pub trait ApplicationLog {
    fn applied_ids(&self) -> Result<HashSet<JobId>, RepositoryError>;
    fn record(&self, entry: &ApplicationEntry) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("unable to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {path}: {message}")]
    Malformed { path: String, message: String },
}
