//! Sync error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors from a local recipe store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("recipe not found: {0}")]
    NotFound(String),

    /// The requested change would break a store invariant (e.g. duplicate remote id).
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Errors that abort a sync pass. A failed pass never leaves a partial merge behind.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Listing the remote catalog failed.
    #[error("Failed to list recipes: {0}")]
    ListFailed(#[source] ApiError),

    /// Fetching one recipe's detail failed; the whole pass is abandoned.
    #[error("Failed to fetch recipe '{slug}': {source}")]
    DetailFetchFailed {
        slug: String,
        #[source]
        source: ApiError,
    },

    /// Fetching the server's favorites list failed.
    #[error("Failed to fetch favorites: {0}")]
    FavoritesFailed(#[source] ApiError),

    /// The reconciled changes could not be persisted; the store is unchanged.
    #[error("Failed to save synced recipes: {0}")]
    CommitFailed(#[source] StoreError),

    /// Reading the baseline or recording the sync time failed.
    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// The API error behind a remote failure, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SyncError::ListFailed(e)
            | SyncError::FavoritesFailed(e)
            | SyncError::DetailFetchFailed { source: e, .. } => Some(e),
            _ => None,
        }
    }
}
