//! The single error type returned by the public operations

use thiserror::Error;

use crate::ingest::IngestError;
use crate::leetcode::LeetCodeError;
use crate::store::StoreError;
use crate::sync::SyncError;

/// Failure of a user-facing operation
#[derive(Debug, Error)]
pub enum AppError {
    /// No user is signed in
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The request itself is malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The named entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// LeetCode could not be reached or refused the request
    #[error("External service error: {0}")]
    External(LeetCodeError),

    /// The catalog or progress store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The caller abandoned the operation
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message safe to show a user; never contains library or storage details
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotAuthenticated => "Not authenticated".to_string(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::External(e) if e.requires_new_session() => {
                "LeetCode session is missing or expired".to_string()
            }
            AppError::External(LeetCodeError::RateLimited { retry_after_seconds }) => {
                format!("LeetCode rate limit reached, retry in {} seconds", retry_after_seconds)
            }
            AppError::External(e) if e.is_recoverable() => {
                "LeetCode is unavailable, try again later".to_string()
            }
            AppError::External(_) => "Failed to fetch data from LeetCode".to_string(),
            AppError::Storage(_) => "Storage error".to_string(),
            AppError::Cancelled => "Operation cancelled".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Check if the failure is a missing user rather than a fault
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, AppError::NotAuthenticated)
    }
}

impl From<LeetCodeError> for AppError {
    fn from(e: LeetCodeError) -> Self {
        match e {
            LeetCodeError::Cancelled => AppError::Cancelled,
            e => AppError::External(e),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::MissingRoot(path) => {
                AppError::InvalidInput(format!("Data directory not found: {}", path.display()))
            }
            IngestError::Csv { path, .. } => {
                AppError::InvalidInput(format!("Unreadable CSV file: {}", path.display()))
            }
            IngestError::Store { source, .. } => AppError::Storage(source),
            IngestError::Cancelled { .. } => AppError::Cancelled,
            e @ (IngestError::Io { .. } | IngestError::Scan(_)) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl From<SyncError> for AppError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Cancelled { .. } => AppError::Cancelled,
        }
    }
}
