// Central Error Type for the Application

use crate::domain::DomainError;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Empty or malformed input, rejected before any store access
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Cursor transaction retries exhausted
    #[error("Allocation conflict: {0}")]
    AllocationConflict(String),

    /// A single transaction attempt lost a race (retried internally)
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Cursor document absent (resolved by lazy creation)
    #[error("Queue not initialized: {0}")]
    NotInitialized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Transient errors the transaction runner may retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidDisplayName(_) | DomainError::InvalidQueueId(_) => {
                AppError::InvalidInput(err.to_string())
            }
            DomainError::CursorInvariant { .. } => AppError::Internal(err.to_string()),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by mapping to AppError::StoreUnavailable / AppError::Conflict
