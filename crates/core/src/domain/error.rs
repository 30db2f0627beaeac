// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid display name: {0}")]
    InvalidDisplayName(String),

    #[error("Invalid queue id: {0}")]
    InvalidQueueId(String),

    #[error("Cursor invariant violated: current {current}, last issued {last_issued}")]
    CursorInvariant { current: i64, last_issued: i64 },
}

pub type Result<T> = std::result::Result<T, DomainError>;
