// Transaction port for atomic read-modify-write on the queue cursor

use crate::domain::{QueueCursor, QueueId};
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    ///
    /// Fails with `AppError::Conflict` when a concurrent writer committed a
    /// different revision of the record since it was read.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Transactional cursor operations
///
/// A transaction is scoped to exactly one cursor document (`metadata/<queue_id>`).
/// Committed revisions are numbered: the revision written by a commit is the
/// revision read plus one, where an absent document reads as revision 0.
#[async_trait]
pub trait TransactionalCursorStore: Send + Sync {
    /// Begin a new transaction on the cursor of `queue_id`
    async fn begin_transaction(&self, queue_id: &QueueId) -> Result<Box<dyn CursorTransaction>>;
}

/// Cursor operations within a transaction
#[async_trait]
pub trait CursorTransaction: Transaction {
    /// Read the cursor (within transaction); `None` when it was never created
    async fn get_cursor(&mut self) -> Result<Option<QueueCursor>>;

    /// Stage a write of both cursor fields (applied on commit)
    async fn set_cursor(&mut self, cursor: QueueCursor) -> Result<()>;
}
