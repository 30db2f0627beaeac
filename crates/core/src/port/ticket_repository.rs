// Ticket Repository Port (Interface)

use crate::domain::{QueueId, Ticket};
use crate::error::Result;
use async_trait::async_trait;

/// Append-only ticket persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Insert a new ticket and notify ticket-set subscribers
    async fn insert(&self, ticket: &Ticket) -> Result<()>;

    /// Read every ticket of a queue (any order)
    async fn list_by_queue(&self, queue_id: &QueueId) -> Result<Vec<Ticket>>;
}
