// Allocator - reserves unique positions and creates tickets

use crate::application::transaction::{run_cursor_transaction, TransactionPolicy};
use crate::domain::{DisplayName, QueueCursor, QueueId, Ticket};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, TicketRepository, TimeProvider, TransactionalCursorStore};
use std::sync::Arc;
use tracing::{error, info};

/// Enrollment use case
pub struct Allocator {
    transactions: Arc<dyn TransactionalCursorStore>,
    tickets: Arc<dyn TicketRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    policy: TransactionPolicy,
}

impl Allocator {
    pub fn new(
        transactions: Arc<dyn TransactionalCursorStore>,
        tickets: Arc<dyn TicketRepository>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        policy: TransactionPolicy,
    ) -> Self {
        Self {
            transactions,
            tickets,
            id_provider,
            time_provider,
            policy,
        }
    }

    /// Enroll a participant at the back of the line
    ///
    /// The position is reserved inside a cursor transaction
    /// (`last_issued_position + 1`); the ticket itself is inserted after the
    /// reservation committed. If that insert fails the position stays consumed:
    /// a gap, never a duplicate.
    ///
    /// # Errors
    /// * `InvalidInput` - empty/whitespace-only or malformed name (no store access)
    /// * `AllocationConflict` - reservation retries exhausted
    /// * `StoreUnavailable` - store failure during reservation or insert
    pub async fn enroll(&self, queue_id: &QueueId, display_name: &str) -> Result<Ticket> {
        let display_name = DisplayName::parse(display_name)?;

        let (cursor, position) = run_cursor_transaction(
            self.transactions.as_ref(),
            queue_id,
            &self.policy,
            QueueCursor::reserve_next,
        )
        .await?;

        let ticket = Ticket::new(
            self.id_provider.generate_id(),
            queue_id.clone(),
            display_name,
            position,
            self.time_provider.now_millis(),
        );

        if let Err(err) = self.tickets.insert(&ticket).await {
            error!(
                queue_id = %queue_id,
                position,
                error = %err,
                "Ticket insert failed after reservation; position consumed"
            );
            return Err(match err {
                AppError::StoreUnavailable(_) => err,
                other => AppError::StoreUnavailable(other.to_string()),
            });
        }

        info!(
            queue_id = %queue_id,
            ticket_id = %ticket.id,
            position,
            cursor_version = cursor.version,
            "Participant enrolled"
        );

        Ok(ticket)
    }
}
