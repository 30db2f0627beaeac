// Queue Service - facade over the queue use cases

use crate::application::advancer::CursorAdvancer;
use crate::application::allocator::Allocator;
use crate::application::observer::{QueueObserver, ViewEvent, ViewSubscription};
use crate::application::reconciler::reconcile;
use crate::application::transaction::{load_or_init_cursor, TransactionPolicy};
use crate::domain::{QueueCursor, QueueId, Ticket, WaitingView};
use crate::error::Result;
use crate::port::{IdProvider, QueuePorts, TimeProvider};
use std::sync::Arc;
use tracing::info;

/// Entry point used by the RPC layer and the integration tests
pub struct QueueService {
    ports: QueuePorts,
    allocator: Allocator,
    advancer: CursorAdvancer,
    observer: QueueObserver,
    policy: TransactionPolicy,
}

impl QueueService {
    pub fn new(
        ports: QueuePorts,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        policy: TransactionPolicy,
    ) -> Self {
        let allocator = Allocator::new(
            ports.transactions.clone(),
            ports.tickets.clone(),
            id_provider,
            time_provider,
            policy.clone(),
        );
        let advancer = CursorAdvancer::new(ports.transactions.clone(), policy.clone());
        let observer = QueueObserver::new(ports.clone(), policy.clone());

        Self {
            ports,
            allocator,
            advancer,
            observer,
            policy,
        }
    }

    pub async fn enroll(&self, queue_id: &QueueId, display_name: &str) -> Result<Ticket> {
        self.allocator.enroll(queue_id, display_name).await
    }

    pub async fn advance(&self, queue_id: &QueueId) -> Result<QueueCursor> {
        self.advancer.advance(queue_id).await
    }

    /// Create the cursor of `queue_id` if it does not exist yet
    pub async fn ensure_queue(&self, queue_id: &QueueId) -> Result<QueueCursor> {
        let cursor = load_or_init_cursor(
            self.ports.cursors.as_ref(),
            self.ports.transactions.as_ref(),
            queue_id,
            &self.policy,
        )
        .await?;
        info!(
            queue_id = %queue_id,
            current_position = cursor.current_position,
            last_issued_position = cursor.last_issued_position,
            "Queue ready"
        );
        Ok(cursor)
    }

    /// One-shot read of the waiting view
    pub async fn waiting_view(&self, queue_id: &QueueId) -> Result<WaitingView> {
        let cursor = load_or_init_cursor(
            self.ports.cursors.as_ref(),
            self.ports.transactions.as_ref(),
            queue_id,
            &self.policy,
        )
        .await?;
        let tickets = self.ports.tickets.list_by_queue(queue_id).await?;
        Ok(reconcile(cursor.current_position, &tickets))
    }

    /// Both cursor positions, creating the cursor if needed
    pub async fn cursor(&self, queue_id: &QueueId) -> Result<QueueCursor> {
        load_or_init_cursor(
            self.ports.cursors.as_ref(),
            self.ports.transactions.as_ref(),
            queue_id,
            &self.policy,
        )
        .await
    }

    pub fn observe_waiting_view<F>(&self, queue_id: QueueId, on_change: F) -> Result<ViewSubscription>
    where
        F: FnMut(ViewEvent) + Send + 'static,
    {
        self.observer.observe_waiting_view(queue_id, on_change)
    }
}
