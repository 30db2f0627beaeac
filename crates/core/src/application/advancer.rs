// Cursor Advancer - marks the next participant as served

use crate::application::transaction::{run_cursor_transaction, TransactionPolicy};
use crate::domain::{QueueCursor, QueueId};
use crate::error::Result;
use crate::port::TransactionalCursorStore;
use std::sync::Arc;
use tracing::info;

pub struct CursorAdvancer {
    transactions: Arc<dyn TransactionalCursorStore>,
    policy: TransactionPolicy,
}

impl CursorAdvancer {
    pub fn new(transactions: Arc<dyn TransactionalCursorStore>, policy: TransactionPolicy) -> Self {
        Self {
            transactions,
            policy,
        }
    }

    /// Increment `current_position` by one
    ///
    /// Serializes with enrollments and other advances on the cursor document.
    /// There is no upper bound: advancing an exhausted queue moves the cursor
    /// past `last_issued_position` and leaves an empty waiting view.
    pub async fn advance(&self, queue_id: &QueueId) -> Result<QueueCursor> {
        let (cursor, _) = run_cursor_transaction(
            self.transactions.as_ref(),
            queue_id,
            &self.policy,
            QueueCursor::advance,
        )
        .await?;

        if cursor.is_exhausted() {
            info!(
                queue_id = %queue_id,
                current_position = cursor.current_position,
                last_issued_position = cursor.last_issued_position,
                "Queue advanced, nobody waiting"
            );
        } else {
            info!(
                queue_id = %queue_id,
                current_position = cursor.current_position,
                waiting = cursor.waiting_count(),
                "Queue advanced"
            );
        }

        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::allocator::Allocator;
    use crate::application::reconciler::reconcile;
    use crate::port::id_provider::SequentialIdProvider;
    use crate::port::mocks::InMemoryQueueStore;
    use crate::port::time_provider::FixedTimeProvider;
    use crate::port::{CursorStore, TicketRepository};
    use std::time::Duration;

    fn advancer_for(store: &InMemoryQueueStore, max_attempts: u32) -> CursorAdvancer {
        CursorAdvancer::new(
            Arc::new(store.clone()),
            TransactionPolicy {
                max_attempts,
                base_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(3),
            },
        )
    }

    fn seeded(current: i64, last: i64) -> (InMemoryQueueStore, QueueId) {
        let store = InMemoryQueueStore::new();
        let q = QueueId::parse("desk").unwrap();
        store.seed_cursor(
            &q,
            QueueCursor {
                current_position: current,
                last_issued_position: last,
                version: 1,
            },
        );
        (store, q)
    }

    #[tokio::test]
    async fn test_advance_increments_current_position() {
        let (store, q) = seeded(0, 3);
        let advancer = advancer_for(&store, 3);

        let cursor = advancer.advance(&q).await.unwrap();
        assert_eq!(cursor.current_position, 1);
        assert_eq!(cursor.last_issued_position, 3);
        assert_eq!(cursor.version, 2);
    }

    #[tokio::test]
    async fn test_advance_past_end_is_not_an_error() {
        let (store, q) = seeded(2, 2);
        let advancer = advancer_for(&store, 3);

        let cursor = advancer.advance(&q).await.unwrap();
        assert_eq!(cursor.current_position, 3);
        assert_eq!(cursor.last_issued_position, 2);
        assert_eq!(cursor.version, 2);
        assert_eq!(store.get_cursor(&q).await.unwrap(), Some(cursor));
    }

    #[tokio::test]
    async fn test_overshoot_hides_next_enrollment() {
        let store = InMemoryQueueStore::new();
        let q = QueueId::parse("desk").unwrap();
        let advancer = advancer_for(&store, 3);
        let allocator = Allocator::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(SequentialIdProvider::default()),
            Arc::new(FixedTimeProvider(1_000)),
            TransactionPolicy::default(),
        );

        allocator.enroll(&q, "A").await.unwrap();
        advancer.advance(&q).await.unwrap();
        advancer.advance(&q).await.unwrap();
        let b = allocator.enroll(&q, "B").await.unwrap();

        let cursor = store.get_cursor(&q).await.unwrap().unwrap();
        assert_eq!(cursor.current_position, 2);
        assert_eq!(b.position, 2);

        let tickets = store.list_by_queue(&q).await.unwrap();
        assert!(reconcile(cursor.current_position, &tickets).is_empty());
    }

    #[tokio::test]
    async fn test_advance_on_missing_cursor_creates_it() {
        let store = InMemoryQueueStore::new();
        let q = QueueId::parse("new").unwrap();
        let advancer = advancer_for(&store, 3);

        let cursor = advancer.advance(&q).await.unwrap();
        assert_eq!(cursor.current_position, 1);
        assert_eq!(cursor.last_issued_position, 0);
        assert_eq!(store.get_cursor(&q).await.unwrap(), Some(cursor));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_advances_lose_no_increment() {
        let (store, q) = seeded(0, 50);
        let advancer = Arc::new(advancer_for(&store, 200));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..20 {
            let advancer = advancer.clone();
            let q = q.clone();
            tasks.spawn(async move { advancer.advance(&q).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let cursor = store.get_cursor(&q).await.unwrap().unwrap();
        assert_eq!(cursor.current_position, 20);
    }
}
