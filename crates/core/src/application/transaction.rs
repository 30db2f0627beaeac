// Cursor transaction runner: atomic read-modify-write with bounded retry
use crate::application::constants::{
    DEFAULT_MAX_TRANSACTION_ATTEMPTS, DEFAULT_TRANSACTION_BASE_BACKOFF, MAX_TRANSACTION_BACKOFF,
};
use crate::domain::{QueueCursor, QueueId};
use crate::error::{AppError, Result};
use crate::port::{CursorStore, CursorTransaction, TransactionalCursorStore};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry policy for cursor transactions
///
/// A commit that loses a race is retried after
/// `base_backoff * 2^(attempt - 1)` (capped at `max_backoff`) until
/// `max_attempts` attempts were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for TransactionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_TRANSACTION_ATTEMPTS,
            base_backoff: DEFAULT_TRANSACTION_BASE_BACKOFF,
            max_backoff: MAX_TRANSACTION_BACKOFF,
        }
    }
}

impl TransactionPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sleep before retrying after failed attempt number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

/// Run `mutate` against the cursor of `queue_id` atomically
///
/// The cursor is read inside the transaction (an absent cursor starts as
/// [`QueueCursor::initial`]), mutated, validated and written back. When the
/// mutation leaves the positions unchanged nothing is written.
///
/// Returns the committed cursor together with the mutation's output.
///
/// # Errors
/// * `AllocationConflict` when every attempt lost a race
/// * any non-retryable store error, immediately
pub async fn run_cursor_transaction<T, F>(
    store: &dyn TransactionalCursorStore,
    queue_id: &QueueId,
    policy: &TransactionPolicy,
    mut mutate: F,
) -> Result<(QueueCursor, T)>
where
    F: FnMut(&mut QueueCursor) -> T + Send,
    T: Send,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match attempt_once(store, queue_id, &mut mutate).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) if err.is_retryable() => {
                warn!(
                    queue_id = %queue_id,
                    attempt,
                    max_attempts,
                    error = %err,
                    "Cursor transaction conflict"
                );
                if attempt < max_attempts {
                    tokio::time::sleep(policy.backoff_for(attempt)).await;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(AppError::AllocationConflict(format!(
        "{} still contended after {} attempts",
        queue_id.cursor_path(),
        max_attempts
    )))
}

async fn attempt_once<T, F>(
    store: &dyn TransactionalCursorStore,
    queue_id: &QueueId,
    mutate: &mut F,
) -> Result<(QueueCursor, T)>
where
    F: FnMut(&mut QueueCursor) -> T + Send,
    T: Send,
{
    let mut tx = store.begin_transaction(queue_id).await?;

    let read = match tx.get_cursor().await {
        Ok(read) => read,
        Err(err) => {
            rollback_quietly(tx, queue_id).await;
            return Err(err);
        }
    };

    let mut cursor = read.unwrap_or_else(|| {
        debug!(queue_id = %queue_id, "Cursor absent, creating it");
        QueueCursor::initial()
    });
    let output = mutate(&mut cursor);

    if let Err(err) = cursor.validate() {
        rollback_quietly(tx, queue_id).await;
        return Err(err.into());
    }

    if matches!(read, Some(existing) if existing.same_positions(&cursor)) {
        // nothing to write
        tx.rollback().await?;
        return Ok((cursor, output));
    }

    if let Err(err) = tx.set_cursor(cursor).await {
        rollback_quietly(tx, queue_id).await;
        return Err(err);
    }
    tx.commit().await?;

    cursor.version += 1;
    Ok((cursor, output))
}

async fn rollback_quietly(tx: Box<dyn CursorTransaction>, queue_id: &QueueId) {
    if let Err(err) = tx.rollback().await {
        warn!(queue_id = %queue_id, error = %err, "Cursor transaction rollback failed");
    }
}

/// Read the committed cursor; `NotInitialized` when it does not exist yet
pub async fn load_cursor(reader: &dyn CursorStore, queue_id: &QueueId) -> Result<QueueCursor> {
    reader
        .get_cursor(queue_id)
        .await?
        .ok_or_else(|| AppError::NotInitialized(queue_id.cursor_path()))
}

/// Read the committed cursor, creating `{0, 0}` first when it is absent
///
/// Creation goes through the cursor transaction, so it can never overwrite a
/// cursor that a concurrent allocation created in the meantime.
pub async fn load_or_init_cursor(
    reader: &dyn CursorStore,
    writer: &dyn TransactionalCursorStore,
    queue_id: &QueueId,
    policy: &TransactionPolicy,
) -> Result<QueueCursor> {
    match load_cursor(reader, queue_id).await {
        Err(AppError::NotInitialized(path)) => {
            info!(queue_id = %queue_id, path = %path, "Initializing queue cursor");
            let (cursor, ()) = run_cursor_transaction(writer, queue_id, policy, |_| ()).await?;
            Ok(cursor)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::cursor_store::MockCursorStore;
    use crate::port::mocks::InMemoryQueueStore;
    use tokio_test::{assert_err, assert_ok};

    fn fast_policy(max_attempts: u32) -> TransactionPolicy {
        TransactionPolicy {
            max_attempts,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = TransactionPolicy {
            max_attempts: 10,
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(10));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(20));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(40));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(50));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_creates_absent_cursor() {
        let store = InMemoryQueueStore::new();
        let queue = QueueId::parse("fresh").unwrap();

        let (cursor, position) =
            run_cursor_transaction(&store, &queue, &fast_policy(3), QueueCursor::reserve_next)
                .await
                .unwrap();

        assert_eq!(position, 1);
        assert_eq!(cursor.last_issued_position, 1);
        assert_eq!(cursor.current_position, 0);
        assert_eq!(cursor.version, 1);
        assert_eq!(store.get_cursor(&queue).await.unwrap(), Some(cursor));
    }

    #[tokio::test]
    async fn test_transient_conflicts_are_retried() {
        let store = InMemoryQueueStore::new();
        let queue = QueueId::parse("busy").unwrap();
        store.inject_conflicts(2);

        let result =
            run_cursor_transaction(&store, &queue, &fast_policy(3), QueueCursor::reserve_next)
                .await;

        let (_, position) = assert_ok!(result);
        assert_eq!(position, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_allocation_conflict() {
        let store = InMemoryQueueStore::new();
        let queue = QueueId::parse("busy").unwrap();
        store.inject_conflicts(10);

        let result =
            run_cursor_transaction(&store, &queue, &fast_policy(3), QueueCursor::reserve_next)
                .await;

        let err = assert_err!(result);
        assert!(matches!(err, AppError::AllocationConflict(_)));
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_unchanged_cursor_is_not_written() {
        let store = InMemoryQueueStore::new();
        let queue = QueueId::parse("idle").unwrap();
        store.seed_cursor(
            &queue,
            QueueCursor {
                current_position: 2,
                last_issued_position: 2,
                version: 4,
            },
        );

        let (cursor, current) =
            run_cursor_transaction(&store, &queue, &fast_policy(3), |c| c.current_position)
                .await
                .unwrap();

        assert_eq!(current, 2);
        assert_eq!(cursor.version, 4);
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_invariant_violation_is_rejected() {
        let store = InMemoryQueueStore::new();
        let queue = QueueId::parse("q").unwrap();

        let result = run_cursor_transaction(&store, &queue, &fast_policy(3), |c| {
            c.current_position = -1;
        })
        .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(store.get_cursor(&queue).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_cursor_reports_not_initialized() {
        let mut reader = MockCursorStore::new();
        reader.expect_get_cursor().returning(|_| Ok(None));
        let queue = QueueId::parse("q").unwrap();

        let err = load_cursor(&reader, &queue).await.unwrap_err();
        assert_eq!(err, AppError::NotInitialized("metadata/q".to_string()));
    }

    #[tokio::test]
    async fn test_load_or_init_creates_zero_cursor() {
        let store = InMemoryQueueStore::new();
        let queue = QueueId::parse("cold").unwrap();

        let cursor = load_or_init_cursor(&store, &store, &queue, &fast_policy(3))
            .await
            .unwrap();

        assert_eq!(cursor.current_position, 0);
        assert_eq!(cursor.last_issued_position, 0);
        assert_eq!(cursor.version, 1);
    }

    #[tokio::test]
    async fn test_load_propagates_store_errors() {
        let mut reader = MockCursorStore::new();
        reader
            .expect_get_cursor()
            .returning(|_| Err(AppError::StoreUnavailable("disk gone".to_string())));
        let store = InMemoryQueueStore::new();
        let queue = QueueId::parse("q").unwrap();

        let err = load_or_init_cursor(&reader, &store, &queue, &fast_policy(3))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
        assert!(store.get_cursor(&queue).await.unwrap().is_none());
    }
}
