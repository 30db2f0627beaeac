// SQLite queue store: cursor documents, tickets and the change feed

use crate::error::map_sqlx_error;
use crate::transaction::SqliteCursorTransaction;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use waitline_core::domain::{DisplayName, QueueCursor, QueueId, Ticket};
use waitline_core::error::{AppError, Result};
use waitline_core::port::{
    ChangeBroadcaster, ChangeFeed, ChangeStream, CursorChanged, CursorStore, CursorTransaction,
    TicketRepository, TicketsChanged, TimeProvider, TransactionalCursorStore,
};

/// SQLite-backed implementation of every store port
///
/// Cursor transactions of one queue are serialized in-process by a per-queue
/// lock; the version check at commit still catches writers from other
/// processes sharing the database file.
#[derive(Clone)]
pub struct SqliteQueueStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    changes: ChangeBroadcaster,
    cursor_locks: QueueLocks,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
            changes: ChangeBroadcaster::default(),
            cursor_locks: QueueLocks::default(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

type LockTable = Arc<Mutex<HashMap<QueueId, Arc<AsyncMutex<()>>>>>;

/// In-process cursor locks, one per queue with a transaction in flight
///
/// An entry lives only while some task holds or awaits its lock.
#[derive(Clone, Default)]
pub(crate) struct QueueLocks {
    table: LockTable,
}

impl QueueLocks {
    pub(crate) async fn acquire(&self, queue_id: &QueueId) -> Result<QueueLockGuard> {
        let lock = {
            let mut table = lock_table(&self.table)?;
            table.entry(queue_id.clone()).or_default().clone()
        };
        let guard = lock.lock_owned().await;

        Ok(QueueLockGuard {
            guard: Some(guard),
            queue_id: queue_id.clone(),
            table: Arc::clone(&self.table),
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock_table(&self.table).map(|t| t.len()).unwrap_or(0)
    }
}

fn lock_table(
    table: &LockTable,
) -> Result<std::sync::MutexGuard<'_, HashMap<QueueId, Arc<AsyncMutex<()>>>>> {
    table
        .lock()
        .map_err(|_| AppError::Internal("cursor lock table poisoned".to_string()))
}

/// Held for the lifetime of a cursor transaction
pub(crate) struct QueueLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    queue_id: QueueId,
    table: LockTable,
}

impl Drop for QueueLockGuard {
    fn drop(&mut self) {
        self.guard.take();
        // waiters hold their own clone, so a count of one means nobody else
        if let Ok(mut table) = lock_table(&self.table) {
            if table
                .get(&self.queue_id)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                table.remove(&self.queue_id);
            }
        }
    }
}

#[async_trait]
impl CursorStore for SqliteQueueStore {
    async fn get_cursor(&self, queue_id: &QueueId) -> Result<Option<QueueCursor>> {
        let row = sqlx::query_as::<_, CursorRow>(
            "SELECT current_position, last_issued_position, version FROM queue_cursors WHERE queue_id = ?",
        )
        .bind(queue_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CursorRow::into_cursor))
    }
}

#[async_trait]
impl TransactionalCursorStore for SqliteQueueStore {
    async fn begin_transaction(&self, queue_id: &QueueId) -> Result<Box<dyn CursorTransaction>> {
        let guard = self.cursor_locks.acquire(queue_id).await?;
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Take the write lock before reading, so the read snapshot cannot go
        // stale under concurrent ticket inserts (SQLITE_BUSY_SNAPSHOT).
        sqlx::query("UPDATE queue_cursors SET version = version WHERE queue_id = ?")
            .bind(queue_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Box::new(SqliteCursorTransaction::new(
            tx,
            guard,
            queue_id.clone(),
            Arc::clone(&self.time_provider),
            self.changes.clone(),
        )))
    }
}

#[async_trait]
impl TicketRepository for SqliteQueueStore {
    async fn insert(&self, ticket: &Ticket) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tickets (id, queue_id, display_name, position, enrolled_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&ticket.id)
        .bind(ticket.queue_id.as_str())
        .bind(ticket.display_name.as_str())
        .bind(ticket.position)
        .bind(ticket.enrolled_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.changes.publish_ticket(&ticket.queue_id, ticket.position);
        Ok(())
    }

    async fn list_by_queue(&self, queue_id: &QueueId) -> Result<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(
            r#"
            SELECT id, queue_id, display_name, position, enrolled_at
            FROM tickets
            WHERE queue_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(queue_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TicketRow::into_ticket).collect()
    }
}

impl ChangeFeed for SqliteQueueStore {
    fn subscribe_tickets(&self, queue_id: &QueueId) -> Result<ChangeStream<TicketsChanged>> {
        self.changes.subscribe_tickets(queue_id)
    }

    fn subscribe_cursor(&self, queue_id: &QueueId) -> Result<ChangeStream<CursorChanged>> {
        self.changes.subscribe_cursor(queue_id)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CursorRow {
    current_position: i64,
    last_issued_position: i64,
    version: i64,
}

impl CursorRow {
    pub(crate) fn into_cursor(self) -> QueueCursor {
        QueueCursor {
            current_position: self.current_position,
            last_issued_position: self.last_issued_position,
            version: self.version,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: String,
    queue_id: String,
    display_name: String,
    position: i64,
    enrolled_at: i64,
}

impl TicketRow {
    fn into_ticket(self) -> Result<Ticket> {
        let corrupt = |e: waitline_core::domain::DomainError| {
            AppError::Internal(format!("corrupt ticket row {}: {}", self.id, e))
        };
        let queue_id = QueueId::parse(self.queue_id.as_str()).map_err(corrupt)?;
        let display_name = DisplayName::parse(&self.display_name).map_err(corrupt)?;

        Ok(Ticket::new(
            self.id,
            queue_id,
            display_name,
            self.position,
            self.enrolled_at,
        ))
    }
}
