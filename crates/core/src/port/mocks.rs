// In-memory store implementing every port (tests, demos)

use crate::domain::{QueueCursor, QueueId, Ticket};
use crate::error::{AppError, Result};
use crate::port::change_feed::{ChangeBroadcaster, ChangeFeed, ChangeStream};
use crate::port::{
    CursorChanged, CursorStore, CursorTransaction, TicketRepository, TicketsChanged, Transaction,
    TransactionalCursorStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct State {
    cursors: HashMap<QueueId, QueueCursor>,
    tickets: HashMap<QueueId, Vec<Ticket>>,
    injected_conflicts: u32,
    failing_inserts: u32,
    mutations: u64,
}

/// Versioned in-memory document store
///
/// Cursor transactions are optimistic: the revision read is compared with the
/// stored one at commit time. Conflicts and insert failures can be injected.
#[derive(Clone, Default)]
pub struct InMemoryQueueStore {
    state: Arc<Mutex<State>>,
    changes: ChangeBroadcaster,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose change streams buffer at most `capacity` notifications
    pub fn with_change_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::default(),
            changes: ChangeBroadcaster::new(capacity),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("in-memory store poisoned".to_string()))
    }

    /// Make the next `n` commits fail with a conflict
    pub fn inject_conflicts(&self, n: u32) {
        if let Ok(mut state) = self.lock() {
            state.injected_conflicts = n;
        }
    }

    /// Make the next `n` ticket inserts fail
    pub fn fail_inserts(&self, n: u32) {
        if let Ok(mut state) = self.lock() {
            state.failing_inserts = n;
        }
    }

    /// Store a cursor directly, bypassing transactions and notifications
    pub fn seed_cursor(&self, queue_id: &QueueId, cursor: QueueCursor) {
        if let Ok(mut state) = self.lock() {
            state.cursors.insert(queue_id.clone(), cursor);
        }
    }

    /// Number of successful writes (cursor commits + ticket inserts)
    pub fn mutation_count(&self) -> u64 {
        self.lock().map(|s| s.mutations).unwrap_or(0)
    }

    /// Number of live change subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.changes.subscriber_count()
    }
}

#[async_trait]
impl CursorStore for InMemoryQueueStore {
    async fn get_cursor(&self, queue_id: &QueueId) -> Result<Option<QueueCursor>> {
        Ok(self.lock()?.cursors.get(queue_id).copied())
    }
}

#[async_trait]
impl TransactionalCursorStore for InMemoryQueueStore {
    async fn begin_transaction(&self, queue_id: &QueueId) -> Result<Box<dyn CursorTransaction>> {
        Ok(Box::new(InMemoryCursorTransaction {
            store: self.clone(),
            queue_id: queue_id.clone(),
            read_version: None,
            staged: None,
        }))
    }
}

#[async_trait]
impl TicketRepository for InMemoryQueueStore {
    async fn insert(&self, ticket: &Ticket) -> Result<()> {
        {
            let mut state = self.lock()?;
            if state.failing_inserts > 0 {
                state.failing_inserts -= 1;
                return Err(AppError::StoreUnavailable(
                    "injected insert failure".to_string(),
                ));
            }

            let tickets = state.tickets.entry(ticket.queue_id.clone()).or_default();
            if tickets.iter().any(|t| t.position == ticket.position) {
                return Err(AppError::Internal(format!(
                    "duplicate position {} in queue {}",
                    ticket.position, ticket.queue_id
                )));
            }
            tickets.push(ticket.clone());
            state.mutations += 1;
        }

        self.changes.publish_ticket(&ticket.queue_id, ticket.position);
        Ok(())
    }

    async fn list_by_queue(&self, queue_id: &QueueId) -> Result<Vec<Ticket>> {
        Ok(self
            .lock()?
            .tickets
            .get(queue_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl ChangeFeed for InMemoryQueueStore {
    fn subscribe_tickets(&self, queue_id: &QueueId) -> Result<ChangeStream<TicketsChanged>> {
        self.changes.subscribe_tickets(queue_id)
    }

    fn subscribe_cursor(&self, queue_id: &QueueId) -> Result<ChangeStream<CursorChanged>> {
        self.changes.subscribe_cursor(queue_id)
    }
}

struct InMemoryCursorTransaction {
    store: InMemoryQueueStore,
    queue_id: QueueId,
    read_version: Option<i64>,
    staged: Option<QueueCursor>,
}

#[async_trait]
impl Transaction for InMemoryCursorTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let Some(staged) = self.staged else {
            return Ok(());
        };

        let committed = {
            let mut state = self.store.lock()?;
            if state.injected_conflicts > 0 {
                state.injected_conflicts -= 1;
                return Err(AppError::Conflict(format!(
                    "injected conflict on {}",
                    self.queue_id.cursor_path()
                )));
            }

            let stored_version = state.cursors.get(&self.queue_id).map_or(0, |c| c.version);
            let read_version = self.read_version.unwrap_or(stored_version);
            if stored_version != read_version {
                return Err(AppError::Conflict(format!(
                    "{} changed (read v{}, found v{})",
                    self.queue_id.cursor_path(),
                    read_version,
                    stored_version
                )));
            }

            let committed = QueueCursor {
                version: stored_version + 1,
                ..staged
            };
            state.cursors.insert(self.queue_id.clone(), committed);
            state.mutations += 1;
            committed
        };

        self.store.changes.publish_cursor(&self.queue_id, committed);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl CursorTransaction for InMemoryCursorTransaction {
    async fn get_cursor(&mut self) -> Result<Option<QueueCursor>> {
        let cursor = self.store.lock()?.cursors.get(&self.queue_id).copied();
        self.read_version = Some(cursor.map_or(0, |c| c.version));
        Ok(cursor)
    }

    async fn set_cursor(&mut self, cursor: QueueCursor) -> Result<()> {
        self.staged = Some(cursor);
        Ok(())
    }
}
