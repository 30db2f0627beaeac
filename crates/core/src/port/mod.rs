// Port Layer - Interfaces for the external document store

pub mod change_feed;
pub mod cursor_store;
pub mod id_provider; // For deterministic testing
pub mod mocks;
pub mod ticket_repository;
pub mod time_provider;
pub mod transaction;

use std::sync::Arc;

// Re-exports
pub use change_feed::{
    ChangeBroadcaster, ChangeFeed, ChangeStream, CursorChanged, StreamItem, TicketsChanged,
};
pub use cursor_store::CursorStore;
pub use id_provider::IdProvider;
pub use ticket_repository::TicketRepository;
pub use time_provider::TimeProvider;
pub use transaction::{CursorTransaction, Transaction, TransactionalCursorStore};

/// Store ports consumed by the application layer
///
/// A single adapter usually implements all four; they are injected separately
/// so each can be replaced in tests.
#[derive(Clone)]
pub struct QueuePorts {
    pub cursors: Arc<dyn CursorStore>,
    pub transactions: Arc<dyn TransactionalCursorStore>,
    pub tickets: Arc<dyn TicketRepository>,
    pub changes: Arc<dyn ChangeFeed>,
}

impl QueuePorts {
    /// Wire every port to the same store adapter
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CursorStore + TransactionalCursorStore + TicketRepository + ChangeFeed + 'static,
    {
        Self {
            cursors: store.clone(),
            transactions: store.clone(),
            tickets: store.clone(),
            changes: store,
        }
    }
}
