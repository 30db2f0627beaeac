// Waitline Infrastructure - SQLite Adapter
// Implements: CursorStore, TransactionalCursorStore, TicketRepository, ChangeFeed

mod connection;
mod error;
mod migration;
mod store;
mod transaction;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use store::SqliteQueueStore;
pub use transaction::SqliteCursorTransaction;

// Note: sqlx::Error conversion is handled by a helper function
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
