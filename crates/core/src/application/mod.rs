// Application Layer - Use Cases and Business Logic

pub mod advancer;
pub mod allocator;
pub mod constants;
pub mod observer;
pub mod reconciler;
pub mod service;
pub mod transaction;

// Re-exports
pub use advancer::CursorAdvancer;
pub use allocator::Allocator;
pub use observer::{QueueObserver, ViewEvent, ViewSubscription};
pub use reconciler::{reconcile, ViewState};
pub use service::QueueService;
pub use transaction::{load_cursor, load_or_init_cursor, run_cursor_transaction, TransactionPolicy};
