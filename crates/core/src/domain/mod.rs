// Domain Layer - Pure queue entities and rules

pub mod cursor;
pub mod error;
pub mod queue;
pub mod ticket;
pub mod view;

// Re-exports
pub use cursor::QueueCursor;
pub use error::DomainError;
pub use queue::QueueId;
pub use ticket::{DisplayName, Position, Ticket, TicketId};
pub use view::{WaitingEntry, WaitingView};
