//! RPC Request/Response Types
//!
//! `queue` is optional everywhere and falls back to the daemon's default queue.

use serde::{Deserialize, Serialize};
use waitline_core::domain::{QueueCursor, QueueId, Ticket, WaitingView};

/// queue.enroll.v1 - Join the back of the line
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    #[serde(default)]
    pub queue: Option<String>,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrollResponse {
    pub ticket_id: String,
    pub queue: String,
    pub display_name: String,
    pub position: i64,
}

impl From<Ticket> for EnrollResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            ticket_id: ticket.id,
            queue: ticket.queue_id.to_string(),
            display_name: ticket.display_name.as_str().to_string(),
            position: ticket.position,
        }
    }
}

/// Request carrying only the target queue (advance, view, watch)
#[derive(Debug, Default, Deserialize)]
pub struct QueueRequest {
    #[serde(default)]
    pub queue: Option<String>,
}

/// queue.advance.v1 - Serve the next participant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdvanceResponse {
    pub queue: String,
    pub current_position: i64,
    pub last_issued_position: i64,
}

impl AdvanceResponse {
    pub fn new(queue_id: &QueueId, cursor: QueueCursor) -> Self {
        Self {
            queue: queue_id.to_string(),
            current_position: cursor.current_position,
            last_issued_position: cursor.last_issued_position,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitingEntryDto {
    pub display_name: String,
    pub position: i64,
}

/// queue.view.v1 result and queue.view.changed notification payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewResponse {
    pub queue: String,
    pub current_position: i64,
    pub waiting: Vec<WaitingEntryDto>,
}

impl ViewResponse {
    pub fn new(queue_id: &QueueId, view: &WaitingView) -> Self {
        Self {
            queue: queue_id.to_string(),
            current_position: view.current_position,
            waiting: view
                .entries()
                .into_iter()
                .map(|entry| WaitingEntryDto {
                    display_name: entry.display_name,
                    position: entry.position,
                })
                .collect(),
        }
    }
}
