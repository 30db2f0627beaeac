// Waiting View - derived, never persisted

use crate::domain::{Position, Ticket};
use serde::{Deserialize, Serialize};

/// Consumer-visible row of the waiting line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingEntry {
    pub display_name: String,
    pub position: Position,
}

/// Ordered tickets still waiting, together with the cursor they were derived from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WaitingView {
    pub current_position: Position,
    pub tickets: Vec<Ticket>,
}

impl WaitingView {
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Next participant to be served
    pub fn front(&self) -> Option<&Ticket> {
        self.tickets.first()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.tickets.iter().map(|t| t.position).collect()
    }

    pub fn entries(&self) -> Vec<WaitingEntry> {
        self.tickets
            .iter()
            .map(|t| WaitingEntry {
                display_name: t.display_name.to_string(),
                position: t.position,
            })
            .collect()
    }
}
