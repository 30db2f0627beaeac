// View Reconciler - merges the ticket set and the cursor into the waiting view

use crate::domain::{Position, QueueCursor, Ticket, WaitingView};

/// Derive the waiting view from a cursor position and a ticket set
///
/// Keeps tickets with `position > current_position`, sorted ascending.
/// Pure: no hidden state, same inputs give the same output.
pub fn reconcile(current_position: Position, tickets: &[Ticket]) -> WaitingView {
    let mut waiting: Vec<Ticket> = tickets
        .iter()
        .filter(|t| t.is_waiting(current_position))
        .cloned()
        .collect();
    waiting.sort_by_key(|t| t.position);

    WaitingView {
        current_position,
        tickets: waiting,
    }
}

/// Latest known value of each input
///
/// Either input may be refreshed independently; the view is always recomputed
/// from both cached values.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    cursor: Option<QueueCursor>,
    tickets: Vec<Ticket>,
}

impl ViewState {
    /// Adopt a cursor snapshot unless a newer revision is already cached
    ///
    /// Returns whether the snapshot was adopted.
    pub fn apply_cursor(&mut self, cursor: QueueCursor) -> bool {
        match self.cursor {
            Some(cached) if cached.version > cursor.version => false,
            _ => {
                self.cursor = Some(cursor);
                true
            }
        }
    }

    /// Replace the cached ticket set with a fresh read
    pub fn replace_tickets(&mut self, tickets: Vec<Ticket>) {
        self.tickets = tickets;
    }

    pub fn cursor(&self) -> Option<QueueCursor> {
        self.cursor
    }

    /// Current view; `None` until a cursor has been seen
    pub fn view(&self) -> Option<WaitingView> {
        self.cursor
            .map(|cursor| reconcile(cursor.current_position, &self.tickets))
    }
}
