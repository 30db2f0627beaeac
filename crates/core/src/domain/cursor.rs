// Queue Cursor Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::Position;
use serde::{Deserialize, Serialize};

/// Per-queue singleton tracking how far the line has advanced
///
/// * `current_position` - every ticket at or below it is served/skipped
/// * `last_issued_position` - highest position ever handed to a ticket
/// * `version` - store revision; every committed write increments it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueCursor {
    pub current_position: Position,
    pub last_issued_position: Position,
    pub version: i64,
}

impl QueueCursor {
    /// Cursor of a queue nobody has touched yet (never committed)
    pub const fn initial() -> Self {
        Self {
            current_position: 0,
            last_issued_position: 0,
            version: 0,
        }
    }

    /// Reserve the next position for a new ticket
    pub fn reserve_next(&mut self) -> Position {
        self.last_issued_position += 1;
        self.last_issued_position
    }

    /// Mark one more position as served or skipped
    ///
    /// Unbounded: the cursor may run ahead of `last_issued_position`, which
    /// reads as a temporarily empty line. Returns the new position.
    pub fn advance(&mut self) -> Position {
        self.current_position += 1;
        self.current_position
    }

    /// Number of positions issued but not yet passed
    pub fn waiting_count(&self) -> i64 {
        (self.last_issued_position - self.current_position).max(0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_position >= self.last_issued_position
    }

    /// Check both positions are non-negative
    pub fn validate(&self) -> Result<()> {
        if self.current_position < 0 || self.last_issued_position < 0 {
            return Err(DomainError::CursorInvariant {
                current: self.current_position,
                last_issued: self.last_issued_position,
            });
        }
        Ok(())
    }

    /// Same positions, ignoring the store revision
    pub fn same_positions(&self, other: &QueueCursor) -> bool {
        self.current_position == other.current_position
            && self.last_issued_position == other.last_issued_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_next_is_sequential() {
        let mut cursor = QueueCursor::initial();
        assert_eq!(cursor.reserve_next(), 1);
        assert_eq!(cursor.reserve_next(), 2);
        assert_eq!(cursor.last_issued_position, 2);
        assert_eq!(cursor.current_position, 0);
        assert_eq!(cursor.waiting_count(), 2);
    }

    #[test]
    fn test_advance_runs_past_last_issued() {
        let mut cursor = QueueCursor {
            current_position: 1,
            last_issued_position: 2,
            version: 3,
        };
        assert_eq!(cursor.advance(), 2);
        assert!(cursor.is_exhausted());

        assert_eq!(cursor.advance(), 3);
        assert_eq!(cursor.last_issued_position, 2);
        assert_eq!(cursor.waiting_count(), 0);
        assert!(cursor.is_exhausted());
        assert!(cursor.validate().is_ok());
    }

    #[test]
    fn test_enroll_after_overshoot_is_already_passed() {
        let mut cursor = QueueCursor::initial();
        cursor.reserve_next();
        cursor.advance();
        cursor.advance();

        let position = cursor.reserve_next();
        assert_eq!(position, 2);
        assert_eq!(cursor.current_position, 2);
        assert_eq!(cursor.waiting_count(), 0);
    }

    #[test]
    fn test_validate_rejects_negative_positions() {
        let cursor = QueueCursor {
            current_position: -1,
            last_issued_position: 4,
            version: 1,
        };
        assert_eq!(
            cursor.validate(),
            Err(DomainError::CursorInvariant {
                current: -1,
                last_issued: 4
            })
        );
    }

    #[test]
    fn test_same_positions_ignores_version() {
        let a = QueueCursor {
            current_position: 1,
            last_issued_position: 2,
            version: 1,
        };
        let b = QueueCursor { version: 9, ..a };
        assert!(a.same_positions(&b));
        assert_ne!(a, b);
    }
}
