// Ticket Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::QueueId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket ID (UUID v4)
pub type TicketId = String;

/// Position in line (1-based, unique per queue)
pub type Position = i64;

/// Maximum length of a display name (in characters, after trimming)
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Participant-supplied name, trimmed and validated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Trim and validate a raw name
    ///
    /// Rejects empty or whitespace-only input, names longer than
    /// [`MAX_DISPLAY_NAME_CHARS`] and names containing control characters.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidDisplayName(
                "display name cannot be empty".to_string(),
            ));
        }

        if trimmed.chars().count() > MAX_DISPLAY_NAME_CHARS {
            return Err(DomainError::InvalidDisplayName(format!(
                "display name too long (max {} characters)",
                MAX_DISPLAY_NAME_CHARS
            )));
        }

        if trimmed.chars().any(char::is_control) {
            return Err(DomainError::InvalidDisplayName(
                "display name contains control characters".to_string(),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DisplayName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

/// Ticket Entity
///
/// Created exactly once by the allocator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub queue_id: QueueId,
    pub display_name: DisplayName,
    pub position: Position,
    pub enrolled_at: i64, // epoch ms, audit only
}

impl Ticket {
    /// Create a new Ticket
    ///
    /// # Arguments
    ///
    /// * `id` - Unique ticket ID (injected, not generated)
    /// * `queue_id` - Queue namespace the ticket belongs to
    /// * `display_name` - Validated participant name
    /// * `position` - Position reserved by the allocator
    /// * `enrolled_at` - Enrollment timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        queue_id: QueueId,
        display_name: DisplayName,
        position: Position,
        enrolled_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            queue_id,
            display_name,
            position,
            enrolled_at,
        }
    }

    /// Create a test ticket with deterministic ID and timestamp (for tests only)
    pub fn new_test(queue_id: &str, display_name: &str, position: Position) -> Self {
        Self::new(
            format!("ticket-{}-{}", queue_id, position),
            QueueId::parse(queue_id).expect("valid test queue id"),
            DisplayName::parse(display_name).expect("valid test display name"),
            position,
            position * 1000,
        )
    }

    /// Still waiting when the cursor has not reached this position
    pub fn is_waiting(&self, current_position: Position) -> bool {
        self.position > current_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_is_trimmed() {
        let name = DisplayName::parse("  Ada Lovelace \n").unwrap();
        assert_eq!(name.as_str(), "Ada Lovelace");
    }

    #[test]
    fn test_display_name_rejects_empty_and_whitespace() {
        assert!(DisplayName::parse("").is_err());
        let err = DisplayName::parse(" \t  ").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_display_name_rejects_too_long() {
        let err = DisplayName::parse(&"x".repeat(MAX_DISPLAY_NAME_CHARS + 1)).unwrap_err();
        assert!(err.to_string().contains("too long"));

        // multi-byte characters count as one
        assert!(DisplayName::parse(&"é".repeat(MAX_DISPLAY_NAME_CHARS)).is_ok());
    }

    #[test]
    fn test_display_name_rejects_control_chars() {
        let err = DisplayName::parse("bob\u{7}").unwrap_err();
        assert!(err.to_string().contains("control"));
    }

    #[test]
    fn test_is_waiting() {
        let ticket = Ticket::new_test("q", "A", 3);
        assert!(ticket.is_waiting(2));
        assert!(!ticket.is_waiting(3));
        assert!(!ticket.is_waiting(4));
    }
}
