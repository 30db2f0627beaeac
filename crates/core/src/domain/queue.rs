// Queue Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a queue namespace
pub const MAX_QUEUE_ID_LEN: usize = 64;

/// Queue identifier
///
/// An opaque namespace string. It selects both the ticket collection and the
/// singleton cursor document (`metadata/<queue_id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueId(String);

impl QueueId {
    /// Parse and validate a queue namespace
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(DomainError::InvalidQueueId(
                "queue id cannot be empty".to_string(),
            ));
        }

        if raw.len() > MAX_QUEUE_ID_LEN {
            return Err(DomainError::InvalidQueueId(format!(
                "queue id too long (max {} characters)",
                MAX_QUEUE_ID_LEN
            )));
        }

        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(DomainError::InvalidQueueId(format!(
                "'{}' must be alphanumeric (plus '_', '-', '.')",
                raw
            )));
        }

        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the cursor document for this queue
    pub fn cursor_path(&self) -> String {
        format!("metadata/{}", self.0)
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for QueueId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<QueueId> for String {
    fn from(value: QueueId) -> Self {
        value.0
    }
}

impl AsRef<str> for QueueId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let id = QueueId::parse("myQueue").unwrap();
        assert_eq!(id.as_str(), "myQueue");
        assert_eq!(id.cursor_path(), "metadata/myQueue");
    }

    #[test]
    fn test_parse_rejects_empty() {
        let err = QueueId::parse("").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_parse_rejects_path_separators() {
        assert!(QueueId::parse("metadata/other").is_err());
        assert!(QueueId::parse("a b").is_err());
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let err = QueueId::parse("q".repeat(MAX_QUEUE_ID_LEN + 1)).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: std::result::Result<QueueId, _> = serde_json::from_str("\"bakery-1\"");
        assert!(ok.is_ok());

        let bad: std::result::Result<QueueId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}
