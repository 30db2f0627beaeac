// Cursor Store Port (Interface)

use crate::domain::{QueueCursor, QueueId};
use crate::error::Result;
use async_trait::async_trait;

/// Non-transactional read access to queue cursors
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Read the latest committed cursor; `None` when it was never created
    async fn get_cursor(&self, queue_id: &QueueId) -> Result<Option<QueueCursor>>;
}
