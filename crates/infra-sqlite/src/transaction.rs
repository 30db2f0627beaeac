// SQLite Cursor Transaction

use crate::error::map_sqlx_error;
use crate::store::{CursorRow, QueueLockGuard};
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use std::sync::Arc;
use tracing::debug;
use waitline_core::domain::{QueueCursor, QueueId};
use waitline_core::error::{AppError, Result};
use waitline_core::port::{ChangeBroadcaster, CursorTransaction, TimeProvider, Transaction};

/// Read-modify-write on one `queue_cursors` row
///
/// The write is conditional on the version that was read: an UPDATE matching
/// no row, or an INSERT hitting an existing row, means another writer won and
/// the commit fails with `Conflict`.
pub struct SqliteCursorTransaction {
    tx: SqlxTransaction<'static, Sqlite>,
    _queue_guard: QueueLockGuard,
    queue_id: QueueId,
    time_provider: Arc<dyn TimeProvider>,
    changes: ChangeBroadcaster,
    read_version: Option<i64>,
    staged: Option<QueueCursor>,
}

impl SqliteCursorTransaction {
    pub(crate) fn new(
        tx: SqlxTransaction<'static, Sqlite>,
        queue_guard: QueueLockGuard,
        queue_id: QueueId,
        time_provider: Arc<dyn TimeProvider>,
        changes: ChangeBroadcaster,
    ) -> Self {
        Self {
            tx,
            _queue_guard: queue_guard,
            queue_id,
            time_provider,
            changes,
            read_version: None,
            staged: None,
        }
    }

    fn conflict(&self, read_version: i64) -> AppError {
        AppError::Conflict(format!(
            "{} changed since version {} was read",
            self.queue_id.cursor_path(),
            read_version
        ))
    }
}

#[async_trait]
impl Transaction for SqliteCursorTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        let Some(staged) = self.staged else {
            self.tx.commit().await.map_err(map_sqlx_error)?;
            return Ok(());
        };
        let read_version = self.read_version.ok_or_else(|| {
            AppError::Internal(format!(
                "{} written without being read",
                self.queue_id.cursor_path()
            ))
        })?;
        let now = self.time_provider.now_millis();

        let result = if read_version == 0 {
            sqlx::query(
                r#"
                INSERT INTO queue_cursors (queue_id, current_position, last_issued_position, version, updated_at)
                VALUES (?, ?, ?, 1, ?)
                ON CONFLICT(queue_id) DO NOTHING
                "#,
            )
            .bind(self.queue_id.as_str())
            .bind(staged.current_position)
            .bind(staged.last_issued_position)
            .bind(now)
            .execute(&mut *self.tx)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE queue_cursors
                SET current_position = ?, last_issued_position = ?, version = version + 1, updated_at = ?
                WHERE queue_id = ? AND version = ?
                "#,
            )
            .bind(staged.current_position)
            .bind(staged.last_issued_position)
            .bind(now)
            .bind(self.queue_id.as_str())
            .bind(read_version)
            .execute(&mut *self.tx)
            .await
        }
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            let err = self.conflict(read_version);
            self.tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(err);
        }

        self.tx.commit().await.map_err(map_sqlx_error)?;

        let committed = QueueCursor {
            version: read_version + 1,
            ..staged
        };
        debug!(
            queue_id = %self.queue_id,
            version = committed.version,
            "Cursor committed"
        );
        self.changes.publish_cursor(&self.queue_id, committed);
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl CursorTransaction for SqliteCursorTransaction {
    async fn get_cursor(&mut self) -> Result<Option<QueueCursor>> {
        let row = sqlx::query_as::<_, CursorRow>(
            "SELECT current_position, last_issued_position, version FROM queue_cursors WHERE queue_id = ?",
        )
        .bind(self.queue_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        let cursor = row.map(CursorRow::into_cursor);
        self.read_version = Some(cursor.map_or(0, |c| c.version));
        Ok(cursor)
    }

    async fn set_cursor(&mut self, cursor: QueueCursor) -> Result<()> {
        self.staged = Some(cursor);
        Ok(())
    }
}
