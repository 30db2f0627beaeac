// Queue Observer - keeps a consumer's waiting view converged with the store
//
// Two independent change streams feed one derived view. Each notification
// refreshes the input it announces and re-reads the other one, then the view
// is recomputed from the two cached values.

use crate::application::reconciler::ViewState;
use crate::application::transaction::{load_or_init_cursor, TransactionPolicy};
use crate::domain::{QueueCursor, QueueId, WaitingView};
use crate::error::Result;
use crate::port::{ChangeStream, CursorChanged, QueuePorts, StreamItem, TicketsChanged};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Delivered to the consumer callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// The waiting view changed
    Updated(WaitingView),
    /// A store operation failed; the observer keeps running
    Failed(String),
}

/// Handle of an active observation
///
/// `unsubscribe` (or dropping the handle) stops delivery and releases both
/// change-stream subscriptions.
pub struct ViewSubscription {
    cancel: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ViewSubscription {
    /// Stop delivery and wait until the observer task has released its streams
    pub async fn unsubscribe(mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "View observer task ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

impl Drop for ViewSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct QueueObserver {
    ports: QueuePorts,
    policy: TransactionPolicy,
}

impl QueueObserver {
    pub fn new(ports: QueuePorts, policy: TransactionPolicy) -> Self {
        Self { ports, policy }
    }

    /// Start observing the waiting view of `queue_id`
    ///
    /// Both streams are subscribed before the initial sync so no change is
    /// missed. `on_change` runs on the observer task; it receives a view only
    /// when it differs from the previously delivered one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn observe_waiting_view<F>(&self, queue_id: QueueId, on_change: F) -> Result<ViewSubscription>
    where
        F: FnMut(ViewEvent) + Send + 'static,
    {
        let tickets = self.ports.changes.subscribe_tickets(&queue_id)?;
        let cursors = self.ports.changes.subscribe_cursor(&queue_id)?;
        let (cancel, cancelled) = oneshot::channel();

        let sync = ViewSync {
            ports: self.ports.clone(),
            policy: self.policy.clone(),
            queue_id,
            state: ViewState::default(),
            last_emitted: None,
            on_change,
        };
        let handle = tokio::spawn(sync.run(tickets, cursors, cancelled));

        Ok(ViewSubscription {
            cancel: Some(cancel),
            handle: Some(handle),
        })
    }
}

struct ViewSync<F> {
    ports: QueuePorts,
    policy: TransactionPolicy,
    queue_id: QueueId,
    state: ViewState,
    last_emitted: Option<WaitingView>,
    on_change: F,
}

impl<F> ViewSync<F>
where
    F: FnMut(ViewEvent) + Send + 'static,
{
    async fn run(
        mut self,
        mut tickets: ChangeStream<TicketsChanged>,
        mut cursors: ChangeStream<CursorChanged>,
        mut cancelled: oneshot::Receiver<()>,
    ) {
        debug!(queue_id = %self.queue_id, "View observer started");
        self.full_sync().await;

        loop {
            // resolves on cancel and when the handle is gone
            tokio::select! {
                biased;
                _ = &mut cancelled => break,
                item = tickets.recv() => match item {
                    Some(StreamItem::Change(_)) => self.on_tickets_changed().await,
                    Some(StreamItem::Lagged(missed)) => {
                        warn!(queue_id = %self.queue_id, missed, "Ticket stream lagged, resyncing");
                        self.full_sync().await;
                    }
                    None => {
                        warn!(queue_id = %self.queue_id, "Ticket stream closed");
                        break;
                    }
                },
                item = cursors.recv() => match item {
                    Some(StreamItem::Change(change)) => self.on_cursor_changed(change.cursor).await,
                    Some(StreamItem::Lagged(missed)) => {
                        warn!(queue_id = %self.queue_id, missed, "Cursor stream lagged, resyncing");
                        self.full_sync().await;
                    }
                    None => {
                        warn!(queue_id = %self.queue_id, "Cursor stream closed");
                        break;
                    }
                },
            }
        }

        debug!(queue_id = %self.queue_id, "View observer stopped");
    }

    async fn full_sync(&mut self) {
        if let Err(err) = self.reload_cursor().await {
            return self.report(err);
        }
        if let Err(err) = self.reload_tickets().await {
            return self.report(err);
        }
        self.emit();
    }

    /// Ticket set changed: the cursor notification may not have arrived yet
    async fn on_tickets_changed(&mut self) {
        if let Err(err) = self.reload_tickets().await {
            return self.report(err);
        }
        if let Err(err) = self.reload_cursor().await {
            return self.report(err);
        }
        self.emit();
    }

    /// Cursor changed: re-read the ticket set before filtering
    async fn on_cursor_changed(&mut self, cursor: QueueCursor) {
        if !self.state.apply_cursor(cursor) {
            debug!(
                queue_id = %self.queue_id,
                version = cursor.version,
                "Ignoring stale cursor notification"
            );
        }
        if let Err(err) = self.reload_tickets().await {
            return self.report(err);
        }
        self.emit();
    }

    async fn reload_cursor(&mut self) -> Result<()> {
        let cursor = load_or_init_cursor(
            self.ports.cursors.as_ref(),
            self.ports.transactions.as_ref(),
            &self.queue_id,
            &self.policy,
        )
        .await?;
        self.state.apply_cursor(cursor);
        Ok(())
    }

    async fn reload_tickets(&mut self) -> Result<()> {
        let tickets = self.ports.tickets.list_by_queue(&self.queue_id).await?;
        self.state.replace_tickets(tickets);
        Ok(())
    }

    fn emit(&mut self) {
        let Some(view) = self.state.view() else {
            return;
        };
        if self.last_emitted.as_ref() == Some(&view) {
            return;
        }
        debug!(
            queue_id = %self.queue_id,
            current_position = view.current_position,
            waiting = view.len(),
            "Waiting view updated"
        );
        self.last_emitted = Some(view.clone());
        (self.on_change)(ViewEvent::Updated(view));
    }

    fn report(&mut self, err: crate::error::AppError) {
        warn!(queue_id = %self.queue_id, error = %err, "Failed to refresh waiting view");
        (self.on_change)(ViewEvent::Failed(err.to_string()));
    }
}
