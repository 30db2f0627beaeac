// Change Feed Port - push notifications for ticket-set and cursor changes
//
// The two streams are independent: no ordering holds between a ticket
// notification and a cursor notification.

use crate::domain::{Position, QueueCursor, QueueId};
use crate::error::Result;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Default buffer size of each broadcast channel
pub const DEFAULT_CHANGE_FEED_CAPACITY: usize = 256;

/// A ticket was added to a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketsChanged {
    pub queue_id: QueueId,
    pub position: Position,
}

/// A cursor revision was committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorChanged {
    pub queue_id: QueueId,
    pub cursor: QueueCursor,
}

/// Notification that belongs to exactly one queue
pub trait QueueScoped: Clone + Send + 'static {
    fn queue_id(&self) -> &QueueId;
}

impl QueueScoped for TicketsChanged {
    fn queue_id(&self) -> &QueueId {
        &self.queue_id
    }
}

impl QueueScoped for CursorChanged {
    fn queue_id(&self) -> &QueueId {
        &self.queue_id
    }
}

/// Item delivered by a [`ChangeStream`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem<T> {
    Change(T),
    /// Subscriber fell behind; `n` notifications were dropped
    Lagged(u64),
}

/// Subscription to one stream, filtered to a single queue
///
/// Dropping the stream unregisters it.
pub struct ChangeStream<T> {
    queue_id: QueueId,
    rx: broadcast::Receiver<T>,
}

impl<T: QueueScoped> ChangeStream<T> {
    pub fn new(queue_id: QueueId, rx: broadcast::Receiver<T>) -> Self {
        Self { queue_id, rx }
    }

    pub fn queue_id(&self) -> &QueueId {
        &self.queue_id
    }

    /// Wait for the next notification of this queue
    ///
    /// Returns `None` once the publisher is gone. Cancel-safe.
    pub async fn recv(&mut self) -> Option<StreamItem<T>> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.queue_id() == &self.queue_id => {
                    return Some(StreamItem::Change(change))
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => return Some(StreamItem::Lagged(n)),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Subscription interface exposed by stores
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to ticket-set changes of a queue
    fn subscribe_tickets(&self, queue_id: &QueueId) -> Result<ChangeStream<TicketsChanged>>;

    /// Subscribe to cursor changes of a queue
    fn subscribe_cursor(&self, queue_id: &QueueId) -> Result<ChangeStream<CursorChanged>>;
}

/// Broadcast hub embedded by store adapters
///
/// Publishing never fails: a notification with no subscriber is dropped.
#[derive(Debug, Clone)]
pub struct ChangeBroadcaster {
    tickets: broadcast::Sender<TicketsChanged>,
    cursors: broadcast::Sender<CursorChanged>,
}

impl ChangeBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tickets, _) = broadcast::channel(capacity);
        let (cursors, _) = broadcast::channel(capacity);
        Self { tickets, cursors }
    }

    pub fn publish_ticket(&self, queue_id: &QueueId, position: Position) {
        let _ = self.tickets.send(TicketsChanged {
            queue_id: queue_id.clone(),
            position,
        });
    }

    pub fn publish_cursor(&self, queue_id: &QueueId, cursor: QueueCursor) {
        let _ = self.cursors.send(CursorChanged {
            queue_id: queue_id.clone(),
            cursor,
        });
    }

    /// Number of live subscriptions (both streams)
    pub fn subscriber_count(&self) -> usize {
        self.tickets.receiver_count() + self.cursors.receiver_count()
    }
}

impl Default for ChangeBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_FEED_CAPACITY)
    }
}

impl ChangeFeed for ChangeBroadcaster {
    fn subscribe_tickets(&self, queue_id: &QueueId) -> Result<ChangeStream<TicketsChanged>> {
        Ok(ChangeStream::new(queue_id.clone(), self.tickets.subscribe()))
    }

    fn subscribe_cursor(&self, queue_id: &QueueId) -> Result<ChangeStream<CursorChanged>> {
        Ok(ChangeStream::new(queue_id.clone(), self.cursors.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_filters_other_queues() {
        let hub = ChangeBroadcaster::default();
        let mine = QueueId::parse("mine").unwrap();
        let other = QueueId::parse("other").unwrap();

        let mut stream = hub.subscribe_tickets(&mine).unwrap();
        hub.publish_ticket(&other, 1);
        hub.publish_ticket(&mine, 7);

        let item = stream.recv().await.unwrap();
        assert_eq!(
            item,
            StreamItem::Change(TicketsChanged {
                queue_id: mine,
                position: 7
            })
        );
    }

    #[tokio::test]
    async fn test_stream_reports_lag() {
        let hub = ChangeBroadcaster::new(2);
        let queue = QueueId::parse("q").unwrap();
        let mut stream = hub.subscribe_cursor(&queue).unwrap();

        for version in 1..=5 {
            hub.publish_cursor(
                &queue,
                QueueCursor {
                    version,
                    ..QueueCursor::initial()
                },
            );
        }

        assert!(matches!(stream.recv().await, Some(StreamItem::Lagged(3))));
        match stream.recv().await {
            Some(StreamItem::Change(change)) => assert_eq!(change.cursor.version, 4),
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let hub = ChangeBroadcaster::default();
        let queue = QueueId::parse("q").unwrap();

        let tickets = hub.subscribe_tickets(&queue).unwrap();
        let cursor = hub.subscribe_cursor(&queue).unwrap();
        assert_eq!(hub.subscriber_count(), 2);

        drop(tickets);
        drop(cursor);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_ends_when_publisher_dropped() {
        let hub = ChangeBroadcaster::default();
        let queue = QueueId::parse("q").unwrap();
        let mut stream = hub.subscribe_tickets(&queue).unwrap();

        drop(hub);
        assert!(stream.recv().await.is_none());
    }
}
