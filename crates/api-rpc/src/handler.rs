//! RPC Method Handlers
//!
//! Thin adapters between the JSON-RPC surface and the queue service.

use crate::error::to_rpc_error;
use crate::types::{AdvanceResponse, EnrollRequest, EnrollResponse, QueueRequest, ViewResponse};
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::{PendingSubscriptionSink, SubscriptionMessage};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};
use waitline_core::application::{QueueService, ViewEvent};
use waitline_core::domain::{QueueId, WaitingView};

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    service: Arc<QueueService>,
    default_queue: QueueId,
}

impl RpcHandler {
    pub fn new(service: Arc<QueueService>, default_queue: QueueId) -> Self {
        Self {
            service,
            default_queue,
        }
    }

    fn queue_id(&self, queue: Option<&str>) -> Result<QueueId, ErrorObjectOwned> {
        match queue {
            None => Ok(self.default_queue.clone()),
            Some(raw) => QueueId::parse(raw).map_err(|e| to_rpc_error(e.into())),
        }
    }

    /// queue.enroll.v1
    pub async fn enroll(&self, params: EnrollRequest) -> Result<EnrollResponse, ErrorObjectOwned> {
        let queue_id = self.queue_id(params.queue.as_deref())?;
        let ticket = self
            .service
            .enroll(&queue_id, &params.display_name)
            .await
            .map_err(to_rpc_error)?;

        Ok(ticket.into())
    }

    /// queue.advance.v1
    pub async fn advance(&self, params: QueueRequest) -> Result<AdvanceResponse, ErrorObjectOwned> {
        let queue_id = self.queue_id(params.queue.as_deref())?;
        let cursor = self
            .service
            .advance(&queue_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(AdvanceResponse::new(&queue_id, cursor))
    }

    /// queue.view.v1
    pub async fn view(&self, params: QueueRequest) -> Result<ViewResponse, ErrorObjectOwned> {
        let queue_id = self.queue_id(params.queue.as_deref())?;
        let view = self
            .service
            .waiting_view(&queue_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(ViewResponse::new(&queue_id, &view))
    }

    /// queue.watch.v1
    ///
    /// Pushes `queue.view.changed` with the full view whenever it changes,
    /// starting with the current one. The observer is released when the
    /// client unsubscribes or disconnects.
    pub async fn watch(
        &self,
        params: QueueRequest,
        pending: PendingSubscriptionSink,
    ) -> SubscriptionResult {
        let queue_id = match self.queue_id(params.queue.as_deref()) {
            Ok(queue_id) => queue_id,
            Err(err) => {
                pending.reject(err).await;
                return Ok(());
            }
        };

        let (on_change, mut rx) = latest_view_bridge(queue_id.clone());
        let subscription = match self.service.observe_waiting_view(queue_id.clone(), on_change) {
            Ok(subscription) => subscription,
            Err(err) => {
                pending.reject(to_rpc_error(err)).await;
                return Ok(());
            }
        };

        let sink = pending.accept().await?;
        debug!(queue_id = %queue_id, "Watch subscription opened");

        loop {
            tokio::select! {
                _ = sink.closed() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let Some(view) = rx.borrow_and_update().clone() else {
                        continue;
                    };
                    let message = SubscriptionMessage::from_json(&ViewResponse::new(&queue_id, &view))?;
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
            }
        }

        subscription.unsubscribe().await;
        debug!(queue_id = %queue_id, "Watch subscription closed");
        Ok(())
    }
}

/// Observer callback keeping only the newest view
///
/// Every view is a full snapshot, so a slow client skips intermediate ones
/// instead of buffering them.
fn latest_view_bridge(
    queue_id: QueueId,
) -> (
    impl FnMut(ViewEvent) + Send + 'static,
    watch::Receiver<Option<WaitingView>>,
) {
    let (tx, rx) = watch::channel(None);
    let on_change = move |event: ViewEvent| match event {
        ViewEvent::Updated(view) => {
            tx.send_replace(Some(view));
        }
        ViewEvent::Failed(reason) => {
            warn!(queue_id = %queue_id, reason = %reason, "Watch refresh failed");
        }
    };
    (on_change, rx)
}
