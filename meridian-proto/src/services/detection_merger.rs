//! Detection merger service stubs.
//!
//! The detection merger combines the results of every detection node into
//! one stream of detection events and pushes them to subscribers.

use async_trait::async_trait;

use meridian_rpc::{
    Endpoint, HandlerError, JsonCodec, MessageCodec, MethodId, RpcError, ServiceHandler,
    ServiceId, Subscribable,
};

use crate::detection::DetectionEvent;
use crate::rpc::{
    check_response, DefaultSubscribeRequest, DefaultSubscribeResponse, DefaultUnsubscribeRequest,
    DefaultUnsubscribeResponse,
};

use super::BroadcastFn;

/// Client of a remote DetectionMergerService.
#[derive(Debug, Clone)]
pub struct DetectionMergerServiceClient {
    endpoint: Endpoint,
}

impl DetectionMergerServiceClient {
    /// Service identifier of the DetectionMergerService.
    pub const SERVICE_ID: ServiceId = 11;

    /// Full name of the DetectionMergerService.
    pub const FULL_NAME: &'static str = "meridian.DetectionMergerService";

    /// Create a client which communicates with the remote service via
    /// `endpoint`.
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// The endpoint this client communicates with.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Subscribes to receive future detection results as they are made
    /// available.
    ///
    /// # Errors
    ///
    /// Returns the transport-level [`RpcError`] of the underlying call.
    pub async fn subscribe(
        &self,
        request: &DefaultSubscribeRequest,
    ) -> Result<DefaultSubscribeResponse, RpcError> {
        self.endpoint
            .send_two_way(Self::SERVICE_ID, 1, request)
            .await
    }

    /// Unsubscribe following a call to `subscribe()`.
    ///
    /// # Errors
    ///
    /// Returns the transport-level [`RpcError`] of the underlying call.
    pub async fn unsubscribe(
        &self,
        request: &DefaultUnsubscribeRequest,
    ) -> Result<DefaultUnsubscribeResponse, RpcError> {
        self.endpoint
            .send_two_way(Self::SERVICE_ID, 2, request)
            .await
    }
}

#[async_trait]
impl Subscribable for DetectionMergerServiceClient {
    fn service_name(&self) -> &str {
        Self::FULL_NAME
    }

    async fn subscribe(&self) -> Result<(), RpcError> {
        let response =
            DetectionMergerServiceClient::subscribe(self, &DefaultSubscribeRequest::default())
                .await?;
        check_response(response)?;
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), RpcError> {
        let response = DetectionMergerServiceClient::unsubscribe(
            self,
            &DefaultUnsubscribeRequest::default(),
        )
        .await?;
        check_response(response)?;
        Ok(())
    }
}

/// Service identifier of the DetectionMergerSubscriberService, exposed by
/// clients of the detection merger that wish to receive broadcasts.
pub const DETECTION_MERGER_SUBSCRIBER_SERVICE_ID: ServiceId = 16;

/// Handles broadcasts sent to a DetectionMergerSubscriberService.
#[derive(Default)]
pub struct DetectionMergerSubscriberServiceHandler {
    /// Invoked for every detection broadcast. Broadcasts are dropped when
    /// unset.
    pub broadcast_detection: Option<BroadcastFn<DetectionEvent>>,
}

#[async_trait]
impl ServiceHandler for DetectionMergerSubscriberServiceHandler {
    fn service_id(&self) -> ServiceId {
        DETECTION_MERGER_SUBSCRIBER_SERVICE_ID
    }

    async fn handle(
        &self,
        method_id: MethodId,
        message_bytes: &[u8],
    ) -> Result<Option<Vec<u8>>, HandlerError> {
        match method_id {
            1 => {
                let request: DetectionEvent = JsonCodec.decode(message_bytes)?;
                if let Some(callback) = &self.broadcast_detection {
                    callback(request).await?;
                }
                Ok(None)
            }
            _ => Err(HandlerError::MethodNotFound(method_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_handler_dispatches_detection_broadcast() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler = DetectionMergerSubscriberServiceHandler {
            broadcast_detection: Some({
                let hits = hits.clone();
                Arc::new(move |event: DetectionEvent| {
                    let hits = hits.clone();
                    Box::pin(async move {
                        hits.fetch_add(event.objects.len() as u32, Ordering::SeqCst);
                        Ok(())
                    })
                })
            }),
        };

        let event = DetectionEvent {
            objects: vec![Default::default(), Default::default()],
            frame_timestamp_ms: 1,
        };
        let bytes = JsonCodec.encode(&event).expect("encode");

        let response = handler.handle(1, &bytes).await.expect("handle");
        assert!(response.is_none(), "broadcasts produce no response");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handler_without_callback_drops_broadcast() {
        let handler = DetectionMergerSubscriberServiceHandler::default();
        let bytes = JsonCodec.encode(&DetectionEvent::default()).expect("encode");

        let response = handler.handle(1, &bytes).await.expect("handle");
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_is_a_local_error() {
        let handler = DetectionMergerSubscriberServiceHandler::default();

        let error = handler.handle(9, b"{}").await.expect_err("unknown method");
        assert!(matches!(error, HandlerError::MethodNotFound(9)));
    }
}
