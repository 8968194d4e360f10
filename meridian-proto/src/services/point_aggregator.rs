//! Point aggregator service stubs.
//!
//! The point aggregator assembles preprocessed per-lidar point clouds into
//! aggregated frames and occupancy grids and pushes them to subscribers.

use async_trait::async_trait;

use meridian_rpc::{
    Endpoint, HandlerError, JsonCodec, MessageCodec, MethodId, RpcError, ServiceHandler,
    ServiceId, Subscribable,
};

use crate::points::{AggregatedPointEvents, OccupancyGridEvent};
use crate::rpc::{
    check_response, DefaultSubscribeRequest, DefaultSubscribeResponse, DefaultUnsubscribeRequest,
    DefaultUnsubscribeResponse,
};

use super::BroadcastFn;

/// Client of a remote PointAggregatorService.
#[derive(Debug, Clone)]
pub struct PointAggregatorServiceClient {
    endpoint: Endpoint,
}

impl PointAggregatorServiceClient {
    /// Service identifier of the PointAggregatorService.
    pub const SERVICE_ID: ServiceId = 6;

    /// Full name of the PointAggregatorService.
    pub const FULL_NAME: &'static str = "meridian.PointAggregatorService";

    /// Create a client which communicates with the remote service via
    /// `endpoint`.
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// The endpoint this client communicates with.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Subscribes to receive aggregated point cloud broadcasts.
    ///
    /// # Errors
    ///
    /// Returns the transport-level [`RpcError`] of the underlying call.
    pub async fn subscribe(
        &self,
        request: &DefaultSubscribeRequest,
    ) -> Result<DefaultSubscribeResponse, RpcError> {
        self.endpoint
            .send_two_way(Self::SERVICE_ID, 5, request)
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
            .send_two_way(Self::SERVICE_ID, 6, request)
            .await
    }
}

#[async_trait]
impl Subscribable for PointAggregatorServiceClient {
    fn service_name(&self) -> &str {
        Self::FULL_NAME
    }

    async fn subscribe(&self) -> Result<(), RpcError> {
        let response =
            PointAggregatorServiceClient::subscribe(self, &DefaultSubscribeRequest::default())
                .await?;
        check_response(response)?;
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), RpcError> {
        let response = PointAggregatorServiceClient::unsubscribe(
            self,
            &DefaultUnsubscribeRequest::default(),
        )
        .await?;
        check_response(response)?;
        Ok(())
    }
}

/// Service identifier of the PointAggregatorSubscriberService, exposed by
/// clients of the point aggregator that wish to receive broadcasts.
pub const POINT_AGGREGATOR_SUBSCRIBER_SERVICE_ID: ServiceId = 5;

/// Handles broadcasts sent to a PointAggregatorSubscriberService.
#[derive(Default)]
pub struct PointAggregatorSubscriberServiceHandler {
    /// Invoked for every batch of processed point cloud events. Broadcasts
    /// are dropped when unset.
    pub broadcast_processed_points: Option<BroadcastFn<AggregatedPointEvents>>,
    /// Invoked for every occupancy grid update. Broadcasts are dropped when
    /// unset.
    pub broadcast_occupancy_grid: Option<BroadcastFn<OccupancyGridEvent>>,
}

#[async_trait]
impl ServiceHandler for PointAggregatorSubscriberServiceHandler {
    fn service_id(&self) -> ServiceId {
        POINT_AGGREGATOR_SUBSCRIBER_SERVICE_ID
    }

    async fn handle(
        &self,
        method_id: MethodId,
        message_bytes: &[u8],
    ) -> Result<Option<Vec<u8>>, HandlerError> {
        match method_id {
            2 => {
                let request: AggregatedPointEvents = JsonCodec.decode(message_bytes)?;
                if let Some(callback) = &self.broadcast_processed_points {
                    callback(request).await?;
                }
                Ok(None)
            }
            3 => {
                let request: OccupancyGridEvent = JsonCodec.decode(message_bytes)?;
                if let Some(callback) = &self.broadcast_occupancy_grid {
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
    use crate::points::{PointEvent, PointFrame};

    #[tokio::test]
    async fn test_handler_routes_methods_independently() {
        let frames = Arc::new(AtomicU32::new(0));
        let grids = Arc::new(AtomicU32::new(0));
        let handler = PointAggregatorSubscriberServiceHandler {
            broadcast_processed_points: Some({
                let frames = frames.clone();
                Arc::new(move |events: AggregatedPointEvents| {
                    let frames = frames.clone();
                    Box::pin(async move {
                        frames.fetch_add(events.events.len() as u32, Ordering::SeqCst);
                        Ok(())
                    })
                })
            }),
            broadcast_occupancy_grid: Some({
                let grids = grids.clone();
                Arc::new(move |_: OccupancyGridEvent| {
                    let grids = grids.clone();
                    Box::pin(async move {
                        grids.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                })
            }),
        };

        let events = AggregatedPointEvents {
            events: vec![PointEvent {
                point_frame: PointFrame::default(),
            }],
        };
        handler
            .handle(2, &JsonCodec.encode(&events).expect("encode"))
            .await
            .expect("points broadcast");
        handler
            .handle(3, &JsonCodec.encode(&OccupancyGridEvent::default()).expect("encode"))
            .await
            .expect("grid broadcast");

        assert_eq!(frames.load(Ordering::SeqCst), 1);
        assert_eq!(grids.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_broadcast_is_a_decode_error() {
        let handler = PointAggregatorSubscriberServiceHandler::default();

        let error = handler
            .handle(2, b"not json")
            .await
            .expect_err("malformed payload");
        assert!(matches!(error, HandlerError::Decode(_)));
    }
}
