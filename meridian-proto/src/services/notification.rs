//! Notification service stubs.
//!
//! The notification hub collects log messages from every node and pushes
//! them, together with profiling and sensor information, to subscribers.

use async_trait::async_trait;

use meridian_rpc::{
    Endpoint, HandlerError, JsonCodec, MessageCodec, MethodId, RpcError, ServiceHandler,
    ServiceId, Subscribable,
};

use crate::notification::{LogMessageEvent, LogMessageRequest, ProfilingInfoEvent, SensorInfoEvent};
use crate::rpc::{
    check_response, DefaultSubscribeRequest, DefaultSubscribeResponse, DefaultUnsubscribeRequest,
    DefaultUnsubscribeResponse,
};

use super::BroadcastFn;

/// Client of a remote NotificationService.
#[derive(Debug, Clone)]
pub struct NotificationServiceClient {
    endpoint: Endpoint,
}

impl NotificationServiceClient {
    /// Service identifier of the NotificationService.
    pub const SERVICE_ID: ServiceId = 2;

    /// Full name of the NotificationService.
    pub const FULL_NAME: &'static str = "meridian.NotificationService";

    /// Create a client which communicates with the remote service via
    /// `endpoint`.
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// The endpoint this client communicates with.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Report a log message to the notification hub (one-way).
    ///
    /// # Errors
    ///
    /// Returns the transport-level [`RpcError`] of the underlying call.
    pub async fn log_message(&self, request: &LogMessageRequest) -> Result<(), RpcError> {
        self.endpoint
            .send_one_way(Self::SERVICE_ID, 1, request)
            .await
    }

    /// Subscribes to receive notification broadcasts.
    ///
    /// # Errors
    ///
    /// Returns the transport-level [`RpcError`] of the underlying call.
    pub async fn subscribe(
        &self,
        request: &DefaultSubscribeRequest,
    ) -> Result<DefaultSubscribeResponse, RpcError> {
        self.endpoint
            .send_two_way(Self::SERVICE_ID, 3, request)
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
            .send_two_way(Self::SERVICE_ID, 4, request)
            .await
    }
}

#[async_trait]
impl Subscribable for NotificationServiceClient {
    fn service_name(&self) -> &str {
        Self::FULL_NAME
    }

    async fn subscribe(&self) -> Result<(), RpcError> {
        let response =
            NotificationServiceClient::subscribe(self, &DefaultSubscribeRequest::default())
                .await?;
        check_response(response)?;
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), RpcError> {
        let response =
            NotificationServiceClient::unsubscribe(self, &DefaultUnsubscribeRequest::default())
                .await?;
        check_response(response)?;
        Ok(())
    }
}

/// Service identifier of the NotificationListenerService, exposed by
/// clients of the notification hub that wish to receive broadcasts.
pub const NOTIFICATION_LISTENER_SERVICE_ID: ServiceId = 10;

/// Handles broadcasts sent to a NotificationListenerService.
#[derive(Default)]
pub struct NotificationListenerServiceHandler {
    /// Invoked for every log message broadcast. Broadcasts are dropped when
    /// unset.
    pub notify_log_message: Option<BroadcastFn<LogMessageEvent>>,
    /// Invoked for every profiling broadcast. Broadcasts are dropped when
    /// unset.
    pub notify_profiling_info: Option<BroadcastFn<ProfilingInfoEvent>>,
    /// Invoked for every sensor information broadcast. Broadcasts are
    /// dropped when unset.
    pub notify_sensor_info: Option<BroadcastFn<SensorInfoEvent>>,
}

#[async_trait]
impl ServiceHandler for NotificationListenerServiceHandler {
    fn service_id(&self) -> ServiceId {
        NOTIFICATION_LISTENER_SERVICE_ID
    }

    async fn handle(
        &self,
        method_id: MethodId,
        message_bytes: &[u8],
    ) -> Result<Option<Vec<u8>>, HandlerError> {
        match method_id {
            1 => {
                let request: LogMessageEvent = JsonCodec.decode(message_bytes)?;
                if let Some(callback) = &self.notify_log_message {
                    callback(request).await?;
                }
                Ok(None)
            }
            2 => {
                let request: ProfilingInfoEvent = JsonCodec.decode(message_bytes)?;
                if let Some(callback) = &self.notify_profiling_info {
                    callback(request).await?;
                }
                Ok(None)
            }
            3 => {
                let request: SensorInfoEvent = JsonCodec.decode(message_bytes)?;
                if let Some(callback) = &self.notify_sensor_info {
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
    use crate::logs::{LogData, LogMessage, LogMetadata, LogSeverity};

    #[tokio::test]
    async fn test_listener_dispatches_log_broadcast() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler = NotificationListenerServiceHandler {
            notify_log_message: Some({
                let hits = hits.clone();
                Arc::new(move |_: LogMessageEvent| {
                    let hits = hits.clone();
                    Box::pin(async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                })
            }),
            ..Default::default()
        };

        let event = LogMessageEvent {
            log_message: LogMessage {
                data: LogData::OutOfMemory,
                metadata: LogMetadata {
                    node_id: "detection-0".to_string(),
                    severity: LogSeverity::Fatal,
                    ms_since_epoch: 1,
                },
            },
        };
        handler
            .handle(1, &JsonCodec.encode(&event).expect("encode"))
            .await
            .expect("handle");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_method_is_a_local_error() {
        let handler = NotificationListenerServiceHandler::default();
        let error = handler.handle(42, b"{}").await.expect_err("unknown method");
        assert!(matches!(error, HandlerError::MethodNotFound(42)));
    }
}
