//! Per-service clients and handlers.
//!
//! One client per remote service, carrying the platform's stable service
//! and method identifiers, and one handler per subscriber service exposed
//! by clients that wish to receive broadcasts. Method identifiers are
//! opaque routing keys assigned per service; the transport never
//! reinterprets their numeric values.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use meridian_rpc::HandlerError;

/// Future returned by a broadcast callback.
pub type BroadcastFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

/// Callback invoked for one inbound broadcast message.
///
/// The read loop waits for the returned future, so a slow callback delays
/// processing of the next inbound frame.
pub type BroadcastFn<M> = Arc<dyn Fn(M) -> BroadcastFuture + Send + Sync>;

/// Detection merger service stubs.
pub mod detection_merger;

/// Notification service stubs.
pub mod notification;

/// Point aggregator service stubs.
pub mod point_aggregator;

/// Project manager service stubs.
pub mod project_manager;

/// Status service stubs.
pub mod status;

pub use detection_merger::{
    DetectionMergerServiceClient, DetectionMergerSubscriberServiceHandler,
    DETECTION_MERGER_SUBSCRIBER_SERVICE_ID,
};
pub use notification::{
    NotificationListenerServiceHandler, NotificationServiceClient,
    NOTIFICATION_LISTENER_SERVICE_ID,
};
pub use point_aggregator::{
    PointAggregatorServiceClient, PointAggregatorSubscriberServiceHandler,
    POINT_AGGREGATOR_SUBSCRIBER_SERVICE_ID,
};
pub use project_manager::ProjectManagerServiceClient;
pub use status::StatusServiceClient;
