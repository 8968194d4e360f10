//! # meridian-proto
//!
//! Message schemas and service stubs for the Meridian sensor-processing
//! platform.
//!
//! The platform is composed of independent services (detection merging,
//! point aggregation, project management, notification, status), each
//! exposing two-way and one-way methods over the
//! [`meridian-rpc`](meridian_rpc) transport. This crate carries:
//!
//! - the message types exchanged with those services
//! - the platform's log-message catalogue and its human-readable formatter
//! - one client and, where broadcasts exist, one handler per service, with
//!   the platform's stable service and method identifiers baked in
//!
//! The stubs are mechanical: clients encode a request and relay it through
//! [`Endpoint::send_one_way`](meridian_rpc::Endpoint::send_one_way) or
//! [`Endpoint::send_two_way`](meridian_rpc::Endpoint::send_two_way);
//! handlers decode per method and invoke a registered callback.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Object detection messages.
pub mod detection;

/// Project manager health messages.
pub mod health;

/// Platform log catalogue and metadata.
pub mod logs;

/// Notification service messages.
pub mod notification;

/// Point aggregation messages.
pub mod points;

/// Common request/response pairs shared by every subscribable service.
pub mod rpc;

/// Per-service clients and handlers.
pub mod services;

/// Status service messages.
pub mod status;

pub use detection::{BoundingBox, DetectedObject, DetectionEvent, ObjectClass};
pub use health::{
    GetHealthStatusRequest, GetHealthStatusResponse, LicenseFeature, LicenseInfo, LicenseLevel,
    LicenseLevel3Reason, LicensePrivilege, LicenseStatus, NodeHealth, NodeService, NodeStatus,
    SensorHealth, SensorInfo, SensorStatus,
};
pub use logs::{LogData, LogMessage, LogMetadata, LogSeverity};
pub use notification::{LogMessageEvent, LogMessageRequest, ProfilingInfoEvent, SensorInfoEvent};
pub use points::{AggregatedPointEvents, OccupancyGrid, OccupancyGridEvent, PointEvent, PointFrame};
pub use rpc::{
    check_response, DefaultSubscribeRequest, DefaultSubscribeResponse, DefaultUnsubscribeRequest,
    DefaultUnsubscribeResponse, ResponseWithError,
};
pub use status::{GetVersionRequest, GetVersionResponse, Version};
