//! # meridian-sdk
//!
//! Rust SDK for the Meridian sensor-processing platform.
//!
//! An [`Sdk`] connects to the configured platform services over
//! [`meridian-rpc`](meridian_rpc) endpoints, keeps those connections alive
//! across restarts of the platform, and exposes typed subscriptions and
//! queries on top of them. Subscriptions are reference counted: any number
//! of local callbacks share one remote subscription per service, and
//! server-side subscription state is restored automatically whenever a
//! connection comes back.
//!
//! ```no_run
//! use meridian_sdk::{Sdk, SdkOptions};
//!
//! # async fn run() -> Result<(), meridian_sdk::SdkError> {
//! let sdk = Sdk::connect(SdkOptions::default()).await?;
//!
//! let mut subscription = sdk
//!     .subscribe_to_objects(|event| {
//!         println!("{} objects detected", event.objects.len());
//!     })
//!     .await?;
//!
//! println!("platform version: {}", sdk.version().await?);
//!
//! subscription.close().await;
//! sdk.close().await;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

use std::sync::Arc;

use meridian_proto::services::{
    BroadcastFuture, DetectionMergerServiceClient, DetectionMergerSubscriberServiceHandler,
    NotificationListenerServiceHandler, NotificationServiceClient, PointAggregatorServiceClient,
    PointAggregatorSubscriberServiceHandler, ProjectManagerServiceClient, StatusServiceClient,
};
use meridian_proto::{
    AggregatedPointEvents, DetectionEvent, GetHealthStatusRequest, GetVersionRequest,
    LogMessageEvent, OccupancyGridEvent, PointFrame, Version,
};
use meridian_rpc::{CallbackSet, Endpoint, EndpointCallbacks, RpcError, SubscriptionGroup};

/// Service configuration.
pub mod config;

/// Caller-facing health types.
pub mod health;

/// Caller-facing log messages.
pub mod logs;

pub use config::{ServiceInfo, Services};
pub use health::{HealthStatus, LicenseInfo, LicenseStatus, NodeHealth, SensorHealth};
pub use logs::Log;

// Re-exported for callers wiring callbacks and matching errors.
pub use meridian_proto::{LicenseFeature, LicensePrivilege, LogSeverity, SensorStatus};
pub use meridian_rpc::RpcError as TransportError;
pub use meridian_rpc::Subscription;

/// Errors surfaced by [`Sdk`] operations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// The SDK was configured without the service this operation needs.
    #[error("SDK is not configured to connect to the {0} service")]
    ServiceUnavailable(&'static str),

    /// The underlying call failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Callback invoked with the affected service when a connection is
/// established.
pub type ConnectedCallback = Arc<dyn Fn(&ServiceInfo) + Send + Sync>;

/// Callback invoked when a connection is lost. The error is `None` when
/// the disconnection was requested via [`Sdk::close`].
pub type DisconnectedCallback = Arc<dyn Fn(&ServiceInfo, Option<&RpcError>) + Send + Sync>;

/// Callback invoked on errors encountered outside of a disconnection.
pub type ErrorCallback = Arc<dyn Fn(&ServiceInfo, &RpcError) + Send + Sync>;

/// Options for creating an [`Sdk`] with [`Sdk::connect`].
#[derive(Clone, Default)]
pub struct SdkOptions {
    /// The services to connect to. Defaults to [`Services::default`].
    pub services: Option<Services>,

    /// Called when a connection is established.
    pub on_connected: Option<ConnectedCallback>,

    /// Called when a connection is closed. Every `on_connected` call is
    /// always followed by exactly one `on_disconnected` call.
    pub on_disconnected: Option<DisconnectedCallback>,

    /// Called when an error is encountered outside of a disconnection.
    pub on_error: Option<ErrorCallback>,
}

/// One connected subscribable service: its client, its subscription group
/// and the endpoint they share.
struct Connected<C> {
    client: Arc<C>,
    group: Arc<SubscriptionGroup>,
    endpoint: Endpoint,
}

/// Access to the Meridian platform services.
pub struct Sdk {
    detection_merger: Option<Connected<DetectionMergerServiceClient>>,
    point_aggregator: Option<Connected<PointAggregatorServiceClient>>,
    notification: Option<Connected<NotificationServiceClient>>,
    project_manager: Option<ProjectManagerServiceClient>,
    status: Option<StatusServiceClient>,

    detection_events: Arc<CallbackSet<DetectionEvent>>,
    point_events: Arc<CallbackSet<AggregatedPointEvents>>,
    occupancy_events: Arc<CallbackSet<OccupancyGridEvent>>,
    log_events: Arc<CallbackSet<LogMessageEvent>>,
}

impl Sdk {
    /// Connect to the configured services concurrently.
    ///
    /// Services whose peer is not up yet still connect successfully: the
    /// endpoints keep retrying in the background and subscriptions are
    /// established once connectivity returns.
    ///
    /// # Errors
    ///
    /// Returns an error only for non-connectivity failures, e.g. an
    /// unresolvable host in the configuration.
    pub async fn connect(options: SdkOptions) -> Result<Sdk, SdkError> {
        let services = options.services.clone().unwrap_or_default();

        let detection_events = Arc::new(CallbackSet::new());
        let point_events = Arc::new(CallbackSet::new());
        let occupancy_events = Arc::new(CallbackSet::new());
        let log_events = Arc::new(CallbackSet::new());

        let detection_future = async {
            let Some(info) = services.detection_merger.clone() else {
                return Ok::<_, SdkError>(None);
            };
            let group = Arc::new(SubscriptionGroup::new());
            let endpoint = connect_endpoint(&info, &options, Some(group.clone())).await?;
            endpoint.set_handler(Arc::new(DetectionMergerSubscriberServiceHandler {
                broadcast_detection: Some({
                    let events = detection_events.clone();
                    Arc::new(move |event: DetectionEvent| -> BroadcastFuture {
                        let events = events.clone();
                        Box::pin(async move {
                            events.dispatch(event).await;
                            Ok(())
                        })
                    })
                }),
            }));
            let client = Arc::new(DetectionMergerServiceClient::new(endpoint.clone()));
            group.bind(client.clone());
            Ok(Some(Connected {
                client,
                group,
                endpoint,
            }))
        };

        let point_future = async {
            let Some(info) = services.point_aggregator.clone() else {
                return Ok::<_, SdkError>(None);
            };
            let group = Arc::new(SubscriptionGroup::new());
            let endpoint = connect_endpoint(&info, &options, Some(group.clone())).await?;
            endpoint.set_handler(Arc::new(PointAggregatorSubscriberServiceHandler {
                broadcast_processed_points: Some({
                    let events = point_events.clone();
                    Arc::new(move |event: AggregatedPointEvents| -> BroadcastFuture {
                        let events = events.clone();
                        Box::pin(async move {
                            events.dispatch(event).await;
                            Ok(())
                        })
                    })
                }),
                broadcast_occupancy_grid: Some({
                    let events = occupancy_events.clone();
                    Arc::new(move |event: OccupancyGridEvent| -> BroadcastFuture {
                        let events = events.clone();
                        Box::pin(async move {
                            events.dispatch(event).await;
                            Ok(())
                        })
                    })
                }),
            }));
            let client = Arc::new(PointAggregatorServiceClient::new(endpoint.clone()));
            group.bind(client.clone());
            Ok(Some(Connected {
                client,
                group,
                endpoint,
            }))
        };

        let notification_future = async {
            let Some(info) = services.notification.clone() else {
                return Ok::<_, SdkError>(None);
            };
            let group = Arc::new(SubscriptionGroup::new());
            let endpoint = connect_endpoint(&info, &options, Some(group.clone())).await?;
            endpoint.set_handler(Arc::new(NotificationListenerServiceHandler {
                notify_log_message: Some({
                    let events = log_events.clone();
                    Arc::new(move |event: LogMessageEvent| -> BroadcastFuture {
                        let events = events.clone();
                        Box::pin(async move {
                            events.dispatch(event).await;
                            Ok(())
                        })
                    })
                }),
                ..Default::default()
            }));
            let client = Arc::new(NotificationServiceClient::new(endpoint.clone()));
            group.bind(client.clone());
            Ok(Some(Connected {
                client,
                group,
                endpoint,
            }))
        };

        let project_manager_future = async {
            let Some(info) = services.project_manager.clone() else {
                return Ok::<_, SdkError>(None);
            };
            let endpoint = connect_endpoint(&info, &options, None).await?;
            Ok(Some(ProjectManagerServiceClient::new(endpoint)))
        };

        let (detection_merger, point_aggregator, notification, project_manager) = tokio::try_join!(
            detection_future,
            point_future,
            notification_future,
            project_manager_future
        )?;

        // The status service runs in every platform binary; serve it from
        // the first available endpoint.
        let status = detection_merger
            .as_ref()
            .map(|connected| connected.endpoint.clone())
            .or_else(|| {
                point_aggregator
                    .as_ref()
                    .map(|connected| connected.endpoint.clone())
            })
            .or_else(|| {
                notification
                    .as_ref()
                    .map(|connected| connected.endpoint.clone())
            })
            .or_else(|| {
                project_manager
                    .as_ref()
                    .map(|client| client.endpoint().clone())
            })
            .map(StatusServiceClient::new);

        Ok(Sdk {
            detection_merger,
            point_aggregator,
            notification,
            project_manager,
            status,
            detection_events,
            point_events,
            occupancy_events,
            log_events,
        })
    }

    /// Subscribe to object detection events; `callback` runs for each
    /// event received.
    ///
    /// # Errors
    ///
    /// Fails if the SDK is not configured to connect to the detection
    /// merger service.
    pub async fn subscribe_to_objects(
        &self,
        callback: impl Fn(DetectionEvent) + Send + Sync + 'static,
    ) -> Result<Subscription, SdkError> {
        let Some(connected) = &self.detection_merger else {
            return Err(SdkError::ServiceUnavailable("detection merger"));
        };
        let token = self.detection_events.register(callback);
        let events = self.detection_events.clone();
        Ok(connected
            .group
            .clone()
            .add_subscription(move || events.deregister(token))
            .await)
    }

    /// Subscribe to point cloud broadcasts; `callback` runs for each frame
    /// received.
    ///
    /// # Errors
    ///
    /// Fails if the SDK is not configured to connect to the point
    /// aggregator service.
    pub async fn subscribe_to_point_clouds(
        &self,
        callback: impl Fn(PointFrame) + Send + Sync + 'static,
    ) -> Result<Subscription, SdkError> {
        let Some(connected) = &self.point_aggregator else {
            return Err(SdkError::ServiceUnavailable("point aggregator"));
        };
        let token = self
            .point_events
            .register(move |events: AggregatedPointEvents| {
                for event in events.events {
                    callback(event.point_frame);
                }
            });
        let events = self.point_events.clone();
        Ok(connected
            .group
            .clone()
            .add_subscription(move || events.deregister(token))
            .await)
    }

    /// Subscribe to occupancy grid updates; `callback` runs for each
    /// update received.
    ///
    /// # Errors
    ///
    /// Fails if the SDK is not configured to connect to the point
    /// aggregator service.
    pub async fn subscribe_to_occupancy_grids(
        &self,
        callback: impl Fn(OccupancyGridEvent) + Send + Sync + 'static,
    ) -> Result<Subscription, SdkError> {
        let Some(connected) = &self.point_aggregator else {
            return Err(SdkError::ServiceUnavailable("point aggregator"));
        };
        let token = self.occupancy_events.register(callback);
        let events = self.occupancy_events.clone();
        Ok(connected
            .group
            .clone()
            .add_subscription(move || events.deregister(token))
            .await)
    }

    /// Subscribe to platform log messages; `callback` runs for each log
    /// received.
    ///
    /// # Errors
    ///
    /// Fails if the SDK is not configured to connect to the notification
    /// service.
    pub async fn subscribe_to_logs(
        &self,
        callback: impl Fn(Log) + Send + Sync + 'static,
    ) -> Result<Subscription, SdkError> {
        let Some(connected) = &self.notification else {
            return Err(SdkError::ServiceUnavailable("notification"));
        };
        let token = self.log_events.register(move |event: LogMessageEvent| {
            callback(Log::from_event(event));
        });
        let events = self.log_events.clone();
        Ok(connected
            .group
            .clone()
            .add_subscription(move || events.deregister(token))
            .await)
    }

    /// The platform version reported by the status service.
    ///
    /// # Errors
    ///
    /// Fails if no service is available to answer, or with the failure of
    /// the underlying call.
    pub async fn version(&self) -> Result<Version, SdkError> {
        let Some(status) = &self.status else {
            return Err(SdkError::ServiceUnavailable("status"));
        };
        let response = status.get_version(&GetVersionRequest::default()).await?;
        Ok(response.version)
    }

    /// The health of the installation as reported by the project manager.
    ///
    /// # Errors
    ///
    /// Fails if the SDK is not configured to connect to the project
    /// manager service, or with the failure of the underlying call.
    pub async fn health_status(&self) -> Result<HealthStatus, SdkError> {
        let Some(project_manager) = &self.project_manager else {
            return Err(SdkError::ServiceUnavailable("project manager"));
        };
        let response = project_manager
            .get_health_status(&GetHealthStatusRequest::default())
            .await?;
        Ok(HealthStatus::from_response(response))
    }

    /// Close every connection used by the SDK.
    ///
    /// Open subscriptions become inert; no Unsubscribe calls are issued
    /// since the connections are going away.
    pub async fn close(&self) {
        if let Some(connected) = &self.detection_merger {
            connected.group.clear();
        }
        if let Some(connected) = &self.point_aggregator {
            connected.group.clear();
        }
        if let Some(connected) = &self.notification {
            connected.group.clear();
        }

        let mut endpoints = Vec::new();
        if let Some(connected) = &self.detection_merger {
            endpoints.push(connected.endpoint.clone());
        }
        if let Some(connected) = &self.point_aggregator {
            endpoints.push(connected.endpoint.clone());
        }
        if let Some(connected) = &self.notification {
            endpoints.push(connected.endpoint.clone());
        }
        if let Some(client) = &self.project_manager {
            endpoints.push(client.endpoint().clone());
        }
        for endpoint in endpoints {
            endpoint.close().await;
        }
    }

    /// The notification client, for reporting log messages to the hub.
    pub fn notification_client(&self) -> Option<&NotificationServiceClient> {
        self.notification
            .as_ref()
            .map(|connected| connected.client.as_ref())
    }
}

/// Connect one endpoint, wiring the SDK-level callbacks (and, for
/// subscribable services, the automatic resubscription) into its lifecycle
/// callbacks.
async fn connect_endpoint(
    info: &ServiceInfo,
    options: &SdkOptions,
    group: Option<Arc<SubscriptionGroup>>,
) -> Result<Endpoint, SdkError> {
    let mut callbacks = EndpointCallbacks::new();

    {
        let info = info.clone();
        let user = options.on_connected.clone();
        callbacks = callbacks.on_connected(move || {
            if let Some(group) = &group {
                group.handle_connected();
            }
            if let Some(callback) = &user {
                callback(&info);
            }
        });
    }
    {
        let info = info.clone();
        let user = options.on_disconnected.clone();
        callbacks = callbacks.on_disconnected(move |error| {
            if let Some(callback) = &user {
                callback(&info, error.as_ref());
            }
        });
    }
    {
        let info = info.clone();
        let user = options.on_error.clone();
        callbacks = callbacks.on_error(move |error| {
            if let Some(callback) = &user {
                callback(&info, &error);
            }
        });
    }

    let endpoint = Endpoint::connect(info.endpoint_config(), callbacks).await?;
    tracing::debug!(
        service = %info.full_name,
        endpoint = %endpoint.address(),
        "service endpoint ready"
    );
    Ok(endpoint)
}
