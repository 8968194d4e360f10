//! Service configuration.
//!
//! The set of services to connect to is an explicit configuration object
//! passed to [`Sdk::connect`](crate::Sdk::connect) and immutable
//! afterwards. [`Services::default`] is the fixed table of the platform's
//! standard deployments; individual entries can be replaced or disabled.

use meridian_proto::services::{
    DetectionMergerServiceClient, NotificationServiceClient, PointAggregatorServiceClient,
    ProjectManagerServiceClient,
};
use meridian_rpc::{EndpointConfig, ServiceId};

/// Information about one Meridian RPC service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Unique full name of the service, e.g. `meridian.NotificationService`.
    pub full_name: String,
    /// Unique identifier of the service, e.g. 2.
    pub id: ServiceId,
    /// Host to connect to the service, e.g. `localhost`.
    pub host: String,
    /// Port to connect to the service, e.g. `40002`.
    pub port: u16,
}

impl ServiceInfo {
    /// Create a service description.
    pub fn new(full_name: impl Into<String>, id: ServiceId, host: impl Into<String>, port: u16) -> Self {
        Self {
            full_name: full_name.into(),
            id,
            host: host.into(),
            port,
        }
    }

    /// Returns a copy of `self` with its host replaced.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Returns a copy of `self` with its port replaced.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub(crate) fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig::new(self.host.clone(), self.port)
    }
}

/// The services an [`Sdk`](crate::Sdk) connects to.
///
/// Entries set to `None` are not connected to; the SDK operations that
/// need them fail with
/// [`SdkError::ServiceUnavailable`](crate::SdkError::ServiceUnavailable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Services {
    /// The detection merger service.
    pub detection_merger: Option<ServiceInfo>,
    /// The point aggregator service.
    pub point_aggregator: Option<ServiceInfo>,
    /// The project manager service.
    pub project_manager: Option<ServiceInfo>,
    /// The notification service.
    pub notification: Option<ServiceInfo>,
}

impl Services {
    /// Returns a copy of `self` with its detection merger entry replaced.
    pub fn with_detection_merger(mut self, info: Option<ServiceInfo>) -> Self {
        self.detection_merger = info;
        self
    }

    /// Returns a copy of `self` with its point aggregator entry replaced.
    pub fn with_point_aggregator(mut self, info: Option<ServiceInfo>) -> Self {
        self.point_aggregator = info;
        self
    }

    /// Returns a copy of `self` with its project manager entry replaced.
    pub fn with_project_manager(mut self, info: Option<ServiceInfo>) -> Self {
        self.project_manager = info;
        self
    }

    /// Returns a copy of `self` with its notification entry replaced.
    pub fn with_notification(mut self, info: Option<ServiceInfo>) -> Self {
        self.notification = info;
        self
    }
}

impl Default for Services {
    /// The standard deployment: every service on the local host, one port
    /// per service identifier.
    fn default() -> Self {
        Self {
            detection_merger: Some(ServiceInfo::new(
                DetectionMergerServiceClient::FULL_NAME,
                DetectionMergerServiceClient::SERVICE_ID,
                "127.0.0.1",
                40011,
            )),
            point_aggregator: Some(ServiceInfo::new(
                PointAggregatorServiceClient::FULL_NAME,
                PointAggregatorServiceClient::SERVICE_ID,
                "127.0.0.1",
                40006,
            )),
            project_manager: Some(ServiceInfo::new(
                ProjectManagerServiceClient::FULL_NAME,
                ProjectManagerServiceClient::SERVICE_ID,
                "127.0.0.1",
                40003,
            )),
            notification: Some(ServiceInfo::new(
                NotificationServiceClient::FULL_NAME,
                NotificationServiceClient::SERVICE_ID,
                "127.0.0.1",
                40002,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_matches_service_ids() {
        let services = Services::default();

        let detection = services.detection_merger.expect("detection merger entry");
        assert_eq!(detection.id, 11);
        assert_eq!(detection.port, 40011);

        let notification = services.notification.expect("notification entry");
        assert_eq!(notification.id, 2);
        assert_eq!(notification.full_name, "meridian.NotificationService");
    }

    #[test]
    fn test_with_host_and_port() {
        let services = Services::default();
        let pm = services
            .project_manager
            .expect("project manager entry")
            .with_host("10.0.0.7")
            .with_port(41003);
        assert_eq!(pm.host, "10.0.0.7");
        assert_eq!(pm.port, 41003);
        assert_eq!(pm.endpoint_config().address(), "10.0.0.7:41003");
    }

    #[test]
    fn test_disabling_a_service() {
        let services = Services::default().with_detection_merger(None);
        assert!(services.detection_merger.is_none());
        assert!(services.point_aggregator.is_some());
    }
}
