//! Caller-facing health types.
//!
//! These wrap the raw project manager messages into lookup-friendly maps
//! and formatted reason strings.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use meridian_proto::health as pb;
use meridian_proto::{GetHealthStatusResponse, LicenseFeature, LicensePrivilege, SensorStatus};

/// Current license information.
#[derive(Debug, Clone, PartialEq)]
pub struct LicenseInfo {
    /// Expiration timestamp of the current license.
    pub expiration: SystemTime,
    /// Number of lidars allowed by the current license.
    pub lidar_count: u32,
    /// Features allowed by the license.
    pub allowed_features: Vec<LicenseFeature>,
}

impl LicenseInfo {
    fn from_pb(info: pb::LicenseInfo) -> Self {
        Self {
            expiration: UNIX_EPOCH + Duration::from_millis(info.expiration_ms_since_epoch),
            lidar_count: info.lidar_count,
            allowed_features: info.allowed_features,
        }
    }
}

/// License status gathering all license information.
#[derive(Debug, Clone, PartialEq)]
pub struct LicenseStatus {
    /// Level number, from 1 to 4.
    pub license_level: u32,
    /// Reason why the license is at that level.
    pub reason: String,
    /// Whether each existing privilege is granted.
    pub privileges: HashMap<LicensePrivilege, bool>,
    /// License details when a license has been found (level 3 and up).
    pub license_info: Option<LicenseInfo>,
}

impl LicenseStatus {
    /// Whether the license grants a specific privilege.
    pub fn has_privilege(&self, privilege: LicensePrivilege) -> bool {
        self.privileges.get(&privilege).copied().unwrap_or(false)
    }

    fn from_pb(status: pb::LicenseStatus) -> Self {
        let mut privileges = HashMap::new();
        for privilege in LicensePrivilege::ALL {
            let granted = (status.privilege & privilege as u32) == privilege as u32;
            privileges.insert(privilege, granted);
        }

        Self {
            license_level: status.license_level.number(),
            reason: status.license_level.reason().to_string(),
            privileges,
            license_info: status.license_info.map(LicenseInfo::from_pb),
        }
    }
}

/// Health of one lidar.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorHealth {
    /// Unique identifier of the lidar.
    pub lidar_id: String,
    /// Whether each status flag applies to the lidar. `None` when the
    /// sensor could not be reached.
    pub statuses: Option<HashMap<SensorStatus, bool>>,
    /// Measured frequency of the lidar, in hertz.
    pub measured_frequency_hz: f64,
    /// Why the sensor status could not be fetched. Empty if reachable.
    pub unreachable_reason: String,
}

impl SensorHealth {
    /// Whether the sensor has a specific status flag.
    pub fn has_status(&self, status: SensorStatus) -> bool {
        self.statuses
            .as_ref()
            .and_then(|statuses| statuses.get(&status).copied())
            .unwrap_or(false)
    }

    /// Whether the sensor could not be reached.
    pub fn is_unreachable(&self) -> bool {
        !self.unreachable_reason.is_empty()
    }

    fn from_pb(sensor: pb::SensorHealth) -> Self {
        // A zero status bitmask means the preprocessing node owning the
        // sensor never answered.
        let (statuses, unreachable_reason) = if sensor.info.status == 0 {
            let reason = sensor
                .timeout
                .map(|timeout| timeout.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            (None, reason)
        } else {
            let mut statuses = HashMap::new();
            for status in SensorStatus::ALL {
                let applies = (sensor.info.status & status as u32) == status as u32;
                statuses.insert(status, applies);
            }
            (Some(statuses), String::new())
        };

        Self {
            lidar_id: sensor.info.lidar_id,
            statuses,
            measured_frequency_hz: sensor.info.measured_frequency,
            unreachable_reason,
        }
    }
}

/// Connectivity status of one service node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHealth {
    /// Service the node is running.
    pub service: pb::NodeService,
    /// Unique identifier of the node.
    pub node_id: String,
    /// Connectivity status of the node.
    pub status: pb::NodeStatus,
}

/// Health status returned by the project manager.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    /// License status.
    pub license_status: LicenseStatus,
    /// Status of the lidars. Empty if the license does not grant Read.
    pub sensor_statuses: Vec<SensorHealth>,
    /// Status of the service nodes. Empty if the license does not grant
    /// Read.
    pub service_statuses: Vec<NodeHealth>,
}

impl HealthStatus {
    pub(crate) fn from_response(response: GetHealthStatusResponse) -> Self {
        let license_status = LicenseStatus::from_pb(response.license_status);

        let (sensor_statuses, service_statuses) =
            if license_status.has_privilege(LicensePrivilege::Read) {
                (
                    response
                        .sensor_statuses
                        .into_iter()
                        .map(SensorHealth::from_pb)
                        .collect(),
                    response
                        .service_statuses
                        .into_iter()
                        .map(|node| NodeHealth {
                            service: node.service,
                            node_id: node.node_id,
                            status: node.node_status,
                        })
                        .collect(),
                )
            } else {
                (Vec::new(), Vec::new())
            };

        Self {
            license_status,
            sensor_statuses,
            service_statuses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_proto::logs::LogData;
    use meridian_proto::{LicenseLevel, NodeService, NodeStatus, SensorInfo};

    fn response(privilege: u32) -> GetHealthStatusResponse {
        GetHealthStatusResponse {
            license_status: pb::LicenseStatus {
                license_level: LicenseLevel::Level4 {
                    license_active: LogData::LicenseActive,
                },
                privilege,
                license_info: Some(pb::LicenseInfo {
                    expiration_ms_since_epoch: 1_800_000_000_000,
                    lidar_count: 16,
                    allowed_features: vec![LicenseFeature::Analytics],
                }),
            },
            sensor_statuses: vec![
                pb::SensorHealth {
                    info: SensorInfo {
                        lidar_id: "lidar-a".to_string(),
                        status: SensorStatus::ReceivingData as u32 | SensorStatus::Tilted as u32,
                        measured_frequency: 9.8,
                    },
                    timeout: None,
                },
                pb::SensorHealth {
                    info: SensorInfo {
                        lidar_id: "lidar-b".to_string(),
                        status: 0,
                        measured_frequency: 0.0,
                    },
                    timeout: Some(LogData::ServiceConnectionTimedOut {
                        node_type: "Preprocessing".to_string(),
                        node_id: "pre-1".to_string(),
                    }),
                },
            ],
            service_statuses: vec![pb::NodeHealth {
                service: NodeService::Detection,
                node_id: "det-1".to_string(),
                node_status: NodeStatus::Alive,
            }],
        }
    }

    #[test]
    fn test_conversion_with_read_privilege() {
        let all = LicensePrivilege::ALL
            .iter()
            .fold(0u32, |mask, privilege| mask | *privilege as u32);
        let health = HealthStatus::from_response(response(all));

        assert_eq!(health.license_status.license_level, 4);
        assert_eq!(health.license_status.reason, "License is active.");
        assert!(health.license_status.has_privilege(LicensePrivilege::Write));
        assert_eq!(
            health
                .license_status
                .license_info
                .as_ref()
                .expect("license info")
                .lidar_count,
            16
        );

        assert_eq!(health.sensor_statuses.len(), 2);
        let reachable = &health.sensor_statuses[0];
        assert!(!reachable.is_unreachable());
        assert!(reachable.has_status(SensorStatus::ReceivingData));
        assert!(reachable.has_status(SensorStatus::Tilted));
        assert!(!reachable.has_status(SensorStatus::Obstructed));

        let unreachable = &health.sensor_statuses[1];
        assert!(unreachable.is_unreachable());
        assert!(unreachable.unreachable_reason.contains("pre-1"));
        assert!(!unreachable.has_status(SensorStatus::NoData));

        assert_eq!(health.service_statuses.len(), 1);
        assert_eq!(health.service_statuses[0].status, NodeStatus::Alive);
    }

    #[test]
    fn test_statuses_withheld_without_read_privilege() {
        let health =
            HealthStatus::from_response(response(LicensePrivilege::Lowest as u32));

        assert!(!health.license_status.has_privilege(LicensePrivilege::Read));
        assert!(health.sensor_statuses.is_empty());
        assert!(health.service_statuses.is_empty());
    }
}
