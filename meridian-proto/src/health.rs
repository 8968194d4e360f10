//! Project manager health messages.
//!
//! The license level is an explicit tagged union: each level carries the
//! log message explaining why the license is at that level, so formatting a
//! reason is an exhaustive match instead of a reflective lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::logs::LogData;

/// Request of `ProjectManagerService.GetHealthStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetHealthStatusRequest {}

/// Response of `ProjectManagerService.GetHealthStatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetHealthStatusResponse {
    /// License status of the installation.
    pub license_status: LicenseStatus,
    /// Status of the lidars. Empty unless the license grants Read.
    #[serde(default)]
    pub sensor_statuses: Vec<SensorHealth>,
    /// Status of the service nodes. Empty unless the license grants Read.
    #[serde(default)]
    pub service_statuses: Vec<NodeHealth>,
}

/// License status gathering all license information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseStatus {
    /// Level of the license and why it is at that level.
    pub license_level: LicenseLevel,
    /// Bitmask of granted [`LicensePrivilege`] values.
    pub privilege: u32,
    /// License details, present from level 3 up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_info: Option<LicenseInfo>,
}

/// Level of a license, from most to least degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum LicenseLevel {
    /// Level 1: the license server cannot be reached.
    Level1 {
        /// Why the license server is unreachable.
        license_server_unreachable: LogData,
    },
    /// Level 2: no license was found.
    Level2 {
        /// Why no license was found.
        license_not_found: LogData,
    },
    /// Level 3: a license exists but is degraded.
    Level3 {
        /// Why the license is degraded.
        reason: LicenseLevel3Reason,
    },
    /// Level 4: the license is active.
    Level4 {
        /// Confirmation that the license is active.
        license_active: LogData,
    },
}

impl LicenseLevel {
    /// Level number, from 1 to 4.
    pub fn number(&self) -> u32 {
        match self {
            LicenseLevel::Level1 { .. } => 1,
            LicenseLevel::Level2 { .. } => 2,
            LicenseLevel::Level3 { .. } => 3,
            LicenseLevel::Level4 { .. } => 4,
        }
    }

    /// The log message explaining why the license is at this level.
    pub fn reason(&self) -> &LogData {
        match self {
            LicenseLevel::Level1 {
                license_server_unreachable,
            } => license_server_unreachable,
            LicenseLevel::Level2 { license_not_found } => license_not_found,
            LicenseLevel::Level3 { reason } => reason.details(),
            LicenseLevel::Level4 { license_active } => license_active,
        }
    }
}

/// Why a level-3 license is degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LicenseLevel3Reason {
    /// The license expired.
    LicenseExpired {
        /// Expiration details.
        details: LogData,
    },
    /// The license server went away after a license was seen.
    LicenseServerDisconnected {
        /// Disconnection details.
        details: LogData,
    },
}

impl LicenseLevel3Reason {
    /// The log message carried by the reason.
    pub fn details(&self) -> &LogData {
        match self {
            LicenseLevel3Reason::LicenseExpired { details } => details,
            LicenseLevel3Reason::LicenseServerDisconnected { details } => details,
        }
    }
}

/// Privileges granted by a license level, used as bits of
/// [`LicenseStatus::privilege`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum LicensePrivilege {
    /// Baseline privilege every level grants.
    Lowest = 1,
    /// Managing licenses.
    LicenseActions = 2,
    /// Subscribing to broadcasts.
    Subscribe = 4,
    /// Reading platform state.
    Read = 8,
    /// Modifying platform state.
    Write = 16,
}

impl LicensePrivilege {
    /// Every privilege, for iterating over the bitmask.
    pub const ALL: [LicensePrivilege; 5] = [
        LicensePrivilege::Lowest,
        LicensePrivilege::LicenseActions,
        LicensePrivilege::Subscribe,
        LicensePrivilege::Read,
        LicensePrivilege::Write,
    ];
}

impl fmt::Display for LicensePrivilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LicensePrivilege::Lowest => "Lowest",
            LicensePrivilege::LicenseActions => "License actions",
            LicensePrivilege::Subscribe => "Subscribe",
            LicensePrivilege::Read => "Read",
            LicensePrivilege::Write => "Write",
        };
        f.write_str(text)
    }
}

/// Details of the license currently in use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseInfo {
    /// Expiration of the license, in milliseconds since the Unix epoch.
    pub expiration_ms_since_epoch: u64,
    /// Number of lidars allowed by the license.
    pub lidar_count: u32,
    /// Features allowed by the license.
    #[serde(default)]
    pub allowed_features: Vec<LicenseFeature>,
}

/// Features a license may allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseFeature {
    /// CAN bus output.
    Can,
    /// VIN associator.
    VinAssociator,
    /// Recording multiple streams at once.
    MultiRecording,
    /// Debugging support.
    DebuggingSupport,
    /// Atlas integration.
    Atlas,
    /// Analytics suite.
    Analytics,
}

impl fmt::Display for LicenseFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LicenseFeature::Can => "CAN bus",
            LicenseFeature::VinAssociator => "VIN associator",
            LicenseFeature::MultiRecording => "Multiple recordings",
            LicenseFeature::DebuggingSupport => "Debugging support",
            LicenseFeature::Atlas => "Atlas",
            LicenseFeature::Analytics => "Analytics",
        };
        f.write_str(text)
    }
}

/// Status flags applying to a lidar, used as bits of
/// [`SensorInfo::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum SensorStatus {
    /// No packets received.
    NoData = 1,
    /// Packets are being received.
    ReceivingData = 2,
    /// Frame rate below the expected range.
    LowFrequency = 4,
    /// Frame rate above the expected range.
    HighFrequency = 8,
    /// The sensor moved from its calibrated pose.
    Tilted = 16,
    /// The field of view is obstructed.
    Obstructed = 32,
}

impl SensorStatus {
    /// Every status flag, for iterating over the bitmask.
    pub const ALL: [SensorStatus; 6] = [
        SensorStatus::NoData,
        SensorStatus::ReceivingData,
        SensorStatus::LowFrequency,
        SensorStatus::HighFrequency,
        SensorStatus::Tilted,
        SensorStatus::Obstructed,
    ];
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SensorStatus::NoData => "No data",
            SensorStatus::ReceivingData => "Receiving data",
            SensorStatus::LowFrequency => "Low frequency",
            SensorStatus::HighFrequency => "High frequency",
            SensorStatus::Tilted => "Tilted",
            SensorStatus::Obstructed => "Obstructed",
        };
        f.write_str(text)
    }
}

/// Live information about one lidar.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorInfo {
    /// Unique identifier of the lidar.
    pub lidar_id: String,
    /// Bitmask of [`SensorStatus`] flags. Zero when the preprocessing node
    /// owning the sensor could not be reached.
    pub status: u32,
    /// Measured frame rate of the lidar, in hertz.
    pub measured_frequency: f64,
}

/// Health of one lidar as reported by the project manager.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorHealth {
    /// Sensor information; `status` is zero when unreachable.
    pub info: SensorInfo,
    /// Why the sensor information could not be fetched, if it could not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<LogData>,
}

/// Service a node is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeService {
    /// Unknown service.
    Unspecified,
    /// Object detection.
    Detection,
    /// Lidar driver.
    LidarRunner,
    /// Notification hub.
    Notification,
    /// Point aggregation.
    PointAggregator,
    /// Point preprocessing.
    Preprocessing,
    /// Project management.
    ProjectManager,
}

impl fmt::Display for NodeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NodeService::Unspecified => "Unknown",
            NodeService::Detection => "Detection",
            NodeService::LidarRunner => "Lidar runner",
            NodeService::Notification => "Notification",
            NodeService::PointAggregator => "Point aggregator",
            NodeService::Preprocessing => "Preprocessing",
            NodeService::ProjectManager => "Project manager",
        };
        f.write_str(text)
    }
}

/// Connectivity status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// The node does not answer.
    Unreachable,
    /// The node answers.
    Alive,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NodeStatus::Unreachable => "Unreachable",
            NodeStatus::Alive => "Alive",
        };
        f.write_str(text)
    }
}

/// Connectivity status of one service node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHealth {
    /// Service the node is running.
    pub service: NodeService,
    /// Unique identifier of the node.
    pub node_id: String,
    /// Connectivity status of the node.
    pub node_status: NodeStatus,
}
