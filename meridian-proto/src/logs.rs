//! Platform log catalogue and metadata.
//!
//! Every log emitted by a Meridian node is one [`LogData`] variant plus
//! [`LogMetadata`]. The catalogue is an explicit tagged union with an
//! exhaustive, compiler-checked formatter: adding a variant without a
//! display arm is a build error rather than a runtime fallback.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    Info,
    /// Unexpected but recoverable condition.
    Warning,
    /// Operation failed.
    Error,
    /// Node cannot continue.
    Fatal,
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogSeverity::Debug => "debug",
            LogSeverity::Info => "info",
            LogSeverity::Warning => "warning",
            LogSeverity::Error => "error",
            LogSeverity::Fatal => "fatal",
        };
        f.write_str(text)
    }
}

/// Metadata attached to every log message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMetadata {
    /// Unique identifier of the node which emitted the log.
    pub node_id: String,
    /// Severity of the log message.
    pub severity: LogSeverity,
    /// Time at which the node emitted the log, in milliseconds since the
    /// Unix epoch.
    pub ms_since_epoch: u64,
}

/// A log message: the event data plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    /// The event that was logged.
    pub data: LogData,
    /// Where and when the event was logged.
    pub metadata: LogMetadata,
}

/// The platform's log events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogData {
    /// Free-form message.
    Generic {
        /// Human-readable message.
        message: String,
    },
    /// A node ran out of memory.
    OutOfMemory,
    /// A connection to a remote service could not be initiated.
    RpcConnectionError {
        /// Service that could not be reached.
        target_service: String,
        /// Address of that service.
        target_uri: String,
        /// Failure details.
        details: String,
    },
    /// A connection to a remote service could not be terminated.
    RpcDisconnectionError {
        /// Service that could not be disconnected from.
        target_service: String,
        /// Address of that service.
        target_uri: String,
        /// Failure details.
        details: String,
    },
    /// An RPC request did not complete in time.
    RpcTimeout {
        /// Name of the request that timed out.
        request_name: String,
        /// Endpoint the request was sent to.
        endpoint: String,
        /// Elapsed time before giving up.
        elapsed: String,
    },
    /// A project name was rejected.
    InvalidProjectName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        details: String,
    },
    /// A project does not exist.
    ProjectNotFound {
        /// The missing project.
        name: String,
    },
    /// A project already exists.
    ProjectAlreadyExists {
        /// The conflicting project.
        name: String,
    },
    /// A project was opened.
    OpenedProject {
        /// The opened project.
        project_name: String,
    },
    /// A project was created.
    CreatedProject {
        /// The created project.
        project_name: String,
        /// Project it was copied from.
        source_name: String,
    },
    /// The active project cannot be deleted.
    ActiveProjectCannotBeDeleted,
    /// The stored configuration is invalid.
    InvalidConfiguration,
    /// The configuration is not available yet.
    ConfigUnavailable,
    /// A request failed validation.
    InvalidRequest {
        /// Why the request was rejected.
        details: String,
    },
    /// A named entity does not exist.
    EntityNotFound {
        /// Kind of the entity, e.g. `Lidar`.
        entity_type: String,
        /// Identifier of the entity.
        id: String,
    },
    /// A node stopped answering within its deadline.
    ServiceConnectionTimedOut {
        /// Kind of the node.
        node_type: String,
        /// Identifier of the node.
        node_id: String,
    },
    /// Log messages were dropped under load.
    DroppedLogs {
        /// Number of dropped messages.
        n: u64,
    },
    /// The license server could not be reached.
    LicenseServerConnectionError {
        /// Failure details.
        details: String,
    },
    /// No valid license was found.
    LicenseNotFound,
    /// The license expired.
    LicenseExpired {
        /// Expiration time of the license.
        expiration_time: String,
    },
    /// The project uses more lidars than the license allows.
    LicenseExceeded {
        /// Number of lidars in the project.
        lidar_count: u32,
        /// Number of lidars the license allows.
        max_lidar_count: u32,
    },
    /// A privileged endpoint was called without the required privilege.
    LicensePrivilegeError {
        /// The privilege that is missing.
        missing_privilege: String,
        /// Details about the level mismatch.
        level_error: String,
    },
    /// The license is active.
    LicenseActive,
    /// Recording started.
    RecordingStarted {
        /// Output path of the recording.
        path: String,
    },
    /// Recording stopped.
    RecordingStopped {
        /// Output path of the recording.
        path: String,
        /// Why it stopped.
        details: String,
    },
    /// Recording could not be started.
    RecordingFailedToStart {
        /// Failure details.
        details: String,
    },
    /// The input source was switched.
    InputSourceSwitched {
        /// The new input source.
        source: String,
    },
}

impl LogData {
    /// Stable numeric identifier of the event kind.
    pub fn id(&self) -> u32 {
        match self {
            LogData::Generic { .. } => 1,
            LogData::OutOfMemory => 2,
            LogData::RpcConnectionError { .. } => 3,
            LogData::RpcDisconnectionError { .. } => 4,
            LogData::RpcTimeout { .. } => 5,
            LogData::InvalidProjectName { .. } => 6,
            LogData::ProjectNotFound { .. } => 7,
            LogData::ProjectAlreadyExists { .. } => 8,
            LogData::OpenedProject { .. } => 9,
            LogData::CreatedProject { .. } => 10,
            LogData::ActiveProjectCannotBeDeleted => 11,
            LogData::InvalidConfiguration => 12,
            LogData::ConfigUnavailable => 13,
            LogData::InvalidRequest { .. } => 14,
            LogData::EntityNotFound { .. } => 15,
            LogData::ServiceConnectionTimedOut { .. } => 16,
            LogData::DroppedLogs { .. } => 17,
            LogData::LicenseServerConnectionError { .. } => 18,
            LogData::LicenseNotFound => 19,
            LogData::LicenseExpired { .. } => 20,
            LogData::LicenseExceeded { .. } => 21,
            LogData::LicensePrivilegeError { .. } => 22,
            LogData::LicenseActive => 23,
            LogData::RecordingStarted { .. } => 24,
            LogData::RecordingStopped { .. } => 25,
            LogData::RecordingFailedToStart { .. } => 26,
            LogData::InputSourceSwitched { .. } => 27,
        }
    }
}

impl fmt::Display for LogData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogData::Generic { message } => write!(f, "{message}"),
            LogData::OutOfMemory => write!(f, "Out of memory"),
            LogData::RpcConnectionError {
                target_service,
                target_uri,
                details,
            } => write!(
                f,
                "Cannot initiate connection to {target_service} at {target_uri}: {details}"
            ),
            LogData::RpcDisconnectionError {
                target_service,
                target_uri,
                details,
            } => write!(
                f,
                "Cannot terminate connection to {target_service} at {target_uri}: {details}"
            ),
            LogData::RpcTimeout {
                request_name,
                endpoint,
                elapsed,
            } => write!(
                f,
                "RPC request {request_name} to {endpoint} timed out after {elapsed}."
            ),
            LogData::InvalidProjectName { name, details } => {
                write!(f, "Project name `{name}` is invalid: {details}")
            }
            LogData::ProjectNotFound { name } => write!(f, "Project `{name}` not found"),
            LogData::ProjectAlreadyExists { name } => {
                write!(f, "Project `{name}` already exists")
            }
            LogData::OpenedProject { project_name } => {
                write!(f, "Opened project {project_name}")
            }
            LogData::CreatedProject {
                project_name,
                source_name,
            } => write!(f, "Created project {project_name} from {source_name}"),
            LogData::ActiveProjectCannotBeDeleted => {
                write!(f, "Active project cannot be deleted")
            }
            LogData::InvalidConfiguration => write!(f, "Configuration is invalid"),
            LogData::ConfigUnavailable => {
                write!(f, "Configuration is unavailable; request cannot be processed.")
            }
            LogData::InvalidRequest { details } => {
                write!(f, "Invalid request received: {details}")
            }
            LogData::EntityNotFound { entity_type, id } => {
                write!(f, "{entity_type} `{id}` not found")
            }
            LogData::ServiceConnectionTimedOut { node_type, node_id } => write!(
                f,
                "The connection with the requested {node_type} node with ID {node_id} timed out"
            ),
            LogData::DroppedLogs { n } => write!(f, "Dropped {n} log messages"),
            LogData::LicenseServerConnectionError { details } => {
                write!(f, "Could not connect to license server: {details}.")
            }
            LogData::LicenseNotFound => write!(f, "Found no valid license."),
            LogData::LicenseExpired { expiration_time } => {
                write!(f, "License expired on {expiration_time}.")
            }
            LogData::LicenseExceeded {
                lidar_count,
                max_lidar_count,
            } => write!(
                f,
                "Project exceeds number of LiDARs allowed by license ({lidar_count} > {max_lidar_count})."
            ),
            LogData::LicensePrivilegeError {
                missing_privilege,
                level_error,
            } => write!(
                f,
                "Endpoint requires \"{missing_privilege}\" privilege: {level_error}."
            ),
            LogData::LicenseActive => write!(f, "License is active."),
            LogData::RecordingStarted { path } => {
                write!(f, "Recording started for {path}")
            }
            LogData::RecordingStopped { path, details } => {
                write!(f, "Recording stopped for {path}: {details}")
            }
            LogData::RecordingFailedToStart { details } => {
                write!(f, "Recording failed to start: {details}")
            }
            LogData::InputSourceSwitched { source } => {
                write!(f, "Input source changed to {source}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_formatting() {
        let data = LogData::Generic {
            message: "lidar attached".to_string(),
        };
        assert_eq!(data.to_string(), "lidar attached");
    }

    #[test]
    fn test_rpc_connection_error_formatting() {
        let data = LogData::RpcConnectionError {
            target_service: "meridian.ProjectManagerService".to_string(),
            target_uri: "127.0.0.1:40003".to_string(),
            details: "connection refused".to_string(),
        };
        assert_eq!(
            data.to_string(),
            "Cannot initiate connection to meridian.ProjectManagerService at 127.0.0.1:40003: connection refused"
        );
    }

    #[test]
    fn test_license_exceeded_formatting() {
        let data = LogData::LicenseExceeded {
            lidar_count: 12,
            max_lidar_count: 8,
        };
        assert_eq!(
            data.to_string(),
            "Project exceeds number of LiDARs allowed by license (12 > 8)."
        );
    }

    #[test]
    fn test_ids_are_unique() {
        let samples = [
            LogData::Generic {
                message: String::new(),
            },
            LogData::OutOfMemory,
            LogData::ProjectNotFound {
                name: String::new(),
            },
            LogData::DroppedLogs { n: 0 },
            LogData::LicenseActive,
        ];
        let mut ids: Vec<u32> = samples.iter().map(LogData::id).collect();
        ids.dedup();
        assert_eq!(ids.len(), samples.len());
    }

    #[test]
    fn test_serde_tagging() {
        let message = LogMessage {
            data: LogData::ProjectNotFound {
                name: "warehouse".to_string(),
            },
            metadata: LogMetadata {
                node_id: "pm-1".to_string(),
                severity: LogSeverity::Error,
                ms_since_epoch: 1_700_000_000_000,
            },
        };

        let json = serde_json::to_string(&message).expect("serialize");
        assert!(json.contains("\"kind\":\"project_not_found\""));

        let decoded: LogMessage = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, message);
    }
}
