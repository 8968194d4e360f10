//! Caller-facing log messages.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use meridian_proto::{LogMessageEvent, LogSeverity};

/// A log message emitted by a platform node.
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    /// Human-readable message of the log.
    pub message: String,
    /// Stable identifier of the log event kind.
    pub id: u32,
    /// Unique identifier of the node which emitted the log.
    pub node_id: String,
    /// Severity of the log message.
    pub severity: LogSeverity,
    /// Time at which the node emitted the log.
    pub time: SystemTime,
}

impl Log {
    pub(crate) fn from_event(event: LogMessageEvent) -> Self {
        let log_message = event.log_message;
        Self {
            message: log_message.data.to_string(),
            id: log_message.data.id(),
            node_id: log_message.metadata.node_id,
            severity: log_message.metadata.severity,
            time: UNIX_EPOCH + Duration::from_millis(log_message.metadata.ms_since_epoch),
        }
    }
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}
