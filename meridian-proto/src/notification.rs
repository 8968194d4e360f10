//! Notification service messages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::health::SensorInfo;
use crate::logs::LogMessage;

/// Request of `NotificationService.LogMessage` (one-way): a node reporting
/// a log message to the notification hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessageRequest {
    /// The reported log message.
    pub log_message: LogMessage,
}

/// A log message pushed to notification subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessageEvent {
    /// The log message.
    pub log_message: LogMessage,
}

/// Profiling information pushed to notification subscribers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfilingInfoEvent {
    /// Processing durations by pipeline stage, in microseconds.
    #[serde(default)]
    pub processing_times_us: HashMap<String, u64>,
}

/// Sensor information pushed to notification subscribers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorInfoEvent {
    /// Information about every configured sensor.
    #[serde(default)]
    pub sensor_info: Vec<SensorInfo>,
}
