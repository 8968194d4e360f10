//! Object detection messages.

use serde::{Deserialize, Serialize};

/// Classification of a detected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    /// Classifier produced no label.
    Unspecified,
    /// Pedestrian.
    Person,
    /// Car, truck or bus.
    Vehicle,
    /// Bicycle or motorbike.
    Cyclist,
    /// Anything else.
    Misc,
}

impl Default for ObjectClass {
    fn default() -> Self {
        ObjectClass::Unspecified
    }
}

/// Oriented bounding box of a detected object, in project coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Center of the box, in meters.
    pub center: [f32; 3],
    /// Size of the box along its local axes, in meters.
    pub extent: [f32; 3],
    /// Rotation around the vertical axis, in radians.
    pub yaw: f32,
}

/// One detected object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Identifier of the object, stable across frames while tracked.
    pub id: u32,
    /// Classification of the object.
    pub class: ObjectClass,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f32,
    /// Bounding box of the object.
    pub bounding_box: BoundingBox,
}

/// Detection results for one frame, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Objects detected in the frame.
    pub objects: Vec<DetectedObject>,
    /// Acquisition time of the frame, in milliseconds since the Unix epoch.
    pub frame_timestamp_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_event_roundtrip() {
        let event = DetectionEvent {
            objects: vec![DetectedObject {
                id: 4,
                class: ObjectClass::Person,
                confidence: 0.93,
                bounding_box: BoundingBox {
                    center: [1.0, -2.5, 0.9],
                    extent: [0.6, 0.6, 1.8],
                    yaw: 0.1,
                },
            }],
            frame_timestamp_ms: 1_700_000_000_123,
        };

        let json = serde_json::to_vec(&event).expect("serialize");
        let decoded: DetectionEvent = serde_json::from_slice(&json).expect("deserialize");
        assert_eq!(decoded, event);
    }
}
