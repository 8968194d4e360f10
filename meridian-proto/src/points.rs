//! Point aggregation messages.

use serde::{Deserialize, Serialize};

/// One aggregated point cloud frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointFrame {
    /// Monotonic identifier of the frame.
    pub frame_id: u64,
    /// Acquisition time of the frame, in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Point positions in project coordinates, in meters.
    pub positions: Vec<[f32; 3]>,
}

/// One point cloud event within a broadcast batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointEvent {
    /// The processed frame.
    pub point_frame: PointFrame,
}

/// Batch of processed point cloud events, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregatedPointEvents {
    /// The events of this batch, in processing order.
    pub events: Vec<PointEvent>,
}

/// Rasterized occupancy of the monitored area.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OccupancyGrid {
    /// Number of grid rows.
    pub rows: u32,
    /// Number of grid columns.
    pub cols: u32,
    /// Row-major cell occupancy counters.
    pub cells: Vec<u32>,
}

/// Occupancy grid update, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OccupancyGridEvent {
    /// The updated grid.
    pub grid: OccupancyGrid,
    /// Time the grid was computed, in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregated_events_roundtrip() {
        let events = AggregatedPointEvents {
            events: vec![PointEvent {
                point_frame: PointFrame {
                    frame_id: 88,
                    timestamp_ms: 1_700_000_000_456,
                    positions: vec![[0.0, 1.0, 2.0], [3.5, -1.25, 0.0]],
                },
            }],
        };

        let json = serde_json::to_vec(&events).expect("serialize");
        let decoded: AggregatedPointEvents = serde_json::from_slice(&json).expect("deserialize");
        assert_eq!(decoded, events);
    }
}
