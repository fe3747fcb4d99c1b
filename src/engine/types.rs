use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeodeticPoint;
use crate::signal::GeometricSample;
use crate::trigger::{Direction, EventPriority, EventType, Measurement};

/// Everything observed by one receiver during one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverTick {
    pub position: GeodeticPoint,
    #[serde(default)]
    pub serving_satellite_id: Option<String>,
    pub samples: Vec<GeometricSample>,
}

/// Immutable record of one trigger transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoverEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub priority: EventPriority,
    pub receiver_id: String,
    pub serving_satellite_id: Option<String>,
    pub candidate_satellite_ids: Vec<String>,
    pub triggered_at: DateTime<Utc>,
    pub direction: Direction,
    pub measurement_snapshot: Measurement,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatistics {
    pub samples_evaluated: u64,
    pub invalid_geometry: u64,
    pub stale_samples: u64,
    pub unknown_constellation: u64,
    /// Evaluations skipped because the tick had no usable serving sample.
    pub skipped_without_serving: u64,
    /// Trigger states dropped because their satellite became serving or
    /// stopped being reported.
    #[serde(default)]
    pub retired_states: u64,
    pub entering: BTreeMap<EventType, u64>,
    pub leaving: BTreeMap<EventType, u64>,
}

impl EngineStatistics {
    pub(crate) fn record(&mut self, event: &HandoverEvent) {
        let counts = match event.direction {
            Direction::Entering => &mut self.entering,
            Direction::Leaving => &mut self.leaving,
        };
        *counts.entry(event.event_type).or_default() += 1;
    }

    pub fn total_events(&self) -> u64 {
        self.entering.values().chain(self.leaving.values()).sum()
    }

    pub fn merge(&mut self, other: &EngineStatistics) {
        self.samples_evaluated += other.samples_evaluated;
        self.invalid_geometry += other.invalid_geometry;
        self.stale_samples += other.stale_samples;
        self.unknown_constellation += other.unknown_constellation;
        self.skipped_without_serving += other.skipped_without_serving;
        self.retired_states += other.retired_states;
        for (event_type, count) in &other.entering {
            *self.entering.entry(*event_type).or_default() += count;
        }
        for (event_type, count) in &other.leaving {
            *self.leaving.entry(*event_type).or_default() += count;
        }
    }
}
