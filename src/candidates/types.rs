use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::CandidateError;
use crate::signal::SatelliteGroup;
use crate::trigger::{deserialize_millis, EventPriority, EventType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    pub max_candidates: usize,
    pub min_group_diversity: usize,
    /// A satellite not reported for longer than this is retired: its trigger
    /// states are dropped and it leaves the candidate list.
    #[serde(deserialize_with = "deserialize_millis")]
    pub max_sample_age_ms: u64,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            max_candidates: 5,
            min_group_diversity: 3,
            max_sample_age_ms: 60_000,
        }
    }
}

impl CandidateConfig {
    pub fn validate(&self) -> Result<(), CandidateError> {
        if self.max_candidates == 0 {
            return Err(CandidateError::NoSlots);
        }
        if self.min_group_diversity > self.max_candidates {
            return Err(CandidateError::DiversityExceedsMax {
                min_group_diversity: self.min_group_diversity,
                max_candidates: self.max_candidates,
            });
        }
        self.max_sample_age()?;
        Ok(())
    }

    pub fn max_sample_age(&self) -> Result<Duration, CandidateError> {
        i64::try_from(self.max_sample_age_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .ok_or(CandidateError::SampleAgeOutOfRange(self.max_sample_age_ms))
    }
}

/// One triggered `(receiver, event type, satellite)` tuple, as seen by the scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub satellite_id: String,
    pub group: SatelliteGroup,
    pub event_type: EventType,
    pub rsrp_dbm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub satellite_id: String,
    pub group: SatelliteGroup,
    /// Every event type currently triggered for this satellite.
    pub event_types: Vec<EventType>,
    pub priority: EventPriority,
    pub rsrp_dbm: f64,
}

/// Ranked handover candidates for one receiver. Empty when nothing is triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateList {
    pub receiver_id: String,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub candidates: Vec<RankedCandidate>,
}

impl CandidateList {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn satellite_ids(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.satellite_id.as_str())
    }
}
