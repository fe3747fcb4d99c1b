use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::EventType;

#[derive(Debug, Error, PartialEq)]
pub enum TriggerError {
    #[error("invalid {event_type} configuration: {reason}")]
    InvalidConfig {
        event_type: EventType,
        reason: String,
    },
    #[error("stale sample for satellite {satellite_id}: {timestamp} is not after {last_evaluated_at}")]
    StaleSample {
        satellite_id: String,
        timestamp: DateTime<Utc>,
        last_evaluated_at: DateTime<Utc>,
    },
    #[error("{event_type} cannot be evaluated from a {kind} measurement")]
    MeasurementMismatch {
        event_type: EventType,
        kind: &'static str,
    },
}
