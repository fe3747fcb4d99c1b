mod config;
mod error;
mod evaluator;
mod measurement;
mod state;
mod types;

pub(crate) use config::deserialize_millis;
pub use config::{Condition, EventConfig, MeasurementOffsets, ReferenceLocation, TriggerRule, MAX_OFFSET_DB};
pub use error::TriggerError;
pub use measurement::{Measurement, Verdict};
pub use state::{TriggerKey, TriggerState, TriggerStateStore};
pub use types::{Direction, EventPriority, EventType, TriggerPhase};
