use thiserror::Error;

use crate::candidates::CandidateError;
use crate::signal::SignalError;
use crate::trigger::TriggerError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("trigger error: {0}")]
    Trigger(#[from] TriggerError),
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
    #[error("invalid candidate configuration: {0}")]
    Candidates(#[from] CandidateError),
    #[error("receiver {0} is configured more than once")]
    DuplicateReceiver(String),
}
