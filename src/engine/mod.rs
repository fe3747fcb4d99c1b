mod engine;
mod error;
mod fleet;
mod types;

pub use engine::EventEngine;
pub use error::EngineError;
pub use fleet::{Fleet, TaggedTick};
pub use types::{EngineStatistics, HandoverEvent, ReceiverTick};
