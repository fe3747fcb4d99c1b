use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Measurement-event variants. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    A4,
    A5,
    D1,
    D2,
    T1,
}

impl EventType {
    pub fn priority(&self) -> EventPriority {
        match self {
            EventType::A5 => EventPriority::High,
            EventType::A4 | EventType::T1 => EventPriority::Medium,
            EventType::D1 | EventType::D2 => EventPriority::Low,
        }
    }

    /// Whether the condition needs a usable serving-satellite sample.
    pub fn needs_serving(&self) -> bool {
        matches!(self, EventType::A5 | EventType::D2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Entering,
    Leaving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPhase {
    #[default]
    Idle,
    ConditionPending,
    Triggered,
}
