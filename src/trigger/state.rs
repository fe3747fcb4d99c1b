use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::measurement::Verdict;
use super::types::{Direction, EventType, TriggerPhase};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerKey {
    pub receiver_id: String,
    pub event_type: EventType,
    pub satellite_id: String,
}

impl TriggerKey {
    pub fn new(receiver_id: &str, event_type: EventType, satellite_id: &str) -> Self {
        Self {
            receiver_id: receiver_id.to_string(),
            event_type,
            satellite_id: satellite_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerState {
    pub phase: TriggerPhase,
    pub condition_since: Option<DateTime<Utc>>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

impl TriggerState {
    pub fn is_triggered(&self) -> bool {
        self.phase == TriggerPhase::Triggered
    }

    /// Applies one verdict. Returns the transition, if any.
    pub(crate) fn advance(
        &mut self,
        verdict: Verdict,
        now: DateTime<Utc>,
        time_to_trigger: Duration,
    ) -> Option<Direction> {
        self.last_evaluated_at = Some(now);

        match self.phase {
            TriggerPhase::Triggered => {
                if verdict.leaving {
                    self.phase = TriggerPhase::Idle;
                    self.condition_since = None;
                    Some(Direction::Leaving)
                } else {
                    None
                }
            }
            TriggerPhase::Idle | TriggerPhase::ConditionPending => {
                if !verdict.entering {
                    self.phase = TriggerPhase::Idle;
                    self.condition_since = None;
                    return None;
                }

                let since = *self.condition_since.get_or_insert(now);
                if now - since >= time_to_trigger {
                    self.phase = TriggerPhase::Triggered;
                    Some(Direction::Entering)
                } else {
                    self.phase = TriggerPhase::ConditionPending;
                    None
                }
            }
        }
    }
}

/// All trigger states, keyed by `(receiver, event type, satellite)`.
///
/// Owned by whoever drives evaluation; nothing here is shared or global.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerStateStore {
    states: HashMap<TriggerKey, TriggerState>,
}

impl TriggerStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TriggerKey) -> Option<&TriggerState> {
        self.states.get(key)
    }

    pub fn entry(&mut self, key: TriggerKey) -> &mut TriggerState {
        self.states.entry(key).or_default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TriggerKey, &TriggerState)> {
        self.states.iter()
    }

    /// Keys currently in the `Triggered` phase for one receiver.
    pub fn triggered<'a>(&'a self, receiver_id: &'a str) -> impl Iterator<Item = &'a TriggerKey> + 'a {
        self.states
            .iter()
            .filter(move |(key, state)| key.receiver_id == receiver_id && state.is_triggered())
            .map(|(key, _)| key)
    }

    /// Removes every state of one satellite as seen by one receiver, in key
    /// order.
    pub fn remove_satellite(&mut self, receiver_id: &str, satellite_id: &str) -> Vec<(TriggerKey, TriggerState)> {
        let mut keys: Vec<TriggerKey> = self
            .states
            .keys()
            .filter(|key| key.receiver_id == receiver_id && key.satellite_id == satellite_id)
            .cloned()
            .collect();
        keys.sort();

        keys.into_iter()
            .filter_map(|key| self.states.remove(&key).map(|state| (key, state)))
            .collect()
    }

    /// Distinct satellites with any state for `receiver_id`, with the newest
    /// evaluation time recorded for each.
    pub fn satellites(&self, receiver_id: &str) -> BTreeMap<&str, Option<DateTime<Utc>>> {
        let mut satellites: BTreeMap<&str, Option<DateTime<Utc>>> = BTreeMap::new();
        for (key, state) in self.states.iter().filter(|(key, _)| key.receiver_id == receiver_id) {
            let seen = satellites.entry(key.satellite_id.as_str()).or_default();
            *seen = (*seen).max(state.last_evaluated_at);
        }
        satellites
    }

    /// Moves every state belonging to `receiver_id` into a new store.
    pub fn split_off_receiver(&mut self, receiver_id: &str) -> TriggerStateStore {
        let keys: Vec<TriggerKey> = self
            .states
            .keys()
            .filter(|key| key.receiver_id == receiver_id)
            .cloned()
            .collect();

        let mut split = TriggerStateStore::new();
        for key in keys {
            if let Some(state) = self.states.remove(&key) {
                split.states.insert(key, state);
            }
        }
        split
    }

    pub fn merge(&mut self, other: TriggerStateStore) {
        self.states.extend(other.states);
    }
}
