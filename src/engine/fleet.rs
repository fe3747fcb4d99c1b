use std::collections::BTreeMap;
use std::thread;

use serde::{Deserialize, Serialize};

use super::engine::EventEngine;
use super::error::EngineError;
use super::types::{EngineStatistics, HandoverEvent, ReceiverTick};
use crate::candidates::CandidateList;
use crate::trigger::TriggerStateStore;

/// A tick addressed to one receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedTick {
    pub receiver_id: String,
    #[serde(flatten)]
    pub tick: ReceiverTick,
}

/// Per-receiver engines, sharded by receiver id.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    engines: BTreeMap<String, EventEngine>,
}

impl Fleet {
    pub fn new<I>(engines: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = EventEngine>,
    {
        let mut fleet = Fleet::default();
        for engine in engines {
            let receiver_id = engine.receiver_id().to_string();
            if fleet.engines.contains_key(&receiver_id) {
                return Err(EngineError::DuplicateReceiver(receiver_id));
            }
            fleet.engines.insert(receiver_id, engine);
        }
        Ok(fleet)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn engine(&self, receiver_id: &str) -> Option<&EventEngine> {
        self.engines.get(receiver_id)
    }

    pub fn engines(&self) -> impl Iterator<Item = &EventEngine> {
        self.engines.values()
    }

    /// Evaluates a batch of ticks, one thread per receiver.
    ///
    /// Each receiver sees its own ticks in batch order. Events come back
    /// grouped by receiver id.
    pub fn evaluate(&mut self, ticks: &[TaggedTick]) -> Vec<HandoverEvent> {
        let mut routed: BTreeMap<&str, Vec<&ReceiverTick>> = BTreeMap::new();
        for tagged in ticks {
            if self.engines.contains_key(&tagged.receiver_id) {
                routed.entry(tagged.receiver_id.as_str()).or_default().push(&tagged.tick);
            } else {
                log::warn!("dropping tick for unknown receiver {}", tagged.receiver_id);
            }
        }

        thread::scope(|scope| {
            let handles: Vec<_> = self
                .engines
                .iter_mut()
                .filter_map(|(receiver_id, engine)| {
                    let ticks = routed.remove(receiver_id.as_str())?;
                    Some(scope.spawn(move || {
                        ticks
                            .into_iter()
                            .flat_map(|tick| engine.evaluate(tick))
                            .collect::<Vec<_>>()
                    }))
                })
                .collect();

            let mut events = Vec::new();
            for handle in handles {
                match handle.join() {
                    Ok(batch) => events.extend(batch),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            events
        })
    }

    pub fn candidates(&self) -> Vec<CandidateList> {
        self.engines.values().map(EventEngine::candidates).collect()
    }

    pub fn statistics(&self) -> EngineStatistics {
        let mut total = EngineStatistics::default();
        for engine in self.engines.values() {
            total.merge(engine.statistics());
        }
        total
    }

    /// Hands each engine the slice of `store` that belongs to its receiver.
    pub fn restore(&mut self, mut store: TriggerStateStore) {
        for (receiver_id, engine) in self.engines.iter_mut() {
            engine.replace_store(store.split_off_receiver(receiver_id));
        }
        if !store.is_empty() {
            log::warn!("discarding {} trigger states of unknown receivers", store.len());
        }
    }

    pub fn into_store(self) -> TriggerStateStore {
        let mut store = TriggerStateStore::new();
        for engine in self.engines.into_values() {
            store.merge(engine.into_store());
        }
        store
    }
}
