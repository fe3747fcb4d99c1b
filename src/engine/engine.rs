use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::error::EngineError;
use super::types::{EngineStatistics, HandoverEvent, ReceiverTick};
use crate::candidates::{Candidate, CandidateConfig, CandidateList, CandidateScorer};
use crate::geo::{ground_track_point, haversine_km, GeodeticPoint};
use crate::signal::{
    AtmosphereModel, GeometricSample, LinkParameters, SatelliteGroup, SignalError, SignalModel, SignalSample,
};
use crate::trigger::{
    Condition, Direction, EventConfig, Measurement, TriggerError, TriggerKey, TriggerRule, TriggerStateStore,
};

#[derive(Debug, Clone)]
struct LatestSignal {
    group: SatelliteGroup,
    signal: SignalSample,
}

/// Drives every configured trigger of one receiver.
///
/// All state mutation for the receiver happens here, sequentially, in sample
/// timestamp order. Engines for different receivers share nothing.
#[derive(Debug, Clone)]
pub struct EventEngine {
    receiver_id: String,
    rules: Vec<TriggerRule>,
    constellations: HashMap<String, LinkParameters>,
    signal_model: SignalModel,
    scorer: CandidateScorer,
    max_sample_age: Duration,
    store: TriggerStateStore,
    latest: HashMap<String, LatestSignal>,
    /// Last measurement of every triggered tuple, reused when it is retired.
    snapshots: HashMap<TriggerKey, Measurement>,
    serving_satellite_id: Option<String>,
    last_evaluated_at: Option<DateTime<Utc>>,
    statistics: EngineStatistics,
}

impl EventEngine {
    pub fn new(
        receiver_id: impl Into<String>,
        events: &[EventConfig],
        constellations: HashMap<String, LinkParameters>,
        atmosphere: AtmosphereModel,
        candidates: CandidateConfig,
    ) -> Result<Self, EngineError> {
        atmosphere.validate()?;
        candidates.validate()?;
        let max_sample_age = candidates.max_sample_age()?;
        for link in constellations.values() {
            link.validate()?;
        }

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(events.len());
        for event in events {
            if !seen.insert(event.event_type) {
                return Err(TriggerError::InvalidConfig {
                    event_type: event.event_type,
                    reason: "configured more than once for the same receiver".to_string(),
                }
                .into());
            }
            rules.push(event.compile()?);
        }

        Ok(Self {
            receiver_id: receiver_id.into(),
            rules,
            constellations,
            signal_model: SignalModel::new(atmosphere),
            scorer: CandidateScorer::new(candidates),
            max_sample_age,
            store: TriggerStateStore::new(),
            latest: HashMap::new(),
            snapshots: HashMap::new(),
            serving_satellite_id: None,
            last_evaluated_at: None,
            statistics: EngineStatistics::default(),
        })
    }

    /// Resumes from previously saved trigger states, returning the old ones.
    pub fn replace_store(&mut self, store: TriggerStateStore) -> TriggerStateStore {
        self.snapshots.clear();
        std::mem::replace(&mut self.store, store)
    }

    pub fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    pub fn statistics(&self) -> &EngineStatistics {
        &self.statistics
    }

    pub fn store(&self) -> &TriggerStateStore {
        &self.store
    }

    pub fn into_store(self) -> TriggerStateStore {
        self.store
    }

    /// Evaluates one tick and returns the transitions it caused.
    ///
    /// Samples with invalid geometry, an unknown constellation or a stale
    /// timestamp are dropped and counted; they never stop the tick. A tick
    /// whose receiver position is not a valid geodetic point is dropped whole.
    ///
    /// Once the samples are processed, the serving satellite and every
    /// satellite unreported for longer than `max_sample_age_ms` are retired.
    pub fn evaluate(&mut self, tick: &ReceiverTick) -> Vec<HandoverEvent> {
        if !tick.position.is_valid() {
            self.drop_tick(tick);
            return Vec::new();
        }
        self.serving_satellite_id = tick.serving_satellite_id.clone();

        let mut samples: Vec<&GeometricSample> = tick.samples.iter().collect();
        samples.sort_by_key(|sample| sample.timestamp);

        let mut observed: Vec<(&GeometricSample, SignalSample)> = Vec::with_capacity(samples.len());
        for sample in samples {
            let Some(link) = self.constellations.get(&sample.constellation) else {
                self.statistics.unknown_constellation += 1;
                log::warn!(
                    "{}: dropping sample of {} from unknown constellation {}",
                    self.receiver_id,
                    sample.satellite_id,
                    sample.constellation
                );
                continue;
            };
            match self.signal_model.compute(sample, link) {
                Ok(signal) => observed.push((sample, signal)),
                Err(err) => {
                    self.statistics.invalid_geometry += 1;
                    log::warn!("{}: dropping sample: {}", self.receiver_id, err);
                }
            }
        }

        let serving_id = tick.serving_satellite_id.as_deref();
        let serving = serving_id.and_then(|id| {
            observed
                .iter()
                .rev()
                .find(|(geometry, _)| geometry.satellite_id == id)
        });

        let mut events = Vec::new();
        for (geometry, signal) in &observed {
            self.statistics.samples_evaluated += 1;
            self.last_evaluated_at = self.last_evaluated_at.max(Some(geometry.timestamp));

            if Some(geometry.satellite_id.as_str()) == serving_id {
                self.remember(geometry, signal);
                continue;
            }

            let mut stale = false;
            for rule in &self.rules {
                let Some(measurement) = measure(rule, &tick.position, geometry, signal, serving) else {
                    self.statistics.skipped_without_serving += 1;
                    continue;
                };

                let key = TriggerKey::new(&self.receiver_id, rule.event_type, &geometry.satellite_id);
                let state = self.store.entry(key.clone());
                let outcome = rule.evaluate(&key, state, &measurement, geometry.timestamp);
                let triggered = state.is_triggered();
                match outcome {
                    Ok(transition) => {
                        if triggered {
                            self.snapshots.insert(key, measurement.clone());
                        } else {
                            self.snapshots.remove(&key);
                        }
                        if let Some(direction) = transition {
                            let event = transition_event(
                                &self.receiver_id,
                                rule,
                                &geometry.satellite_id,
                                serving_id,
                                geometry.timestamp,
                                direction,
                                measurement,
                            );
                            self.statistics.record(&event);
                            events.push(event);
                        }
                    }
                    Err(err @ TriggerError::StaleSample { .. }) => {
                        stale = true;
                        log::warn!("{}: {}", self.receiver_id, err);
                    }
                    Err(err) => log::warn!("{}: {}", self.receiver_id, err),
                }
            }
            if stale {
                self.statistics.stale_samples += 1;
            } else {
                self.remember(geometry, signal);
            }
        }

        if let Some(now) = self.last_evaluated_at {
            if let Some(serving_id) = serving_id {
                events.extend(self.retire(serving_id, now, Some(serving_id)));
            }
            events.extend(self.retire_unreported(now, serving_id));
        }

        events
    }

    fn drop_tick(&mut self, tick: &ReceiverTick) {
        let position = tick.position;
        for sample in &tick.samples {
            self.statistics.invalid_geometry += 1;
            let err = SignalError::InvalidGeometry {
                satellite_id: sample.satellite_id.clone(),
                reason: format!(
                    "receiver position ({}, {}) is not a valid geodetic point",
                    position.latitude_deg, position.longitude_deg
                ),
            };
            log::warn!("{}: dropping sample: {}", self.receiver_id, err);
        }
    }

    fn remember(&mut self, geometry: &GeometricSample, signal: &SignalSample) {
        self.latest.insert(
            geometry.satellite_id.clone(),
            LatestSignal {
                group: geometry.group(),
                signal: signal.clone(),
            },
        );
    }

    /// Drops every trigger state held for `satellite_id`. Triggered tuples
    /// leave with the last measurement they were evaluated on.
    fn retire(
        &mut self,
        satellite_id: &str,
        now: DateTime<Utc>,
        serving_id: Option<&str>,
    ) -> Vec<HandoverEvent> {
        let mut events = Vec::new();
        for (key, state) in self.store.remove_satellite(&self.receiver_id, satellite_id) {
            self.statistics.retired_states += 1;
            let snapshot = self.snapshots.remove(&key);
            if !state.is_triggered() {
                continue;
            }

            let rule = self.rules.iter().find(|rule| rule.event_type == key.event_type);
            let (Some(rule), Some(measurement)) = (rule, snapshot) else {
                log::debug!(
                    "{}: {} via {} retired without a measurement",
                    self.receiver_id,
                    key.event_type,
                    satellite_id
                );
                continue;
            };
            let event = transition_event(
                &self.receiver_id,
                rule,
                satellite_id,
                serving_id,
                now,
                Direction::Leaving,
                measurement,
            );
            self.statistics.record(&event);
            events.push(event);
        }
        events
    }

    /// Retires satellites whose newest sample is older than the configured
    /// maximum age at `now`.
    fn retire_unreported(&mut self, now: DateTime<Utc>, serving_id: Option<&str>) -> Vec<HandoverEvent> {
        let Some(cutoff) = now.checked_sub_signed(self.max_sample_age) else {
            return Vec::new();
        };

        let mut last_seen: BTreeMap<String, Option<DateTime<Utc>>> = self
            .store
            .satellites(&self.receiver_id)
            .into_iter()
            .map(|(satellite_id, seen)| (satellite_id.to_string(), seen))
            .collect();
        for (satellite_id, latest) in &self.latest {
            let seen = last_seen.entry(satellite_id.clone()).or_default();
            *seen = (*seen).max(Some(latest.signal.timestamp));
        }

        let mut events = Vec::new();
        for (satellite_id, seen) in last_seen {
            if seen.is_some_and(|seen| seen >= cutoff) {
                continue;
            }
            log::debug!("{}: retiring {}, last sample {:?}", self.receiver_id, satellite_id, seen);
            events.extend(self.retire(&satellite_id, now, serving_id));
            self.latest.remove(&satellite_id);
        }
        events
    }

    /// Ranked candidates over the current trigger snapshot. The serving
    /// satellite of the last tick is never offered.
    pub fn candidates(&self) -> CandidateList {
        let serving_id = self.serving_satellite_id.as_deref();
        let triggered = self
            .store
            .triggered(&self.receiver_id)
            .filter(|key| Some(key.satellite_id.as_str()) != serving_id)
            .filter_map(|key| {
                let latest = self.latest.get(&key.satellite_id)?;
                Some(Candidate {
                    satellite_id: key.satellite_id.clone(),
                    group: latest.group.clone(),
                    event_type: key.event_type,
                    rsrp_dbm: latest.signal.rsrp_dbm,
                })
            });
        self.scorer.rank(&self.receiver_id, self.last_evaluated_at, triggered)
    }
}

fn transition_event(
    receiver_id: &str,
    rule: &TriggerRule,
    satellite_id: &str,
    serving_id: Option<&str>,
    at: DateTime<Utc>,
    direction: Direction,
    measurement: Measurement,
) -> HandoverEvent {
    let event = HandoverEvent {
        event_id: Uuid::new_v4(),
        event_type: rule.event_type,
        priority: rule.event_type.priority(),
        receiver_id: receiver_id.to_string(),
        serving_satellite_id: serving_id.map(str::to_string),
        candidate_satellite_ids: vec![satellite_id.to_string()],
        triggered_at: at,
        direction,
        confidence: rule.confidence(&measurement),
        measurement_snapshot: measurement,
    };
    log::info!(
        "{}: {} {} via {} (confidence {:.2})",
        event.receiver_id,
        event.event_type,
        event.direction,
        satellite_id,
        event.confidence
    );
    event
}

fn ground_track_of(position: &GeodeticPoint, sample: &GeometricSample) -> GeodeticPoint {
    ground_track_point(position, sample.azimuth_deg, sample.elevation_deg, sample.slant_range_km)
}

/// Builds the measurement a rule needs for one candidate sample. `None` when
/// the rule depends on a serving sample the tick does not have.
fn measure(
    rule: &TriggerRule,
    position: &GeodeticPoint,
    geometry: &GeometricSample,
    signal: &SignalSample,
    serving: Option<&(&GeometricSample, SignalSample)>,
) -> Option<Measurement> {
    let measurement = match &rule.condition {
        Condition::A4 { offsets, .. } => Measurement::NeighborRsrp {
            neighbor: signal.clone(),
            offsets: *offsets,
        },
        Condition::A5 {
            serving_offsets,
            neighbor_offsets,
            ..
        } => {
            let (_, serving_signal) = serving?;
            Measurement::ServingAndNeighborRsrp {
                serving: serving_signal.clone(),
                neighbor: signal.clone(),
                serving_offsets: *serving_offsets,
                neighbor_offsets: *neighbor_offsets,
            }
        }
        Condition::D1 { reference, .. } => Measurement::ReferenceDistance {
            receiver: *position,
            reference: *reference,
            distance_km: haversine_km(position, reference),
        },
        Condition::D2 { .. } => {
            let (serving_geometry, _) = serving?;
            let serving_ground_track = ground_track_of(position, serving_geometry);
            let candidate_ground_track = ground_track_of(position, geometry);
            Measurement::GroundTrackDistances {
                receiver: *position,
                serving_ground_track,
                candidate_ground_track,
                serving_distance_km: haversine_km(position, &serving_ground_track),
                candidate_distance_km: haversine_km(position, &candidate_ground_track),
            }
        }
        Condition::T1 { epoch, .. } => Measurement::Elapsed {
            epoch: *epoch,
            elapsed_s: (geometry.timestamp - *epoch).num_milliseconds() as f64 / 1000.0,
        },
    };
    Some(measurement)
}
