use chrono::{DateTime, Utc};

use super::config::{Condition, TriggerRule};
use super::error::TriggerError;
use super::measurement::{Leg, Measurement, Verdict};
use super::state::{TriggerKey, TriggerState};
use super::types::Direction;

impl TriggerRule {
    pub fn verdict(&self, measurement: &Measurement) -> Result<Verdict, TriggerError> {
        let verdict = match (&self.condition, measurement) {
            (
                Condition::A4 {
                    threshold_dbm,
                    hysteresis_db,
                    offsets,
                },
                Measurement::NeighborRsrp { neighbor, .. },
            ) => Verdict::all(&[
                Leg::above(neighbor.rsrp_dbm, *threshold_dbm, *hysteresis_db).with_offset(offsets.total_db())
            ]),
            (
                Condition::A5 {
                    serving_threshold_dbm,
                    neighbor_threshold_dbm,
                    hysteresis_db,
                    serving_offsets,
                    neighbor_offsets,
                },
                Measurement::ServingAndNeighborRsrp { serving, neighbor, .. },
            ) => Verdict::all(&[
                Leg::below(serving.rsrp_dbm, *serving_threshold_dbm, *hysteresis_db)
                    .with_offset(serving_offsets.total_db()),
                Leg::above(neighbor.rsrp_dbm, *neighbor_threshold_dbm, *hysteresis_db)
                    .with_offset(neighbor_offsets.total_db()),
            ]),
            (
                Condition::D1 {
                    thresholds_km,
                    hysteresis_km,
                    ..
                },
                Measurement::ReferenceDistance { distance_km, .. },
            ) => {
                let legs: Vec<Leg> = thresholds_km
                    .iter()
                    .map(|threshold| Leg::above(*distance_km, *threshold, *hysteresis_km))
                    .collect();
                Verdict::any(&legs)
            }
            (
                Condition::D2 {
                    serving_threshold_km,
                    candidate_threshold_km,
                    hysteresis_km,
                },
                Measurement::GroundTrackDistances {
                    serving_distance_km,
                    candidate_distance_km,
                    ..
                },
            ) => Verdict::all(&[
                Leg::above(*serving_distance_km, *serving_threshold_km, *hysteresis_km),
                Leg::below(*candidate_distance_km, *candidate_threshold_km, *hysteresis_km),
            ]),
            (
                Condition::T1 { start, duration, .. },
                Measurement::Elapsed { elapsed_s, .. },
            ) => {
                let start_s = start.num_milliseconds() as f64 / 1000.0;
                let end_s = start_s + duration.num_milliseconds() as f64 / 1000.0;
                Verdict::window(*elapsed_s >= start_s && *elapsed_s <= end_s)
            }
            (_, other) => {
                return Err(TriggerError::MeasurementMismatch {
                    event_type: self.event_type,
                    kind: other.kind(),
                })
            }
        };
        Ok(verdict)
    }

    /// How far past its thresholds the measurement sits, in `[0, 1]`.
    pub fn confidence(&self, measurement: &Measurement) -> f64 {
        let score = match (&self.condition, measurement) {
            (
                Condition::A4 {
                    threshold_dbm, offsets, ..
                },
                Measurement::NeighborRsrp { neighbor, .. },
            ) => (neighbor.rsrp_dbm + offsets.total_db() - threshold_dbm) / 20.0,
            (
                Condition::A5 {
                    serving_offsets,
                    neighbor_offsets,
                    ..
                },
                Measurement::ServingAndNeighborRsrp { serving, neighbor, .. },
            ) => {
                let neighbor_dbm = neighbor.rsrp_dbm + neighbor_offsets.total_db();
                let serving_dbm = serving.rsrp_dbm + serving_offsets.total_db();
                (neighbor_dbm - serving_dbm) / 30.0
            }
            (Condition::D1 { thresholds_km, .. }, Measurement::ReferenceDistance { distance_km, .. }) => {
                thresholds_km
                    .iter()
                    .map(|threshold| (distance_km - threshold) / threshold)
                    .fold(f64::NEG_INFINITY, f64::max)
            }
            (
                Condition::D2 { .. },
                Measurement::GroundTrackDistances {
                    serving_distance_km,
                    candidate_distance_km,
                    ..
                },
            ) if *serving_distance_km > 0.0 => {
                (serving_distance_km - candidate_distance_km) / serving_distance_km
            }
            (Condition::T1 { .. }, Measurement::Elapsed { .. }) => 1.0,
            _ => 0.0,
        };
        score.clamp(0.0, 1.0)
    }

    /// Advances one tuple's state with a measurement taken at `now`.
    ///
    /// Samples not strictly newer than the last evaluated one are rejected
    /// and leave the state untouched.
    pub fn evaluate(
        &self,
        key: &TriggerKey,
        state: &mut TriggerState,
        measurement: &Measurement,
        now: DateTime<Utc>,
    ) -> Result<Option<Direction>, TriggerError> {
        if let Some(last_evaluated_at) = state.last_evaluated_at {
            if now <= last_evaluated_at {
                return Err(TriggerError::StaleSample {
                    satellite_id: key.satellite_id.clone(),
                    timestamp: now,
                    last_evaluated_at,
                });
            }
        }

        let verdict = self.verdict(measurement)?;
        let transition = state.advance(verdict, now, self.time_to_trigger);
        if let Some(direction) = transition {
            log::debug!(
                "{} {} for {} via {} at {}",
                key.event_type,
                direction,
                key.receiver_id,
                key.satellite_id,
                now
            );
        }
        Ok(transition)
    }
}
