use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::MeasurementOffsets;
use crate::geo::GeodeticPoint;
use crate::signal::SignalSample;

/// Values a trigger condition is evaluated against. Kept on every emitted
/// event so the decision can be replayed offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measurement {
    NeighborRsrp {
        neighbor: SignalSample,
        #[serde(default)]
        offsets: MeasurementOffsets,
    },
    ServingAndNeighborRsrp {
        serving: SignalSample,
        neighbor: SignalSample,
        #[serde(default)]
        serving_offsets: MeasurementOffsets,
        #[serde(default)]
        neighbor_offsets: MeasurementOffsets,
    },
    ReferenceDistance {
        receiver: GeodeticPoint,
        reference: GeodeticPoint,
        distance_km: f64,
    },
    GroundTrackDistances {
        receiver: GeodeticPoint,
        serving_ground_track: GeodeticPoint,
        candidate_ground_track: GeodeticPoint,
        serving_distance_km: f64,
        candidate_distance_km: f64,
    },
    Elapsed {
        epoch: DateTime<Utc>,
        elapsed_s: f64,
    },
}

impl Measurement {
    pub fn kind(&self) -> &'static str {
        match self {
            Measurement::NeighborRsrp { .. } => "neighbor_rsrp",
            Measurement::ServingAndNeighborRsrp { .. } => "serving_and_neighbor_rsrp",
            Measurement::ReferenceDistance { .. } => "reference_distance",
            Measurement::GroundTrackDistances { .. } => "ground_track_distances",
            Measurement::Elapsed { .. } => "elapsed",
        }
    }

    /// Candidate RSRP when the measurement carries one.
    pub fn neighbor_rsrp_dbm(&self) -> Option<f64> {
        match self {
            Measurement::NeighborRsrp { neighbor, .. } => Some(neighbor.rsrp_dbm),
            Measurement::ServingAndNeighborRsrp { neighbor, .. } => Some(neighbor.rsrp_dbm),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bound {
    Above,
    Below,
}

/// One threshold comparison with its own hysteresis margin. `offset` is
/// added to the measured value before either margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Leg {
    pub value: f64,
    pub offset: f64,
    pub threshold: f64,
    pub hysteresis: f64,
    pub bound: Bound,
}

impl Leg {
    pub fn above(value: f64, threshold: f64, hysteresis: f64) -> Self {
        Self {
            value,
            offset: 0.0,
            threshold,
            hysteresis,
            bound: Bound::Above,
        }
    }

    pub fn below(value: f64, threshold: f64, hysteresis: f64) -> Self {
        Self {
            value,
            offset: 0.0,
            threshold,
            hysteresis,
            bound: Bound::Below,
        }
    }

    pub fn with_offset(self, offset: f64) -> Self {
        Self { offset, ..self }
    }

    pub fn entering(&self) -> bool {
        let value = self.value + self.offset;
        match self.bound {
            Bound::Above => value - self.hysteresis > self.threshold,
            Bound::Below => value + self.hysteresis < self.threshold,
        }
    }

    pub fn leaving(&self) -> bool {
        let value = self.value + self.offset;
        match self.bound {
            Bound::Above => value + self.hysteresis < self.threshold,
            Bound::Below => value - self.hysteresis > self.threshold,
        }
    }
}

/// Entering and leaving conditions of one evaluation, before dwell time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub entering: bool,
    pub leaving: bool,
}

impl Verdict {
    pub fn window(inside: bool) -> Self {
        Self {
            entering: inside,
            leaving: !inside,
        }
    }

    pub(crate) fn all(legs: &[Leg]) -> Self {
        Self {
            entering: legs.iter().all(Leg::entering),
            leaving: legs.iter().any(Leg::leaving),
        }
    }

    pub(crate) fn any(legs: &[Leg]) -> Self {
        Self {
            entering: legs.iter().any(Leg::entering),
            leaving: legs.iter().all(Leg::leaving),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn above_leg_uses_asymmetric_margins() {
        // threshold -90 dBm, 3 dB hysteresis
        assert!(Leg::above(-86.0, -90.0, 3.0).entering());
        assert!(!Leg::above(-87.0, -90.0, 3.0).entering());
        assert!(!Leg::above(-92.0, -90.0, 3.0).leaving());
        assert!(Leg::above(-94.0, -90.0, 3.0).leaving());
    }

    #[test]
    fn below_leg_mirrors_above_leg() {
        assert!(Leg::below(-103.0, -100.0, 2.0).entering());
        assert!(!Leg::below(-101.0, -100.0, 2.0).entering());
        assert!(!Leg::below(-99.0, -100.0, 2.0).leaving());
        assert!(Leg::below(-97.0, -100.0, 2.0).leaving());
    }

    #[test]
    fn offset_shifts_both_margins() {
        // -90 dBm threshold, 3 dB hysteresis, +4 dB offset
        let leg = |value| Leg::above(value, -90.0, 3.0).with_offset(4.0);
        assert!(leg(-90.0).entering());
        assert!(!leg(-91.0).entering());
        assert!(!leg(-96.0).leaving());
        assert!(leg(-98.0).leaving());

        let serving = Leg::below(-99.0, -100.0, 2.0).with_offset(-4.0);
        assert!(serving.entering());
    }

    #[test]
    fn nan_value_neither_enters_nor_leaves() {
        let leg = Leg::above(f64::NAN, 500.0, 20.0);
        assert!(!leg.entering());
        assert!(!leg.leaving());
    }

    #[test]
    fn rsrp_snapshot_without_offsets_deserializes() {
        let json = r#"{"kind":"neighbor_rsrp","neighbor":{"satellite_id":"sat-b","timestamp":"2025-09-10T00:00:00Z",
            "elevation_deg":45.0,"rsrp_dbm":-88.0,"atmospheric_loss_db":0.5,"path_loss_db":150.0,
            "elevation_loss_db":0.0,"carrier_to_noise_db_hz":80.0,"quality_grade":"good"}}"#;
        let measurement: Measurement = serde_json::from_str(json).unwrap();
        assert_eq!(measurement.neighbor_rsrp_dbm(), Some(-88.0));
        assert!(matches!(measurement, Measurement::NeighborRsrp { offsets, .. } if offsets.is_zero()));
    }

    #[test]
    fn conjunction_leaves_when_any_leg_leaves() {
        let legs = [Leg::below(-105.0, -100.0, 2.0), Leg::above(-95.0, -90.0, 2.0)];
        let verdict = Verdict::all(&legs);
        assert!(!verdict.entering);
        assert!(verdict.leaving);
    }

    #[test]
    fn disjunction_enters_when_any_leg_enters() {
        let legs = [Leg::above(1200.0, 1000.0, 50.0), Leg::above(1200.0, 2000.0, 50.0)];
        let verdict = Verdict::any(&legs);
        assert!(verdict.entering);
        assert!(!verdict.leaving);
    }
}
