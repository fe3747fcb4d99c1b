use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::TriggerError;
use super::types::EventType;
use crate::geo::GeodeticPoint;

/// Where D1/D2 distances are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceLocation {
    Fixed(GeodeticPoint),
    /// Ground-track point of the serving satellite, re-resolved every tick.
    ServingSatellite,
}

/// Largest magnitude of a single measurement offset, in dB.
pub const MAX_OFFSET_DB: f64 = 24.0;

/// Measurement offsets added to an RSRP before it is compared with a
/// threshold: a frequency-specific part and a cell-individual part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementOffsets {
    pub frequency_db: f64,
    pub cell_db: f64,
}

impl MeasurementOffsets {
    pub fn total_db(&self) -> f64 {
        self.frequency_db + self.cell_db
    }

    pub fn is_zero(&self) -> bool {
        self.frequency_db == 0.0 && self.cell_db == 0.0
    }
}

/// Per-receiver configuration of one event type, as written in config files.
///
/// Units of `thresh1`/`thresh2`/`hysteresis` depend on the variant: dBm for
/// A4/A5, km for D1/D2, seconds for T1 (`thresh1` is the window duration and
/// `thresh2` its start offset after `epoch`).
///
/// `neighbor_offsets` apply to the candidate RSRP of A4 and A5,
/// `serving_offsets` to the serving RSRP of A5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventConfig {
    pub event_type: EventType,
    pub thresh1: f64,
    #[serde(default)]
    pub thresh2: Option<f64>,
    #[serde(default)]
    pub hysteresis: f64,
    #[serde(default, deserialize_with = "deserialize_millis")]
    pub time_to_trigger_ms: u64,
    #[serde(default)]
    pub reference_location: Option<ReferenceLocation>,
    #[serde(default)]
    pub epoch: Option<DateTime<Utc>>,
    #[serde(default)]
    pub neighbor_offsets: MeasurementOffsets,
    #[serde(default)]
    pub serving_offsets: MeasurementOffsets,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Millis {
    Number(u64),
    Text(String),
}

pub(crate) fn deserialize_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Millis::deserialize(deserializer)? {
        Millis::Number(ms) => Ok(ms),
        Millis::Text(text) => {
            let duration = humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)?;
            u64::try_from(duration.as_millis()).map_err(serde::de::Error::custom)
        }
    }
}

/// Variant-specific condition parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    A4 {
        threshold_dbm: f64,
        hysteresis_db: f64,
        offsets: MeasurementOffsets,
    },
    A5 {
        serving_threshold_dbm: f64,
        neighbor_threshold_dbm: f64,
        hysteresis_db: f64,
        serving_offsets: MeasurementOffsets,
        neighbor_offsets: MeasurementOffsets,
    },
    D1 {
        reference: GeodeticPoint,
        thresholds_km: Vec<f64>,
        hysteresis_km: f64,
    },
    D2 {
        serving_threshold_km: f64,
        candidate_threshold_km: f64,
        hysteresis_km: f64,
    },
    T1 {
        epoch: DateTime<Utc>,
        start: Duration,
        duration: Duration,
    },
}

/// A validated [`EventConfig`], ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRule {
    pub event_type: EventType,
    pub condition: Condition,
    pub time_to_trigger: Duration,
}

impl EventConfig {
    pub fn compile(&self) -> Result<TriggerRule, TriggerError> {
        let invalid = |reason: String| TriggerError::InvalidConfig {
            event_type: self.event_type,
            reason,
        };

        if !self.thresh1.is_finite() {
            return Err(invalid(format!("thresh1 must be finite, got {}", self.thresh1)));
        }
        if let Some(thresh2) = self.thresh2 {
            if !thresh2.is_finite() {
                return Err(invalid(format!("thresh2 must be finite, got {thresh2}")));
            }
        }
        if !self.hysteresis.is_finite() || self.hysteresis < 0.0 {
            return Err(invalid(format!(
                "hysteresis must be finite and >= 0, got {}",
                self.hysteresis
            )));
        }
        if self.epoch.is_some() && self.event_type != EventType::T1 {
            return Err(invalid("epoch is only meaningful for T1".to_string()));
        }

        self.check_offsets()?;

        let time_to_trigger = i64::try_from(self.time_to_trigger_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .ok_or_else(|| invalid(format!("time_to_trigger_ms {} is out of range", self.time_to_trigger_ms)))?;

        let condition = match self.event_type {
            EventType::A4 => {
                self.forbid_reference()?;
                if self.thresh2.is_some() {
                    return Err(invalid("A4 takes a single threshold".to_string()));
                }
                self.check_hysteresis_bound()?;
                if !self.serving_offsets.is_zero() {
                    return Err(invalid("A4 has no serving measurement to offset".to_string()));
                }
                Condition::A4 {
                    threshold_dbm: self.thresh1,
                    hysteresis_db: self.hysteresis,
                    offsets: self.neighbor_offsets,
                }
            }
            EventType::A5 => {
                self.forbid_reference()?;
                let thresh2 = self.require_thresh2()?;
                self.check_hysteresis_bound()?;
                Condition::A5 {
                    serving_threshold_dbm: self.thresh1,
                    neighbor_threshold_dbm: thresh2,
                    hysteresis_db: self.hysteresis,
                    serving_offsets: self.serving_offsets,
                    neighbor_offsets: self.neighbor_offsets,
                }
            }
            EventType::D1 => {
                let reference = match self.reference_location {
                    Some(ReferenceLocation::Fixed(point)) if point.is_valid() => point,
                    Some(ReferenceLocation::Fixed(point)) => {
                        return Err(invalid(format!("reference location {point:?} is not a valid geodetic point")));
                    }
                    _ => {
                        return Err(invalid("D1 requires a fixed reference_location".to_string()));
                    }
                };
                self.check_positive_distances()?;
                self.check_hysteresis_bound()?;
                let mut thresholds_km = vec![self.thresh1];
                thresholds_km.extend(self.thresh2);
                Condition::D1 {
                    reference,
                    thresholds_km,
                    hysteresis_km: self.hysteresis,
                }
            }
            EventType::D2 => {
                if let Some(ReferenceLocation::Fixed(_)) = self.reference_location {
                    return Err(invalid(
                        "D2 measures from the moving serving-satellite reference".to_string(),
                    ));
                }
                let thresh2 = self.require_thresh2()?;
                self.check_positive_distances()?;
                self.check_hysteresis_bound()?;
                Condition::D2 {
                    serving_threshold_km: self.thresh1,
                    candidate_threshold_km: thresh2,
                    hysteresis_km: self.hysteresis,
                }
            }
            EventType::T1 => {
                self.forbid_reference()?;
                let epoch = self
                    .epoch
                    .ok_or_else(|| invalid("T1 requires an epoch".to_string()))?;
                if self.hysteresis != 0.0 {
                    return Err(invalid("T1 window membership takes no hysteresis".to_string()));
                }
                if self.thresh1 <= 0.0 {
                    return Err(invalid(format!("T1 duration must be positive, got {} s", self.thresh1)));
                }
                let start_s = self.thresh2.unwrap_or(0.0);
                if start_s < 0.0 {
                    return Err(invalid(format!("T1 start offset must be >= 0, got {start_s} s")));
                }
                let to_duration = |seconds: f64| {
                    Duration::try_milliseconds((seconds * 1000.0).round() as i64)
                        .ok_or_else(|| invalid(format!("{seconds} s is out of range")))
                };
                Condition::T1 {
                    epoch,
                    start: to_duration(start_s)?,
                    duration: to_duration(self.thresh1)?,
                }
            }
        };

        Ok(TriggerRule {
            event_type: self.event_type,
            condition,
            time_to_trigger,
        })
    }

    /// Offsets are dB quantities, so only the RSRP events take them.
    fn check_offsets(&self) -> Result<(), TriggerError> {
        let invalid = |reason: String| TriggerError::InvalidConfig {
            event_type: self.event_type,
            reason,
        };
        let rsrp_event = matches!(self.event_type, EventType::A4 | EventType::A5);
        for (name, offsets) in [("neighbor_offsets", self.neighbor_offsets), ("serving_offsets", self.serving_offsets)] {
            if !rsrp_event && !offsets.is_zero() {
                return Err(invalid(format!("{name} only apply to A4 and A5")));
            }
            for value in [offsets.frequency_db, offsets.cell_db] {
                if !value.is_finite() || value.abs() > MAX_OFFSET_DB {
                    return Err(invalid(format!(
                        "{name} must be finite and within ±{MAX_OFFSET_DB} dB, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn require_thresh2(&self) -> Result<f64, TriggerError> {
        self.thresh2.ok_or_else(|| TriggerError::InvalidConfig {
            event_type: self.event_type,
            reason: "thresh2 is required".to_string(),
        })
    }

    fn forbid_reference(&self) -> Result<(), TriggerError> {
        match self.reference_location {
            None => Ok(()),
            Some(_) => Err(TriggerError::InvalidConfig {
                event_type: self.event_type,
                reason: "reference_location only applies to D1 and D2".to_string(),
            }),
        }
    }

    fn check_positive_distances(&self) -> Result<(), TriggerError> {
        let thresholds = std::iter::once(self.thresh1).chain(self.thresh2);
        for threshold in thresholds {
            if threshold <= 0.0 {
                return Err(TriggerError::InvalidConfig {
                    event_type: self.event_type,
                    reason: format!("distance thresholds must be positive, got {threshold} km"),
                });
            }
        }
        Ok(())
    }

    /// Hysteresis must stay strictly inside the smallest threshold magnitude.
    fn check_hysteresis_bound(&self) -> Result<(), TriggerError> {
        let smallest = self
            .thresh1
            .abs()
            .min(self.thresh2.unwrap_or(self.thresh1).abs());
        if self.hysteresis >= smallest {
            return Err(TriggerError::InvalidConfig {
                event_type: self.event_type,
                reason: format!(
                    "hysteresis {} must be smaller than the smallest threshold magnitude {}",
                    self.hysteresis, smallest
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn a4(thresh1: f64, hysteresis: f64) -> EventConfig {
        EventConfig {
            event_type: EventType::A4,
            thresh1,
            thresh2: None,
            hysteresis,
            time_to_trigger_ms: 640,
            reference_location: None,
            epoch: None,
            neighbor_offsets: MeasurementOffsets::default(),
            serving_offsets: MeasurementOffsets::default(),
        }
    }

    #[test]
    fn a4_compiles() {
        let rule = a4(-90.0, 3.0).compile().unwrap();
        assert_eq!(rule.time_to_trigger, Duration::milliseconds(640));
        assert_eq!(
            rule.condition,
            Condition::A4 {
                threshold_dbm: -90.0,
                hysteresis_db: 3.0,
                offsets: MeasurementOffsets::default(),
            }
        );
    }

    #[test]
    fn offsets_deserialize_and_reach_the_condition() {
        let yaml = r#"
event_type: A5
thresh1: -100
thresh2: -90
hysteresis: 2
serving_offsets:
  cell_db: -1.5
neighbor_offsets:
  frequency_db: 3
  cell_db: 1
"#;
        let config: EventConfig = serde_yaml::from_str(yaml).unwrap();
        let rule = config.compile().unwrap();
        assert_matches!(
            rule.condition,
            Condition::A5 { serving_offsets, neighbor_offsets, .. }
                if serving_offsets.total_db() == -1.5 && neighbor_offsets.total_db() == 4.0
        );
    }

    #[test]
    fn offsets_are_bounded_and_limited_to_rsrp_events() {
        let mut config = a4(-90.0, 3.0);
        config.neighbor_offsets.cell_db = 30.0;
        assert_matches!(config.compile(), Err(TriggerError::InvalidConfig { .. }));

        config.neighbor_offsets.cell_db = f64::NAN;
        assert_matches!(config.compile(), Err(TriggerError::InvalidConfig { .. }));

        let mut a4_with_serving = a4(-90.0, 3.0);
        a4_with_serving.serving_offsets.frequency_db = 2.0;
        assert_matches!(a4_with_serving.compile(), Err(TriggerError::InvalidConfig { .. }));

        let d2 = EventConfig {
            event_type: EventType::D2,
            thresh2: Some(1200.0),
            neighbor_offsets: MeasurementOffsets {
                frequency_db: 1.0,
                cell_db: 0.0,
            },
            ..a4(1500.0, 50.0)
        };
        assert_matches!(d2.compile(), Err(TriggerError::InvalidConfig { event_type: EventType::D2, .. }));
    }

    #[test]
    fn hysteresis_at_threshold_magnitude_is_rejected() {
        let config = EventConfig {
            event_type: EventType::D2,
            thresh1: 1500.0,
            thresh2: Some(50.0),
            hysteresis: 50.0,
            ..a4(0.0, 0.0)
        };
        assert_matches!(
            config.compile(),
            Err(TriggerError::InvalidConfig { event_type: EventType::D2, .. })
        );
    }

    #[test]
    fn negative_hysteresis_is_rejected() {
        assert_matches!(a4(-90.0, -1.0).compile(), Err(TriggerError::InvalidConfig { .. }));
    }

    #[test]
    fn a5_requires_second_threshold() {
        let config = EventConfig {
            event_type: EventType::A5,
            ..a4(-100.0, 2.0)
        };
        assert_matches!(config.compile(), Err(TriggerError::InvalidConfig { event_type: EventType::A5, .. }));
    }

    #[test]
    fn d1_requires_fixed_reference() {
        let mut config = EventConfig {
            event_type: EventType::D1,
            thresh2: Some(800.0),
            reference_location: Some(ReferenceLocation::ServingSatellite),
            ..a4(500.0, 10.0)
        };
        assert_matches!(config.compile(), Err(TriggerError::InvalidConfig { .. }));

        config.reference_location = Some(ReferenceLocation::Fixed(GeodeticPoint::new(24.94, 121.37)));
        let rule = config.compile().unwrap();
        assert_matches!(rule.condition, Condition::D1 { ref thresholds_km, .. } if thresholds_km == &vec![500.0, 800.0]);
    }

    #[test]
    fn d2_rejects_fixed_reference() {
        let config = EventConfig {
            event_type: EventType::D2,
            thresh2: Some(1200.0),
            reference_location: Some(ReferenceLocation::Fixed(GeodeticPoint::new(0.0, 0.0))),
            ..a4(1500.0, 50.0)
        };
        assert_matches!(config.compile(), Err(TriggerError::InvalidConfig { .. }));
    }

    #[test]
    fn t1_requires_epoch_and_no_hysteresis() {
        let mut config = EventConfig {
            event_type: EventType::T1,
            thresh2: Some(5.0),
            ..a4(10.0, 0.0)
        };
        assert_matches!(config.compile(), Err(TriggerError::InvalidConfig { .. }));

        config.epoch = Some(Utc::now());
        assert!(config.compile().is_ok());

        config.hysteresis = 1.0;
        assert_matches!(config.compile(), Err(TriggerError::InvalidConfig { .. }));
    }

    #[test]
    fn time_to_trigger_accepts_humantime() {
        let yaml = "event_type: A4\nthresh1: -90\nhysteresis: 3\ntime_to_trigger_ms: 1s\n";
        let config: EventConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.time_to_trigger_ms, 1000);

        let yaml = "event_type: A4\nthresh1: -90\ntime_to_trigger_ms: 320\n";
        let config: EventConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.time_to_trigger_ms, 320);
    }

    #[test]
    fn fixed_reference_deserializes_from_yaml() {
        let yaml = r#"
event_type: D1
thresh1: 500
hysteresis: 10
reference_location:
  kind: fixed
  latitude_deg: 24.94
  longitude_deg: 121.37
"#;
        let config: EventConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.reference_location,
            Some(ReferenceLocation::Fixed(GeodeticPoint::new(24.94, 121.37)))
        );
    }
}
