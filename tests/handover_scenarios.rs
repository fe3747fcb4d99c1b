//! End-to-end handover scenarios.
//!
//! Trigger rules are driven directly with hand-built measurements where the
//! numbers matter, and through a YAML-configured [`Fleet`] where the geometry
//! pipeline (ground tracks, receiver motion) is part of the behaviour.

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, TimeZone, Utc};

use sat_handover::engine::{Fleet, HandoverEvent, ReceiverTick, TaggedTick};
use sat_handover::geo::GeodeticPoint;
use sat_handover::signal::{GeometricSample, QualityGrade, SignalSample};
use sat_handover::trigger::{
    Direction, EventConfig, EventPriority, EventType, Measurement, MeasurementOffsets, TriggerKey, TriggerRule,
    TriggerState,
};
use sat_handover::Config;

fn t(ms: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 10, 0, 0, 0).unwrap() + Duration::milliseconds(ms)
}

fn signal(satellite_id: &str, rsrp_dbm: f64, at: DateTime<Utc>) -> SignalSample {
    SignalSample {
        satellite_id: satellite_id.to_string(),
        timestamp: at,
        elevation_deg: 40.0,
        rsrp_dbm,
        atmospheric_loss_db: 0.4,
        path_loss_db: Some(155.0),
        elevation_loss_db: 0.0,
        carrier_to_noise_db_hz: 75.0,
        quality_grade: QualityGrade::from_rsrp(rsrp_dbm),
    }
}

fn rule(yaml: &str) -> TriggerRule {
    let config: EventConfig = serde_yaml::from_str(yaml).unwrap();
    config.compile().unwrap()
}

fn drive(rule: &TriggerRule, measurements: Vec<(DateTime<Utc>, Measurement)>) -> Vec<Option<Direction>> {
    let key = TriggerKey::new("ue-1", rule.event_type, "sat-b");
    let mut state = TriggerState::default();
    measurements
        .into_iter()
        .map(|(at, measurement)| rule.evaluate(&key, &mut state, &measurement, at).unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Trigger semantics
// ---------------------------------------------------------------------------

/// With a 640 ms dwell sampled every 640 ms, the second -86 dBm sample in a
/// row is the first that can fire, and re-entry needs a Leaving below -93.
#[test]
fn a4_hysteresis_with_dwell() {
    let a4 = rule("event_type: A4\nthresh1: -90\nhysteresis: 3\ntime_to_trigger_ms: 640\n");
    let series = [-95.0, -86.0, -86.0, -89.0, -86.0, -95.0, -86.0, -86.0];
    let measurements = series
        .iter()
        .enumerate()
        .map(|(i, &rsrp)| {
            let at = t(i as i64 * 640);
            let neighbor = signal("sat-b", rsrp, at);
            (at, Measurement::NeighborRsrp { neighbor, offsets: MeasurementOffsets::default() })
        })
        .collect();

    let transitions = drive(&a4, measurements);
    assert_eq!(
        transitions,
        vec![
            None,
            None,
            Some(Direction::Entering),
            None,
            None,
            Some(Direction::Leaving),
            None,
            Some(Direction::Entering)
        ]
    );
}

#[test]
fn dwell_restarts_after_one_millisecond_short() {
    let a4 = rule("event_type: A4\nthresh1: -90\nhysteresis: 3\ntime_to_trigger_ms: 1s\n");
    let series = [(0, -85.0), (999, -85.0), (1000, -95.0), (1500, -85.0), (2499, -85.0), (2500, -85.0)];
    let measurements = series
        .iter()
        .map(|&(ms, rsrp)| {
            let neighbor = signal("sat-b", rsrp, t(ms));
            (t(ms), Measurement::NeighborRsrp { neighbor, offsets: MeasurementOffsets::default() })
        })
        .collect();

    let transitions = drive(&a4, measurements);
    assert_eq!(transitions, vec![None, None, None, None, None, Some(Direction::Entering)]);
}

#[test]
fn a5_conjunction_fires_once() {
    let a5 = rule("event_type: A5\nthresh1: -100\nthresh2: -90\nhysteresis: 2\n");
    let measurements = [-95.0, -91.25, -87.5, -83.75, -80.0]
        .iter()
        .enumerate()
        .map(|(i, &neighbor)| {
            let at = t(i as i64 * 30_000);
            (
                at,
                Measurement::ServingAndNeighborRsrp {
                    serving: signal("sat-a", -105.0, at),
                    neighbor: signal("sat-b", neighbor, at),
                    serving_offsets: MeasurementOffsets::default(),
                    neighbor_offsets: MeasurementOffsets::default(),
                },
            )
        })
        .collect();

    let transitions = drive(&a5, measurements);
    let entering: Vec<usize> = transitions
        .iter()
        .enumerate()
        .filter(|(_, transition)| **transition == Some(Direction::Entering))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(entering, vec![2]);
    assert!(!transitions.contains(&Some(Direction::Leaving)));
}

// ---------------------------------------------------------------------------
// Fleet scenarios
// ---------------------------------------------------------------------------

const LINKS: &str = r#"
constellations:
  starlink:
    frequency_ghz: 2.0
    eirp_dbm: 60
    antenna_gain_dbi: 0
    system_noise_temp_k: 290
"#;

fn fleet(receivers: &str) -> Fleet {
    let config = Config::from_yaml(&format!("{LINKS}{receivers}")).unwrap();
    config.fleet().unwrap()
}

fn geometry(id: &str, at: DateTime<Utc>, azimuth_deg: f64, elevation_deg: f64, slant_range_km: f64) -> GeometricSample {
    GeometricSample {
        satellite_id: id.to_string(),
        constellation: "starlink".to_string(),
        orbital_plane: Some(3),
        timestamp: at,
        elevation_deg,
        azimuth_deg,
        slant_range_km,
    }
}

fn tick(position: GeodeticPoint, serving: Option<&str>, samples: Vec<GeometricSample>) -> TaggedTick {
    TaggedTick {
        receiver_id: "ue-1".to_string(),
        tick: ReceiverTick {
            position,
            serving_satellite_id: serving.map(str::to_string),
            samples,
        },
    }
}

fn directions(events: &[HandoverEvent]) -> Vec<(EventType, Direction)> {
    events.iter().map(|event| (event.event_type, event.direction)).collect()
}

#[test]
fn d2_follows_moving_ground_tracks() {
    let mut fleet = fleet(
        r#"
receivers:
  - id: ue-1
    events:
      - event_type: D2
        thresh1: 1500
        thresh2: 1200
        hysteresis: 50
"#,
    );
    let origin = GeodeticPoint::new(0.0, 0.0);

    // serving low in the east (~1800 km track distance), candidate overhead
    let first = tick(
        origin,
        Some("sat-a"),
        vec![
            geometry("sat-a", t(0), 90.0, 10.0, 2000.0),
            geometry("sat-b", t(0), 270.0, 80.0, 560.0),
        ],
    );
    // serving climbs back to ~565 km track distance
    let second = tick(
        origin,
        Some("sat-a"),
        vec![
            geometry("sat-a", t(30_000), 90.0, 40.0, 800.0),
            geometry("sat-b", t(30_000), 270.0, 80.0, 560.0),
        ],
    );

    let events = fleet.evaluate(&[first]);
    assert_eq!(directions(&events), vec![(EventType::D2, Direction::Entering)]);
    assert_eq!(events[0].priority, EventPriority::Low);
    assert_matches!(
        events[0].measurement_snapshot,
        Measurement::GroundTrackDistances { serving_distance_km, candidate_distance_km, .. }
            if serving_distance_km > 1700.0 && candidate_distance_km < 150.0
    );

    let events = fleet.evaluate(&[second]);
    assert_eq!(directions(&events), vec![(EventType::D2, Direction::Leaving)]);
}

#[test]
fn d1_follows_receiver_motion() {
    let mut fleet = fleet(
        r#"
receivers:
  - id: ue-1
    events:
      - event_type: D1
        thresh1: 500
        hysteresis: 20
        reference_location:
          kind: fixed
          latitude_deg: 0
          longitude_deg: 0
"#,
    );

    // one degree of longitude on the equator is about 111.2 km
    let ticks: Vec<TaggedTick> = [0.0, 5.0, 4.4, 4.0]
        .iter()
        .enumerate()
        .map(|(i, &longitude)| {
            let at = t(i as i64 * 30_000);
            tick(
                GeodeticPoint::new(0.0, longitude),
                None,
                vec![geometry("sat-b", at, 0.0, 60.0, 600.0)],
            )
        })
        .collect();

    let events = fleet.evaluate(&ticks);
    assert_eq!(
        directions(&events),
        vec![(EventType::D1, Direction::Entering), (EventType::D1, Direction::Leaving)]
    );
    assert_eq!(events[0].triggered_at, t(30_000));
    assert_eq!(events[1].triggered_at, t(90_000));
    assert_eq!(events[0].candidate_satellite_ids, vec!["sat-b".to_string()]);
}

#[test]
fn t1_window_membership() {
    let mut fleet = fleet(
        r#"
receivers:
  - id: ue-1
    events:
      - event_type: T1
        thresh1: 10
        thresh2: 5
        epoch: 2025-09-10T00:00:00Z
"#,
    );

    let ticks: Vec<TaggedTick> = [2_000, 14_000, 16_000]
        .iter()
        .map(|&ms| tick(GeodeticPoint::new(0.0, 0.0), None, vec![geometry("sat-b", t(ms), 0.0, 60.0, 600.0)]))
        .collect();

    let events = fleet.evaluate(&ticks);
    assert_eq!(
        directions(&events),
        vec![(EventType::T1, Direction::Entering), (EventType::T1, Direction::Leaving)]
    );
    assert_eq!(events[0].triggered_at, t(14_000));
    assert_eq!(events[0].confidence, 1.0);
    assert_eq!(events[1].triggered_at, t(16_000));
}

#[test]
fn handover_and_visibility_loss_retire_triggers() {
    let mut fleet = fleet(
        r#"
candidates:
  max_sample_age_ms: 45s
receivers:
  - id: ue-1
    events:
      - event_type: A4
        thresh1: -92
        hysteresis: 2
        neighbor_offsets:
          cell_db: 6
"#,
    );
    let origin = GeodeticPoint::new(0.0, 0.0);

    // about -94.4 dBm at 600 km, over the threshold only with the 6 dB offset
    let ticks = vec![
        tick(
            origin,
            Some("sat-a"),
            vec![
                geometry("sat-a", t(0), 0.0, 60.0, 3000.0),
                geometry("sat-b", t(0), 90.0, 60.0, 600.0),
                geometry("sat-c", t(0), 180.0, 60.0, 600.0),
            ],
        ),
        // handover to sat-b; sat-a is no longer reported
        tick(
            origin,
            Some("sat-b"),
            vec![
                geometry("sat-b", t(30_000), 90.0, 60.0, 600.0),
                geometry("sat-c", t(30_000), 180.0, 60.0, 600.0),
            ],
        ),
        tick(origin, Some("sat-b"), vec![geometry("sat-b", t(60_000), 90.0, 60.0, 600.0)]),
        // sat-c last reported 60 s ago
        tick(origin, Some("sat-b"), vec![geometry("sat-b", t(90_000), 90.0, 60.0, 600.0)]),
    ];

    let events = fleet.evaluate(&ticks);
    let summary: Vec<(Direction, &str)> = events
        .iter()
        .map(|event| (event.direction, event.candidate_satellite_ids[0].as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Direction::Entering, "sat-b"),
            (Direction::Entering, "sat-c"),
            (Direction::Leaving, "sat-b"),
            (Direction::Leaving, "sat-c"),
        ]
    );
    assert_eq!(events[2].triggered_at, t(30_000));
    assert_eq!(events[3].triggered_at, t(90_000));
    assert_matches!(
        events[3].measurement_snapshot,
        Measurement::NeighborRsrp { offsets, .. } if offsets.cell_db == 6.0
    );
    assert!(fleet.candidates().iter().all(|list| list.is_empty()));
}

#[test]
fn invalid_receiver_position_never_fires_d1() {
    let mut fleet = fleet(
        r#"
receivers:
  - id: ue-1
    events:
      - event_type: D1
        thresh1: 500
        reference_location:
          kind: fixed
          latitude_deg: 0
          longitude_deg: 0
"#,
    );

    let ticks = vec![
        tick(GeodeticPoint::new(f64::NAN, 0.0), None, vec![geometry("sat-b", t(0), 0.0, 60.0, 600.0)]),
        tick(GeodeticPoint::new(0.0, f64::INFINITY), None, vec![geometry("sat-b", t(1_000), 0.0, 60.0, 600.0)]),
        tick(GeodeticPoint::new(-95.0, 0.0), None, vec![geometry("sat-b", t(2_000), 0.0, 60.0, 600.0)]),
    ];
    assert!(fleet.evaluate(&ticks).is_empty());

    let stats = fleet.statistics();
    assert_eq!(stats.invalid_geometry, 3);
    assert_eq!(stats.samples_evaluated, 0);
}

#[test]
fn replay_json_round_trips_through_the_fleet() {
    let mut fleet = fleet(
        r#"
receivers:
  - id: ue-1
    events:
      - event_type: A4
        thresh1: -92
        hysteresis: 2
"#,
    );

    let ticks: Vec<TaggedTick> = serde_json::from_str(
        r#"[
  {
    "receiver_id": "ue-1",
    "position": { "latitude_deg": 24.94, "longitude_deg": 121.37 },
    "serving_satellite_id": "sat-a",
    "samples": [
      { "satellite_id": "sat-b", "constellation": "starlink", "orbital_plane": 7,
        "timestamp": "2025-09-10T00:00:00Z",
        "elevation_deg": 60.0, "azimuth_deg": 10.0, "slant_range_km": 300.0 }
    ]
  }
]"#,
    )
    .unwrap();

    let events = fleet.evaluate(&ticks);
    assert_eq!(events.len(), 1);

    let json: serde_json::Value = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["event_type"], "A4");
    assert_eq!(json["priority"], "medium");
    assert_eq!(json["direction"], "entering");
    assert_eq!(json["serving_satellite_id"], "sat-a");
    assert_eq!(json["measurement_snapshot"]["kind"], "neighbor_rsrp");
    assert_eq!(json["measurement_snapshot"]["neighbor"]["satellite_id"], "sat-b");

    let lists = fleet.candidates();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].candidates[0].group.orbital_plane, Some(7));
}
