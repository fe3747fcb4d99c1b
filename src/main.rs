use clap::{Parser, Subcommand};
use std::fs;
use std::process::ExitCode;

use sat_handover::engine::TaggedTick;
use sat_handover::trigger::{Condition, MeasurementOffsets, TriggerRule};
use sat_handover::Config;

#[derive(Parser)]
#[command(name = "sat-handover")]
#[command(about = "Handover measurement-event detection for LEO receivers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate { config: String },
    /// Replay recorded ticks through the configured receivers
    Replay { config: String, ticks: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Replay { config, ticks } => replay(&config, &ticks),
    }
}

fn validate(path: &str) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let fleet = match config.fleet() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Configuration is valid ({} receivers, {} constellations)",
        fleet.len(),
        config.constellations.len()
    );
    for engine in fleet.engines() {
        println!("  {}:", engine.receiver_id());
        for rule in engine.rules() {
            println!("    {}", describe(rule));
        }
    }
    ExitCode::SUCCESS
}

fn replay(config_path: &str, ticks_path: &str) -> ExitCode {
    let config = match Config::from_file(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut fleet = match config.fleet() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let content = match fs::read_to_string(ticks_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let ticks: Vec<TaggedTick> = match serde_json::from_str(&content) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for event in fleet.evaluate(&ticks) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    for list in fleet.candidates() {
        match serde_json::to_string(&list) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let stats = fleet.statistics();
    log::info!(
        "replayed {} ticks: {} samples, {} events, {} invalid, {} stale, {} retired",
        ticks.len(),
        stats.samples_evaluated,
        stats.total_events(),
        stats.invalid_geometry,
        stats.stale_samples,
        stats.retired_states
    );
    ExitCode::SUCCESS
}

fn describe(rule: &TriggerRule) -> String {
    let ttt = rule.time_to_trigger.num_milliseconds();
    match &rule.condition {
        Condition::A4 {
            threshold_dbm,
            hysteresis_db,
            offsets,
        } => format!(
            "A4 neighbour{} > {threshold_dbm} dBm (hys {hysteresis_db} dB, ttt {ttt} ms)",
            offset_suffix(offsets)
        ),
        Condition::A5 {
            serving_threshold_dbm,
            neighbor_threshold_dbm,
            hysteresis_db,
            serving_offsets,
            neighbor_offsets,
        } => format!(
            "A5 serving{} < {serving_threshold_dbm} dBm and neighbour{} > {neighbor_threshold_dbm} dBm (hys {hysteresis_db} dB, ttt {ttt} ms)",
            offset_suffix(serving_offsets),
            offset_suffix(neighbor_offsets)
        ),
        Condition::D1 {
            reference,
            thresholds_km,
            hysteresis_km,
        } => format!(
            "D1 distance to ({}, {}) beyond {:?} km (hys {hysteresis_km} km, ttt {ttt} ms)",
            reference.latitude_deg, reference.longitude_deg, thresholds_km
        ),
        Condition::D2 {
            serving_threshold_km,
            candidate_threshold_km,
            hysteresis_km,
        } => format!(
            "D2 serving track > {serving_threshold_km} km and candidate track < {candidate_threshold_km} km (hys {hysteresis_km} km, ttt {ttt} ms)"
        ),
        Condition::T1 {
            epoch,
            start,
            duration,
        } => format!(
            "T1 window {} + [{} s, {} s]",
            epoch,
            start.num_seconds(),
            (*start + *duration).num_seconds()
        ),
    }
}

fn offset_suffix(offsets: &MeasurementOffsets) -> String {
    if offsets.is_zero() {
        String::new()
    } else {
        format!(" {:+} dB", offsets.total_db())
    }
}
