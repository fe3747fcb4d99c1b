//! Measurement-event detection for receivers handing over between
//! low-orbit satellites.
//!
//! Geometric samples go through the [`signal`] model, are evaluated by the
//! [`trigger`] state machines and leave the [`engine`] as `HandoverEvent`s
//! together with a ranked [`candidates`] list per receiver.

pub mod candidates;
pub mod config;
pub mod engine;
pub mod geo;
pub mod signal;
pub mod trigger;

pub use config::{Config, ConfigError, ReceiverConfig};
