use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candidates::{CandidateConfig, CandidateError};
use crate::engine::{EngineError, EventEngine, Fleet};
use crate::signal::{AtmosphereModel, LinkParameters, SignalError};
use crate::trigger::{EventConfig, TriggerError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("atmosphere: {0}")]
    Atmosphere(#[source] SignalError),
    #[error("candidates: {0}")]
    Candidates(#[from] CandidateError),
    #[error("constellation {name}: {source}")]
    Constellation {
        name: String,
        #[source]
        source: SignalError,
    },
    #[error("receiver {receiver_id}: {source}")]
    Trigger {
        receiver_id: String,
        #[source]
        source: TriggerError,
    },
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub atmosphere: AtmosphereModel,
    pub constellations: HashMap<String, LinkParameters>,
    #[serde(default)]
    pub candidates: CandidateConfig,
    pub receivers: Vec<ReceiverConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub id: String,
    pub events: Vec<EventConfig>,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.atmosphere.validate().map_err(ConfigError::Atmosphere)?;
        self.candidates.validate()?;

        if self.constellations.is_empty() {
            return Err(ConfigError::Invalid("no constellations configured".to_string()));
        }
        for (name, link) in &self.constellations {
            link.validate().map_err(|source| ConfigError::Constellation {
                name: name.clone(),
                source,
            })?;
        }

        let mut ids = HashSet::new();
        for receiver in &self.receivers {
            if receiver.id.trim().is_empty() {
                return Err(ConfigError::Invalid("receiver id must not be empty".to_string()));
            }
            if !ids.insert(receiver.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "receiver {} is configured more than once",
                    receiver.id
                )));
            }
            if receiver.events.is_empty() {
                return Err(ConfigError::Invalid(format!("receiver {} has no events", receiver.id)));
            }
            for event in &receiver.events {
                event.compile().map_err(|source| ConfigError::Trigger {
                    receiver_id: receiver.id.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    pub fn engine(&self, receiver: &ReceiverConfig) -> Result<EventEngine, ConfigError> {
        let engine = EventEngine::new(
            receiver.id.clone(),
            &receiver.events,
            self.constellations.clone(),
            self.atmosphere,
            self.candidates,
        )?;
        Ok(engine)
    }

    pub fn fleet(&self) -> Result<Fleet, ConfigError> {
        let engines = self
            .receivers
            .iter()
            .map(|receiver| self.engine(receiver))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Fleet::new(engines)?)
    }
}
