//!
//! Simulation documents.
//!
//! A [`SimulationConfig`] is usually read from YAML:
//!
//! ```yaml
//! duration: 100
//! seed: 7
//! generators:
//!   - { name: visitors, target: reception, mean_interarrival_time: 2.0 }
//! stations:
//!   - name: reception
//!     max_servers: 2
//!     max_queue_size: 10
//!     mean_service_time: 3.0
//!     go_to:
//!       - { name: hallway, probability: 0.8 }
//!       - { name: exit, probability: 0.2 }
//!   - name: hallway
//!     max_servers: 5
//!     max_queue_size: 30
//!     mean_service_time: 4.0
//! ```
//!
//! A destination without an explicit `target` points to the station
//! of the same name, the name `exit` leaves the network.
//!

use crate::network::{Network, NetworkBuilder, NetworkOptions, StationSpec, DEFAULT_SAMPLE_INTERVAL};
use crate::station::{InvalidMean, RoutingError, UtilizationMode, EXIT};
use crate::time::{Duration, SimTime};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a configuration or building a network
/// from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yml::Error),
    #[error("simulation duration must be a positive, representable time span, found {0}")]
    InvalidDuration(f64),
    #[error("{name} must be a positive, representable time span, found {value}")]
    InvalidInterval { name: &'static str, value: f64 },
    #[error("station '{station}': max_servers must be at least 1")]
    NoServers { station: String },
    #[error("station '{station}': invalid mean_service_time: {source}")]
    InvalidServiceTime { station: String, source: InvalidMean },
    #[error("generator '{generator}': invalid mean_interarrival_time: {source}")]
    InvalidInterarrivalTime {
        generator: String,
        source: InvalidMean,
    },
    #[error("station '{0}' is defined more than once")]
    DuplicateStation(String),
    #[error("{context} refers to unknown station '{target}'")]
    UnknownStation { context: String, target: String },
    #[error("station '{station}': {source}")]
    Routing {
        station: String,
        source: RoutingError,
    },
}

fn default_sample_interval() -> Option<f64> {
    Some(DEFAULT_SAMPLE_INTERVAL.as_secs_f64())
}

///
/// A complete simulation: run parameters and topology.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// The simulated time span.
    pub duration: f64,
    /// Seeds the random number generator. Runs without a seed are not
    /// reproducible.
    #[serde(default)]
    pub seed: Option<u64>,
    /// The period of usage sampling, `null` disables it.
    #[serde(default = "default_sample_interval")]
    pub sample_interval: Option<f64>,
    /// The delay after which idle and active timers elapse. Defaults to
    /// the simulation duration.
    #[serde(default)]
    pub timer_horizon: Option<f64>,
    #[serde(default)]
    pub utilization: UtilizationMode,
    /// Retains exited entities for inspection.
    #[serde(default)]
    pub keep_exited: bool,
    #[serde(default)]
    pub generators: Vec<GeneratorConfig>,
    pub stations: Vec<StationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationConfig {
    pub name: String,
    pub max_servers: usize,
    pub max_queue_size: usize,
    pub mean_service_time: f64,
    #[serde(default)]
    pub go_to: Vec<DestinationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationConfig {
    pub name: String,
    pub probability: f64,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    pub name: String,
    pub target: String,
    pub mean_interarrival_time: f64,
}

impl SimulationConfig {
    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed.
    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(s)?)
    }

    /// Reads and parses a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Serializes this configuration to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yml::to_string(self)?)
    }

    /// The end of the simulated time span.
    ///
    /// # Errors
    ///
    /// Returns an error if the duration is not a positive finite number
    /// representable on the simulated timeline.
    pub fn end_time(&self) -> Result<SimTime, ConfigError> {
        let duration = positive(self.duration).ok_or(ConfigError::InvalidDuration(self.duration))?;
        Ok(SimTime::from_duration(duration))
    }

    /// The network wide options described by this document.
    ///
    /// # Errors
    ///
    /// Returns an error if an interval is not a positive finite number.
    pub fn options(&self) -> Result<NetworkOptions, ConfigError> {
        let duration = positive(self.duration).ok_or(ConfigError::InvalidDuration(self.duration))?;
        let timer_horizon = match self.timer_horizon {
            Some(value) => positive(value).ok_or(ConfigError::InvalidInterval {
                name: "timer_horizon",
                value,
            })?,
            None => duration,
        };
        let sample_interval = match self.sample_interval {
            Some(value) => Some(positive(value).ok_or(ConfigError::InvalidInterval {
                name: "sample_interval",
                value,
            })?),
            None => None,
        };

        Ok(NetworkOptions {
            timer_horizon: Some(timer_horizon),
            sample_interval,
            utilization: self.utilization,
            keep_exited: self.keep_exited,
        })
    }

    /// Builds the described network.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending station or generator, if
    /// the topology is invalid.
    pub fn network(&self) -> Result<Network, ConfigError> {
        let mut builder = NetworkBuilder::new().options(self.options()?);
        for station in &self.stations {
            let mut spec = StationSpec::new(
                station.name.as_str(),
                station.max_servers,
                station.max_queue_size,
                station.mean_service_time,
            );
            for dest in &station.go_to {
                let target = match &dest.target {
                    Some(target) => Some(target.as_str()),
                    None if dest.name == EXIT => None,
                    None => Some(dest.name.as_str()),
                };
                spec = spec.route(dest.name.as_str(), dest.probability, target);
            }
            builder = builder.station(spec);
        }
        for generator in &self.generators {
            builder = builder.generator(
                generator.name.as_str(),
                generator.target.as_str(),
                generator.mean_interarrival_time,
            );
        }
        builder.build()
    }
}

/// Converts seconds into a non-zero duration. Values that round to zero
/// or overflow a [`Duration`] are rejected like non-positive ones.
fn positive(value: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|duration| !duration.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::StationId;

    const MUSEUM: &str = "
duration: 50
seed: 3
generators:
  - { name: visitors, target: reception, mean_interarrival_time: 2.0 }
stations:
  - name: reception
    max_servers: 2
    max_queue_size: 10
    mean_service_time: 3.0
    go_to:
      - { name: hallway, probability: 0.8 }
      - { name: exit, probability: 0.2 }
  - name: hallway
    max_servers: 5
    max_queue_size: 30
    mean_service_time: 4.0
";

    #[test]
    fn parse_with_defaults() {
        let config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        assert_eq!(config.duration, 50.0);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.sample_interval, Some(0.25));
        assert_eq!(config.timer_horizon, None);
        assert_eq!(config.utilization, UtilizationMode::Sampled);
        assert!(!config.keep_exited);
        assert_eq!(config.stations.len(), 2);
        assert!(config.stations[1].go_to.is_empty());
        assert_eq!(config.generators[0].target, "reception");

        let options = config.options().unwrap();
        assert_eq!(options.timer_horizon, Some(Duration::from_secs(50)));
        assert_eq!(options.sample_interval, Some(Duration::from_millis(250)));
    }

    #[test]
    fn topology_from_document() {
        let config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        let network = config.network().unwrap();
        let reception = network.station_by_name("reception").unwrap();
        assert_eq!(reception.max_servers(), 2);
        assert_eq!(reception.max_queue_size(), 10);

        let routes = reception.routing().destinations();
        assert_eq!(routes[0].target(), Some(StationId(1)));
        assert!(routes[1].is_exit());
        assert_eq!(network.generators()[0].target(), StationId(0));
    }

    #[test]
    fn yaml_roundtrip() {
        let config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(SimulationConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn invalid_documents() {
        assert!(matches!(
            SimulationConfig::from_yaml("duration: 1\nstations: []\nunknown: 1"),
            Err(ConfigError::Parse(_))
        ));

        let mut config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        config.duration = 0.0;
        assert!(matches!(config.network(), Err(ConfigError::InvalidDuration(_))));

        let mut config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        config.sample_interval = Some(-1.0);
        assert!(matches!(
            config.options(),
            Err(ConfigError::InvalidInterval {
                name: "sample_interval",
                ..
            })
        ));

        let mut config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        config.stations[0].go_to[0].probability = 0.5;
        let err = config.network().unwrap_err();
        assert!(err.to_string().starts_with("station 'reception'"));

        let mut config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        config.stations[0].go_to[0].target = Some("attic".to_string());
        assert!(matches!(
            config.network(),
            Err(ConfigError::UnknownStation { .. })
        ));
    }

    #[test]
    fn intervals_must_not_round_to_zero() {
        let mut config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        config.sample_interval = Some(1e-10);
        assert!(matches!(
            config.network(),
            Err(ConfigError::InvalidInterval {
                name: "sample_interval",
                ..
            })
        ));

        let mut config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        config.timer_horizon = Some(1e-10);
        assert!(matches!(
            config.network(),
            Err(ConfigError::InvalidInterval {
                name: "timer_horizon",
                ..
            })
        ));

        let mut config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        config.generators[0].mean_interarrival_time = 1e-10;
        assert!(matches!(
            config.network(),
            Err(ConfigError::InvalidInterarrivalTime { .. })
        ));
    }

    #[test]
    fn oversized_duration_is_rejected() {
        let mut config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        config.duration = 1.0e30;
        assert!(matches!(config.end_time(), Err(ConfigError::InvalidDuration(_))));
        assert!(matches!(config.options(), Err(ConfigError::InvalidDuration(_))));

        let mut config = SimulationConfig::from_yaml(MUSEUM).unwrap();
        config.timer_horizon = Some(1.0e30);
        assert!(matches!(
            config.options(),
            Err(ConfigError::InvalidInterval {
                name: "timer_horizon",
                ..
            })
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            SimulationConfig::from_path("/definitely/not/here.yml"),
            Err(ConfigError::Io(_))
        ));
    }
}
