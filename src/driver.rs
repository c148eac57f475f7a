use crate::config::{ConfigError, SimulationConfig};
use crate::network::Report;
use crate::runtime::{Builder, RuntimeError};
use thiserror::Error;

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("simulation failed: {0}")]
    Runtime(RuntimeError),
}

///
/// A configured simulation run.
///
/// ```
/// use qnet::{config::SimulationConfig, Simulation};
///
/// let config = SimulationConfig::from_yaml("
/// duration: 20
/// seed: 1
/// generators:
///   - { name: arrivals, target: desk, mean_interarrival_time: 1.5 }
/// stations:
///   - { name: desk, max_servers: 1, max_queue_size: 5, mean_service_time: 2.0 }
/// ").unwrap();
///
/// let report = Simulation::new(config).quiet().run().unwrap();
/// assert_eq!(report.end_time, 20.0);
/// assert!(report.generators[0].generated > 0);
/// ```
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    quiet: bool,
}

impl Simulation {
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            quiet: false,
        }
    }

    /// Suppresses the runtime banners.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Builds the network, runs it for the configured duration and
    /// tears all stations down at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the runtime
    /// reports a failure.
    pub fn run(self) -> Result<Report, SimulationError> {
        let end = self.config.end_time()?;
        let network = self.config.network()?;

        let mut builder = match self.config.seed {
            Some(seed) => Builder::seeded(seed),
            None => Builder::new(),
        }
        .max_time(end);
        if self.quiet {
            builder = builder.quiet();
        }

        tracing::info!(duration = %end, seed = ?self.config.seed, "simulation starting");
        let (network, time, profiler) = builder
            .build(network)
            .run()
            .map_err(SimulationError::Runtime)?;
        tracing::info!(events = profiler.event_count, "simulation finished");

        Ok(network.report(time, profiler.event_count))
    }
}

/// Runs the simulation described by `config`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the runtime
/// reports a failure.
pub fn simulate(config: &SimulationConfig) -> Result<Report, SimulationError> {
    Simulation::new(config.clone()).quiet().run()
}
