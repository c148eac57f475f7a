use super::{Generator, GeneratorId, Network};
use crate::config::ConfigError;
use crate::station::{
    Destination, RoutingPolicy, ServiceProfile, Station, StationId, UtilizationMode, EXIT,
};
use crate::time::Duration;
use fxhash::FxHashMap;

/// The default period between two utilization samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

///
/// Network-wide settings, shared by all stations.
///
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkOptions {
    /// The delay after which idle and active timers elapse, if any.
    pub timer_horizon: Option<Duration>,
    /// The period between two samples of server usage and queue length.
    /// `None` disables sampling.
    pub sample_interval: Option<Duration>,
    /// The way stations compute utilization at teardown.
    pub utilization: UtilizationMode,
    /// Whether entities leaving the network are retained.
    pub keep_exited: bool,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            timer_horizon: None,
            sample_interval: Some(DEFAULT_SAMPLE_INTERVAL),
            utilization: UtilizationMode::default(),
            keep_exited: false,
        }
    }
}

///
/// The description of one station, with routing targets given by name.
///
#[derive(Debug, Clone)]
pub struct StationSpec {
    name: String,
    max_servers: usize,
    max_queue_size: usize,
    service: ServiceSpec,
    routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone)]
enum ServiceSpec {
    Exponential(f64),
    Fixed(Duration),
}

#[derive(Debug, Clone)]
struct RouteSpec {
    name: String,
    probability: f64,
    target: Option<String>,
}

impl StationSpec {
    /// A station with exponentially distributed service times.
    pub fn new(
        name: impl Into<String>,
        max_servers: usize,
        max_queue_size: usize,
        mean_service_time: f64,
    ) -> Self {
        Self {
            name: name.into(),
            max_servers,
            max_queue_size,
            service: ServiceSpec::Exponential(mean_service_time),
            routes: Vec::new(),
        }
    }

    /// Replaces the service distribution with a constant service time.
    #[must_use]
    pub fn fixed_service(mut self, duration: Duration) -> Self {
        self.service = ServiceSpec::Fixed(duration);
        self
    }

    /// Adds a destination. A target of `None` leaves the network.
    #[must_use]
    pub fn route(
        mut self,
        name: impl Into<String>,
        probability: f64,
        target: Option<&str>,
    ) -> Self {
        self.routes.push(RouteSpec {
            name: name.into(),
            probability,
            target: target.map(str::to_string),
        });
        self
    }

    /// Adds a destination to the station of the same name.
    #[must_use]
    pub fn to(self, station: &str, probability: f64) -> Self {
        self.route(station, probability, Some(station))
    }

    /// Adds the exit destination.
    #[must_use]
    pub fn exit(self, probability: f64) -> Self {
        self.route(EXIT, probability, None)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
struct GeneratorSpec {
    name: String,
    target: String,
    mean_interarrival_time: f64,
}

///
/// Assembles a [`Network`], resolving station names and validating
/// every station and routing table.
///
/// # Examples
///
/// ```
/// use qnet::network::{Network, StationSpec};
///
/// let network = Network::builder()
///     .station(StationSpec::new("reception", 2, 10, 3.0).to("hall", 1.0))
///     .station(StationSpec::new("hall", 4, 20, 5.0).exit(1.0))
///     .generator("visitors", "reception", 2.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(network.stations().len(), 2);
/// assert!(network.station_id("hall").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    stations: Vec<StationSpec>,
    generators: Vec<GeneratorSpec>,
    options: NetworkOptions,
}

impl NetworkBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a station. Stations are numbered in insertion order.
    #[must_use]
    pub fn station(mut self, spec: StationSpec) -> Self {
        self.stations.push(spec);
        self
    }

    /// Adds a generator feeding the named station.
    #[must_use]
    pub fn generator(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        mean_interarrival_time: f64,
    ) -> Self {
        self.generators.push(GeneratorSpec {
            name: name.into(),
            target: target.into(),
            mean_interarrival_time,
        });
        self
    }

    #[must_use]
    pub fn options(mut self, options: NetworkOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn timer_horizon(mut self, horizon: Duration) -> Self {
        self.options.timer_horizon = Some(horizon);
        self
    }

    #[must_use]
    pub fn sample_interval(mut self, interval: Option<Duration>) -> Self {
        self.options.sample_interval = interval;
        self
    }

    #[must_use]
    pub fn utilization(mut self, mode: UtilizationMode) -> Self {
        self.options.utilization = mode;
        self
    }

    #[must_use]
    pub fn keep_exited(mut self, keep: bool) -> Self {
        self.options.keep_exited = keep;
        self
    }

    /// Builds the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer horizon or the sample interval is
    /// zero, and an error naming the offending station or generator if a
    /// station has no servers, a mean is not positive, a name is defined
    /// twice, a route points to an unknown station or a routing table is
    /// invalid.
    pub fn build(self) -> Result<Network, ConfigError> {
        let intervals = [
            ("timer_horizon", self.options.timer_horizon),
            ("sample_interval", self.options.sample_interval),
        ];
        for (name, interval) in intervals {
            if interval.is_some_and(|d| d.is_zero()) {
                return Err(ConfigError::InvalidInterval { name, value: 0.0 });
            }
        }

        let mut registry = FxHashMap::default();
        for (i, spec) in self.stations.iter().enumerate() {
            if registry.insert(spec.name.clone(), StationId(i)).is_some() {
                return Err(ConfigError::DuplicateStation(spec.name.clone()));
            }
        }

        let resolve = |context: &str, name: &str| {
            registry
                .get(name)
                .copied()
                .ok_or_else(|| ConfigError::UnknownStation {
                    context: context.to_string(),
                    target: name.to_string(),
                })
        };

        let mut stations = Vec::with_capacity(self.stations.len());
        for (i, spec) in self.stations.into_iter().enumerate() {
            if spec.max_servers == 0 {
                return Err(ConfigError::NoServers {
                    station: spec.name,
                });
            }

            let service = match spec.service {
                ServiceSpec::Exponential(mean) => ServiceProfile::exponential(mean).map_err(
                    |source| ConfigError::InvalidServiceTime {
                        station: spec.name.clone(),
                        source,
                    },
                )?,
                ServiceSpec::Fixed(duration) => ServiceProfile::Fixed(duration),
            };

            let mut destinations = Vec::with_capacity(spec.routes.len());
            for route in spec.routes {
                let target = match route.target {
                    Some(target) => Some(resolve(&format!("station '{}'", spec.name), &target)?),
                    None => None,
                };
                destinations.push(Destination::new(route.name, route.probability, target));
            }
            let routing =
                RoutingPolicy::new(destinations).map_err(|source| ConfigError::Routing {
                    station: spec.name.clone(),
                    source,
                })?;

            let station = Station::new(
                StationId(i),
                spec.name,
                spec.max_servers,
                spec.max_queue_size,
                service,
                routing,
            )
            .with_timer_horizon(self.options.timer_horizon)
            .with_utilization_mode(self.options.utilization);
            stations.push(station);
        }

        let mut generators = Vec::with_capacity(self.generators.len());
        for (i, spec) in self.generators.into_iter().enumerate() {
            let target = resolve(&format!("generator '{}'", spec.name), &spec.target)?;
            let generator = Generator::new(
                GeneratorId(i),
                spec.name.clone(),
                target,
                spec.mean_interarrival_time,
            )
            .map_err(|source| ConfigError::InvalidInterarrivalTime {
                generator: spec.name,
                source,
            })?;
            generators.push(generator);
        }

        Ok(Network::new(stations, generators, registry, self.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::RoutingError;

    #[test]
    fn stations_are_numbered_in_order() {
        let network = NetworkBuilder::new()
            .station(StationSpec::new("a", 1, 1, 1.0).to("b", 1.0))
            .station(StationSpec::new("b", 1, 1, 1.0))
            .build()
            .unwrap();
        assert_eq!(network.station_id("a"), Some(StationId(0)));
        assert_eq!(network.station_id("b"), Some(StationId(1)));
        assert_eq!(
            network.station(StationId(0)).routing().next(&mut rand::rng()),
            Some(StationId(1))
        );
        assert!(network.station(StationId(1)).routing().is_terminal());
    }

    #[test]
    fn configuration_errors_name_the_culprit() {
        let err = NetworkBuilder::new()
            .station(StationSpec::new("a", 0, 1, 1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoServers { ref station } if station == "a"));

        let err = NetworkBuilder::new()
            .station(StationSpec::new("a", 1, 1, -2.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidServiceTime { .. }));
        assert!(err.to_string().contains("'a'"));

        let err = NetworkBuilder::new()
            .station(StationSpec::new("a", 1, 1, 1.0))
            .station(StationSpec::new("a", 1, 1, 1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateStation(ref name) if name == "a"));

        let err = NetworkBuilder::new()
            .station(StationSpec::new("a", 1, 1, 1.0).to("nowhere", 1.0))
            .build()
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::UnknownStation { ref target, .. } if target == "nowhere")
        );

        let err = NetworkBuilder::new()
            .station(StationSpec::new("a", 1, 1, 1.0).exit(0.5))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Routing {
                source: RoutingError::InvalidRoutingTable { .. },
                ..
            }
        ));

        let err = NetworkBuilder::new()
            .station(StationSpec::new("a", 1, 1, 1.0))
            .generator("g", "b", 1.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("generator 'g'"));

        let err = NetworkBuilder::new()
            .station(StationSpec::new("a", 1, 1, 1.0))
            .generator("g", "a", 0.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterarrivalTime { .. }));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let err = NetworkBuilder::new()
            .station(StationSpec::new("a", 1, 1, 1.0))
            .sample_interval(Some(Duration::ZERO))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidInterval {
                name: "sample_interval",
                ..
            }
        ));

        let err = NetworkBuilder::new()
            .station(StationSpec::new("a", 1, 1, 1.0))
            .timer_horizon(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidInterval {
                name: "timer_horizon",
                ..
            }
        ));

        assert!(NetworkBuilder::new()
            .station(StationSpec::new("a", 1, 1, 1.0))
            .sample_interval(None)
            .timer_horizon(Duration::from_nanos(1))
            .build()
            .is_ok());
    }
}
