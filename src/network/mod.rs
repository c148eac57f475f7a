//!
//! Networks of stations, connected by routing tables and fed by
//! generators.
//!
//! A [`Network`] is an [`Application`]. It owns all stations in an
//! arena indexed by [`StationId`], a registry from station names to ids
//! and the generators. Served entities are routed by the serving
//! station's [`RoutingPolicy`](crate::station::RoutingPolicy). If the
//! chosen station is full the entity is lost: the upstream station
//! counts it as dropped, the downstream station as rejected.
//!

use crate::runtime::{Application, Event, EventLifecycle, EventSink, Runtime, RuntimeError};
use crate::station::{Entity, EntityId, Station, StationEvent, StationId};
use crate::stats::{StdDev, Statistic};
use crate::time::SimTime;
use fxhash::FxHashMap;

mod builder;
pub use self::builder::*;

mod generator;
pub use self::generator::*;

mod report;
pub use self::report::*;

///
/// The event set of a [`Network`].
///
#[derive(Debug)]
pub enum NetworkEvent {
    /// A generator produces its next entity.
    Arrival(GeneratorId),
    /// An externally created entity arrives at a station.
    Inject { station: StationId, entity: Entity },
    /// Samples server usage and queue length of all stations.
    Sample,
    /// An event addressed to a single station.
    Station(StationEvent),
}

impl From<StationEvent> for NetworkEvent {
    fn from(event: StationEvent) -> Self {
        Self::Station(event)
    }
}

///
/// A network of stations.
///
#[derive(Debug)]
pub struct Network {
    stations: Vec<Station>,
    generators: Vec<Generator>,
    registry: FxHashMap<String, StationId>,
    options: NetworkOptions,

    next_entity: u64,
    exited: u64,
    lost: u64,
    injected_overflow: u64,
    exit_wait: StdDev,
    exited_entities: Vec<Entity>,
}

impl Network {
    /// Starts assembling a network.
    #[must_use]
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    pub(crate) fn new(
        stations: Vec<Station>,
        generators: Vec<Generator>,
        registry: FxHashMap<String, StationId>,
        options: NetworkOptions,
    ) -> Self {
        Self {
            stations,
            generators,
            registry,
            options,
            next_entity: 0,
            exited: 0,
            lost: 0,
            injected_overflow: 0,
            exit_wait: StdDev::new(),
            exited_entities: Vec::new(),
        }
    }

    //
    // Lookup
    //

    /// All stations in definition order.
    #[must_use]
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// # Panics
    ///
    /// Panics if the id was not issued by this network.
    #[must_use]
    pub fn station(&self, id: StationId) -> &Station {
        &self.stations[id.0]
    }

    /// # Panics
    ///
    /// Panics if the id was not issued by this network.
    pub fn station_mut(&mut self, id: StationId) -> &mut Station {
        &mut self.stations[id.0]
    }

    /// Resolves a station name.
    #[must_use]
    pub fn station_id(&self, name: &str) -> Option<StationId> {
        self.registry.get(name).copied()
    }

    #[must_use]
    pub fn station_by_name(&self, name: &str) -> Option<&Station> {
        self.station_id(name).map(|id| self.station(id))
    }

    #[must_use]
    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    #[must_use]
    pub fn options(&self) -> &NetworkOptions {
        &self.options
    }

    //
    // End statistics
    //

    /// The number of entities that left through an exit.
    #[must_use]
    pub fn exited(&self) -> u64 {
        self.exited
    }

    /// The number of served entities lost to a full downstream queue.
    #[must_use]
    pub fn lost(&self) -> u64 {
        self.lost
    }

    /// The number of injected entities that found their station full.
    #[must_use]
    pub fn injected_overflow(&self) -> u64 {
        self.injected_overflow
    }

    /// The total wait times of exited entities.
    #[must_use]
    pub fn exit_wait(&self) -> &StdDev {
        &self.exit_wait
    }

    /// Exited entities, if retained.
    #[must_use]
    pub fn exited_entities(&self) -> &[Entity] {
        &self.exited_entities
    }

    /// Creates an entity with a fresh network-wide id.
    pub fn create_entity(&mut self, now: SimTime) -> Entity {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        Entity::new(id, now)
    }

    /// Summarizes the run.
    #[must_use]
    pub fn report(&self, end_time: SimTime, events: usize) -> Report {
        Report {
            end_time: f64::from(end_time),
            events,
            stations: self
                .stations
                .iter()
                .map(|s| s.stats().list_stats())
                .collect(),
            generators: self
                .generators
                .iter()
                .map(|g| GeneratorRow {
                    name: g.name().to_string(),
                    target: self.station(g.target()).name().to_string(),
                    generated: g.generated(),
                    overflow: g.overflow(),
                })
                .collect(),
            exited: self.exited,
            lost: self.lost,
            avg_exit_wait_time: self.exit_wait.mean(),
        }
    }

    //
    // Handlers
    //

    fn on_arrival<S>(&mut self, id: GeneratorId, sink: &mut S)
    where
        S: EventSink<NetworkEvent>,
    {
        let entity = self.create_entity(sink.now());
        let generator = &mut self.generators[id.0];
        let station = &mut self.stations[generator.target().0];
        tracing::trace!(generator = %generator.name(), entity = %entity.id(), "arrival");
        generator.arrive(entity, station, sink);
    }

    fn on_inject<S>(&mut self, id: StationId, entity: Entity, sink: &mut S)
    where
        S: EventSink<NetworkEvent>,
    {
        let station = &mut self.stations[id.0];
        if let Err(e) = station.add_entity::<NetworkEvent, S>(entity, sink) {
            self.injected_overflow += 1;
            tracing::warn!(station = %station.name(), "injected entity discarded: {e}");
        }
    }

    fn on_sample<S>(&mut self, sink: &mut S)
    where
        S: EventSink<NetworkEvent>,
    {
        let now = sink.now();
        for station in &mut self.stations {
            station.sample(now);
        }
        if let Some(interval) = self.options.sample_interval {
            sink.add(NetworkEvent::Sample, now.saturating_add(interval));
        }
    }

    fn on_station_event<S>(&mut self, event: StationEvent, sink: &mut S)
    where
        S: EventSink<NetworkEvent>,
    {
        let id = event.station();
        if let Some(entity) = self.stations[id.0].handle::<NetworkEvent, S>(event, sink) {
            self.route(id, entity, sink);
        }
    }

    /// Forwards a served entity to the next station drawn from the
    /// routing table of `from`.
    fn route<S>(&mut self, from: StationId, entity: Entity, sink: &mut S)
    where
        S: EventSink<NetworkEvent>,
    {
        let Some(to) = self.stations[from.0].routing().next(sink.rng()) else {
            self.exit(from, entity, sink.now());
            return;
        };

        tracing::trace!(
            entity = %entity.id(),
            from = %self.stations[from.0].name(),
            to = %self.stations[to.0].name(),
            "routing"
        );
        if let Err(e) = self.stations[to.0].add_entity::<NetworkEvent, S>(entity, sink) {
            self.lost += 1;
            self.stations[from.0].stats_mut().record_drop();
            tracing::warn!(
                from = %self.stations[from.0].name(),
                to = %self.stations[to.0].name(),
                "entity lost: {e}"
            );
        }
    }

    fn exit(&mut self, from: StationId, entity: Entity, now: SimTime) {
        self.exited += 1;
        self.stations[from.0].stats_mut().record_exit();
        self.exit_wait
            .collect_at(entity.total_wait_time().as_secs_f64(), now);
        tracing::trace!(
            entity = %entity.id(),
            station = %self.stations[from.0].name(),
            "entity left the network"
        );
        if self.options.keep_exited {
            self.exited_entities.push(entity);
        }
    }
}

impl Application for Network {
    type EventSet = NetworkEvent;
    type Lifecycle = Self;
}

impl EventLifecycle for Network {
    fn at_sim_start(rt: &mut Runtime<Self>) {
        let (network, mut sched) = rt.split();
        tracing::info!(
            stations = network.stations.len(),
            generators = network.generators.len(),
            "network starting"
        );

        for station in &mut network.stations {
            station.start::<NetworkEvent, _>(&mut sched);
        }
        for generator in &network.generators {
            generator.schedule_next(&mut sched);
        }
        if network.options.sample_interval.is_some() {
            let now = sched.now();
            sched.add(NetworkEvent::Sample, now);
        }
    }

    fn at_sim_end(rt: &mut Runtime<Self>) -> Result<(), RuntimeError> {
        let (network, mut sched) = rt.split();
        for station in &mut network.stations {
            station.stop::<NetworkEvent, _>(&mut sched);
        }
        tracing::info!(
            exited = network.exited,
            lost = network.lost,
            "network stopped"
        );
        Ok(())
    }
}

impl Event<Network> for NetworkEvent {
    fn handle(self, rt: &mut Runtime<Network>) {
        let (network, mut sched) = rt.split();
        match self {
            Self::Arrival(id) => network.on_arrival(id, &mut sched),
            Self::Inject { station, entity } => network.on_inject(station, entity, &mut sched),
            Self::Sample => network.on_sample(&mut sched),
            Self::Station(event) => network.on_station_event(event, &mut sched),
        }
    }
}
