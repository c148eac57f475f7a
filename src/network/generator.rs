use crate::runtime::EventSink;
use crate::station::{Entity, Exponential, InvalidMean, Station, StationId};
use crate::time::Duration;
use rand::RngCore;
use serde::Serialize;
use std::fmt::Display;

use super::NetworkEvent;

/// The index of a generator within its network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeneratorId(pub usize);

impl Display for GeneratorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "generator#{}", self.0)
    }
}

///
/// A Poisson arrival process feeding one entry station.
///
/// Arrivals that find the entry queue full are counted as overflow
/// and discarded.
///
#[derive(Debug, Clone)]
pub struct Generator {
    id: GeneratorId,
    name: String,
    target: StationId,
    interarrival: Exponential,

    generated: u64,
    overflow: u64,
}

impl Generator {
    /// Creates a generator with exponentially distributed inter-arrival
    /// times.
    ///
    /// # Errors
    ///
    /// Returns an error if the mean is not a positive finite number.
    pub fn new(
        id: GeneratorId,
        name: impl Into<String>,
        target: StationId,
        mean_interarrival_time: f64,
    ) -> Result<Self, InvalidMean> {
        Ok(Self {
            id,
            name: name.into(),
            target,
            interarrival: Exponential::new(mean_interarrival_time)?,
            generated: 0,
            overflow: 0,
        })
    }

    #[must_use]
    pub fn id(&self) -> GeneratorId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entry station.
    #[must_use]
    pub fn target(&self) -> StationId {
        self.target
    }

    #[must_use]
    pub fn mean_interarrival_time(&self) -> f64 {
        self.interarrival.mean()
    }

    /// The number of entities created.
    #[must_use]
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// The number of entities discarded because the entry queue was full.
    #[must_use]
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Draws the delay until the next arrival.
    pub fn next_interarrival(&self, rng: &mut dyn RngCore) -> Duration {
        self.interarrival.sample_duration(rng, 0.0)
    }

    pub(crate) fn schedule_next<S>(&self, sink: &mut S)
    where
        S: EventSink<NetworkEvent>,
    {
        let delay = self.next_interarrival(sink.rng());
        let time = sink.now().saturating_add(delay);
        sink.add(NetworkEvent::Arrival(self.id), time);
    }

    /// Offers a new entity to the entry station, then schedules the
    /// next arrival.
    pub(crate) fn arrive<S>(&mut self, entity: Entity, station: &mut Station, sink: &mut S)
    where
        S: EventSink<NetworkEvent>,
    {
        self.generated += 1;
        if let Err(e) = station.add_entity::<NetworkEvent, S>(entity, sink) {
            self.overflow += 1;
            tracing::debug!(
                generator = %self.name,
                station = %station.name(),
                "arrival discarded: {e}"
            );
        }
        self.schedule_next(sink);
    }
}

///
/// A flat summary of a generators counters.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratorRow {
    pub name: String,
    pub target: String,
    pub generated: u64,
    pub overflow: u64,
}
