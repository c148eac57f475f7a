//!
//! Queue-server stations.
//!
//! A [`Station`] couples a [`BoundedQueue`] with a [`ServerPool`]. Its
//! scheduling loop is driven by [`StationEvent`]s: whenever the loop
//! runs, it moves queued entities into free servers until either the
//! queue is empty or all servers are busy. Then the station suspends
//! as *idle* (no busy server) or *active*, arming a timer that either
//! elapses at the timer horizon or is interrupted by a relevant
//! arrival or service completion.
//!
//! All operations are generic over an [`EventSink`], so a station can
//! be embedded into any application whose event set can be built
//! from a [`StationEvent`].
//!

use crate::runtime::{EventHandle, EventSink};
use crate::time::{Duration, SimTime};
use std::{fmt::Display, mem, sync::Arc};

mod entity;
pub use self::entity::*;

mod queue;
pub use self::queue::*;

mod pool;
pub use self::pool::*;

mod service;
pub use self::service::*;

mod routing;
pub use self::routing::*;

mod stats;
pub use self::stats::*;

/// The index of a station within its network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StationId(pub usize);

impl Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "station#{}", self.0)
    }
}

///
/// The events a station schedules for itself.
///
#[derive(Debug)]
pub enum StationEvent {
    /// Runs the scheduling loop of a station, after it was interrupted.
    Wake(StationId),
    /// The idle or active timer of a station elapsed without interruption.
    TimerElapsed(StationId),
    /// A server finished processing an entity.
    ServiceComplete(Service),
}

impl StationEvent {
    /// The station this event is addressed to.
    #[must_use]
    pub fn station(&self) -> StationId {
        match self {
            Self::Wake(id) | Self::TimerElapsed(id) => *id,
            Self::ServiceComplete(service) => service.station,
        }
    }
}

///
/// An entity in service, together with the server it occupies.
///
#[derive(Debug)]
pub struct Service {
    station: StationId,
    entity: Entity,
    slot: ServerSlot,
    started: SimTime,
}

impl Service {
    #[must_use]
    pub fn station(&self) -> StationId {
        self.station
    }

    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// The time the service began.
    #[must_use]
    pub fn started(&self) -> SimTime {
        self.started
    }
}

///
/// The result of [`Station::request_server`].
///
#[derive(Debug)]
pub enum ScheduleResult {
    /// The front entity was dequeued and a server was reserved for it.
    Found { entity: Entity, slot: ServerSlot },
    /// Entities are waiting, but every server is busy.
    NoServer,
    /// The queue is empty.
    NoEntity,
}

/// The observable state of a stations scheduling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationState {
    /// Not yet started.
    Created,
    /// A wake-up is scheduled, the loop will run at the current instant.
    Pending,
    /// Suspended with no busy server.
    Idle,
    /// Suspended with at least one busy server.
    Active,
    /// Torn down, statistics are final.
    Stopped,
}

#[derive(Debug)]
enum LoopState {
    Created,
    Pending,
    Idle {
        since: SimTime,
        timer: Option<EventHandle>,
    },
    Active {
        since: SimTime,
        timer: Option<EventHandle>,
    },
    Stopped,
}

///
/// A queue-server station.
///
#[derive(Debug)]
pub struct Station {
    id: StationId,
    name: Arc<str>,

    queue: BoundedQueue,
    pool: ServerPool,
    service: ServiceProfile,
    routing: RoutingPolicy,

    stats: StationStatistics,
    utilization_mode: UtilizationMode,
    timer_horizon: Option<Duration>,

    state: LoopState,
    started_at: SimTime,
    last_arrival: SimTime,
}

impl Station {
    ///
    /// Creates a new station. Without a timer horizon, suspended stations
    /// only wake up on interruption.
    ///
    /// # Panics
    ///
    /// Panics if `max_servers` is zero.
    ///
    pub fn new(
        id: StationId,
        name: impl Into<Arc<str>>,
        max_servers: usize,
        max_queue_size: usize,
        service: ServiceProfile,
        routing: RoutingPolicy,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            stats: StationStatistics::new(name.clone()),
            name,
            queue: BoundedQueue::new(max_queue_size),
            pool: ServerPool::new(id, max_servers),
            service,
            routing,
            utilization_mode: UtilizationMode::default(),
            timer_horizon: None,
            state: LoopState::Created,
            started_at: SimTime::ZERO,
            last_arrival: SimTime::ZERO,
        }
    }

    /// Sets the delay after which idle and active timers elapse.
    #[must_use]
    pub fn with_timer_horizon(mut self, horizon: Option<Duration>) -> Self {
        self.timer_horizon = horizon;
        self
    }

    /// Sets the way utilization is computed at teardown.
    #[must_use]
    pub fn with_utilization_mode(mut self, mode: UtilizationMode) -> Self {
        self.utilization_mode = mode;
        self
    }

    //
    // Inspection
    //

    #[must_use]
    pub fn id(&self) -> StationId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> StationState {
        match self.state {
            LoopState::Created => StationState::Created,
            LoopState::Pending => StationState::Pending,
            LoopState::Idle { .. } => StationState::Idle,
            LoopState::Active { .. } => StationState::Active,
            LoopState::Stopped => StationState::Stopped,
        }
    }

    /// Whether the station is suspended with no busy server.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, LoopState::Idle { .. })
    }

    /// Whether the queue is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    /// The number of queued entities.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// The queued entities from front to back.
    pub fn queued(&self) -> impl Iterator<Item = &Entity> {
        self.queue.iter()
    }

    /// The number of busy servers.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.pool.in_use()
    }

    #[must_use]
    pub fn max_servers(&self) -> usize {
        self.pool.capacity()
    }

    #[must_use]
    pub fn max_queue_size(&self) -> usize {
        self.queue.capacity()
    }

    #[must_use]
    pub fn service(&self) -> &ServiceProfile {
        &self.service
    }

    #[must_use]
    pub fn routing(&self) -> &RoutingPolicy {
        &self.routing
    }

    #[must_use]
    pub fn stats(&self) -> &StationStatistics {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut StationStatistics {
        &mut self.stats
    }

    ///
    /// The occupied fraction of servers and of queue capacity, so that
    /// sorting stations ascending puts the least loaded one first.
    ///
    /// A zero capacity queue reports `0.0`.
    ///
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn availability(&self) -> (f64, f64) {
        let servers = self.pool.in_use() as f64 / self.pool.capacity() as f64;
        let queue = if self.queue.capacity() == 0 {
            0.0
        } else {
            self.queue.len() as f64 / self.queue.capacity() as f64
        };
        (servers, queue)
    }

    //
    // Lifecycle
    //

    /// Runs the scheduling loop for the first time.
    ///
    /// # Panics
    ///
    /// Panics if the station was already started.
    pub fn start<E, S>(&mut self, sink: &mut S)
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        assert!(
            matches!(self.state, LoopState::Created),
            "station '{}' was started twice",
            self.name
        );
        self.started_at = sink.now();
        self.last_arrival = sink.now();
        self.state = LoopState::Pending;
        self.run(sink);
    }

    ///
    /// Admits an entity into the queue, stamping the start of its wait.
    ///
    /// If the station is idle, or active with a free server, the current
    /// suspension is interrupted so that the entity is considered
    /// at the current instant.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] if the queue is at capacity and
    /// [`QueueError::Closed`] if the station was stopped. Queue and
    /// scheduling state stay untouched, the entity is handed back.
    ///
    pub fn add_entity<E, S>(&mut self, mut entity: Entity, sink: &mut S) -> Result<(), QueueError>
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        if matches!(self.state, LoopState::Stopped) {
            tracing::debug!(station = %self.name, entity = %entity.id(), "station stopped, entity rejected");
            return Err(QueueError::Closed {
                entity: Box::new(entity),
            });
        }

        let now = sink.now();
        if self.queue.is_full() {
            self.stats.record_rejection();
            tracing::debug!(station = %self.name, entity = %entity.id(), "queue full, entity rejected");
            return Err(QueueError::Full {
                capacity: self.queue.capacity(),
                entity: Box::new(entity),
            });
        }

        entity.begin_wait(self.name.clone(), now);
        tracing::trace!(station = %self.name, entity = %entity.id(), "entity enqueued");
        self.queue.enqueue(entity)?;

        self.stats
            .record_arrival(now.saturating_duration_since(self.last_arrival));
        self.last_arrival = now;

        let interrupt = match self.state {
            LoopState::Idle { .. } => true,
            LoopState::Active { .. } => self.pool.is_available(),
            _ => false,
        };
        if interrupt {
            self.interrupt(sink);
        }
        Ok(())
    }

    ///
    /// Dequeues the front entity and reserves a server for it.
    ///
    /// The returned slot must be handed back through a
    /// [`StationEvent::ServiceComplete`] or [`Station::release`].
    ///
    pub fn request_server(&mut self, now: SimTime) -> ScheduleResult {
        if self.queue.is_empty() {
            return ScheduleResult::NoEntity;
        }
        let Some(slot) = self.pool.try_acquire() else {
            return ScheduleResult::NoServer;
        };

        let mut entity = self
            .queue
            .dequeue()
            .expect("queue was checked to be non-empty");
        let wait = entity.end_wait(&self.name, now);
        self.stats.record_dequeue(wait);

        ScheduleResult::Found { entity, slot }
    }

    /// Frees a server obtained through [`Station::request_server`].
    pub fn release(&mut self, slot: ServerSlot) {
        self.pool.release(slot);
    }

    /// Handles a wake-up. Stale wake-ups are ignored.
    pub fn on_wake<E, S>(&mut self, sink: &mut S)
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        if matches!(self.state, LoopState::Pending) {
            self.run(sink);
        }
    }

    /// Handles an uninterrupted timer expiry.
    pub fn on_timer<E, S>(&mut self, sink: &mut S)
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        if !self.fold_suspension(sink) {
            return;
        }
        tracing::trace!(station = %self.name, "timer elapsed");
        self.state = LoopState::Pending;
        self.run(sink);
    }

    ///
    /// Finishes a service: records its duration, frees the server and
    /// returns the entity for routing.
    ///
    /// # Panics
    ///
    /// Panics if the service belongs to another station.
    ///
    pub fn complete_service<E, S>(&mut self, service: Service, sink: &mut S) -> Entity
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        let Service {
            station,
            entity,
            slot,
            started,
        } = service;
        assert_eq!(station, self.id, "service completed at a foreign station");

        let now = sink.now();
        self.stats.record_service(now - started);
        self.pool.release(slot);
        tracing::debug!(station = %self.name, entity = %entity.id(), "service completed");

        if matches!(self.state, LoopState::Active { .. }) {
            self.interrupt(sink);
        }
        entity
    }

    /// Handles any event addressed to this station. Returns the entity
    /// of a completed service.
    pub fn handle<E, S>(&mut self, event: StationEvent, sink: &mut S) -> Option<Entity>
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        match event {
            StationEvent::Wake(_) => self.on_wake(sink),
            StationEvent::TimerElapsed(_) => self.on_timer(sink),
            StationEvent::ServiceComplete(service) => {
                return Some(self.complete_service(service, sink))
            }
        }
        None
    }

    /// Records the current number of busy servers and queued entities.
    pub fn sample(&mut self, now: SimTime) {
        if !matches!(self.state, LoopState::Stopped) {
            self.stats.sample(self.pool.in_use(), self.queue.len(), now);
        }
    }

    ///
    /// Tears the station down: closes the current suspension, the
    /// waits of all still queued entities and computes the utilization.
    /// Calling `stop` again has no effect.
    ///
    pub fn stop<E, S>(&mut self, sink: &mut S)
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        if matches!(self.state, LoopState::Stopped) {
            return;
        }
        let now = sink.now();
        self.fold_suspension(sink);
        self.state = LoopState::Stopped;

        let name = self.name.clone();
        let remaining = self
            .queue
            .iter_mut()
            .map(|e| e.end_wait(&name, now))
            .collect::<Vec<_>>();

        let utilization = self.stats.compute_utilization(
            self.utilization_mode,
            self.pool.capacity(),
            self.service.mean(),
            now.saturating_duration_since(self.started_at),
        );
        self.stats.finalize(remaining, utilization);

        tracing::debug!(
            station = %self.name,
            served = self.stats.served_count(),
            queued = self.stats.in_queue_at_end(),
            "station stopped"
        );
    }

    //
    // Scheduling loop
    //

    fn run<E, S>(&mut self, sink: &mut S)
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        debug_assert!(matches!(self.state, LoopState::Pending));
        while let ScheduleResult::Found { entity, slot } = self.request_server(sink.now()) {
            self.begin_service(entity, slot, sink);
        }
        self.suspend(sink);
    }

    fn begin_service<E, S>(&mut self, entity: Entity, slot: ServerSlot, sink: &mut S)
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        let now = sink.now();
        let duration = self.service.draw(sink.rng());
        tracing::debug!(
            station = %self.name,
            entity = %entity.id(),
            ?duration,
            "service started"
        );
        let service = Service {
            station: self.id,
            entity,
            slot,
            started: now,
        };
        sink.add(
            StationEvent::ServiceComplete(service).into(),
            now.saturating_add(duration),
        );
    }

    fn suspend<E, S>(&mut self, sink: &mut S)
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        let since = sink.now();
        let timer = self.timer_horizon.map(|horizon| {
            sink.add(
                StationEvent::TimerElapsed(self.id).into(),
                since.saturating_add(horizon),
            )
        });
        self.state = if self.pool.is_active() {
            LoopState::Active { since, timer }
        } else {
            LoopState::Idle { since, timer }
        };
    }

    fn interrupt<E, S>(&mut self, sink: &mut S)
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        if !self.fold_suspension(sink) {
            return;
        }
        tracing::trace!(station = %self.name, "interrupted");
        self.state = LoopState::Pending;
        let now = sink.now();
        sink.add(StationEvent::Wake(self.id).into(), now);
    }

    /// Cancels the timer of an idle or active station and accounts the time
    /// spent suspended. Returns whether the station was suspended.
    fn fold_suspension<E, S>(&mut self, sink: &mut S) -> bool
    where
        S: EventSink<E>,
        E: From<StationEvent>,
    {
        let now = sink.now();
        match mem::replace(&mut self.state, LoopState::Pending) {
            LoopState::Idle { since, timer } => {
                if let Some(timer) = timer {
                    sink.cancel(timer);
                }
                self.stats.record_idle(now - since);
                true
            }
            LoopState::Active { since, timer } => {
                if let Some(timer) = timer {
                    sink.cancel(timer);
                }
                self.stats.record_active(now - since);
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }
}
