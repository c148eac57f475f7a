use crate::time::{Duration, SimTime};
use serde::Serialize;
use std::{fmt::Display, sync::Arc};

/// A network-wide unique identifier of an [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityId(pub u64);

impl Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

///
/// The waiting period of an entity at one station it visited.
///
/// A record is opened when the entity is enqueued and closed when a
/// server picks the entity up, or when the simulation ends while the
/// entity is still queued.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    station: Arc<str>,
    start_wait: SimTime,
    end_wait: Option<SimTime>,
}

impl VisitRecord {
    /// The name of the visited station.
    #[must_use]
    pub fn station(&self) -> &str {
        &self.station
    }

    /// The time the entity was enqueued.
    #[must_use]
    pub fn start_wait(&self) -> SimTime {
        self.start_wait
    }

    /// The time the entity left the queue, if it did.
    #[must_use]
    pub fn end_wait(&self) -> Option<SimTime> {
        self.end_wait
    }

    /// Whether the waiting period has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.end_wait.is_some()
    }

    /// The time spent waiting, if the record is closed.
    #[must_use]
    pub fn wait_time(&self) -> Option<Duration> {
        self.end_wait.map(|end| end - self.start_wait)
    }
}

///
/// A token flowing through the network, e.g. a visitor or a product.
///
/// An entity carries an ordered visit log. Visiting the same station
/// twice produces two records.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    created: SimTime,
    visit_log: Vec<VisitRecord>,
}

impl Entity {
    /// Creates a new entity, that has not visited any station yet.
    #[must_use]
    pub fn new(id: EntityId, created: SimTime) -> Self {
        Self {
            id,
            created,
            visit_log: Vec::new(),
        }
    }

    /// The entities identifier.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The time the entity entered the simulation.
    #[must_use]
    pub fn created(&self) -> SimTime {
        self.created
    }

    /// All visits in order.
    #[must_use]
    pub fn visit_log(&self) -> &[VisitRecord] {
        &self.visit_log
    }

    /// Whether the entity was ever enqueued at the given station.
    #[must_use]
    pub fn has_visited(&self, station: &str) -> bool {
        self.visit_log.iter().any(|r| &*r.station == station)
    }

    /// The sum of all closed waiting periods.
    #[must_use]
    pub fn total_wait_time(&self) -> Duration {
        self.visit_log.iter().filter_map(VisitRecord::wait_time).sum()
    }

    pub(crate) fn begin_wait(&mut self, station: Arc<str>, at: SimTime) {
        self.visit_log.push(VisitRecord {
            station,
            start_wait: at,
            end_wait: None,
        });
    }

    /// Closes the latest open record of the given station and
    /// returns the time waited.
    ///
    /// # Panics
    ///
    /// Panics if the entity has no open record for the station, or if
    /// `at` lies before the start of the wait.
    pub(crate) fn end_wait(&mut self, station: &str, at: SimTime) -> Duration {
        let record = self
            .visit_log
            .iter_mut()
            .rev()
            .find(|r| &*r.station == station && r.end_wait.is_none())
            .expect("entity was enqueued without an open visit record");

        let wait = at.duration_since(record.start_wait);
        record.end_wait = Some(at);
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_records() {
        let reception: Arc<str> = Arc::from("reception");
        let mut e = Entity::new(EntityId(7), SimTime::ZERO);
        assert_eq!(e.id().to_string(), "#7");
        assert!(!e.has_visited("reception"));

        e.begin_wait(reception.clone(), SimTime::from(1.0));
        assert!(e.has_visited("reception"));
        assert!(!e.visit_log()[0].is_closed());
        assert_eq!(e.total_wait_time(), Duration::ZERO);

        let waited = e.end_wait("reception", SimTime::from(3.5));
        assert_eq!(waited, Duration::from_millis(2500));
        assert_eq!(e.visit_log()[0].wait_time(), Some(waited));
        assert!(e.visit_log()[0].end_wait().unwrap() >= e.visit_log()[0].start_wait());
    }

    #[test]
    fn revisits_append_records() {
        let room: Arc<str> = Arc::from("room");
        let mut e = Entity::new(EntityId(0), SimTime::ZERO);

        e.begin_wait(room.clone(), SimTime::from(1.0));
        e.end_wait("room", SimTime::from(2.0));
        e.begin_wait(room.clone(), SimTime::from(5.0));
        e.end_wait("room", SimTime::from(5.5));

        assert_eq!(e.visit_log().len(), 2);
        assert_eq!(e.visit_log()[1].start_wait(), SimTime::from(5.0));
        assert_eq!(e.total_wait_time(), Duration::from_millis(1500));
    }

    #[test]
    #[should_panic(expected = "open visit record")]
    fn closing_unknown_record_is_fatal() {
        let mut e = Entity::new(EntityId(0), SimTime::ZERO);
        e.end_wait("nowhere", SimTime::from(1.0));
    }
}
