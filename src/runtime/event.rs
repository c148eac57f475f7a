use crate::runtime::{Runtime, RuntimeError};
use crate::time::{Duration, SimTime};
use fxhash::FxHashSet;
use rand::RngCore;
use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
};

///
/// A trait that defines an runtime application
/// that depends on a event set to be processed by the
/// runtime and a lifecylce managment.
///
pub trait Application: Sized {
    ///
    /// The set of events used in the simulation.
    ///
    type EventSet: Event<Self>;
    ///
    /// A global type, defining the behavior at sim start / sim end
    ///
    type Lifecycle: EventLifecycle<Self>;
}

///
/// A type that can handle an event, specific to the given aplication,
/// and associated event set.
///
pub trait Event<App>
where
    App: Application,
{
    ///
    /// A function to handle an upcoming event represented as a specific
    /// instance of a event type.
    ///
    fn handle(self, runtime: &mut Runtime<App>);
}

///
/// A type that defines the lifecycle behaviour of an application A.
///
pub trait EventLifecycle<A = Self> {
    ///
    /// A function that is called only once at the start of the simulation.
    ///
    #[allow(unused_variables)]
    fn at_sim_start(runtime: &mut Runtime<A>)
    where
        A: Application,
    {
    }

    ///
    /// A function that is called once the simulation reachted its limit.
    ///
    /// # Errors
    ///
    /// This function may return an error, if some situation occured, that
    /// indicates an overall failure of the simulation. This error will be propagated
    /// to [`Runtime::run`].
    #[allow(unused_variables)]
    fn at_sim_end(runtime: &mut Runtime<A>) -> Result<(), RuntimeError>
    where
        A: Application,
    {
        Ok(())
    }
}

impl<A: Application> Event<A> for () {
    fn handle(self, _: &mut Runtime<A>) {}
}

impl<A> EventLifecycle<A> for () {}

///
/// A runtime unqiue identifier for a event.
///
pub(crate) type EventId = usize;

///
/// A handle to a scheduled event, that can be used to cancel
/// the event before it is dispatched.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle {
    id: EventId,
    time: SimTime,
}

impl EventHandle {
    /// The time the referenced event is scheduled for.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.time
    }
}

///
/// Something that accepts events of type `E` for future execution.
///
/// Event handlers usually require mutable access to the application
/// and the ability to schedule new events at the same time. Both
/// [`Runtime`] and the split-borrow [`Scheduler`](crate::runtime::Scheduler)
/// implement this trait, so simulation logic can be written once against it.
///
pub trait EventSink<E> {
    /// The current simulation time.
    fn now(&self) -> SimTime;

    /// Schedules an event at the given point in time. The time must
    /// not lie in the past.
    fn add(&mut self, event: E, time: SimTime) -> EventHandle;

    /// Schedules an event `delay` time units from now.
    fn add_in(&mut self, event: E, delay: Duration) -> EventHandle {
        let time = self.now() + delay;
        self.add(event, time)
    }

    /// Cancels a pending event. Returns whether the event was still pending.
    fn cancel(&mut self, handle: EventHandle) -> bool;

    /// The random number generator bound to the simulation.
    fn rng(&mut self) -> &mut dyn RngCore;
}

pub(crate) struct EventNode<E> {
    pub(crate) time: SimTime,
    pub(crate) id: EventId,
    pub(crate) event: E,
}

impl<E> PartialEq for EventNode<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<E> Eq for EventNode<E> {}

impl<E> PartialOrd for EventNode<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for EventNode<E> {
    // reversed, since BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        (other.time, other.id).cmp(&(self.time, self.id))
    }
}

/// Heaps smaller than this are never compacted.
const COMPACTION_THRESHOLD: usize = 64;

///
/// The future event set. Events are ordered by `(time, id)`, so
/// events with equal timestamps are dispatched in scheduling order.
///
pub(crate) struct FutureEventSet<E> {
    heap: BinaryHeap<EventNode<E>>,
    zero_queue: VecDeque<EventNode<E>>,

    pending: FxHashSet<EventId>,
    next_id: EventId,

    last_event_simtime: SimTime,
}

impl<E> FutureEventSet<E> {
    pub(crate) fn new(start_time: SimTime) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(64),
            zero_queue: VecDeque::with_capacity(32),

            pending: FxHashSet::default(),
            next_id: 0,

            last_event_simtime: start_time,
        }
    }

    pub(crate) fn descriptor(&self) -> String {
        "FutureEventSet::BinaryHeap()".to_string()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn num_scheduled(&self) -> usize {
        self.next_id
    }

    pub(crate) fn add(&mut self, time: SimTime, event: E) -> EventHandle {
        assert!(
            time >= self.last_event_simtime,
            "Sorry we cannot timetravel yet"
        );

        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id);

        let node = EventNode { time, id, event };
        if time == self.last_event_simtime {
            self.zero_queue.push_back(node);
        } else {
            self.heap.push(node);
        }

        EventHandle { id, time }
    }

    pub(crate) fn cancel(&mut self, handle: EventHandle) -> bool {
        let removed = self.pending.remove(&handle.id);
        if removed
            && self.heap.len() > COMPACTION_THRESHOLD
            && self.heap.len() > 2 * self.pending.len()
        {
            self.compact();
        }
        removed
    }

    /// Drops all cancelled nodes from the heap.
    fn compact(&mut self) {
        let pending = &self.pending;
        self.heap.retain(|node| pending.contains(&node.id));
    }

    /// Drops cancelled nodes from the front of both lanes.
    fn purge(&mut self) {
        while let Some(node) = self.zero_queue.front() {
            if self.pending.contains(&node.id) {
                break;
            }
            self.zero_queue.pop_front();
        }
        while let Some(node) = self.heap.peek() {
            if self.pending.contains(&node.id) {
                break;
            }
            self.heap.pop();
        }
    }

    fn zero_queue_first(&self) -> bool {
        match (self.zero_queue.front(), self.heap.peek()) {
            (Some(zero), Some(heap)) => (zero.time, zero.id) < (heap.time, heap.id),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub(crate) fn peek_time(&mut self) -> Option<SimTime> {
        self.purge();
        if self.zero_queue_first() {
            self.zero_queue.front().map(|n| n.time)
        } else {
            self.heap.peek().map(|n| n.time)
        }
    }

    pub(crate) fn fetch_next(&mut self) -> Option<EventNode<E>> {
        self.purge();
        let node = if self.zero_queue_first() {
            self.zero_queue.pop_front()
        } else {
            self.heap.pop()
        }?;

        self.pending.remove(&node.id);
        self.last_event_simtime = node.time;
        Some(node)
    }
}
