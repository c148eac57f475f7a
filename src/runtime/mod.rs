//!
//! Central primitives for running a discrete event simulation.
//!
//! The whole simulation runs on one logical thread. Events are
//! dispatched strictly in `(time, scheduling order)`, and an event
//! handler runs to completion before the next event is fetched, so
//! handlers never observe another handler's state half-updated.
//!

use crate::time::{Duration, SimTime};
use rand::{distr::StandardUniform, prelude::Distribution, Rng, RngCore};
use std::{
    any::type_name,
    fmt::{Debug, Display},
    mem,
};

mod event;
pub use self::event::*;

mod limit;
pub use self::limit::*;

mod profiler;
pub use self::profiler::*;

mod builder;
pub use self::builder::*;

mod error;
pub use self::error::*;

///
/// The central managment point for a generic
/// instance of a discrete event based simulation.
///
/// - Create an 'App' struct that implements the trait [`Application`].
///   This struct will hold the systems state and define the event set used in the simulation.
/// - Create your events that handle the logic of you simulation. They must implement [`Event`] with the generic
///   parameter A, where A is your 'App' struct.
/// - Build the runtime with a [`Builder`] and [`run`](Runtime::run) it.
///
/// # Examples
///
/// ```
/// use qnet::prelude::*;
///
/// struct MyApp(Vec<SimTime>);
/// impl Application for MyApp {
///     type EventSet = MyEventSet;
///     type Lifecycle = Self;
/// }
/// impl EventLifecycle for MyApp {
///     fn at_sim_start(rt: &mut Runtime<Self>) {
///         rt.add_event(MyEventSet::Tick, SimTime::from(1.0));
///         rt.add_event(MyEventSet::Tick, SimTime::from(3.0));
///     }
/// }
///
/// enum MyEventSet {
///     Tick,
/// }
/// impl Event<MyApp> for MyEventSet {
///     fn handle(self, rt: &mut Runtime<MyApp>) {
///         let now = rt.sim_time();
///         rt.app.0.push(now);
///     }
/// }
///
/// let (app, time, profiler) = Builder::seeded(1).quiet().build(MyApp(Vec::new())).run().unwrap();
/// assert_eq!(time, SimTime::from(3.0));
/// assert_eq!(profiler.event_count, 2);
/// assert_eq!(app.0.len(), 2);
/// ```
pub struct Runtime<App>
where
    App: Application,
{
    /// The contained runtime application, defining globals and the used event set.
    pub app: App,

    state: State,
    now: SimTime,

    // Rt limits
    limit: RuntimeLimit,
    itr: usize,

    rng: Box<dyn RngCore>,

    // Misc
    quiet: bool,
    profiler: Profiler,

    future_event_set: FutureEventSet<App::EventSet>,
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    Ready,
    Running,
}

///
/// A split borrow of a [`Runtime`], that allows scheduling events
/// while the application is borrowed mutably.
///
/// See [`Runtime::split`].
///
pub struct Scheduler<'a, E> {
    now: SimTime,
    events: &'a mut FutureEventSet<E>,
    rng: &'a mut dyn RngCore,
}

impl<E> EventSink<E> for Scheduler<'_, E> {
    fn now(&self) -> SimTime {
        self.now
    }

    fn add(&mut self, event: E, time: SimTime) -> EventHandle {
        self.events.add(time, event)
    }

    fn cancel(&mut self, handle: EventHandle) -> bool {
        self.events.cancel(handle)
    }

    fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }
}

impl<E> Debug for Scheduler<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("enqueued", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl<A> Runtime<A>
where
    A: Application,
{
    ///
    /// Returns the number of events that were scheduled on this [`Runtime`] instance.
    ///
    #[inline]
    pub fn num_events_scheduled(&self) -> usize {
        self.future_event_set.num_scheduled()
    }

    ///
    /// Returns the number of events that were recieved & handled on this [`Runtime`] instance.
    ///
    pub fn num_events_dispatched(&self) -> usize {
        self.itr
    }

    ///
    /// Returns the number of events that are currently pending.
    ///
    pub fn num_events_pending(&self) -> usize {
        self.future_event_set.len()
    }

    ///
    /// Returns the current simulation time.
    ///
    pub fn sim_time(&self) -> SimTime {
        self.now
    }

    ///
    /// Returns the rng.
    ///
    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }

    ///
    /// Generates a random instance of type T with a Standard distribution.
    ///
    pub fn random<T>(&mut self) -> T
    where
        StandardUniform: Distribution<T>,
    {
        self.rng.random::<T>()
    }

    ///
    /// Generates a random instance of type T with a distribution
    /// of type D.
    ///
    pub fn rng_sample<T, D>(&mut self, distr: D) -> T
    where
        D: Distribution<T>,
    {
        self.rng.sample::<T, D>(distr)
    }

    ///
    /// Splits the runtime into the application and a [`Scheduler`]
    /// that can be used to schedule events while the application is
    /// borrowed.
    ///
    pub fn split(&mut self) -> (&mut A, Scheduler<'_, A::EventSet>) {
        (
            &mut self.app,
            Scheduler {
                now: self.now,
                events: &mut self.future_event_set,
                rng: &mut *self.rng,
            },
        )
    }
}

impl<A> Runtime<A>
where
    A: Application,
{
    /// Runs the application until it terminates or a breaking condition
    /// is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the application has determined that a simulation critical
    /// failure has occurred.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation was allready started.
    pub fn run(mut self) -> Result<(A, SimTime, Profiler), RuntimeError> {
        assert_eq!(
            self.state,
            State::Ready,
            "Runtime::run can only be used for simulations in the ready state"
        );
        // (0) Start sim-start
        self.start();

        // (1) Event main loop
        self.dispatch_all();

        // (2) Finish sim-end
        self.finish()
    }

    /// Starts the simulation manually. If `Runtime::run` is not used, use the combination
    /// of start, dispatch and finish to complete a full execution cycle.
    ///
    /// `start` must be called before any calls to the main loop.
    pub fn start(&mut self) {
        // (0) Publish sim-start message
        if !self.quiet {
            println!("\u{23A1}");
            println!("\u{23A2} Simulation starting");
            println!(
                "\u{23A2}  Executor := {}",
                self.future_event_set.descriptor()
            );
            println!("\u{23A2}  Event limit := {}", self.limit);
            println!("\u{23A3}");
        }

        // (1) Start profiler
        self.profiler.start();

        // (2) sim-starting on application object
        A::Lifecycle::at_sim_start(self);

        self.state = State::Running;
    }

    /// Executes the next n events in the runtime queue.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation has not been started.
    pub fn dispatch_n_events(&mut self, n: usize) {
        assert_eq!(
            self.state,
            State::Running,
            "dispatching is only allowed for running simulations"
        );

        let mut limit = RuntimeLimit::EventCount(self.num_events_dispatched() + n);
        mem::swap(&mut self.limit, &mut limit);
        self.dispatch_all();
        self.limit = limit;
    }

    /// Executes runtime events until the runtime reaches the designated time.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation has not been started.
    pub fn dispatch_events_until(&mut self, t: SimTime) {
        assert_eq!(
            self.state,
            State::Running,
            "dispatching is only allowed for running simulations"
        );

        let mut limit = RuntimeLimit::SimTime(t);
        mem::swap(&mut self.limit, &mut limit);
        self.dispatch_all();
        self.limit = limit;
    }

    /// Executes runtime events until the event set is empty or the limit
    /// is reached.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation has not been started.
    pub fn dispatch_all(&mut self) {
        assert_eq!(
            self.state,
            State::Running,
            "dispatching is only allowed for running simulations"
        );
        while !self.dispatch_event() {}
    }

    /// Decontructs the runtime and returns the application and the final `sim_time`.
    ///
    /// # Errors
    ///
    /// Returns an error if the application has determined that a simulation critical
    /// failure has occurred.
    ///
    /// # Panics
    ///
    /// This function panics if the runtime is has not yet been started.
    pub fn finish(mut self) -> Result<(A, SimTime, Profiler), RuntimeError> {
        assert_eq!(
            self.state,
            State::Running,
            "only a running simulation can be finished"
        );

        // Call the fin-handler on the allocated application
        A::Lifecycle::at_sim_end(&mut self)?;
        self.profiler.finish(self.itr);

        let time = self.sim_time();
        if !self.quiet {
            println!("\u{23A1}");
            if self.itr == 0 {
                println!("\u{23A2} Empty simulation");
                println!("\u{23A2}  Ended at event #0 after {time}");
            } else if self.future_event_set.is_empty() {
                println!("\u{23A2} Simulation ended");
                println!("\u{23A2}  Ended at event #{} after {}", self.itr, time);
            } else {
                println!("\u{23A2} Simulation ended prematurly");
                println!(
                    "\u{23A2}  Ended at event #{} with {} active events after {}",
                    self.itr,
                    self.future_event_set.len(),
                    time
                );
            }
            println!("\u{23A3}");
        }

        Ok((self.app, time, self.profiler))
    }

    /// Processes the next event in the future event list by calling its handler.
    /// Returns `true` if the simulation should stop.
    fn dispatch_event(&mut self) -> bool {
        let next = self.future_event_set.peek_time();
        let stop = match next {
            Some(time) => self.limit.applies(self.itr + 1, time),
            None => true,
        };

        if stop {
            // a time bound ends the run at its horizon, not at the last event
            if let Some(horizon) = self.limit.horizon() {
                if horizon > self.now && next.map_or(true, |time| horizon < time) {
                    self.now = horizon;
                }
            }
            return true;
        }

        let Some(node) = self.future_event_set.fetch_next() else {
            return true;
        };

        self.itr += 1;

        // Let this be the only position where the clock is changed
        // while events are dispatched
        self.now = node.time;

        let _guard = tracing::trace_span!("sim", t = %self.now).entered();
        node.event.handle(self);

        false
    }

    ///
    /// Adds and event to the future event heap, that will be handled in 'duration'
    /// time units.
    ///
    pub fn add_event_in(
        &mut self,
        event: impl Into<A::EventSet>,
        duration: impl Into<Duration>,
    ) -> EventHandle {
        self.add_event(event, self.sim_time() + duration.into())
    }

    ///
    /// Adds and event to the furtue event heap that will be handled at the given time.
    /// Note that this time must be in the future i.e. greated that `sim_time`, or this
    /// function will panic.
    ///
    pub fn add_event(&mut self, event: impl Into<A::EventSet>, time: SimTime) -> EventHandle {
        assert!(time >= self.now, "Sorry we cannot timetravel yet");
        self.future_event_set.add(time, event.into())
    }

    ///
    /// Cancels a pending event. Cancelled events are never dispatched
    /// and do not count towards the event limit.
    ///
    pub fn cancel_event(&mut self, handle: EventHandle) -> bool {
        self.future_event_set.cancel(handle)
    }
}

impl<A: Application> EventSink<A::EventSet> for Runtime<A> {
    fn now(&self) -> SimTime {
        self.now
    }

    fn add(&mut self, event: A::EventSet, time: SimTime) -> EventHandle {
        self.add_event(event, time)
    }

    fn cancel(&mut self, handle: EventHandle) -> bool {
        self.cancel_event(handle)
    }

    fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }
}

impl<A> Debug for Runtime<A>
where
    A: Application,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runtime<{}> {{ sim_time: {} (itr {} / {}) dispached: {} enqueued: {} }}",
            type_name::<A>(),
            self.sim_time(),
            self.num_events_dispatched(),
            self.limit,
            self.num_events_scheduled(),
            self.future_event_set.len()
        )
    }
}

impl<A> Display for Runtime<A>
where
    A: Application,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(SimTime, usize)>,
    }

    impl Application for Recorder {
        type EventSet = Tick;
        type Lifecycle = ();
    }

    struct Tick(usize);

    impl Event<Recorder> for Tick {
        fn handle(self, rt: &mut Runtime<Recorder>) {
            let now = rt.sim_time();
            rt.app.seen.push((now, self.0));
        }
    }

    #[test]
    fn equal_time_events_in_scheduling_order() {
        let mut rt = Builder::seeded(1).quiet().build(Recorder::default());
        rt.add_event(Tick(1), SimTime::from(1.0));
        rt.add_event(Tick(2), SimTime::from(1.0));
        rt.add_event(Tick(3), SimTime::from(0.5));

        let (app, time, profiler) = rt.run().unwrap();
        let order = app.seen.iter().map(|(_, id)| *id).collect::<Vec<_>>();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(time, SimTime::from(1.0));
        assert_eq!(profiler.event_count, 3);
    }

    #[test]
    fn cancelled_events_are_not_dispatched() {
        let mut rt = Builder::seeded(1).quiet().build(Recorder::default());
        rt.add_event(Tick(1), SimTime::from(1.0));
        let handle = rt.add_event(Tick(2), SimTime::from(2.0));
        assert!(rt.cancel_event(handle));

        let (app, time, profiler) = rt.run().unwrap();
        assert_eq!(app.seen, vec![(SimTime::from(1.0), 1)]);
        assert_eq!(time, SimTime::from(1.0));
        assert_eq!(profiler.event_count, 1);
    }

    #[test]
    fn time_limit_advances_clock_to_horizon() {
        let mut rt = Builder::seeded(1)
            .quiet()
            .max_time(SimTime::from(5.0))
            .build(Recorder::default());
        rt.add_event(Tick(1), SimTime::from(1.0));
        rt.add_event(Tick(2), SimTime::from(8.0));

        let (app, time, _) = rt.run().unwrap();
        assert_eq!(app.seen.len(), 1);
        assert_eq!(time, SimTime::from(5.0));
    }

    #[test]
    fn manual_stepping() {
        let mut rt = Builder::seeded(1).quiet().build(Recorder::default());
        for i in 0..5 {
            rt.add_event_in(Tick(i), Duration::from_secs(i as u64));
        }

        rt.start();
        rt.dispatch_n_events(2);
        assert_eq!(rt.num_events_dispatched(), 2);
        assert_eq!(rt.sim_time(), SimTime::from(1.0));

        rt.dispatch_events_until(SimTime::from(3.5));
        assert_eq!(rt.num_events_dispatched(), 4);
        assert_eq!(rt.sim_time(), SimTime::from(3.5));
        assert_eq!(rt.num_events_pending(), 1);

        let (app, _, _) = rt.finish().unwrap();
        assert_eq!(app.seen.len(), 4);
    }

    #[test]
    fn seeded_runtimes_are_reproducible() {
        let mut a = Builder::seeded(42).quiet().build(Recorder::default());
        let mut b = Builder::seeded(42).quiet().build(Recorder::default());
        let xs = (0..8).map(|_| a.random::<u64>()).collect::<Vec<_>>();
        let ys = (0..8).map(|_| b.random::<u64>()).collect::<Vec<_>>();
        assert_eq!(xs, ys);
    }
}
