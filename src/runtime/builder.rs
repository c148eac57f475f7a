use std::fmt::Debug;

use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::time::SimTime;

use super::{Application, FutureEventSet, Profiler, Runtime, RuntimeLimit, State};

/// A builder for a runtime instance.
#[must_use]
pub struct Builder {
    pub(super) quiet: bool,
    pub(super) rng: Box<dyn RngCore>,
    pub(super) limit: RuntimeLimit,
    pub(super) start_time: SimTime,
}

impl Builder {
    /// Creates a new unconfigured builder, with an OS-seeded RNG.
    pub fn new() -> Builder {
        Builder {
            quiet: false,
            rng: Box::new(StdRng::from_os_rng()),
            limit: RuntimeLimit::None,

            start_time: SimTime::MIN,
        }
    }

    /// Creates a `Builder` with a static seeded RNG.
    pub fn seeded(seed: u64) -> Builder {
        Builder {
            quiet: false,
            rng: Box::new(StdRng::seed_from_u64(seed)),
            limit: RuntimeLimit::None,

            start_time: SimTime::MIN,
        }
    }

    ///
    /// Suppressed runtime messages from the simulation framework.
    ///
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    ///
    /// Changes the start time of a runtime.
    ///
    pub fn start_time(mut self, time: SimTime) -> Self {
        self.start_time = time;
        self
    }

    ///
    /// Changes the maximum iteration number of a runtime.
    ///
    pub fn max_itr(mut self, max_itr: usize) -> Self {
        self.limit.add(RuntimeLimit::EventCount(max_itr));
        self
    }

    ///
    /// Changes the maximum time of the runtime (default: inf).
    ///
    pub fn max_time(mut self, max_time: SimTime) -> Self {
        self.limit.add(RuntimeLimit::SimTime(max_time));
        self
    }

    ///
    /// Adds a custom limit to the end of the runtime, combined
    /// with all `max_itr` and `max_time` options.
    ///
    pub fn limit(mut self, limit: RuntimeLimit) -> Self {
        self.limit.add(limit);
        self
    }

    ///
    /// Builds a new [`Runtime`] instance, using an application as core,
    /// and accepting events of type [`Event<A>`](crate::runtime::Event).
    ///
    pub fn build<A: Application>(self, app: A) -> Runtime<A> {
        Runtime {
            future_event_set: FutureEventSet::new(self.start_time),

            state: State::Ready,
            now: self.start_time,
            itr: 0,

            limit: self.limit,
            rng: self.rng,

            quiet: self.quiet,
            profiler: Profiler::default(),

            app,
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("quiet", &self.quiet)
            .field("limit", &self.limit)
            .field("start_time", &self.start_time)
            .finish_non_exhaustive()
    }
}
