use std::time::{Duration, Instant, SystemTime};

/// A run profiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profiler {
    /// Whether the target is in release mode or not.
    pub target_is_release: bool,

    /// The time point where the simulation started.
    pub simulation_start: SystemTime,

    time_start: Instant,
    /// The real-time duration of the simulation.
    pub duration: Duration,

    /// The number of events that where executed.
    pub event_count: usize,
}

impl Profiler {
    /// Starts the profile.
    pub(super) fn start(&mut self) {
        self.simulation_start = SystemTime::now();
        self.time_start = Instant::now();
    }

    /// Finishes the profile.
    pub(super) fn finish(&mut self, event_count: usize) {
        self.event_count = event_count;
        self.duration = self.time_start.elapsed();
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self {
            target_is_release: !cfg!(debug_assertions),

            simulation_start: SystemTime::now(),
            time_start: Instant::now(),
            duration: Duration::ZERO,

            event_count: 0,
        }
    }
}
