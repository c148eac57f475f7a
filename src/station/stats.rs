#![allow(clippy::cast_precision_loss)]

use crate::stats::{StdDev, Statistic};
use crate::time::{Duration, SimTime};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, sync::Arc};

///
/// The way a station computes its utilization at teardown.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilizationMode {
    /// The time average of busy servers, taken from periodic samples,
    /// relative to the number of servers.
    #[default]
    Sampled,
    /// `arrival_rate * mean_service_time / max_servers`.
    Analytic,
}

///
/// Counters and accumulators of a single station.
///
/// All averages are derived on read, a station with no traffic
/// reports `0.0` instead of dividing by zero.
///
#[derive(Debug, Clone)]
pub struct StationStatistics {
    name: Arc<str>,

    total_idle_time: Duration,
    total_active_time: Duration,

    total_service_time: Duration,
    total_service_requests: u64,

    total_wait_time: Duration,
    served_count: u64,
    in_queue_at_end: usize,

    arrivals: u64,
    total_interarrival_time: Duration,
    rejected: u64,
    dropped: u64,
    exited: u64,

    server_usage: StdDev,
    queue_length: StdDev,

    utilization: f64,
    finalized: bool,
}

impl StationStatistics {
    pub(crate) fn new(name: Arc<str>) -> Self {
        Self {
            name,
            total_idle_time: Duration::ZERO,
            total_active_time: Duration::ZERO,
            total_service_time: Duration::ZERO,
            total_service_requests: 0,
            total_wait_time: Duration::ZERO,
            served_count: 0,
            in_queue_at_end: 0,
            arrivals: 0,
            total_interarrival_time: Duration::ZERO,
            rejected: 0,
            dropped: 0,
            exited: 0,
            server_usage: StdDev::new(),
            queue_length: StdDev::new(),
            utilization: 0.0,
            finalized: false,
        }
    }

    //
    // Recording
    //

    pub(crate) fn record_arrival(&mut self, since_last: Duration) {
        self.arrivals += 1;
        self.total_interarrival_time += since_last;
    }

    pub(crate) fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    pub(crate) fn record_dequeue(&mut self, wait: Duration) {
        self.served_count += 1;
        self.total_wait_time += wait;
    }

    pub(crate) fn record_service(&mut self, duration: Duration) {
        self.total_service_requests += 1;
        self.total_service_time += duration;
    }

    pub(crate) fn record_idle(&mut self, duration: Duration) {
        self.total_idle_time += duration;
    }

    pub(crate) fn record_active(&mut self, duration: Duration) {
        self.total_active_time += duration;
    }

    pub(crate) fn record_drop(&mut self) {
        self.dropped += 1;
    }

    pub(crate) fn record_exit(&mut self) {
        self.exited += 1;
    }

    pub(crate) fn sample(&mut self, in_use: usize, queue_len: usize, at: SimTime) {
        self.server_usage.collect_at(in_use as f64, at);
        self.queue_length.collect_at(queue_len as f64, at);
    }

    pub(crate) fn compute_utilization(
        &self,
        mode: UtilizationMode,
        servers: usize,
        mean_service_time: f64,
        elapsed: Duration,
    ) -> f64 {
        let servers = servers.max(1) as f64;
        match mode {
            UtilizationMode::Sampled => self.server_usage.mean() / servers * 100.0,
            UtilizationMode::Analytic => {
                let elapsed = elapsed.as_secs_f64();
                if elapsed == 0.0 {
                    return 0.0;
                }
                let arrival_rate = self.arrivals as f64 / elapsed;
                arrival_rate * mean_service_time / servers * 100.0
            }
        }
    }

    /// Folds the waits of entities still queued and fixes the utilization.
    /// Only the first call has an effect.
    pub(crate) fn finalize(
        &mut self,
        remaining_waits: impl IntoIterator<Item = Duration>,
        utilization: f64,
    ) {
        if self.finalized {
            return;
        }
        for wait in remaining_waits {
            self.in_queue_at_end += 1;
            self.total_wait_time += wait;
        }
        self.utilization = utilization;
        self.finalized = true;
    }

    //
    // Raw values
    //

    /// The name of the station.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time spent with no busy server.
    #[must_use]
    pub fn total_idle_time(&self) -> Duration {
        self.total_idle_time
    }

    /// Time spent with at least one busy server.
    #[must_use]
    pub fn total_active_time(&self) -> Duration {
        self.total_active_time
    }

    /// The sum of all completed service durations.
    #[must_use]
    pub fn total_service_time(&self) -> Duration {
        self.total_service_time
    }

    /// The number of completed services.
    #[must_use]
    pub fn total_service_requests(&self) -> u64 {
        self.total_service_requests
    }

    /// The sum of all waiting periods, including those of entities
    /// still queued at teardown.
    #[must_use]
    pub fn total_wait_time(&self) -> Duration {
        self.total_wait_time
    }

    /// The number of entities that left the queue to be served.
    #[must_use]
    pub fn served_count(&self) -> u64 {
        self.served_count
    }

    /// The number of entities queued when the simulation ended.
    #[must_use]
    pub fn in_queue_at_end(&self) -> usize {
        self.in_queue_at_end
    }

    /// The number of admitted arrivals.
    #[must_use]
    pub fn arrivals(&self) -> u64 {
        self.arrivals
    }

    /// The number of arrivals turned away by a full queue.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// The number of served entities lost because their next station
    /// was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// The number of served entities that left the network here.
    #[must_use]
    pub fn exited(&self) -> u64 {
        self.exited
    }

    /// The periodic samples of busy servers.
    #[must_use]
    pub fn server_usage(&self) -> &StdDev {
        &self.server_usage
    }

    /// The periodic samples of the queue length.
    #[must_use]
    pub fn queue_length(&self) -> &StdDev {
        &self.queue_length
    }

    /// Whether the statistics were closed at teardown.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    //
    // Derived values
    //

    /// `total_service_time / total_service_requests`
    #[must_use]
    pub fn avg_service_time(&self) -> f64 {
        ratio(self.total_service_time, self.total_service_requests as f64)
    }

    /// `total_wait_time / (served_count + in_queue_at_end)`
    #[must_use]
    pub fn avg_wait_time(&self) -> f64 {
        ratio(
            self.total_wait_time,
            (self.served_count + self.in_queue_at_end as u64) as f64,
        )
    }

    /// The mean time between two admitted arrivals.
    #[must_use]
    pub fn avg_interarrival_time(&self) -> f64 {
        ratio(self.total_interarrival_time, self.arrivals as f64)
    }

    /// The sampled mean of the queue length.
    #[must_use]
    pub fn avg_queue_length(&self) -> f64 {
        self.queue_length.mean()
    }

    /// The utilization in percent, fixed at teardown.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        self.utilization
    }

    /// The summary row of this station, values rounded to five decimals.
    #[must_use]
    pub fn list_stats(&self) -> StatsRow {
        StatsRow {
            name: self.name.to_string(),
            idle_time: round5(self.total_idle_time.as_secs_f64()),
            avg_service_time: round5(self.avg_service_time()),
            avg_wait_time: round5(self.avg_wait_time()),
            served_count: self.served_count,
            in_queue_at_end: self.in_queue_at_end,
            utilization: round5(self.utilization),
        }
    }
}

fn ratio(total: Duration, count: f64) -> f64 {
    if count == 0.0 {
        0.0
    } else {
        total.as_secs_f64() / count
    }
}

fn round5(value: f64) -> f64 {
    (value * 1e5).round() / 1e5
}

///
/// A flat summary of a stations statistics.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRow {
    pub name: String,
    pub idle_time: f64,
    pub avg_service_time: f64,
    pub avg_wait_time: f64,
    pub served_count: u64,
    pub in_queue_at_end: usize,
    pub utilization: f64,
}

impl Display for StatsRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<16} idle: {:>10.3} service: {:>8.3} wait: {:>8.3} served: {:>6} queued: {:>4} util: {:>6.2}%",
            self.name,
            self.idle_time,
            self.avg_service_time,
            self.avg_wait_time,
            self.served_count,
            self.in_queue_at_end,
            self.utilization
        )
    }
}
