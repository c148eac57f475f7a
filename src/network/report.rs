use super::GeneratorRow;
use crate::station::StatsRow;
use crate::time::SimTime;
use serde::Serialize;
use std::fmt::Display;

///
/// The results of a finished simulation run.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// The simulation time at teardown.
    pub end_time: f64,
    /// The number of dispatched events.
    pub events: usize,
    /// One row per station, in definition order.
    pub stations: Vec<StatsRow>,
    /// One row per generator, in definition order.
    pub generators: Vec<GeneratorRow>,
    /// Entities that left the network through an exit.
    pub exited: u64,
    /// Entities lost because a downstream queue was full.
    pub lost: u64,
    /// The mean total wait time of exited entities.
    pub avg_exit_wait_time: f64,
}

impl Report {
    /// The row of the named station.
    #[must_use]
    pub fn station(&self, name: &str) -> Option<&StatsRow> {
        self.stations.iter().find(|row| row.name == name)
    }

    /// The row of the named generator.
    #[must_use]
    pub fn generator(&self, name: &str) -> Option<&GeneratorRow> {
        self.generators.iter().find(|row| row.name == name)
    }

    /// The end time as a point on the simulated timeline.
    #[must_use]
    pub fn end(&self) -> SimTime {
        SimTime::from(self.end_time)
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Simulation ended at {} after {} events",
            self.end(),
            self.events
        )?;
        for row in &self.stations {
            writeln!(f, "  {row}")?;
        }
        for row in &self.generators {
            writeln!(
                f,
                "  {} -> {}: generated {} overflow {}",
                row.name, row.target, row.generated, row.overflow
            )?;
        }
        write!(
            f,
            "  exited: {} lost: {} avg wait of exited: {:.3}",
            self.exited, self.lost, self.avg_exit_wait_time
        )
    }
}
