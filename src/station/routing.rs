use super::StationId;
use rand::{Rng, RngCore};
use thiserror::Error;

/// The tolerance applied when checking that a routing table sums to one.
pub const PROBABILITY_EPSILON: f64 = 1e-6;

/// The destination name reserved for leaving the network.
pub const EXIT: &str = "exit";

/// Errors raised while validating a routing table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// The probabilities of a non-empty table do not sum to one.
    #[error("routing probabilities sum to {sum}, expected 1.0")]
    InvalidRoutingTable {
        /// The actual sum.
        sum: f64,
    },
    /// A destination carries a negative or non-finite probability.
    #[error("destination '{name}' has invalid probability {probability}")]
    InvalidProbability {
        /// The destinations name.
        name: String,
        /// The offending value.
        probability: f64,
    },
}

///
/// One entry of a routing table.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    name: String,
    probability: f64,
    target: Option<StationId>,
}

impl Destination {
    /// A destination pointing at another station. `None` as a
    /// target means leaving the network.
    pub fn new(name: impl Into<String>, probability: f64, target: Option<StationId>) -> Self {
        Self {
            name: name.into(),
            probability,
            target,
        }
    }

    /// A destination that leaves the network.
    #[must_use]
    pub fn exit(probability: f64) -> Self {
        Self::new(EXIT, probability, None)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    #[must_use]
    pub fn target(&self) -> Option<StationId> {
        self.target
    }

    #[must_use]
    pub fn is_exit(&self) -> bool {
        self.target.is_none()
    }
}

///
/// A validated probability distribution over a stations successors.
///
/// An empty table routes every entity out of the network.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingPolicy {
    destinations: Vec<Destination>,
}

impl RoutingPolicy {
    /// Validates and creates a routing table.
    ///
    /// # Errors
    ///
    /// Returns an error if a probability is negative, or if the
    /// probabilities of a non-empty table do not sum to `1.0` within
    /// [`PROBABILITY_EPSILON`].
    pub fn new(destinations: Vec<Destination>) -> Result<Self, RoutingError> {
        if let Some(d) = destinations
            .iter()
            .find(|d| !d.probability.is_finite() || d.probability < 0.0)
        {
            return Err(RoutingError::InvalidProbability {
                name: d.name.clone(),
                probability: d.probability,
            });
        }

        if !destinations.is_empty() {
            let sum = destinations.iter().map(|d| d.probability).sum::<f64>();
            if (sum - 1.0).abs() > PROBABILITY_EPSILON {
                return Err(RoutingError::InvalidRoutingTable { sum });
            }
        }

        Ok(Self { destinations })
    }

    /// A table without destinations, that is, every entity exits.
    #[must_use]
    pub fn exit_only() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Whether entities always leave the network after this station.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.destinations.iter().all(Destination::is_exit)
    }

    /// Draws a destination. Returns `None` only for an empty table.
    pub fn select(&self, rng: &mut dyn RngCore) -> Option<&Destination> {
        let u = rng.random::<f64>();
        let mut acc = 0.0;
        for d in &self.destinations {
            acc += d.probability;
            if u < acc {
                return Some(d);
            }
        }
        // rounding left a gap just below 1.0
        self.destinations.iter().rfind(|d| d.probability > 0.0)
    }

    /// Draws the next station. `None` means the entity leaves the network.
    pub fn next(&self, rng: &mut dyn RngCore) -> Option<StationId> {
        self.select(rng).and_then(Destination::target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn validation() {
        assert!(RoutingPolicy::new(vec![]).is_ok());
        assert!(RoutingPolicy::new(vec![
            Destination::new("a", 0.3, Some(StationId(1))),
            Destination::exit(0.7),
        ])
        .is_ok());

        // within tolerance
        assert!(RoutingPolicy::new(vec![
            Destination::new("a", 0.333_333_5, Some(StationId(1))),
            Destination::new("b", 0.333_333_5, Some(StationId(2))),
            Destination::new("c", 0.333_333, Some(StationId(3))),
        ])
        .is_ok());

        let err = RoutingPolicy::new(vec![
            Destination::new("a", 0.5, Some(StationId(1))),
            Destination::exit(0.4),
        ])
        .unwrap_err();
        assert!(
            matches!(err, RoutingError::InvalidRoutingTable { sum } if (sum - 0.9).abs() < 1e-9)
        );

        assert_eq!(
            RoutingPolicy::new(vec![
                Destination::new("a", 1.5, Some(StationId(1))),
                Destination::new("b", -0.5, Some(StationId(2))),
            ]),
            Err(RoutingError::InvalidProbability {
                name: "b".to_string(),
                probability: -0.5
            })
        );
    }

    #[test]
    fn empty_table_exits() {
        let policy = RoutingPolicy::exit_only();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(policy.is_terminal());
        for _ in 0..100 {
            assert_eq!(policy.next(&mut rng), None);
        }
    }

    #[test]
    fn zero_probability_destinations_are_never_chosen() {
        let policy = RoutingPolicy::new(vec![
            Destination::new("never", 0.0, Some(StationId(9))),
            Destination::new("always", 1.0, Some(StationId(1))),
        ])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            assert_eq!(policy.next(&mut rng), Some(StationId(1)));
        }
    }

    #[test]
    fn draws_follow_the_table() {
        let policy = RoutingPolicy::new(vec![
            Destination::new("left", 0.5, Some(StationId(1))),
            Destination::new("right", 0.3, Some(StationId(2))),
            Destination::exit(0.2),
        ])
        .unwrap();
        assert!(!policy.is_terminal());

        let mut rng = StdRng::seed_from_u64(0xfeed);
        let n = 20_000;
        let mut counts = [0usize; 3];
        for _ in 0..n {
            match policy.next(&mut rng) {
                Some(StationId(1)) => counts[0] += 1,
                Some(StationId(2)) => counts[1] += 1,
                None => counts[2] += 1,
                Some(other) => panic!("unexpected destination {other}"),
            }
        }

        let expected = [0.5, 0.3, 0.2];
        for (count, p) in counts.iter().zip(expected) {
            let freq = *count as f64 / f64::from(n);
            assert!((freq - p).abs() < 0.02, "{freq} vs {p}");
        }
    }
}
