use crate::time::Duration;
use rand::RngCore;
use rand_distr::{Distribution, Exp};
use thiserror::Error;

/// The lower bound applied to every exponentially drawn service time.
pub const MIN_SERVICE_TIME: f64 = 1.0;

/// A mean that cannot parameterize a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("mean must be a positive, representable time span, found {0}")]
pub struct InvalidMean(pub f64);

///
/// An exponential distribution, parameterized by its mean.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exponential {
    mean: f64,
    distr: Exp<f64>,
}

impl Exponential {
    /// Creates a distribution with rate `1 / mean`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mean is not a positive finite number, or
    /// if it is not representable as a non-zero [`Duration`].
    pub fn new(mean: f64) -> Result<Self, InvalidMean> {
        if !(mean.is_finite() && mean > 0.0) {
            return Err(InvalidMean(mean));
        }
        if Duration::try_from_secs_f64(mean).map_or(true, |d| d.is_zero()) {
            return Err(InvalidMean(mean));
        }
        let distr = Exp::new(1.0 / mean).map_err(|_| InvalidMean(mean))?;
        Ok(Self { mean, distr })
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Draws a non-negative variate.
    pub fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.distr.sample(rng)
    }

    /// Draws a variate as a span of time, saturating at [`Duration::MAX`].
    pub fn sample_duration(&self, rng: &mut dyn RngCore, min: f64) -> Duration {
        Duration::try_from_secs_f64(self.sample(rng).max(min)).unwrap_or(Duration::MAX)
    }
}

///
/// The time a server needs to process one entity.
///
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceProfile {
    /// Exponentially distributed service times, floored at
    /// [`MIN_SERVICE_TIME`].
    Exponential(Exponential),
    /// A constant service time.
    Fixed(Duration),
}

impl ServiceProfile {
    /// Exponential service with the given mean.
    ///
    /// # Errors
    ///
    /// Returns an error if the mean is not a positive finite number.
    pub fn exponential(mean: f64) -> Result<Self, InvalidMean> {
        Exponential::new(mean).map(Self::Exponential)
    }

    /// The expected service time.
    #[must_use]
    pub fn mean(&self) -> f64 {
        match self {
            Self::Exponential(e) => e.mean(),
            Self::Fixed(d) => d.as_secs_f64(),
        }
    }

    /// Draws the duration of the next service.
    pub fn draw(&self, rng: &mut dyn RngCore) -> Duration {
        match self {
            Self::Exponential(e) => e.sample_duration(rng, MIN_SERVICE_TIME),
            Self::Fixed(d) => *d,
        }
    }
}
