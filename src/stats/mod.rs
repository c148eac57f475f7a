//!
//! A set of structs that help with the collection of statistical data.
//!
#![allow(clippy::cast_precision_loss)]

use crate::time::SimTime;

mod stddev;
pub use stddev::*;

///
/// A type that allows for statistical datacollection
/// inside a given runtime.
///
pub trait Statistic {
    ///
    /// The type of values that should be collected by
    /// this statistic.
    ///
    type Value;

    ///
    /// Collects  a datapoint at a given time with a given weight.
    /// This function is required since it is the core of the data collection.
    ///
    fn collect_weighted_at(&mut self, value: Self::Value, weight: f64, sim_time: SimTime);

    ///
    /// Collects a non-weighted (w=1) datapoint at a given time.
    ///
    fn collect_at(&mut self, value: Self::Value, sim_time: SimTime) {
        self.collect_weighted_at(value, 1.0, sim_time);
    }

    /// Indicates whether the statistical object has received any datapoints.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of datapoints used in the statistical object.
    fn len(&self) -> usize;

    /// Returns the sum of all datapoints.
    fn sum(&self) -> Self::Value;

    /// Returns the squared sum of all datapoints.
    fn sqrtsum(&self) -> Self::Value;

    /// Returns the smalles datapoint.
    fn min(&self) -> Self::Value;

    /// Returns the biggest datapoint.
    fn max(&self) -> Self::Value;

    /// Retuns the mean of all datapoints.
    fn mean(&self) -> Self::Value;

    /// Returns the standard derivation.
    fn std_derivation(&self) -> Self::Value;

    /// Returns the variance of all datapoints.
    fn variance(&self) -> Self::Value;
}
