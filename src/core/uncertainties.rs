//! Integration results with an uncorrelated uncertainty estimate.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::Add;

use super::{IntegrandValue, MAX_COMPONENTS};

/// A value together with its standard deviation, assuming no correlation with
/// any other deviation it is combined with.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct UncorrelatedDeviation<T> {
    /// The central value.
    pub value: T,
    /// The standard deviation, component-wise for complex values.
    pub uncertainty: T,
}

impl<T> UncorrelatedDeviation<T> {
    /// Constructor.
    pub const fn new(value: T, uncertainty: T) -> Self {
        Self { value, uncertainty }
    }
}

impl<T: IntegrandValue> Add for UncorrelatedDeviation<T> {
    type Output = Self;

    /// Adds the values and combines the uncertainties in quadrature,
    /// component by component.
    fn add(self, other: Self) -> Self {
        let mut combined = [0.0; MAX_COMPONENTS];
        for (index, entry) in combined.iter_mut().enumerate().take(T::COMPONENTS) {
            let lhs = self.uncertainty.component(index);
            let rhs = other.uncertainty.component(index);
            *entry = lhs.hypot(rhs);
        }
        Self {
            value: self.value + other.value,
            uncertainty: T::from_components(&combined[..T::COMPONENTS]),
        }
    }
}

impl<T: Display> Display for UncorrelatedDeviation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \u{b1} {}", self.value, self.uncertainty)
    }
}
