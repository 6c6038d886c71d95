//! Weighted integrals and the sum algebra over them.

use num_complex::Complex64;
use std::ops::{Add, AddAssign, Mul, MulAssign};
use std::sync::Arc;

use super::integral::SharedIntegral;
use crate::core::IntegrandValue;

/// An integral scaled by a coefficient.
#[derive(Clone)]
pub struct WeightedIntegral<T> {
    /// The shared integral.
    pub integral: SharedIntegral<T>,
    /// The coefficient the integral result is multiplied by.
    pub coefficient: T,
}

impl<T: IntegrandValue> WeightedIntegral<T> {
    /// Constructor.
    pub fn new(integral: SharedIntegral<T>, coefficient: T) -> Self {
        Self {
            integral,
            coefficient,
        }
    }
}

/// A linear combination of shared integrals.
///
/// Adding sums merges summands referring to the *same* shared integral by
/// adding their coefficients, so an integral appears at most once and is
/// integrated once no matter how many terms it entered through.
#[derive(Clone, Default)]
pub struct WeightedSum<T> {
    summands: Vec<WeightedIntegral<T>>,
}

impl<T: IntegrandValue> WeightedSum<T> {
    /// The sum with no summands.
    pub fn new() -> Self {
        Self { summands: vec![] }
    }

    /// The sum with a single summand.
    pub fn from_integral(integral: SharedIntegral<T>, coefficient: T) -> Self {
        Self {
            summands: vec![WeightedIntegral::new(integral, coefficient)],
        }
    }

    /// The summands of this sum.
    pub fn summands(&self) -> &[WeightedIntegral<T>] {
        &self.summands
    }

    /// The number of distinct integrals in this sum.
    pub fn len(&self) -> usize {
        self.summands.len()
    }

    /// Returns `true` if the sum has no summands.
    pub fn is_empty(&self) -> bool {
        self.summands.is_empty()
    }

    fn merge(&mut self, summand: WeightedIntegral<T>) {
        for existing in &mut self.summands {
            if Arc::ptr_eq(&existing.integral, &summand.integral) {
                existing.coefficient += summand.coefficient;
                return;
            }
        }
        self.summands.push(summand);
    }
}

impl<T: IntegrandValue> From<WeightedIntegral<T>> for WeightedSum<T> {
    fn from(summand: WeightedIntegral<T>) -> Self {
        Self {
            summands: vec![summand],
        }
    }
}

impl<T: IntegrandValue> AddAssign for WeightedSum<T> {
    fn add_assign(&mut self, other: Self) {
        for summand in other.summands {
            self.merge(summand);
        }
    }
}

impl<T: IntegrandValue> Add for WeightedSum<T> {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl<T: IntegrandValue> MulAssign<T> for WeightedSum<T> {
    fn mul_assign(&mut self, factor: T) {
        for summand in &mut self.summands {
            summand.coefficient = summand.coefficient * factor;
        }
    }
}

impl<T: IntegrandValue> Mul<T> for WeightedSum<T> {
    type Output = Self;

    fn mul(mut self, factor: T) -> Self {
        self *= factor;
        self
    }
}

impl Mul<WeightedSum<f64>> for f64 {
    type Output = WeightedSum<f64>;

    fn mul(self, sum: WeightedSum<f64>) -> WeightedSum<f64> {
        sum * self
    }
}

impl Mul<WeightedSum<Complex64>> for Complex64 {
    type Output = WeightedSum<Complex64>;

    fn mul(self, sum: WeightedSum<Complex64>) -> WeightedSum<Complex64> {
        sum * self
    }
}
