//! Streaming estimators for the sampling integrators.

use std::marker::PhantomData;

use super::uncertainties::UncorrelatedDeviation;
use super::{IntegrandValue, MAX_COMPONENTS};

/// Streaming accumulator for the mean and its standard error.
///
/// Sums and sums of squares are tracked per component, so a complex sample
/// stream yields independent uncertainties for the real and imaginary parts.
/// Non-finite samples are counted but excluded from the sums.
#[derive(Clone, Debug)]
pub struct Accumulator<T> {
    sum: [f64; MAX_COMPONENTS],
    sumsq: [f64; MAX_COMPONENTS],
    calls: usize,
    non_finite_calls: usize,
    non_zero_calls: usize,
    _marker: PhantomData<T>,
}

impl<T: IntegrandValue> Default for Accumulator<T> {
    fn default() -> Self {
        Self {
            sum: [0.0; MAX_COMPONENTS],
            sumsq: [0.0; MAX_COMPONENTS],
            calls: 0,
            non_finite_calls: 0,
            non_zero_calls: 0,
            _marker: PhantomData,
        }
    }
}

impl<T: IntegrandValue> Accumulator<T> {
    /// Records one sample.
    pub fn update(&mut self, value: T) {
        self.calls += 1;

        if value != T::zero() {
            self.non_zero_calls += 1;

            if value.is_finite() {
                for index in 0..T::COMPONENTS {
                    let component = value.component(index);
                    self.sum[index] += component;
                    self.sumsq[index] += component * component;
                }
            } else {
                self.non_finite_calls += 1;
            }
        }
    }

    /// Merges the samples of `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        for index in 0..MAX_COMPONENTS {
            self.sum[index] += other.sum[index];
            self.sumsq[index] += other.sumsq[index];
        }
        self.calls += other.calls;
        self.non_finite_calls += other.non_finite_calls;
        self.non_zero_calls += other.non_zero_calls;
    }

    /// Returns the sample mean.
    pub fn mean(&self) -> T {
        let calls = self.calls as f64;
        let mut components = [0.0; MAX_COMPONENTS];
        for (index, entry) in components.iter_mut().enumerate().take(T::COMPONENTS) {
            *entry = self.sum[index] / calls;
        }
        T::from_components(&components[..T::COMPONENTS])
    }

    /// Returns the mean together with the standard error of the mean,
    /// $\sigma = \sqrt{ ( \sum x^2 - ( \sum x )^2 / N ) / N / (N - 1) }$.
    pub fn estimate(&self) -> UncorrelatedDeviation<T> {
        let calls = self.calls as f64;
        let mut uncertainty = [0.0; MAX_COMPONENTS];
        for (index, entry) in uncertainty.iter_mut().enumerate().take(T::COMPONENTS) {
            let sum = self.sum[index];
            let var = (self.sumsq[index] - sum * sum / calls) / calls / (calls - 1.0);
            *entry = var.max(0.0).sqrt();
        }
        UncorrelatedDeviation::new(
            self.mean(),
            T::from_components(&uncertainty[..T::COMPONENTS]),
        )
    }

    /// Returns the number of times $N$ a sample was recorded.
    pub const fn calls(&self) -> usize {
        self.calls
    }

    /// Returns how many recorded samples were non-finite.
    pub const fn non_finite_calls(&self) -> usize {
        self.non_finite_calls
    }

    /// Returns how many recorded samples were non-zero.
    pub const fn non_zero_calls(&self) -> usize {
        self.non_zero_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use num_complex::Complex64;

    #[test]
    fn mean_and_error_of_small_sample() {
        let mut acc = Accumulator::<f64>::default();
        for value in &[1.0, 2.0, 3.0, 4.0] {
            acc.update(*value);
        }

        let estimate = acc.estimate();
        assert_eq!(acc.calls(), 4);
        assert_eq!(acc.non_zero_calls(), 4);
        assert_eq!(acc.non_finite_calls(), 0);
        assert_approx_eq!(estimate.value, 2.5, 1e-15);
        // sample variance 5/3, standard error sqrt(5/12)
        assert_approx_eq!(estimate.uncertainty, (5.0_f64 / 12.0).sqrt(), 1e-15);
    }

    #[test]
    fn non_finite_samples_are_filtered() {
        let mut acc = Accumulator::<f64>::default();
        acc.update(1.0);
        acc.update(f64::INFINITY);
        acc.update(3.0);
        acc.update(0.0);

        assert_eq!(acc.calls(), 4);
        assert_eq!(acc.non_zero_calls(), 3);
        assert_eq!(acc.non_finite_calls(), 1);
    }

    #[test]
    fn complex_components_accumulate_independently() {
        let mut acc = Accumulator::<Complex64>::default();
        acc.update(Complex64::new(1.0, -2.0));
        acc.update(Complex64::new(3.0, 2.0));

        let mean = acc.mean();
        assert_approx_eq!(mean.re, 2.0, 1e-15);
        assert_approx_eq!(mean.im, 0.0, 1e-15);
    }

    #[test]
    fn merge_matches_sequential_updates() {
        let samples = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5];

        let mut sequential = Accumulator::<f64>::default();
        for value in &samples {
            sequential.update(*value);
        }

        let mut left = Accumulator::<f64>::default();
        let mut right = Accumulator::<f64>::default();
        for value in &samples[..3] {
            left.update(*value);
        }
        for value in &samples[3..] {
            right.update(*value);
        }
        left.merge(&right);

        assert_eq!(left.calls(), sequential.calls());
        assert_eq!(left.estimate().value, sequential.estimate().value);
        assert_eq!(left.estimate().uncertainty, sequential.estimate().uncertainty);
    }
}
