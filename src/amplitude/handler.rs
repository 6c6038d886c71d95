//! The adaptive refinement loop over weighted sums of integrals.

use crossbeam as cb;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::integral::SharedIntegral;
use super::sum::WeightedSum;
use crate::callbacks::{Callback, SinkCallback};
use crate::core::{Error, IntegrandValue, UncorrelatedDeviation, MAX_COMPONENTS};
use crate::series::Series;

/// The per-sum accuracy and budget settings.
///
/// `min_epsrel`/`min_epsabs` are the loosest tolerances a sum may be clamped
/// to, `max_epsrel`/`max_epsabs` the tightest.
#[derive(Clone, Copy, Debug)]
pub struct EvaluationOptions {
    /// Requested relative accuracy.
    pub epsrel: f64,
    /// Requested absolute accuracy.
    pub epsabs: f64,
    /// Budget ceiling per integral.
    pub maxeval: u64,
    /// Budget every integral starts with.
    pub mineval: u64,
    /// The largest factor a budget may grow by in one round.
    pub maxincreasefac: f64,
    /// Loosest admissible relative accuracy.
    pub min_epsrel: f64,
    /// Loosest admissible absolute accuracy.
    pub min_epsabs: f64,
    /// Tightest admissible relative accuracy.
    pub max_epsrel: f64,
    /// Tightest admissible absolute accuracy.
    pub max_epsabs: f64,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            epsrel: 1e-2,
            epsabs: 1e-7,
            maxeval: 1_000_000,
            mineval: 50_000,
            maxincreasefac: 20.0,
            min_epsrel: 0.2,
            min_epsabs: 1e-4,
            max_epsrel: 1e-14,
            max_epsabs: 1e-20,
        }
    }
}

impl EvaluationOptions {
    fn validate(&self) -> Result<(), Error> {
        if self.epsrel < 0.0 || self.epsabs < 0.0 {
            return Err(Error::InvalidTolerance(
                "epsrel and epsabs must be non-negative".to_string(),
            ));
        }
        if self.epsrel == 0.0 && self.epsabs == 0.0 {
            return Err(Error::InvalidTolerance(
                "at least one of epsrel and epsabs must be positive".to_string(),
            ));
        }
        if self.maxincreasefac < 1.0 {
            return Err(Error::InvalidTolerance(
                "maxincreasefac must be at least one".to_string(),
            ));
        }
        if self.max_epsrel > self.min_epsrel || self.max_epsabs > self.min_epsabs {
            return Err(Error::InvalidTolerance(
                "the tightest tolerances must not exceed the loosest ones".to_string(),
            ));
        }
        if self.mineval > self.maxeval {
            return Err(Error::InvalidTolerance(
                "mineval must not exceed maxeval".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a sum stands in the refinement loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SumStatus {
    /// No result yet.
    Uncomputed,
    /// A result exists but the tolerances are not met.
    PartiallyConverged,
    /// The tolerances are met.
    Converged,
    /// A constituent integral failed; the result is best-effort.
    Failed,
}

/// A weighted sum under refinement, together with its individual accuracy
/// settings. The settings are public so single sums can be tuned after
/// construction.
pub struct Sum<T> {
    summands: WeightedSum<T>,
    /// Requested relative accuracy.
    pub epsrel: f64,
    /// Requested absolute accuracy.
    pub epsabs: f64,
    /// Budget ceiling per integral.
    pub maxeval: u64,
    /// Budget every integral starts with.
    pub mineval: u64,
    /// The largest factor a budget may grow by in one round.
    pub maxincreasefac: f64,
    /// Loosest admissible relative accuracy.
    pub min_epsrel: f64,
    /// Loosest admissible absolute accuracy.
    pub min_epsabs: f64,
    /// Tightest admissible relative accuracy.
    pub max_epsrel: f64,
    /// Tightest admissible absolute accuracy.
    pub max_epsabs: f64,
    status: SumStatus,
    result: Option<UncorrelatedDeviation<T>>,
    failure: Option<Error>,
}

impl<T: IntegrandValue> Sum<T> {
    /// Binds a weighted sum to accuracy settings.
    pub fn new(summands: WeightedSum<T>, options: &EvaluationOptions) -> Self {
        Self {
            summands,
            epsrel: options.epsrel,
            epsabs: options.epsabs,
            maxeval: options.maxeval,
            mineval: options.mineval,
            maxincreasefac: options.maxincreasefac,
            min_epsrel: options.min_epsrel,
            min_epsabs: options.min_epsabs,
            max_epsrel: options.max_epsrel,
            max_epsabs: options.max_epsabs,
            status: SumStatus::Uncomputed,
            result: None,
            failure: None,
        }
    }

    /// The summands of this sum.
    pub fn summands(&self) -> &WeightedSum<T> {
        &self.summands
    }

    /// The current refinement status.
    pub const fn status(&self) -> SumStatus {
        self.status
    }

    /// The most recent combined result.
    pub fn result(&self) -> Option<UncorrelatedDeviation<T>> {
        self.result
    }

    /// The error that failed this sum, if any.
    pub fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// The accuracy goal for a combined value of the given modulus.
    fn tolerance(&self, value_modulus: f64) -> f64 {
        let epsrel = self.epsrel.clamp(self.max_epsrel, self.min_epsrel);
        let epsabs = self.epsabs.clamp(self.max_epsabs, self.min_epsabs);
        (epsrel * value_modulus).max(epsabs)
    }

    /// Combines the cached integral results into a sum result and updates the
    /// convergence status. Leaves the sum untouched while any constituent is
    /// still uncomputed.
    fn combine(&mut self) {
        let mut value = T::zero();
        let mut variance = [0.0; MAX_COMPONENTS];

        for summand in self.summands.summands() {
            let result = match summand.integral.lock().unwrap().get_integral_result() {
                Ok(result) => result,
                Err(_) => return,
            };

            value += summand.coefficient * result.value;
            let weight = summand.coefficient.modulus();
            for (component, entry) in variance.iter_mut().enumerate().take(T::COMPONENTS) {
                let scaled = weight * result.uncertainty.component(component);
                *entry += scaled * scaled;
            }
        }

        let mut uncertainty = [0.0; MAX_COMPONENTS];
        for (component, entry) in uncertainty.iter_mut().enumerate().take(T::COMPONENTS) {
            *entry = variance[component].sqrt();
        }
        let uncertainty = T::from_components(&uncertainty[..T::COMPONENTS]);

        self.result = Some(UncorrelatedDeviation::new(value, uncertainty));

        if self.status != SumStatus::Failed {
            let tolerance = self.tolerance(value.modulus());
            let converged = (0..T::COMPONENTS)
                .all(|component| uncertainty.component(component) <= tolerance);
            self.status = if converged {
                SumStatus::Converged
            } else {
                SumStatus::PartiallyConverged
            };
        }
    }

    /// Requests larger budgets for the constituents of an unconverged sum.
    /// Returns `true` if any budget actually grew.
    fn raise_budgets(&mut self) -> bool {
        if self.status != SumStatus::PartiallyConverged {
            return false;
        }
        let result = match self.result {
            Some(result) => result,
            None => return false,
        };

        let tolerance = self.tolerance(result.value.modulus());
        let mut ratio = 0.0_f64;
        for component in 0..T::COMPONENTS {
            ratio = ratio.max(result.uncertainty.component(component) / tolerance);
        }
        if !(ratio > 1.0) {
            return false;
        }

        let mut any_raised = false;
        for summand in self.summands.summands() {
            let mut integral = summand.integral.lock().unwrap();
            if !integral.supports_incremental_refinement() {
                continue;
            }

            let exponent = integral.get_scale_exponent();
            let factor = if exponent.is_finite() && exponent > 0.0 {
                ratio.powf(1.0 / exponent)
            } else {
                1.0
            };
            let factor = factor.min(self.maxincreasefac).max(1.0);

            let spent = integral
                .get_number_of_function_evaluations()
                .max(integral.get_next_number_of_function_evaluations());
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let proposed = ((spent as f64 * factor).ceil() as u64).min(self.maxeval);

            if proposed > integral.get_next_number_of_function_evaluations() {
                integral.set_next_number_of_function_evaluations(proposed);
                any_raised = true;
            }
        }
        any_raised
    }
}

/// A result of the refinement loop, one per sum.
#[derive(Clone, Copy, Debug)]
pub struct AmplitudeResult<T> {
    /// The combined value with its uncertainty.
    pub result: UncorrelatedDeviation<T>,
    /// How the refinement of this sum ended.
    pub status: SumStatus,
}

/// Drives a collection of weighted sums to their accuracy goals.
///
/// Each round the handler computes every integral whose budget grew, combines
/// the sums, and raises the budgets of the integrals of unconverged sums. The
/// loop ends when every sum is converged or failed, no budget can be raised
/// any further, or the wall-clock limit is exceeded.
pub struct WeightedIntegralHandler<T> {
    /// The sums under refinement, indexed by expansion order.
    pub expression: Series<Sum<T>>,
    /// The number of threads integrals are computed on.
    pub cores: usize,
    /// Optional wall-clock limit for the whole evaluation.
    pub wall_clock_limit: Option<Duration>,
}

impl<T: IntegrandValue> WeightedIntegralHandler<T> {
    /// Builds a handler for sums indexed `0..sums.len()`.
    pub fn new(sums: Vec<WeightedSum<T>>, options: &EvaluationOptions) -> Result<Self, Error> {
        Self::from_series(Series::new(0, sums), options)
    }

    /// Builds a handler from a series of weighted sums.
    pub fn from_series(
        series: Series<WeightedSum<T>>,
        options: &EvaluationOptions,
    ) -> Result<Self, Error> {
        options.validate()?;
        Ok(Self {
            expression: series.map(|summands| Sum::new(summands, options)),
            cores: 1,
            wall_clock_limit: None,
        })
    }

    /// Runs the refinement loop silently.
    pub fn evaluate(&mut self) -> Result<Series<AmplitudeResult<T>>, Error> {
        self.evaluate_with(&SinkCallback {})
    }

    /// Runs the refinement loop, reporting after each round.
    pub fn evaluate_with(
        &mut self,
        callback: &impl Callback<T>,
    ) -> Result<Series<AmplitudeResult<T>>, Error> {
        let deadline = self.wall_clock_limit.map(|limit| Instant::now() + limit);

        // seed every integral with the budget floor of its sums
        for sum in self.expression.iter() {
            for summand in sum.summands.summands() {
                summand
                    .integral
                    .lock()
                    .unwrap()
                    .set_next_number_of_function_evaluations(sum.mineval);
            }
        }

        let mut round = 0;
        loop {
            let pending = self.pending_integrals();
            for (integral, error) in self.compute_all(&pending) {
                self.record_failure(&integral, error)?;
            }

            for sum in self.expression.iter_mut() {
                sum.combine();
            }
            callback.print(round, &self.expression);

            let settled = self.expression.iter().all(|sum| {
                matches!(sum.status, SumStatus::Converged | SumStatus::Failed)
            });
            if settled {
                break;
            }
            if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                break;
            }

            let mut any_raised = false;
            for sum in self.expression.iter_mut() {
                any_raised |= sum.raise_budgets();
            }
            if !any_raised {
                break;
            }
            round += 1;
        }

        let order_min = self.expression.get_order_min();
        let results = self
            .expression
            .iter()
            .map(|sum| AmplitudeResult {
                result: sum
                    .result
                    .unwrap_or_else(|| UncorrelatedDeviation::new(T::zero(), T::zero())),
                status: sum.status,
            })
            .collect();
        Ok(Series::new(order_min, results))
    }

    /// The distinct integrals whose scheduled budget exceeds their spent one.
    fn pending_integrals(&self) -> Vec<SharedIntegral<T>> {
        let mut pending: Vec<SharedIntegral<T>> = vec![];
        for sum in self.expression.iter() {
            if sum.status == SumStatus::Failed {
                continue;
            }
            for summand in sum.summands.summands() {
                let needs_compute = {
                    let integral = summand.integral.lock().unwrap();
                    integral.get_integral_result().is_err()
                        || integral.get_next_number_of_function_evaluations()
                            > integral.get_number_of_function_evaluations()
                };
                if needs_compute
                    && !pending
                        .iter()
                        .any(|known| Arc::ptr_eq(known, &summand.integral))
                {
                    pending.push(Arc::clone(&summand.integral));
                }
            }
        }
        pending
    }

    /// Computes the pending integrals, chunked over the configured cores.
    /// Returns the integrals whose compute failed.
    fn compute_all(
        &self,
        pending: &[SharedIntegral<T>],
    ) -> Vec<(SharedIntegral<T>, Error)> {
        if self.cores <= 1 || pending.len() <= 1 {
            return pending
                .iter()
                .filter_map(|integral| {
                    integral
                        .lock()
                        .unwrap()
                        .compute()
                        .err()
                        .map(|error| (Arc::clone(integral), error))
                })
                .collect();
        }

        let chunk_size = (pending.len() + self.cores - 1) / self.cores;
        cb::thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.cores);
            for chunk in pending.chunks(chunk_size) {
                handles.push(s.spawn(move |_| {
                    chunk
                        .iter()
                        .filter_map(|integral| {
                            integral
                                .lock()
                                .unwrap()
                                .compute()
                                .err()
                                .map(|error| (Arc::clone(integral), error))
                        })
                        .collect::<Vec<_>>()
                }));
            }
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect()
        })
        .unwrap()
    }

    /// Marks every sum containing the failed integral. A failure before any
    /// result exists aborts the whole evaluation.
    fn record_failure(&mut self, integral: &SharedIntegral<T>, error: Error) -> Result<(), Error> {
        if integral.lock().unwrap().get_integral_result().is_err() {
            return Err(error);
        }
        for sum in self.expression.iter_mut() {
            let affected = sum
                .summands
                .summands()
                .iter()
                .any(|summand| Arc::ptr_eq(&summand.integral, integral));
            if affected {
                sum.status = SumStatus::Failed;
                sum.failure = Some(error.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_validate() {
        assert!(EvaluationOptions::default().validate().is_ok());
    }

    #[test]
    fn contradictory_tolerances_are_rejected() {
        let options = EvaluationOptions {
            epsrel: 0.0,
            epsabs: 0.0,
            ..EvaluationOptions::default()
        };
        assert!(matches!(
            options.validate().unwrap_err(),
            Error::InvalidTolerance(_)
        ));

        let options = EvaluationOptions {
            maxincreasefac: 0.5,
            ..EvaluationOptions::default()
        };
        assert!(matches!(
            options.validate().unwrap_err(),
            Error::InvalidTolerance(_)
        ));

        let options = EvaluationOptions {
            mineval: 10,
            maxeval: 5,
            ..EvaluationOptions::default()
        };
        assert!(matches!(
            options.validate().unwrap_err(),
            Error::InvalidTolerance(_)
        ));
    }
}
