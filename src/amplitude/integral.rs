//! An integral with a cached result and a monotonic evaluation budget.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core::{Error, IntegrandContainer, IntegrandValue, UncorrelatedDeviation};
use crate::integrators::{EvaluationMode, SharedIntegrator};

/// An integral shared between several weighted sums.
pub type SharedIntegral<T> = Arc<Mutex<Integral<T>>>;

/// Binds an integrand to an integration backend and caches the most recent
/// result.
///
/// The evaluation budget only ever grows: requests below the already
/// scheduled budget are ignored, and a [`compute`](Integral::compute) whose
/// budget does not exceed the budget of the cached result is a no-op. When
/// the backend rounds the budget up to a discrete level, the rounded count is
/// recorded so later budget arithmetic starts from what was actually spent.
pub struct Integral<T> {
    integrator: SharedIntegrator<T>,
    integrand: IntegrandContainer<T>,
    result: Option<UncorrelatedDeviation<T>>,
    current_evaluations: u64,
    next_evaluations: u64,
    integration_time: Option<Duration>,
    scale_exponent: f64,
    refinable: bool,
    evaluation_mode: EvaluationMode,
}

impl<T: IntegrandValue> Integral<T> {
    /// Constructor. The initial budget is the backend's smallest sensible
    /// number of evaluations.
    pub fn new(integrator: SharedIntegrator<T>, integrand: IntegrandContainer<T>) -> Self {
        let (next_evaluations, scale_exponent, refinable, evaluation_mode) = {
            let backend = integrator.lock().unwrap();
            (
                backend.min_evaluations(),
                backend.scale_exponent(),
                backend.supports_incremental_refinement(),
                backend.evaluation_mode(),
            )
        };
        Self {
            integrator,
            integrand,
            result: None,
            current_evaluations: 0,
            next_evaluations,
            integration_time: None,
            scale_exponent,
            refinable,
            evaluation_mode,
        }
    }

    /// Wraps a fresh integral in the shared handle the sum algebra works
    /// with.
    pub fn into_shared(self) -> SharedIntegral<T> {
        Arc::new(Mutex::new(self))
    }

    /// Requests a budget for the next [`compute`](Integral::compute). The
    /// budget never decreases.
    pub fn set_next_number_of_function_evaluations(&mut self, evaluations: u64) {
        self.next_evaluations = self.next_evaluations.max(evaluations);
    }

    /// The budget spent on the cached result; zero before the first compute.
    pub const fn get_number_of_function_evaluations(&self) -> u64 {
        self.current_evaluations
    }

    /// The budget of the next compute.
    pub const fn get_next_number_of_function_evaluations(&self) -> u64 {
        self.next_evaluations
    }

    /// Integrates with the scheduled budget. Does nothing if a result with at
    /// least that budget is already cached.
    pub fn compute(&mut self) -> Result<(), Error> {
        if self.result.is_some() && self.next_evaluations <= self.current_evaluations {
            return Ok(());
        }

        let start = Instant::now();
        let output = self
            .integrator
            .lock()
            .unwrap()
            .integrate(&self.integrand, self.next_evaluations)?;
        self.integration_time = Some(start.elapsed());

        self.result = Some(output.result);
        self.current_evaluations = output.evaluations;
        self.next_evaluations = self.next_evaluations.max(output.evaluations);
        Ok(())
    }

    /// The cached result.
    pub fn get_integral_result(&self) -> Result<UncorrelatedDeviation<T>, Error> {
        self.result.ok_or(Error::NotComputed {
            what: "get_integral_result",
        })
    }

    /// The wall-clock time of the most recent compute.
    pub fn get_integration_time(&self) -> Result<Duration, Error> {
        self.integration_time.ok_or(Error::NotComputed {
            what: "get_integration_time",
        })
    }

    /// The error scaling exponent of the backend.
    pub const fn get_scale_exponent(&self) -> f64 {
        self.scale_exponent
    }

    /// Whether a larger budget improves the backend's result.
    pub const fn supports_incremental_refinement(&self) -> bool {
        self.refinable
    }

    /// How the backend consumes complex integrands.
    pub const fn evaluation_mode(&self) -> EvaluationMode {
        self.evaluation_mode
    }

    /// Name used when reporting on this integral.
    pub fn display_name(&self) -> &str {
        &self.integrand.display_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResultInfo;
    use crate::integrators::{IntegrationOutput, Integrator};

    /// Backend that counts its calls and snaps budgets up to multiples of
    /// 1000.
    struct Counting {
        calls: usize,
    }

    impl Integrator<f64> for Counting {
        fn integrate(
            &mut self,
            _: &IntegrandContainer<f64>,
            evaluations: u64,
        ) -> Result<IntegrationOutput<f64>, Error> {
            self.calls += 1;
            let rounded = ((evaluations + 999) / 1000) * 1000;
            Ok(IntegrationOutput {
                result: UncorrelatedDeviation::new(1.0, 1.0 / rounded as f64),
                evaluations: rounded,
            })
        }

        fn min_evaluations(&self) -> u64 {
            1000
        }

        fn scale_exponent(&self) -> f64 {
            0.5
        }
    }

    fn integral() -> Integral<f64> {
        let integrator: SharedIntegrator<f64> = Arc::new(Mutex::new(Counting { calls: 0 }));
        let integrand =
            IntegrandContainer::new(1, |x: &[f64], _: &mut ResultInfo| x[0]).unwrap();
        Integral::new(integrator, integrand)
    }

    #[test]
    fn getters_before_compute() {
        let integral = integral();

        assert_eq!(integral.get_number_of_function_evaluations(), 0);
        assert_eq!(integral.get_next_number_of_function_evaluations(), 1000);
        assert_eq!(
            integral.get_integral_result().unwrap_err(),
            Error::NotComputed {
                what: "get_integral_result",
            }
        );
        assert_eq!(
            integral.get_integration_time().unwrap_err(),
            Error::NotComputed {
                what: "get_integration_time",
            }
        );
        assert_eq!(
            integral
                .get_integral_result()
                .unwrap_err()
                .to_string(),
            "get_integral_result called before compute"
        );
        assert_eq!(integral.get_scale_exponent(), 0.5);
    }

    #[test]
    fn budget_is_monotonic_and_compute_idempotent() {
        let mut integral = integral();

        integral.set_next_number_of_function_evaluations(2500);
        assert_eq!(integral.get_next_number_of_function_evaluations(), 2500);

        integral.compute().unwrap();
        // the backend rounded the request up
        assert_eq!(integral.get_number_of_function_evaluations(), 3000);
        assert_eq!(integral.get_next_number_of_function_evaluations(), 3000);
        assert!(integral.get_integration_time().is_ok());

        // a smaller request is ignored
        integral.set_next_number_of_function_evaluations(10);
        assert_eq!(integral.get_next_number_of_function_evaluations(), 3000);

        // compute without a raised budget is a no-op
        integral.compute().unwrap();
        integral.compute().unwrap();

        integral.set_next_number_of_function_evaluations(5500);
        integral.compute().unwrap();
        assert_eq!(integral.get_number_of_function_evaluations(), 6000);
    }

    #[test]
    fn backend_calls_match_budget_raises() {
        let integrator = Arc::new(Mutex::new(Counting { calls: 0 }));
        let shared: SharedIntegrator<f64> = integrator.clone();
        let integrand =
            IntegrandContainer::new(1, |x: &[f64], _: &mut ResultInfo| x[0]).unwrap();
        let mut integral = Integral::new(shared, integrand);

        integral.compute().unwrap();
        integral.compute().unwrap();
        integral.set_next_number_of_function_evaluations(2000);
        integral.compute().unwrap();

        assert_eq!(integrator.lock().unwrap().calls, 2);
    }
}
