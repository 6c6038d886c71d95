//! Plain Monte Carlo integration.

use rand::Rng;
use rand_pcg::Pcg64;

use super::{EvaluationMode, IntegrationOutput, Integrator};
use crate::core::estimators::Accumulator;
use crate::core::{Error, IntegrandContainer, IntegrandValue, ResultInfo, UncorrelatedDeviation, MAX_COMPONENTS};

/// Plain Monte Carlo: uniform samples on the unit hypercube, standard error
/// of the mean as uncertainty. The error scales like $N^{-1/2}$.
#[derive(Clone, Debug)]
pub struct Plain<R = Pcg64> {
    rng: R,
    /// The smallest number of samples a single integration will use.
    pub min_calls: u64,
    /// Whether complex integrands are sampled once for both components or
    /// component by component.
    pub evaluation_mode: EvaluationMode,
}

impl<R> Plain<R> {
    /// Constructor.
    pub const fn new(rng: R) -> Self {
        Self {
            rng,
            min_calls: 1000,
            evaluation_mode: EvaluationMode::Together,
        }
    }
}

impl Default for Plain<Pcg64> {
    fn default() -> Self {
        Self::new(Pcg64::new(
            0xcafef00dd15ea5e5,
            0xa02bdbf7bb3c0a7ac28fa16a64abf96,
        ))
    }
}

impl<T, R> Integrator<T> for Plain<R>
where
    T: IntegrandValue,
    R: Rng + Send,
{
    fn integrate(
        &mut self,
        integrand: &IntegrandContainer<T>,
        evaluations: u64,
    ) -> Result<IntegrationOutput<T>, Error> {
        let calls = evaluations.max(self.min_calls);
        let dim = integrand.number_of_integration_variables();

        let mut x = vec![0.0; dim];
        let mut info = ResultInfo::default();

        if self.evaluation_mode == EvaluationMode::SeparateRealImag && T::COMPONENTS > 1 {
            // one independent sample stream per component
            let mut values = [0.0; MAX_COMPONENTS];
            let mut uncertainties = [0.0; MAX_COMPONENTS];

            for component in 0..T::COMPONENTS {
                let mut acc = Accumulator::<f64>::default();
                for _ in 0..calls {
                    x.iter_mut().for_each(|v| *v = self.rng.gen());

                    let value = integrand.evaluate(&x, &mut info);
                    if let Some(message) = info.sign_check_error.take() {
                        return Err(Error::SignCheckDuringIntegration(message));
                    }
                    acc.update(value.component(component));
                }
                let estimate = acc.estimate();
                values[component] = estimate.value;
                uncertainties[component] = estimate.uncertainty;
            }

            return Ok(IntegrationOutput {
                result: UncorrelatedDeviation::new(
                    T::from_components(&values[..T::COMPONENTS]),
                    T::from_components(&uncertainties[..T::COMPONENTS]),
                ),
                evaluations: calls,
            });
        }

        let mut acc = Accumulator::<T>::default();
        for _ in 0..calls {
            x.iter_mut().for_each(|v| *v = self.rng.gen());

            let value = integrand.evaluate(&x, &mut info);
            if let Some(message) = info.sign_check_error.take() {
                return Err(Error::SignCheckDuringIntegration(message));
            }
            acc.update(value);
        }

        Ok(IntegrationOutput {
            result: acc.estimate(),
            evaluations: calls,
        })
    }

    fn min_evaluations(&self) -> u64 {
        self.min_calls
    }

    fn scale_exponent(&self) -> f64 {
        0.5
    }

    fn evaluation_mode(&self) -> EvaluationMode {
        self.evaluation_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn container() -> IntegrandContainer<f64> {
        IntegrandContainer::new(2, |x: &[f64], _: &mut ResultInfo| x[0] * x[1]).unwrap()
    }

    #[test]
    fn product_of_two_variables() {
        let mut plain = Plain::default();
        let output = plain.integrate(&container(), 100_000).unwrap();

        assert_eq!(output.evaluations, 100_000);
        // exact value 1/4
        assert_approx_eq!(output.result.value, 0.25, 5.0 * output.result.uncertainty);
        assert!(output.result.uncertainty < 1e-2);
    }

    #[test]
    fn same_seed_reproduces_the_estimate() {
        let mut first = Plain::default();
        let mut second = Plain::default();

        let lhs = first.integrate(&container(), 10_000).unwrap();
        let rhs = second.integrate(&container(), 10_000).unwrap();

        assert_eq!(lhs.result.value, rhs.result.value);
        assert_eq!(lhs.result.uncertainty, rhs.result.uncertainty);
    }

    #[test]
    fn budget_is_clamped_to_min_calls() {
        let mut plain = Plain::default();
        let output = plain.integrate(&container(), 10).unwrap();
        assert_eq!(output.evaluations, 1000);
    }

    #[test]
    fn separate_component_sampling_estimates_both_parts() {
        use num_complex::Complex64;

        let integrand = IntegrandContainer::new(2, |x: &[f64], _: &mut ResultInfo| {
            Complex64::new(x[0], 3.0 * x[1])
        })
        .unwrap();

        let mut plain = Plain::default();
        plain.evaluation_mode = EvaluationMode::SeparateRealImag;
        let output = plain.integrate(&integrand, 100_000).unwrap();

        assert_approx_eq!(output.result.value.re, 0.5, 1e-2);
        assert_approx_eq!(output.result.value.im, 1.5, 3e-2);
        assert!(output.result.uncertainty.re > 0.0);
        assert!(output.result.uncertainty.im > 0.0);
    }

    #[test]
    fn sign_check_violations_abort_the_integration() {
        let integrand = IntegrandContainer::new(1, |_: &[f64], info: &mut ResultInfo| {
            info.sign_check_error = Some("sector 7".to_string());
            0.0
        })
        .unwrap();

        let mut plain = Plain::default();
        assert_eq!(
            plain.integrate(&integrand, 1000).unwrap_err(),
            Error::SignCheckDuringIntegration("sector 7".to_string())
        );
    }
}
