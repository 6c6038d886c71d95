//! Tensor-product Gauss-Legendre quadrature.

use super::{IntegrationOutput, Integrator};
use crate::core::{Error, IntegrandContainer, IntegrandValue, ResultInfo, MAX_COMPONENTS};

/// A deterministic tensor-product Gauss-Legendre rule.
///
/// The evaluation budget is translated into the smallest number of points per
/// axis whose tensor product reaches the budget, clamped to
/// `[min_points_per_axis, max_points_per_axis]`. The uncertainty is the
/// difference against an embedded rule with half as many points per axis;
/// since the rule does not improve with repeated calls at the same depth it
/// reports itself as not incrementally refinable.
#[derive(Clone, Debug)]
pub struct Quadrature {
    /// The smallest number of Gauss points per axis.
    pub min_points_per_axis: usize,
    /// The largest number of Gauss points per axis.
    pub max_points_per_axis: usize,
}

impl Quadrature {
    /// Constructor.
    pub const fn new() -> Self {
        Self {
            min_points_per_axis: 4,
            max_points_per_axis: 64,
        }
    }

    /// Gauss-Legendre nodes and weights on the unit interval, by Newton
    /// iteration on the Legendre polynomial.
    fn nodes_and_weights(points: usize) -> (Vec<f64>, Vec<f64>) {
        let mut nodes = vec![0.0; points];
        let mut weights = vec![0.0; points];
        let n = points as f64;

        for i in 0..points {
            // Chebyshev-based initial guess on [-1, 1]
            let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n + 0.5)).cos();
            let mut derivative = 0.0;

            for _ in 0..100 {
                // Legendre recurrence for P_n(x) and P_n'(x)
                let mut p0 = 1.0;
                let mut p1 = x;
                for k in 2..=points {
                    let k = k as f64;
                    let p2 = ((2.0 * k - 1.0) * x * p1 - (k - 1.0) * p0) / k;
                    p0 = p1;
                    p1 = p2;
                }
                derivative = n * (x * p1 - p0) / (x * x - 1.0);

                let step = p1 / derivative;
                x -= step;
                if step.abs() < 1e-15 {
                    break;
                }
            }

            nodes[i] = 0.5 * (1.0 + x);
            weights[i] = 1.0 / ((1.0 - x * x) * derivative * derivative);
        }

        (nodes, weights)
    }

    fn points_per_axis(&self, evaluations: u64, dim: usize) -> Result<usize, Error> {
        let capacity = (self.max_points_per_axis as u64)
            .checked_pow(dim as u32)
            .unwrap_or(u64::MAX);
        if evaluations > capacity {
            return Err(Error::EvaluationLimit {
                requested: evaluations,
                largest: capacity,
            });
        }

        let mut points = self.min_points_per_axis.max(1);
        while points < self.max_points_per_axis
            && (points as u64).checked_pow(dim as u32).unwrap_or(u64::MAX) < evaluations
        {
            points += 1;
        }
        Ok(points)
    }

    /// Evaluates the full tensor rule with `points` nodes per axis.
    fn tensor_rule<T: IntegrandValue>(
        integrand: &IntegrandContainer<T>,
        points: usize,
    ) -> Result<T, Error> {
        let dim = integrand.number_of_integration_variables();
        let (nodes, weights) = Self::nodes_and_weights(points);

        let mut index = vec![0usize; dim];
        let mut x = vec![0.0; dim];
        let mut info = ResultInfo::default();
        let mut sum = T::zero();

        loop {
            let mut weight = 1.0;
            for (axis, &i) in index.iter().enumerate() {
                x[axis] = nodes[i];
                weight *= weights[i];
            }

            let value = integrand.evaluate(&x, &mut info);
            if let Some(message) = info.sign_check_error.take() {
                return Err(Error::SignCheckDuringIntegration(message));
            }
            sum += value.scale(weight);

            // odometer increment
            let mut axis = 0;
            loop {
                index[axis] += 1;
                if index[axis] < points {
                    break;
                }
                index[axis] = 0;
                axis += 1;
                if axis == dim {
                    return Ok(sum);
                }
            }
        }
    }
}

impl Default for Quadrature {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: IntegrandValue> Integrator<T> for Quadrature {
    fn integrate(
        &mut self,
        integrand: &IntegrandContainer<T>,
        evaluations: u64,
    ) -> Result<IntegrationOutput<T>, Error> {
        let dim = integrand.number_of_integration_variables();
        let points = self.points_per_axis(evaluations, dim)?;

        let fine = Self::tensor_rule(integrand, points)?;
        let coarse = Self::tensor_rule(integrand, (points / 2).max(1))?;

        let mut uncertainty = [0.0; MAX_COMPONENTS];
        for (index, entry) in uncertainty.iter_mut().enumerate().take(T::COMPONENTS) {
            *entry = (fine.component(index) - coarse.component(index)).abs();
        }

        Ok(IntegrationOutput {
            result: crate::core::UncorrelatedDeviation::new(
                fine,
                T::from_components(&uncertainty[..T::COMPONENTS]),
            ),
            evaluations: (points as u64).pow(dim as u32),
        })
    }

    fn min_evaluations(&self) -> u64 {
        1
    }

    fn scale_exponent(&self) -> f64 {
        f64::INFINITY
    }

    fn supports_incremental_refinement(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn gauss_nodes_integrate_polynomials_exactly() {
        // a 4-point rule is exact for degree 7
        let (nodes, weights) = Quadrature::nodes_and_weights(4);
        let integral: f64 = nodes
            .iter()
            .zip(&weights)
            .map(|(x, w)| w * x.powi(7))
            .sum();
        assert_approx_eq!(integral, 0.125, 1e-14);

        let total: f64 = weights.iter().sum();
        assert_approx_eq!(total, 1.0, 1e-14);
    }

    #[test]
    fn smooth_integrand_is_exact_to_machine_precision() {
        // exact value 1/4
        let integrand = IntegrandContainer::new(2, |x: &[f64], _: &mut ResultInfo| {
            x[0] * x[1]
        })
        .unwrap();

        let mut quadrature = Quadrature::new();
        let output = quadrature.integrate(&integrand, 16).unwrap();

        assert_eq!(output.evaluations, 16);
        assert_approx_eq!(output.result.value, 0.25, 1e-14);
        assert!(output.result.uncertainty < 1e-13);
    }

    #[test]
    fn budget_beyond_the_deepest_rule_is_rejected() {
        let integrand =
            IntegrandContainer::new(2, |_: &[f64], _: &mut ResultInfo| 1.0).unwrap();

        let mut quadrature = Quadrature::new();
        assert_eq!(
            quadrature.integrate(&integrand, 5000).unwrap_err(),
            Error::EvaluationLimit {
                requested: 5000,
                largest: 4096,
            }
        );
    }
}
