//! Randomised rank-1 lattice integration.

use rand::Rng;
use rand_pcg::Pcg64;
use std::collections::BTreeMap;

use super::{IntegrationOutput, Integrator};
use crate::core::estimators::Accumulator;
use crate::core::{Error, IntegrandContainer, IntegrandValue, ResultInfo};

/// The generating vectors shipped with this crate, indexed by lattice size.
///
/// These are six-dimensional vectors optimised for the Korobov-3 transform;
/// custom tables can be installed through the public field of [`Lattice`].
pub fn default_generating_vectors() -> BTreeMap<u64, Vec<u64>> {
    let mut vectors = BTreeMap::new();
    vectors.insert(65521, vec![1, 18303, 27193, 16899, 31463, 13841]);
    vectors.insert(131071, vec![1, 49763, 21432, 15971, 52704, 48065]);
    vectors.insert(196597, vec![1, 72610, 13914, 40202, 16516, 29544]);
    vectors.insert(262139, vec![1, 76811, 28708, 119567, 126364, 5581]);
    vectors.insert(327673, vec![1, 125075, 70759, 81229, 99364, 145331]);
    vectors
}

/// The Korobov-3 periodising substitution
/// $\psi(u) = u^4 (35 - 84 u + 70 u^2 - 20 u^3)$.
fn korobov3(u: f64) -> f64 {
    u * u * u * u * (35.0 - u * (84.0 - u * (70.0 - 20.0 * u)))
}

/// The weight $\psi'(u) = 140 u^3 (1 - u)^3$ of the Korobov-3 substitution.
fn korobov3_weight(u: f64) -> f64 {
    let v = u * (1.0 - u);
    140.0 * v * v * v
}

/// A rank-1 lattice rule with Cranley-Patterson random shifts and a Korobov-3
/// periodising transform.
///
/// The evaluation budget snaps up to the next available lattice size; the
/// uncertainty is the standard error of the mean over the random shifts. For
/// smooth periodised integrands the error decays much faster than the
/// Monte-Carlo $N^{-1/2}$.
#[derive(Clone, Debug)]
pub struct Lattice<R = Pcg64> {
    /// The generating vectors, indexed by lattice size.
    pub generating_vectors: BTreeMap<u64, Vec<u64>>,
    rng: R,
    /// The number of random shifts used for the error estimate. Values below
    /// two are padded to two, since a single shift admits no variance
    /// estimate.
    pub shifts: usize,
    /// The error scaling exponent reported to the refinement loop.
    pub scale_exponent: f64,
}

impl<R> Lattice<R> {
    /// Constructor, using the built-in generating vectors.
    pub fn new(rng: R) -> Self {
        Self {
            generating_vectors: default_generating_vectors(),
            rng,
            shifts: 16,
            scale_exponent: 0.9,
        }
    }

    /// Returns the smallest available lattice size not below `evaluations`,
    /// or [`Error::EvaluationLimit`] if the request exceeds the largest
    /// lattice.
    pub fn round_up(&self, evaluations: u64) -> Result<u64, Error> {
        self.generating_vectors
            .range(evaluations..)
            .next()
            .map(|(n, _)| *n)
            .ok_or_else(|| Error::EvaluationLimit {
                requested: evaluations,
                largest: self.generating_vectors.keys().next_back().copied().unwrap_or(0),
            })
    }
}

impl Default for Lattice<Pcg64> {
    fn default() -> Self {
        Self::new(Pcg64::new(
            0xcafef00dd15ea5e5,
            0xa02bdbf7bb3c0a7ac28fa16a64abf96,
        ))
    }
}

impl<T, R> Integrator<T> for Lattice<R>
where
    T: IntegrandValue,
    R: Rng + Send,
{
    #[allow(clippy::cast_precision_loss)]
    fn integrate(
        &mut self,
        integrand: &IntegrandContainer<T>,
        evaluations: u64,
    ) -> Result<IntegrationOutput<T>, Error> {
        let n = self.round_up(evaluations)?;
        let z = &self.generating_vectors[&n];

        let dim = integrand.number_of_integration_variables();
        if dim > z.len() {
            return Err(Error::DimensionLimit {
                dimension: dim,
                supported: z.len(),
            });
        }

        let mut shift = vec![0.0; dim];
        let mut point = vec![0u64; dim];
        let mut x = vec![0.0; dim];
        let mut info = ResultInfo::default();
        let mut over_shifts = Accumulator::<T>::default();

        // a single shift leaves the error estimate without a variance
        let shifts = self.shifts.max(2);

        for _ in 0..shifts {
            for s in shift.iter_mut() {
                *s = self.rng.gen();
            }
            point.iter_mut().for_each(|p| *p = 0);

            let mut sum = T::zero();
            for _ in 0..n {
                let mut weight = 1.0;
                for ((value, p), s) in x.iter_mut().zip(&point).zip(&shift) {
                    let u = (*p as f64 / n as f64 + s).fract();
                    weight *= korobov3_weight(u);
                    *value = korobov3(u);
                }

                let value = integrand.evaluate(&x, &mut info);
                if let Some(message) = info.sign_check_error.take() {
                    return Err(Error::SignCheckDuringIntegration(message));
                }
                sum += value.scale(weight);

                for (p, step) in point.iter_mut().zip(z) {
                    *p = (*p + step) % n;
                }
            }

            over_shifts.update(sum.scale(1.0 / n as f64));
        }

        Ok(IntegrationOutput {
            result: over_shifts.estimate(),
            // the shifts multiply the work but not the level arithmetic
            evaluations: n,
        })
    }

    fn min_evaluations(&self) -> u64 {
        self.generating_vectors.keys().next().copied().unwrap_or(1)
    }

    fn scale_exponent(&self) -> f64 {
        self.scale_exponent
    }
}
