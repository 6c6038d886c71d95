//! Contour-deformation parameter optimization.
//!
//! A deformed sector carries its integrand together with the deformation
//! polynomial whose imaginary part must not grow under deformation. The
//! optimizer presamples the unit hypercube with a Sobol sequence, takes the
//! per-axis minimum of the admissible deformation parameters, then replays
//! the identical sample sequence and shrinks the parameter vector until every
//! sample passes the sign check.

use num_complex::Complex64;
use num_traits::Zero;
use std::sync::Arc;

use crate::core::{Error, IntegrandContainer, IntegrandValue, ResultInfo};

/// The largest dimensionality the built-in Sobol sequence supports.
pub const SOBOL_MAX_DIM: usize = 8;

const SOBOL_BITS: usize = 32;

/// Primitive-polynomial parameters of the Joe-Kuo direction numbers for
/// dimensions two through eight.
struct JoeKuo {
    s: usize,
    a: u64,
    m: [u64; 5],
}

const JOE_KUO: [JoeKuo; SOBOL_MAX_DIM - 1] = [
    JoeKuo { s: 1, a: 0, m: [1, 0, 0, 0, 0] },
    JoeKuo { s: 2, a: 1, m: [1, 1, 0, 0, 0] },
    JoeKuo { s: 3, a: 1, m: [1, 1, 1, 0, 0] },
    JoeKuo { s: 3, a: 2, m: [1, 3, 1, 0, 0] },
    JoeKuo { s: 4, a: 1, m: [1, 1, 3, 3, 0] },
    JoeKuo { s: 4, a: 4, m: [1, 3, 5, 13, 0] },
    JoeKuo { s: 5, a: 2, m: [1, 1, 5, 5, 17] },
];

fn direction_numbers(dimension_index: usize) -> [u64; SOBOL_BITS] {
    let mut v = [0u64; SOBOL_BITS];

    if dimension_index == 0 {
        for (k, entry) in v.iter_mut().enumerate() {
            *entry = 1 << (SOBOL_BITS - 1 - k);
        }
        return v;
    }

    let params = &JOE_KUO[dimension_index - 1];
    for k in 0..params.s {
        v[k] = params.m[k] << (SOBOL_BITS - 1 - k);
    }
    for k in params.s..SOBOL_BITS {
        let mut value = v[k - params.s] ^ (v[k - params.s] >> params.s);
        for i in 1..params.s {
            if (params.a >> (params.s - 1 - i)) & 1 == 1 {
                value ^= v[k - i];
            }
        }
        v[k] = value;
    }
    v
}

/// A Gray-code Sobol sequence on the unit hypercube.
///
/// The first point returned is the midpoint of the cube; [`reset`]
/// restarts the sequence so the exact same samples can be replayed.
///
/// [`reset`]: SobolSequence::reset
pub struct SobolSequence {
    dimension: usize,
    counter: u64,
    state: Vec<u64>,
    directions: Vec<[u64; SOBOL_BITS]>,
}

impl SobolSequence {
    /// Constructor.
    pub fn new(dimension: usize) -> Result<Self, Error> {
        if dimension == 0 || dimension > SOBOL_MAX_DIM {
            return Err(Error::SobolDimension {
                requested: dimension,
                supported: SOBOL_MAX_DIM,
            });
        }
        Ok(Self {
            dimension,
            counter: 1,
            state: vec![0; dimension],
            directions: (0..dimension).map(direction_numbers).collect(),
        })
    }

    /// Writes the next point of the sequence into `point`.
    #[allow(clippy::cast_precision_loss)]
    pub fn next_point(&mut self, point: &mut [f64]) {
        let c = self.counter.trailing_zeros() as usize;
        let scale = (1u64 << SOBOL_BITS) as f64;
        for (j, value) in point.iter_mut().enumerate().take(self.dimension) {
            self.state[j] ^= self.directions[j][c];
            *value = self.state[j] as f64 / scale;
        }
        self.counter += 1;
    }

    /// Restarts the sequence from its first point.
    pub fn reset(&mut self) {
        self.counter = 1;
        self.state.iter_mut().for_each(|s| *s = 0);
    }
}

/// A deformed integrand evaluated at a point and a deformation parameter
/// vector.
pub type DeformedIntegrandFn = dyn Fn(&[f64], &[f64]) -> Complex64 + Send + Sync;

/// Writes the largest admissible deformation parameters for a sample point
/// into its first argument.
pub type MaximalParametersFn = dyn Fn(&mut [f64], &[f64]) + Send + Sync;

/// The knobs of [`DeformedSector::optimize_deformation_parameters`].
#[derive(Clone, Copy, Debug)]
pub struct DeformationSettings {
    /// How many Sobol samples both optimizer passes use. Zero skips the
    /// optimization and keeps the maximum everywhere.
    pub number_of_presamples: u64,
    /// Upper bound of every deformation parameter.
    pub maximum: f64,
    /// Lower bound of every deformation parameter.
    pub minimum: f64,
    /// Shrink factor of the sign-check pass.
    pub decrease_factor: f64,
}

impl Default for DeformationSettings {
    fn default() -> Self {
        Self {
            number_of_presamples: 100_000,
            maximum: 1.0,
            minimum: 1e-5,
            decrease_factor: 0.9,
        }
    }
}

/// A sector whose integrand is evaluated on a deformed contour.
///
/// The parameters of the amplitude are expected to be captured by the
/// closures.
pub struct DeformedSector {
    /// Identifier of the sector.
    pub sector_id: u32,
    /// Regulator orders of the term this sector contributes to.
    pub orders: Vec<i32>,
    number_of_integration_variables: usize,
    deformed_integrand: Arc<DeformedIntegrandFn>,
    contour_deformation_polynomial: Arc<DeformedIntegrandFn>,
    maximal_deformation_parameters: Arc<MaximalParametersFn>,
    zeros: Vec<f64>,
}

impl DeformedSector {
    /// Constructor.
    pub fn new<F, G, H>(
        sector_id: u32,
        orders: Vec<i32>,
        number_of_integration_variables: usize,
        deformed_integrand: F,
        contour_deformation_polynomial: G,
        maximal_deformation_parameters: H,
    ) -> Result<Self, Error>
    where
        F: Fn(&[f64], &[f64]) -> Complex64 + Send + Sync + 'static,
        G: Fn(&[f64], &[f64]) -> Complex64 + Send + Sync + 'static,
        H: Fn(&mut [f64], &[f64]) + Send + Sync + 'static,
    {
        if number_of_integration_variables == 0 {
            return Err(Error::ZeroDimension);
        }
        Ok(Self {
            sector_id,
            orders,
            number_of_integration_variables,
            deformed_integrand: Arc::new(deformed_integrand),
            contour_deformation_polynomial: Arc::new(contour_deformation_polynomial),
            maximal_deformation_parameters: Arc::new(maximal_deformation_parameters),
            zeros: vec![0.0; number_of_integration_variables],
        })
    }

    /// The number of integration variables.
    pub const fn number_of_integration_variables(&self) -> usize {
        self.number_of_integration_variables
    }

    /// The deformation is admissible at `x` if it does not increase the
    /// imaginary part of the deformation polynomial.
    pub fn sign_check_passes(&self, x: &[f64], deformation_parameters: &[f64]) -> bool {
        (self.contour_deformation_polynomial)(x, deformation_parameters).im
            <= (self.contour_deformation_polynomial)(x, &self.zeros).im
    }

    /// Finds deformation parameters that pass the sign check on every
    /// presample.
    ///
    /// The first pass takes, per axis, the minimum admissible parameter over
    /// the samples, restricted to `[minimum, maximum]`. The second pass
    /// replays the identical samples and shrinks the whole vector by
    /// `decrease_factor` until each of them passes the sign check. If the
    /// vector shrinks ten orders of magnitude below `minimum` without
    /// passing, the check is considered unsatisfiable.
    pub fn optimize_deformation_parameters(
        &self,
        settings: &DeformationSettings,
    ) -> Result<Vec<f64>, Error> {
        let dim = self.number_of_integration_variables;

        if settings.number_of_presamples == 0 {
            return Ok(vec![settings.maximum; dim]);
        }

        let mut sobol = SobolSequence::new(dim)?;
        let mut optimized = vec![settings.maximum; dim];
        let mut admissible = vec![0.0; dim];
        let mut sample = vec![0.0; dim];

        for _ in 0..settings.number_of_presamples {
            sobol.next_point(&mut sample);
            (self.maximal_deformation_parameters)(&mut admissible, &sample);
            for (optimum, candidate) in optimized.iter_mut().zip(&admissible) {
                if (settings.minimum..=settings.maximum).contains(candidate) {
                    if *optimum > *candidate {
                        *optimum = *candidate;
                    }
                } else if *candidate < settings.minimum {
                    *optimum = settings.minimum;
                }
            }
        }

        // replay the identical sample sequence for the sign check
        sobol.reset();
        let floor = settings.minimum * 1e-10;

        for _ in 0..settings.number_of_presamples {
            sobol.next_point(&mut sample);
            while !self.sign_check_passes(&sample, &optimized) {
                if optimized.iter().all(|parameter| *parameter < floor) {
                    return Err(Error::SignCheck {
                        sector_id: self.sector_id,
                        orders: self.orders.clone(),
                    });
                }
                for parameter in &mut optimized {
                    *parameter *= settings.decrease_factor;
                }
            }
        }

        Ok(optimized)
    }

    /// Binds the sector to a deformation parameter vector.
    ///
    /// The resulting integrand repeats the sign check at every sample; a
    /// violation is reported through the [`ResultInfo`] side channel and the
    /// sample evaluates to zero.
    pub fn into_integrand_container(
        self,
        deformation_parameters: Vec<f64>,
    ) -> Result<IntegrandContainer<Complex64>, Error> {
        let sector_id = self.sector_id;
        let orders = self.orders;
        let dim = self.number_of_integration_variables;
        let integrand = self.deformed_integrand;
        let polynomial = self.contour_deformation_polynomial;
        let zeros = self.zeros;

        let mut container = IntegrandContainer::new(dim, move |x: &[f64], info: &mut ResultInfo| {
            let deformed = polynomial(x, &deformation_parameters).im;
            let undeformed = polynomial(x, &zeros).im;
            if deformed > undeformed {
                info.sign_check_error = Some(format!(
                    "contour deformation in sector {}, order {:?} yields the wrong sign \
                     of the deformation polynomial; choose a larger number of presamples \
                     or decrease the deformation parameters",
                    sector_id, orders
                ));
                return Complex64::zero();
            }
            integrand(x, &deformation_parameters)
        })?;
        container.display_name = format!("sector_{}", sector_id);
        Ok(container)
    }
}

/// A sector that needs no contour deformation.
pub struct Sector<T> {
    /// Identifier of the sector.
    pub sector_id: u32,
    /// Regulator orders of the term this sector contributes to.
    pub orders: Vec<i32>,
    number_of_integration_variables: usize,
    integrand: Arc<dyn Fn(&[f64]) -> T + Send + Sync>,
}

impl<T: IntegrandValue> Sector<T> {
    /// Constructor.
    pub fn new<F>(
        sector_id: u32,
        orders: Vec<i32>,
        number_of_integration_variables: usize,
        integrand: F,
    ) -> Result<Self, Error>
    where
        F: Fn(&[f64]) -> T + Send + Sync + 'static,
    {
        if number_of_integration_variables == 0 {
            return Err(Error::ZeroDimension);
        }
        Ok(Self {
            sector_id,
            orders,
            number_of_integration_variables,
            integrand: Arc::new(integrand),
        })
    }

    /// The number of integration variables.
    pub const fn number_of_integration_variables(&self) -> usize {
        self.number_of_integration_variables
    }

    /// Wraps the sector as a plain integrand container.
    pub fn into_integrand_container(self) -> Result<IntegrandContainer<T>, Error> {
        let integrand = self.integrand;
        let mut container =
            IntegrandContainer::new(self.number_of_integration_variables, move |x: &[f64], _: &mut ResultInfo| {
                integrand(x)
            })?;
        container.display_name = format!("sector_{}", self.sector_id);
        Ok(container)
    }
}
