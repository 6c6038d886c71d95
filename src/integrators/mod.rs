//! The integration strategies of this crate.

pub mod lattice;
pub mod plain;
pub mod quadrature;

pub use lattice::Lattice;
pub use plain::Plain;
pub use quadrature::Quadrature;

use crate::core::{Error, IntegrandContainer, IntegrandValue, UncorrelatedDeviation};
use std::sync::{Arc, Mutex};

/// How a backend consumes a complex integrand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EvaluationMode {
    /// Real and imaginary parts are estimated from the same sample stream.
    Together,
    /// The real and imaginary parts are integrated as two separate real
    /// integrands.
    SeparateRealImag,
}

/// The outcome of a single integration.
#[derive(Clone, Copy, Debug)]
pub struct IntegrationOutput<T> {
    /// The estimate with its uncertainty.
    pub result: UncorrelatedDeviation<T>,
    /// The number of function evaluations actually spent. Backends with
    /// discrete levels may round the request up.
    pub evaluations: u64,
}

/// An integration backend.
///
/// Implementations keep whatever state they need (random number generators,
/// node tables) between calls; `integrate` therefore takes `&mut self`.
pub trait Integrator<T: IntegrandValue>: Send {
    /// Integrates `integrand` over the unit hypercube with a budget of
    /// `evaluations` function calls.
    fn integrate(
        &mut self,
        integrand: &IntegrandContainer<T>,
        evaluations: u64,
    ) -> Result<IntegrationOutput<T>, Error>;

    /// The smallest sensible number of function evaluations for this backend.
    fn min_evaluations(&self) -> u64;

    /// The exponent $p$ in the error scaling law $\sigma \propto N^{-p}$,
    /// used by the refinement loop to extrapolate budgets.
    fn scale_exponent(&self) -> f64;

    /// Whether raising the evaluation budget improves this backend's result.
    /// Deterministic rules at their maximum depth return `false`.
    fn supports_incremental_refinement(&self) -> bool {
        true
    }

    /// How this backend wants complex integrands evaluated.
    fn evaluation_mode(&self) -> EvaluationMode {
        EvaluationMode::Together
    }
}

/// An integrator shared between several integrals.
pub type SharedIntegrator<T> = Arc<Mutex<dyn Integrator<T>>>;
