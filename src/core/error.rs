//! The error type shared by all modules of this crate.

use thiserror::Error;

/// Errors reported by containers, integrators, integrals and the deformation
/// optimizer.
///
/// Non-convergence of a weighted sum within its evaluation budget is *not* an
/// error; it is reported through the sum's status flag instead.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// An integrand container was constructed with dimensionality zero.
    #[error("integrand containers must have at least one integration variable")]
    ZeroDimension,

    /// Two integrand containers of different dimensionality were added.
    #[error("cannot add integrand containers of dimension {lhs} and {rhs}")]
    DimensionMismatch {
        /// Dimensionality of the left operand.
        lhs: usize,
        /// Dimensionality of the right operand.
        rhs: usize,
    },

    /// A result getter was called on an [`Integral`](crate::amplitude::Integral)
    /// before its first `compute`.
    #[error("{what} called before compute")]
    NotComputed {
        /// Name of the getter that was called too early.
        what: &'static str,
    },

    /// The requested evaluation budget exceeds the largest discrete level the
    /// integrator supports.
    #[error(
        "the requested number_of_function_evaluations ({requested}) exceeds \
         the largest available lattice ({largest})"
    )]
    EvaluationLimit {
        /// The evaluation count that was requested.
        requested: u64,
        /// The largest evaluation count the integrator can provide.
        largest: u64,
    },

    /// The integrand has more integration variables than the integrator's
    /// generating vectors support.
    #[error(
        "the integrand is {dimension}-dimensional but the generating vectors \
         only support {supported} dimensions"
    )]
    DimensionLimit {
        /// Dimensionality of the integrand.
        dimension: usize,
        /// Largest dimensionality the integrator supports.
        supported: usize,
    },

    /// A Sobol sequence of unsupported dimensionality was requested.
    #[error(
        "Sobol sequences are only implemented up to {supported} dimensions \
         (need {requested}); set the deformation parameters manually"
    )]
    SobolDimension {
        /// The requested dimensionality.
        requested: usize,
        /// The largest supported dimensionality.
        supported: usize,
    },

    /// Two series with different truncation bounds were combined.
    #[error(
        "cannot combine series with orders [{lhs_min}, {lhs_max}] and \
         [{rhs_min}, {rhs_max}]"
    )]
    SeriesBoundsMismatch {
        /// Lowest order of the left operand.
        lhs_min: i32,
        /// Highest order of the left operand.
        lhs_max: i32,
        /// Lowest order of the right operand.
        rhs_min: i32,
        /// Highest order of the right operand.
        rhs_max: i32,
    },

    /// The contour deformation sign check could not be satisfied during
    /// presampling.
    #[error(
        "contour deformation in sector {sector_id}, order {orders:?} yields \
         the wrong sign of the deformation polynomial; choose a larger number \
         of presamples or decrease the deformation parameters"
    )]
    SignCheck {
        /// Identifier of the sector whose deformation failed.
        sector_id: u32,
        /// Regulator orders of the failing term.
        orders: Vec<i32>,
    },

    /// A deformed integrand reported a sign-check violation while it was
    /// being integrated.
    #[error("sign check failed during integration: {0}")]
    SignCheckDuringIntegration(String),

    /// The handler was configured with unusable tolerances or budgets.
    #[error("invalid tolerance configuration: {0}")]
    InvalidTolerance(String),

    /// A persisted coefficient series could not be read or evaluated.
    #[error("cannot read coefficient series: {0}")]
    CoefficientStore(String),
}
