//! Weighted sums of integrals, refined adaptively to an accuracy goal.

pub mod coefficients;
pub mod handler;
pub mod integral;
pub mod sum;

pub use coefficients::{
    apply_coefficient, CoefficientSource, CoefficientTerm, FnCoefficientSource,
    JsonCoefficientStore,
};
pub use handler::{AmplitudeResult, EvaluationOptions, Sum, SumStatus, WeightedIntegralHandler};
pub use integral::{Integral, SharedIntegral};
pub use sum::{WeightedIntegral, WeightedSum};
