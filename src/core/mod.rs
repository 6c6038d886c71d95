//! Integrand containers and the scalar types they evaluate to.

pub mod error;
pub mod estimators;
pub mod uncertainties;

pub use error::Error;
pub use uncertainties::UncorrelatedDeviation;

use num_complex::Complex64;
use num_traits::{One, Zero};
use std::fmt::{self, Debug, Display};
use std::ops::{Add, AddAssign};
use std::sync::Arc;

/// The largest number of real components any [`IntegrandValue`] carries.
pub(crate) const MAX_COMPONENTS: usize = 2;

/// Scalar types an integrand may evaluate to.
///
/// Implemented for `f64` and [`Complex64`]. The component view lets
/// accumulators and convergence checks treat the real and imaginary parts of
/// a complex result as independently estimated quantities.
pub trait IntegrandValue:
    Copy
    + Debug
    + Display
    + PartialEq
    + Zero
    + One
    + AddAssign
    + Send
    + Sync
    + 'static
{
    /// The number of real components, at most [`MAX_COMPONENTS`].
    const COMPONENTS: usize;

    /// Returns the real component with the given index.
    fn component(&self, index: usize) -> f64;

    /// Builds a value from its real components.
    fn from_components(components: &[f64]) -> Self;

    /// Returns the modulus of the value.
    fn modulus(&self) -> f64;

    /// Returns `true` if every component is finite.
    fn is_finite(&self) -> bool;

    /// Multiplies every component by a real factor.
    fn scale(&self, factor: f64) -> Self;
}

impl IntegrandValue for f64 {
    const COMPONENTS: usize = 1;

    fn component(&self, index: usize) -> f64 {
        debug_assert_eq!(index, 0);
        *self
    }

    fn from_components(components: &[f64]) -> Self {
        components[0]
    }

    fn modulus(&self) -> f64 {
        self.abs()
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }

    fn scale(&self, factor: f64) -> Self {
        self * factor
    }
}

impl IntegrandValue for Complex64 {
    const COMPONENTS: usize = 2;

    fn component(&self, index: usize) -> f64 {
        match index {
            0 => self.re,
            _ => self.im,
        }
    }

    fn from_components(components: &[f64]) -> Self {
        Self::new(components[0], components[1])
    }

    fn modulus(&self) -> f64 {
        self.norm()
    }

    fn is_finite(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    fn scale(&self, factor: f64) -> Self {
        self * factor
    }
}

/// Side channel an integrand may use to report problems with a sample.
///
/// Deformed integrands record a sign-check violation here; integrators abort
/// the current integration when they see one.
#[derive(Clone, Debug, Default)]
pub struct ResultInfo {
    /// Set when the sample violated the contour-deformation sign check.
    pub sign_check_error: Option<String>,
}

/// The closure type wrapped by an [`IntegrandContainer`].
pub type IntegrandFn<T> = dyn Fn(&[f64], &mut ResultInfo) -> T + Send + Sync;

/// A function of a fixed number of integration variables on the unit
/// hypercube.
#[derive(Clone)]
pub struct IntegrandContainer<T> {
    number_of_integration_variables: usize,
    integrand: Arc<IntegrandFn<T>>,
    /// Name used when reporting on this integrand.
    pub display_name: String,
}

impl<T> IntegrandContainer<T> {
    /// Constructor. Fails with [`Error::ZeroDimension`] for a zero-dimensional
    /// integrand.
    pub fn new<F>(number_of_integration_variables: usize, integrand: F) -> Result<Self, Error>
    where
        F: Fn(&[f64], &mut ResultInfo) -> T + Send + Sync + 'static,
    {
        if number_of_integration_variables == 0 {
            return Err(Error::ZeroDimension);
        }
        Ok(Self {
            number_of_integration_variables,
            integrand: Arc::new(integrand),
            display_name: "integrand".to_string(),
        })
    }

    /// Returns the number of integration variables.
    pub const fn number_of_integration_variables(&self) -> usize {
        self.number_of_integration_variables
    }

    /// Evaluates the integrand at the point `x`.
    ///
    /// `x` must have at least `number_of_integration_variables` entries.
    pub fn evaluate(&self, x: &[f64], info: &mut ResultInfo) -> T {
        debug_assert!(x.len() >= self.number_of_integration_variables);
        (self.integrand)(x, info)
    }
}

impl<T: IntegrandValue> IntegrandContainer<T> {
    /// Returns the pointwise sum of two integrands of equal dimensionality.
    pub fn try_add(&self, other: &Self) -> Result<Self, Error> {
        if self.number_of_integration_variables != other.number_of_integration_variables {
            return Err(Error::DimensionMismatch {
                lhs: self.number_of_integration_variables,
                rhs: other.number_of_integration_variables,
            });
        }

        let lhs = Arc::clone(&self.integrand);
        let rhs = Arc::clone(&other.integrand);

        Ok(Self {
            number_of_integration_variables: self.number_of_integration_variables,
            integrand: Arc::new(move |x: &[f64], info: &mut ResultInfo| lhs(x, info) + rhs(x, info)),
            display_name: format!("({} + {})", self.display_name, other.display_name),
        })
    }
}

impl<T: IntegrandValue> Add for &IntegrandContainer<T> {
    type Output = Result<IntegrandContainer<T>, Error>;

    fn add(self, other: Self) -> Self::Output {
        self.try_add(other)
    }
}

impl IntegrandContainer<Complex64> {
    /// Returns an integrand evaluating the real part of `self`.
    pub fn real_part(&self) -> IntegrandContainer<f64> {
        self.project(|value| value.re, "Re")
    }

    /// Returns an integrand evaluating the imaginary part of `self`.
    pub fn imag_part(&self) -> IntegrandContainer<f64> {
        self.project(|value| value.im, "Im")
    }

    fn project(
        &self,
        part: fn(Complex64) -> f64,
        label: &str,
    ) -> IntegrandContainer<f64> {
        let integrand = Arc::clone(&self.integrand);
        IntegrandContainer {
            number_of_integration_variables: self.number_of_integration_variables,
            integrand: Arc::new(move |x: &[f64], info: &mut ResultInfo| part(integrand(x, info))),
            display_name: format!("{}({})", label, self.display_name),
        }
    }
}

impl<T> Debug for IntegrandContainer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrandContainer")
            .field(
                "number_of_integration_variables",
                &self.number_of_integration_variables,
            )
            .field("display_name", &self.display_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn zero_dimensional_integrands_are_rejected() {
        let result = IntegrandContainer::new(0, |_x: &[f64], _info: &mut ResultInfo| 1.0);
        assert_eq!(result.unwrap_err(), Error::ZeroDimension);
    }

    #[test]
    fn addition_requires_equal_dimensionality() {
        let lhs =
            IntegrandContainer::new(2, |x: &[f64], _: &mut ResultInfo| x[0] * x[1]).unwrap();
        let rhs = IntegrandContainer::new(3, |x: &[f64], _: &mut ResultInfo| x[2]).unwrap();

        assert_eq!(
            (&lhs + &rhs).unwrap_err(),
            Error::DimensionMismatch { lhs: 2, rhs: 3 }
        );
    }

    #[test]
    fn addition_evaluates_pointwise() {
        let lhs = IntegrandContainer::new(2, |x: &[f64], _: &mut ResultInfo| x[0]).unwrap();
        let rhs = IntegrandContainer::new(2, |x: &[f64], _: &mut ResultInfo| x[1]).unwrap();
        let sum = (&lhs + &rhs).unwrap();

        let mut info = ResultInfo::default();
        assert_approx_eq!(sum.evaluate(&[0.25, 0.5], &mut info), 0.75, 1e-15);
        assert_eq!(sum.number_of_integration_variables(), 2);
    }

    #[test]
    fn complex_integrands_project_onto_components() {
        let integrand = IntegrandContainer::new(1, |x: &[f64], _: &mut ResultInfo| {
            Complex64::new(x[0], -x[0])
        })
        .unwrap();

        let mut info = ResultInfo::default();
        assert_approx_eq!(integrand.real_part().evaluate(&[0.5], &mut info), 0.5, 1e-15);
        assert_approx_eq!(integrand.imag_part().evaluate(&[0.5], &mut info), -0.5, 1e-15);
    }
}
