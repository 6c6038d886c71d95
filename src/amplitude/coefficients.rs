//! Coefficient series loaded from disk and applied to weighted sums.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use super::sum::WeightedSum;
use crate::core::{Error, IntegrandValue};
use crate::series::Series;

/// Provides one coefficient series per amplitude index, evaluated at the
/// run-time parameters of the amplitude.
pub trait CoefficientSource {
    /// The coefficient series of the amplitude with the given index.
    fn coefficient(
        &self,
        index: usize,
        real_parameters: &[f64],
        complex_parameters: &[Complex64],
    ) -> Result<Series<Complex64>, Error>;
}

/// A coefficient source backed by a closure, for coefficients known at
/// compile time.
pub struct FnCoefficientSource<F> {
    function: F,
}

impl<F> FnCoefficientSource<F>
where
    F: Fn(usize, &[f64], &[Complex64]) -> Result<Series<Complex64>, Error>,
{
    /// Constructor.
    pub const fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> CoefficientSource for FnCoefficientSource<F>
where
    F: Fn(usize, &[f64], &[Complex64]) -> Result<Series<Complex64>, Error>,
{
    fn coefficient(
        &self,
        index: usize,
        real_parameters: &[f64],
        complex_parameters: &[Complex64],
    ) -> Result<Series<Complex64>, Error> {
        (self.function)(index, real_parameters, complex_parameters)
    }
}

/// One monomial of a coefficient: a constant factor times powers of the
/// run-time parameters.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CoefficientTerm {
    /// The constant prefactor.
    pub factor: Complex64,
    /// One exponent per real parameter.
    pub real_powers: Vec<i32>,
    /// One exponent per complex parameter.
    pub complex_powers: Vec<i32>,
}

impl CoefficientTerm {
    fn evaluate(
        &self,
        real_parameters: &[f64],
        complex_parameters: &[Complex64],
    ) -> Result<Complex64, Error> {
        if self.real_powers.len() != real_parameters.len()
            || self.complex_powers.len() != complex_parameters.len()
        {
            return Err(Error::CoefficientStore(format!(
                "term expects {} real and {} complex parameters, got {} and {}",
                self.real_powers.len(),
                self.complex_powers.len(),
                real_parameters.len(),
                complex_parameters.len()
            )));
        }

        let mut value = self.factor;
        for (parameter, power) in real_parameters.iter().zip(&self.real_powers) {
            value *= parameter.powi(*power);
        }
        for (parameter, power) in complex_parameters.iter().zip(&self.complex_powers) {
            value *= parameter.powi(*power);
        }
        Ok(value)
    }
}

/// The on-disk representation of a coefficient series: a list of monomial
/// terms per expansion order.
#[derive(Clone, Debug, Deserialize, Serialize)]
struct StoredCoefficient {
    order_min: i32,
    orders: Vec<Vec<CoefficientTerm>>,
}

/// Coefficient series persisted as JSON files
/// `<directory>/<prefix>_coefficient<index>.json`. Complex factors are stored
/// as `[re, im]` pairs.
pub struct JsonCoefficientStore {
    directory: PathBuf,
    prefix: String,
}

impl JsonCoefficientStore {
    /// Constructor.
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    fn load(&self, index: usize) -> Result<StoredCoefficient, Error> {
        let path = self
            .directory
            .join(format!("{}_coefficient{}.json", self.prefix, index));
        let file = File::open(&path)
            .map_err(|error| Error::CoefficientStore(format!("{}: {}", path.display(), error)))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|error| Error::CoefficientStore(format!("{}: {}", path.display(), error)))
    }
}

impl CoefficientSource for JsonCoefficientStore {
    fn coefficient(
        &self,
        index: usize,
        real_parameters: &[f64],
        complex_parameters: &[Complex64],
    ) -> Result<Series<Complex64>, Error> {
        let stored = self.load(index)?;
        if stored.orders.is_empty() {
            return Err(Error::CoefficientStore(format!(
                "coefficient {} has no orders",
                index
            )));
        }

        let mut coefficients = Vec::with_capacity(stored.orders.len());
        for terms in &stored.orders {
            let mut value = Complex64::new(0.0, 0.0);
            for term in terms {
                value += term.evaluate(real_parameters, complex_parameters)?;
            }
            coefficients.push(value);
        }
        Ok(Series::new(stored.order_min, coefficients))
    }
}

/// Scales an expression order by order with a coefficient series. The order
/// bounds must agree.
pub fn apply_coefficient<T: IntegrandValue>(
    expression: Series<WeightedSum<T>>,
    coefficient: &Series<T>,
) -> Result<Series<WeightedSum<T>>, Error> {
    expression.try_combine(coefficient.clone(), |sum, factor| sum * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::io::Write;
    use tempfile::tempdir;

    fn store_with(content: &str) -> (tempfile::TempDir, JsonCoefficientStore) {
        let dir = tempdir().unwrap();
        let mut file = File::create(dir.path().join("amp_coefficient0.json")).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let store = JsonCoefficientStore::new(dir.path(), "amp");
        (dir, store)
    }

    #[test]
    fn monomials_are_evaluated_at_the_parameters() {
        // (3 + 0i) * s^2  at order -1,  (0 + 1i) * s * m  at order 0
        let json = r#"{
            "order_min": -1,
            "orders": [
                [{"factor": [3.0, 0.0], "real_powers": [2], "complex_powers": [0]}],
                [{"factor": [0.0, 1.0], "real_powers": [1], "complex_powers": [1]}]
            ]
        }"#;
        let (_dir, store) = store_with(json);

        let series = store
            .coefficient(0, &[2.0], &[Complex64::new(0.0, 4.0)])
            .unwrap();

        assert_eq!(series.get_order_min(), -1);
        assert_eq!(series.get_order_max(), 0);
        assert_approx_eq!(series.at(-1).re, 12.0, 1e-15);
        assert_approx_eq!(series.at(-1).im, 0.0, 1e-15);
        // i * 2 * 4i = -8
        assert_approx_eq!(series.at(0).re, -8.0, 1e-15);
        assert_approx_eq!(series.at(0).im, 0.0, 1e-15);
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let json = r#"{
            "order_min": 0,
            "orders": [[{"factor": [1.0, 0.0], "real_powers": [1, 1], "complex_powers": []}]]
        }"#;
        let (_dir, store) = store_with(json);

        assert!(matches!(
            store.coefficient(0, &[2.0], &[]).unwrap_err(),
            Error::CoefficientStore(_)
        ));
    }

    #[test]
    fn coefficients_scale_the_expression_order_by_order() {
        use crate::amplitude::{Integral, WeightedSum};
        use crate::core::{IntegrandContainer, ResultInfo};
        use crate::integrators::{Plain, SharedIntegrator};
        use std::sync::{Arc, Mutex};

        let integrator: SharedIntegrator<f64> = Arc::new(Mutex::new(Plain::default()));
        let integrand =
            IntegrandContainer::new(1, |x: &[f64], _: &mut ResultInfo| x[0]).unwrap();
        let integral = Integral::new(integrator, integrand).into_shared();

        let expression = Series::new(
            -1,
            vec![
                WeightedSum::from_integral(Arc::clone(&integral), 2.0),
                WeightedSum::from_integral(Arc::clone(&integral), 4.0),
            ],
        );
        let coefficient = Series::new(-1, vec![3.0, -0.5]);

        let scaled = apply_coefficient(expression, &coefficient).unwrap();
        assert_eq!(scaled.at(-1).summands()[0].coefficient, 6.0);
        assert_eq!(scaled.at(0).summands()[0].coefficient, -2.0);

        let mismatched = Series::new(0, vec![WeightedSum::from_integral(integral, 1.0)]);
        assert!(matches!(
            apply_coefficient(mismatched, &coefficient).err(),
            Some(Error::SeriesBoundsMismatch { .. })
        ));
    }

    #[test]
    fn missing_files_are_reported() {
        let dir = tempdir().unwrap();
        let store = JsonCoefficientStore::new(dir.path(), "amp");
        assert!(matches!(
            store.coefficient(7, &[], &[]).unwrap_err(),
            Error::CoefficientStore(_)
        ));
    }
}
