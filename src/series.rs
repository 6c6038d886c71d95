//! Truncated Laurent series in a single regulator.

use serde::{Deserialize, Serialize};

use crate::core::Error;

/// A contiguous range of expansion coefficients, from `order_min` up to and
/// including `order_min + coefficients.len() - 1`.
///
/// This is a container only; no arithmetic on the expansion parameter is
/// performed.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Series<T> {
    order_min: i32,
    coefficients: Vec<T>,
}

impl<T> Series<T> {
    /// Constructor.
    ///
    /// # Panics
    ///
    /// Panics if `coefficients` is empty.
    pub fn new(order_min: i32, coefficients: Vec<T>) -> Self {
        assert!(
            !coefficients.is_empty(),
            "a series must have at least one coefficient"
        );
        Self {
            order_min,
            coefficients,
        }
    }

    /// Returns the lowest order.
    pub const fn get_order_min(&self) -> i32 {
        self.order_min
    }

    /// Returns the highest order.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn get_order_max(&self) -> i32 {
        self.order_min + self.coefficients.len() as i32 - 1
    }

    /// Returns the number of coefficients.
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Returns `true` if the series has no coefficients. Never the case for a
    /// series built through [`Series::new`].
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Returns the coefficient of the given order.
    ///
    /// # Panics
    ///
    /// Panics if `order` is outside `[get_order_min(), get_order_max()]`.
    pub fn at(&self, order: i32) -> &T {
        &self.coefficients[self.index_of(order)]
    }

    /// Returns the coefficient of the given order mutably.
    ///
    /// # Panics
    ///
    /// Panics if `order` is outside `[get_order_min(), get_order_max()]`.
    pub fn at_mut(&mut self, order: i32) -> &mut T {
        let index = self.index_of(order);
        &mut self.coefficients[index]
    }

    fn index_of(&self, order: i32) -> usize {
        assert!(
            order >= self.order_min && order <= self.get_order_max(),
            "order {} outside series bounds [{}, {}]",
            order,
            self.order_min,
            self.get_order_max()
        );
        (order - self.order_min) as usize
    }

    /// Iterates over the coefficients from lowest to highest order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.coefficients.iter()
    }

    /// Iterates mutably over the coefficients from lowest to highest order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.coefficients.iter_mut()
    }

    /// Iterates over `(order, coefficient)` pairs.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn enumerate_orders(&self) -> impl Iterator<Item = (i32, &T)> {
        let order_min = self.order_min;
        self.coefficients
            .iter()
            .enumerate()
            .map(move |(index, coefficient)| (order_min + index as i32, coefficient))
    }

    /// Applies `f` to every coefficient, keeping the order bounds.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Series<U> {
        Series {
            order_min: self.order_min,
            coefficients: self.coefficients.into_iter().map(f).collect(),
        }
    }

    /// Combines two series coefficient by coefficient. The order bounds must
    /// agree.
    pub fn try_combine<U, V, F>(self, other: Series<U>, mut f: F) -> Result<Series<V>, Error>
    where
        F: FnMut(T, U) -> V,
    {
        if self.order_min != other.order_min || self.len() != other.len() {
            return Err(Error::SeriesBoundsMismatch {
                lhs_min: self.order_min,
                lhs_max: self.get_order_max(),
                rhs_min: other.order_min,
                rhs_max: other.get_order_max(),
            });
        }
        Ok(Series {
            order_min: self.order_min,
            coefficients: self
                .coefficients
                .into_iter()
                .zip(other.coefficients)
                .map(|(lhs, rhs)| f(lhs, rhs))
                .collect(),
        })
    }
}

impl<T: std::ops::Add<Output = T>> Series<T> {
    /// Adds two series with identical order bounds.
    pub fn try_add(self, other: Self) -> Result<Self, Error> {
        self.try_combine(other, |lhs, rhs| lhs + rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_bounds() {
        let series = Series::new(-2, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.get_order_min(), -2);
        assert_eq!(series.get_order_max(), 0);
        assert_eq!(series.len(), 3);
        assert_eq!(*series.at(-2), 1.0);
        assert_eq!(*series.at(0), 3.0);
    }

    #[test]
    #[should_panic(expected = "outside series bounds")]
    fn out_of_range_access_panics() {
        let series = Series::new(0, vec![1.0]);
        let _ = series.at(1);
    }

    #[test]
    fn enumerate_orders_yields_pairs() {
        let series = Series::new(-1, vec![10, 20]);
        let pairs: Vec<_> = series.enumerate_orders().map(|(o, c)| (o, *c)).collect();
        assert_eq!(pairs, vec![(-1, 10), (0, 20)]);
    }

    #[test]
    fn addition_requires_matching_bounds() {
        let lhs = Series::new(0, vec![1.0, 2.0]);
        let rhs = Series::new(1, vec![3.0, 4.0]);
        assert_eq!(
            lhs.try_add(rhs).unwrap_err(),
            Error::SeriesBoundsMismatch {
                lhs_min: 0,
                lhs_max: 1,
                rhs_min: 1,
                rhs_max: 2,
            }
        );

        let lhs = Series::new(0, vec![1.0, 2.0]);
        let rhs = Series::new(0, vec![3.0, 4.0]);
        assert_eq!(lhs.try_add(rhs).unwrap(), Series::new(0, vec![4.0, 6.0]));
    }

    #[test]
    fn map_keeps_bounds() {
        let series = Series::new(-1, vec![1, 2, 3]).map(|c| c * 2);
        assert_eq!(series, Series::new(-1, vec![2, 4, 6]));
    }
}
