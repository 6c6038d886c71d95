//! Implementation of different callback functions.
use crate::amplitude::Sum;
use crate::core::IntegrandValue;
use crate::series::Series;

/// Trait for reporting the progress of the adaptive refinement loop.
pub trait Callback<T: IntegrandValue> {
    /// This method is called after each refinement round and may print
    /// information about the current state of the expression.
    fn print(&self, round: usize, expression: &Series<Sum<T>>);
}

/// A callback function that does nothing
pub struct SinkCallback {}

impl<T: IntegrandValue> Callback<T> for SinkCallback {
    fn print(&self, _: usize, _: &Series<Sum<T>>) {}
}

/// A callback function that prints the state of every sum after each round
pub struct SimpleCallback {}

impl<T: IntegrandValue> Callback<T> for SimpleCallback {
    fn print(&self, round: usize, expression: &Series<Sum<T>>) {
        println!("round {} finished.", round);
        for (order, sum) in expression.enumerate_orders() {
            match sum.result() {
                Some(result) => {
                    println!("order {}: E={} [{:?}]", order, result, sum.status());
                }
                None => println!("order {}: not yet computed", order),
            }
        }
    }
}
