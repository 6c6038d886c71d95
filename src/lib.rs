#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

//! The crate `ampir` evaluates amplitudes given as weighted sums of
//! multi-dimensional [integrals] to a caller-specified accuracy. Instead of
//! integrating every constituent as precisely as possible, an adaptive loop
//! spends function evaluations where they reduce the uncertainty of the
//! *sums* the most.
//!
//! # Features
//!
//! This library was designed with the following features as essential in mind:
//!
//! - **Pluggable integration backends**. Every integral is bound to an
//! [`Integrator`](integrators::Integrator): plain Monte Carlo, a randomised
//! rank-1 lattice rule, or deterministic Gauss-Legendre quadrature. Backends
//! report their error scaling, so the refinement loop can extrapolate how
//! many additional evaluations a requested accuracy costs.
//! - **Shared integrals**. The same integral may enter several sums with
//! different coefficients. Integrals are shared by reference, computed once
//! per round, and their evaluation budget is the maximum of what the sums
//! containing them request.
//! - **Monotonic budgets, cached results**. An
//! [`Integral`](amplitude::Integral) never discards work: budgets only grow,
//! recomputing without a larger budget is free, and backends with discrete
//! levels record the rounded budget they actually spent.
//! - **Complex-aware error control**. Complex results track the
//! uncertainties of their real and imaginary parts separately, and a sum
//! only counts as converged when every component meets the tolerance.
//! - **Contour deformation**. For integrands that need a deformed
//! integration contour, the [`deformation`] module optimizes the deformation
//! parameters by Sobol presampling and guards every later sample with the
//! same sign check.
//! - **Reproducibility**. All sampling backends are generic over the random
//! number generator, and results depend only on the chosen seeds.
//!
//! # What is ...?
//!
//! Given integrals $I_k$ over the unit hypercube and coefficients $c_k$, an
//! *amplitude* is a collection of weighted sums
//!
//! $$ A_j = \sum_k c_{jk} I_k $$
//!
//! indexed by the expansion order of a [`Series`](series::Series). We use the
//! following terms:
//!
//! - the *budget* of an integral is the number of times its integrand may be
//! evaluated in the next compute;
//! - a sum is *converged* when each uncertainty component is below
//! $\max(\epsilon_\mathrm{rel} |A_j|, \epsilon_\mathrm{abs})$;
//! - a *round* computes every integral whose budget grew, recombines the
//! sums, and raises the budgets of the integrals of unconverged sums;
//! - the *scale exponent* $p$ of a backend describes how its uncertainty
//! falls with the budget, $\sigma \propto N^{-p}$.
//!
//! [integrals]: https://en.wikipedia.org/wiki/Integral

pub mod amplitude;
pub mod callbacks;
pub mod core;
pub mod deformation;
pub mod integrators;
pub mod series;

pub use crate::core::*;
