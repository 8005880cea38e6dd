//! Solvers for optimization problems — minimizing or maximizing an objective.
//!
//! An [`OptimizationProblem`] maps solver variables `x: [f64; N]` to model
//! inputs, calls the model, and extracts a scalar objective. Solvers in this
//! module search for the `x` that minimizes or maximizes that objective.
//!
//! # Solvers
//!
//! - [`newuoa`] — derivative-free trust-region search over `N ≥ 2` variables
//!   using quadratic interpolation models
//!
//! [`OptimizationProblem`]: quadra_core::OptimizationProblem

pub mod newuoa;
