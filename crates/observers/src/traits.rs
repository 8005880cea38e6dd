//! Capability traits for cross-solver observers.
//!
//! These traits abstract over solver-specific event and action types, enabling
//! observers to work generically across different solvers.
//!
//! # Event traits
//!
//! - [`HasObjective`] — events that carry an objective value
//!
//! # Action traits
//!
//! - [`CanStopEarly`] — actions that can signal early termination
//! - [`CanAssumeWorse`] — actions that can signal a no-improvement outcome
//!
//! # Example
//!
//! ```rust
//! use quadra_core::Observer;
//! use quadra_observers::traits::{CanStopEarly, HasObjective};
//!
//! struct GoodEnough {
//!     target: f64,
//! }
//!
//! impl<E: HasObjective, A: CanStopEarly> Observer<E, A> for GoodEnough {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.objective() < self.target).then(A::stop_early)
//!     }
//! }
//! ```

use quadra_core::{Model, OptimizationProblem};

use quadra_solvers::optimization::newuoa;

/// An event that carries an objective value.
pub trait HasObjective {
    /// Returns the objective for this event.
    ///
    /// Returns `f64::NAN` when the event represents an error and no objective
    /// is available.
    fn objective(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

/// An action type that can signal a no-improvement outcome.
pub trait CanAssumeWorse {
    /// Returns the action that treats this evaluation as no improvement.
    fn assume_worse() -> Self;
}

impl<M, P, const N: usize> HasObjective for newuoa::Event<'_, M, P, N>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
{
    fn objective(&self) -> f64 {
        match self {
            newuoa::Event::Evaluated { point, .. } => point.objective,
            newuoa::Event::ModelFailed { .. } | newuoa::Event::ProblemFailed { .. } => f64::NAN,
        }
    }
}

impl CanStopEarly for newuoa::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}

impl CanAssumeWorse for newuoa::Action {
    fn assume_worse() -> Self {
        Self::AssumeWorse
    }
}
