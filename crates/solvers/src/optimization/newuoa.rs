//! NEWUOA: unconstrained derivative-free minimization by quadratic
//! interpolation within a trust region.
//!
//! # Algorithm
//!
//! The solver keeps `npt` sample points (by default `2n + 1`) and a
//! quadratic model that interpolates the objective at all of them. Each
//! iteration either minimizes the model within a trust region of radius
//! `Δ` around the best point and evaluates the objective there, or, when
//! the sample set has become badly spread, moves one point to improve the
//! geometry of the set. A new value replaces exactly one sample point,
//! and both the model and the inverse of the interpolation system are
//! updated in place by rank-limited corrections, never refactorized.
//!
//! The lower bound `ρ` on `Δ` starts at the initial radius and shrinks
//! toward the final radius whenever no more progress is possible at the
//! current resolution. The run ends once `ρ` reaches the final radius.
//!
//! # When to Use
//!
//! NEWUOA is appropriate when:
//! - The objective is smooth but derivatives are unavailable or unreliable
//! - Each evaluation is expensive compared with `O(n²)` to `O(n⁴)`
//!   arithmetic per iteration
//! - There are at least two variables and at most a few hundred
//!
//! # Limitations
//!
//! - **Unconstrained**: variables are not bounded
//! - **Local**: converges to a local minimum near the starting point
//! - **Smoothness**: noisy objectives make the model unreliable and may end
//!   the run with [`Status::ModelStalled`]
//!
//! # Entry Points
//!
//! - [`minimize_fn`] and [`minimize_fn_in`] take a plain closure over a
//!   slice of any [`Scalar`] and write the best point back into the slice.
//! - [`minimize`], [`maximize`] and their `_unobserved` forms run a
//!   [`Model`] through an [`OptimizationProblem`] and report observer events.
//!
//! # Observer Events
//!
//! The model/problem entry points emit one [`Event`] per evaluation,
//! including the initial stencil:
//!
//! - [`Event::Evaluated`] — evaluation succeeded
//! - [`Event::ModelFailed`] — model returned an error
//! - [`Event::ProblemFailed`] — problem returned an error (input or objective)
//!
//! Each event includes the [`StepKind`] that produced it, the best point so
//! far, and the current [`Radius`]. Observers can return
//! [`Action::StopEarly`] to halt immediately, or [`Action::AssumeWorse`] to
//! treat the point as giving no improvement. A non-finite objective is
//! always treated as giving no improvement: the engine stores a finite
//! barrier value above every value seen so far in its place, so the point
//! is replaced in due course and never becomes the best one.
//!
//! [`Model`]: quadra_core::Model
//! [`OptimizationProblem`]: quadra_core::OptimizationProblem

mod action;
mod angle;
mod config;
mod denominator;
mod driver;
mod error;
mod event;
mod init;
mod lagrange;
mod matrix;
mod objective;
mod point;
mod quadratic;
mod sample;
mod scalar;
mod search;
mod solution;
mod step;
mod store;
mod trust_region;
mod update;
mod workspace;

#[cfg(test)]
mod testing;

pub use action::Action;
pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::Event;
pub use point::Point;
pub use scalar::Scalar;
pub use solution::{Solution, Status, Summary};
pub use step::{Radius, StepKind};
pub use workspace::Workspace;

use quadra_core::{Model, Observer, OptimizationProblem};

use driver::{Driver, Settings};
use objective::FnObjective;
use quadratic::QuadraticModel;
use search::search;
use store::InterpolationSet;

/// Minimizes a closure of `x.len()` variables.
///
/// `x` holds the initial guess on entry and the best point found on exit.
///
/// # Errors
///
/// Returns an error if the configuration does not fit `x.len()`, checked
/// before any evaluation, or if no value of the initial stencil is finite.
pub fn minimize_fn<T, F>(x: &mut [T], objective: F, config: &Config) -> Result<Summary<T>, Error>
where
    T: Scalar,
    F: FnMut(&[T]) -> T,
{
    let npt = config.interpolation_points(x.len())?;
    let mut ws = Workspace::new(x.len(), npt)?;
    run_fn(&mut ws, x, objective, config)
}

/// Minimizes a closure using a caller-owned [`Workspace`].
///
/// Behaves like [`minimize_fn`], but reuses `ws` instead of allocating.
/// The workspace is reallocated only if its dimensions do not match
/// `x.len()` and the configured number of interpolation points.
///
/// # Errors
///
/// Returns the same errors as [`minimize_fn`].
pub fn minimize_fn_in<T, F>(
    ws: &mut Workspace<T>,
    x: &mut [T],
    objective: F,
    config: &Config,
) -> Result<Summary<T>, Error>
where
    T: Scalar,
    F: FnMut(&[T]) -> T,
{
    let n = x.len();
    let npt = config.interpolation_points(n)?;
    if ws.dimensions() != (n, npt) {
        *ws = Workspace::new(n, npt)?;
    }
    run_fn(ws, x, objective, config)
}

fn run_fn<T, F>(ws: &mut Workspace<T>, x: &mut [T], objective: F, config: &Config) -> Result<Summary<T>, Error>
where
    T: Scalar,
    F: FnMut(&[T]) -> T,
{
    let finish = Driver::new(ws, FnObjective(objective), settings(config)).run(x)?;
    Ok(Summary {
        status: finish.status,
        objective: finish.fopt,
        evals: finish.evals,
        rho: finish.rho,
    })
}

/// Converts the radii to `T`, keeping them positive and finite.
fn settings<T: Scalar>(config: &Config) -> Settings<T> {
    let rho_begin = T::lit(config.initial_radius()).min(T::max_value());
    let rho_end = T::lit(config.final_radius())
        .max(T::min_positive_value())
        .min(rho_begin);
    Settings {
        rho_begin,
        rho_end,
        max_evals: config.max_evals(),
    }
}

/// Finds a minimum of the objective using NEWUOA.
///
/// The observer receives an [`Event`] for each evaluation.
/// See the [module docs](self) for details on events and observer actions.
///
/// # Errors
///
/// Returns an error if the configuration is invalid for `N`, if the
/// initial stencil has no finite value, or if the model or problem fails
/// and the observer does not return [`Action::AssumeWorse`] to recover.
pub fn minimize<M, P, Obs, const N: usize>(
    model: &M,
    problem: &P,
    x0: [f64; N],
    config: &Config,
    observer: Obs,
) -> Result<Solution<M::Input, M::Output, N>, Error>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M, P, N>, Action>,
{
    search(model, problem, x0, config, observer, |v| v)
}

/// Finds a minimum of the objective without observer support.
///
/// This is a convenience wrapper around [`minimize`] that uses a no-op observer.
///
/// # Errors
///
/// Returns an error if the configuration is invalid for `N`, if the
/// initial stencil has no finite value, or if the model or problem fails.
pub fn minimize_unobserved<M, P, const N: usize>(
    model: &M,
    problem: &P,
    x0: [f64; N],
    config: &Config,
) -> Result<Solution<M::Input, M::Output, N>, Error>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
{
    minimize(model, problem, x0, config, ())
}

/// Finds a maximum of the objective using NEWUOA.
///
/// The observer receives an [`Event`] for each evaluation.
/// See the [module docs](self) for details on events and observer actions.
///
/// # Errors
///
/// Returns an error if the configuration is invalid for `N`, if the
/// initial stencil has no finite value, or if the model or problem fails
/// and the observer does not return [`Action::AssumeWorse`] to recover.
pub fn maximize<M, P, Obs, const N: usize>(
    model: &M,
    problem: &P,
    x0: [f64; N],
    config: &Config,
    observer: Obs,
) -> Result<Solution<M::Input, M::Output, N>, Error>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M, P, N>, Action>,
{
    search(model, problem, x0, config, observer, |v| -v)
}

/// Finds a maximum of the objective without observer support.
///
/// This is a convenience wrapper around [`maximize`] that uses a no-op observer.
///
/// # Errors
///
/// Returns an error if the configuration is invalid for `N`, if the
/// initial stencil has no finite value, or if the model or problem fails.
pub fn maximize_unobserved<M, P, const N: usize>(
    model: &M,
    problem: &P,
    x0: [f64; N],
    config: &Config,
) -> Result<Solution<M::Input, M::Output, N>, Error>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
{
    maximize(model, problem, x0, config, ())
}
