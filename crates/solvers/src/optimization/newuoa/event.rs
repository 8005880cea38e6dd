use quadra_core::{Model, Observer, OptimizationProblem};

use super::{Action, Point, Radius, StepKind, sample::Failure};

/// Events emitted by the NEWUOA solver, one per evaluation.
///
/// Every event carries the kind of step that produced the point, the best
/// point seen so far (if any), and the trust-region radii in effect.
pub enum Event<'a, M, P, const N: usize>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
{
    /// Successful evaluation.
    Evaluated {
        /// The evaluated point (x and objective).
        point: Point<N>,

        /// The model input at this point.
        input: &'a M::Input,

        /// The model output at this point.
        output: &'a M::Output,

        /// Why the point was evaluated.
        step: StepKind,

        /// Best point before this evaluation.
        best: Option<Point<N>>,

        /// Trust-region radii at this evaluation.
        radius: Radius,
    },

    /// Model evaluation failed.
    ModelFailed {
        /// The x value where evaluation failed.
        x: [f64; N],

        /// Why the point was evaluated.
        step: StepKind,

        /// Best point so far.
        best: Option<Point<N>>,

        /// Trust-region radii at this evaluation.
        radius: Radius,

        /// The model error.
        error: &'a M::Error,
    },

    /// Problem method failed (input construction or objective computation).
    ProblemFailed {
        /// The x value where evaluation failed.
        x: [f64; N],

        /// Why the point was evaluated.
        step: StepKind,

        /// Best point so far.
        best: Option<Point<N>>,

        /// Trust-region radii at this evaluation.
        radius: Radius,

        /// The problem error.
        error: &'a P::Error,
    },
}

impl<M, P, const N: usize> Event<'_, M, P, N>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
{
    /// Returns the x value that was evaluated (or attempted).
    #[must_use]
    pub fn x(&self) -> [f64; N] {
        match self {
            Self::Evaluated { point, .. } => point.x,
            Self::ModelFailed { x, .. } | Self::ProblemFailed { x, .. } => *x,
        }
    }

    /// Returns the kind of step that produced this evaluation.
    #[must_use]
    pub fn step(&self) -> StepKind {
        match self {
            Self::Evaluated { step, .. }
            | Self::ModelFailed { step, .. }
            | Self::ProblemFailed { step, .. } => *step,
        }
    }

    /// Returns the best point seen before this evaluation.
    #[must_use]
    pub fn best(&self) -> Option<Point<N>> {
        match self {
            Self::Evaluated { best, .. }
            | Self::ModelFailed { best, .. }
            | Self::ProblemFailed { best, .. } => *best,
        }
    }

    /// Returns the trust-region radii at this evaluation.
    #[must_use]
    pub fn radius(&self) -> Radius {
        match self {
            Self::Evaluated { radius, .. }
            | Self::ModelFailed { radius, .. }
            | Self::ProblemFailed { radius, .. } => *radius,
        }
    }

    /// Emits a failure event and returns the observer's action.
    pub(super) fn emit_failure<Obs>(
        x: [f64; N],
        step: StepKind,
        best: Option<Point<N>>,
        radius: Radius,
        error: &Failure<M::Error, P::Error>,
        observer: &mut Obs,
    ) -> Option<Action>
    where
        Obs: for<'a> Observer<Event<'a, M, P, N>, Action>,
    {
        match error {
            Failure::Model(e) => {
                let event = Event::ModelFailed {
                    x,
                    step,
                    best,
                    radius,
                    error: e,
                };
                observer.observe(&event)
            }
            Failure::Input(e) | Failure::Objective(e) => {
                let event = Event::ProblemFailed {
                    x,
                    step,
                    best,
                    radius,
                    error: e,
                };
                observer.observe(&event)
            }
        }
    }
}
