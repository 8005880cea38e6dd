use super::{Error, Radius, Scalar, StepKind};

/// What the engine learns from one objective call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Outcome<T> {
    /// The objective value, which may still be non-finite.
    Value(T),

    /// No usable value; the engine substitutes its barrier value.
    Rejected,

    /// Stop now and report the best point so far.
    Stop,
}

/// Context passed along with each evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct EvalContext {
    pub(super) step: StepKind,
    pub(super) radius: Radius,
}

/// The black-box callback seen by the engine.
pub(super) trait Objective<T: Scalar> {
    /// Evaluates the objective at the absolute position `x`.
    fn evaluate(&mut self, x: &[T], context: EvalContext) -> Result<Outcome<T>, Error>;
}

/// Adapts a plain closure.
pub(super) struct FnObjective<F>(pub(super) F);

impl<T, F> Objective<T> for FnObjective<F>
where
    T: Scalar,
    F: FnMut(&[T]) -> T,
{
    fn evaluate(&mut self, x: &[T], _context: EvalContext) -> Result<Outcome<T>, Error> {
        Ok(Outcome::Value((self.0)(x)))
    }
}

impl<T: Scalar, O: Objective<T>> Objective<T> for &mut O {
    fn evaluate(&mut self, x: &[T], context: EvalContext) -> Result<Outcome<T>, Error> {
        (**self).evaluate(x, context)
    }
}
