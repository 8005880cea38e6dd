use quadra_core::{Model, OptimizationProblem, Snapshot};

use super::Point;

/// One model/problem evaluation at a solver point.
#[derive(Debug, Clone)]
pub(super) struct Sample<I, O, const N: usize> {
    /// The point with its objective as the problem reported it.
    pub(super) point: Point<N>,

    /// The objective oriented for minimization, if it is finite.
    pub(super) score: Option<f64>,

    pub(super) snapshot: Snapshot<I, O>,
}

/// Where in an evaluation a failure happened.
#[derive(Debug, thiserror::Error)]
pub(super) enum Failure<ME, PE> {
    #[error("mapping x to model input failed")]
    Input(#[source] PE),

    #[error("model call failed")]
    Model(#[source] ME),

    #[error("objective computation failed")]
    Objective(#[source] PE),
}

pub(super) type SampleResult<M, P, const N: usize> = Result<
    Sample<<M as Model>::Input, <M as Model>::Output, N>,
    Failure<<M as Model>::Error, <P as OptimizationProblem<N>>::Error>,
>;

/// Evaluates the model at the engine's point `x`.
///
/// `orient` turns the reported objective into the value the engine
/// minimizes. A non-finite oriented value leaves `score` empty so the
/// engine treats the point as no improvement.
pub(super) fn sample<M, P, F, const N: usize>(
    model: &M,
    problem: &P,
    x: &[f64],
    orient: &F,
) -> SampleResult<M, P, N>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
    F: Fn(f64) -> f64,
{
    let mut at = [0.0; N];
    at.copy_from_slice(x);

    let input = problem.input(&at).map_err(Failure::Input)?;
    let output = model.call(&input).map_err(Failure::Model)?;
    let objective = problem
        .objective(&input, &output)
        .map_err(Failure::Objective)?;
    let oriented = orient(objective);

    Ok(Sample {
        point: Point::new(at, objective),
        score: oriented.is_finite().then_some(oriented),
        snapshot: Snapshot::new(input, output),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    /// Squared norm of a 2-vector; fails for negative first components.
    struct SquaredNorm;

    #[derive(Debug, thiserror::Error)]
    #[error("negative x[0]")]
    struct Negative;

    impl Model for SquaredNorm {
        type Input = [f64; 2];
        type Output = f64;
        type Error = Negative;

        fn call(&self, x: &[f64; 2]) -> Result<f64, Self::Error> {
            if x[0] < 0.0 {
                return Err(Negative);
            }
            Ok(x[0] * x[0] + x[1] * x[1])
        }
    }

    /// Shifts `x[0]` by one, refuses `x[1] > 10`, and reports `1/output`.
    struct Reciprocal;

    #[derive(Debug, thiserror::Error)]
    enum Refused {
        #[error("x[1] out of range")]
        Range,
        #[error("output is not a number")]
        NotANumber,
    }

    impl OptimizationProblem<2> for Reciprocal {
        type Input = [f64; 2];
        type Output = f64;
        type Error = Refused;

        fn input(&self, x: &[f64; 2]) -> Result<Self::Input, Self::Error> {
            if x[1] > 10.0 {
                return Err(Refused::Range);
            }
            Ok([x[0] + 1.0, x[1]])
        }

        fn objective(&self, _input: &[f64; 2], output: &f64) -> Result<f64, Self::Error> {
            if output.is_nan() {
                return Err(Refused::NotANumber);
            }
            Ok(1.0 / output)
        }
    }

    #[test]
    fn orients_the_objective_and_keeps_the_reported_one() {
        let s = sample(&SquaredNorm, &Reciprocal, &[1.0, 2.0], &|v: f64| -v).unwrap();

        assert_eq!(s.point.x, [1.0, 2.0]);
        assert_eq!(s.snapshot.input, [2.0, 2.0]);
        assert_relative_eq!(s.snapshot.output, 8.0);
        assert_relative_eq!(s.point.objective, 0.125);
        assert_relative_eq!(s.score.unwrap(), -0.125);
    }

    #[test]
    fn non_finite_objective_has_no_score() {
        let s = sample(&SquaredNorm, &Reciprocal, &[-1.0, 0.0], &|v: f64| v).unwrap();

        assert!(s.point.objective.is_infinite());
        assert_eq!(s.score, None);
    }

    #[test]
    fn failures_name_the_stage() {
        let input = sample(&SquaredNorm, &Reciprocal, &[0.0, 11.0], &|v: f64| v).unwrap_err();
        assert!(matches!(input, Failure::Input(Refused::Range)));

        let model = sample(&SquaredNorm, &Reciprocal, &[-2.0, 0.0], &|v: f64| v).unwrap_err();
        assert!(matches!(model, Failure::Model(Negative)));

        let objective = sample(&SquaredNorm, &Reciprocal, &[f64::NAN, 0.0], &|v: f64| v).unwrap_err();
        assert!(matches!(objective, Failure::Objective(Refused::NotANumber)));
    }
}
