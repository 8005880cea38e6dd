use quadra_core::{Model, Observer, OptimizationProblem, Snapshot};

use super::{
    Action, Config, Error, Event, Point, Solution, Workspace,
    driver::Driver,
    objective::{EvalContext, Objective, Outcome},
    sample::{Sample, sample},
    settings,
};

/// Core NEWUOA search over a model and problem.
///
/// The `transform` function is applied to objective values before the
/// engine sees them, allowing the same algorithm to handle both
/// minimization (transform = identity) and maximization (transform =
/// negation). Reported objectives are never transformed.
pub(super) fn search<M, P, Obs, F, const N: usize>(
    model: &M,
    problem: &P,
    x0: [f64; N],
    config: &Config,
    observer: Obs,
    transform: F,
) -> Result<Solution<M::Input, M::Output, N>, Error>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M, P, N>, Action>,
    F: Fn(f64) -> f64,
{
    let npt = config.interpolation_points(N)?;
    let mut ws = Workspace::new(N, npt)?;

    let mut objective = Observed {
        model,
        problem,
        observer,
        transform,
        best: None,
    };
    let mut x = x0;
    let finish = Driver::new(&mut ws, &mut objective, settings(config)).run(&mut x)?;

    let Best { point, snapshot, .. } = objective.best.ok_or(Error::NoEvaluations)?;
    Ok(Solution {
        status: finish.status,
        x: point.x,
        objective: point.objective,
        snapshot,
        evals: finish.evals,
    })
}

/// The best successful evaluation so far.
struct Best<I, O, const N: usize> {
    point: Point<N>,
    score: f64,
    snapshot: Snapshot<I, O>,
}

/// Presents a model and problem to the engine as an objective, emitting
/// one event per evaluation and tracking the best snapshot.
struct Observed<'m, M, P, Obs, F, const N: usize>
where
    M: Model,
{
    model: &'m M,
    problem: &'m P,
    observer: Obs,
    transform: F,
    best: Option<Best<M::Input, M::Output, N>>,
}

impl<M, P, Obs, F, const N: usize> Observed<'_, M, P, Obs, F, N>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
    F: Fn(f64) -> f64,
{
    fn best_point(&self) -> Option<Point<N>> {
        self.best.as_ref().map(|best| best.point)
    }

    /// Keeps `sampled` if it has a score better than the best so far.
    fn record(&mut self, sampled: Sample<M::Input, M::Output, N>) {
        let Some(score) = sampled.score else {
            return;
        };
        if self.best.as_ref().is_none_or(|best| score < best.score) {
            self.best = Some(Best {
                point: sampled.point,
                score,
                snapshot: sampled.snapshot,
            });
        }
    }
}

impl<M, P, Obs, F, const N: usize> Objective<f64> for Observed<'_, M, P, Obs, F, N>
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M, P, N>, Action>,
    F: Fn(f64) -> f64,
{
    fn evaluate(&mut self, x: &[f64], context: EvalContext) -> Result<Outcome<f64>, Error> {
        let EvalContext { step, radius } = context;
        let best = self.best_point();

        match sample(self.model, self.problem, x, &self.transform) {
            Ok(sampled) => {
                let event = Event::Evaluated {
                    point: sampled.point,
                    input: &sampled.snapshot.input,
                    output: &sampled.snapshot.output,
                    step,
                    best,
                    radius,
                };
                match self.observer.observe(&event) {
                    Some(Action::AssumeWorse) => Ok(Outcome::Rejected),
                    Some(Action::StopEarly) => {
                        self.record(sampled);
                        Ok(Outcome::Stop)
                    }
                    None => {
                        let outcome = sampled.score.map_or(Outcome::Rejected, Outcome::Value);
                        self.record(sampled);
                        Ok(outcome)
                    }
                }
            }
            Err(e) => {
                let mut point = [0.0; N];
                point.copy_from_slice(x);
                let action = Event::emit_failure(point, step, best, radius, &e, &mut self.observer);
                match action {
                    Some(Action::StopEarly) => Ok(Outcome::Stop),
                    Some(Action::AssumeWorse) => Ok(Outcome::Rejected),
                    None => Err(e.into()),
                }
            }
        }
    }
}
