use quadra_core::{Model, Observer, OptimizationProblem};
use quadra_solvers::optimization::newuoa::{Action, Event};
use tracing::{info, warn};

/// An observer that logs every NEWUOA event through `tracing` and never
/// intervenes.
///
/// Successful evaluations are logged at `info` and failures at `warn`.
/// Evaluations that improve on the best point so far are flagged.
#[derive(Debug, Clone, Default)]
pub struct TraceObserver {
    evals: usize,
    improvements: usize,
}

impl TraceObserver {
    /// Creates a new trace observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of events observed.
    #[must_use]
    pub fn evals(&self) -> usize {
        self.evals
    }

    /// Returns how many evaluations improved on the best point so far.
    #[must_use]
    pub fn improvements(&self) -> usize {
        self.improvements
    }
}

impl<M, P, const N: usize> Observer<Event<'_, M, P, N>, Action> for TraceObserver
where
    M: Model,
    P: OptimizationProblem<N, Input = M::Input, Output = M::Output>,
{
    fn observe(&mut self, event: &Event<'_, M, P, N>) -> Option<Action> {
        self.evals += 1;
        let radius = event.radius();
        let step = event.step();

        match event {
            Event::Evaluated { point, best, .. } => {
                let improved = best.is_none_or(|best| point.objective < best.objective);
                if improved {
                    self.improvements += 1;
                }
                info!(
                    eval = self.evals,
                    ?step,
                    x = ?point.x,
                    objective = point.objective,
                    improved,
                    rho = radius.rho,
                    delta = radius.delta,
                    "newuoa evaluation"
                );
            }
            Event::ModelFailed { x, error, .. } => {
                warn!(eval = self.evals, ?step, ?x, %error, "newuoa model failed");
            }
            Event::ProblemFailed { x, error, .. } => {
                warn!(eval = self.evals, ?step, ?x, %error, "newuoa problem failed");
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    use approx::assert_relative_eq;
    use quadra_solvers::optimization::newuoa::{Config, minimize, minimize_unobserved};

    struct Ridge;

    impl Model for Ridge {
        type Input = [f64; 3];
        type Output = f64;
        type Error = Infallible;

        fn call(&self, x: &[f64; 3]) -> Result<f64, Self::Error> {
            Ok((x[0] - 0.5).powi(2) + 4.0 * (x[1] - x[0]).powi(2) + x[2].powi(2))
        }
    }

    struct Output;

    impl OptimizationProblem<3> for Output {
        type Input = [f64; 3];
        type Output = f64;
        type Error = Infallible;

        fn input(&self, x: &[f64; 3]) -> Result<Self::Input, Self::Error> {
            Ok(*x)
        }

        fn objective(&self, _input: &[f64; 3], output: &f64) -> Result<f64, Self::Error> {
            Ok(*output)
        }
    }

    #[test]
    fn counts_events_without_changing_the_run() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let config = Config::new(0.5, 1e-6, 1000).unwrap();
        let mut observer = TraceObserver::new();

        let observed = minimize(&Ridge, &Output, [0.0, 1.0, 1.0], &config, |event: &Event<'_, _, _, 3>| {
            observer.observe(event)
        });
        let plain = minimize_unobserved(&Ridge, &Output, [0.0, 1.0, 1.0], &config).unwrap();
        let observed = observed.unwrap();

        assert_eq!(observed.x, plain.x);
        assert_relative_eq!(observed.objective, plain.objective);
        assert_eq!(observer.evals(), observed.evals);
        assert!(observer.improvements() >= 1);
        assert!(observer.improvements() < observer.evals());
    }
}
