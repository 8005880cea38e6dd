//! The outer NEWUOA iteration as an explicit state machine.
//!
//! Each state is handled by one method that performs at most one objective
//! evaluation and returns the next state. The initial stencil lives in
//! [`init`](super::init).

use tracing::{debug, trace, warn};

use super::{
    Error, Radius, Scalar, Status, StepKind, Workspace, denominator, lagrange,
    objective::{EvalContext, Objective, Outcome},
    scalar::{dist_sq, norm_sq},
    trust_region,
    update::{update_factorization, update_model},
};

/// Model steps whose `|1 + αβ/τ²|` is at most this value are recomputed by
/// maximizing the update denominator directly.
const DENOMINATOR_THRESHOLD: f64 = 0.8;

/// Radii and budget of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Settings<T> {
    pub(super) rho_begin: T,
    pub(super) rho_end: T,
    pub(super) max_evals: usize,
}

/// What the engine reports when it stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Finish<T> {
    pub(super) status: Status,
    pub(super) fopt: T,
    pub(super) evals: usize,
    pub(super) rho: T,
}

/// States of the outer iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum State<T> {
    /// Minimize the model within the trust region and try the step.
    TrustRegionStep,

    /// Move point `knew` to improve the geometry, using a step of length `dstep`.
    ModelImprovementStep { knew: usize, dstep: T },

    /// No progress is possible at the current `ρ`.
    ShrinkRho,

    Terminated(Status),
}

/// Outcome of one attempted evaluation, after budget and finiteness checks.
pub(super) enum Eval<T> {
    Value(T),
    Rejected,
    Exhausted,
    Stop,
}

pub(super) struct Driver<'a, T: Scalar, O> {
    pub(super) ws: &'a mut Workspace<T>,
    objective: O,
    rho_end: T,
    max_evals: usize,

    pub(super) rho: T,
    pub(super) delta: T,
    pub(super) nf: usize,
    pub(super) nfsav: usize,
    pub(super) fopt: T,
    pub(super) xoptsq: T,

    /// Largest finite value returned by the objective.
    fmax: T,

    ratio: T,
    dnorm: T,
    crvmin: T,
    diffs: [T; 3],

    /// Set when the last trust-region step was too short to evaluate.
    short_step: bool,
}

impl<'a, T: Scalar, O: Objective<T>> Driver<'a, T, O> {
    pub(super) fn new(ws: &'a mut Workspace<T>, objective: O, settings: Settings<T>) -> Self {
        Self {
            ws,
            objective,
            rho_end: settings.rho_end,
            max_evals: settings.max_evals,
            rho: settings.rho_begin,
            delta: settings.rho_begin,
            nf: 0,
            nfsav: 0,
            fopt: T::infinity(),
            xoptsq: T::zero(),
            fmax: T::neg_infinity(),
            ratio: T::zero(),
            dnorm: T::zero(),
            crvmin: T::zero(),
            diffs: [T::zero(); 3],
            short_step: false,
        }
    }

    /// Runs from `x` until termination, writing the best point back into `x`.
    pub(super) fn run(mut self, x: &mut [T]) -> Result<Finish<T>, Error> {
        let mut state = self.initialize(x)?;
        loop {
            if let State::Terminated(status) = state {
                return Ok(self.finish(status, x));
            }
            state = self.advance(state)?;
        }
    }

    /// Performs one transition.
    pub(super) fn advance(&mut self, state: State<T>) -> Result<State<T>, Error> {
        match state {
            State::TrustRegionStep => self.trust_region_step(),
            State::ModelImprovementStep { knew, dstep } => self.model_improvement_step(knew, dstep),
            State::ShrinkRho => self.shrink_rho(),
            State::Terminated(status) => Ok(State::Terminated(status)),
        }
    }

    fn finish(&self, status: Status, x: &mut [T]) -> Finish<T> {
        for ((x, &base), &offset) in x.iter_mut().zip(&self.ws.set.xbase).zip(&self.ws.xopt) {
            *x = base + offset;
        }
        debug!(
            ?status,
            evals = self.nf,
            fopt = self.fopt.widen(),
            rho = self.rho.widen(),
            "newuoa finished"
        );
        Finish {
            status,
            fopt: self.fopt,
            evals: self.nf,
            rho: self.rho,
        }
    }

    fn trust_region_step(&mut self) -> Result<State<T>, Error> {
        let half = T::lit(0.5);
        let tenth = T::lit(0.1);
        let rho = self.rho;
        self.short_step = false;

        let ws = &mut *self.ws;
        let step = trust_region::solve(
            &ws.model,
            &ws.set.xpt,
            &ws.xopt,
            self.delta,
            &mut ws.d,
            &mut ws.trust,
        );
        let dsq = norm_sq(&ws.d);
        self.dnorm = self.delta.min(dsq.sqrt());
        self.crvmin = step.min_curvature;

        if self.dnorm < half * rho {
            self.short_step = true;
            self.delta = tenth * self.delta;
            self.ratio = -T::one();
            self.floor_delta();
            if self.nf <= self.nfsav + 2 {
                return Ok(self.after_step());
            }
            let curvature = T::lit(0.125) * self.crvmin * rho * rho;
            let recent = self.diffs.iter().fold(T::zero(), |acc, &d| acc.max(d));
            if curvature <= recent {
                return Ok(self.after_step());
            }
            return Ok(State::ShrinkRho);
        }

        self.shift_base_if_far(dsq);
        let ws = &mut *self.ws;
        let beta = ws.set.lagrange_values(&ws.xopt, &ws.d, ws.set.kopt, &mut ws.vlag, &mut ws.wcheck);
        self.prepare_trial();

        let f = match self.evaluate(StepKind::TrustRegion)? {
            Eval::Value(f) => f,
            Eval::Rejected => self.barrier(),
            Eval::Exhausted => return Ok(State::Terminated(Status::MaxEvals)),
            Eval::Stop => return Ok(State::Terminated(Status::StoppedByObserver)),
        };

        let (vquad, diff) = self.prediction_error(f);
        let fsave = self.fopt;
        self.accept_if_better(f);

        if vquad >= T::zero() {
            debug!(evals = self.nf, "trust-region step predicted no decrease");
            return Ok(State::Terminated(Status::ModelStalled));
        }

        self.ratio = (f - fsave) / vquad;
        self.delta = if self.ratio <= tenth {
            half * self.dnorm
        } else if self.ratio <= T::lit(0.7) {
            (half * self.delta).max(self.dnorm)
        } else {
            (half * self.delta).max(self.dnorm + self.dnorm)
        };
        self.floor_delta();

        let Some(knew) = self.choose_replacement(f >= fsave, beta) else {
            return Ok(self.after_step());
        };
        self.replace_point(knew, beta, f, diff, fsave);

        if f <= fsave + tenth * vquad {
            Ok(State::TrustRegionStep)
        } else {
            Ok(self.after_step())
        }
    }

    fn model_improvement_step(&mut self, knew: usize, dstep: T) -> Result<State<T>, Error> {
        self.short_step = false;
        self.shift_base_if_far(dstep * dstep);

        let ws = &mut *self.ws;
        let alpha = lagrange::maximize(&ws.set, &ws.xopt, knew, dstep, &mut ws.d, &mut ws.lagrange);
        let mut beta = ws.set.lagrange_values(&ws.xopt, &ws.d, ws.set.kopt, &mut ws.vlag, &mut ws.wcheck);
        let tau = ws.vlag[knew];
        let test = T::one() + alpha * beta / (tau * tau);
        if test.abs() <= T::lit(DENOMINATOR_THRESHOLD) {
            warn!(
                knew,
                test = test.widen(),
                "small update denominator, maximizing it directly"
            );
            beta = denominator::maximize(
                &ws.set,
                &ws.xopt,
                ws.set.kopt,
                knew,
                &mut ws.d,
                &mut ws.vlag,
                &mut ws.wcheck,
                &mut ws.denominator,
            );
        }
        self.prepare_trial();

        let f = match self.evaluate(StepKind::ModelImprovement)? {
            Eval::Value(f) => f,
            Eval::Rejected => self.barrier(),
            Eval::Exhausted => return Ok(State::Terminated(Status::MaxEvals)),
            Eval::Stop => return Ok(State::Terminated(Status::StoppedByObserver)),
        };

        let (_, diff) = self.prediction_error(f);
        let fsave = self.fopt;
        self.accept_if_better(f);
        self.replace_point(knew, beta, f, diff, fsave);
        Ok(State::TrustRegionStep)
    }

    fn shrink_rho(&mut self) -> Result<State<T>, Error> {
        if self.rho > self.rho_end {
            self.delta = T::lit(0.5) * self.rho;
            let ratio = self.rho / self.rho_end;
            self.rho = if ratio <= T::lit(16.0) {
                self.rho_end
            } else if ratio <= T::lit(250.0) {
                ratio.sqrt() * self.rho_end
            } else {
                T::lit(0.1) * self.rho
            };
            self.delta = self.delta.max(self.rho);
            self.nfsav = self.nf;
            debug!(
                rho = self.rho.widen(),
                evals = self.nf,
                fopt = self.fopt.widen(),
                "reduced rho"
            );
            return Ok(State::TrustRegionStep);
        }

        if self.short_step {
            // One last try of the short step that was never evaluated.
            self.prepare_trial();
            match self.evaluate(StepKind::Final)? {
                Eval::Value(f) if f < self.fopt => {
                    self.fopt = f;
                    let ws = &mut *self.ws;
                    ws.xopt.copy_from_slice(&ws.xnew);
                }
                Eval::Stop => return Ok(State::Terminated(Status::StoppedByObserver)),
                Eval::Value(_) | Eval::Rejected | Eval::Exhausted => {}
            }
        }
        Ok(State::Terminated(Status::Converged))
    }

    /// Chooses what follows a step: a geometry step if some point is far
    /// from `xopt`, another trust-region step, or a reduction of `ρ`.
    fn after_step(&self) -> State<T> {
        let ws = &*self.ws;
        let mut distsq = T::lit(4.0) * self.delta * self.delta;
        let mut far = None;
        for k in 0..ws.set.npt() {
            let sum = dist_sq(ws.set.xpt.row(k), &ws.xopt);
            if sum > distsq {
                far = Some(k);
                distsq = sum;
            }
        }

        if let Some(knew) = far {
            let dstep = (T::lit(0.1) * distsq.sqrt())
                .min(T::lit(0.5) * self.delta)
                .max(self.rho);
            return State::ModelImprovementStep { knew, dstep };
        }
        if self.ratio > T::zero() || self.delta.max(self.dnorm) > self.rho {
            State::TrustRegionStep
        } else {
            State::ShrinkRho
        }
    }

    /// Picks the point to replace by `xnew`, favoring large denominators
    /// and points far from `xopt`. The best point is kept if `xnew` is no
    /// better.
    fn choose_replacement(&self, keep_best: bool, beta: T) -> Option<usize> {
        let ws = &*self.ws;
        let rhosq = (T::lit(0.1) * self.delta).max(self.rho).powi(2);
        let (exclude, mut detrat) = if keep_best {
            (Some(ws.set.kopt), T::one())
        } else {
            (None, T::zero())
        };

        let mut knew = None;
        for k in 0..ws.set.npt() {
            let hdiag = ws.set.diagonal(k);
            let mut temp = (beta * hdiag + ws.vlag[k] * ws.vlag[k]).abs();
            let distsq = dist_sq(ws.set.xpt.row(k), &ws.xopt);
            if distsq > rhosq {
                temp = temp * (distsq / rhosq).powi(3);
            }
            if temp > detrat && Some(k) != exclude {
                detrat = temp;
                knew = Some(k);
            }
        }
        knew
    }

    fn replace_point(&mut self, knew: usize, beta: T, f: T, diff: T, fsave: T) {
        let ws = &mut *self.ws;
        update_factorization(&mut ws.set, &mut ws.vlag, beta, knew, &mut ws.update);
        update_model(&mut ws.set, &mut ws.model, knew, &ws.xnew, f, diff);
        if f < fsave {
            ws.set.kopt = knew;
        }
    }

    /// Returns the model's predicted change for the step and the error of
    /// that prediction, recording the error's magnitude.
    fn prediction_error(&mut self, f: T) -> (T, T) {
        let ws = &*self.ws;
        let vquad = ws.model.predicted_change(&ws.set.xpt, &ws.xopt, &ws.d);
        let diff = f - self.fopt - vquad;
        self.diffs = [diff.abs(), self.diffs[0], self.diffs[1]];
        if self.dnorm > self.rho {
            self.nfsav = self.nf;
        }
        (vquad, diff)
    }

    fn accept_if_better(&mut self, f: T) {
        if f < self.fopt {
            self.fopt = f;
            let ws = &mut *self.ws;
            ws.xopt.copy_from_slice(&ws.xnew);
            self.xoptsq = norm_sq(&ws.xopt);
        }
    }

    /// Moves the base to `xopt` when the step is tiny compared with `‖xopt‖`.
    fn shift_base_if_far(&mut self, dsq: T) {
        if dsq <= T::lit(1e-3) * self.xoptsq {
            let ws = &mut *self.ws;
            ws.set.shift_base(&mut ws.model, &mut ws.xopt, &mut ws.shift);
            self.xoptsq = T::zero();
        }
    }

    /// Sets `xnew = xopt + d` and the absolute trial point `x`.
    fn prepare_trial(&mut self) {
        let ws = &mut *self.ws;
        for i in 0..ws.xnew.len() {
            ws.xnew[i] = ws.xopt[i] + ws.d[i];
            ws.x[i] = ws.set.xbase[i] + ws.xnew[i];
        }
    }

    /// Finite stand-in for a rejected value. It lies above every value
    /// seen so far by their spread, so the point is replaced like any poor
    /// point without ever becoming the best one.
    pub(super) fn barrier(&self) -> T {
        let spread = self.fmax - self.fopt;
        let margin = if spread > T::zero() {
            spread
        } else {
            self.fmax.abs().max(T::one())
        };
        self.fmax + margin
    }

    fn floor_delta(&mut self) {
        if self.delta <= T::lit(1.5) * self.rho {
            self.delta = self.rho;
        }
    }

    /// Evaluates the objective at `ws.x`, enforcing the budget and
    /// screening out non-finite values.
    pub(super) fn evaluate(&mut self, step: StepKind) -> Result<Eval<T>, Error> {
        if self.nf >= self.max_evals {
            return Ok(Eval::Exhausted);
        }
        self.nf += 1;

        let radius = Radius {
            rho: self.rho.widen(),
            delta: self.delta.widen(),
        };
        let outcome = self
            .objective
            .evaluate(&self.ws.x, EvalContext { step, radius })?;

        Ok(match outcome {
            Outcome::Value(f) if f.is_finite() => {
                trace!(
                    evals = self.nf,
                    ?step,
                    f = f.widen(),
                    delta = radius.delta,
                    rho = radius.rho,
                    "evaluated"
                );
                self.fmax = self.fmax.max(f);
                Eval::Value(f)
            }
            Outcome::Value(f) => {
                warn!(evals = self.nf, ?step, f = f.widen(), "non-finite objective value");
                Eval::Rejected
            }
            Outcome::Rejected => {
                debug!(evals = self.nf, ?step, "objective value rejected");
                Eval::Rejected
            }
            Outcome::Stop => Eval::Stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::optimization::newuoa::{
        objective::FnObjective,
        testing::{lagrange_change, seeded},
    };

    fn curved_valley(x: &[f64]) -> f64 {
        (x[0] - 1.0).powi(2) + 10.0 * (x[1] - x[0] * x[0]).powi(2) + 0.5 * x[2].powi(4)
    }

    fn settings(rho_begin: f64, rho_end: f64, max_evals: usize) -> Settings<f64> {
        Settings {
            rho_begin,
            rho_end,
            max_evals,
        }
    }

    #[test]
    fn model_interpolates_after_every_transition() {
        let mut ws = Workspace::new(3, 7).unwrap();
        let mut driver = Driver::new(&mut ws, FnObjective(curved_valley), settings(0.5, 1e-6, 3000));
        let mut state = driver.initialize(&[-0.5, 1.0, 0.8]).unwrap();
        let mut transitions = 0;

        while !matches!(state, State::Terminated(_)) {
            let rho_before = driver.rho;
            state = driver.advance(state).unwrap();
            transitions += 1;

            let error = driver.ws.set.interpolation_error(&driver.ws.model);
            assert!(error < 1e-8, "interpolation error {error} after {transitions} transitions");
            assert!(driver.rho <= rho_before);
            assert!(driver.delta >= driver.rho);
        }

        assert!(transitions > 20);
        assert!(driver.fopt < 1e-5);
    }

    #[test]
    fn lagrange_functions_stay_cardinal() {
        let mut ws = Workspace::new(3, 9).unwrap();
        let mut driver = Driver::new(&mut ws, FnObjective(curved_valley), settings(0.5, 1e-3, 3000));
        let mut state = driver.initialize(&[0.3, -0.2, 0.4]).unwrap();

        for _ in 0..60 {
            if matches!(state, State::Terminated(_)) {
                break;
            }
            state = driver.advance(state).unwrap();

            let set = &driver.ws.set;
            let origin = set.xpt.row(0).to_vec();
            for j in 0..set.npt() {
                for k in 1..set.npt() {
                    let expected = f64::from(u8::from(j == k)) - f64::from(u8::from(j == 0));
                    let actual = lagrange_change(set, j, &origin, set.xpt.row(k));
                    assert!(
                        (actual - expected).abs() < 1e-6,
                        "ℓ_{j}(x_{k}) - ℓ_{j}(x_0) = {actual}, expected {expected}"
                    );
                }
            }
        }
    }

    #[test]
    fn best_point_is_tracked_by_kopt() {
        let mut ws = Workspace::new(2, 5).unwrap();
        let bowl = |x: &[f64]| (x[0] - 0.2).powi(2) + (x[1] + 0.7).powi(2);
        let mut driver = Driver::new(&mut ws, FnObjective(bowl), settings(0.4, 1e-4, 500));
        let mut state = driver.initialize(&[1.0, 1.0]).unwrap();

        for _ in 0..40 {
            if matches!(state, State::Terminated(_)) {
                break;
            }
            state = driver.advance(state).unwrap();
            if matches!(state, State::Terminated(_)) {
                break;
            }
            let ws = &driver.ws;
            let kopt = ws.set.kopt;
            assert_eq!(ws.set.fval[kopt], driver.fopt);
            assert_eq!(ws.set.xpt.row(kopt), &ws.xopt[..]);
        }
    }

    #[test]
    fn budget_ends_the_run() {
        let mut ws = Workspace::new(3, 7).unwrap();
        let mut x = [-0.5, 1.0, 0.8];

        let finish = Driver::new(&mut ws, FnObjective(curved_valley), settings(0.5, 1e-8, 12))
            .run(&mut x)
            .unwrap();

        assert_eq!(finish.status, Status::MaxEvals);
        assert_eq!(finish.evals, 12);
        assert_relative_eq!(finish.fopt, curved_valley(&x));
    }

    #[test]
    fn stop_outcome_ends_the_run() {
        struct StopAfter(usize);

        impl Objective<f64> for StopAfter {
            fn evaluate(&mut self, x: &[f64], _context: EvalContext) -> Result<Outcome<f64>, Error> {
                if self.0 == 0 {
                    return Ok(Outcome::Stop);
                }
                self.0 -= 1;
                Ok(Outcome::Value(curved_valley(x)))
            }
        }

        let mut ws = Workspace::new(3, 7).unwrap();
        let mut x = [-0.5, 1.0, 0.8];

        let finish = Driver::new(&mut ws, StopAfter(15), settings(0.5, 1e-8, 1000))
            .run(&mut x)
            .unwrap();

        assert_eq!(finish.status, Status::StoppedByObserver);
        assert_eq!(finish.evals, 16);
        assert!(finish.fopt <= curved_valley(&[-0.5, 1.0, 0.8]));
    }

    #[test]
    fn seeded_workspace_matches_fresh_stencil() {
        let ws = seeded(2, 6, 0.5, |x| x[0] * x[1] + x[1].powi(2) - x[1]);

        assert_eq!(ws.set.xpt.row(5), &[0.5, 0.5]);
        assert_eq!(ws.set.kopt, 2);
        assert_eq!(ws.xopt, vec![0.0, 0.5]);
        assert!(ws.set.interpolation_error(&ws.model) < 1e-14);
    }
}
