use tracing::debug;

use super::{
    Error, Scalar, Status, StepKind,
    driver::{Driver, Eval, State},
    objective::Objective,
    scalar::norm_sq,
};

impl<T: Scalar, O: Objective<T>> Driver<'_, T, O> {
    /// Evaluates the starting stencil around `x0` and builds the first
    /// quadratic model and factorization from it.
    ///
    /// Points `1..=n` step `+ρ_begin` along each axis and points
    /// `n+1..=2n` step `-ρ_begin`. Any further points step along two axes
    /// at once, choosing each sign toward the lower of the two values
    /// already seen on that axis, and fix one off-diagonal Hessian entry.
    /// A rejected stencil value is replaced by the barrier value once some
    /// finite value is known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoEvaluations`] if no stencil value is finite, since
    /// the barrier is measured from those values.
    pub(super) fn initialize(&mut self, x0: &[T]) -> Result<State<T>, Error> {
        self.ws.reset(x0);
        let n = self.ws.set.n();
        let npt = self.ws.set.npt();
        let rhobeg = self.rho;

        for k in 0..npt {
            if k == 2 * n + 1 {
                // Signs of the remaining points compare values on each axis.
                self.fill_rejected(k)?;
            }
            self.place_stencil_point(k, rhobeg);
            let ws = &mut *self.ws;
            for i in 0..n {
                ws.x[i] = ws.set.xbase[i] + ws.set.xpt[(k, i)];
            }

            match self.evaluate(StepKind::Initial)? {
                Eval::Value(f) => {
                    self.ws.set.fval[k] = f;
                    if f < self.fopt {
                        self.fopt = f;
                        self.ws.set.kopt = k;
                    }
                }
                Eval::Rejected => self.ws.set.fval[k] = T::nan(),
                Eval::Exhausted => return Ok(self.settle(State::Terminated(Status::MaxEvals))),
                Eval::Stop => return Ok(self.settle(State::Terminated(Status::StoppedByObserver))),
            }
        }
        self.fill_rejected(npt)?;

        let fbeg = self.ws.set.fval[0];
        for k in 1..npt {
            let f = self.ws.set.fval[k];
            self.absorb_stencil_value(k, f, fbeg, rhobeg);
        }

        self.nfsav = self.nf;
        Ok(self.settle(State::TrustRegionStep))
    }

    /// Gives every rejected value among the first `count` stencil points
    /// the barrier value.
    fn fill_rejected(&mut self, count: usize) -> Result<(), Error> {
        if !self.fopt.is_finite() {
            return Err(Error::NoEvaluations);
        }
        let barrier = self.barrier();
        for (k, f) in self.ws.set.fval[..count].iter_mut().enumerate() {
            if f.is_nan() {
                debug!(index = k, barrier = barrier.widen(), "stencil value replaced by barrier");
                *f = barrier;
            }
        }
        Ok(())
    }

    /// Sets `xopt` from `kopt` before handing over to the main iteration.
    fn settle(&mut self, next: State<T>) -> State<T> {
        let ws = &mut *self.ws;
        ws.xopt.copy_from_slice(ws.set.xpt.row(ws.set.kopt));
        self.xoptsq = norm_sq(&ws.xopt);
        next
    }

    /// Writes the offset of stencil point `k` into `xpt`.
    fn place_stencil_point(&mut self, k: usize, rhobeg: T) {
        let n = self.ws.set.n();
        let set = &mut self.ws.set;
        if k == 0 {
            return;
        }
        if k <= n {
            set.xpt[(k, k - 1)] = rhobeg;
        } else if k <= 2 * n {
            set.xpt[(k, k - n - 1)] = -rhobeg;
        } else {
            let (ipt, jpt) = axis_pair(k, n);
            set.xpt[(k, ipt - 1)] = signed_step(&set.fval, ipt, n, rhobeg);
            set.xpt[(k, jpt - 1)] = signed_step(&set.fval, jpt, n, rhobeg);
        }
    }

    /// Folds the value at stencil point `k > 0` into the model, `bmat`
    /// and `zmat`.
    fn absorb_stencil_value(&mut self, k: usize, f: T, fbeg: T, rhobeg: T) {
        let half = T::lit(0.5);
        let rhosq = rhobeg * rhobeg;
        let recip = T::one() / rhosq;
        let reciq = half.sqrt() / rhosq;
        let n = self.ws.set.n();
        let npt = self.ws.set.npt();
        let ws = &mut *self.ws;
        let (set, model) = (&mut ws.set, &mut ws.model);

        if k <= n {
            let i = k - 1;
            model.gq[i] = (f - fbeg) / rhobeg;
            if npt < k + 1 + n {
                set.bmat[(0, i)] = -T::one() / rhobeg;
                set.bmat[(k, i)] = T::one() / rhobeg;
                set.bmat[(npt + i, i)] = -half * rhosq;
            }
        } else if k <= 2 * n {
            let i = k - n - 1;
            set.bmat[(i + 1, i)] = half / rhobeg;
            set.bmat[(k, i)] = -half / rhobeg;
            set.zmat[(0, i)] = -reciq - reciq;
            set.zmat[(i + 1, i)] = reciq;
            set.zmat[(k, i)] = reciq;

            let backward = (fbeg - f) / rhobeg;
            model.hq[(i, i)] = (model.gq[i] - backward) / rhobeg;
            model.gq[i] = half * (model.gq[i] + backward);
        } else {
            let column = k - n - 1;
            let (ipt, jpt) = axis_pair(k, n);
            let xipt = set.xpt[(k, ipt - 1)];
            let xjpt = set.xpt[(k, jpt - 1)];
            let ip = if xipt < T::zero() { ipt + n } else { ipt };
            let jp = if xjpt < T::zero() { jpt + n } else { jpt };

            set.zmat[(0, column)] = recip;
            set.zmat[(k, column)] = recip;
            set.zmat[(ip, column)] = -recip;
            set.zmat[(jp, column)] = -recip;

            let h = (fbeg - set.fval[ip] - set.fval[jp] + f) / (xipt * xjpt);
            model.hq[(ipt - 1, jpt - 1)] = h;
            model.hq[(jpt - 1, ipt - 1)] = h;
        }
    }
}

/// The two axes (1-based, `ipt > jpt`) moved by stencil point `k > 2n`.
fn axis_pair(k: usize, n: usize) -> (usize, usize) {
    let mut itemp = (k - n - 1) / n;
    let mut jpt = k - itemp * n - n;
    let mut ipt = jpt + itemp;
    if ipt > n {
        itemp = jpt;
        jpt = ipt - n;
        ipt = itemp;
    }
    (ipt, jpt)
}

/// `±rhobeg` along 1-based axis `axis`, pointing toward the lower of the
/// two values already sampled on it.
fn signed_step<T: Scalar>(fval: &[T], axis: usize, n: usize, rhobeg: T) -> T {
    if fval[axis + n] < fval[axis] { -rhobeg } else { rhobeg }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::optimization::newuoa::{
        Workspace,
        driver::Settings,
        objective::{EvalContext, FnObjective, Outcome},
        testing::seeded,
    };

    #[test]
    fn axis_pairs_cover_each_pair_once() {
        let n = 3;
        let max = (n + 1) * (n + 2) / 2;
        let mut pairs: Vec<_> = (2 * n + 1..max).map(|k| axis_pair(k, n)).collect();
        pairs.sort_unstable();

        assert_eq!(pairs, vec![(2, 1), (3, 1), (3, 2)]);
    }

    #[test]
    fn full_stencil_recovers_a_quadratic_exactly() {
        let f = |x: &[f64]| 3.0 + x[0] - 2.0 * x[1] + x[0] * x[0] + 0.5 * x[0] * x[1] + 2.0 * x[1] * x[1];
        let ws = seeded(2, 6, 0.25, f);

        assert_relative_eq!(ws.model.gq[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ws.model.gq[1], -2.0, epsilon = 1e-12);
        assert_relative_eq!(ws.model.hq[(0, 0)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(ws.model.hq[(0, 1)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(ws.model.hq[(1, 1)], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn minimal_stencil_uses_forward_differences() {
        let ws = seeded(3, 5, 0.5, |x| x[0].powi(2) + x[1] - x[2]);

        assert_eq!(ws.set.xpt.row(4), &[-0.5, 0.0, 0.0]);
        assert_relative_eq!(ws.model.gq[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(ws.model.gq[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ws.model.gq[2], -1.0, epsilon = 1e-12);
        assert!(ws.set.interpolation_error(&ws.model) < 1e-12);
    }

    #[test]
    fn non_finite_stencil_value_becomes_the_barrier() {
        let mut ws = Workspace::new(2, 6).unwrap();
        let settings = Settings {
            rho_begin: 1.0,
            rho_end: 1e-3,
            max_evals: 100,
        };
        let objective = FnObjective(|x: &[f64]| if x[0] < 0.0 { f64::NAN } else { x[0] + x[1] });
        let mut driver = Driver::new(&mut ws, objective, settings);

        let state = driver.initialize(&[0.0, 0.0]).unwrap();
        assert_eq!(state, State::TrustRegionStep);
        assert_eq!(driver.nf, 6);
        assert_eq!(driver.fopt, -1.0);

        // Best -1, worst 1: the barrier sits one spread above the worst.
        let ws = &driver.ws;
        assert_eq!(ws.set.fval[3], 3.0);
        assert_eq!(ws.set.kopt, 4);
        assert_eq!(ws.set.xpt.row(5), &[1.0, -1.0]);
        assert_eq!(ws.set.fval[5], 0.0);
        assert!(ws.model.gq.iter().all(|g| g.is_finite()));
        assert!(ws.set.interpolation_error(&ws.model) < 1e-12);
    }

    #[test]
    fn stencil_without_finite_values_is_an_error() {
        let mut ws = Workspace::new(2, 5).unwrap();
        let settings = Settings {
            rho_begin: 1.0,
            rho_end: 1e-3,
            max_evals: 100,
        };
        let mut driver = Driver::new(&mut ws, FnObjective(|_: &[f64]| f64::INFINITY), settings);

        let err = driver.initialize(&[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::NoEvaluations));
        assert_eq!(driver.nf, 5);
    }

    #[test]
    fn budget_can_end_during_the_stencil() {
        let mut ws = Workspace::new(2, 5).unwrap();
        let settings = Settings {
            rho_begin: 1.0,
            rho_end: 1e-3,
            max_evals: 3,
        };
        let mut driver = Driver::new(&mut ws, FnObjective(|x: &[f64]| (x[0] - 2.0).powi(2) + x[1]), settings);

        let state = driver.initialize(&[0.0, 0.0]).unwrap();
        assert_eq!(state, State::Terminated(Status::MaxEvals));
        assert_eq!(driver.nf, 3);
        assert_eq!(driver.ws.set.kopt, 1);
        assert_eq!(driver.ws.xopt, vec![1.0, 0.0]);
    }

    #[test]
    fn stop_during_the_stencil() {
        struct StopAt(usize);

        impl Objective<f64> for StopAt {
            fn evaluate(&mut self, x: &[f64], context: EvalContext) -> Result<Outcome<f64>, Error> {
                assert_eq!(context.step, StepKind::Initial);
                self.0 -= 1;
                Ok(if self.0 == 0 { Outcome::Stop } else { Outcome::Value(x[0] + x[1]) })
            }
        }

        let mut ws = Workspace::new(2, 5).unwrap();
        let settings = Settings {
            rho_begin: 1.0,
            rho_end: 1e-3,
            max_evals: 100,
        };
        let mut driver = Driver::new(&mut ws, StopAt(2), settings);

        let state = driver.initialize(&[0.0, 0.0]).unwrap();
        assert_eq!(state, State::Terminated(Status::StoppedByObserver));
        assert_eq!(driver.nf, 2);
    }
}
