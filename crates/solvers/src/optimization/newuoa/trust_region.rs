//! Approximate minimization of the quadratic model within a ball.
//!
//! A truncated conjugate gradient iteration runs from `xopt` until it meets
//! negative curvature, the boundary, or a negligible gradient. Once on the
//! boundary, further reduction is sought by rotating the step in the plane
//! spanned by the step and the residual gradient.

use super::{
    QuadraticModel, Scalar,
    angle::best_angle,
    matrix::Matrix,
    scalar::{dot, norm_sq},
};

/// Result of a trust-region subproblem solve. The step itself is written
/// into the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct TrustRegionStep<T> {
    /// Reduction of the model predicted for the step.
    pub(super) predicted_reduction: T,

    /// Least curvature seen along a search direction, or zero if the
    /// boundary was reached.
    pub(super) min_curvature: T,
}

/// Scratch vectors for [`solve`].
#[derive(Debug, Clone)]
pub(super) struct TrustRegionScratch<T> {
    g: Vec<T>,
    d: Vec<T>,
    hd: Vec<T>,
    hs: Vec<T>,
}

impl<T: Scalar> TrustRegionScratch<T> {
    pub(super) fn new(n: usize) -> Self {
        Self {
            g: vec![T::zero(); n],
            d: vec![T::zero(); n],
            hd: vec![T::zero(); n],
            hs: vec![T::zero(); n],
        }
    }
}

/// Computes a step from `xopt` with `‖step‖ ≤ delta` that reduces the model.
#[allow(clippy::many_single_char_names)]
pub(super) fn solve<T: Scalar>(
    model: &QuadraticModel<T>,
    xpt: &Matrix<T>,
    xopt: &[T],
    delta: T,
    step: &mut [T],
    scratch: &mut TrustRegionScratch<T>,
) -> TrustRegionStep<T> {
    let n = step.len();
    let half = T::lit(0.5);
    let delsq = delta * delta;
    let max_iters = n;
    let TrustRegionScratch { g, d, hd, hs } = scratch;

    // Gradient of the model at xopt.
    model.hessian_times(xpt, xopt, hd);
    let mut qred = T::zero();
    let mut dd = T::zero();
    for i in 0..n {
        step[i] = T::zero();
        hs[i] = T::zero();
        g[i] = model.gq[i] + hd[i];
        d[i] = -g[i];
        dd = dd + d[i] * d[i];
    }
    let done = |predicted_reduction, min_curvature| TrustRegionStep {
        predicted_reduction,
        min_curvature,
    };
    let mut crvmin = T::zero();
    if dd == T::zero() {
        return done(qred, crvmin);
    }

    let mut ds = T::zero();
    let mut ss = T::zero();
    let mut gg = dd;
    let ggbeg = gg;
    let mut iters = 0;

    // Conjugate gradient phase.
    loop {
        iters += 1;
        let room = delsq - ss;
        let bstep = room / (ds + (ds * ds + dd * room).sqrt());
        model.hessian_times(xpt, d, hd);

        let dhd = dot(d, hd);
        let mut alpha = bstep;
        if dhd > T::zero() {
            let curvature = dhd / dd;
            crvmin = if iters == 1 { curvature } else { crvmin.min(curvature) };
            alpha = alpha.min(gg / dhd);
        }
        let qadd = alpha * (gg - half * alpha * dhd);
        qred = qred + qadd;

        let ggsav = gg;
        gg = T::zero();
        for i in 0..n {
            step[i] = step[i] + alpha * d[i];
            hs[i] = hs[i] + alpha * hd[i];
            let r = g[i] + hs[i];
            gg = gg + r * r;
        }

        if alpha >= bstep {
            break;
        }
        if qadd <= T::lit(0.01) * qred
            || gg <= T::lit(1.0e-4) * ggbeg
            || iters == max_iters
        {
            return done(qred, crvmin);
        }
        let beta = gg / ggsav;
        dd = T::zero();
        ds = T::zero();
        ss = T::zero();
        for i in 0..n {
            d[i] = beta * d[i] - g[i] - hs[i];
            dd = dd + d[i] * d[i];
            ds = ds + d[i] * step[i];
            ss = ss + step[i] * step[i];
        }
        if ds <= T::zero() {
            return done(qred, crvmin);
        }
        if ss >= delsq {
            break;
        }
    }
    crvmin = T::zero();

    // Boundary phase: rotate the step within span{step, gradient}.
    loop {
        if gg <= T::lit(1.0e-4) * ggbeg {
            return done(qred, crvmin);
        }
        let sg = dot(step, g);
        let shs = dot(step, hs);
        let sgk = sg + shs;
        if sgk / (gg * delsq).sqrt() <= T::lit(-0.99) {
            return done(qred, crvmin);
        }

        iters += 1;
        let temp = (delsq * gg - sgk * sgk).sqrt();
        let tempa = delsq / temp;
        let tempb = sgk / temp;
        for i in 0..n {
            d[i] = tempa * (g[i] + hs[i]) - tempb * step[i];
        }
        model.hessian_times(xpt, d, hd);

        let dg = dot(d, g);
        let dhd = dot(hd, d);
        let dhs = dot(hd, step);
        let cf = half * (shs - dhd);
        let qbeg = sg + cf;
        let q = |c: T, s: T| (sg + cf * c) * c + (dg + dhs * c) * s;

        let angle = best_angle(qbeg, &q, |a, b| a < b);
        let (c, s) = (angle.cos(), angle.sin());
        let reduction = qbeg - q(c, s);

        gg = T::zero();
        for i in 0..n {
            step[i] = c * step[i] + s * d[i];
            hs[i] = c * hs[i] + s * hd[i];
            let r = g[i] + hs[i];
            gg = gg + r * r;
        }
        qred = qred + reduction;
        if iters >= max_iters || reduction / qred <= T::lit(0.01) {
            return done(qred, crvmin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn diagonal_model(gq: &[f64], diag: &[f64]) -> (QuadraticModel<f64>, Matrix<f64>) {
        let n = gq.len();
        let npt = 2 * n + 1;
        let mut model = QuadraticModel::new(n, npt);
        model.gq.copy_from_slice(gq);
        for (i, &h) in diag.iter().enumerate() {
            model.hq[(i, i)] = h;
        }
        (model, Matrix::zeros(npt, n))
    }

    #[test]
    fn interior_newton_step_for_convex_model() {
        let (model, xpt) = diagonal_model(&[2.0, -4.0], &[2.0, 4.0]);
        let mut step = [0.0; 2];
        let mut scratch = TrustRegionScratch::new(2);

        let result = solve(&model, &xpt, &[0.0, 0.0], 10.0, &mut step, &mut scratch);

        assert_relative_eq!(step[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(step[1], 1.0, epsilon = 1e-12);
        // Q(0) - Q(step) = 1 + 2.
        assert_relative_eq!(result.predicted_reduction, 3.0, epsilon = 1e-12);
        assert!(result.min_curvature > 0.0);
    }

    #[test]
    fn boundary_step_stays_inside_radius() {
        let (model, xpt) = diagonal_model(&[1.0, 1.0], &[1.0, -2.0]);
        let mut step = [0.0; 2];
        let mut scratch = TrustRegionScratch::new(2);

        let result = solve(&model, &xpt, &[0.0, 0.0], 0.5, &mut step, &mut scratch);

        assert!(norm_sq(&step).sqrt() <= 0.5 * (1.0 + 1e-10));
        assert_relative_eq!(norm_sq(&step).sqrt(), 0.5, epsilon = 1e-10);
        assert_relative_eq!(result.min_curvature, 0.0);

        let achieved = -model.predicted_change(&xpt, &[0.0, 0.0], &step);
        assert_relative_eq!(result.predicted_reduction, achieved, epsilon = 1e-10);
        assert!(achieved > 0.0);
    }

    #[test]
    fn zero_gradient_gives_zero_step() {
        let (model, xpt) = diagonal_model(&[0.0, 0.0], &[1.0, 1.0]);
        let mut step = [1.0; 2];
        let mut scratch = TrustRegionScratch::new(2);

        let result = solve(&model, &xpt, &[0.0, 0.0], 1.0, &mut step, &mut scratch);

        assert_eq!(step, [0.0, 0.0]);
        assert_relative_eq!(result.predicted_reduction, 0.0);
    }
}
