//! Model-improving steps that maximize the modulus of a Lagrange function.

use super::{
    InterpolationSet, Scalar,
    angle::best_angle,
    scalar::{dot, norm_sq},
};

/// Scratch vectors for [`maximize`].
#[derive(Debug, Clone)]
pub(super) struct LagrangeScratch<T> {
    hcol: Vec<T>,
    gc: Vec<T>,
    gd: Vec<T>,
    s: Vec<T>,
    w: Vec<T>,
}

impl<T: Scalar> LagrangeScratch<T> {
    pub(super) fn new(n: usize, npt: usize) -> Self {
        Self {
            hcol: vec![T::zero(); npt],
            gc: vec![T::zero(); n],
            gd: vec![T::zero(); n],
            s: vec![T::zero(); n],
            w: vec![T::zero(); n],
        }
    }
}

/// Writes into `d` a step with `‖d‖ = radius` that approximately maximizes
/// `|ℓ(xopt + d)|`, where `ℓ` is the Lagrange function of point `knew`.
///
/// The search starts along `x_knew - xopt` and then rotates `d` within
/// two-dimensional subspaces for at most `n` rounds, stopping early when
/// the subspace degenerates or the gain becomes small.
///
/// Returns `α`, the diagonal entry of `H` for `knew`, which the caller
/// needs to judge the denominator of the update.
#[allow(clippy::many_single_char_names)]
pub(super) fn maximize<T: Scalar>(
    set: &InterpolationSet<T>,
    xopt: &[T],
    knew: usize,
    radius: T,
    d: &mut [T],
    scratch: &mut LagrangeScratch<T>,
) -> T {
    let n = set.n();
    let npt = set.npt();
    let half = T::lit(0.5);
    let delsq = radius * radius;
    let LagrangeScratch { hcol, gc, gd, s, w } = scratch;

    let alpha = set.lagrange_column(knew, hcol);

    // Initial direction, gradient of ℓ at xopt, and curvature along d.
    for i in 0..n {
        d[i] = set.xpt[(knew, i)] - xopt[i];
        gc[i] = set.bmat[(knew, i)];
        gd[i] = T::zero();
    }
    let dd = norm_sq(d);
    for k in 0..npt {
        let xk = set.xpt.row(k);
        let temp = hcol[k] * dot(xk, xopt);
        let sum = hcol[k] * dot(xk, d);
        for i in 0..n {
            gc[i] = gc[i] + temp * xk[i];
            gd[i] = gd[i] + sum * xk[i];
        }
    }

    // Scale d onto the boundary, flipping it if that helps, and pick a
    // second vector for the first subspace.
    let gg = norm_sq(gc);
    let sp = dot(d, gc);
    let dhd = dot(d, gd);
    let mut scale = radius / dd.sqrt();
    if sp * dhd < T::zero() {
        scale = -scale;
    }
    let mut mix = T::zero();
    if sp * sp > T::lit(0.99) * dd * gg {
        mix = T::one();
    }
    let tau = scale * (sp.abs() + half * scale * dhd.abs());
    if gg * delsq < T::lit(0.01) * tau * tau {
        mix = T::one();
    }
    for i in 0..n {
        d[i] = scale * d[i];
        gd[i] = scale * gd[i];
        s[i] = gc[i] + mix * gd[i];
    }

    for _ in 0..n {
        let dd = norm_sq(d);
        let sp = dot(d, s);
        let ss = norm_sq(s);
        let temp = dd * ss - sp * sp;
        if temp <= T::lit(1.0e-8) * dd * ss {
            break;
        }
        let denom = temp.sqrt();
        for i in 0..n {
            s[i] = (dd * s[i] - sp * d[i]) / denom;
            w[i] = T::zero();
        }

        // Coefficients of ℓ on the circle through d and s.
        for k in 0..npt {
            let xk = set.xpt.row(k);
            let sum = hcol[k] * dot(xk, s);
            for i in 0..n {
                w[i] = w[i] + sum * xk[i];
            }
        }
        let cf1 = half * dot(s, w);
        let cf2 = dot(d, gc);
        let cf3 = dot(s, gc);
        let cf4 = half * dot(d, gd) - cf1;
        let cf5 = dot(s, gd);
        let tau = |c: T, sn: T| cf1 + (cf2 + cf4 * c) * c + (cf3 + cf5 * c) * sn;
        let taubeg = cf1 + cf2 + cf4;

        let angle = best_angle(taubeg, &tau, |a: T, b: T| a.abs() > b.abs());
        let (c, sn) = (angle.cos(), angle.sin());
        let taunew = tau(c, sn);
        for i in 0..n {
            d[i] = c * d[i] + sn * s[i];
            gd[i] = c * gd[i] + sn * w[i];
            s[i] = gc[i] + gd[i];
        }
        if taunew.abs() <= T::lit(1.1) * taubeg.abs() {
            break;
        }
    }

    alpha
}
