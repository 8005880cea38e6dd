//! Fallback model step that maximizes the update denominator directly.
//!
//! Replacing point `knew` by `xopt + d` divides by
//! `σ = α β + τ²`, where `τ = ℓ_knew(xopt + d)`. When the Lagrange step
//! leaves `σ` close to cancelling, this search rotates `d` within planes
//! through other interpolation points, writing `σ(θ)` as a trigonometric
//! polynomial with nine coefficients and maximizing `|σ|` on the circle.
//! It always returns its best angle, even for nearly degenerate geometry.

use super::{
    InterpolationSet, Scalar,
    angle::best_angle,
    matrix::Matrix,
    scalar::{dot, norm_sq},
};

/// Number of terms in the expansion of `w` along the circle.
const TERMS: usize = 5;

/// Scratch storage for [`maximize`].
#[derive(Debug, Clone)]
pub(super) struct DenominatorScratch<T> {
    hcol: Vec<T>,
    s: Vec<T>,
    w: Vec<T>,
    wvec: Matrix<T>,
    prod: Matrix<T>,
}

impl<T: Scalar> DenominatorScratch<T> {
    pub(super) fn new(n: usize, npt: usize) -> Self {
        Self {
            hcol: vec![T::zero(); npt],
            s: vec![T::zero(); n],
            w: vec![T::zero(); n],
            wvec: Matrix::zeros(npt + n, TERMS),
            prod: Matrix::zeros(npt + n, TERMS),
        }
    }
}

/// Values of `1, cos θ, sin θ, cos 2θ, sin 2θ, …, sin 4θ`.
fn harmonics<T: Scalar>(c: T, s: T) -> [T; 9] {
    let mut par = [T::zero(); 9];
    par[0] = T::one();
    par[1] = c;
    par[2] = s;
    for j in [3, 5, 7] {
        par[j] = c * par[j - 2] - s * par[j - 1];
        par[j + 1] = c * par[j - 1] + s * par[j - 2];
    }
    par
}

/// Replaces `d` by a step of the same length that makes the denominator of
/// the update for `knew` large in modulus.
///
/// On return `vlag` holds `H w` for the new step (with the `kopt` entry
/// already incremented), `wcheck` holds the first `npt` components of `w`,
/// and the returned value is `β`.
#[allow(clippy::too_many_arguments, clippy::too_many_lines, clippy::many_single_char_names)]
pub(super) fn maximize<T: Scalar>(
    set: &InterpolationSet<T>,
    xopt: &[T],
    kopt: usize,
    knew: usize,
    d: &mut [T],
    vlag: &mut [T],
    wcheck: &mut [T],
    scratch: &mut DenominatorScratch<T>,
) -> T {
    let n = set.n();
    let npt = set.npt();
    let ndim = npt + n;
    let half = T::lit(0.5);
    let quarter = T::lit(0.25);
    let two = T::lit(2.0);
    let DenominatorScratch {
        hcol,
        s,
        w,
        wvec,
        prod,
    } = scratch;

    let alpha = set.lagrange_column(knew, hcol);

    // Usually s points from xopt to x_knew; another interpolation point is
    // used instead if that direction is nearly parallel to d.
    let mut dd = norm_sq(d);
    let xoptsq = norm_sq(xopt);
    for i in 0..n {
        s[i] = set.xpt[(knew, i)] - xopt[i];
    }
    let mut ds = dot(d, s);
    let mut ss = norm_sq(s);
    if ds * ds > T::lit(0.99) * dd * ss {
        let mut ksav = knew;
        let mut dtest = ds * ds / ss;
        for k in (0..npt).filter(|&k| k != kopt) {
            let mut dstemp = T::zero();
            let mut sstemp = T::zero();
            for i in 0..n {
                let diff = set.xpt[(k, i)] - xopt[i];
                dstemp = dstemp + d[i] * diff;
                sstemp = sstemp + diff * diff;
            }
            if dstemp * dstemp / sstemp < dtest {
                ksav = k;
                dtest = dstemp * dstemp / sstemp;
                ds = dstemp;
                ss = sstemp;
            }
        }
        for i in 0..n {
            s[i] = set.xpt[(ksav, i)] - xopt[i];
        }
    }
    let mut ssden = dd * ss - ds * ds;

    let mut den: [T; 9];
    let mut par: [T; 9];
    let mut densav = T::zero();
    let mut iters = 0;

    loop {
        iters += 1;

        // Make s orthogonal to d with the same length.
        let temp = T::one() / ssden.sqrt();
        for i in 0..n {
            s[i] = temp * (dd * s[i] - ds * d[i]);
        }
        let xoptd = dot(xopt, d);
        let xopts = dot(xopt, s);

        // Terms of β that do not involve H.
        let tempa = half * xoptd * xoptd;
        let tempb = half * xopts * xopts;
        den = [T::zero(); 9];
        den[0] = dd * (xoptsq + half * dd) + tempa + tempb;
        den[1] = two * xoptd * dd;
        den[2] = two * xopts * dd;
        den[3] = tempa - tempb;
        den[4] = xoptd * xopts;

        // Coefficients of w along the circle.
        for k in 0..npt {
            let xk = set.xpt.row(k);
            let ta = dot(xk, d);
            let tb = dot(xk, s);
            let tc = dot(xk, xopt);
            let row = wvec.row_mut(k);
            row[0] = quarter * (ta * ta + tb * tb);
            row[1] = ta * tc;
            row[2] = tb * tc;
            row[3] = quarter * (ta * ta - tb * tb);
            row[4] = half * ta * tb;
        }
        for i in 0..n {
            let row = wvec.row_mut(npt + i);
            row.copy_from_slice(&[T::zero(), d[i], s[i], T::zero(), T::zero()]);
        }

        // Coefficients of H w.
        for jc in 0..TERMS {
            let nw = if jc == 1 || jc == 2 { ndim } else { npt };
            for k in 0..npt {
                prod[(k, jc)] = T::zero();
            }
            for j in 0..set.zmat.cols() {
                let sum = (0..npt).fold(T::zero(), |acc, k| acc + set.zmat[(k, j)] * wvec[(k, jc)]);
                let sum = set.sign(j) * sum;
                for k in 0..npt {
                    prod[(k, jc)] = prod[(k, jc)] + sum * set.zmat[(k, j)];
                }
            }
            if nw == ndim {
                for k in 0..npt {
                    let sum = (0..n).fold(T::zero(), |acc, j| acc + set.bmat[(k, j)] * wvec[(npt + j, jc)]);
                    prod[(k, jc)] = prod[(k, jc)] + sum;
                }
            }
            for j in 0..n {
                let sum = (0..nw).fold(T::zero(), |acc, i| acc + set.bmat[(i, j)] * wvec[(i, jc)]);
                prod[(npt + j, jc)] = sum;
            }
        }

        // Part of β that depends on θ.
        for k in 0..ndim {
            let p = prod.row(k);
            let wk = wvec.row(k);
            let mut part = [T::zero(); TERMS];
            for i in 0..TERMS {
                part[i] = half * p[i] * wk[i];
            }
            let sum = part.iter().fold(T::zero(), |acc, &v| acc + v);
            den[0] = den[0] - part[0] - sum;

            let tempa = p[0] * wk[1] + p[1] * wk[0];
            let tempb = p[1] * wk[3] + p[3] * wk[1];
            let tempc = p[2] * wk[4] + p[4] * wk[2];
            den[1] = den[1] - tempa - half * (tempb + tempc);
            den[5] = den[5] - half * (tempb - tempc);

            let tempa = p[0] * wk[2] + p[2] * wk[0];
            let tempb = p[1] * wk[4] + p[4] * wk[1];
            let tempc = p[2] * wk[3] + p[3] * wk[2];
            den[2] = den[2] - tempa - half * (tempb - tempc);
            den[6] = den[6] - half * (tempb + tempc);

            let tempa = p[0] * wk[3] + p[3] * wk[0];
            den[3] = den[3] - tempa - part[1] + part[2];

            let tempa = p[0] * wk[4] + p[4] * wk[0];
            let tempb = p[1] * wk[2] + p[2] * wk[1];
            den[4] = den[4] - tempa - half * tempb;
            den[7] = den[7] - part[3] + part[4];

            let tempa = p[3] * wk[4] + p[4] * wk[3];
            den[8] = den[8] - half * tempa;
        }

        // Extend to the full denominator α β + τ².
        let pk = prod.row(knew);
        let mut part = [T::zero(); TERMS];
        for i in 0..TERMS {
            part[i] = half * pk[i] * pk[i];
        }
        let sum = part.iter().fold(T::zero(), |acc, &v| acc + v);
        let mut denex = [T::zero(); 9];
        denex[0] = alpha * den[0] + part[0] + sum;
        let tempa = two * pk[0] * pk[1];
        let tempb = pk[1] * pk[3];
        let tempc = pk[2] * pk[4];
        denex[1] = alpha * den[1] + tempa + tempb + tempc;
        denex[5] = alpha * den[5] + tempb - tempc;
        let tempa = two * pk[0] * pk[2];
        let tempb = pk[1] * pk[4];
        let tempc = pk[2] * pk[3];
        denex[2] = alpha * den[2] + tempa + tempb - tempc;
        denex[6] = alpha * den[6] + tempb + tempc;
        denex[3] = alpha * den[3] + two * pk[0] * pk[3] + part[1] - part[2];
        denex[4] = alpha * den[4] + two * pk[0] * pk[4] + pk[1] * pk[2];
        denex[7] = alpha * den[7] + part[3] - part[4];
        denex[8] = alpha * den[8] + pk[3] * pk[4];

        let denold = denex[0] + denex[1] + denex[3] + denex[5] + denex[7];
        let sigma = |c: T, sn: T| {
            harmonics(c, sn)
                .iter()
                .zip(&denex)
                .fold(T::zero(), |acc, (&h, &e)| acc + h * e)
        };
        let angle = best_angle(denold, &sigma, |a: T, b: T| a.abs() > b.abs());
        par = harmonics(angle.cos(), angle.sin());

        let denmax = par.iter().zip(&denex).fold(T::zero(), |acc, (&h, &e)| acc + h * e);
        for k in 0..ndim {
            vlag[k] = (0..TERMS).fold(T::zero(), |acc, j| acc + prod[(k, j)] * par[j]);
        }
        let tau = vlag[knew];

        dd = T::zero();
        let mut tempa = T::zero();
        let mut tempb = T::zero();
        for i in 0..n {
            d[i] = par[1] * d[i] + par[2] * s[i];
            w[i] = xopt[i] + d[i];
            dd = dd + d[i] * d[i];
            tempa = tempa + d[i] * w[i];
            tempb = tempb + w[i] * w[i];
        }

        if iters >= n {
            break;
        }
        if iters > 1 {
            densav = densav.max(denold);
        }
        if denmax.abs() <= T::lit(1.1) * densav.abs() {
            break;
        }
        densav = denmax;

        // Next s is half the gradient of the denominator with respect to d.
        for i in 0..n {
            let temp = tempa * xopt[i] + tempb * d[i] - vlag[npt + i];
            s[i] = tau * set.bmat[(knew, i)] + alpha * temp;
        }
        for k in 0..npt {
            let xk = set.xpt.row(k);
            let temp = (tau * hcol[k] - alpha * vlag[k]) * dot(xk, w);
            for i in 0..n {
                s[i] = s[i] + temp * xk[i];
            }
        }
        ss = norm_sq(s);
        ds = dot(d, s);
        ssden = dd * ss - ds * ds;
        if ssden < T::lit(1.0e-8) * dd * ss {
            break;
        }
    }

    for k in 0..npt {
        wcheck[k] = (0..TERMS).fold(T::zero(), |acc, j| acc + wvec[(k, j)] * par[j]);
    }
    vlag[kopt] = vlag[kopt] + T::one();

    // β for the final angle.
    den.iter().zip(&par).fold(T::zero(), |acc, (&c, &h)| acc + c * h)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::optimization::newuoa::testing::seeded;

    #[test]
    fn harmonics_follow_multiple_angles() {
        let theta = 0.7_f64;
        let par = harmonics(theta.cos(), theta.sin());

        assert_relative_eq!(par[3], (2.0 * theta).cos(), epsilon = 1e-14);
        assert_relative_eq!(par[6], (3.0 * theta).sin(), epsilon = 1e-14);
        assert_relative_eq!(par[8], (4.0 * theta).sin(), epsilon = 1e-14);
    }

    #[test]
    fn outputs_agree_with_direct_evaluation() {
        let ws = seeded(3, 7, 0.5, |x| (x[0] - 0.3).powi(2) + x[1] * x[2] + x[2].powi(2));
        let xopt = ws.xopt.clone();
        let (kopt, knew) = (ws.set.kopt, 5);

        let mut d = vec![0.0; 3];
        for i in 0..3 {
            d[i] = 0.2 * (ws.set.xpt[(knew, i)] - xopt[i]) / 0.5;
        }
        let length = norm_sq(&d).sqrt();
        let mut vlag = vec![0.0; 10];
        let mut wcheck = vec![0.0; 7];
        let mut scratch = DenominatorScratch::new(3, 7);

        let beta = maximize(&ws.set, &xopt, kopt, knew, &mut d, &mut vlag, &mut wcheck, &mut scratch);

        // The rotated step keeps its length.
        assert_relative_eq!(norm_sq(&d).sqrt(), length, epsilon = 1e-10);

        // vlag and β must match a direct computation for the returned step.
        let mut direct_vlag = vec![0.0; 10];
        let mut direct_w = vec![0.0; 7];
        let direct_beta = ws.set.lagrange_values(&xopt, &d, kopt, &mut direct_vlag, &mut direct_w);
        assert_relative_eq!(beta, direct_beta, epsilon = 1e-9, max_relative = 1e-9);
        for k in 0..10 {
            assert_relative_eq!(vlag[k], direct_vlag[k], epsilon = 1e-9, max_relative = 1e-9);
        }
        for k in 0..7 {
            assert_relative_eq!(wcheck[k], direct_w[k], epsilon = 1e-12, max_relative = 1e-9);
        }
    }
}
