//! Rank-limited update of `H` and of the model when one point moves.

use super::{InterpolationSet, QuadraticModel, Scalar};

/// Updates `bmat`, `zmat` and `idz` so that point `knew` can be replaced by
/// the point whose `H w` is `vlag` and whose `β` is `beta`.
///
/// `w` is scratch of length `npt + n`. The sign partition is kept exact:
/// when the denominator `σ = α β + τ²` is negative, the column created
/// for the new point joins the `-1` block, and when a `-1` column
/// becomes positive it is swapped to the end of that block.
pub(super) fn update_factorization<T: Scalar>(
    set: &mut InterpolationSet<T>,
    vlag: &mut [T],
    beta: T,
    knew: usize,
    w: &mut [T],
) {
    let n = set.n();
    let npt = set.npt();
    let nptm = set.zmat.cols();
    let zmat = &mut set.zmat;

    // Givens rotations that zero row knew of zmat within each sign block,
    // leaving at most one nonzero in each block (columns 0 and jl).
    let mut jl = 0;
    for j in 1..nptm {
        if j == set.idz {
            jl = set.idz;
        } else if zmat[(knew, j)] != T::zero() {
            let a = zmat[(knew, jl)];
            let b = zmat[(knew, j)];
            let r = a.hypot(b);
            let (c, s) = (a / r, b / r);
            for i in 0..npt {
                let rotated = c * zmat[(i, jl)] + s * zmat[(i, j)];
                zmat[(i, j)] = c * zmat[(i, j)] - s * zmat[(i, jl)];
                zmat[(i, jl)] = rotated;
            }
            zmat[(knew, j)] = T::zero();
        }
    }

    // Leading npt entries of column knew of H, and the update parameters.
    let mut tempa = zmat[(knew, 0)];
    if set.idz >= 1 {
        tempa = -tempa;
    }
    let tempb = if jl > 0 { zmat[(knew, jl)] } else { T::zero() };
    for i in 0..npt {
        w[i] = tempa * zmat[(i, 0)];
        if jl > 0 {
            w[i] = w[i] + tempb * zmat[(i, jl)];
        }
    }
    let alpha = w[knew];
    let tau = vlag[knew];
    let tausq = tau * tau;
    let denom = alpha * beta + tausq;
    vlag[knew] = vlag[knew] - T::one();

    let mut swap_first = false;
    if jl == 0 {
        // Only one nonzero in row knew: rescale column 0.
        let temp = denom.abs().sqrt();
        let tempb = tempa / temp;
        let tempa = tau / temp;
        for i in 0..npt {
            zmat[(i, 0)] = tempa * zmat[(i, 0)] - tempb * vlag[i];
        }
        if set.idz == 0 && denom < T::zero() {
            set.idz = 1;
        }
        if set.idz >= 1 && denom >= T::zero() {
            swap_first = true;
        }
    } else {
        // One nonzero in each block: update columns ja and jb.
        let ja = if beta >= T::zero() { jl } else { 0 };
        let jb = jl - ja;
        let temp = zmat[(knew, jb)] / denom;
        let tempa = temp * beta;
        let tempb = temp * tau;
        let temp = zmat[(knew, ja)];
        let scala = T::one() / (beta.abs() * temp * temp + tausq).sqrt();
        let scalb = scala * denom.abs().sqrt();
        for i in 0..npt {
            zmat[(i, ja)] = scala * (tau * zmat[(i, ja)] - temp * vlag[i]);
            zmat[(i, jb)] = scalb * (zmat[(i, jb)] - tempa * w[i] - tempb * vlag[i]);
        }
        if denom <= T::zero() {
            if beta < T::zero() {
                set.idz += 1;
            } else {
                swap_first = true;
            }
        }
    }

    if swap_first {
        set.idz -= 1;
        zmat.swap_cols(0, set.idz);
    }

    // Finally bmat, keeping its lower n × n block symmetric.
    for j in 0..n {
        let jp = npt + j;
        w[jp] = set.bmat[(knew, j)];
        let tempa = (alpha * vlag[jp] - tau * w[jp]) / denom;
        let tempb = (-beta * w[jp] - tau * vlag[jp]) / denom;
        for i in 0..=jp {
            let updated = set.bmat[(i, j)] + tempa * vlag[i] + tempb * w[i];
            set.bmat[(i, j)] = updated;
            if i >= npt {
                set.bmat[(jp, i - npt)] = updated;
            }
        }
    }
}

/// Updates the model after point `knew` moved to `xnew` with value `f`.
///
/// `diff` is `f` minus the model's prediction there. Must run after
/// [`update_factorization`], since the correction is the new Lagrange
/// function of `knew` scaled by `diff`.
pub(super) fn update_model<T: Scalar>(
    set: &mut InterpolationSet<T>,
    model: &mut QuadraticModel<T>,
    knew: usize,
    xnew: &[T],
    f: T,
    diff: T,
) {
    set.fval[knew] = f;
    model.absorb_point(set.xpt.row(knew), knew);

    for j in 0..set.zmat.cols() {
        let temp = set.sign(j) * diff * set.zmat[(knew, j)];
        for k in 0..set.npt() {
            model.pq[k] = model.pq[k] + temp * set.zmat[(k, j)];
        }
    }
    for (i, &x) in xnew.iter().enumerate() {
        model.gq[i] = model.gq[i] + diff * set.bmat[(knew, i)];
        set.xpt[(knew, i)] = x;
    }
}
