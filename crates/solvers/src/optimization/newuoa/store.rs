//! Sample points and the implicit factorization of the interpolation system.
//!
//! With `W` the `(npt+n+1)`-square matrix of the interpolation equations, its
//! inverse `H` (minus the row and column of the constant term) is held as:
//!
//! - `bmat`: the last `n` columns of `H`, an `(npt+n) × n` matrix
//! - `zmat` and `idz`: the leading `npt × npt` block as `Z diag(s) Zᵀ`,
//!   where `s[j] = -1` for `j < idz` and `+1` otherwise
//!
//! `H` is only ever modified by rank-limited updates.

use super::{
    QuadraticModel, Scalar,
    matrix::Matrix,
    scalar::{dot, norm_sq},
};

/// The current interpolation set and the factorization of `H`.
#[derive(Debug, Clone)]
pub(super) struct InterpolationSet<T> {
    pub(super) xbase: Vec<T>,
    pub(super) xpt: Matrix<T>,
    pub(super) fval: Vec<T>,
    pub(super) bmat: Matrix<T>,
    pub(super) zmat: Matrix<T>,
    pub(super) idz: usize,

    /// Index of the sample with the least value.
    pub(super) kopt: usize,
}

/// Scratch vectors for [`InterpolationSet::shift_base`].
#[derive(Debug, Clone)]
pub(super) struct ShiftScratch<T> {
    /// `xₖ·xopt - ½|xopt|²` per point.
    sums: Vec<T>,
    scaled: Vec<T>,
    w: Vec<T>,
    v: Vec<T>,
}

impl<T: Scalar> ShiftScratch<T> {
    pub(super) fn new(n: usize, npt: usize) -> Self {
        Self {
            sums: vec![T::zero(); npt],
            scaled: vec![T::zero(); npt],
            w: vec![T::zero(); n],
            v: vec![T::zero(); n],
        }
    }
}

impl<T: Scalar> InterpolationSet<T> {
    pub(super) fn new(n: usize, npt: usize) -> Self {
        Self {
            xbase: vec![T::zero(); n],
            xpt: Matrix::zeros(npt, n),
            fval: vec![T::zero(); npt],
            bmat: Matrix::zeros(npt + n, n),
            zmat: Matrix::zeros(npt, npt - n - 1),
            idz: 0,
            kopt: 0,
        }
    }

    pub(super) fn n(&self) -> usize {
        self.xpt.cols()
    }

    pub(super) fn npt(&self) -> usize {
        self.xpt.rows()
    }

    pub(super) fn reset(&mut self, xbase: &[T]) {
        self.xbase.copy_from_slice(xbase);
        self.xpt.fill_zero();
        self.fval.fill(T::zero());
        self.bmat.fill_zero();
        self.zmat.fill_zero();
        self.idz = 0;
        self.kopt = 0;
    }

    /// Sign of column `j` of `zmat` in `Z diag(s) Zᵀ`.
    #[inline]
    pub(super) fn sign(&self, j: usize) -> T {
        if j < self.idz { -T::one() } else { T::one() }
    }

    /// Writes the leading `npt` entries of column `k` of `H` into `out`.
    ///
    /// These are the coefficients of the Lagrange polynomial of point `k`
    /// over the implicit Hessian terms. Returns `out[k]`, the diagonal
    /// entry `α` of `H` for point `k`.
    pub(super) fn lagrange_column(&self, k: usize, out: &mut [T]) -> T {
        out.fill(T::zero());
        for j in 0..self.zmat.cols() {
            let temp = self.sign(j) * self.zmat[(k, j)];
            for (i, o) in out.iter_mut().enumerate() {
                *o = *o + temp * self.zmat[(i, j)];
            }
        }
        out[k]
    }

    /// Returns the diagonal entry of `Z diag(s) Zᵀ` for point `k`.
    pub(super) fn diagonal(&self, k: usize) -> T {
        (0..self.zmat.cols()).fold(T::zero(), |acc, j| {
            let z = self.zmat[(k, j)];
            acc + self.sign(j) * z * z
        })
    }

    /// Computes `vlag = H w` and returns `β` for the candidate `xopt + d`.
    ///
    /// `vlag[k]` for `k < npt` are the Lagrange function values at the new
    /// point; `wcheck` receives the first `npt` components of `w`, which are
    /// also needed to predict the change in the model.
    pub(super) fn lagrange_values(
        &self,
        xopt: &[T],
        d: &[T],
        kopt: usize,
        vlag: &mut [T],
        wcheck: &mut [T],
    ) -> T {
        let n = self.n();
        let npt = self.npt();
        let half = T::lit(0.5);

        for k in 0..npt {
            let xk = self.xpt.row(k);
            let along = dot(xk, d);
            wcheck[k] = along * (half * along + dot(xk, xopt));
            vlag[k] = dot(self.bmat.row(k), d);
        }

        let mut beta = T::zero();
        for j in 0..self.zmat.cols() {
            let mut sum = (0..npt).fold(T::zero(), |acc, i| acc + self.zmat[(i, j)] * wcheck[i]);
            if j < self.idz {
                beta = beta + sum * sum;
                sum = -sum;
            } else {
                beta = beta - sum * sum;
            }
            for i in 0..npt {
                vlag[i] = vlag[i] + sum * self.zmat[(i, j)];
            }
        }

        let mut bsum = T::zero();
        let mut dx = T::zero();
        for j in 0..n {
            let mut sum = (0..npt).fold(T::zero(), |acc, i| acc + wcheck[i] * self.bmat[(i, j)]);
            bsum = bsum + sum * d[j];
            sum = sum + dot(self.bmat.row(npt + j), d);
            vlag[npt + j] = sum;
            bsum = bsum + sum * d[j];
            dx = dx + d[j] * xopt[j];
        }

        let dsq = norm_sq(d);
        let xoptsq = norm_sq(xopt);
        vlag[kopt] = vlag[kopt] + T::one();
        dx * dx + dsq * (xoptsq + dx + dx + half * dsq) + beta - bsum
    }

    /// Moves the base point to `xbase + xopt`.
    ///
    /// Every stored offset, `bmat`, and the model's gradient and explicit
    /// Hessian are transformed so that the model and the Lagrange functions
    /// are unchanged as functions of the absolute position. `xopt` is set
    /// to zero on return.
    pub(super) fn shift_base(
        &mut self,
        model: &mut QuadraticModel<T>,
        xopt: &mut [T],
        scratch: &mut ShiftScratch<T>,
    ) {
        let n = self.n();
        let npt = self.npt();
        let half = T::lit(0.5);
        let xoptsq = norm_sq(xopt);
        let tempq = T::lit(0.25) * xoptsq;

        // Changes to bmat that do not depend on zmat.
        let ShiftScratch { sums, scaled, w, v } = scratch;
        for k in 0..npt {
            let mut sum = dot(self.xpt.row(k), xopt);
            let temp = model.pq[k] * sum;
            sum = sum - half * xoptsq;
            sums[k] = sum;
            for i in 0..n {
                model.gq[i] = model.gq[i] + temp * self.xpt[(k, i)];
                self.xpt[(k, i)] = self.xpt[(k, i)] - half * xopt[i];
                v[i] = self.bmat[(k, i)];
                w[i] = sum * self.xpt[(k, i)] + tempq * xopt[i];
                for j in 0..=i {
                    self.bmat[(npt + i, j)] = self.bmat[(npt + i, j)] + v[i] * w[j] + w[i] * v[j];
                }
            }
        }

        // Changes that depend on zmat.
        for k in 0..self.zmat.cols() {
            let mut sumz = T::zero();
            for i in 0..npt {
                sumz = sumz + self.zmat[(i, k)];
                scaled[i] = sums[i] * self.zmat[(i, k)];
            }
            for j in 0..n {
                let mut sum = tempq * sumz * xopt[j];
                for i in 0..npt {
                    sum = sum + scaled[i] * self.xpt[(i, j)];
                }
                v[j] = sum;
                let sum = self.sign(k) * sum;
                for i in 0..npt {
                    self.bmat[(i, j)] = self.bmat[(i, j)] + sum * self.zmat[(i, k)];
                }
            }
            for i in 0..n {
                let temp = self.sign(k) * v[i];
                for j in 0..=i {
                    self.bmat[(npt + i, j)] = self.bmat[(npt + i, j)] + temp * v[j];
                }
            }
        }

        // Complete the shift, including the model's explicit terms.
        for j in 0..n {
            w[j] = T::zero();
            for k in 0..npt {
                w[j] = w[j] + model.pq[k] * self.xpt[(k, j)];
                self.xpt[(k, j)] = self.xpt[(k, j)] - half * xopt[j];
            }
            for i in 0..=j {
                let h = model.hq[(i, j)];
                if i < j {
                    model.gq[j] = model.gq[j] + h * xopt[i];
                }
                model.gq[i] = model.gq[i] + h * xopt[j];
                let updated = h + w[i] * xopt[j] + xopt[i] * w[j];
                model.hq[(i, j)] = updated;
                model.hq[(j, i)] = updated;
                self.bmat[(npt + i, j)] = self.bmat[(npt + j, i)];
            }
        }

        for (base, x) in self.xbase.iter_mut().zip(xopt.iter_mut()) {
            *base = *base + *x;
            *x = T::zero();
        }
    }

    /// Largest violation of the interpolation conditions, relative to the
    /// spread of sampled values. Measured against point 0 so the unknown
    /// constant term cancels.
    #[cfg(test)]
    pub(super) fn interpolation_error(&self, model: &QuadraticModel<T>) -> T {
        let q0 = model.value(&self.xpt, self.xpt.row(0));
        let scale = self
            .fval
            .iter()
            .fold(T::one(), |acc, &f| acc.max((f - self.fval[0]).abs()));
        (0..self.npt()).fold(T::zero(), |worst, k| {
            let qk = model.value(&self.xpt, self.xpt.row(k)) - q0;
            let fk = self.fval[k] - self.fval[0];
            worst.max((qk - fk).abs() / scale)
        })
    }
}
