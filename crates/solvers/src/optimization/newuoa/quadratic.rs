use super::{Scalar, matrix::Matrix, scalar::dot};

/// Quadratic model of the objective, relative to the base point.
///
/// `Q(y) = c + gq·y + ½ yᵀ H y` where `H = hq + Σₖ pq[k] xₖ xₖᵀ`. The
/// constant `c` is never stored: only differences of `Q` are used, and the
/// interpolation conditions pin them to differences of sampled values.
#[derive(Debug, Clone)]
pub(super) struct QuadraticModel<T> {
    /// Gradient at the base point.
    pub(super) gq: Vec<T>,

    /// Explicit part of the Hessian, kept symmetric.
    pub(super) hq: Matrix<T>,

    /// Weights of the implicit Hessian over the sample offsets.
    pub(super) pq: Vec<T>,
}

impl<T: Scalar> QuadraticModel<T> {
    pub(super) fn new(n: usize, npt: usize) -> Self {
        Self {
            gq: vec![T::zero(); n],
            hq: Matrix::zeros(n, n),
            pq: vec![T::zero(); npt],
        }
    }

    pub(super) fn reset(&mut self) {
        self.gq.fill(T::zero());
        self.hq.fill_zero();
        self.pq.fill(T::zero());
    }

    /// Sets `out = H v` using both Hessian parts.
    pub(super) fn hessian_times(&self, xpt: &Matrix<T>, v: &[T], out: &mut [T]) {
        let n = v.len();
        for (i, o) in out.iter_mut().enumerate() {
            *o = dot(self.hq.row(i), v);
        }
        for (k, &pq) in self.pq.iter().enumerate() {
            if pq == T::zero() {
                continue;
            }
            let xk = xpt.row(k);
            let temp = pq * dot(xk, v);
            for i in 0..n {
                out[i] = out[i] + temp * xk[i];
            }
        }
    }

    /// Returns `Q(xopt + d) - Q(xopt)`.
    pub(super) fn predicted_change(&self, xpt: &Matrix<T>, xopt: &[T], d: &[T]) -> T {
        let n = d.len();
        let half = T::lit(0.5);
        let mut change = dot(&self.gq, d);
        for i in 0..n {
            let row = self.hq.row(i);
            for j in 0..n {
                change = change + d[i] * row[j] * (xopt[j] + half * d[j]);
            }
        }
        for (k, &pq) in self.pq.iter().enumerate() {
            let xk = xpt.row(k);
            let along = dot(xk, d);
            change = change + pq * along * (half * along + dot(xk, xopt));
        }
        change
    }

    /// Returns `Q(y) - c` for an offset `y` from the base point.
    #[cfg(test)]
    pub(super) fn value(&self, xpt: &Matrix<T>, y: &[T]) -> T {
        let half = T::lit(0.5);
        let mut quad = T::zero();
        for (i, &yi) in y.iter().enumerate() {
            quad = quad + yi * dot(self.hq.row(i), y);
        }
        for (k, &pq) in self.pq.iter().enumerate() {
            let s = dot(xpt.row(k), y);
            quad = quad + pq * s * s;
        }
        dot(&self.gq, y) + half * quad
    }

    /// Moves the implicit curvature of point `k` into the explicit Hessian.
    ///
    /// Required before point `k` is overwritten, since `pq[k]` refers to
    /// its old offset.
    pub(super) fn absorb_point(&mut self, xk: &[T], k: usize) {
        let pk = self.pq[k];
        let n = xk.len();
        for i in 0..n {
            let temp = pk * xk[i];
            for j in 0..n {
                self.hq[(i, j)] = self.hq[(i, j)] + temp * xk[j];
            }
        }
        self.pq[k] = T::zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn sample() -> (QuadraticModel<f64>, Matrix<f64>) {
        let mut model = QuadraticModel::new(2, 4);
        model.gq = vec![1.0, -2.0];
        model.hq[(0, 0)] = 2.0;
        model.hq[(0, 1)] = 0.5;
        model.hq[(1, 0)] = 0.5;
        model.hq[(1, 1)] = 1.0;
        model.pq = vec![0.3, 0.0, -0.1, 0.2];

        let mut xpt = Matrix::zeros(4, 2);
        xpt.row_mut(1).copy_from_slice(&[1.0, 0.0]);
        xpt.row_mut(2).copy_from_slice(&[0.0, 1.0]);
        xpt.row_mut(3).copy_from_slice(&[1.0, -1.0]);
        (model, xpt)
    }

    #[test]
    fn predicted_change_matches_value_difference() {
        let (model, xpt) = sample();
        let xopt = [0.4, -0.2];
        let d = [0.3, 0.7];
        let xnew = [0.7, 0.5];

        let expected = model.value(&xpt, &xnew) - model.value(&xpt, &xopt);

        assert_relative_eq!(model.predicted_change(&xpt, &xopt, &d), expected, epsilon = 1e-14);
    }

    #[test]
    fn absorbing_a_point_preserves_the_model() {
        let (mut model, xpt) = sample();
        let y = [0.25, -1.5];
        let before = model.value(&xpt, &y);

        model.absorb_point(xpt.row(3), 3);

        assert_relative_eq!(model.pq[3], 0.0);
        assert_relative_eq!(model.value(&xpt, &y), before, epsilon = 1e-14);
        assert_relative_eq!(model.hq[(0, 1)], model.hq[(1, 0)]);
    }

    #[test]
    fn hessian_times_includes_implicit_part() {
        let (model, xpt) = sample();
        let mut out = [0.0; 2];

        model.hessian_times(&xpt, &[1.0, 0.0], &mut out);

        // hq e1 = (2, 0.5); only x3 = (1, -1) has a nonzero weight along e1.
        assert_relative_eq!(out[0], 2.2, epsilon = 1e-14);
        assert_relative_eq!(out[1], 0.3, epsilon = 1e-14);
    }
}
