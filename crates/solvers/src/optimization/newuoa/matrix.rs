use std::ops::{Index, IndexMut};

use super::Scalar;

/// Dense row-major matrix with 0-based `(row, col)` indexing.
///
/// Indexing is bounds checked in debug builds only; the flat storage is
/// still bounds checked by the slice in release builds.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Scalar> Matrix<T> {
    /// Creates a `rows × cols` matrix filled with zeros.
    pub(super) fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::zero(); rows * cols],
        }
    }

    pub(super) fn rows(&self) -> usize {
        self.rows
    }

    pub(super) fn cols(&self) -> usize {
        self.cols
    }

    /// Sets every element to zero without reallocating.
    pub(super) fn fill_zero(&mut self) {
        self.data.fill(T::zero());
    }

    pub(super) fn row(&self, r: usize) -> &[T] {
        debug_assert!(r < self.rows, "row {r} out of bounds ({})", self.rows);
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub(super) fn row_mut(&mut self, r: usize) -> &mut [T] {
        debug_assert!(r < self.rows, "row {r} out of bounds ({})", self.rows);
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Swaps two columns in place.
    pub(super) fn swap_cols(&mut self, a: usize, b: usize) {
        debug_assert!(a < self.cols && b < self.cols);
        if a == b {
            return;
        }
        for r in 0..self.rows {
            self.data.swap(r * self.cols + a, r * self.cols + b);
        }
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &T {
        debug_assert!(r < self.rows && c < self.cols, "({r}, {c}) out of bounds");
        &self.data[r * self.cols + c]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut T {
        debug_assert!(r < self.rows && c < self.cols, "({r}, {c}) out of bounds");
        &mut self.data[r * self.cols + c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_row_major() {
        let mut m = Matrix::<f64>::zeros(2, 3);
        m[(1, 2)] = 5.0;
        m[(0, 1)] = 1.0;

        assert_eq!(m.row(0), &[0.0, 1.0, 0.0]);
        assert_eq!(m.row(1), &[0.0, 0.0, 5.0]);
        assert_eq!((m.rows(), m.cols()), (2, 3));
    }

    #[test]
    fn swap_cols_exchanges_every_row() {
        let mut m = Matrix::<f64>::zeros(2, 2);
        m[(0, 0)] = 1.0;
        m[(1, 0)] = 2.0;

        m.swap_cols(0, 1);

        assert_eq!(m.row(0), &[0.0, 1.0]);
        assert_eq!(m.row(1), &[0.0, 2.0]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    #[cfg(debug_assertions)]
    fn out_of_bounds_panics_in_debug() {
        let m = Matrix::<f64>::zeros(2, 2);
        let _ = m[(2, 0)];
    }
}
