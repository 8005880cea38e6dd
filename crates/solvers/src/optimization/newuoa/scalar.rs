use std::fmt::{Debug, Display};

use num_traits::Float;

/// Floating-point type the optimizer can run on.
///
/// Implemented for `f32` and `f64`. The engine only needs [`Float`]
/// arithmetic plus a lossless way to spell its tuning constants.
pub trait Scalar: Float + Debug + Display + Send + Sync + 'static {
    /// Converts an `f64` literal into this type.
    fn lit(value: f64) -> Self;

    /// Widens this value to `f64` for logging and reporting.
    fn widen(self) -> f64;
}

impl Scalar for f64 {
    #[inline]
    fn lit(value: f64) -> Self {
        value
    }

    #[inline]
    fn widen(self) -> f64 {
        self
    }
}

impl Scalar for f32 {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn lit(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn widen(self) -> f64 {
        f64::from(self)
    }
}

/// Dot product of two equally sized slices.
#[inline]
pub(super) fn dot<T: Scalar>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Squared Euclidean norm.
#[inline]
pub(super) fn norm_sq<T: Scalar>(a: &[T]) -> T {
    dot(a, a)
}

/// Squared distance between two points.
#[inline]
pub(super) fn dist_sq<T: Scalar>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| {
        let d = x - y;
        acc + d * d
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn literals_round_trip_for_both_widths() {
        assert_relative_eq!(f64::lit(0.1), 0.1);
        assert_relative_eq!(f32::lit(0.1).widen(), 0.1, epsilon = 1e-7);
    }

    #[test]
    fn vector_helpers() {
        let a = [1.0, 2.0, 2.0];
        let b = [1.0, 0.0, 0.0];

        assert_relative_eq!(dot(&a, &b), 1.0);
        assert_relative_eq!(norm_sq(&a), 9.0);
        assert_relative_eq!(dist_sq(&a, &b), 8.0);
    }
}
