use std::f64::consts::TAU;

use super::Scalar;

/// Number of interior sample angles on the circle.
const SAMPLES: usize = 49;

/// Finds the angle in `[0, 2π)` whose value `eval(cos θ, sin θ)` is best.
///
/// The circle is sampled at 50 equally spaced angles starting at zero
/// (`at_zero` is the value there), and the winner is refined by fitting a
/// parabola through it and its two neighbours. `better(candidate, best)`
/// decides the ordering, so the same search serves both minimization of a
/// model and maximization of a modulus.
pub(super) fn best_angle<T, E, B>(at_zero: T, eval: E, better: B) -> T
where
    T: Scalar,
    E: Fn(T, T) -> T,
    B: Fn(T, T) -> bool,
{
    #[allow(clippy::cast_precision_loss)]
    let spacing = T::lit(TAU / (SAMPLES + 1) as f64);

    let mut best = at_zero;
    let mut previous = at_zero;
    let mut isave = 0;
    let mut before = T::zero();
    let mut after = T::zero();

    for i in 1..=SAMPLES {
        #[allow(clippy::cast_precision_loss)]
        let angle = T::lit(i as f64) * spacing;
        let value = eval(angle.cos(), angle.sin());
        if better(value, best) {
            best = value;
            isave = i;
            before = previous;
        } else if i == isave + 1 {
            after = value;
        }
        previous = value;
    }
    if isave == 0 {
        before = previous;
    }
    if isave == SAMPLES {
        after = at_zero;
    }

    let mut offset = T::zero();
    if before != after {
        let a = before - best;
        let b = after - best;
        if a + b != T::zero() {
            offset = T::lit(0.5) * (a - b) / (a + b);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let base = T::lit(isave as f64);
    spacing * (base + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn finds_minimum_of_shifted_cosine() {
        let target = 2.0_f64;
        let angle = best_angle(
            -(0.0 - target).cos(),
            |c, s| -(c * target.cos() + s * target.sin()),
            |a, b| a < b,
        );

        assert_abs_diff_eq!(angle, target, epsilon = 5e-3);
    }

    #[test]
    fn maximizes_modulus_of_negative_lobe() {
        // |sin θ - 0.2| peaks where sin θ = -1, at 3π/2.
        let angle = best_angle(-0.2_f64, |_, s| s - 0.2, |a: f64, b: f64| a.abs() > b.abs());

        assert_abs_diff_eq!(angle, 1.5 * std::f64::consts::PI, epsilon = 5e-3);
    }

    #[test]
    fn zero_angle_wins_when_nothing_is_better() {
        let angle = best_angle(-1.0_f64, |c, _| -c, |a, b| a < b);

        assert_abs_diff_eq!(angle, 0.0, epsilon = 5e-3);
    }
}
