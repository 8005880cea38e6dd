use super::{
    ConfigError, InterpolationSet, QuadraticModel, Scalar,
    denominator::DenominatorScratch,
    lagrange::LagrangeScratch,
    store::ShiftScratch,
    trust_region::TrustRegionScratch,
};

/// Every buffer a NEWUOA run needs, allocated once.
///
/// A workspace is owned by the caller and borrowed mutably for the
/// duration of a run, so independent runs never share state. Reusing one
/// across runs of the same size avoids all per-run allocation.
#[derive(Debug, Clone)]
pub struct Workspace<T> {
    pub(super) set: InterpolationSet<T>,
    pub(super) model: QuadraticModel<T>,
    pub(super) xopt: Vec<T>,
    pub(super) d: Vec<T>,
    pub(super) xnew: Vec<T>,
    pub(super) x: Vec<T>,
    pub(super) vlag: Vec<T>,
    pub(super) wcheck: Vec<T>,
    pub(super) update: Vec<T>,
    pub(super) trust: TrustRegionScratch<T>,
    pub(super) lagrange: LagrangeScratch<T>,
    pub(super) denominator: DenominatorScratch<T>,
    pub(super) shift: ShiftScratch<T>,
}

impl<T: Scalar> Workspace<T> {
    /// Allocates a workspace for `n` variables and `npt` interpolation points.
    ///
    /// # Errors
    ///
    /// Returns an error if `n < 2` or `npt` is outside
    /// `[n + 2, (n + 1)(n + 2) / 2]`.
    pub fn new(n: usize, npt: usize) -> Result<Self, ConfigError> {
        check_dimensions(n, npt)?;
        Ok(Self {
            set: InterpolationSet::new(n, npt),
            model: QuadraticModel::new(n, npt),
            xopt: vec![T::zero(); n],
            d: vec![T::zero(); n],
            xnew: vec![T::zero(); n],
            x: vec![T::zero(); n],
            vlag: vec![T::zero(); npt + n],
            wcheck: vec![T::zero(); npt],
            update: vec![T::zero(); npt + n],
            trust: TrustRegionScratch::new(n),
            lagrange: LagrangeScratch::new(n, npt),
            denominator: DenominatorScratch::new(n, npt),
            shift: ShiftScratch::new(n, npt),
        })
    }

    /// Returns `(n, npt)`.
    #[must_use]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.set.n(), self.set.npt())
    }

    /// Clears the previous run's state and places the base at `x0`.
    pub(super) fn reset(&mut self, x0: &[T]) {
        self.set.reset(x0);
        self.model.reset();
        self.xopt.fill(T::zero());
    }
}

fn check_dimensions(n: usize, npt: usize) -> Result<(), ConfigError> {
    if n < 2 {
        return Err(ConfigError::Dimension { n });
    }
    let min = n + 2;
    let max = (n + 1) * (n + 2) / 2;
    if npt < min || npt > max {
        return Err(ConfigError::InterpolationPoints { npt, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_dimensions() {
        let ws = Workspace::<f64>::new(3, 7).unwrap();

        assert_eq!(ws.dimensions(), (3, 7));
        assert_eq!(ws.set.bmat.rows(), 10);
        assert_eq!(ws.set.zmat.cols(), 3);
        assert_eq!(ws.vlag.len(), 10);
    }

    #[test]
    fn rejects_invalid_point_counts() {
        assert_eq!(
            Workspace::<f32>::new(2, 7).unwrap_err(),
            ConfigError::InterpolationPoints { npt: 7, min: 4, max: 6 }
        );
        assert_eq!(
            Workspace::<f64>::new(1, 3).unwrap_err(),
            ConfigError::Dimension { n: 1 }
        );
    }
}
