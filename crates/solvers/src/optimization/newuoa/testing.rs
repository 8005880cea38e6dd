//! Helpers shared by the unit tests of the NEWUOA internals.

use super::{
    InterpolationSet, Workspace,
    driver::{Driver, Settings, State},
    objective::FnObjective,
    scalar::dot,
};

/// Returns a workspace holding the initial stencil of `f` around the origin.
pub(super) fn seeded(n: usize, npt: usize, rhobeg: f64, f: impl Fn(&[f64]) -> f64) -> Workspace<f64> {
    let mut ws = Workspace::new(n, npt).unwrap();
    let settings = Settings {
        rho_begin: rhobeg,
        rho_end: rhobeg * 1e-3,
        max_evals: npt,
    };
    {
        let mut driver = Driver::new(&mut ws, FnObjective(f), settings);
        let state = driver.initialize(&vec![0.0; n]).unwrap();
        assert_eq!(state, State::TrustRegionStep);
    }
    ws
}

/// `ℓ_j(to) - ℓ_j(from)` for the Lagrange function of point `j`, computed
/// directly from column `j` of `H`. Offsets are relative to `xbase`.
pub(super) fn lagrange_change(set: &InterpolationSet<f64>, j: usize, from: &[f64], to: &[f64]) -> f64 {
    let mut hcol = vec![0.0; set.npt()];
    set.lagrange_column(j, &mut hcol);

    let linear: f64 = (0..set.n()).map(|i| set.bmat[(j, i)] * (to[i] - from[i])).sum();
    let quadratic: f64 = (0..set.npt())
        .map(|k| {
            let xk = set.xpt.row(k);
            hcol[k] * (dot(xk, to).powi(2) - dot(xk, from).powi(2))
        })
        .sum();
    linear + 0.5 * quadratic
}

/// `ℓ_knew(xopt + d) - ℓ_knew(xopt)`.
pub(super) fn lagrange_value(set: &InterpolationSet<f64>, knew: usize, xopt: &[f64], d: &[f64]) -> f64 {
    let to: Vec<f64> = xopt.iter().zip(d).map(|(x, d)| x + d).collect();
    lagrange_change(set, knew, xopt, &to)
}
