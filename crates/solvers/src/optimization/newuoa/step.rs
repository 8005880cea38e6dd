/// Why the solver is evaluating the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// A point of the starting stencil around the initial guess.
    Initial,

    /// A step that minimizes the model within the trust region.
    TrustRegion,

    /// A step that improves the geometry of the interpolation set.
    ModelImprovement,

    /// A last, short trust-region step tried once `ρ` reached its final value.
    Final,
}

/// Trust-region radii at the time of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radius {
    /// Lower bound on the trust-region radius. Never increases.
    pub rho: f64,

    /// Current trust-region radius, at least `rho` once iterations begin.
    pub delta: f64,
}
