use quadra_core::Snapshot;

/// Why a NEWUOA run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// `ρ` reached the final radius and no further progress was possible.
    Converged,

    /// The evaluation budget was exhausted.
    MaxEvals,

    /// A trust-region step failed to predict any decrease of the model.
    ///
    /// This is a normal numerical end of the search, usually reached close
    /// to a minimizer when rounding dominates the model.
    ModelStalled,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The result of [`minimize_fn`](super::minimize_fn) and
/// [`minimize_fn_in`](super::minimize_fn_in).
///
/// The best point itself is written back into the caller's slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary<T> {
    /// Final solver status.
    pub status: Status,

    /// Least objective value found.
    pub objective: T,

    /// Number of objective evaluations.
    pub evals: usize,

    /// Value of `ρ` when the run ended.
    pub rho: T,
}

/// The result of a NEWUOA run over a model and problem.
#[derive(Debug, Clone)]
pub struct Solution<I, O, const N: usize> {
    /// Final solver status.
    pub status: Status,

    /// Best point found.
    pub x: [f64; N],

    /// Objective value at the reported x.
    pub objective: f64,

    /// Snapshot at the reported x.
    pub snapshot: Snapshot<I, O>,

    /// Number of evaluations attempted, including failed ones.
    pub evals: usize,
}
