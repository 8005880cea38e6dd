/// Actions an observer can take during a NEWUOA run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the solver early and return the best solution found so far.
    ///
    /// A successful evaluation carried by the stopping event still counts
    /// toward the best solution.
    StopEarly,

    /// Treat this point as giving no improvement.
    ///
    /// The point never enters the interpolation set, so the model is left
    /// untouched, and it is not considered for the best solution. After a
    /// trust-region step the radius shrinks.
    ///
    /// Use this for:
    /// - Recovering from model or problem errors when the failed region is
    ///   known to be uninteresting.
    /// - Steering the search away from a region even when evaluation succeeded.
    AssumeWorse,
}
