use thiserror::Error;

/// Error returned when an operation empties the domain of a variable, which
/// proves the model infeasible.
///
/// The [`PresolveContext`](crate::presolve::PresolveContext) latches this
/// condition into its unsatisfiability flag; observing the error therefore
/// never requires special recovery beyond unwinding the current rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation resulted in an empty domain")]
pub struct EmptyDomain;
