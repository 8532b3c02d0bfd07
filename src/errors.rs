use thiserror::Error;

/// Errors surfaced by tree growth, pruning and prediction.
///
/// Nothing is recovered internally: every condition is terminal for the
/// operation that raised it, and the caller decides whether to retry with
/// different inputs (e.g. a larger node table).
#[derive(Debug, Error)]
pub enum TreeError {
    /// Growth ran out of node-table capacity.
    #[error("tree is too big")]
    CapacityExceeded,
    /// Splitting would create a node with a heap id of 2^30 or more.
    #[error("maximum depth reached")]
    DepthExceeded,
    /// The Gini criterion was asked to split on a predictor with missing
    /// values at the current node.
    #[error("cannot use 'Gini' with missing values")]
    GiniWithMissing,
    /// A categorical predictor declared more than 32 levels.
    #[error("factor predictors must have at most 32 levels")]
    LevelLimit,
    /// A node table handed to prediction or re-growth is structurally
    /// inconsistent (missing child, out-of-range index, malformed label).
    #[error("corrupt tree: {0}")]
    CorruptTree(String),
    /// A dataset or configuration failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
