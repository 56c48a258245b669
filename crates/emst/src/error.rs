/// Errors reported by the spanning-tree and pair-statistics oracles.
///
/// All of these are caller contract violations: the inputs are rejected
/// before any work is done and nothing is retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    /// A spanning tree needs at least two points.
    #[error("at least 2 points are required, got {0}")]
    TooFewPoints(usize),

    /// A point vector has a different length than the first one.
    #[error("point {index} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        /// Index of the offending point.
        index: usize,
        /// Dimension of the first point.
        expected: usize,
        /// Dimension of the offending point.
        found: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("point {index} has a non-finite coordinate")]
    NonFinite {
        /// Index of the offending point.
        index: usize,
    },

    /// The edge list does not have `labels.len() - 1` entries.
    #[error("expected {expected} edges for {labels} labels, got {found}")]
    LabelCountMismatch {
        /// Number of labels supplied.
        labels: usize,
        /// Required number of edges.
        expected: usize,
        /// Number of edges supplied.
        found: usize,
    },

    /// An edge endpoint does not index into the label array.
    #[error("edge {edge} references point {index}, but only {n} points exist")]
    IndexOutOfRange {
        /// Index of the offending edge.
        edge: usize,
        /// The out-of-range endpoint.
        index: usize,
        /// Number of points.
        n: usize,
    },

    /// The edge list contains a cycle, so it cannot span all points.
    #[error("edge {edge} ({u}, {v}) closes a cycle; edges do not form a spanning tree")]
    NotATree {
        /// Index of the offending edge.
        edge: usize,
        /// First endpoint.
        u: usize,
        /// Second endpoint.
        v: usize,
    },
}
