use emst::OracleError;

/// Errors that can occur while evaluating the ultrametric loss.
#[derive(Debug, thiserror::Error)]
pub enum UmLossError {
    /// Embedding and labels disagree on the number of points, or a tensor
    /// has an unexpected shape.
    #[error("Shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        found: String,
    },

    /// The loss needs at least two points to form a tree.
    #[error("At least 2 points are required, got {0}")]
    TooFewPoints(usize),

    /// Error from the MST or pair-statistics oracle, passed through unchanged.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Tensor data could not be read back to the host.
    #[error("Tensor data error: {0}")]
    TensorData(String),
}
