//! Ultrametric loss for embedding training.
//!
//! Trains embeddings so that points sharing a ground-truth label are close
//! and points with different labels are at least a margin `α` apart, measured
//! by the ultrametric (largest edge on the MST path) rather than directly.
//!
//! The MST and the pair statistics are computed host-side by the `emst`
//! oracles. Per-edge distances are recomputed inside the burn graph so
//! gradients reach the embedding. Two modes:
//!
//! - **exact**: the oracle's loss, with its per-edge gradient attached through
//!   [`loss::EdgeGradientHook`] and cached between forward and backward by
//!   [`loss::UmLossCache`];
//! - **pretrain**: a closed form over the oracle's pair counts, differentiated
//!   by the autodiff backend directly.
//!
//! # Key types
//!
//! - [`UltrametricLoss`] / [`UltrametricLossConfig`]: loss entry point
//! - [`VolumeEmbedding`]: learnable `(k, d, h, w)` embedding
//! - [`training::trainer::train`]: Adam training loop

pub mod error;
pub mod loss;
pub mod model;
pub mod training;

pub use error::UmLossError;
pub use loss::{
    ultrametric_loss, LossMode, UltrametricLoss, UltrametricLossConfig, UltrametricLossOutput,
    UmLossCache,
};
pub use model::embedding::{VolumeEmbedding, VolumeEmbeddingConfig};
pub use training::metrics::{MetricsHistory, UmMetrics};
pub use training::trainer::{train, TrainingConfig, TrainingOutcome};
