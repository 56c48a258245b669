//! Forward/backward cache for the pair-statistics oracle.
//!
//! The oracle produces the loss and the per-edge gradient in one pass. The
//! forward pass needs the loss and the backward pass needs the gradient, so
//! the forward call keeps the whole result for the backward call to pick up.
//!
//! One cache belongs to one loss evaluation. It is created empty by the
//! caller, filled by [`UmLossCache::loss`], and dropped with the step; it is
//! never shared between steps or threads.

use emst::{BottleneckPairStatistics, MstEdge};

use crate::error::UmLossError;
use crate::loss::oracle::{pair_stats, EdgePairStats};

/// Loss and pair counts handed to the forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardStats {
    /// Total loss.
    pub loss: f32,
    /// Positive pairs per edge.
    pub num_pos: Vec<f32>,
    /// Negative pairs per edge.
    pub num_neg: Vec<f32>,
}

/// Step-scoped cache around a pair-statistics oracle.
pub struct UmLossCache<'a, S: BottleneckPairStatistics + ?Sized> {
    oracle: &'a S,
    state: Option<EdgePairStats>,
}

impl<'a, S: BottleneckPairStatistics + ?Sized> UmLossCache<'a, S> {
    /// Create an empty cache.
    pub fn new(oracle: &'a S) -> Self {
        Self {
            oracle,
            state: None,
        }
    }

    /// Run the oracle, remember its full result, and return loss and counts.
    ///
    /// Any previously cached result is overwritten.
    pub fn loss(
        &mut self,
        mst: &[MstEdge],
        labels: &[u64],
        alpha: f32,
    ) -> Result<ForwardStats, UmLossError> {
        let stats = pair_stats(self.oracle, mst, labels, alpha)?;
        let forward = ForwardStats {
            loss: stats.loss,
            num_pos: stats.num_pos.clone(),
            num_neg: stats.num_neg.clone(),
        };
        self.state = Some(stats);
        Ok(forward)
    }

    /// Recompute the per-edge gradient from scratch.
    ///
    /// Does not read or modify the cached result, so it is valid with or
    /// without a prior [`loss`](Self::loss) call. It costs a full oracle run.
    pub fn gradient(
        &self,
        mst: &[MstEdge],
        labels: &[u64],
        alpha: f32,
    ) -> Result<Vec<f32>, UmLossError> {
        Ok(pair_stats(self.oracle, mst, labels, alpha)?.gradient)
    }

    /// Gradient cached by the last [`loss`](Self::loss) call, if any.
    pub fn cached_gradient(&self) -> Option<&[f32]> {
        self.state.as_ref().map(|s| s.gradient.as_slice())
    }

    /// Gradient for the backward pass: the cached one when present, else a
    /// fresh [`gradient`](Self::gradient) computation.
    pub fn backward_gradient(
        &self,
        mst: &[MstEdge],
        labels: &[u64],
        alpha: f32,
    ) -> Result<Vec<f32>, UmLossError> {
        match self.cached_gradient() {
            Some(gradient) => Ok(gradient.to_vec()),
            None => {
                tracing::debug!(n_edges = mst.len(), "Gradient cache empty, recomputing");
                self.gradient(mst, labels, alpha)
            }
        }
    }

    /// Whether a forward result is held.
    pub fn is_populated(&self) -> bool {
        self.state.is_some()
    }
}
