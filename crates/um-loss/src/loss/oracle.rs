//! Adapters between burn tensors and the host-side `emst` oracles.
//!
//! The oracles run in f64 on plain slices. Points are read back from the
//! graph in f64 before the MST is built, so tie-breaking does not depend on
//! the working precision. Results come back as f32, the precision every value
//! entering the graph is given in.

use burn::prelude::*;
use burn::tensor::TensorData;
use emst::{edges_to_rows, BottleneckPairStatistics, MstEdge, SpanningTreeBuilder};

use crate::error::UmLossError;
use crate::model::bridge::{tensor_to_f64_vec, to_working_precision};

/// Tree edges in host form plus their `(n-1, 3)` tensor form.
#[derive(Debug, Clone)]
pub struct MstOutput<B: Backend> {
    /// Edges as returned by the builder.
    pub edges: Vec<MstEdge>,
    /// `(u, v, distance)` rows. Built from data, so it carries no gradient;
    /// gradients flow through the recomputed edge distances instead.
    pub rows: Tensor<B, 2>,
}

/// Build the MST of a `(n, c)` point matrix.
pub fn build_mst<B: Backend, M: SpanningTreeBuilder + ?Sized>(
    builder: &M,
    points: Tensor<B, 2>,
) -> Result<MstOutput<B>, UmLossError> {
    let [n, dim] = points.dims();
    if n < 2 {
        return Err(UmLossError::TooFewPoints(n));
    }
    let device = points.device();
    let host = tensor_to_f64_vec(points)?;

    let edges = builder.build(&host, dim)?;
    if edges.len() != n - 1 {
        return Err(UmLossError::ShapeMismatch {
            expected: format!("{} MST edges", n - 1),
            found: format!("{} edges", edges.len()),
        });
    }

    let rows = Tensor::from_data(
        TensorData::new(to_working_precision(&edges_to_rows(&edges)), [n - 1, 3]),
        &device,
    );
    Ok(MstOutput { edges, rows })
}

/// Pair statistics cast to the working precision.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePairStats {
    /// Total loss.
    pub loss: f32,
    /// `∂loss/∂distance` per edge.
    pub gradient: Vec<f32>,
    /// Positive pairs per edge.
    pub num_pos: Vec<f32>,
    /// Negative pairs per edge.
    pub num_neg: Vec<f32>,
}

/// Evaluate the pair-statistics oracle on a tree and its flattened labels.
pub fn pair_stats<S: BottleneckPairStatistics + ?Sized>(
    oracle: &S,
    edges: &[MstEdge],
    labels: &[u64],
    alpha: f32,
) -> Result<EdgePairStats, UmLossError> {
    if labels.len() != edges.len() + 1 {
        return Err(UmLossError::ShapeMismatch {
            expected: format!("{} labels for {} edges", edges.len() + 1, edges.len()),
            found: format!("{} labels", labels.len()),
        });
    }

    let stats = oracle.compute(edges, labels, alpha as f64)?;

    Ok(EdgePairStats {
        loss: stats.loss as f32,
        gradient: to_working_precision(&stats.gradient),
        num_pos: to_working_precision(&stats.num_pos),
        num_neg: to_working_precision(&stats.num_neg),
    })
}
