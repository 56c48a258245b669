//! Bottleneck pair statistics over a spanning tree.
//!
//! In a minimum spanning tree, the largest edge on the tree path between two
//! points is their ultrametric (single-linkage) distance. Every unordered pair
//! of points therefore belongs to exactly one edge: the one that first
//! connects them when the edges are added in ascending order of length.
//!
//! For each edge `e` with length `d` we count the positive pairs (same label)
//! `P(e)` and the negative pairs (different labels) `N(e)` it connects, and
//! evaluate
//!
//! ```text
//! L = Σ_e  P(e)·d²  +  N(e)·max(0, α − d)²
//! ∂L/∂d = 2·P(e)·d − 2·N(e)·max(0, α − d)
//! ```

use std::time::Instant;

use ordered_float::OrderedFloat;

use crate::edge::MstEdge;
use crate::error::OracleError;
use crate::union_find::LabelUnionFind;

/// Loss, gradient and pair counts for one spanning tree.
///
/// Vectors are indexed like the input edge list, not in sorted order. All
/// values are f64; callers cast to their working precision.
#[derive(Debug, Clone, PartialEq)]
pub struct PairStats {
    /// Total loss over all pairs.
    pub loss: f64,
    /// `∂loss/∂distance` per edge.
    pub gradient: Vec<f64>,
    /// Same-label pairs whose bottleneck is this edge.
    pub num_pos: Vec<f64>,
    /// Different-label pairs whose bottleneck is this edge.
    pub num_neg: Vec<f64>,
}

impl PairStats {
    /// Sum of positive and negative pairs over all edges.
    pub fn total_pairs(&self) -> f64 {
        self.num_pos.iter().sum::<f64>() + self.num_neg.iter().sum::<f64>()
    }
}

/// Computes [`PairStats`] for a spanning tree and a flat label array.
pub trait BottleneckPairStatistics: Send + Sync {
    /// `edges` must hold `labels.len() - 1` edges forming a spanning tree over
    /// the points `0..labels.len()`.
    fn compute(
        &self,
        edges: &[MstEdge],
        labels: &[u64],
        alpha: f64,
    ) -> Result<PairStats, OracleError>;
}

/// Kruskal-order tree contraction with label histograms.
#[derive(Debug, Clone, Copy, Default)]
pub struct UmPairStatistics;

impl UmPairStatistics {
    pub fn new() -> Self {
        Self
    }
}

fn validate_edges(edges: &[MstEdge], labels: &[u64]) -> Result<(), OracleError> {
    let n = labels.len();
    if n < 2 {
        return Err(OracleError::TooFewPoints(n));
    }
    if edges.len() != n - 1 {
        return Err(OracleError::LabelCountMismatch {
            labels: n,
            expected: n - 1,
            found: edges.len(),
        });
    }
    for (i, e) in edges.iter().enumerate() {
        for index in [e.u, e.v] {
            if index >= n {
                return Err(OracleError::IndexOutOfRange { edge: i, index, n });
            }
        }
    }
    Ok(())
}

impl BottleneckPairStatistics for UmPairStatistics {
    fn compute(
        &self,
        edges: &[MstEdge],
        labels: &[u64],
        alpha: f64,
    ) -> Result<PairStats, OracleError> {
        validate_edges(edges, labels)?;
        let start = Instant::now();

        // Stable sort: equal lengths keep their input order.
        let mut order: Vec<usize> = (0..edges.len()).collect();
        order.sort_by_key(|&i| OrderedFloat(edges[i].distance));

        let mut uf = LabelUnionFind::new(labels);
        let mut num_pos = vec![0.0; edges.len()];
        let mut num_neg = vec![0.0; edges.len()];
        let mut gradient = vec![0.0; edges.len()];
        let mut loss = 0.0;

        for i in order {
            let e = &edges[i];
            let counts = uf
                .union(e.u, e.v)
                .ok_or(OracleError::NotATree { edge: i, u: e.u, v: e.v })?;

            let pos = counts.positive as f64;
            let neg = counts.negative as f64;
            let d = e.distance;
            let slack = (alpha - d).max(0.0);

            num_pos[i] = pos;
            num_neg[i] = neg;
            loss += pos * d * d + neg * slack * slack;
            gradient[i] = 2.0 * pos * d - 2.0 * neg * slack;
        }

        tracing::debug!(
            n_points = labels.len(),
            alpha,
            loss,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Computed bottleneck pair statistics"
        );

        Ok(PairStats {
            loss,
            gradient,
            num_pos,
            num_neg,
        })
    }
}
