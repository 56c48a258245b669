//! Stub oracles for testing loss orchestration without the real algorithms.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::edge::MstEdge;
use crate::error::OracleError;
use crate::pair_stats::{BottleneckPairStatistics, PairStats};
use crate::builder::SpanningTreeBuilder;

// ---------------------------------------------------------------------------
// FixedSpanningTree
// ---------------------------------------------------------------------------

/// Spanning-tree builder that returns a canned topology.
///
/// Edge distances are recomputed from the supplied points so the returned
/// edges stay consistent with the input.
pub struct FixedSpanningTree {
    pairs: Vec<(usize, usize)>,
}

impl FixedSpanningTree {
    pub fn new(pairs: Vec<(usize, usize)>) -> Self {
        Self { pairs }
    }
}

impl SpanningTreeBuilder for FixedSpanningTree {
    fn build(&self, points: &[f64], dim: usize) -> Result<Vec<MstEdge>, OracleError> {
        let n = if dim == 0 { 0 } else { points.len() / dim };
        if n < 2 {
            return Err(OracleError::TooFewPoints(n));
        }
        self.pairs
            .iter()
            .enumerate()
            .map(|(edge, &(u, v))| {
                for index in [u, v] {
                    if index >= n {
                        return Err(OracleError::IndexOutOfRange { edge, index, n });
                    }
                }
                let a = &points[u * dim..(u + 1) * dim];
                let b = &points[v * dim..(v + 1) * dim];
                let d2: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                Ok(MstEdge::new(u, v, d2.sqrt()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// FixedPairStatistics
// ---------------------------------------------------------------------------

/// Pair-statistics oracle that returns canned values and counts its calls.
pub struct FixedPairStatistics {
    stats: PairStats,
    calls: AtomicUsize,
}

impl FixedPairStatistics {
    pub fn new(stats: PairStats) -> Self {
        Self {
            stats,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times [`BottleneckPairStatistics::compute`] was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BottleneckPairStatistics for FixedPairStatistics {
    fn compute(
        &self,
        edges: &[MstEdge],
        _labels: &[u64],
        _alpha: f64,
    ) -> Result<PairStats, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if edges.len() != self.stats.num_pos.len() {
            return Err(OracleError::LabelCountMismatch {
                labels: edges.len() + 1,
                expected: self.stats.num_pos.len(),
                found: edges.len(),
            });
        }
        Ok(self.stats.clone())
    }
}
