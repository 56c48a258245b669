//! Euclidean minimum spanning tree construction.

use std::time::Instant;

use crate::edge::MstEdge;
use crate::error::OracleError;

/// Builds the minimum spanning tree of a point set.
///
/// Points arrive as a row-major `(n, dim)` matrix in f64. Implementations
/// must return exactly `n - 1` edges forming a spanning tree of minimum
/// total Euclidean length.
pub trait SpanningTreeBuilder: Send + Sync {
    /// Build the tree over `n = points.len() / dim` points.
    fn build(&self, points: &[f64], dim: usize) -> Result<Vec<MstEdge>, OracleError>;
}

/// Dense Prim's algorithm over the complete Euclidean graph.
///
/// O(n²) time and O(n) extra memory, with no index structure. Ties are broken
/// by the lowest point index, so the same input always yields the same tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanMst;

impl EuclideanMst {
    pub fn new() -> Self {
        Self
    }
}

/// Check the `(n, dim)` layout and return `n`.
fn validate_points(points: &[f64], dim: usize) -> Result<usize, OracleError> {
    if dim == 0 {
        return Err(OracleError::TooFewPoints(0));
    }
    if points.len() % dim != 0 {
        let n = points.len() / dim;
        return Err(OracleError::DimensionMismatch {
            index: n,
            expected: dim,
            found: points.len() % dim,
        });
    }
    let n = points.len() / dim;
    if n < 2 {
        return Err(OracleError::TooFewPoints(n));
    }
    if let Some(pos) = points.iter().position(|x| !x.is_finite()) {
        return Err(OracleError::NonFinite { index: pos / dim });
    }
    Ok(n)
}

#[inline]
fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

impl SpanningTreeBuilder for EuclideanMst {
    fn build(&self, points: &[f64], dim: usize) -> Result<Vec<MstEdge>, OracleError> {
        let n = validate_points(points, dim)?;
        let start = Instant::now();
        let point = |i: usize| &points[i * dim..(i + 1) * dim];

        // best[i]: squared distance from i to the tree, parent[i]: the tree
        // vertex realising it.
        let mut in_tree = vec![false; n];
        let mut best = vec![f64::INFINITY; n];
        let mut parent = vec![0usize; n];
        let mut edges = Vec::with_capacity(n - 1);

        in_tree[0] = true;
        for j in 1..n {
            best[j] = squared_distance(point(0), point(j));
        }

        for _ in 1..n {
            let mut next = usize::MAX;
            let mut next_dist = f64::INFINITY;
            for j in 0..n {
                if !in_tree[j] && (next == usize::MAX || best[j] < next_dist) {
                    next = j;
                    next_dist = best[j];
                }
            }

            in_tree[next] = true;
            edges.push(MstEdge::new(parent[next], next, next_dist.sqrt()));

            let p = point(next);
            for j in 0..n {
                if in_tree[j] {
                    continue;
                }
                let d = squared_distance(p, point(j));
                if d < best[j] {
                    best[j] = d;
                    parent[j] = next;
                }
            }
        }

        tracing::debug!(
            n_points = n,
            dim,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built Euclidean MST"
        );
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_clusters() {
        // (0,0) (1,0) (0,5) (1,5)
        let points = [0.0, 0.0, 1.0, 0.0, 0.0, 5.0, 1.0, 5.0];
        let edges = EuclideanMst::new().build(&points, 2).unwrap();

        assert_eq!(edges.len(), 3);
        let total: f64 = edges.iter().map(|e| e.distance).sum();
        assert!((total - 7.0).abs() < 1e-12, "total length {total}");
        let long: Vec<_> = edges.iter().filter(|e| e.distance > 1.5).collect();
        assert_eq!(long.len(), 1);
        assert!((long[0].distance - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_collinear_chain() {
        let points = [0.0, 3.0, 1.0, 10.0];
        let edges = EuclideanMst::new().build(&points, 1).unwrap();

        let mut pairs: Vec<(usize, usize)> = edges
            .iter()
            .map(|e| (e.u.min(e.v), e.u.max(e.v)))
            .collect();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 2), (1, 2), (1, 3)]);
    }

    #[test]
    fn test_duplicate_points_zero_distance() {
        let points = [1.0, 1.0, 1.0, 1.0, 4.0, 5.0];
        let edges = EuclideanMst::new().build(&points, 2).unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().any(|e| e.distance == 0.0));
    }

    #[test]
    fn test_single_point_rejected() {
        let err = EuclideanMst::new().build(&[1.0, 2.0], 2).unwrap_err();
        assert_eq!(err, OracleError::TooFewPoints(1));
    }

    #[test]
    fn test_ragged_input_rejected() {
        let err = EuclideanMst::new().build(&[1.0, 2.0, 3.0], 2).unwrap_err();
        assert!(matches!(err, OracleError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_nan_rejected() {
        let err = EuclideanMst::new()
            .build(&[0.0, 0.0, f64::NAN, 1.0], 2)
            .unwrap_err();
        assert_eq!(err, OracleError::NonFinite { index: 1 });
    }
}
