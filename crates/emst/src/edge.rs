//! Spanning-tree edge type and its flat `(n-1, 3)` row layout.

/// One edge of a spanning tree: two point indices and their distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MstEdge {
    /// First endpoint (index into the point array).
    pub u: usize,
    /// Second endpoint (index into the point array).
    pub v: usize,
    /// Euclidean distance between the endpoints, always `>= 0`.
    pub distance: f64,
}

impl MstEdge {
    pub fn new(u: usize, v: usize, distance: f64) -> Self {
        Self { u, v, distance }
    }
}

/// Flatten edges into row-major `(u, v, distance)` triples.
///
/// This is the `(n-1, 3)` array handed across the oracle boundary.
pub fn edges_to_rows(edges: &[MstEdge]) -> Vec<f64> {
    edges
        .iter()
        .flat_map(|e| [e.u as f64, e.v as f64, e.distance])
        .collect()
}

/// Rebuild edges from row-major `(u, v, distance)` triples.
///
/// A trailing partial row is ignored.
pub fn edges_from_rows(rows: &[f64]) -> Vec<MstEdge> {
    rows.chunks_exact(3)
        .map(|r| MstEdge::new(r[0] as usize, r[1] as usize, r[2]))
        .collect()
}
