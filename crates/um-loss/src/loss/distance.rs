//! Differentiable per-edge distances.
//!
//! The MST oracle already reports edge lengths, but in f64 and outside the
//! autodiff graph. Lengths are recomputed here from the embedding so that
//! gradients on distances flow back to the endpoint vectors.

use burn::prelude::*;
use emst::MstEdge;

use crate::model::bridge::indices_to_tensor;

/// Endpoint vectors and lengths of the tree edges.
#[derive(Debug, Clone)]
pub struct EdgeDistances<B: Backend> {
    /// `(n-1, c)` vectors at the `u` end of each edge.
    pub edges_u: Tensor<B, 2>,
    /// `(n-1, c)` vectors at the `v` end of each edge.
    pub edges_v: Tensor<B, 2>,
    /// `(n-1,)` squared Euclidean lengths.
    pub dist_squared: Tensor<B, 1>,
    /// `(n-1,)` Euclidean lengths.
    pub dist: Tensor<B, 1>,
}

/// Lower bound applied to squared lengths before the square root.
///
/// Keeps the sqrt derivative finite on zero-length edges; the clamp has zero
/// gradient there, so coincident endpoints receive no gradient at all.
pub const MIN_DIST_SQUARED: f32 = f32::MIN_POSITIVE;

/// Gather both endpoints of every edge from `points` and measure them.
///
/// Zero-length edges are legal and give a distance of (practically) zero.
pub fn edge_distances<B: Backend>(points: Tensor<B, 2>, edges: &[MstEdge]) -> EdgeDistances<B> {
    let device = points.device();
    let u = indices_to_tensor::<B>(edges.iter().map(|e| e.u), &device);
    let v = indices_to_tensor::<B>(edges.iter().map(|e| e.v), &device);

    let edges_u = points.clone().select(0, u);
    let edges_v = points.select(0, v);

    let diff = edges_u.clone() - edges_v.clone();
    let dist_squared: Tensor<B, 1> = diff.powf_scalar(2.0).sum_dim(1).squeeze::<1>(1);
    let dist = dist_squared.clone().clamp_min(MIN_DIST_SQUARED).sqrt();

    EdgeDistances {
        edges_u,
        edges_v,
        dist_squared,
        dist,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::tensor::TensorData;

    use crate::model::bridge::tensor_to_f32_vec;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_edge_lengths() {
        let device = Default::default();
        let points = Tensor::<TestBackend, 2>::from_data(
            TensorData::from([[0.0_f32, 0.0], [3.0, 4.0], [3.0, 4.0]]),
            &device,
        );
        let edges = [MstEdge::new(0, 1, 5.0), MstEdge::new(1, 2, 0.0)];

        let out = edge_distances(points, &edges);
        assert_eq!(out.edges_u.dims(), [2, 2]);
        assert_eq!(tensor_to_f32_vec(out.dist_squared).unwrap(), vec![25.0, 0.0]);
        let dist = tensor_to_f32_vec(out.dist).unwrap();
        assert_eq!(dist[0], 5.0);
        assert!(dist[1] < 1e-18);
        assert_eq!(tensor_to_f32_vec(out.edges_v).unwrap(), vec![3.0, 4.0, 3.0, 4.0]);
    }
}
