//! Ultrametric loss assembly.
//!
//! ```text
//! (k, d, h, w) embedding
//!   → [append (z, y, x) channels]
//!   → (d·h·w, c) points
//!   → EMST (host, f64)
//!   → per-edge distances (graph)
//!   → exact:    oracle loss + cached per-edge gradient hook
//!     pretrain: Σ_e dist²·P(e) + max(0, α − dist)²·N(e) in graph ops
//! ```
//!
//! Both modes call the pair-statistics oracle exactly once per evaluation.

use std::fmt;

use burn::prelude::*;
use emst::{
    BottleneckPairStatistics, EuclideanMst, MstEdge, SpanningTreeBuilder, UmPairStatistics,
};

use crate::error::UmLossError;
use crate::loss::cache::UmLossCache;
use crate::loss::distance::{edge_distances, EdgeDistances};
use crate::loss::gradient::EdgeGradientHook;
use crate::loss::oracle::{build_mst, pair_stats};
use crate::model::bridge::vec_to_tensor;
use crate::model::volume::{augment_coordinates, to_point_vectors};

/// Configuration for the ultrametric loss.
#[derive(Config, Debug)]
pub struct UltrametricLossConfig {
    /// Margin: differently labelled pairs are penalised while their
    /// ultrametric distance is below it.
    #[config(default = 0.1)]
    pub alpha: f64,
    /// Append `(z, y, x)` voxel coordinates to the embedding before the MST.
    #[config(default = true)]
    pub add_coordinates: bool,
    /// Use the closed-form pretrain loss instead of the exact one.
    #[config(default = false)]
    pub pretrain: bool,
}

impl UltrametricLossConfig {
    /// Loss mode selected by [`pretrain`](Self::pretrain).
    pub fn mode(&self) -> LossMode {
        if self.pretrain {
            LossMode::Pretrain
        } else {
            LossMode::Exact
        }
    }
}

/// How the loss value and its gradient are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossMode {
    /// Oracle loss with the oracle's per-edge gradient attached.
    Exact,
    /// Closed form over pair counts, differentiated by the autodiff backend.
    Pretrain,
}

impl fmt::Display for LossMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossMode::Exact => write!(f, "exact"),
            LossMode::Pretrain => write!(f, "pretrain"),
        }
    }
}

/// Loss plus the tree it was computed on.
///
/// Everything except `loss` is for diagnostics and visualisation.
#[derive(Debug, Clone)]
pub struct UltrametricLossOutput<B: Backend> {
    /// Scalar loss, shape `(1,)`.
    pub loss: Tensor<B, 1>,
    /// `(n-1, 3)` MST rows `(u, v, distance)`; carries no gradient.
    pub mst: Tensor<B, 2>,
    /// `(n-1, c)` embedding vectors at the `u` end of each edge.
    pub edges_u: Tensor<B, 2>,
    /// `(n-1, c)` embedding vectors at the `v` end of each edge.
    pub edges_v: Tensor<B, 2>,
    /// `(n-1,)` recomputed edge distances.
    pub distances: Tensor<B, 1>,
    /// MST edges in host form.
    pub edges: Vec<MstEdge>,
    /// Positive pairs per edge.
    pub num_pos: Vec<f32>,
    /// Negative pairs per edge.
    pub num_neg: Vec<f32>,
    /// Mode the loss was computed in.
    pub mode: LossMode,
}

/// The ultrametric loss with its two oracles.
pub struct UltrametricLoss<M = EuclideanMst, S = UmPairStatistics> {
    config: UltrametricLossConfig,
    mst_builder: M,
    pair_stats: S,
}

impl UltrametricLoss {
    /// Loss backed by the native `emst` oracles.
    pub fn new(config: UltrametricLossConfig) -> Self {
        Self::with_oracles(config, EuclideanMst::new(), UmPairStatistics::new())
    }
}

impl<M: SpanningTreeBuilder, S: BottleneckPairStatistics> UltrametricLoss<M, S> {
    /// Loss backed by custom oracles.
    pub fn with_oracles(config: UltrametricLossConfig, mst_builder: M, pair_stats: S) -> Self {
        Self {
            config,
            mst_builder,
            pair_stats,
        }
    }

    pub fn config(&self) -> &UltrametricLossConfig {
        &self.config
    }

    /// The pair-statistics oracle, for building a [`UmLossCache`].
    pub fn pair_statistics(&self) -> &S {
        &self.pair_stats
    }

    /// Evaluate the loss on a `(k, d, h, w)` embedding.
    ///
    /// `labels` is the ground truth flattened row-major over `(d, h, w)`.
    pub fn forward<B: Backend>(
        &self,
        embedding: Tensor<B, 4>,
        labels: &[u64],
    ) -> Result<UltrametricLossOutput<B>, UmLossError> {
        let mut cache = UmLossCache::new(&self.pair_stats);
        self.forward_with_cache(embedding, labels, &mut cache)
    }

    /// [`forward`](Self::forward) with a caller-owned, step-scoped cache.
    pub fn forward_with_cache<B: Backend>(
        &self,
        embedding: Tensor<B, 4>,
        labels: &[u64],
        cache: &mut UmLossCache<'_, S>,
    ) -> Result<UltrametricLossOutput<B>, UmLossError> {
        let [channels, depth, height, width] = embedding.dims();
        let n = depth * height * width;
        if labels.len() != n {
            return Err(UmLossError::ShapeMismatch {
                expected: format!("{n} labels for a {depth}x{height}x{width} volume"),
                found: format!("{} labels", labels.len()),
            });
        }
        if n < 2 {
            return Err(UmLossError::TooFewPoints(n));
        }
        tracing::trace!(channels, depth, height, width, "Flattening embedding volume");

        let embedding = augment_coordinates(embedding, self.config.add_coordinates);
        self.forward_points_with_cache(to_point_vectors(embedding), labels, cache)
    }

    /// Evaluate the loss on an already flattened `(n, c)` point matrix.
    pub fn forward_points<B: Backend>(
        &self,
        points: Tensor<B, 2>,
        labels: &[u64],
    ) -> Result<UltrametricLossOutput<B>, UmLossError> {
        let mut cache = UmLossCache::new(&self.pair_stats);
        self.forward_points_with_cache(points, labels, &mut cache)
    }

    /// [`forward_points`](Self::forward_points) with a caller-owned cache.
    pub fn forward_points_with_cache<B: Backend>(
        &self,
        points: Tensor<B, 2>,
        labels: &[u64],
        cache: &mut UmLossCache<'_, S>,
    ) -> Result<UltrametricLossOutput<B>, UmLossError> {
        let [n, _] = points.dims();
        if labels.len() != n {
            return Err(UmLossError::ShapeMismatch {
                expected: format!("{n} labels"),
                found: format!("{} labels", labels.len()),
            });
        }

        let mst = build_mst(&self.mst_builder, points.clone())?;
        let distances = edge_distances(points, &mst.edges);
        let alpha = self.config.alpha as f32;
        let mode = self.config.mode();

        let (loss, num_pos, num_neg) = match mode {
            LossMode::Pretrain => self.pretrain_loss(&distances, &mst.edges, labels, alpha)?,
            LossMode::Exact => exact_loss(cache, &distances, &mst.edges, labels, alpha)?,
        };

        tracing::debug!(
            mode = %mode,
            n_points = n,
            alpha,
            positive_pairs = num_pos.iter().sum::<f32>(),
            negative_pairs = num_neg.iter().sum::<f32>(),
            "Evaluated ultrametric loss"
        );

        Ok(UltrametricLossOutput {
            loss,
            mst: mst.rows,
            edges_u: distances.edges_u,
            edges_v: distances.edges_v,
            distances: distances.dist,
            edges: mst.edges,
            num_pos,
            num_neg,
            mode,
        })
    }

    /// Closed-form loss over the oracle's pair counts; its loss and gradient
    /// are ignored.
    fn pretrain_loss<B: Backend>(
        &self,
        distances: &EdgeDistances<B>,
        edges: &[MstEdge],
        labels: &[u64],
        alpha: f32,
    ) -> Result<(Tensor<B, 1>, Vec<f32>, Vec<f32>), UmLossError> {
        let stats = pair_stats(&self.pair_stats, edges, labels, alpha)?;
        let device = distances.dist.device();
        let num_pos = vec_to_tensor::<B>(stats.num_pos.clone(), &device);
        let num_neg = vec_to_tensor::<B>(stats.num_neg.clone(), &device);

        let loss_pos = distances.dist_squared.clone() * num_pos;
        let slack = distances.dist.clone().neg().add_scalar(alpha).clamp_min(0.0);
        let loss_neg = slack.powf_scalar(2.0) * num_neg;
        let loss = (loss_pos + loss_neg).sum();

        Ok((loss, stats.num_pos, stats.num_neg))
    }
}

/// Oracle loss with the cached per-edge gradient attached to `dist`.
fn exact_loss<B: Backend, S: BottleneckPairStatistics + ?Sized>(
    cache: &mut UmLossCache<'_, S>,
    distances: &EdgeDistances<B>,
    edges: &[MstEdge],
    labels: &[u64],
    alpha: f32,
) -> Result<(Tensor<B, 1>, Vec<f32>, Vec<f32>), UmLossError> {
    let forward = cache.loss(edges, labels, alpha)?;
    let gradient = cache.backward_gradient(edges, labels, alpha)?;
    let loss = EdgeGradientHook::new(gradient).attach(forward.loss, distances.dist.clone());
    Ok((loss, forward.num_pos, forward.num_neg))
}

/// Evaluate the ultrametric loss on a `(k, d, h, w)` embedding with the
/// native oracles.
pub fn ultrametric_loss<B: Backend>(
    embedding: Tensor<B, 4>,
    labels: &[u64],
    alpha: f64,
    add_coordinates: bool,
    pretrain: bool,
) -> Result<UltrametricLossOutput<B>, UmLossError> {
    let config = UltrametricLossConfig::new()
        .with_alpha(alpha)
        .with_add_coordinates(add_coordinates)
        .with_pretrain(pretrain);
    UltrametricLoss::new(config).forward(embedding, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::backend::Autodiff;
    use burn::tensor::TensorData;
    use emst::mocks::{FixedPairStatistics, FixedSpanningTree};
    use emst::PairStats;

    use crate::model::bridge::{tensor_to_f32_vec, tensor_to_f64};

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    /// Helper: (0,0) (1,0) (0,5) (1,5) as a `(2, 1, 1, 4)` volume.
    fn two_cluster_volume<B: Backend>(device: &B::Device) -> Tensor<B, 4> {
        Tensor::from_data(
            TensorData::new(
                vec![0.0_f32, 1.0, 0.0, 1.0, 0.0, 0.0, 5.0, 5.0],
                [2, 1, 1, 4],
            ),
            device,
        )
    }

    fn config(alpha: f64, pretrain: bool) -> UltrametricLossConfig {
        UltrametricLossConfig::new()
            .with_alpha(alpha)
            .with_add_coordinates(false)
            .with_pretrain(pretrain)
    }

    #[test]
    fn test_defaults() {
        let config = UltrametricLossConfig::new();
        assert_eq!(config.alpha, 0.1);
        assert!(config.add_coordinates);
        assert_eq!(config.mode(), LossMode::Exact);
    }

    #[test]
    fn test_two_clusters_both_modes_agree() {
        let device = Default::default();
        let labels = [0, 0, 1, 1];

        for alpha in [1.0, 10.0] {
            let exact = UltrametricLoss::new(config(alpha, false))
                .forward(two_cluster_volume::<TestBackend>(&device), &labels)
                .unwrap();
            let pretrain = UltrametricLoss::new(config(alpha, true))
                .forward(two_cluster_volume::<TestBackend>(&device), &labels)
                .unwrap();

            let expected = if alpha == 1.0 { 2.0 } else { 102.0 };
            assert!((tensor_to_f64(exact.loss) - expected).abs() < 1e-4);
            assert!((tensor_to_f64(pretrain.loss) - expected).abs() < 1e-4);
            assert_eq!(exact.num_neg.iter().sum::<f32>(), 4.0);
            assert_eq!(exact.mode, LossMode::Exact);
            assert_eq!(pretrain.mode, LossMode::Pretrain);
        }
    }

    #[test]
    fn test_outputs_shapes() {
        let device = Default::default();
        let embedding = Tensor::<TestBackend, 4>::zeros([2, 2, 2, 2], &device);
        let labels = [0, 0, 0, 0, 1, 1, 1, 1];

        let out = UltrametricLoss::new(UltrametricLossConfig::new())
            .forward(embedding, &labels)
            .unwrap();
        assert_eq!(out.mst.dims(), [7, 3]);
        assert_eq!(out.edges_u.dims(), [7, 5]);
        assert_eq!(out.edges_v.dims(), [7, 5]);
        assert_eq!(out.distances.dims(), [7]);
        assert_eq!(out.edges.len(), 7);
    }

    #[test]
    fn test_label_count_mismatch() {
        let device = Default::default();
        let err = UltrametricLoss::new(config(1.0, false))
            .forward(two_cluster_volume::<TestBackend>(&device), &[0, 0, 1])
            .unwrap_err();
        assert!(matches!(err, UmLossError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_single_point_rejected() {
        let device = Default::default();
        let embedding = Tensor::<TestBackend, 4>::zeros([3, 1, 1, 1], &device);
        let err = UltrametricLoss::new(UltrametricLossConfig::new())
            .forward(embedding, &[0])
            .unwrap_err();
        assert!(matches!(err, UmLossError::TooFewPoints(1)));
    }

    #[test]
    fn test_pretrain_ignores_oracle_loss_and_gradient() {
        let device = Default::default();
        let tree = FixedSpanningTree::new(vec![(0, 1), (0, 2), (2, 3)]);
        let stats = FixedPairStatistics::new(PairStats {
            loss: 1234.5,
            gradient: vec![-7.0, 99.0, 0.5],
            num_pos: vec![2.0, 1.0, 3.0],
            num_neg: vec![1.0, 5.0, 0.0],
        });
        let loss = UltrametricLoss::with_oracles(config(6.0, true), tree, stats);

        let out = loss
            .forward(two_cluster_volume::<TestBackend>(&device), &[0, 0, 1, 1])
            .unwrap();

        // dist = [1, 5, 1]:
        //   1·2 + (6−1)²·1 + 25·1 + (6−5)²·5 + 1·3 + 0 = 2 + 25 + 25 + 5 + 3
        assert!((tensor_to_f64(out.loss) - 60.0).abs() < 1e-4);
        assert_eq!(loss.pair_statistics().calls(), 1);
    }

    #[test]
    fn test_exact_gradient_flows_to_embedding() {
        let device = Default::default();
        let embedding = two_cluster_volume::<TestAutodiffBackend>(&device).require_grad();

        let out = UltrametricLoss::new(config(10.0, false))
            .forward(embedding.clone(), &[0, 0, 1, 1])
            .unwrap();
        let grads = out.loss.backward();
        let grad = tensor_to_f32_vec(embedding.grad(&grads).unwrap()).unwrap();

        // Channel-major (x row, then y row). The short edges pull their
        // endpoints together with ∂L/∂d = 2; the bridge pushes the clusters
        // apart with ∂L/∂d = −40, split over whichever vertical edge the MST
        // picked.
        let grad_x = &grad[0..4];
        assert!((grad_x[0] - (-2.0)).abs() < 1e-4);
        assert!((grad_x[1] - 2.0).abs() < 1e-4);
        assert!((grad_x[2] - (-2.0)).abs() < 1e-4);
        assert!((grad_x[3] - 2.0).abs() < 1e-4);
        let grad_y_total: f32 = grad[4..8].iter().map(|g| g.abs()).sum();
        assert!((grad_y_total - 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_exact_and_pretrain_gradients_match() {
        let device = Default::default();
        let labels = [0, 0, 1, 1];

        let mut gradients = Vec::new();
        for pretrain in [false, true] {
            let embedding = two_cluster_volume::<TestAutodiffBackend>(&device).require_grad();
            let out = UltrametricLoss::new(config(10.0, pretrain))
                .forward(embedding.clone(), &labels)
                .unwrap();
            let grads = out.loss.backward();
            gradients.push(tensor_to_f32_vec(embedding.grad(&grads).unwrap()).unwrap());
        }

        for (a, b) in gradients[0].iter().zip(&gradients[1]) {
            assert!((a - b).abs() < 1e-3, "exact {a} vs pretrain {b}");
        }
    }

    #[test]
    fn test_free_function_matches_struct() {
        let device = Default::default();
        let out = ultrametric_loss(
            two_cluster_volume::<TestBackend>(&device),
            &[0, 0, 1, 1],
            1.0,
            false,
            true,
        )
        .unwrap();
        assert!((tensor_to_f64(out.loss) - 2.0).abs() < 1e-4);
    }
}
