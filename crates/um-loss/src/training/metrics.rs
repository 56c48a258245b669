use burn::prelude::*;

use crate::error::UmLossError;
use crate::loss::UltrametricLossOutput;
use crate::model::bridge::{tensor_to_f64, tensor_to_f64_vec};

/// Edge length below which the embedding is considered collapsed.
const COLLAPSE_THRESHOLD: f64 = 1e-6;

/// Ultrametric training metrics with health checks.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct UmMetrics {
    pub loss: f64,
    /// Same-label pairs over all edges.
    pub positive_pairs: f64,
    /// Different-label pairs over all edges.
    pub negative_pairs: f64,
    /// Mean ultrametric distance of positive pairs.
    pub pos_distance_mean: f64,
    /// Mean ultrametric distance of negative pairs.
    pub neg_distance_mean: f64,
    /// Negative pairs whose ultrametric distance is still below the margin.
    pub margin_violations: f64,
    pub max_edge_distance: f64,
}

impl UmMetrics {
    /// Compute metrics from a loss evaluation.
    ///
    /// Distances are weighted by the pair counts of their edge, so the means
    /// are over point pairs, not over edges.
    pub fn compute<B: Backend>(
        output: &UltrametricLossOutput<B>,
        alpha: f64,
    ) -> Result<Self, UmLossError> {
        let loss = tensor_to_f64(output.loss.clone());
        let distances = tensor_to_f64_vec(output.distances.clone())?;

        let mut positive_pairs = 0.0;
        let mut negative_pairs = 0.0;
        let mut pos_weighted = 0.0;
        let mut neg_weighted = 0.0;
        let mut margin_violations = 0.0;

        for ((&d, &pos), &neg) in distances.iter().zip(&output.num_pos).zip(&output.num_neg) {
            let (pos, neg) = (pos as f64, neg as f64);
            positive_pairs += pos;
            negative_pairs += neg;
            pos_weighted += pos * d;
            neg_weighted += neg * d;
            if d < alpha {
                margin_violations += neg;
            }
        }

        let mean = |sum: f64, count: f64| if count > 0.0 { sum / count } else { 0.0 };

        Ok(Self {
            loss,
            positive_pairs,
            negative_pairs,
            pos_distance_mean: mean(pos_weighted, positive_pairs),
            neg_distance_mean: mean(neg_weighted, negative_pairs),
            margin_violations,
            max_edge_distance: distances.iter().copied().fold(0.0, f64::max),
        })
    }

    /// Check for degenerate training states and log a warning for each.
    ///
    /// Returns the warnings so callers can act on them.
    pub fn health_check(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.loss.is_finite() {
            warnings.push(format!("loss is not finite ({})", self.loss));
        }
        if self.max_edge_distance < COLLAPSE_THRESHOLD {
            warnings.push(format!(
                "embedding collapsed: longest MST edge is {:.2e}",
                self.max_edge_distance
            ));
        }
        if self.negative_pairs > 0.0 && self.margin_violations == self.negative_pairs {
            warnings.push("every negative pair is inside the margin".to_string());
        }

        for warning in &warnings {
            tracing::warn!(loss = self.loss, "Health check: {warning}");
        }
        warnings
    }

    /// One-line summary for logs.
    pub fn display(&self) -> String {
        format!(
            "loss={:.4} pos_d={:.3} neg_d={:.3} violations={:.0}/{:.0}",
            self.loss,
            self.pos_distance_mean,
            self.neg_distance_mean,
            self.margin_violations,
            self.negative_pairs,
        )
    }
}

/// Per-step metrics over a training run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsHistory {
    entries: Vec<(usize, UmMetrics)>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: usize, metrics: UmMetrics) {
        self.entries.push((step, metrics));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&UmMetrics> {
        self.entries.first().map(|(_, m)| m)
    }

    pub fn last(&self) -> Option<&UmMetrics> {
        self.entries.last().map(|(_, m)| m)
    }

    /// Step and loss of the lowest-loss entry.
    pub fn best_loss(&self) -> Option<(usize, f64)> {
        self.entries
            .iter()
            .filter(|(_, m)| m.loss.is_finite())
            .map(|(s, m)| (*s, m.loss))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn entries(&self) -> &[(usize, UmMetrics)] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::tensor::TensorData;

    use crate::loss::{UltrametricLoss, UltrametricLossConfig};

    type TestBackend = NdArray<f32>;

    fn two_cluster_metrics(alpha: f64) -> UmMetrics {
        let device = Default::default();
        let points = Tensor::<TestBackend, 2>::from_data(
            TensorData::from([[0.0_f32, 0.0], [1.0, 0.0], [0.0, 5.0], [1.0, 5.0]]),
            &device,
        );
        let config = UltrametricLossConfig::new().with_alpha(alpha);
        let output = UltrametricLoss::new(config)
            .forward_points(points, &[0, 0, 1, 1])
            .unwrap();
        UmMetrics::compute(&output, alpha).unwrap()
    }

    #[test]
    fn test_two_cluster_metrics() {
        let m = two_cluster_metrics(10.0);
        assert!((m.loss - 102.0).abs() < 1e-4);
        assert_eq!(m.positive_pairs, 2.0);
        assert_eq!(m.negative_pairs, 4.0);
        assert!((m.pos_distance_mean - 1.0).abs() < 1e-6);
        assert!((m.neg_distance_mean - 5.0).abs() < 1e-6);
        assert_eq!(m.margin_violations, 4.0);
        assert!((m.max_edge_distance - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_health_check() {
        let separated = two_cluster_metrics(1.0);
        assert_eq!(separated.margin_violations, 0.0);
        assert!(separated.health_check().is_empty());

        let inside = two_cluster_metrics(10.0);
        assert_eq!(inside.health_check().len(), 1);

        let collapsed = UmMetrics {
            max_edge_distance: 0.0,
            loss: f64::NAN,
            ..separated
        };
        assert_eq!(collapsed.health_check().len(), 2);
    }

    #[test]
    fn test_history_best_loss() {
        let mut history = MetricsHistory::new();
        assert!(history.best_loss().is_none());

        let m = two_cluster_metrics(1.0);
        history.push(0, UmMetrics { loss: 3.0, ..m.clone() });
        history.push(1, UmMetrics { loss: 1.0, ..m.clone() });
        history.push(2, UmMetrics { loss: f64::NAN, ..m });
        assert_eq!(history.best_loss(), Some((1, 1.0)));
        assert_eq!(history.len(), 3);
        assert!(history.last().unwrap().loss.is_nan());
    }
}
