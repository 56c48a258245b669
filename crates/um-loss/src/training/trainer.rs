//! Training loop: learn a volume embedding under the ultrametric loss.
//!
//! Each step reads the current embedding, evaluates the loss with a fresh
//! step-scoped [`UmLossCache`], backpropagates and takes an Adam step. The
//! first `pretrain_steps` steps use the closed-form pretrain loss.

use std::time::Instant;

use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::error::UmLossError;
use crate::loss::{UltrametricLoss, UltrametricLossConfig, UmLossCache};
use crate::model::embedding::VolumeEmbedding;
use crate::training::metrics::{MetricsHistory, UmMetrics};

/// Configuration for embedding training, loaded from TOML.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct TrainingConfig {
    /// Learned embedding channels `k`.
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Standard deviation of the initial embedding.
    #[serde(default = "default_init_std")]
    pub init_std: f64,

    /// Adam learning rate after warmup.
    #[serde(default = "default_lr")]
    pub lr: f64,

    /// Number of linear warmup steps.
    #[serde(default)]
    pub warmup_steps: usize,

    /// Total number of optimisation steps.
    #[serde(default = "default_total_steps")]
    pub total_steps: usize,

    /// Leading steps that use the pretrain loss.
    #[serde(default = "default_pretrain_steps")]
    pub pretrain_steps: usize,

    /// Margin of the ultrametric loss.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Append voxel coordinates before building the MST.
    #[serde(default = "default_add_coordinates")]
    pub add_coordinates: bool,

    /// Steps between metric logging. 0 disables periodic logging.
    #[serde(default = "default_log_interval")]
    pub log_interval: usize,

    /// Backend RNG seed for the initial embedding.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_embedding_dim() -> usize {
    3
}
fn default_init_std() -> f64 {
    1.0
}
fn default_lr() -> f64 {
    1e-2
}
fn default_total_steps() -> usize {
    500
}
fn default_pretrain_steps() -> usize {
    100
}
fn default_alpha() -> f64 {
    0.1
}
fn default_add_coordinates() -> bool {
    true
}
fn default_log_interval() -> usize {
    50
}
fn default_seed() -> u64 {
    42
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            embedding_dim: default_embedding_dim(),
            init_std: default_init_std(),
            lr: default_lr(),
            warmup_steps: 0,
            total_steps: default_total_steps(),
            pretrain_steps: default_pretrain_steps(),
            alpha: default_alpha(),
            add_coordinates: default_add_coordinates(),
            log_interval: default_log_interval(),
            seed: default_seed(),
        }
    }
}

impl TrainingConfig {
    /// Log a warning for settings that are legal but probably unintended.
    pub fn validate(&self) {
        if self.pretrain_steps > self.total_steps {
            tracing::warn!(
                pretrain_steps = self.pretrain_steps,
                total_steps = self.total_steps,
                "pretrain_steps exceeds total_steps; the exact loss is never used"
            );
        }
        if self.alpha < 0.0 {
            tracing::warn!(alpha = self.alpha, "negative alpha disables the negative-pair term");
        }
        if self.lr <= 0.0 {
            tracing::warn!(lr = self.lr, "non-positive learning rate; the embedding will not move");
        }
    }

    /// Loss configuration for a given step.
    pub fn loss_config(&self, pretrain: bool) -> UltrametricLossConfig {
        UltrametricLossConfig::new()
            .with_alpha(self.alpha)
            .with_add_coordinates(self.add_coordinates)
            .with_pretrain(pretrain)
    }
}

/// Learning rate at `step`: linear warmup to `base_lr`, then constant.
pub fn lr_schedule(base_lr: f64, warmup_steps: usize, step: usize) -> f64 {
    if warmup_steps > 0 && step < warmup_steps {
        base_lr * (step + 1) as f64 / warmup_steps as f64
    } else {
        base_lr
    }
}

/// Trained model and the metrics recorded along the way.
pub struct TrainingOutcome<B: AutodiffBackend> {
    pub model: VolumeEmbedding<B>,
    pub history: MetricsHistory,
}

/// Run the training loop.
///
/// `labels` is the ground-truth volume flattened row-major over `(d, h, w)`
/// of the model. Errors from the loss abort training immediately.
pub fn train<B: AutodiffBackend>(
    config: &TrainingConfig,
    mut model: VolumeEmbedding<B>,
    labels: &[u64],
) -> Result<TrainingOutcome<B>, UmLossError> {
    let pretrain_loss = UltrametricLoss::new(config.loss_config(true));
    let exact_loss = UltrametricLoss::new(config.loss_config(false));

    let mut optimizer = AdamConfig::new().init();
    let mut history = MetricsHistory::new();
    let train_start = Instant::now();

    tracing::info!(
        dims = ?model.dims(),
        total_steps = config.total_steps,
        pretrain_steps = config.pretrain_steps,
        alpha = config.alpha,
        "Starting ultrametric embedding training"
    );

    for step in 0..config.total_steps {
        let lr = lr_schedule(config.lr, config.warmup_steps, step);
        let loss_fn = if step < config.pretrain_steps {
            &pretrain_loss
        } else {
            &exact_loss
        };
        if step == config.pretrain_steps && step > 0 {
            tracing::info!(step, "Switching from pretrain to exact loss");
        }

        let mut cache = UmLossCache::new(loss_fn.pair_statistics());
        let output = loss_fn.forward_with_cache(model.forward(), labels, &mut cache)?;
        let metrics = UmMetrics::compute(&output, config.alpha)?;

        let grads = GradientsParams::from_grads(output.loss.backward(), &model);
        model = optimizer.step(lr, model, grads);

        if config.log_interval > 0 && step % config.log_interval == 0 {
            tracing::info!(
                step,
                mode = %output.mode,
                lr,
                elapsed_s = train_start.elapsed().as_secs_f64(),
                "{}",
                metrics.display()
            );
            metrics.health_check();
        }
        history.push(step, metrics);
    }

    if let Some(last) = history.last() {
        tracing::info!(
            steps = history.len(),
            elapsed_s = train_start.elapsed().as_secs_f64(),
            "Training complete: {}",
            last.display()
        );
    }

    Ok(TrainingOutcome { model, history })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::backend::Autodiff;

    use crate::model::embedding::VolumeEmbeddingConfig;

    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn test_lr_schedule() {
        assert!((lr_schedule(1.0, 4, 0) - 0.25).abs() < 1e-12);
        assert!((lr_schedule(1.0, 4, 3) - 1.0).abs() < 1e-12);
        assert_eq!(lr_schedule(0.5, 4, 100), 0.5);
        assert_eq!(lr_schedule(0.5, 0, 0), 0.5);
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: TrainingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.embedding_dim, 3);
        assert_eq!(config.alpha, 0.1);
        assert!(config.add_coordinates);
        assert_eq!(config.total_steps, 500);
    }

    #[test]
    fn test_loss_config_modes() {
        let config = TrainingConfig::default();
        assert!(config.loss_config(true).pretrain);
        assert!(!config.loss_config(false).pretrain);
        assert_eq!(config.loss_config(false).alpha, config.alpha);
    }

    #[test]
    fn test_training_reduces_loss() {
        let device = Default::default();
        TestAutodiffBackend::seed(7);
        let model = VolumeEmbeddingConfig::new(2, 1, 2, 4).init::<TestAutodiffBackend>(&device);
        // Left half label 0, right half label 1.
        let labels = [0, 0, 1, 1, 0, 0, 1, 1];

        let config = TrainingConfig {
            embedding_dim: 2,
            lr: 0.05,
            total_steps: 40,
            pretrain_steps: 20,
            alpha: 2.0,
            log_interval: 0,
            ..TrainingConfig::default()
        };
        let outcome = train(&config, model, &labels).unwrap();

        assert_eq!(outcome.history.len(), 40);
        let first = outcome.history.first().unwrap().loss;
        let (_, best) = outcome.history.best_loss().unwrap();
        assert!(best < first, "loss did not improve: first={first}, best={best}");
    }

    #[test]
    fn test_training_rejects_wrong_labels() {
        let device = Default::default();
        let model = VolumeEmbeddingConfig::new(2, 1, 2, 2).init::<TestAutodiffBackend>(&device);
        let config = TrainingConfig {
            total_steps: 1,
            ..TrainingConfig::default()
        };
        assert!(train(&config, model, &[0, 1]).is_err());
    }
}
