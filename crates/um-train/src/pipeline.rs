//! Training and inspection pipelines behind the CLI subcommands.

use std::path::PathBuf;
use std::time::Instant;

use burn::backend::ndarray::NdArray;
use burn::backend::Autodiff;
use burn::prelude::*;

use um_loss::model::bridge::tensor_to_f32_vec;
use um_loss::{train, UltrametricLoss, UltrametricLossConfig, UmMetrics, VolumeEmbeddingConfig};

use crate::config::{apply_overrides, load_train_toml, TrainOverrides, TrainToml};
use crate::volume::{EmbeddingFile, LabelVolume, TrainReport};

type TrainBackend = Autodiff<NdArray<f32>>;
type EvalBackend = NdArray<f32>;

/// Arguments for the `train` subcommand.
#[derive(Debug)]
pub struct TrainArgs {
    /// Path to the training config TOML file. Missing means all defaults.
    pub config: Option<PathBuf>,
    /// Path to the label volume JSON file.
    pub labels: PathBuf,
    /// Path for the output report JSON file.
    pub output: Option<PathBuf>,
    /// CLI overrides for TOML values.
    pub overrides: TrainOverrides,
}

/// Arguments for the `stats` subcommand.
#[derive(Debug)]
pub struct StatsArgs {
    /// Path to the label volume JSON file.
    pub labels: PathBuf,
    /// Embedding or training report JSON. Random when absent.
    pub embedding: Option<PathBuf>,
    /// Channels of the random embedding.
    pub channels: usize,
    /// Loss margin.
    pub alpha: f64,
    /// Append voxel coordinates before building the MST.
    pub add_coordinates: bool,
    /// Evaluate the pretrain loss instead of the exact one.
    pub pretrain: bool,
    /// RNG seed for the random embedding.
    pub seed: u64,
    /// Output as JSON instead of human-readable text.
    pub json: bool,
}

/// Train an embedding for a label volume and write the report.
pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    // 1. Load config and apply overrides
    let toml = match &args.config {
        Some(path) => load_train_toml(path)?,
        None => TrainToml::default(),
    };
    let mut config = toml.training;
    apply_overrides(&mut config, &args.overrides);
    config.validate();

    // 2. Load labels
    let volume = LabelVolume::from_json(&args.labels)?;
    tracing::info!(
        voxels = volume.len(),
        num_labels = volume.num_labels(),
        "Training embedding"
    );

    // 3. Initialize embedding
    let device = Default::default();
    TrainBackend::seed(config.seed);
    let [depth, height, width] = volume.shape;
    let model = VolumeEmbeddingConfig::new(config.embedding_dim, depth, height, width)
        .with_init_std(config.init_std)
        .init::<TrainBackend>(&device);

    // 4. Train
    let outcome = train(&config, model, &volume.labels)?;

    // 5. Write report
    let report = TrainReport {
        steps: outcome.history.len(),
        embedding: EmbeddingFile::from_tensor(outcome.model.forward())?,
        final_metrics: outcome.history.last().cloned(),
        best_loss: outcome.history.best_loss(),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(&report)?)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
            tracing::info!(path = %path.display(), "Wrote training report");
        }
        None => {
            if let Some(m) = &report.final_metrics {
                println!("{}", m.display());
            }
        }
    }

    tracing::info!(elapsed_s = start.elapsed().as_secs_f64(), "Done");
    Ok(())
}

/// Evaluate the loss once and print pair statistics.
pub fn run_stats(args: StatsArgs) -> anyhow::Result<()> {
    let volume = LabelVolume::from_json(&args.labels)?;
    let device = Default::default();
    let [depth, height, width] = volume.shape;

    let embedding: Tensor<EvalBackend, 4> = match &args.embedding {
        Some(path) => {
            let file = EmbeddingFile::from_json(path)?;
            if file.shape[1..] != volume.shape[..] {
                anyhow::bail!(
                    "embedding shape {:?} does not match label volume {:?}",
                    file.shape,
                    volume.shape
                );
            }
            file.to_tensor(&device)?
        }
        None => {
            EvalBackend::seed(args.seed);
            VolumeEmbeddingConfig::new(args.channels, depth, height, width)
                .init::<EvalBackend>(&device)
                .forward()
        }
    };

    let config = UltrametricLossConfig::new()
        .with_alpha(args.alpha)
        .with_add_coordinates(args.add_coordinates)
        .with_pretrain(args.pretrain);
    let output = UltrametricLoss::new(config).forward(embedding, &volume.labels)?;
    let metrics = UmMetrics::compute(&output, args.alpha)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    let distances = tensor_to_f32_vec(output.distances)?;
    println!("Ultrametric loss ({}, alpha = {})", output.mode, args.alpha);
    println!("  voxels:            {}", volume.len());
    println!("  labels:            {}", volume.num_labels());
    println!("  loss:              {:.6}", metrics.loss);
    println!("  positive pairs:    {:.0}", metrics.positive_pairs);
    println!("  negative pairs:    {:.0}", metrics.negative_pairs);
    println!("  mean pos distance: {:.4}", metrics.pos_distance_mean);
    println!("  mean neg distance: {:.4}", metrics.neg_distance_mean);
    println!("  margin violations: {:.0}", metrics.margin_violations);

    // Edges carrying the most negative pairs are the merges that hurt most.
    let mut order: Vec<usize> = (0..output.edges.len()).collect();
    order.sort_by(|&a, &b| output.num_neg[b].total_cmp(&output.num_neg[a]));
    println!("  top negative edges:");
    for &i in order.iter().take(5).filter(|&&i| output.num_neg[i] > 0.0) {
        let e = &output.edges[i];
        println!(
            "    ({:>5}, {:>5})  d = {:.4}  neg = {:.0}  pos = {:.0}",
            e.u, e.v, distances[i], output.num_neg[i], output.num_pos[i]
        );
    }

    metrics.health_check();
    Ok(())
}
