mod config;
mod pipeline;
mod volume;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::TrainOverrides;
use pipeline::{StatsArgs, TrainArgs};

/// um-train: learn volume embeddings under the ultrametric (MST) loss.
#[derive(Parser)]
#[command(name = "um-train", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands for training and inspecting embeddings.
#[derive(Subcommand)]
enum Command {
    /// Train an embedding for a label volume.
    Train {
        /// Path to training config TOML file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Path to the label volume JSON file.
        #[arg(long)]
        labels: PathBuf,
        /// Path for the output report JSON (embedding + metrics).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Override the total number of steps.
        #[arg(long)]
        steps: Option<usize>,
        /// Override the loss margin.
        #[arg(long)]
        alpha: Option<f64>,
        /// Override the learning rate.
        #[arg(long)]
        lr: Option<f64>,
        /// Do not append voxel coordinates to the embedding.
        #[arg(long)]
        no_coordinates: bool,
    },
    /// Print MST pair statistics and the loss for an embedding.
    Stats {
        /// Path to the label volume JSON file.
        #[arg(long)]
        labels: PathBuf,
        /// Embedding or training report JSON. A random embedding is used when omitted.
        #[arg(long)]
        embedding: Option<PathBuf>,
        /// Channels of the random embedding.
        #[arg(long, default_value_t = 3)]
        channels: usize,
        /// Loss margin.
        #[arg(long, default_value_t = 0.1)]
        alpha: f64,
        /// Do not append voxel coordinates to the embedding.
        #[arg(long)]
        no_coordinates: bool,
        /// Evaluate the pretrain loss instead of the exact one.
        #[arg(long)]
        pretrain: bool,
        /// RNG seed for the random embedding.
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Output as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Train {
            config,
            labels,
            output,
            steps,
            alpha,
            lr,
            no_coordinates,
        } => pipeline::run_train(TrainArgs {
            config,
            labels,
            output,
            overrides: TrainOverrides {
                steps,
                alpha,
                lr,
                no_coordinates,
            },
        }),
        Command::Stats {
            labels,
            embedding,
            channels,
            alpha,
            no_coordinates,
            pretrain,
            seed,
            json,
        } => pipeline::run_stats(StatsArgs {
            labels,
            embedding,
            channels,
            alpha,
            add_coordinates: !no_coordinates,
            pretrain,
            seed,
            json,
        }),
    }
}
