//! TOML config loading for the training CLI.
//!
//! Deserializes `configs/train.toml`, which has a single `[training]` section,
//! then merges CLI overrides on top.

use std::path::Path;

use serde::Deserialize;
use um_loss::TrainingConfig;

/// Top-level structure matching `configs/train.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct TrainToml {
    /// Training and loss parameters.
    #[serde(default)]
    pub training: TrainingConfig,
}

/// Load and deserialize a `TrainToml` from a TOML file.
pub fn load_train_toml(path: &Path) -> anyhow::Result<TrainToml> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let config: TrainToml = toml::from_str(&contents)?;
    tracing::info!(path = %path.display(), "Loaded training config");
    Ok(config)
}

/// Command-line overrides; `None` keeps the TOML value.
#[derive(Debug, Default, Clone)]
pub struct TrainOverrides {
    pub steps: Option<usize>,
    pub alpha: Option<f64>,
    pub lr: Option<f64>,
    pub no_coordinates: bool,
}

/// Apply CLI overrides. Priority: defaults < TOML < CLI.
pub fn apply_overrides(config: &mut TrainingConfig, overrides: &TrainOverrides) {
    if let Some(steps) = overrides.steps {
        config.total_steps = steps;
    }
    if let Some(alpha) = overrides.alpha {
        config.alpha = alpha;
    }
    if let Some(lr) = overrides.lr {
        config.lr = lr;
    }
    if overrides.no_coordinates {
        config.add_coordinates = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_train_toml() {
        let toml_str = r#"
[training]
embedding_dim = 6
init_std = 0.5
lr = 0.001
warmup_steps = 10
total_steps = 2000
pretrain_steps = 300
alpha = 2.5
add_coordinates = false
log_interval = 100
seed = 7
"#;
        let config: TrainToml = toml::from_str(toml_str).unwrap();
        let t = config.training;
        assert_eq!(t.embedding_dim, 6);
        assert_eq!(t.warmup_steps, 10);
        assert_eq!(t.total_steps, 2000);
        assert_eq!(t.pretrain_steps, 300);
        assert!((t.alpha - 2.5).abs() < 1e-12);
        assert!(!t.add_coordinates);
        assert_eq!(t.seed, 7);
    }

    #[test]
    fn test_missing_section_uses_defaults() {
        let config: TrainToml = toml::from_str("").unwrap();
        assert_eq!(config.training.alpha, 0.1);
        assert!(config.training.add_coordinates);
    }

    #[test]
    fn test_cli_override_priority() {
        let mut config: TrainingConfig = toml::from_str::<TrainToml>("[training]\nalpha = 3.0\nlr = 0.5\n")
            .unwrap()
            .training;
        apply_overrides(
            &mut config,
            &TrainOverrides {
                steps: Some(12),
                alpha: Some(1.5),
                lr: None,
                no_coordinates: true,
            },
        );
        assert_eq!(config.total_steps, 12);
        assert_eq!(config.alpha, 1.5);
        assert_eq!(config.lr, 0.5);
        assert!(!config.add_coordinates);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("train.toml");
        std::fs::write(&path, "[training]\ntotal_steps = 5\n").unwrap();
        let config = load_train_toml(&path).unwrap();
        assert_eq!(config.training.total_steps, 5);
        assert!(load_train_toml(&tmp.path().join("missing.toml")).is_err());
    }
}
