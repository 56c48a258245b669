//! JSON file types: ground-truth label volumes, learned embeddings and the
//! training report.

use std::path::Path;

use burn::prelude::*;
use burn::tensor::TensorData;
use serde::{Deserialize, Serialize};

use um_loss::model::bridge::tensor_to_f32_vec;
use um_loss::UmMetrics;

/// Ground-truth labels of a `(depth, height, width)` volume.
///
/// `labels` is row-major over `(d, h, w)`, the same order the loss flattens
/// embedding points in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelVolume {
    /// `[depth, height, width]`.
    pub shape: [usize; 3],
    /// One label per voxel.
    pub labels: Vec<u64>,
}

impl LabelVolume {
    /// Load and validate a label volume from a JSON file.
    pub fn from_json(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", path.display()))?;
        let volume: Self = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))?;
        volume.validate()?;
        tracing::info!(path = %path.display(), shape = ?volume.shape, "Loaded label volume");
        Ok(volume)
    }

    /// Check that the label count matches the shape and there are at least two voxels.
    pub fn validate(&self) -> anyhow::Result<()> {
        let n = self.len();
        if self.labels.len() != n {
            anyhow::bail!(
                "label volume of shape {:?} needs {n} labels, got {}",
                self.shape,
                self.labels.len()
            );
        }
        if n < 2 {
            anyhow::bail!("label volume needs at least 2 voxels, got {n}");
        }
        Ok(())
    }

    /// Number of voxels.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct labels.
    pub fn num_labels(&self) -> usize {
        let mut labels = self.labels.clone();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }
}

/// A `(k, d, h, w)` embedding, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingFile {
    /// `[k, depth, height, width]`.
    pub shape: [usize; 4],
    pub values: Vec<f32>,
}

impl EmbeddingFile {
    /// Read an embedding tensor back to the host.
    pub fn from_tensor<B: Backend>(tensor: Tensor<B, 4>) -> anyhow::Result<Self> {
        let shape = tensor.dims();
        let values = tensor_to_f32_vec(tensor)?;
        Ok(Self { shape, values })
    }

    /// Build a tensor on `device`.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> anyhow::Result<Tensor<B, 4>> {
        let expected: usize = self.shape.iter().product();
        if self.values.len() != expected {
            anyhow::bail!(
                "embedding of shape {:?} needs {expected} values, got {}",
                self.shape,
                self.values.len()
            );
        }
        Ok(Tensor::from_data(
            TensorData::new(self.values.clone(), self.shape),
            device,
        ))
    }

    /// Load an embedding from a training report or a bare embedding JSON file.
    pub fn from_json(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        if let Ok(report) = serde_json::from_str::<TrainReport>(&contents) {
            return Ok(report.embedding);
        }
        serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))
    }
}

/// Output of `um-train train`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    /// Steps actually run.
    pub steps: usize,
    /// Learned embedding.
    pub embedding: EmbeddingFile,
    /// Metrics of the last step.
    #[serde(default, skip_deserializing)]
    pub final_metrics: Option<UmMetrics>,
    /// Step and loss of the best step.
    pub best_loss: Option<(usize, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_volume_validate() {
        let ok = LabelVolume {
            shape: [1, 2, 2],
            labels: vec![0, 0, 1, 1],
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.num_labels(), 2);

        let short = LabelVolume {
            shape: [1, 2, 2],
            labels: vec![0, 0, 1],
        };
        assert!(short.validate().is_err());

        let single = LabelVolume {
            shape: [1, 1, 1],
            labels: vec![0],
        };
        assert!(single.validate().is_err());
    }

    #[test]
    fn test_volume_from_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("labels.json");
        std::fs::write(&path, r#"{"shape": [1, 1, 3], "labels": [4, 4, 9]}"#).unwrap();

        let volume = LabelVolume::from_json(&path).unwrap();
        assert_eq!(volume.shape, [1, 1, 3]);
        assert_eq!(volume.labels, vec![4, 4, 9]);
    }

    #[test]
    fn test_embedding_tensor_conversion() {
        let device = Default::default();
        let file = EmbeddingFile {
            shape: [1, 1, 2, 2],
            values: vec![0.5, -1.0, 2.0, 3.5],
        };
        let tensor = file.to_tensor::<TestBackend>(&device).unwrap();
        assert_eq!(tensor.dims(), [1, 1, 2, 2]);
        assert_eq!(EmbeddingFile::from_tensor(tensor).unwrap(), file);

        let bad = EmbeddingFile {
            shape: [2, 1, 2, 2],
            values: vec![0.0; 3],
        };
        assert!(bad.to_tensor::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_embedding_from_report() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("report.json");
        let report = TrainReport {
            steps: 3,
            embedding: EmbeddingFile {
                shape: [1, 1, 1, 2],
                values: vec![1.0, 2.0],
            },
            final_metrics: None,
            best_loss: Some((2, 0.5)),
        };
        std::fs::write(&path, serde_json::to_string(&report).unwrap()).unwrap();

        let embedding = EmbeddingFile::from_json(&path).unwrap();
        assert_eq!(embedding.values, vec![1.0, 2.0]);
    }
}
