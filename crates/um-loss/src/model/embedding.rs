use burn::module::Param;
use burn::prelude::*;
use burn::tensor::Distribution;

/// Configuration for a directly learned volume embedding.
///
/// Stands in for an upstream network: every voxel owns a free `channels`-dim
/// vector, so the ultrametric loss is the only thing shaping it.
#[derive(Config, Debug)]
pub struct VolumeEmbeddingConfig {
    /// Learned embedding dimension `k`.
    pub channels: usize,
    /// Volume depth.
    pub depth: usize,
    /// Volume height.
    pub height: usize,
    /// Volume width.
    pub width: usize,
    /// Standard deviation of the normal initialisation.
    #[config(default = 1.0)]
    pub init_std: f64,
}

/// Learnable `(k, d, h, w)` embedding tensor.
#[derive(Module, Debug)]
pub struct VolumeEmbedding<B: Backend> {
    values: Param<Tensor<B, 4>>,
}

impl VolumeEmbeddingConfig {
    /// Initialize with values drawn from `N(0, init_std²)`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> VolumeEmbedding<B> {
        let values = Tensor::random(
            [self.channels, self.depth, self.height, self.width],
            Distribution::Normal(0.0, self.init_std),
            device,
        );
        VolumeEmbedding {
            values: Param::from_tensor(values),
        }
    }
}

impl<B: Backend> VolumeEmbedding<B> {
    /// Wrap an existing `(k, d, h, w)` tensor as a trainable embedding.
    pub fn from_tensor(values: Tensor<B, 4>) -> Self {
        Self {
            values: Param::from_tensor(values),
        }
    }

    /// Current embedding, shape `(k, d, h, w)`.
    pub fn forward(&self) -> Tensor<B, 4> {
        self.values.val()
    }

    /// `[k, d, h, w]`.
    pub fn dims(&self) -> [usize; 4] {
        self.values.val().dims()
    }
}
