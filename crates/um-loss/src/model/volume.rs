//! Volumetric embedding layout helpers.
//!
//! Embeddings arrive channel-major as `(k, depth, height, width)`. The loss
//! works on one vector per point, so the volume is optionally augmented with
//! `(z, y, x)` coordinate channels and then flattened to `(d·h·w, channels)`.
//! Point `i` is the voxel at `z = i / (h·w)`, `y = (i / w) % h`, `x = i % w`,
//! which is the row-major order the label volume must be flattened in.

use burn::prelude::*;
use burn::tensor::TensorData;

/// Number of channels appended by [`augment_coordinates`].
pub const COORDINATE_CHANNELS: usize = 3;

/// Integer `(z, y, x)` voxel coordinates as a `(3, d, h, w)` float tensor.
pub fn coordinate_grid<B: Backend>(
    [depth, height, width]: [usize; 3],
    device: &B::Device,
) -> Tensor<B, 4> {
    let n = depth * height * width;
    let mut values = Vec::with_capacity(COORDINATE_CHANNELS * n);
    for axis in 0..COORDINATE_CHANNELS {
        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    values.push([z, y, x][axis] as f32);
                }
            }
        }
    }
    Tensor::from_data(
        TensorData::new(values, [COORDINATE_CHANNELS, depth, height, width]),
        device,
    )
}

/// Append coordinate channels to a `(k, d, h, w)` embedding if requested.
///
/// Returns the embedding unchanged when `add_coordinates` is false, otherwise
/// a `(k + 3, d, h, w)` tensor. Must run before [`to_point_vectors`] so the
/// extra channels line up per point.
pub fn augment_coordinates<B: Backend>(
    embedding: Tensor<B, 4>,
    add_coordinates: bool,
) -> Tensor<B, 4> {
    if !add_coordinates {
        return embedding;
    }
    let [_, depth, height, width] = embedding.dims();
    let coordinates = coordinate_grid::<B>([depth, height, width], &embedding.device());
    Tensor::cat(vec![embedding, coordinates], 0)
}

/// Flatten a `(c, d, h, w)` volume into a `(d·h·w, c)` point matrix.
pub fn to_point_vectors<B: Backend>(embedding: Tensor<B, 4>) -> Tensor<B, 2> {
    let [channels, depth, height, width] = embedding.dims();
    embedding
        .reshape([channels, depth * height * width])
        .transpose()
}
