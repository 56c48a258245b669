//! Tensor bridge: conversions between burn tensors and host vectors.
//!
//! The oracles in `emst` work on plain f64 slices while the loss lives in
//! burn tensors of the backend's working precision. Values crossing into the
//! graph are handed over as f32 and converted by `from_data`; values leaving
//! it are read back as f64.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::error::UmLossError;

/// Read any float tensor back to the host as f64, in row-major order.
pub fn tensor_to_f64_vec<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
) -> Result<Vec<f64>, UmLossError> {
    tensor
        .into_data()
        .convert::<f64>()
        .to_vec::<f64>()
        .map_err(|e| UmLossError::TensorData(format!("{e:?}")))
}

/// Read any float tensor back to the host as f32, in row-major order.
pub fn tensor_to_f32_vec<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
) -> Result<Vec<f32>, UmLossError> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| UmLossError::TensorData(format!("{e:?}")))
}

/// Extract a single f64 scalar from a one-element tensor.
///
/// # Panics
/// Panics if the tensor does not contain exactly one element.
pub fn tensor_to_f64<B: Backend>(tensor: Tensor<B, 1>) -> f64 {
    tensor.into_scalar().elem()
}

/// Cast f64 oracle output to the f32 working precision.
///
/// `as` saturates out-of-range values to ±inf and keeps NaN, so the cast is
/// total and never silently maps a finite value to zero.
pub fn to_working_precision(values: &[f64]) -> Vec<f32> {
    values.iter().map(|&v| v as f32).collect()
}

/// Build a 1D float tensor from f32 host values.
pub fn vec_to_tensor<B: Backend>(values: Vec<f32>, device: &B::Device) -> Tensor<B, 1> {
    let len = values.len();
    Tensor::from_data(TensorData::new(values, [len]), device)
}

/// Build a 1D int tensor of point indices for `select`.
pub fn indices_to_tensor<B: Backend>(
    indices: impl IntoIterator<Item = usize>,
    device: &B::Device,
) -> Tensor<B, 1, Int> {
    let indices: Vec<i64> = indices.into_iter().map(|i| i as i64).collect();
    let len = indices.len();
    Tensor::from_data(TensorData::new(indices, [len]), device)
}
