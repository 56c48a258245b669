//! Custom backward rule for the exact ultrametric loss.
//!
//! The exact loss value comes from the host-side oracle, so the autodiff graph
//! cannot differentiate it. The oracle also reports `∂loss/∂dist` per edge;
//! this hook turns the pair (value, gradient) into a graph node:
//!
//! ```text
//! forward:   dist ↦ loss
//! backward:  ḡ    ↦ ḡ · gradient   (for dist; labels and α get none)
//! ```
//!
//! The node is built as `s − detach(s) + loss` with `s = Σ dist·gradient`.
//! Its value is exactly `loss` and its only gradient path is the linear term,
//! which yields the backward rule above under any burn autodiff backend.

use burn::prelude::*;

use crate::model::bridge::vec_to_tensor;

/// Per-edge gradient of a loss whose value was computed off-graph.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGradientHook {
    gradient: Vec<f32>,
}

impl EdgeGradientHook {
    pub fn new(gradient: Vec<f32>) -> Self {
        Self { gradient }
    }

    /// `∂loss/∂dist`, one entry per edge.
    pub fn gradient(&self) -> &[f32] {
        &self.gradient
    }

    /// Backward rule: scale the cached per-edge gradient by the upstream
    /// gradient of the scalar loss (shape `(1,)`).
    pub fn backward<B: Backend>(&self, upstream: Tensor<B, 1>) -> Tensor<B, 1> {
        let device = upstream.device();
        vec_to_tensor::<B>(self.gradient.clone(), &device) * upstream
    }

    /// Forward: a `(1,)` tensor equal to `loss` whose gradient with respect to
    /// `dist` follows [`backward`](Self::backward).
    pub fn attach<B: Backend>(&self, loss: f32, dist: Tensor<B, 1>) -> Tensor<B, 1> {
        let device = dist.device();
        let gradient = vec_to_tensor::<B>(self.gradient.clone(), &device);
        let linear = (dist * gradient).sum();
        let value = vec_to_tensor::<B>(vec![loss], &device);
        linear.clone() - linear.detach() + value
    }
}
