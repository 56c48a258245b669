//! Embedding training: metrics with health checks and the Adam training loop.

pub mod metrics;
pub mod trainer;
