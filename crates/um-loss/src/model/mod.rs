//! Embedding-side components: the learnable volume embedding, coordinate
//! augmentation and point flattening, and the tensor bridge to host vectors.

pub mod bridge;
pub mod embedding;
pub mod volume;
