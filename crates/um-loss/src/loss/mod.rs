//! Ultrametric loss: oracle adapters, edge distances, the forward/backward
//! cache, the custom gradient hook, and the loss assembler.

pub mod cache;
pub mod distance;
pub mod gradient;
pub mod oracle;
pub mod ultrametric;

pub use cache::{ForwardStats, UmLossCache};
pub use distance::{edge_distances, EdgeDistances};
pub use gradient::EdgeGradientHook;
pub use oracle::{build_mst, pair_stats, EdgePairStats, MstOutput};
pub use ultrametric::{
    ultrametric_loss, LossMode, UltrametricLoss, UltrametricLossConfig, UltrametricLossOutput,
};
