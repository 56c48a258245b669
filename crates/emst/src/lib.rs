//! Euclidean minimum spanning trees and bottleneck pair statistics.
//!
//! These are the two host-side oracles behind the ultrametric loss:
//!
//! - [`SpanningTreeBuilder`] turns `n` points into the `n - 1` edges of their
//!   Euclidean MST ([`EuclideanMst`]).
//! - [`BottleneckPairStatistics`] attributes every pair of points to the
//!   largest edge on its tree path and turns the positive/negative pair counts
//!   into a loss and a per-edge gradient ([`UmPairStatistics`]).
//!
//! Both work in f64 on plain slices and know nothing about tensors. The
//! [`mocks`] module has stub implementations for orchestration tests.

pub mod builder;
pub mod edge;
pub mod error;
pub mod mocks;
pub mod pair_stats;
pub mod union_find;

pub use builder::{EuclideanMst, SpanningTreeBuilder};
pub use edge::{edges_from_rows, edges_to_rows, MstEdge};
pub use error::OracleError;
pub use pair_stats::{BottleneckPairStatistics, PairStats, UmPairStatistics};
pub use union_find::{LabelUnionFind, MergeCounts};
