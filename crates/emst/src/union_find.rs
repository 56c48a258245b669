//! Disjoint sets that carry a label histogram per component.

use std::collections::HashMap;

/// Union-find over points, tracking how many points of each label every
/// component contains.
///
/// Merging is union-by-size: the smaller histogram is folded into the larger
/// one, so the total histogram work over a full contraction is O(n log n).
#[derive(Debug, Clone)]
pub struct LabelUnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    histograms: Vec<HashMap<u64, usize>>,
}

/// Pair counts produced by merging two components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeCounts {
    /// Pairs across the merge whose labels agree.
    pub positive: u64,
    /// Pairs across the merge whose labels differ.
    pub negative: u64,
}

impl LabelUnionFind {
    /// One singleton component per label.
    pub fn new(labels: &[u64]) -> Self {
        Self {
            parent: (0..labels.len()).collect(),
            size: vec![1; labels.len()],
            histograms: labels
                .iter()
                .map(|&l| HashMap::from([(l, 1usize)]))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Representative of `x`, with path halving.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Size of the component containing `x`.
    pub fn component_size(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.size[root]
    }

    /// Merge the components of `a` and `b`.
    ///
    /// Returns `None` if they are already joined. Otherwise returns the number
    /// of same-label and different-label pairs the merge connects.
    pub fn union(&mut self, a: usize, b: usize) -> Option<MergeCounts> {
        let mut ra = self.find(a);
        let mut rb = self.find(b);
        if ra == rb {
            return None;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }

        let small = std::mem::take(&mut self.histograms[rb]);
        let large = &mut self.histograms[ra];

        let mut positive = 0u64;
        for (&label, &count) in &small {
            if let Some(&other) = large.get(&label) {
                positive += (count * other) as u64;
            }
        }
        let total = (self.size[ra] * self.size[rb]) as u64;

        for (label, count) in small {
            *large.entry(label).or_insert(0) += count;
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];

        Some(MergeCounts {
            positive,
            negative: total - positive,
        })
    }
}
