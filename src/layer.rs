//! Search layers: bounded reruns of one executor tree.
//!
//! A layer is a docid-range plus a hit quota; a [`LayerSet`] is the ordered
//! sequence of layers one search walks for staged, early-terminating
//! retrieval. How layers and quotas are computed is external input; this
//! core only threads the range through lookups and keeps per-layer match
//! bookkeeping aligned.

use serde::{Deserialize, Serialize};

use crate::types::DocIdRange;

/// One bounded rerun of the executor tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMeta {
    /// Documents this layer may visit.
    pub range: DocIdRange,
    /// Number of hits after which the external loop leaves the layer.
    pub quota: u32,
}

impl LayerMeta {
    /// Create a layer over `range` with the given quota.
    pub fn new(range: DocIdRange, quota: u32) -> Self {
        LayerMeta { range, quota }
    }

    /// A single layer covering the whole docid space with no effective quota.
    pub fn full() -> Self {
        LayerMeta {
            range: DocIdRange::all(),
            quota: u32::MAX,
        }
    }
}

/// An ordered sequence of layers, initialized once and walked in order by
/// the external hit-collection loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSet {
    layers: Vec<LayerMeta>,
}

impl LayerSet {
    /// Create a layer set from externally computed layer metadata.
    pub fn new(layers: Vec<LayerMeta>) -> Self {
        LayerSet { layers }
    }

    /// A one-layer set over the whole docid space.
    pub fn single() -> Self {
        LayerSet {
            layers: vec![LayerMeta::full()],
        }
    }

    /// Layer at position `n`.
    pub fn get(&self, n: usize) -> Option<&LayerMeta> {
        self.layers.get(n)
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the set holds no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Iterate the layers in walk order.
    pub fn iter(&self) -> impl Iterator<Item = &LayerMeta> {
        self.layers.iter()
    }
}
