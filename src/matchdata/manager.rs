//! Per-layer registry of match-recording executors.
//!
//! The builder registers every scoring-relevant leaf here, one registry per
//! layer, in insertion order; registries are never mutated after their
//! layer is built. Registration is lazy: unless a consumer required match
//! data or a collector is subscribed, nothing is recorded and simple
//! queries pay no bookkeeping cost.

use std::rc::Rc;

use crate::error::{CallunaError, Result};
use crate::executor::Executor;
use crate::matchdata::collector::{CollectorCenter, MatchCollector};
use crate::matchdata::{MatchCell, MatchData, MatchValues, QueryTermMeta, SimpleMatchData};
use crate::types::{DocId, DocIdRange};

struct TermEntry {
    cell: Rc<MatchCell>,
    meta: QueryTermMeta,
}

#[derive(Default)]
struct LayerRegistry {
    terms: Vec<TermEntry>,
    // Rank-only subtrees; consulted by a forward seek at fill time.
    rank_executors: Vec<Box<dyn Executor>>,
}

struct SimpleFetcher {
    data: SimpleMatchData,
    offset: usize,
}

struct FullFetcher {
    data: MatchData,
    offset: usize,
}

struct SubFetcher {
    data: SimpleMatchData,
    offset: usize,
}

struct ValuesFetcher {
    data: MatchValues,
    offset: usize,
}

/// Tracks which executors matched which document, per layer.
#[derive(Default)]
pub struct MatchDataManager {
    layers: Vec<LayerRegistry>,
    current_layer: usize,
    requested: bool,
    collectors: CollectorCenter,
    simple: Option<SimpleFetcher>,
    full: Option<FullFetcher>,
    sub: Option<SubFetcher>,
    values: Option<ValuesFetcher>,
}

impl MatchDataManager {
    /// A manager with no layers and no consumers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark match data as required by a downstream consumer.
    pub fn request_match_data(&mut self) {
        self.requested = true;
    }

    /// Whether registration is active: match data was required or at least
    /// one collector is subscribed.
    pub fn need_match_data(&self) -> bool {
        self.requested || !self.collectors.is_empty()
    }

    /// Open the registry of the next layer. Called once per layer during
    /// the build.
    pub fn begin_layer(&mut self) {
        self.layers.push(LayerRegistry::default());
        self.current_layer = self.layers.len() - 1;
    }

    /// Layer whose registry fills currently target.
    pub fn current_layer(&self) -> usize {
        self.current_layer
    }

    /// Number of layers registered so far.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Number of terms registered in `layer`.
    pub fn leaf_count(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, |l| l.terms.len())
    }

    /// Terms registered across all layers.
    pub fn total_terms(&self) -> usize {
        self.layers.iter().map(|l| l.terms.len()).sum()
    }

    /// Sum of registered-term counts of all layers before `layer`.
    pub fn accumulated_offset(&self, layer: usize) -> usize {
        self.layers[..layer.min(self.layers.len())]
            .iter()
            .map(|l| l.terms.len())
            .sum()
    }

    /// Register a leaf into the current layer.
    ///
    /// Returns the cell the leaf must record its landings into, or `None`
    /// when match data is not needed and nothing was registered.
    pub fn add_term(&mut self, mut meta: QueryTermMeta) -> Option<Rc<MatchCell>> {
        if !self.need_match_data() {
            return None;
        }
        if self.layers.is_empty() {
            self.begin_layer();
        }
        meta.layer = self.current_layer;
        let cell = Rc::new(MatchCell::new());
        self.layers[self.current_layer].terms.push(TermEntry {
            cell: Rc::clone(&cell),
            meta,
        });
        Some(cell)
    }

    /// Hand over a rank-only subtree; it is seeked forward at fill time so
    /// its leaves' cells stay current.
    pub fn add_rank_executor(&mut self, executor: Box<dyn Executor>) {
        if !self.need_match_data() || self.layers.is_empty() {
            return;
        }
        self.layers[self.current_layer]
            .rank_executors
            .push(executor);
    }

    /// Retarget fills at `layer` and install the accumulated term-count
    /// offset into every active fetcher.
    pub fn move_to_layer(&mut self, layer: usize) -> Result<()> {
        if layer >= self.layers.len() {
            return Err(CallunaError::invalid_argument(format!(
                "layer {layer} out of range ({} layers)",
                self.layers.len()
            )));
        }
        self.current_layer = layer;
        let offset = self.accumulated_offset(layer);
        let total = self.total_terms();
        if let Some(f) = self.simple.as_mut() {
            f.offset = offset;
            f.data.resize(total);
        }
        if let Some(f) = self.full.as_mut() {
            f.offset = offset;
            f.data.resize(total);
        }
        if let Some(f) = self.sub.as_mut() {
            f.offset = offset;
            f.data.resize(total);
        }
        if let Some(f) = self.values.as_mut() {
            f.offset = offset;
            f.data.resize(total);
        }
        Ok(())
    }

    /// Require the simple (bitset) match data flavor.
    pub fn require_simple_match_data(&mut self) {
        self.requested = true;
        if self.simple.is_none() {
            self.simple = Some(SimpleFetcher {
                data: SimpleMatchData::new(self.total_terms()),
                offset: self.accumulated_offset(self.current_layer),
            });
        }
    }

    /// Require the full (per-term record) match data flavor.
    pub fn require_match_data(&mut self) {
        self.requested = true;
        if self.full.is_none() {
            self.full = Some(FullFetcher {
                data: MatchData::new(self.total_terms()),
                offset: self.accumulated_offset(self.current_layer),
            });
        }
    }

    /// Require the sub-document match data flavor.
    pub fn require_sub_match_data(&mut self) {
        self.requested = true;
        if self.sub.is_none() {
            self.sub = Some(SubFetcher {
                data: SimpleMatchData::new(self.total_terms()),
                offset: self.accumulated_offset(self.current_layer),
            });
        }
    }

    /// Require the per-term payload values flavor.
    pub fn require_match_values(&mut self) {
        self.requested = true;
        if self.values.is_none() {
            self.values = Some(ValuesFetcher {
                data: MatchValues::new(self.total_terms()),
                offset: self.accumulated_offset(self.current_layer),
            });
        }
    }

    /// Whether the full flavor was required.
    pub fn has_match_data(&self) -> bool {
        self.full.is_some()
    }

    /// Whether the simple flavor was required.
    pub fn has_simple_match_data(&self) -> bool {
        self.simple.is_some()
    }

    /// Whether the sub-document flavor was required.
    pub fn has_sub_match_data(&self) -> bool {
        self.sub.is_some()
    }

    /// Whether the values flavor was required.
    pub fn has_match_values(&self) -> bool {
        self.values.is_some()
    }

    /// Snapshot term matches for `doc` into the simple and/or full flavors.
    pub fn fill_match_data(&mut self, doc: DocId) -> Result<()> {
        if self.simple.is_none() && self.full.is_none() {
            return Err(CallunaError::match_data(
                "match data was never required for this search",
            ));
        }
        let total = self.total_terms();
        self.seek_rank_executors(doc)?;
        let Some(layer) = self.layers.get(self.current_layer) else {
            return Err(CallunaError::match_data("no layer registered"));
        };
        if let Some(f) = self.simple.as_mut() {
            f.data.resize(total);
            f.data.reset();
            for (i, entry) in layer.terms.iter().enumerate() {
                f.data.set_matched(f.offset + i, entry.cell.doc() == doc);
            }
        }
        if let Some(f) = self.full.as_mut() {
            f.data.resize(total);
            f.data.reset();
            for (i, entry) in layer.terms.iter().enumerate() {
                let record = f.data.term_mut(f.offset + i);
                if entry.cell.doc() == doc {
                    record.matched = true;
                    record.field_map = entry.cell.field_map();
                    record.term_freq = entry.cell.term_freq();
                }
            }
        }
        Ok(())
    }

    /// Snapshot per-term payload values for `doc`.
    pub fn fill_match_values(&mut self, doc: DocId) -> Result<()> {
        if self.values.is_none() {
            return Err(CallunaError::match_data(
                "match values were never required for this search",
            ));
        }
        let total = self.total_terms();
        self.seek_rank_executors(doc)?;
        let Some(layer) = self.layers.get(self.current_layer) else {
            return Err(CallunaError::match_data("no layer registered"));
        };
        if let Some(f) = self.values.as_mut() {
            f.data.resize(total);
            f.data.reset();
            for (i, entry) in layer.terms.iter().enumerate() {
                let value = if entry.cell.doc() == doc {
                    entry.cell.payload()
                } else {
                    0
                };
                f.data.set_value(f.offset + i, value);
            }
        }
        Ok(())
    }

    /// Snapshot term matches for sub-document `sub_doc` of `doc`.
    ///
    /// Main-partition terms match every sub-document of a document they
    /// matched; sub-partition terms must have landed on `sub_doc` itself.
    pub fn fill_sub_match_data(
        &mut self,
        doc: DocId,
        sub_doc: DocId,
        sub_range: DocIdRange,
    ) -> Result<()> {
        if self.sub.is_none() {
            return Err(CallunaError::match_data(
                "sub match data was never required for this search",
            ));
        }
        if !sub_range.contains(sub_doc) {
            return Err(CallunaError::invalid_argument(format!(
                "sub doc {sub_doc} outside range [{}, {})",
                sub_range.begin, sub_range.end
            )));
        }
        let total = self.total_terms();
        self.seek_rank_executors(doc)?;
        let Some(layer) = self.layers.get(self.current_layer) else {
            return Err(CallunaError::match_data("no layer registered"));
        };
        if let Some(f) = self.sub.as_mut() {
            f.data.resize(total);
            f.data.reset();
            for (i, entry) in layer.terms.iter().enumerate() {
                let matched = entry.cell.doc() == doc
                    && (!entry.meta.is_sub || entry.cell.sub_doc() == sub_doc);
                f.data.set_matched(f.offset + i, matched);
            }
        }
        Ok(())
    }

    /// The filled simple match data, if required.
    pub fn simple_match_data(&self) -> Option<&SimpleMatchData> {
        self.simple.as_ref().map(|f| &f.data)
    }

    /// The filled full match data, if required.
    pub fn match_data(&self) -> Option<&MatchData> {
        self.full.as_ref().map(|f| &f.data)
    }

    /// The filled sub-document match data, if required.
    pub fn sub_match_data(&self) -> Option<&SimpleMatchData> {
        self.sub.as_ref().map(|f| &f.data)
    }

    /// The filled match values, if required.
    pub fn match_values(&self) -> Option<&MatchValues> {
        self.values.as_ref().map(|f| &f.data)
    }

    /// Ordered metadata of every registered term, all layers.
    pub fn query_term_meta(&self) -> Vec<QueryTermMeta> {
        self.layers
            .iter()
            .flat_map(|l| l.terms.iter().map(|e| e.meta.clone()))
            .collect()
    }

    /// Subscribe a collector; this alone activates registration.
    pub fn subscribe(&mut self, collector: Box<dyn MatchCollector>) {
        self.collectors.subscribe(collector);
    }

    /// Invoke every subscribed collector for `doc`.
    pub fn collect_all(&mut self, executor: &dyn Executor, doc: DocId) -> Result<()> {
        self.collectors.collect_all(executor, doc)
    }

    /// Reset every subscribed collector.
    pub fn reset_collectors(&mut self) {
        self.collectors.reset();
    }

    fn seek_rank_executors(&mut self, doc: DocId) -> Result<()> {
        let Some(layer) = self.layers.get_mut(self.current_layer) else {
            return Ok(());
        };
        for executor in &mut layer.rank_executors {
            if !executor.is_empty() {
                executor.seek(doc)?;
            }
        }
        Ok(())
    }
}
