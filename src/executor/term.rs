//! Leaf executors: one per posting representation.
//!
//! Each leaf wraps a single posting and records its landings into an
//! optional shared [`MatchCell`] so the match data subsystem can snapshot
//! term-level matches without walking the tree.

use std::rc::Rc;

use crate::error::Result;
use crate::executor::Executor;
use crate::index::posting::{BitmapPosting, DocFilter, PostingIterator};
use crate::index::SubDocMapping;
use crate::matchdata::MatchCell;
use crate::types::{DocId, END_DOCID, FieldMask, FieldMatchOp};

fn record(cell: &Option<Rc<MatchCell>>, doc: DocId, iterator: &dyn PostingIterator) {
    if let Some(cell) = cell {
        cell.record(
            doc,
            iterator.field_map(),
            iterator.term_freq(),
            iterator.payload(),
        );
    }
}

/// The forced-empty leaf.
///
/// Stands in for terms without postings and for posting representations
/// this core cannot drive; the enclosing query degrades to "no match" for
/// the term instead of failing the search.
pub struct EmptyExecutor;

impl EmptyExecutor {
    /// Create an empty leaf.
    pub fn new() -> Self {
        EmptyExecutor
    }
}

impl Default for EmptyExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for EmptyExecutor {
    fn seek(&mut self, _doc: DocId) -> Result<DocId> {
        Ok(END_DOCID)
    }

    fn current_doc(&self) -> DocId {
        END_DOCID
    }

    fn is_empty(&self) -> bool {
        true
    }

    fn move_to_end(&mut self) {}
}

/// Leaf over a buffered, skip-scanned posting list.
pub struct BufferedTermExecutor {
    iterator: Box<dyn PostingIterator>,
    cell: Option<Rc<MatchCell>>,
    current: DocId,
    finished: bool,
}

impl BufferedTermExecutor {
    /// Wrap a buffered posting iterator.
    pub fn new(iterator: Box<dyn PostingIterator>, cell: Option<Rc<MatchCell>>) -> Self {
        BufferedTermExecutor {
            iterator,
            cell,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for BufferedTermExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let found = self.iterator.seek(doc)?;
        self.current = found;
        if found != END_DOCID {
            record(&self.cell, found, self.iterator.as_ref());
        }
        Ok(found)
    }

    fn current_doc(&self) -> DocId {
        self.current
    }

    fn is_empty(&self) -> bool {
        self.finished
    }

    fn move_to_end(&mut self) {
        self.finished = true;
        self.current = END_DOCID;
    }

    fn has_position(&self) -> bool {
        self.iterator.has_position()
    }

    fn current_positions(&mut self) -> Result<Vec<u32>> {
        self.iterator.positions()
    }
}

/// Leaf over a dense bitmap posting.
pub struct BitmapTermExecutor {
    posting: BitmapPosting,
    cell: Option<Rc<MatchCell>>,
    current: DocId,
    finished: bool,
}

impl BitmapTermExecutor {
    /// Wrap a bitmap posting.
    pub fn new(posting: BitmapPosting, cell: Option<Rc<MatchCell>>) -> Self {
        BitmapTermExecutor {
            posting,
            cell,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for BitmapTermExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        match self.posting.next_set(doc) {
            Some(found) => {
                self.current = found;
                if let Some(cell) = &self.cell {
                    cell.record(found, 0, 1, 0);
                }
                Ok(found)
            }
            None => {
                self.current = END_DOCID;
                Ok(END_DOCID)
            }
        }
    }

    fn current_doc(&self) -> DocId {
        self.current
    }

    fn is_empty(&self) -> bool {
        self.finished
    }

    fn move_to_end(&mut self) {
        self.finished = true;
        self.current = END_DOCID;
    }

    fn bitmap_handle(&self) -> Option<BitmapPosting> {
        if self.finished {
            None
        } else {
            Some(self.posting.clone())
        }
    }
}

/// Leaf that seeks a posting list and filters each landing through a
/// per-document predicate (spatial-style filtering).
pub struct SeekFilterTermExecutor {
    iterator: Box<dyn PostingIterator>,
    filter: Box<dyn DocFilter>,
    cell: Option<Rc<MatchCell>>,
    current: DocId,
    finished: bool,
}

impl SeekFilterTermExecutor {
    /// Wrap an iterator and its acceptance filter.
    pub fn new(
        iterator: Box<dyn PostingIterator>,
        filter: Box<dyn DocFilter>,
        cell: Option<Rc<MatchCell>>,
    ) -> Self {
        SeekFilterTermExecutor {
            iterator,
            filter,
            cell,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for SeekFilterTermExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let mut target = doc;
        loop {
            let found = self.iterator.seek(target)?;
            if found == END_DOCID {
                self.current = END_DOCID;
                return Ok(END_DOCID);
            }
            if self.filter.accept(found) {
                self.current = found;
                record(&self.cell, found, self.iterator.as_ref());
                return Ok(found);
            }
            target = found + 1;
        }
    }

    fn current_doc(&self) -> DocId {
        self.current
    }

    fn is_empty(&self) -> bool {
        self.finished
    }

    fn move_to_end(&mut self) {
        self.finished = true;
        self.current = END_DOCID;
    }
}

/// Leaf matching only documents whose field map satisfies the required
/// fields of the term.
pub struct FieldMaskTermExecutor {
    iterator: Box<dyn PostingIterator>,
    mask: FieldMask,
    op: FieldMatchOp,
    cell: Option<Rc<MatchCell>>,
    current: DocId,
    finished: bool,
}

impl FieldMaskTermExecutor {
    /// Wrap an iterator with a required-field mask.
    pub fn new(
        iterator: Box<dyn PostingIterator>,
        mask: FieldMask,
        op: FieldMatchOp,
        cell: Option<Rc<MatchCell>>,
    ) -> Self {
        FieldMaskTermExecutor {
            iterator,
            mask,
            op,
            cell,
            current: END_DOCID,
            finished: false,
        }
    }

    fn mask_matches(&self, field_map: FieldMask) -> bool {
        match self.op {
            FieldMatchOp::Any => field_map & self.mask != 0,
            FieldMatchOp::All => field_map & self.mask == self.mask,
        }
    }
}

impl Executor for FieldMaskTermExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let mut target = doc;
        loop {
            let found = self.iterator.seek(target)?;
            if found == END_DOCID {
                self.current = END_DOCID;
                return Ok(END_DOCID);
            }
            if self.mask_matches(self.iterator.field_map()) {
                self.current = found;
                record(&self.cell, found, self.iterator.as_ref());
                return Ok(found);
            }
            target = found + 1;
        }
    }

    fn current_doc(&self) -> DocId {
        self.current
    }

    fn is_empty(&self) -> bool {
        self.finished
    }

    fn move_to_end(&mut self) {
        self.finished = true;
        self.current = END_DOCID;
    }

    fn has_position(&self) -> bool {
        self.iterator.has_position()
    }

    fn current_positions(&mut self) -> Result<Vec<u32>> {
        self.iterator.positions()
    }
}

/// Leaf over a direct primary-key resolution: matches exactly one document.
pub struct PrimaryKeyTermExecutor {
    doc: DocId,
    cell: Option<Rc<MatchCell>>,
    current: DocId,
    finished: bool,
}

impl PrimaryKeyTermExecutor {
    /// Wrap the resolved document id.
    pub fn new(doc: DocId, cell: Option<Rc<MatchCell>>) -> Self {
        PrimaryKeyTermExecutor {
            doc,
            cell,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for PrimaryKeyTermExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished || doc > self.doc {
            self.current = END_DOCID;
            return Ok(END_DOCID);
        }
        self.current = self.doc;
        if let Some(cell) = &self.cell {
            cell.record(self.doc, 0, 1, 0);
        }
        Ok(self.doc)
    }

    fn current_doc(&self) -> DocId {
        self.current
    }

    fn is_empty(&self) -> bool {
        self.finished
    }

    fn move_to_end(&mut self) {
        self.finished = true;
        self.current = END_DOCID;
    }
}

/// Leaf joining a sub-document-partitioned posting up to main documents.
///
/// The inner executor enumerates sub-document ids; this wrapper translates
/// each landing to the owning main document and records both levels into
/// the match cell.
pub struct SubDocJoinExecutor {
    inner: Box<dyn Executor>,
    mapping: SubDocMapping,
    layer_end: DocId,
    cell: Option<Rc<MatchCell>>,
    current: DocId,
    finished: bool,
}

impl SubDocJoinExecutor {
    /// Wrap a sub-document executor with its join mapping, clamped to the
    /// layer's main-document range end.
    pub fn new(
        inner: Box<dyn Executor>,
        mapping: SubDocMapping,
        layer_end: DocId,
        cell: Option<Rc<MatchCell>>,
    ) -> Self {
        SubDocJoinExecutor {
            inner,
            mapping,
            layer_end,
            cell,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for SubDocJoinExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished || doc >= self.mapping.main_doc_count() || doc >= self.layer_end {
            self.current = END_DOCID;
            return Ok(END_DOCID);
        }
        let sub_begin = self.mapping.sub_range(doc).begin;
        let sub = self.inner.seek(sub_begin)?;
        let main = match self.mapping.main_of(sub) {
            Some(main) if main < self.layer_end => main,
            _ => {
                self.current = END_DOCID;
                return Ok(END_DOCID);
            }
        };
        self.current = main;
        if let Some(cell) = &self.cell {
            cell.record(main, 0, 1, 0);
            cell.record_sub(sub);
        }
        Ok(main)
    }

    fn seek_sub(&mut self, doc: DocId, sub_doc: DocId, sub_end: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let range = self.mapping.sub_range(doc);
        let target = sub_doc.max(range.begin);
        let sub = self.inner.seek(target)?;
        if sub == END_DOCID || sub >= sub_end.min(range.end) {
            return Ok(END_DOCID);
        }
        if let Some(cell) = &self.cell {
            cell.record(doc, 0, 1, 0);
            cell.record_sub(sub);
        }
        Ok(sub)
    }

    fn current_doc(&self) -> DocId {
        self.current
    }

    fn is_empty(&self) -> bool {
        self.finished
    }

    fn move_to_end(&mut self) {
        self.finished = true;
        self.current = END_DOCID;
    }

    fn has_sub_doc_executor(&self) -> bool {
        true
    }
}
