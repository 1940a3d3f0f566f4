//! Posting representations handed out by index lookups.
//!
//! A posting is the per-term list of document identifiers (and optional
//! positions) satisfying that term. Lookups return one of several
//! representations; each leaf executor is specialized for one of them.

use std::rc::Rc;

use bit_vec::BitVec;

use crate::error::Result;
use crate::types::{DocId, DocIdRange, END_DOCID, FieldMask};

/// One document entry of a buffered posting list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingEntry {
    /// Document id.
    pub doc: DocId,
    /// Occurrence positions within the document, ascending.
    pub positions: Vec<u32>,
    /// Bitmask of the fields the term occurs in.
    pub field_map: FieldMask,
    /// Term frequency in the document.
    pub term_freq: u32,
    /// Per-document payload (e.g. a static weight) surfaced to match values.
    pub payload: i32,
}

impl PostingEntry {
    /// An entry with no positions, a term frequency of one, and no payload.
    pub fn new(doc: DocId) -> Self {
        PostingEntry {
            doc,
            positions: Vec::new(),
            field_map: 0,
            term_freq: 1,
            payload: 0,
        }
    }

    /// Attach occurrence positions; also sets the term frequency.
    pub fn with_positions(mut self, positions: Vec<u32>) -> Self {
        self.term_freq = positions.len() as u32;
        self.positions = positions;
        self
    }

    /// Attach a field occurrence bitmask.
    pub fn with_field_map(mut self, field_map: FieldMask) -> Self {
        self.field_map = field_map;
        self
    }

    /// Attach a payload value.
    pub fn with_payload(mut self, payload: i32) -> Self {
        self.payload = payload;
        self
    }
}

/// Sequential, seekable iterator over one term's posting list.
///
/// `seek` is monotone: a target below the current position returns the
/// current document again. A clone produced by `clone_iterator` owns its own
/// cursor; seeking one never perturbs the other.
pub trait PostingIterator {
    /// Position on the first document `>= doc`, returning it, or
    /// [`END_DOCID`] once exhausted.
    fn seek(&mut self, doc: DocId) -> Result<DocId>;

    /// The document the iterator currently rests on, [`END_DOCID`] if
    /// exhausted or not yet positioned.
    fn current_doc(&self) -> DocId;

    /// Whether entries carry occurrence positions.
    fn has_position(&self) -> bool {
        false
    }

    /// Occurrence positions of the current document.
    fn positions(&self) -> Result<Vec<u32>> {
        Ok(Vec::new())
    }

    /// Field occurrence bitmask of the current document.
    fn field_map(&self) -> FieldMask {
        0
    }

    /// Term frequency of the current document.
    fn term_freq(&self) -> u32 {
        1
    }

    /// Payload of the current document.
    fn payload(&self) -> i32 {
        0
    }

    /// Clone this iterator into an independent cursor over the same posting.
    fn clone_iterator(&self) -> Box<dyn PostingIterator>;
}

/// Buffered posting iterator over an in-memory entry list.
///
/// The entry list is shared; the cursor is per-iterator, so clones never
/// alias each other's position.
pub struct VecPostingIterator {
    entries: Rc<Vec<PostingEntry>>,
    range: DocIdRange,
    cursor: usize,
}

impl VecPostingIterator {
    /// Create an iterator over `entries` restricted to `range`.
    pub fn new(entries: Rc<Vec<PostingEntry>>, range: DocIdRange) -> Self {
        let cursor = entries.partition_point(|e| e.doc < range.begin);
        VecPostingIterator {
            entries,
            range,
            cursor,
        }
    }

    fn entry(&self) -> Option<&PostingEntry> {
        let e = self.entries.get(self.cursor)?;
        if e.doc < self.range.end { Some(e) } else { None }
    }
}

impl PostingIterator for VecPostingIterator {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        let target = doc.max(self.range.begin);
        self.cursor += self.entries[self.cursor..].partition_point(|e| e.doc < target);
        Ok(self.entry().map_or(END_DOCID, |e| e.doc))
    }

    fn current_doc(&self) -> DocId {
        self.entry().map_or(END_DOCID, |e| e.doc)
    }

    fn has_position(&self) -> bool {
        self.entries.iter().any(|e| !e.positions.is_empty())
    }

    fn positions(&self) -> Result<Vec<u32>> {
        Ok(self.entry().map_or_else(Vec::new, |e| e.positions.clone()))
    }

    fn field_map(&self) -> FieldMask {
        self.entry().map_or(0, |e| e.field_map)
    }

    fn term_freq(&self) -> u32 {
        self.entry().map_or(0, |e| e.term_freq)
    }

    fn payload(&self) -> i32 {
        self.entry().map_or(0, |e| e.payload)
    }

    fn clone_iterator(&self) -> Box<dyn PostingIterator> {
        Box::new(VecPostingIterator {
            entries: Rc::clone(&self.entries),
            range: self.range,
            cursor: self.cursor,
        })
    }
}

/// Dense bitmap posting: one bit per document id.
///
/// The bit storage is shared; executors keep only a cheap handle plus their
/// own scan position.
#[derive(Clone)]
pub struct BitmapPosting {
    bits: Rc<BitVec>,
    range: DocIdRange,
}

impl BitmapPosting {
    /// Create a bitmap posting restricted to `range`.
    pub fn new(bits: Rc<BitVec>, range: DocIdRange) -> Self {
        BitmapPosting { bits, range }
    }

    /// Whether `doc` is set.
    pub fn test(&self, doc: DocId) -> bool {
        self.range.contains(doc) && self.bits.get(doc as usize).unwrap_or(false)
    }

    /// First set document `>= from`, if any.
    ///
    /// Skips over all-zero storage blocks, so dense scans stay word-wise.
    pub fn next_set(&self, from: DocId) -> Option<DocId> {
        let bits_per_block = 32;
        let end = (self.bits.len() as u64).min(self.range.end as u64) as DocId;
        let mut doc = from.max(self.range.begin);
        while doc < end {
            let block = (doc / bits_per_block) as usize;
            if self.block(block) == 0 {
                doc = (block as DocId + 1) * bits_per_block;
                continue;
            }
            let stop = ((block as DocId + 1) * bits_per_block).min(end);
            while doc < stop {
                if self.bits.get(doc as usize).unwrap_or(false) {
                    return Some(doc);
                }
                doc += 1;
            }
        }
        None
    }

    /// Raw storage block `block`, zero past the end of the bitmap.
    pub fn block(&self, block: usize) -> u32 {
        self.bits.storage().get(block).copied().unwrap_or(0)
    }

    /// First document of the restricting range.
    pub fn begin(&self) -> DocId {
        self.range.begin
    }

    /// One past the last reachable document.
    pub fn end(&self) -> DocId {
        (self.bits.len() as u64).min(self.range.end as u64) as DocId
    }
}

/// Per-document predicate applied after a seek (spatial-style filtering).
pub trait DocFilter {
    /// Whether the sought document actually satisfies the predicate.
    fn accept(&self, doc: DocId) -> bool;

    /// Clone this filter for an independent leaf.
    fn clone_filter(&self) -> Box<dyn DocFilter>;
}

/// [`DocFilter`] backed by a shared predicate function.
#[derive(Clone)]
pub struct PredicateFilter {
    predicate: Rc<dyn Fn(DocId) -> bool>,
}

impl PredicateFilter {
    /// Wrap a predicate function.
    pub fn new<F: Fn(DocId) -> bool + 'static>(predicate: F) -> Self {
        PredicateFilter {
            predicate: Rc::new(predicate),
        }
    }
}

impl DocFilter for PredicateFilter {
    fn accept(&self, doc: DocId) -> bool {
        (self.predicate)(doc)
    }

    fn clone_filter(&self) -> Box<dyn DocFilter> {
        Box::new(self.clone())
    }
}
