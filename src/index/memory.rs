//! In-memory index reader.
//!
//! Reference [`IndexReader`] implementation backing unit and integration
//! tests. Every posting representation the executor core can drive is
//! constructible here, including deliberately unsupported ones for the
//! fail-open paths.

use std::rc::Rc;

use ahash::AHashMap;
use bit_vec::BitVec;

use crate::error::Result;
use crate::index::posting::{BitmapPosting, DocFilter, PostingEntry, VecPostingIterator};
use crate::index::{
    IndexMeta, IndexReader, IndexType, LookupResult, Posting, PostingKind, SubDocMapping,
};
use crate::query::{Term, TermValue};
use crate::types::{DocId, DocIdRange, FieldMask};

struct MemoryIndex {
    meta: IndexMeta,
    representation: PostingKind,
    postings: AHashMap<TermValue, Rc<Vec<PostingEntry>>>,
    bitmaps: AHashMap<TermValue, Rc<BitVec>>,
    primary_keys: AHashMap<TermValue, DocId>,
    filter: Option<Box<dyn DocFilter>>,
    field_bits: AHashMap<String, FieldMask>,
    join: Option<SubDocMapping>,
}

impl MemoryIndex {
    fn new(index_type: IndexType) -> Self {
        let representation = match index_type {
            IndexType::Text | IndexType::Number => PostingKind::Buffered,
            IndexType::PrimaryKey => PostingKind::PrimaryKey,
            IndexType::Spatial => PostingKind::SeekFilter,
        };
        MemoryIndex {
            meta: IndexMeta {
                index_type,
                is_sub_partition: false,
            },
            representation,
            postings: AHashMap::new(),
            bitmaps: AHashMap::new(),
            primary_keys: AHashMap::new(),
            filter: None,
            field_bits: AHashMap::new(),
            join: None,
        }
    }

    /// Translate a looked-up value into this index's key space.
    fn normalize(&self, value: &TermValue) -> Option<TermValue> {
        match (self.meta.index_type, value) {
            (IndexType::Number, TermValue::Word(w)) => {
                w.parse::<i64>().ok().map(TermValue::Number)
            }
            _ => Some(value.clone()),
        }
    }
}

/// In-memory [`IndexReader`] over hand-built indexes.
#[derive(Default)]
pub struct MemoryIndexReader {
    indexes: AHashMap<String, MemoryIndex>,
}

impl MemoryIndexReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        MemoryIndexReader {
            indexes: AHashMap::new(),
        }
    }

    /// Register an index of the given type.
    pub fn add_index(&mut self, name: &str, index_type: IndexType) {
        self.indexes
            .insert(name.to_string(), MemoryIndex::new(index_type));
    }

    /// Register a sub-document-partitioned index with its join mapping.
    pub fn add_sub_index(&mut self, name: &str, index_type: IndexType, join: SubDocMapping) {
        let mut index = MemoryIndex::new(index_type);
        index.meta.is_sub_partition = true;
        index.join = Some(join);
        self.indexes.insert(name.to_string(), index);
    }

    /// Add a buffered posting list for `value`.
    pub fn add_posting(&mut self, name: &str, value: TermValue, entries: Vec<PostingEntry>) {
        if let Some(index) = self.indexes.get_mut(name) {
            index.postings.insert(value, Rc::new(entries));
        }
    }

    /// Add a positionless posting list for a word.
    pub fn add_docs(&mut self, name: &str, word: &str, docs: &[DocId]) {
        let entries = docs.iter().map(|&d| PostingEntry::new(d)).collect();
        self.add_posting(name, TermValue::Word(word.to_string()), entries);
    }

    /// Add a dense bitmap posting for `value` over `universe` documents.
    pub fn add_bitmap(&mut self, name: &str, value: TermValue, docs: &[DocId], universe: usize) {
        if let Some(index) = self.indexes.get_mut(name) {
            let mut bits = BitVec::from_elem(universe, false);
            for &d in docs {
                bits.set(d as usize, true);
            }
            index.representation = PostingKind::Bitmap;
            index.bitmaps.insert(value, Rc::new(bits));
        }
    }

    /// Map a primary key value to its document.
    pub fn add_primary_key(&mut self, name: &str, value: TermValue, doc: DocId) {
        if let Some(index) = self.indexes.get_mut(name) {
            index.primary_keys.insert(value, doc);
        }
    }

    /// Attach the post-seek filter of a spatial index.
    pub fn set_filter(&mut self, name: &str, filter: Box<dyn DocFilter>) {
        if let Some(index) = self.indexes.get_mut(name) {
            index.filter = Some(filter);
        }
    }

    /// Force the representation lookups report, e.g. to exercise the
    /// unsupported-format fallback.
    pub fn set_representation(&mut self, name: &str, representation: PostingKind) {
        if let Some(index) = self.indexes.get_mut(name) {
            index.representation = representation;
        }
    }

    /// Name the fields of an index; field `i` gets mask bit `i`.
    pub fn set_fields(&mut self, name: &str, fields: &[&str]) {
        if let Some(index) = self.indexes.get_mut(name) {
            index.field_bits = fields
                .iter()
                .enumerate()
                .map(|(i, f)| (f.to_string(), 1u8 << i))
                .collect();
        }
    }

    fn make_posting(
        &self,
        index: &MemoryIndex,
        key: &TermValue,
        layer: &DocIdRange,
    ) -> Option<Posting> {
        // Sub-partition postings enumerate sub-document ids; the layer range
        // constrains main documents and is applied by the join leaf.
        let range = if index.meta.is_sub_partition {
            DocIdRange::all()
        } else {
            *layer
        };
        match index.representation {
            PostingKind::Bitmap => {
                let bits = index.bitmaps.get(key)?;
                Some(Posting::Bitmap(BitmapPosting::new(Rc::clone(bits), range)))
            }
            PostingKind::Buffered => {
                let entries = index.postings.get(key)?;
                Some(Posting::Buffered(Box::new(VecPostingIterator::new(
                    Rc::clone(entries),
                    range,
                ))))
            }
            PostingKind::SeekFilter => {
                let entries = index.postings.get(key)?;
                let iterator = Box::new(VecPostingIterator::new(Rc::clone(entries), range));
                match &index.filter {
                    Some(f) => Some(Posting::SeekFilter(iterator, f.clone_filter())),
                    None => Some(Posting::Buffered(iterator)),
                }
            }
            PostingKind::PrimaryKey => {
                let doc = *index.primary_keys.get(key)?;
                if range.contains(doc) {
                    Some(Posting::PrimaryKey(doc))
                } else {
                    None
                }
            }
            PostingKind::Unsupported => Some(Posting::Unsupported("foreign")),
        }
    }
}

impl IndexReader for MemoryIndexReader {
    fn lookup(&self, term: &Term, layer: &DocIdRange) -> Result<LookupResult> {
        let Some(index) = self.indexes.get(term.index_name()) else {
            return Ok(LookupResult::none());
        };
        let Some(key) = index.normalize(term.value()) else {
            return Ok(LookupResult::none());
        };
        let posting = self.make_posting(index, &key, layer);
        if posting.is_none() {
            return Ok(LookupResult::none());
        }
        Ok(LookupResult {
            posting,
            is_sub_partition: index.meta.is_sub_partition,
            join: index.join.clone(),
        })
    }

    fn index_meta(&self, index_name: &str) -> Option<IndexMeta> {
        self.indexes.get(index_name).map(|i| i.meta)
    }

    fn gen_field_map_mask(
        &self,
        index_name: &str,
        required_fields: &[String],
    ) -> Option<FieldMask> {
        let index = self.indexes.get(index_name)?;
        let mut mask: FieldMask = 0;
        for field in required_fields {
            mask |= index.field_bits.get(field)?;
        }
        Some(mask)
    }

    fn lookup_primary_key(
        &self,
        index_name: &str,
        value: &TermValue,
        layer: &DocIdRange,
    ) -> Option<DocId> {
        let index = self.indexes.get(index_name)?;
        let key = index.normalize(value)?;
        let doc = *index.primary_keys.get(&key)?;
        if layer.contains(doc) { Some(doc) } else { None }
    }
}
