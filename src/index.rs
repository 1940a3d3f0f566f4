//! Index access interface consumed by the query builder.
//!
//! The inverted-index storage format is owned by an external layer; this
//! module defines only what the executor core needs from it: term lookups
//! tagged with a posting representation, per-index metadata, field map
//! masks, and main↔sub join mappings for hierarchical indexes.

pub mod memory;
pub mod posting;

use std::rc::Rc;

use crate::error::Result;
use crate::query::{Term, TermValue};
use crate::types::{DocId, DocIdRange, FieldMask};

pub use posting::{
    BitmapPosting, DocFilter, PostingEntry, PostingIterator, PredicateFilter, VecPostingIterator,
};

/// Kinds of indexes the lookup strategies dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// Tokenized text index.
    Text,
    /// Numeric-hashed index.
    Number,
    /// Primary key index mapping one value to one document.
    PrimaryKey,
    /// Spatial-style index whose postings need post-seek filtering.
    Spatial,
}

/// Per-index metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMeta {
    /// How lookups against this index are dispatched.
    pub index_type: IndexType,
    /// Whether postings enumerate sub-document ids joined to main documents.
    pub is_sub_partition: bool,
}

/// Posting representation tag, used for diagnostics and dispatch logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingKind {
    /// Dense per-document bitmap.
    Bitmap,
    /// Buffered, skip-scanned posting list.
    Buffered,
    /// Posting list with a per-document post-seek filter.
    SeekFilter,
    /// Direct value-to-docid mapping, no posting iteration.
    PrimaryKey,
    /// Representation this core cannot drive.
    Unsupported,
}

/// A posting in one of the representations the executor core can drive.
pub enum Posting {
    /// Dense bitmap.
    Bitmap(BitmapPosting),
    /// Buffered posting iterator.
    Buffered(Box<dyn PostingIterator>),
    /// Posting iterator plus a per-document acceptance filter.
    SeekFilter(Box<dyn PostingIterator>, Box<dyn DocFilter>),
    /// The single document a primary key resolved to.
    PrimaryKey(DocId),
    /// A representation the reader produced but this core cannot execute.
    /// Carries the reader-reported format name for the build-site warning.
    Unsupported(&'static str),
}

impl Posting {
    /// Representation tag of this posting.
    pub fn kind(&self) -> PostingKind {
        match self {
            Posting::Bitmap(_) => PostingKind::Bitmap,
            Posting::Buffered(_) => PostingKind::Buffered,
            Posting::SeekFilter(_, _) => PostingKind::SeekFilter,
            Posting::PrimaryKey(_) => PostingKind::PrimaryKey,
            Posting::Unsupported(_) => PostingKind::Unsupported,
        }
    }
}

impl Clone for Posting {
    fn clone(&self) -> Self {
        match self {
            Posting::Bitmap(b) => Posting::Bitmap(b.clone()),
            Posting::Buffered(it) => Posting::Buffered(it.clone_iterator()),
            Posting::SeekFilter(it, f) => {
                Posting::SeekFilter(it.clone_iterator(), f.clone_filter())
            }
            Posting::PrimaryKey(doc) => Posting::PrimaryKey(*doc),
            Posting::Unsupported(kind) => Posting::Unsupported(kind),
        }
    }
}

/// Mapping between main documents and their sub-document ranges.
///
/// Main document `d` owns the sub-document ids
/// `[main_to_sub[d], main_to_sub[d + 1])`; `sub_to_main` inverts the
/// mapping.
#[derive(Clone)]
pub struct SubDocMapping {
    main_to_sub: Rc<Vec<DocId>>,
    sub_to_main: Rc<Vec<DocId>>,
}

impl SubDocMapping {
    /// Build a mapping from the per-main-document sub ranges.
    ///
    /// `main_to_sub` must be monotone with one more entry than there are
    /// main documents.
    pub fn new(main_to_sub: Vec<DocId>) -> Self {
        let mut sub_to_main = Vec::new();
        for main in 0..main_to_sub.len().saturating_sub(1) {
            for _ in main_to_sub[main]..main_to_sub[main + 1] {
                sub_to_main.push(main as DocId);
            }
        }
        SubDocMapping {
            main_to_sub: Rc::new(main_to_sub),
            sub_to_main: Rc::new(sub_to_main),
        }
    }

    /// Number of main documents covered.
    pub fn main_doc_count(&self) -> DocId {
        self.main_to_sub.len().saturating_sub(1) as DocId
    }

    /// Sub-document range of main document `doc`, empty when out of range.
    pub fn sub_range(&self, doc: DocId) -> DocIdRange {
        let i = doc as usize;
        if i + 1 >= self.main_to_sub.len() {
            return DocIdRange::new(0, 0);
        }
        DocIdRange::new(self.main_to_sub[i], self.main_to_sub[i + 1])
    }

    /// Main document owning sub-document `sub`, if any.
    pub fn main_of(&self, sub: DocId) -> Option<DocId> {
        self.sub_to_main.get(sub as usize).copied()
    }
}

/// Result of one term lookup.
///
/// Produced once per leaf per lookup; ownership of the posting passes to
/// the executor that wraps it.
pub struct LookupResult {
    /// The posting, or `None` when the term has no postings.
    pub posting: Option<Posting>,
    /// Whether the posting enumerates sub-document ids.
    pub is_sub_partition: bool,
    /// Main↔sub join mapping for sub-partition postings.
    pub join: Option<SubDocMapping>,
}

impl LookupResult {
    /// A lookup that found nothing.
    pub fn none() -> Self {
        LookupResult {
            posting: None,
            is_sub_partition: false,
            join: None,
        }
    }

    /// A main-partition lookup around `posting`.
    pub fn with_posting(posting: Posting) -> Self {
        LookupResult {
            posting: Some(posting),
            is_sub_partition: false,
            join: None,
        }
    }

    /// Representation tag, [`PostingKind::Unsupported`] only for unknown
    /// formats, `None` when nothing was found.
    pub fn kind(&self) -> Option<PostingKind> {
        self.posting.as_ref().map(Posting::kind)
    }
}

impl Clone for LookupResult {
    fn clone(&self) -> Self {
        LookupResult {
            posting: self.posting.clone(),
            is_sub_partition: self.is_sub_partition,
            join: self.join.clone(),
        }
    }
}

/// Read access to one index partition.
///
/// Implemented by the external index-storage layer; [`memory`] ships an
/// in-memory implementation used by tests and examples.
pub trait IndexReader {
    /// Look up `term` restricted to `layer`.
    ///
    /// A term without postings yields `LookupResult::none()`, never an
    /// error; errors are reserved for index access failures.
    fn lookup(&self, term: &Term, layer: &DocIdRange) -> Result<LookupResult>;

    /// Lookup variant used by the batched column path, which memoizes
    /// results itself; implementations must not cache.
    fn lookup_without_cache(&self, term: &Term, layer: &DocIdRange) -> Result<LookupResult> {
        self.lookup(term, layer)
    }

    /// Metadata of the named index, `None` if it does not exist.
    fn index_meta(&self, index_name: &str) -> Option<IndexMeta>;

    /// Bitmask selecting `required_fields` within the named index, `None`
    /// when the index or one of the fields is unknown.
    fn gen_field_map_mask(
        &self,
        index_name: &str,
        required_fields: &[String],
    ) -> Option<FieldMask>;

    /// Resolve a primary key directly to its document id, bypassing posting
    /// iteration entirely.
    fn lookup_primary_key(
        &self,
        index_name: &str,
        value: &TermValue,
        layer: &DocIdRange,
    ) -> Option<DocId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_doc_mapping() {
        // main 0 -> subs [0,2), main 1 -> subs [2,2), main 2 -> subs [2,5)
        let mapping = SubDocMapping::new(vec![0, 2, 2, 5]);

        assert_eq!(mapping.main_doc_count(), 3);
        assert_eq!(mapping.sub_range(0), DocIdRange::new(0, 2));
        assert!(mapping.sub_range(1).is_empty());
        assert_eq!(mapping.sub_range(2), DocIdRange::new(2, 5));
        assert!(mapping.sub_range(3).is_empty());

        assert_eq!(mapping.main_of(0), Some(0));
        assert_eq!(mapping.main_of(1), Some(0));
        assert_eq!(mapping.main_of(2), Some(2));
        assert_eq!(mapping.main_of(4), Some(2));
        assert_eq!(mapping.main_of(5), None);
    }

    #[test]
    fn test_posting_clone_keeps_kind() {
        let posting = Posting::PrimaryKey(7);
        assert_eq!(posting.clone().kind(), PostingKind::PrimaryKey);
        assert_eq!(Posting::Unsupported("delta").kind(), PostingKind::Unsupported);
    }
}
