//! Executor tree: lazy enumeration of matching documents.
//!
//! An executor is a node of the compiled query tree. Leaves wrap one posting
//! in one representation; combinators compose child executors via boolean
//! algebra over sorted docid streams. Every node exposes the same contract,
//! so callers never distinguish leaves from subtrees and never null-check:
//! a node that can match nothing is represented by a forced-empty executor,
//! not by an absent one.

pub mod and;
pub mod and_not;
pub mod bitmap_and;
pub mod or;
pub mod phrase;
pub mod restrict;
pub mod term;
pub mod weak_and;

use crate::error::Result;
use crate::index::posting::BitmapPosting;
use crate::types::{DocId, DocIdRange, END_DOCID};

pub use and::AndExecutor;
pub use and_not::AndNotExecutor;
pub use bitmap_and::BitmapAndExecutor;
pub use or::OrExecutor;
pub use phrase::PhraseExecutor;
pub use restrict::{Deadline, RestrictExecutor};
pub use term::{
    BitmapTermExecutor, BufferedTermExecutor, EmptyExecutor, FieldMaskTermExecutor,
    PrimaryKeyTermExecutor, SeekFilterTermExecutor, SubDocJoinExecutor,
};
pub use weak_and::WeakAndExecutor;

/// Uniform contract of every node in the executor tree.
pub trait Executor {
    /// Position on the first matching document `>= doc`, returning it, or
    /// [`END_DOCID`] when no further document matches.
    ///
    /// Seeks are monotone; a target behind the current position never moves
    /// the executor backwards.
    fn seek(&mut self, doc: DocId) -> Result<DocId>;

    /// The document this executor currently rests on, [`END_DOCID`] before
    /// the first landing or after exhaustion.
    fn current_doc(&self) -> DocId;

    /// Whether this executor is known, without further seeking, to match
    /// nothing.
    fn is_empty(&self) -> bool;

    /// Force this executor empty, permanently and idempotently.
    ///
    /// This is the uniform sentinel-empty representation applied by the
    /// builder's short-circuit rules.
    fn move_to_end(&mut self);

    /// Whether this node can produce occurrence positions.
    fn has_position(&self) -> bool {
        false
    }

    /// Whether this subtree contains a sub-document join.
    fn has_sub_doc_executor(&self) -> bool {
        false
    }

    /// Occurrence positions at the current document, empty when positions
    /// are unavailable.
    fn current_positions(&mut self) -> Result<Vec<u32>> {
        Ok(Vec::new())
    }

    /// Position on the first matching sub-document `>= sub_doc` within
    /// `[sub_doc, sub_end)` of main document `doc`.
    ///
    /// A main-partition node matches every sub-document of a document it
    /// matches, which is the default implementation.
    fn seek_sub(&mut self, doc: DocId, sub_doc: DocId, sub_end: DocId) -> Result<DocId> {
        if self.current_doc() == doc && sub_doc < sub_end {
            Ok(sub_doc)
        } else {
            Ok(END_DOCID)
        }
    }

    /// Bitmap handle of a bitmap-backed leaf, letting the builder pick the
    /// bitmap-AND specialization without downcasting.
    fn bitmap_handle(&self) -> Option<BitmapPosting> {
        None
    }
}

/// Drive `executor` over `range`, collecting every matching document.
///
/// Convenience for tests and examples; the production hit-collection loop
/// lives outside this core.
pub fn collect_matches(executor: &mut dyn Executor, range: DocIdRange) -> Result<Vec<DocId>> {
    let mut matches = Vec::new();
    if executor.is_empty() {
        return Ok(matches);
    }
    let mut target = range.begin;
    while target < range.end {
        let doc = executor.seek(target)?;
        if doc == END_DOCID || doc >= range.end {
            break;
        }
        matches.push(doc);
        target = doc + 1;
    }
    Ok(matches)
}
