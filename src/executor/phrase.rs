//! Position-adjacency combinator.

use crate::error::Result;
use crate::executor::Executor;
use crate::executor::and::seek_aligned;
use crate::types::{DocId, END_DOCID};

/// Intersection of the children plus an adjacency check over their
/// position streams.
///
/// `positions` names the children that carry position information as
/// `(child index, phrase position)` pairs; phrase positions count stop
/// words, so adjacency stays correct across them. Children without
/// positions participate in the intersection only.
pub struct PhraseExecutor {
    children: Vec<Box<dyn Executor>>,
    positions: Vec<(usize, u32)>,
    current: DocId,
    finished: bool,
}

impl PhraseExecutor {
    /// Compose the phrase leaves with their position constraints.
    pub fn new(children: Vec<Box<dyn Executor>>, positions: Vec<(usize, u32)>) -> Self {
        PhraseExecutor {
            children,
            positions,
            current: END_DOCID,
            finished: false,
        }
    }

    /// Whether the aligned document places every positioned leaf at its
    /// phrase offset from one common anchor.
    fn adjacency_match(&mut self) -> Result<bool> {
        if self.positions.len() < 2 {
            return Ok(true);
        }
        let (first_child, first_offset) = self.positions[0];
        let anchors = self.children[first_child].current_positions()?;
        'anchor: for anchor in anchors {
            if anchor < first_offset {
                continue;
            }
            let base = anchor - first_offset;
            for &(child, offset) in &self.positions[1..] {
                let positions = self.children[child].current_positions()?;
                if !positions.contains(&(base + offset)) {
                    continue 'anchor;
                }
            }
            return Ok(true);
        }
        Ok(false)
    }
}

impl Executor for PhraseExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let mut target = doc;
        loop {
            let candidate = seek_aligned(&mut self.children, target)?;
            if candidate == END_DOCID {
                self.current = END_DOCID;
                return Ok(END_DOCID);
            }
            if self.adjacency_match()? {
                self.current = candidate;
                return Ok(candidate);
            }
            target = candidate + 1;
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
        true
    }

    fn has_sub_doc_executor(&self) -> bool {
        self.children.iter().any(|c| c.has_sub_doc_executor())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::executor::term::BufferedTermExecutor;
    use crate::index::posting::{PostingEntry, VecPostingIterator};
    use crate::types::DocIdRange;

    fn positioned_leaf(entries: Vec<PostingEntry>) -> Box<dyn Executor> {
        let it = Box::new(VecPostingIterator::new(Rc::new(entries), DocIdRange::all()));
        Box::new(BufferedTermExecutor::new(it, None))
    }

    #[test]
    fn test_phrase_adjacency() {
        // doc 4: "new york" at positions 2,3; doc 7: words present, not adjacent
        let a = positioned_leaf(vec![
            PostingEntry::new(4).with_positions(vec![2]),
            PostingEntry::new(7).with_positions(vec![1]),
        ]);
        let b = positioned_leaf(vec![
            PostingEntry::new(4).with_positions(vec![3]),
            PostingEntry::new(7).with_positions(vec![5]),
        ]);
        let mut phrase = PhraseExecutor::new(vec![a, b], vec![(0, 0), (1, 1)]);

        assert_eq!(phrase.seek(0).unwrap(), 4);
        assert_eq!(phrase.seek(5).unwrap(), END_DOCID);
    }

    #[test]
    fn test_phrase_with_stop_word_gap() {
        // phrase "state <stop> art": offsets 0 and 2
        let a = positioned_leaf(vec![PostingEntry::new(9).with_positions(vec![10])]);
        let b = positioned_leaf(vec![PostingEntry::new(9).with_positions(vec![12])]);
        let mut phrase = PhraseExecutor::new(vec![a, b], vec![(0, 0), (1, 2)]);

        assert_eq!(phrase.seek(0).unwrap(), 9);
    }

    #[test]
    fn test_phrase_single_positioned_leaf_degenerates_to_and() {
        let a = positioned_leaf(vec![PostingEntry::new(3).with_positions(vec![1])]);
        let b = positioned_leaf(vec![PostingEntry::new(3)]);
        let mut phrase = PhraseExecutor::new(vec![a, b], vec![(0, 0)]);

        assert_eq!(phrase.seek(0).unwrap(), 3);
    }
}
