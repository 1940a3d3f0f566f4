//! Intersection combinator.

use crate::error::Result;
use crate::executor::Executor;
use crate::types::{DocId, END_DOCID};

/// Align every child on the same document, starting at `doc`.
///
/// Returns the first document all children land on, or [`END_DOCID`] as
/// soon as any child exhausts. The final round seeks every child to the
/// returned document.
pub(crate) fn seek_aligned(children: &mut [Box<dyn Executor>], doc: DocId) -> Result<DocId> {
    if children.is_empty() {
        return Ok(END_DOCID);
    }
    let mut candidate = children[0].seek(doc)?;
    'align: loop {
        if candidate == END_DOCID {
            return Ok(END_DOCID);
        }
        for i in 1..children.len() {
            let found = children[i].seek(candidate)?;
            if found != candidate {
                if found == END_DOCID {
                    return Ok(END_DOCID);
                }
                candidate = children[0].seek(found)?;
                continue 'align;
            }
        }
        return Ok(candidate);
    }
}

/// Align every child on the same sub-document of `doc`.
pub(crate) fn seek_sub_aligned(
    children: &mut [Box<dyn Executor>],
    doc: DocId,
    sub_doc: DocId,
    sub_end: DocId,
) -> Result<DocId> {
    if children.is_empty() {
        return Ok(END_DOCID);
    }
    let mut candidate = children[0].seek_sub(doc, sub_doc, sub_end)?;
    'align: loop {
        if candidate == END_DOCID {
            return Ok(END_DOCID);
        }
        for i in 1..children.len() {
            let found = children[i].seek_sub(doc, candidate, sub_end)?;
            if found != candidate {
                if found == END_DOCID {
                    return Ok(END_DOCID);
                }
                candidate = children[0].seek_sub(doc, found, sub_end)?;
                continue 'align;
            }
        }
        return Ok(candidate);
    }
}

/// Intersection over the children's docid streams, with early exit on any
/// exhausted child.
pub struct AndExecutor {
    children: Vec<Box<dyn Executor>>,
    current: DocId,
    finished: bool,
}

impl AndExecutor {
    /// Compose `children`; ownership is exclusive.
    pub fn new(children: Vec<Box<dyn Executor>>) -> Self {
        AndExecutor {
            children,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for AndExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let found = seek_aligned(&mut self.children, doc)?;
        self.current = found;
        Ok(found)
    }

    fn seek_sub(&mut self, doc: DocId, sub_doc: DocId, sub_end: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        seek_sub_aligned(&mut self.children, doc, sub_doc, sub_end)
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
        self.children.iter().any(|c| c.has_position())
    }

    fn has_sub_doc_executor(&self) -> bool {
        self.children.iter().any(|c| c.has_sub_doc_executor())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::executor::term::BufferedTermExecutor;
    use crate::index::posting::{PostingEntry, VecPostingIterator};
    use crate::types::DocIdRange;

    pub(crate) fn leaf(docs: &[DocId]) -> Box<dyn Executor> {
        let entries = docs.iter().map(|&d| PostingEntry::new(d)).collect();
        let it = Box::new(VecPostingIterator::new(Rc::new(entries), DocIdRange::all()));
        Box::new(BufferedTermExecutor::new(it, None))
    }

    #[test]
    fn test_and_intersection() {
        let mut and = AndExecutor::new(vec![leaf(&[1, 3, 5, 9]), leaf(&[3, 4, 5, 10])]);

        assert_eq!(and.seek(0).unwrap(), 3);
        assert_eq!(and.seek(4).unwrap(), 5);
        assert_eq!(and.seek(6).unwrap(), END_DOCID);
    }

    #[test]
    fn test_and_exhausted_child_short_circuits() {
        let mut and = AndExecutor::new(vec![leaf(&[1, 2]), leaf(&[])]);
        assert_eq!(and.seek(0).unwrap(), END_DOCID);
    }
}
