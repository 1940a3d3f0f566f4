//! Difference combinator: inclusion minus the union of exclusions.

use crate::error::Result;
use crate::executor::Executor;
use crate::types::{DocId, END_DOCID};

/// Yields documents of the inclusion side not matched by the exclusion
/// side. Several exclusion children are combined into one executor (an
/// implicit union) before construction.
pub struct AndNotExecutor {
    include: Box<dyn Executor>,
    exclude: Box<dyn Executor>,
    current: DocId,
    finished: bool,
}

impl AndNotExecutor {
    /// Compose the inclusion and exclusion sides.
    pub fn new(include: Box<dyn Executor>, exclude: Box<dyn Executor>) -> Self {
        AndNotExecutor {
            include,
            exclude,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for AndNotExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let mut target = doc;
        loop {
            let found = self.include.seek(target)?;
            if found == END_DOCID {
                self.current = END_DOCID;
                return Ok(END_DOCID);
            }
            let excluded = self.exclude.seek(found)?;
            if excluded != found {
                self.current = found;
                return Ok(found);
            }
            target = found + 1;
        }
    }

    fn seek_sub(&mut self, doc: DocId, sub_doc: DocId, sub_end: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let mut target = sub_doc;
        loop {
            let found = self.include.seek_sub(doc, target, sub_end)?;
            if found == END_DOCID {
                return Ok(END_DOCID);
            }
            let excluded = self.exclude.seek_sub(doc, found, sub_end)?;
            if excluded != found {
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
        self.include.has_position()
    }

    fn has_sub_doc_executor(&self) -> bool {
        self.include.has_sub_doc_executor() || self.exclude.has_sub_doc_executor()
    }
}
