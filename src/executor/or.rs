//! Union combinator.

use crate::error::Result;
use crate::executor::Executor;
use crate::types::{DocId, END_DOCID};

/// Union over the children's docid streams.
pub struct OrExecutor {
    children: Vec<Box<dyn Executor>>,
    current: DocId,
    finished: bool,
}

impl OrExecutor {
    /// Compose `children`; ownership is exclusive.
    pub fn new(children: Vec<Box<dyn Executor>>) -> Self {
        OrExecutor {
            children,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for OrExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let mut min = END_DOCID;
        for child in &mut self.children {
            let found = child.seek(doc)?;
            if found < min {
                min = found;
            }
        }
        self.current = min;
        Ok(min)
    }

    fn seek_sub(&mut self, doc: DocId, sub_doc: DocId, sub_end: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let mut min = END_DOCID;
        for child in &mut self.children {
            let found = child.seek_sub(doc, sub_doc, sub_end)?;
            if found < min {
                min = found;
            }
        }
        Ok(min)
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
