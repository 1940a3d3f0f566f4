//! Minimum-should-match combinator.

use crate::error::Result;
use crate::executor::Executor;
use crate::types::{DocId, END_DOCID};

/// Union that only yields documents matched by at least
/// `min_should_match` children.
pub struct WeakAndExecutor {
    children: Vec<Box<dyn Executor>>,
    min_should_match: u32,
    // Per-round child landings, reused across seeks.
    landings: Vec<DocId>,
    current: DocId,
    finished: bool,
}

impl WeakAndExecutor {
    /// Compose `children` with the given threshold; a threshold of zero is
    /// treated as one.
    pub fn new(children: Vec<Box<dyn Executor>>, min_should_match: u32) -> Self {
        let landings = vec![END_DOCID; children.len()];
        WeakAndExecutor {
            children,
            min_should_match: min_should_match.max(1),
            landings,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for WeakAndExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let mut target = doc;
        loop {
            let mut candidate = END_DOCID;
            for (i, child) in self.children.iter_mut().enumerate() {
                let found = child.seek(target)?;
                self.landings[i] = found;
                if found < candidate {
                    candidate = found;
                }
            }
            if candidate == END_DOCID {
                self.current = END_DOCID;
                return Ok(END_DOCID);
            }
            let satisfied = self.landings.iter().filter(|&&d| d == candidate).count();
            if satisfied as u32 >= self.min_should_match {
                self.current = candidate;
                return Ok(candidate);
            }
            target = candidate + 1;
        }
    }

    fn seek_sub(&mut self, doc: DocId, sub_doc: DocId, sub_end: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let mut target = sub_doc;
        loop {
            if target >= sub_end {
                return Ok(END_DOCID);
            }
            let mut candidate = END_DOCID;
            for (i, child) in self.children.iter_mut().enumerate() {
                let found = child.seek_sub(doc, target, sub_end)?;
                self.landings[i] = found;
                if found < candidate {
                    candidate = found;
                }
            }
            if candidate == END_DOCID {
                return Ok(END_DOCID);
            }
            let satisfied = self.landings.iter().filter(|&&d| d == candidate).count();
            if satisfied as u32 >= self.min_should_match {
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
        self.children.iter().any(|c| c.has_position())
    }

    fn has_sub_doc_executor(&self) -> bool {
        self.children.iter().any(|c| c.has_sub_doc_executor())
    }
}
