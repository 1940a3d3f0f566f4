//! Timeout and layer-range restriction wrapper.

use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::executor::Executor;
use crate::types::{DocId, DocIdRange, END_DOCID};

// Wall-clock reads are amortized over this many exceeded() calls.
const CHECK_INTERVAL: u32 = 32;

/// Cooperative timeout consulted at seek points.
///
/// Once the deadline passes, the guarded subtree behaves as exhausted; the
/// rest of the search keeps running.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Option<Instant>,
    calls: Cell<u32>,
    expired: Cell<bool>,
}

impl Deadline {
    /// A deadline `timeout` from now; `None` never expires.
    pub fn new(timeout: Option<Duration>) -> Self {
        Deadline {
            at: timeout.map(|t| Instant::now() + t),
            calls: Cell::new(0),
            expired: Cell::new(false),
        }
    }

    /// A deadline that never expires.
    pub fn none() -> Self {
        Deadline::new(None)
    }

    /// Whether the deadline has passed.
    pub fn exceeded(&self) -> bool {
        if self.expired.get() {
            return true;
        }
        let Some(at) = self.at else {
            return false;
        };
        let calls = self.calls.get();
        self.calls.set(calls.wrapping_add(1));
        if calls % CHECK_INTERVAL == 0 && Instant::now() >= at {
            self.expired.set(true);
            return true;
        }
        false
    }
}

/// Wraps a combinator with a cooperative timeout and the layer's docid
/// range.
///
/// An expired deadline forces the wrapped subtree empty instead of
/// aborting the search; documents past the layer range are never yielded.
pub struct RestrictExecutor {
    inner: Box<dyn Executor>,
    deadline: Deadline,
    range: DocIdRange,
    current: DocId,
    finished: bool,
}

impl RestrictExecutor {
    /// Wrap `inner` with a deadline and layer range.
    pub fn new(inner: Box<dyn Executor>, deadline: Deadline, range: DocIdRange) -> Self {
        RestrictExecutor {
            inner,
            deadline,
            range,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for RestrictExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        if self.deadline.exceeded() {
            self.move_to_end();
            return Ok(END_DOCID);
        }
        let found = self.inner.seek(doc.max(self.range.begin))?;
        if found >= self.range.end {
            self.current = END_DOCID;
            return Ok(END_DOCID);
        }
        self.current = found;
        Ok(found)
    }

    fn seek_sub(&mut self, doc: DocId, sub_doc: DocId, sub_end: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        self.inner.seek_sub(doc, sub_doc, sub_end)
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
        self.inner.move_to_end();
    }

    fn has_position(&self) -> bool {
        self.inner.has_position()
    }

    fn has_sub_doc_executor(&self) -> bool {
        self.inner.has_sub_doc_executor()
    }

    fn current_positions(&mut self) -> Result<Vec<u32>> {
        self.inner.current_positions()
    }
}
