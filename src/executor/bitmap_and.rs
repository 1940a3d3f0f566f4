//! Bitmap-specialized intersection.

use crate::error::Result;
use crate::executor::Executor;
use crate::executor::and::seek_sub_aligned;
use crate::index::posting::BitmapPosting;
use crate::types::{DocId, END_DOCID};

const BITS_PER_BLOCK: u64 = 32;

/// First document `>= from` set in every bitmap, scanning storage blocks
/// word-wise instead of merging by seek.
fn next_all_set(bitmaps: &[BitmapPosting], from: DocId) -> Option<DocId> {
    if bitmaps.is_empty() {
        return Some(from);
    }
    let end = bitmaps.iter().map(|b| b.end() as u64).min().unwrap_or(0);
    let begin = bitmaps.iter().map(|b| b.begin() as u64).max().unwrap_or(0);
    let mut doc = (from as u64).max(begin);
    while doc < end {
        let block = (doc / BITS_PER_BLOCK) as usize;
        let mut word = u32::MAX;
        for bitmap in bitmaps {
            word &= bitmap.block(block);
        }
        if word == 0 {
            doc = (block as u64 + 1) * BITS_PER_BLOCK;
            continue;
        }
        let stop = ((block as u64 + 1) * BITS_PER_BLOCK).min(end);
        while doc < stop {
            if bitmaps.iter().all(|b| b.test(doc as DocId)) {
                return Some(doc as DocId);
            }
            doc += 1;
        }
    }
    None
}

/// Intersection chosen when at least one child is bitmap-backed.
///
/// Candidates are advanced by a word-wise AND over the bitmap children's
/// storage before any child is seeked, so dense postings are intersected
/// without a merge-by-seek; every child (bitmap leaves included) is then
/// aligned on the candidate, keeping match cells current.
pub struct BitmapAndExecutor {
    children: Vec<Box<dyn Executor>>,
    bitmaps: Vec<BitmapPosting>,
    current: DocId,
    finished: bool,
}

impl BitmapAndExecutor {
    /// Compose `children`, collecting the bitmap handles they expose.
    pub fn new(children: Vec<Box<dyn Executor>>) -> Self {
        let bitmaps = children.iter().filter_map(|c| c.bitmap_handle()).collect();
        BitmapAndExecutor {
            children,
            bitmaps,
            current: END_DOCID,
            finished: false,
        }
    }
}

impl Executor for BitmapAndExecutor {
    fn seek(&mut self, doc: DocId) -> Result<DocId> {
        if self.finished {
            return Ok(END_DOCID);
        }
        let mut target = doc;
        'outer: loop {
            target = match next_all_set(&self.bitmaps, target) {
                Some(d) => d,
                None => {
                    self.current = END_DOCID;
                    return Ok(END_DOCID);
                }
            };
            for i in 0..self.children.len() {
                let found = self.children[i].seek(target)?;
                if found != target {
                    if found == END_DOCID {
                        self.current = END_DOCID;
                        return Ok(END_DOCID);
                    }
                    target = found;
                    continue 'outer;
                }
            }
            self.current = target;
            return Ok(target);
        }
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
