//! Collector subscription for per-document custom signal.
//!
//! Optimization modules (e.g. an index-probe join recording which outer
//! row produced a matching inner document) subscribe a collector; every
//! collector is invoked once per matched document.

use crate::error::Result;
use crate::executor::Executor;
use crate::types::DocId;

/// Accumulates custom per-document signal during hit collection.
pub trait MatchCollector {
    /// Called once for every matched document, with the executor tree that
    /// produced it.
    fn collect(&mut self, executor: &dyn Executor, doc: DocId) -> Result<()>;

    /// Drop accumulated state.
    fn reset(&mut self) {}
}

/// Ordered list of subscribed collectors.
#[derive(Default)]
pub struct CollectorCenter {
    collectors: Vec<Box<dyn MatchCollector>>,
}

impl CollectorCenter {
    /// An empty center.
    pub fn new() -> Self {
        CollectorCenter {
            collectors: Vec::new(),
        }
    }

    /// Subscribe a collector; invocation order follows subscription order.
    pub fn subscribe(&mut self, collector: Box<dyn MatchCollector>) {
        self.collectors.push(collector);
    }

    /// Whether no collector is subscribed.
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Number of subscribed collectors.
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    /// Invoke every collector for `doc`.
    pub fn collect_all(&mut self, executor: &dyn Executor, doc: DocId) -> Result<()> {
        for collector in &mut self.collectors {
            collector.collect(executor, doc)?;
        }
        Ok(())
    }

    /// Reset every collector.
    pub fn reset(&mut self) {
        for collector in &mut self.collectors {
            collector.reset();
        }
    }
}
