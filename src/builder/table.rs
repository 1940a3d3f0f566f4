//! Batched, cache-aware column lookup for vectorized predicates.
//!
//! A table predicate carries one or more columns of per-row values. Each
//! value becomes a leaf; values of one row fold via the row's value
//! operator, columns merge column-wise, rows merge row-wise. Lookups are
//! memoized per batch when caching is enabled; a memo hit hands out a
//! cloned posting so no two leaves ever share an iterator cursor.

use ahash::AHashMap;
use log::warn;

use crate::builder::{QueryBuilder, combine};
use crate::error::Result;
use crate::executor::{EmptyExecutor, Executor, PrimaryKeyTermExecutor};
use crate::index::{IndexReader, IndexType, LookupResult};
use crate::query::{ColumnNode, TableNode, Term, TermValue};
use crate::types::{CombineOp, DocIdRange};

/// Per-batch lookup memo.
struct LookupCache {
    enabled: bool,
    entries: AHashMap<(String, TermValue), LookupResult>,
}

impl LookupCache {
    fn new(enabled: bool) -> Self {
        LookupCache {
            enabled,
            entries: AHashMap::new(),
        }
    }

    /// Look `term` up, memoizing the result. Every caller receives its own
    /// posting clone; the memo keeps the master.
    fn lookup(
        &mut self,
        reader: &dyn IndexReader,
        term: &Term,
        layer: &DocIdRange,
    ) -> Result<LookupResult> {
        if !self.enabled {
            return reader.lookup_without_cache(term, layer);
        }
        let key = (term.index_name().to_string(), term.value().clone());
        if let Some(master) = self.entries.get(&key) {
            return Ok(master.clone());
        }
        let master = reader.lookup_without_cache(term, layer)?;
        let handout = master.clone();
        self.entries.insert(key, master);
        Ok(handout)
    }
}

/// Translate a column value into the index's key space; `None` when a word
/// does not parse for a numeric-hashed index.
fn normalized_term(index_name: &str, value: &TermValue, index_type: IndexType) -> Option<Term> {
    match (index_type, value) {
        (IndexType::Number, TermValue::Word(word)) => {
            let number = word.parse::<i64>().ok()?;
            Some(Term::with_value(index_name, TermValue::Number(number)))
        }
        _ => Some(Term::with_value(index_name, value.clone())),
    }
}

impl QueryBuilder<'_> {
    pub(super) fn visit_table(&mut self, table: &TableNode) -> Result<Box<dyn Executor>> {
        if table.columns.is_empty() {
            warn!("table predicate without columns, degrades to no match");
            return Ok(Box::new(EmptyExecutor::new()));
        }
        let mut rows = None;
        for column in &table.columns {
            match column.row_count() {
                Some(count) if rows.is_none() || rows == Some(count) => rows = Some(count),
                _ => {
                    warn!(
                        "table predicate columns disagree on row count, degrades to no match"
                    );
                    return Ok(Box::new(EmptyExecutor::new()));
                }
            }
        }
        let rows = rows.unwrap_or(0);
        let mut cache = LookupCache::new(table.enable_cache);
        let mut row_executors = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut column_executors = Vec::with_capacity(table.columns.len());
            for column in &table.columns {
                let mut leaves = Vec::new();
                for value in column.row_values(row) {
                    leaves.push(self.column_value_leaf(column, value, &mut cache)?);
                }
                column_executors.push(combine(leaves, column.value_op));
            }
            row_executors.push(combine(column_executors, table.column_op));
        }
        Ok(combine(row_executors, table.row_op))
    }

    pub(super) fn visit_column(&mut self, column: &ColumnNode) -> Result<Box<dyn Executor>> {
        let table = TableNode {
            columns: vec![column.clone()],
            column_op: CombineOp::And,
            row_op: CombineOp::Or,
            enable_cache: true,
        };
        self.visit_table(&table)
    }

    fn column_value_leaf(
        &mut self,
        column: &ColumnNode,
        value: &TermValue,
        cache: &mut LookupCache,
    ) -> Result<Box<dyn Executor>> {
        let Some(meta) = self.reader.index_meta(&column.index_name) else {
            warn!(
                "unknown index '{}' in table predicate, value degrades to no match",
                column.index_name
            );
            return Ok(Box::new(EmptyExecutor::new()));
        };
        let Some(term) = normalized_term(&column.index_name, value, meta.index_type) else {
            warn!(
                "value '{value}' does not fit numeric index '{}', degrades to no match",
                column.index_name
            );
            return Ok(Box::new(EmptyExecutor::new()));
        };
        if meta.index_type == IndexType::PrimaryKey {
            // Direct key-to-docid resolution, no posting iteration.
            let cell = self.register_term(&term, false);
            return Ok(
                match self
                    .reader
                    .lookup_primary_key(&column.index_name, term.value(), &self.layer)
                {
                    Some(doc) => Box::new(PrimaryKeyTermExecutor::new(doc, cell)),
                    None => Box::new(EmptyExecutor::new()),
                },
            );
        }
        let lookup = cache.lookup(self.reader, &term, &self.layer)?;
        self.leaf_from_lookup(&term, lookup)
    }
}
