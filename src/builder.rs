//! Query builder: compiles a parsed query tree into an executor tree.
//!
//! The builder walks the AST bottom-up, looks leaves up in the
//! [`IndexReader`], picks the cheapest leaf executor per posting
//! representation, composes combinators for internal nodes, applies the
//! boolean short-circuit rules, and registers scoring-relevant leaves with
//! the [`MatchDataManager`]. Malformed subtrees and unknown posting formats
//! degrade to forced-empty executors instead of failing the search.

mod shortcut;
mod table;

use std::rc::Rc;

use log::warn;

use crate::error::Result;
use crate::executor::{
    AndExecutor, AndNotExecutor, BitmapAndExecutor, BitmapTermExecutor, BufferedTermExecutor,
    Deadline, EmptyExecutor, Executor, FieldMaskTermExecutor, OrExecutor, PhraseExecutor,
    PrimaryKeyTermExecutor, RestrictExecutor, SeekFilterTermExecutor, SubDocJoinExecutor,
    WeakAndExecutor,
};
use crate::index::{IndexReader, LookupResult, Posting, PostingIterator};
use crate::matchdata::manager::MatchDataManager;
use crate::matchdata::{MatchCell, QueryTermMeta};
use crate::query::{MultiTermNode, PhraseNode, QueryNode, Term};
use crate::types::{CombineOp, DocIdRange};

/// Compiles one query tree into one executor tree per layer.
///
/// `build` is a pure recursive walk returning each subtree directly; every
/// call compiles one layer and opens that layer's match data registry.
pub struct QueryBuilder<'a> {
    reader: &'a dyn IndexReader,
    match_data: &'a mut MatchDataManager,
    layer: DocIdRange,
    deadline: Option<Deadline>,
    // Registration is suppressed while visiting AND-NOT exclusion subtrees.
    and_not_depth: u32,
    rank_only: bool,
}

impl<'a> QueryBuilder<'a> {
    /// Create a builder for one layer of one search.
    pub fn new(
        reader: &'a dyn IndexReader,
        match_data: &'a mut MatchDataManager,
        layer: DocIdRange,
    ) -> Self {
        QueryBuilder {
            reader,
            match_data,
            layer,
            deadline: None,
            and_not_depth: 0,
            rank_only: false,
        }
    }

    /// Attach a cooperative timeout; phrase subtrees are wrapped with it.
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Compile `node` into an executor tree.
    pub fn build(&mut self, node: &QueryNode) -> Result<Box<dyn Executor>> {
        self.match_data.begin_layer();
        self.visit(node)
    }

    fn visit(&mut self, node: &QueryNode) -> Result<Box<dyn Executor>> {
        match node {
            QueryNode::Term(term) | QueryNode::Number(term) => self.visit_term(term),
            QueryNode::Phrase(phrase) => self.visit_phrase(phrase),
            QueryNode::MultiTerm(multi) => self.visit_multi_term(multi),
            QueryNode::And(children) => self.visit_and(children),
            QueryNode::Or(children) => self.visit_or(children),
            QueryNode::AndNot(children) => self.visit_and_not(children),
            QueryNode::Rank(children) => self.visit_rank(children),
            QueryNode::Table(node) => self.visit_table(node),
            QueryNode::Column(node) => self.visit_column(node),
        }
    }

    fn visit_term(&mut self, term: &Term) -> Result<Box<dyn Executor>> {
        let lookup = self.reader.lookup(term, &self.layer)?;
        self.leaf_from_lookup(term, lookup)
    }

    /// Build the leaf executor for one lookup result.
    ///
    /// The term is registered with the match data registry even when it has
    /// no postings, so term slots stay aligned with the query.
    fn leaf_from_lookup(&mut self, term: &Term, lookup: LookupResult) -> Result<Box<dyn Executor>> {
        let is_sub = lookup.is_sub_partition;
        let cell = self.register_term(term, is_sub);
        let Some(posting) = lookup.posting else {
            return Ok(Box::new(EmptyExecutor::new()));
        };
        // For sub-partition terms the cell belongs to the join wrapper.
        let leaf_cell = if is_sub { None } else { cell.clone() };
        let inner: Box<dyn Executor> = match posting {
            Posting::Bitmap(bitmap) => Box::new(BitmapTermExecutor::new(bitmap, leaf_cell)),
            Posting::Buffered(iterator) => self.buffered_leaf(term, iterator, leaf_cell),
            Posting::SeekFilter(iterator, filter) => {
                Box::new(SeekFilterTermExecutor::new(iterator, filter, leaf_cell))
            }
            Posting::PrimaryKey(doc) => {
                if self.layer.contains(doc) {
                    Box::new(PrimaryKeyTermExecutor::new(doc, leaf_cell))
                } else {
                    Box::new(EmptyExecutor::new())
                }
            }
            Posting::Unsupported(format) => {
                warn!(
                    "unsupported posting format '{format}' for index '{}', term '{}' degrades to no match",
                    term.index_name(),
                    term.value()
                );
                Box::new(EmptyExecutor::new())
            }
        };
        if is_sub {
            let Some(join) = lookup.join else {
                warn!(
                    "sub-partition lookup for index '{}' carries no join mapping, term '{}' degrades to no match",
                    term.index_name(),
                    term.value()
                );
                return Ok(Box::new(EmptyExecutor::new()));
            };
            return Ok(Box::new(SubDocJoinExecutor::new(
                inner,
                join,
                self.layer.end,
                cell,
            )));
        }
        Ok(inner)
    }

    fn buffered_leaf(
        &self,
        term: &Term,
        iterator: Box<dyn PostingIterator>,
        cell: Option<Rc<MatchCell>>,
    ) -> Box<dyn Executor> {
        if term.required_fields().is_empty() {
            return Box::new(BufferedTermExecutor::new(iterator, cell));
        }
        match self
            .reader
            .gen_field_map_mask(term.index_name(), term.required_fields())
        {
            Some(mask) => Box::new(FieldMaskTermExecutor::new(
                iterator,
                mask,
                term.field_op(),
                cell,
            )),
            None => {
                warn!(
                    "no field map mask for index '{}' fields {:?}, term '{}' matches unrestricted",
                    term.index_name(),
                    term.required_fields(),
                    term.value()
                );
                Box::new(BufferedTermExecutor::new(iterator, cell))
            }
        }
    }

    fn visit_phrase(&mut self, phrase: &PhraseNode) -> Result<Box<dyn Executor>> {
        let mut children = Vec::new();
        let mut positions = Vec::new();
        let mut phrase_pos: u32 = 0;
        let mut any_empty = false;
        let mut main_seen = false;
        let mut sub_seen = false;
        for part in &phrase.terms {
            if part.stop_word {
                phrase_pos += 1;
                continue;
            }
            let lookup = self.reader.lookup(&part.term, &self.layer)?;
            if lookup.posting.is_some() {
                if lookup.is_sub_partition {
                    sub_seen = true;
                } else {
                    main_seen = true;
                }
            }
            let leaf = self.leaf_from_lookup(&part.term, lookup)?;
            if leaf.is_empty() {
                any_empty = true;
            }
            if leaf.has_position() {
                positions.push((children.len(), phrase_pos));
            }
            children.push(leaf);
            phrase_pos += 1;
        }
        let mixed = main_seen && sub_seen;
        if mixed {
            warn!("phrase spans main and sub document partitions, degrades to no match");
        }
        let forced = children.is_empty() || any_empty || mixed;
        let mut node: Box<dyn Executor> = Box::new(PhraseExecutor::new(children, positions));
        if let Some(deadline) = &self.deadline {
            node = Box::new(RestrictExecutor::new(node, deadline.clone(), self.layer));
        }
        if forced {
            node.move_to_end();
        }
        Ok(node)
    }

    fn visit_multi_term(&mut self, multi: &MultiTermNode) -> Result<Box<dyn Executor>> {
        if multi.terms.is_empty() {
            warn!("multi-term node without terms, degrades to no match");
            return Ok(Box::new(EmptyExecutor::new()));
        }
        let mut children = Vec::with_capacity(multi.terms.len());
        for term in &multi.terms {
            children.push(self.visit_term(term)?);
        }
        Ok(combine(children, multi.op))
    }

    fn visit_and(&mut self, nodes: &[QueryNode]) -> Result<Box<dyn Executor>> {
        if nodes.is_empty() {
            warn!("AND node without children, degrades to no match");
            return Ok(Box::new(EmptyExecutor::new()));
        }
        let mut children = Vec::with_capacity(nodes.len());
        for node in nodes {
            children.push(self.visit(node)?);
        }
        Ok(combine(children, CombineOp::And))
    }

    fn visit_or(&mut self, nodes: &[QueryNode]) -> Result<Box<dyn Executor>> {
        if nodes.is_empty() {
            warn!("OR node without children, degrades to no match");
            return Ok(Box::new(EmptyExecutor::new()));
        }
        let mut children = Vec::with_capacity(nodes.len());
        for node in nodes {
            children.push(self.visit(node)?);
        }
        Ok(combine(children, CombineOp::Or))
    }

    fn visit_and_not(&mut self, nodes: &[QueryNode]) -> Result<Box<dyn Executor>> {
        if nodes.is_empty() {
            warn!("AND-NOT node without children, degrades to no match");
            return Ok(Box::new(EmptyExecutor::new()));
        }
        let include = self.visit(&nodes[0])?;
        // Documents must not be scored by what excluded them.
        self.and_not_depth += 1;
        let mut excludes = Vec::with_capacity(nodes.len() - 1);
        for node in &nodes[1..] {
            excludes.push(self.visit(node)?);
        }
        self.and_not_depth -= 1;
        let forced = include.is_empty();
        let mut node: Box<dyn Executor> = match excludes.len() {
            0 => include,
            1 => Box::new(AndNotExecutor::new(
                include,
                excludes.into_iter().next().unwrap(),
            )),
            _ => Box::new(AndNotExecutor::new(
                include,
                Box::new(OrExecutor::new(excludes)),
            )),
        };
        if forced {
            node.move_to_end();
        }
        Ok(node)
    }

    fn visit_rank(&mut self, nodes: &[QueryNode]) -> Result<Box<dyn Executor>> {
        if nodes.is_empty() {
            warn!("RANK node without children, degrades to no match");
            return Ok(Box::new(EmptyExecutor::new()));
        }
        let primary = self.visit(&nodes[0])?;
        // Remaining children contribute scoring signal, never membership;
        // the manager keeps their subtrees alive for fill-time seeks.
        let previous = self.rank_only;
        self.rank_only = true;
        for node in &nodes[1..] {
            let executor = self.visit(node)?;
            self.match_data.add_rank_executor(executor);
        }
        self.rank_only = previous;
        Ok(primary)
    }

    fn register_term(&mut self, term: &Term, is_sub: bool) -> Option<Rc<MatchCell>> {
        if self.and_not_depth > 0 {
            return None;
        }
        self.match_data.add_term(QueryTermMeta {
            index_name: term.index_name().to_string(),
            word: term.value().to_string(),
            layer: 0, // assigned by the manager
            rank_only: self.rank_only,
            is_sub,
        })
    }
}

/// Fold `children` into one executor, applying the short-circuit rules.
///
/// Reused by the multi-term and table builders; a zero-child fold yields a
/// forced-empty leaf.
fn combine(children: Vec<Box<dyn Executor>>, op: CombineOp) -> Box<dyn Executor> {
    if children.is_empty() {
        return Box::new(EmptyExecutor::new());
    }
    match op {
        CombineOp::And => {
            let forced = shortcut::and_forced_empty(&children);
            let mut node = new_and(children);
            if forced {
                node.move_to_end();
            }
            node
        }
        CombineOp::Or => {
            if children.len() == 1 {
                return children.into_iter().next().unwrap();
            }
            let forced = shortcut::or_forced_empty(&children);
            let mut node: Box<dyn Executor> = Box::new(OrExecutor::new(children));
            if forced {
                node.move_to_end();
            }
            node
        }
        CombineOp::WeakAnd(min_should_match) => {
            let total = children.len();
            let empty = children.iter().filter(|c| c.is_empty()).count();
            let forced = shortcut::weak_and_forced_empty(total, empty, min_should_match);
            let mut node: Box<dyn Executor> =
                Box::new(WeakAndExecutor::new(children, min_should_match));
            if forced {
                node.move_to_end();
            }
            node
        }
    }
}

/// Intersection constructor, specialized to the bitmap variant when any
/// child is bitmap-backed.
fn new_and(children: Vec<Box<dyn Executor>>) -> Box<dyn Executor> {
    if children.iter().any(|c| c.bitmap_handle().is_some()) {
        Box::new(BitmapAndExecutor::new(children))
    } else {
        Box::new(AndExecutor::new(children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::collect_matches;
    use crate::index::IndexType;
    use crate::index::memory::MemoryIndexReader;
    use crate::index::PostingKind;

    fn reader() -> MemoryIndexReader {
        let mut reader = MemoryIndexReader::new();
        reader.add_index("title", IndexType::Text);
        reader.add_docs("title", "hello", &[1, 3, 5]);
        reader.add_docs("title", "world", &[3, 5, 8]);
        reader
    }

    fn build(reader: &MemoryIndexReader, node: &QueryNode) -> Box<dyn Executor> {
        let mut manager = MatchDataManager::new();
        let mut builder = QueryBuilder::new(reader, &mut manager, DocIdRange::all());
        builder.build(node).unwrap()
    }

    #[test]
    fn test_missing_term_is_empty_without_seeking() {
        let reader = reader();
        let tree = build(&reader, &QueryNode::Term(Term::new("title", "absent")));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_unsupported_representation_degrades_to_empty() {
        let mut reader = reader();
        reader.set_representation("title", PostingKind::Unsupported);

        let tree = build(&reader, &QueryNode::Term(Term::new("title", "hello")));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_single_child_or_is_unwrapped() {
        let reader = reader();
        let mut tree = build(
            &reader,
            &QueryNode::Or(vec![QueryNode::Term(Term::new("title", "hello"))]),
        );
        assert_eq!(collect_matches(tree.as_mut(), DocIdRange::all()).unwrap(), vec![1, 3, 5]);
    }

    #[test]
    fn test_and_with_empty_child_is_forced_empty() {
        let reader = reader();
        let tree = build(
            &reader,
            &QueryNode::And(vec![
                QueryNode::Term(Term::new("title", "hello")),
                QueryNode::Term(Term::new("title", "absent")),
            ]),
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn test_and_not_evaluation() {
        let reader = reader();
        let mut tree = build(
            &reader,
            &QueryNode::AndNot(vec![
                QueryNode::Term(Term::new("title", "hello")),
                QueryNode::Term(Term::new("title", "world")),
            ]),
        );
        assert_eq!(collect_matches(tree.as_mut(), DocIdRange::all()).unwrap(), vec![1]);
    }

    #[test]
    fn test_multi_term_weak_and_forced_empty() {
        let reader = reader();
        let tree = build(
            &reader,
            &QueryNode::MultiTerm(MultiTermNode {
                terms: vec![
                    Term::new("title", "absent"),
                    Term::new("title", "missing"),
                    Term::new("title", "hello"),
                ],
                op: CombineOp::WeakAnd(2),
            }),
        );
        assert!(tree.is_empty());
    }
}
