//! Query AST consumed by the builder.
//!
//! The tree is produced by an external query parser and is immutable for the
//! duration of one build pass. Internal nodes own an ordered list of child
//! nodes; leaf nodes own a [`Term`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{CombineOp, FieldMatchOp};

/// The value a term looks up in its index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermValue {
    /// A tokenized word for text indexes.
    Word(String),
    /// A numeric value for numeric-hashed indexes.
    Number(i64),
}

impl fmt::Display for TermValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermValue::Word(w) => write!(f, "{w}"),
            TermValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A single term: an index name, a value, and optional per-field requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    index_name: String,
    value: TermValue,
    required_fields: Vec<String>,
    field_op: FieldMatchOp,
}

impl Term {
    /// Create a word term for a text index.
    pub fn new<S: Into<String>, W: Into<String>>(index_name: S, word: W) -> Self {
        Term {
            index_name: index_name.into(),
            value: TermValue::Word(word.into()),
            required_fields: Vec::new(),
            field_op: FieldMatchOp::Any,
        }
    }

    /// Create a numeric term for a numeric-hashed index.
    pub fn number<S: Into<String>>(index_name: S, value: i64) -> Self {
        Term {
            index_name: index_name.into(),
            value: TermValue::Number(value),
            required_fields: Vec::new(),
            field_op: FieldMatchOp::Any,
        }
    }

    /// Create a term from an already-typed value.
    pub fn with_value<S: Into<String>>(index_name: S, value: TermValue) -> Self {
        Term {
            index_name: index_name.into(),
            value,
            required_fields: Vec::new(),
            field_op: FieldMatchOp::Any,
        }
    }

    /// Restrict the term to a set of fields of its index.
    pub fn with_required_fields(mut self, fields: Vec<String>, op: FieldMatchOp) -> Self {
        self.required_fields = fields;
        self.field_op = op;
        self
    }

    /// The index this term looks up.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// The looked-up value.
    pub fn value(&self) -> &TermValue {
        &self.value
    }

    /// Fields the match is restricted to; empty means unrestricted.
    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    /// How required fields combine against the document field map.
    pub fn field_op(&self) -> FieldMatchOp {
        self.field_op
    }
}

/// One position of a phrase, possibly a stop word.
///
/// Stop words are never looked up but still advance the phrase position, so
/// adjacency constraints stay correct across them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseTerm {
    /// The term at this phrase position.
    pub term: Term,
    /// Whether this position is a stop word.
    pub stop_word: bool,
}

impl PhraseTerm {
    /// A regular phrase term.
    pub fn new(term: Term) -> Self {
        PhraseTerm {
            term,
            stop_word: false,
        }
    }

    /// A stop-word placeholder that only occupies a position.
    pub fn stop<S: Into<String>, W: Into<String>>(index_name: S, word: W) -> Self {
        PhraseTerm {
            term: Term::new(index_name, word),
            stop_word: true,
        }
    }
}

/// An ordered sequence of terms matched at adjacent positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseNode {
    /// Terms in phrase order, stop words included.
    pub terms: Vec<PhraseTerm>,
}

/// Several terms over one index folded by a combine operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTermNode {
    /// The looked-up terms.
    pub terms: Vec<Term>,
    /// How the per-term executors fold together.
    pub op: CombineOp,
}

/// A column of predicate values for a vectorized table lookup.
///
/// Row `i` owns `values[row_offsets[i]..row_offsets[i + 1]]`, so a row may
/// carry zero, one, or several values. `row_offsets` has one more entry than
/// there are rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNode {
    /// The index every value of this column looks up.
    pub index_name: String,
    /// Flattened per-row values.
    pub values: Vec<TermValue>,
    /// Row boundaries into `values`.
    pub row_offsets: Vec<usize>,
    /// Operator folding multiple values of one row.
    pub value_op: CombineOp,
}

impl ColumnNode {
    /// Create a column with one value per row.
    pub fn single_valued<S: Into<String>>(index_name: S, values: Vec<TermValue>) -> Self {
        let row_offsets = (0..=values.len()).collect();
        ColumnNode {
            index_name: index_name.into(),
            values,
            row_offsets,
            value_op: CombineOp::Or,
        }
    }

    /// Number of rows, or `None` if the offsets are malformed.
    pub fn row_count(&self) -> Option<usize> {
        let first = *self.row_offsets.first()?;
        let last = *self.row_offsets.last()?;
        if first != 0 || last != self.values.len() {
            return None;
        }
        if self.row_offsets.windows(2).any(|w| w[0] > w[1]) {
            return None;
        }
        Some(self.row_offsets.len() - 1)
    }

    /// Values of row `row`.
    pub fn row_values(&self, row: usize) -> &[TermValue] {
        &self.values[self.row_offsets[row]..self.row_offsets[row + 1]]
    }
}

/// A vectorized predicate over one or more columns (table/IN-style query).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNode {
    /// The predicate columns; all must agree on row count.
    pub columns: Vec<ColumnNode>,
    /// Operator merging the columns of one row.
    pub column_op: CombineOp,
    /// Operator merging the per-row results.
    pub row_op: CombineOp,
    /// Whether repeated values within the batch share one lookup.
    pub enable_cache: bool,
}

/// A parsed boolean query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryNode {
    /// Single term lookup.
    Term(Term),
    /// Numeric term lookup; executed like [`QueryNode::Term`] against a
    /// numeric-hashed index.
    Number(Term),
    /// Position-adjacent term sequence.
    Phrase(PhraseNode),
    /// Several terms over one index.
    MultiTerm(MultiTermNode),
    /// Intersection of the children.
    And(Vec<QueryNode>),
    /// Union of the children.
    Or(Vec<QueryNode>),
    /// First child minus the union of the remaining children.
    AndNot(Vec<QueryNode>),
    /// First child decides membership; the rest only contribute ranking
    /// signal.
    Rank(Vec<QueryNode>),
    /// Vectorized multi-column predicate.
    Table(TableNode),
    /// Single predicate column; shorthand for a one-column table.
    Column(ColumnNode),
}
