//! # Calluna
//!
//! The runtime query-execution core of a full-text and structured search
//! engine. Calluna compiles a parsed boolean query tree into a composed
//! tree of posting-list executors that lazily enumerate matching document
//! identifiers against an inverted index, and records, per matched
//! document, which leaf terms actually matched so a downstream ranking
//! stage can score the hit.
//!
//! ## What lives here
//!
//! - [`builder::QueryBuilder`]: the visitor turning a query AST into an
//!   executor tree, selecting the cheapest leaf per posting representation
//!   and applying the boolean short-circuit rules, including the batched,
//!   cache-aware column lookup for table-style predicates.
//! - [`executor`]: the uniform seek/empty contract plus every leaf and
//!   combinator variant.
//! - [`matchdata`]: per-layer registries tracking which executors matched
//!   which document, exposed to scoring.
//!
//! Parsing query strings, posting storage, scoring, and the top-level hit
//! collection loop are external collaborators; only their interfaces appear
//! here.
//!
//! ## Example
//!
//! ```
//! use calluna::{
//!     DocIdRange, IndexType, MatchDataManager, MemoryIndexReader, QueryBuilder, QueryNode, Term,
//!     collect_matches,
//! };
//!
//! let mut reader = MemoryIndexReader::new();
//! reader.add_index("title", IndexType::Text);
//! reader.add_docs("title", "hello", &[1, 3, 5]);
//! reader.add_docs("title", "world", &[3, 8]);
//!
//! let query = QueryNode::And(vec![
//!     QueryNode::Term(Term::new("title", "hello")),
//!     QueryNode::Term(Term::new("title", "world")),
//! ]);
//!
//! let mut match_data = MatchDataManager::new();
//! let mut builder = QueryBuilder::new(&reader, &mut match_data, DocIdRange::all());
//! let mut tree = builder.build(&query)?;
//!
//! assert_eq!(collect_matches(tree.as_mut(), DocIdRange::all())?, vec![3]);
//! # Ok::<(), calluna::CallunaError>(())
//! ```

pub mod builder;
mod error;
pub mod executor;
pub mod index;
pub mod layer;
pub mod matchdata;
pub mod query;
mod types;

// Re-exports for the public API
pub use builder::QueryBuilder;
pub use error::{CallunaError, Result};
pub use executor::{Deadline, Executor, collect_matches};
pub use index::memory::MemoryIndexReader;
pub use index::{IndexMeta, IndexReader, IndexType, LookupResult, Posting, PostingKind};
pub use layer::{LayerMeta, LayerSet};
pub use matchdata::collector::{CollectorCenter, MatchCollector};
pub use matchdata::manager::MatchDataManager;
pub use matchdata::{MatchData, MatchValues, QueryTermMeta, SimpleMatchData};
pub use query::{
    ColumnNode, MultiTermNode, PhraseNode, PhraseTerm, QueryNode, TableNode, Term, TermValue,
};
pub use types::{CombineOp, DocId, DocIdRange, END_DOCID, FieldMask, FieldMatchOp};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
