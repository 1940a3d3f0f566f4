//! Seek semantics of the specialized leaves and combinators, driven
//! through the builder.

use std::time::Duration;

use calluna::index::{PostingEntry, PredicateFilter, SubDocMapping};
use calluna::query::PhraseNode;
use calluna::{
    Deadline, DocIdRange, FieldMatchOp, IndexType, MatchDataManager, MemoryIndexReader,
    PhraseTerm, QueryBuilder, QueryNode, Term, TermValue, collect_matches,
};

fn eval(reader: &MemoryIndexReader, query: &QueryNode) -> Vec<u32> {
    let mut match_data = MatchDataManager::new();
    let mut builder = QueryBuilder::new(reader, &mut match_data, DocIdRange::all());
    let mut tree = builder.build(query).unwrap();
    collect_matches(tree.as_mut(), DocIdRange::all()).unwrap()
}

fn phrase_reader() -> MemoryIndexReader {
    let mut reader = MemoryIndexReader::new();
    reader.add_index("body", IndexType::Text);
    // doc 4: "new york city", doc 9: "york ... new"
    reader.add_posting(
        "body",
        TermValue::Word("new".to_string()),
        vec![
            PostingEntry::new(4).with_positions(vec![0]),
            PostingEntry::new(9).with_positions(vec![6]),
        ],
    );
    reader.add_posting(
        "body",
        TermValue::Word("york".to_string()),
        vec![
            PostingEntry::new(4).with_positions(vec![1]),
            PostingEntry::new(9).with_positions(vec![2]),
        ],
    );
    reader.add_posting(
        "body",
        TermValue::Word("city".to_string()),
        vec![PostingEntry::new(4).with_positions(vec![2])],
    );
    reader
}

#[test]
fn test_phrase_adjacency_via_builder() {
    let reader = phrase_reader();
    let query = QueryNode::Phrase(PhraseNode {
        terms: vec![
            PhraseTerm::new(Term::new("body", "new")),
            PhraseTerm::new(Term::new("body", "york")),
        ],
    });

    assert_eq!(eval(&reader, &query), vec![4]);
}

#[test]
fn test_phrase_with_stop_word_position() {
    let mut reader = MemoryIndexReader::new();
    reader.add_index("body", IndexType::Text);
    // doc 2: "state of art" with "of" as a stop word
    reader.add_posting(
        "body",
        TermValue::Word("state".to_string()),
        vec![PostingEntry::new(2).with_positions(vec![3])],
    );
    reader.add_posting(
        "body",
        TermValue::Word("art".to_string()),
        vec![PostingEntry::new(2).with_positions(vec![5])],
    );

    let query = QueryNode::Phrase(PhraseNode {
        terms: vec![
            PhraseTerm::new(Term::new("body", "state")),
            PhraseTerm::stop("body", "of"),
            PhraseTerm::new(Term::new("body", "art")),
        ],
    });

    assert_eq!(eval(&reader, &query), vec![2]);
}

#[test]
fn test_phrase_of_only_stop_words_is_empty() {
    let reader = phrase_reader();
    let query = QueryNode::Phrase(PhraseNode {
        terms: vec![PhraseTerm::stop("body", "the"), PhraseTerm::stop("body", "of")],
    });

    let mut match_data = MatchDataManager::new();
    let mut builder = QueryBuilder::new(&reader, &mut match_data, DocIdRange::all());
    let tree = builder.build(&query).unwrap();
    assert!(tree.is_empty());
}

#[test]
fn test_phrase_mixing_partitions_is_empty() {
    let mut reader = phrase_reader();
    let mapping = SubDocMapping::new(vec![0, 2, 4]);
    reader.add_sub_index("para", IndexType::Text, mapping);
    reader.add_posting(
        "para",
        TermValue::Word("new".to_string()),
        vec![PostingEntry::new(1).with_positions(vec![0])],
    );

    let query = QueryNode::Phrase(PhraseNode {
        terms: vec![
            PhraseTerm::new(Term::new("body", "new")),
            PhraseTerm::new(Term::new("para", "new")),
        ],
    });

    let mut match_data = MatchDataManager::new();
    let mut builder = QueryBuilder::new(&reader, &mut match_data, DocIdRange::all());
    let tree = builder.build(&query).unwrap();
    assert!(tree.is_empty());
}

#[test]
fn test_phrase_deadline_exhausts_instead_of_failing() {
    let reader = phrase_reader();
    let query = QueryNode::Phrase(PhraseNode {
        terms: vec![
            PhraseTerm::new(Term::new("body", "new")),
            PhraseTerm::new(Term::new("body", "york")),
        ],
    });

    let mut match_data = MatchDataManager::new();
    let mut builder = QueryBuilder::new(&reader, &mut match_data, DocIdRange::all())
        .with_deadline(Deadline::new(Some(Duration::from_secs(0))));
    let mut tree = builder.build(&query).unwrap();

    assert_eq!(
        collect_matches(tree.as_mut(), DocIdRange::all()).unwrap(),
        Vec::<u32>::new()
    );
}

#[test]
fn test_bitmap_and_specialization_matches() {
    let mut reader = MemoryIndexReader::new();
    reader.add_index("tag", IndexType::Text);
    reader.add_bitmap("tag", TermValue::Word("hot".to_string()), &[2, 40, 77], 128);
    reader.add_index("title", IndexType::Text);
    reader.add_docs("title", "a", &[2, 40, 90]);

    let query = QueryNode::And(vec![
        QueryNode::Term(Term::new("tag", "hot")),
        QueryNode::Term(Term::new("title", "a")),
    ]);

    assert_eq!(eval(&reader, &query), vec![2, 40]);
}

#[test]
fn test_spatial_filter_leaf() {
    let mut reader = MemoryIndexReader::new();
    reader.add_index("geo", IndexType::Spatial);
    reader.add_posting(
        "geo",
        TermValue::Word("cell-12".to_string()),
        vec![
            PostingEntry::new(1),
            PostingEntry::new(2),
            PostingEntry::new(3),
            PostingEntry::new(4),
        ],
    );
    reader.set_filter("geo", Box::new(PredicateFilter::new(|d| d % 2 == 1)));

    let query = QueryNode::Term(Term::new("geo", "cell-12"));
    assert_eq!(eval(&reader, &query), vec![1, 3]);
}

#[test]
fn test_field_mask_requirements() {
    let mut reader = MemoryIndexReader::new();
    reader.add_index("default", IndexType::Text);
    reader.set_fields("default", &["title", "body"]);
    reader.add_posting(
        "default",
        TermValue::Word("x".to_string()),
        vec![
            PostingEntry::new(1).with_field_map(0b01), // title only
            PostingEntry::new(2).with_field_map(0b10), // body only
            PostingEntry::new(3).with_field_map(0b11), // both
        ],
    );

    let any = QueryNode::Term(
        Term::new("default", "x")
            .with_required_fields(vec!["title".to_string()], FieldMatchOp::Any),
    );
    assert_eq!(eval(&reader, &any), vec![1, 3]);

    let all = QueryNode::Term(Term::new("default", "x").with_required_fields(
        vec!["title".to_string(), "body".to_string()],
        FieldMatchOp::All,
    ));
    assert_eq!(eval(&reader, &all), vec![3]);
}

#[test]
fn test_sub_doc_join_yields_main_docs() {
    let mut reader = MemoryIndexReader::new();
    // main 0 -> subs [0,2), main 1 -> subs [2,4), main 2 -> subs [4,7)
    let mapping = SubDocMapping::new(vec![0, 2, 4, 7]);
    reader.add_sub_index("para", IndexType::Text, mapping);
    reader.add_docs("para", "needle", &[1, 5, 6]);

    let query = QueryNode::Term(Term::new("para", "needle"));
    assert_eq!(eval(&reader, &query), vec![0, 2]);
}

#[test]
fn test_and_over_main_and_sub_partitions() {
    let mut reader = MemoryIndexReader::new();
    let mapping = SubDocMapping::new(vec![0, 2, 4, 7]);
    reader.add_sub_index("para", IndexType::Text, mapping);
    reader.add_docs("para", "needle", &[1, 5, 6]);
    reader.add_index("title", IndexType::Text);
    reader.add_docs("title", "a", &[2]);

    let query = QueryNode::And(vec![
        QueryNode::Term(Term::new("title", "a")),
        QueryNode::Term(Term::new("para", "needle")),
    ]);

    assert_eq!(eval(&reader, &query), vec![2]);
}
