//! Batched column lookup: strategy dispatch, row/column folding, and the
//! per-batch lookup cache.

use calluna::index::PostingEntry;
use calluna::{
    ColumnNode, CombineOp, DocIdRange, IndexType, MatchDataManager, MemoryIndexReader,
    QueryBuilder, QueryNode, TableNode, TermValue, collect_matches,
};

fn eval_table(reader: &MemoryIndexReader, table: TableNode) -> Vec<u32> {
    let mut match_data = MatchDataManager::new();
    let mut builder = QueryBuilder::new(reader, &mut match_data, DocIdRange::all());
    let mut tree = builder.build(&QueryNode::Table(table)).unwrap();
    collect_matches(tree.as_mut(), DocIdRange::all()).unwrap()
}

fn numeric_reader() -> MemoryIndexReader {
    let mut reader = MemoryIndexReader::new();
    reader.add_index("uid", IndexType::Number);
    reader.add_posting(
        "uid",
        TermValue::Number(10),
        vec![PostingEntry::new(2), PostingEntry::new(6)],
    );
    reader.add_posting(
        "uid",
        TermValue::Number(11),
        vec![PostingEntry::new(4), PostingEntry::new(6)],
    );
    reader
}

#[test]
fn test_rows_merge_with_row_operator() {
    let reader = numeric_reader();
    let table = TableNode {
        columns: vec![ColumnNode::single_valued(
            "uid",
            vec![TermValue::Number(10), TermValue::Number(11)],
        )],
        column_op: CombineOp::And,
        row_op: CombineOp::Or,
        enable_cache: true,
    };

    assert_eq!(eval_table(&reader, table), vec![2, 4, 6]);
}

#[test]
fn test_multi_valued_row_folds_with_value_operator() {
    let reader = numeric_reader();
    // one row carrying both values, folded with AND
    let table = TableNode {
        columns: vec![ColumnNode {
            index_name: "uid".to_string(),
            values: vec![TermValue::Number(10), TermValue::Number(11)],
            row_offsets: vec![0, 2],
            value_op: CombineOp::And,
        }],
        column_op: CombineOp::And,
        row_op: CombineOp::Or,
        enable_cache: true,
    };

    assert_eq!(eval_table(&reader, table), vec![6]);
}

#[test]
fn test_columns_merge_column_wise_then_row_wise() {
    let mut reader = numeric_reader();
    reader.add_index("tag", IndexType::Text);
    reader.add_docs("tag", "red", &[2, 4]);
    reader.add_docs("tag", "blue", &[6]);

    // row 0: uid=10 AND tag=red -> {2}; row 1: uid=11 AND tag=blue -> {}
    let table = TableNode {
        columns: vec![
            ColumnNode::single_valued("uid", vec![TermValue::Number(10), TermValue::Number(11)]),
            ColumnNode::single_valued(
                "tag",
                vec![
                    TermValue::Word("red".to_string()),
                    TermValue::Word("blue".to_string()),
                ],
            ),
        ],
        column_op: CombineOp::And,
        row_op: CombineOp::Or,
        enable_cache: true,
    };

    assert_eq!(eval_table(&reader, table), vec![2]);
}

#[test]
fn test_primary_key_column_bypasses_postings() {
    let mut reader = MemoryIndexReader::new();
    reader.add_index("pk", IndexType::PrimaryKey);
    reader.add_primary_key("pk", TermValue::Word("k3".to_string()), 3);
    reader.add_primary_key("pk", TermValue::Word("k9".to_string()), 9);

    let table = TableNode {
        columns: vec![ColumnNode::single_valued(
            "pk",
            vec![
                TermValue::Word("k3".to_string()),
                TermValue::Word("k9".to_string()),
                TermValue::Word("missing".to_string()),
            ],
        )],
        column_op: CombineOp::And,
        row_op: CombineOp::Or,
        enable_cache: true,
    };

    assert_eq!(eval_table(&reader, table), vec![3, 9]);
}

#[test]
fn test_cached_repeat_value_gets_independent_iterators() {
    let reader = numeric_reader();
    // row 0: uid=10 AND uid=11 -> {6}, exhausting its uid=10 iterator well
    // past doc 2; row 1 repeats uid=10 and must still yield {2,6}.
    let table = TableNode {
        columns: vec![ColumnNode {
            index_name: "uid".to_string(),
            values: vec![
                TermValue::Number(10),
                TermValue::Number(11),
                TermValue::Number(10),
            ],
            row_offsets: vec![0, 2, 3],
            value_op: CombineOp::And,
        }],
        column_op: CombineOp::And,
        row_op: CombineOp::Or,
        enable_cache: true,
    };

    assert_eq!(eval_table(&reader, table), vec![2, 6]);
}

#[test]
fn test_weak_and_row_operator() {
    let reader = numeric_reader();
    // rows {2,6} and {4,6}; at least two rows must match
    let table = TableNode {
        columns: vec![ColumnNode::single_valued(
            "uid",
            vec![TermValue::Number(10), TermValue::Number(11)],
        )],
        column_op: CombineOp::And,
        row_op: CombineOp::WeakAnd(2),
        enable_cache: true,
    };

    assert_eq!(eval_table(&reader, table), vec![6]);
}

#[test]
fn test_empty_row_yields_forced_empty_leaf() {
    let reader = numeric_reader();
    // row 0 has no values at all
    let table = TableNode {
        columns: vec![ColumnNode {
            index_name: "uid".to_string(),
            values: vec![TermValue::Number(10)],
            row_offsets: vec![0, 0, 1],
            value_op: CombineOp::Or,
        }],
        column_op: CombineOp::And,
        row_op: CombineOp::Or,
        enable_cache: true,
    };

    assert_eq!(eval_table(&reader, table), vec![2, 6]);
}

#[test]
fn test_column_node_shorthand() {
    let reader = numeric_reader();
    let column = ColumnNode::single_valued(
        "uid",
        vec![TermValue::Number(10), TermValue::Number(11)],
    );

    let mut match_data = MatchDataManager::new();
    match_data.require_simple_match_data();
    let mut builder = QueryBuilder::new(&reader, &mut match_data, DocIdRange::all());
    let mut tree = builder.build(&QueryNode::Column(column)).unwrap();

    assert_eq!(
        collect_matches(tree.as_mut(), DocIdRange::all()).unwrap(),
        vec![2, 4, 6]
    );
    // every row value occupies a term slot
    assert_eq!(match_data.total_terms(), 2);
}

#[test]
fn test_disabled_cache_still_correct() {
    let reader = numeric_reader();
    let table = TableNode {
        columns: vec![ColumnNode::single_valued(
            "uid",
            vec![TermValue::Number(10), TermValue::Number(10)],
        )],
        column_op: CombineOp::And,
        row_op: CombineOp::Or,
        enable_cache: false,
    };

    assert_eq!(eval_table(&reader, table), vec![2, 6]);
}
