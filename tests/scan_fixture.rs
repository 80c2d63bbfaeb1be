//! Concrete fixture scenarios from the specification's testable-properties
//! section, run against the public API as an external consumer would.

use inputlayer::compact::ragged_table::CompactRaggedTable;
use inputlayer::compact::IdWidth;
use inputlayer::operation::cache::ResultCache;
use inputlayer::operation::result_table::ResultTable;
use inputlayer::pattern_index::{PatternMetaData, RoleData, NO_PATTERN};
use inputlayer::scan::HasPredicateScan;
use inputlayer::tree::Values;
use inputlayer::vocabulary::MapVocabulary;
use inputlayer::{ExecutionContext, Operation, PatternIndex, Role};
use std::sync::Arc;

const FIXTURE_HAS_PREDICATE_ROWS: [&[u64]; 9] = [
    &[],
    &[0, 3],
    &[0],
    &[],
    &[],
    &[0, 3],
    &[3, 4],
    &[2, 4],
    &[3],
];

fn fixture_role(num_predicate_rows: usize, full_has_predicate_size: u64) -> RoleData {
    let has_pattern = vec![0u32, NO_PATTERN, NO_PATTERN, 1, 0];
    let rows: Vec<Vec<u64>> = FIXTURE_HAS_PREDICATE_ROWS[..num_predicate_rows]
        .iter()
        .map(|row| row.to_vec())
        .collect();
    let has_predicate = CompactRaggedTable::build(IdWidth::W1, rows);
    let patterns = CompactRaggedTable::build(IdWidth::W1, vec![vec![0u64, 2, 3], vec![1, 3, 4, 2, 0]]);
    let predicate_global_ids: Vec<u64> = (0..5).collect();
    RoleData {
        has_pattern,
        has_predicate,
        patterns,
        predicate_global_ids,
        metadata: PatternMetaData {
            full_has_predicate_size,
            full_has_predicate_multiplicity_entities: 1.0,
            full_has_predicate_multiplicity_predicates: 1.0,
        },
    }
}

fn full_fixture() -> RoleData {
    fixture_role(9, 21)
}

fn truncated_fixture() -> RoleData {
    fixture_role(6, 16)
}

fn vocab_with_predicate_ids() -> MapVocabulary {
    let mut vocab = MapVocabulary::new();
    for i in 0..5u64 {
        vocab.insert(i, format!("<urn:p{i}>"));
    }
    vocab
}

fn context(index: Arc<PatternIndex>, vocab: MapVocabulary) -> ExecutionContext {
    ExecutionContext::new(
        index,
        Arc::new(vocab),
        Arc::new(ResultCache::new(50, 0)),
        inputlayer::execution::QueryTimeout::infinite(),
        Arc::new(inputlayer::execution::MemoryTracker::new(
            inputlayer::execution::ResourceLimits::unlimited(),
        )),
    )
}

#[test]
fn scenario_free_s_with_bound_predicate_3() {
    let index = Arc::new(PatternIndex::new(full_fixture(), full_fixture()));
    let ctx = context(index.clone(), vocab_with_predicate_ids());
    let scan = HasPredicateScan::free_s(index, Role::Subject, "?s", "<urn:p3>");
    let (result, _) = scan.get_result(&ctx).unwrap();
    let ids: Vec<u64> = result.rows().iter().map(|r| r[0]).collect();
    assert_eq!(ids, vec![0, 1, 3, 4, 5, 6, 8]);
    assert_eq!(result.size(), 7);
}

#[test]
fn scenario_free_o_with_bound_subject_3() {
    let index = Arc::new(PatternIndex::new(full_fixture(), full_fixture()));
    let mut vocab = vocab_with_predicate_ids();
    vocab.insert(3, "<urn:s3>");
    let ctx = context(index.clone(), vocab);
    let scan = HasPredicateScan::free_o(index, Role::Subject, "?o", "<urn:s3>");
    let (result, _) = scan.get_result(&ctx).unwrap();
    let preds: Vec<u64> = result.rows().iter().map(|r| r[0]).collect();
    assert_eq!(preds, vec![1, 3, 4, 2, 0]);
}

#[test]
fn scenario_free_o_with_bound_subject_6() {
    let index = Arc::new(PatternIndex::new(full_fixture(), full_fixture()));
    let mut vocab = vocab_with_predicate_ids();
    vocab.insert(6, "<urn:s6>");
    let ctx = context(index.clone(), vocab);
    let scan = HasPredicateScan::free_o(index, Role::Subject, "?o", "<urn:s6>");
    let (result, _) = scan.get_result(&ctx).unwrap();
    let preds: Vec<u64> = result.rows().iter().map(|r| r[0]).collect();
    assert_eq!(preds, vec![3, 4]);
}

#[test]
fn scenario_full_scan_truncated_has_predicate() {
    let index = Arc::new(PatternIndex::new(truncated_fixture(), truncated_fixture()));
    let ctx = context(index.clone(), vocab_with_predicate_ids());
    let scan = HasPredicateScan::full_scan(index, Role::Subject, "?s", "?p");
    let (result, _) = scan.get_result(&ctx).unwrap();
    assert_eq!(result.size(), 16);
    let col0: Vec<u64> = result.rows().iter().take(5).map(|r| r[0]).collect();
    let col1: Vec<u64> = result.rows().iter().take(5).map(|r| r[1]).collect();
    assert_eq!(col0, vec![0, 0, 0, 1, 1]);
    assert_eq!(col1, vec![0, 2, 3, 0, 3]);
}

#[test]
fn scenario_subquery_s_stops_at_first_out_of_range_join_id() {
    let index = Arc::new(PatternIndex::new(full_fixture(), full_fixture()));
    let ctx = context(index.clone(), vocab_with_predicate_ids());

    let mut input = ResultTable::new(2);
    for i in 0u64..10 {
        input.push_row(vec![10 - i, 2 * i]);
    }
    let values = Values::with_variables(input, [("?a".to_string(), 0), ("?b".to_string(), 1)].into());
    let scan = HasPredicateScan::subquery_s(index, Role::Subject, "?p", Arc::new(values), 1);
    let (result, _) = scan.get_result(&ctx).unwrap();

    assert_eq!(result.size(), 10);
    let inherited: Vec<(u64, u64)> = result.rows().iter().map(|r| (r[0], r[1])).collect();
    assert_eq!(
        inherited,
        vec![
            (10, 0),
            (10, 0),
            (10, 0),
            (9, 2),
            (8, 4),
            (8, 4),
            (8, 4),
            (7, 6),
            (7, 6),
            (6, 8),
        ]
    );
    let predicate_col: Vec<u64> = result.rows().iter().map(|r| r[2]).collect();
    assert_eq!(predicate_col, vec![0, 2, 3, 0, 0, 2, 3, 3, 4, 3]);
}

#[test]
fn scenario_pattern_trick_sums_to_full_has_predicate_size() {
    let role = full_fixture();
    let mut total = 0u64;
    for e in 0..role.has_pattern.len().max(role.has_predicate.num_rows()) {
        total += match role.pattern_of(e as u64) {
            Some(pattern_id) => role.patterns.row(pattern_id as usize).len() as u64,
            None => role.has_predicate.row(e).len() as u64,
        };
    }
    assert_eq!(total, role.metadata.full_has_predicate_size);
}
