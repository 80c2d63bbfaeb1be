//! In-memory Pattern Index builder.
//!
//! The real ingestion pipeline (merge-sorting partial vocabularies,
//! constructing the prefix-compression codebook, the external sort scratch
//! files used to assign pattern ids at index-build time) is the external
//! collaborator named in §1/§6 of the specification and is out of scope
//! here. This builder is the minimal in-core counterpart used by tests and
//! benchmarks: given each entity's predicate set, it promotes the most
//! frequent sets to shared patterns and lets every other entity fall back
//! to `hasPredicate`, exactly the policy §4.3 describes without dictating
//! an implementation.

use super::{PatternMetaData, RoleData, NO_PATTERN};
use crate::compact::ragged_table::CompactRaggedTable;
use crate::compact::IdWidth;
use std::collections::HashMap;

/// Build a `RoleData` from one entity's local predicate-id set per row.
/// `max_patterns` bounds how many distinct sets get promoted to the shared
/// dictionary; the rest remain in the per-entity fallback table.
pub fn build_role_data(
    entity_predicates: &[Vec<u64>],
    predicate_global_ids: Vec<u64>,
    max_patterns: usize,
) -> RoleData {
    let width = IdWidth::smallest_for_cardinality(predicate_global_ids.len() as u64);

    let mut counts: HashMap<Vec<u64>, usize> = HashMap::new();
    for preds in entity_predicates {
        if preds.is_empty() {
            continue;
        }
        *counts.entry(preds.clone()).or_insert(0) += 1;
    }

    let mut by_frequency: Vec<(Vec<u64>, usize)> = counts.into_iter().collect();
    by_frequency.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    by_frequency.truncate(max_patterns);

    let pattern_id_of: HashMap<Vec<u64>, u32> = by_frequency
        .iter()
        .enumerate()
        .map(|(i, (set, _))| (set.clone(), i as u32))
        .collect();

    let patterns = CompactRaggedTable::build(
        width,
        by_frequency.into_iter().map(|(set, _)| set),
    );

    let mut has_pattern = Vec::with_capacity(entity_predicates.len());
    let mut fallback_rows: Vec<Vec<u64>> = Vec::new();
    let mut total = 0u64;
    for preds in entity_predicates {
        total += preds.len() as u64;
        match pattern_id_of.get(preds) {
            Some(pid) => {
                has_pattern.push(*pid);
                fallback_rows.push(Vec::new());
            }
            None => {
                has_pattern.push(NO_PATTERN);
                fallback_rows.push(preds.clone());
            }
        }
    }
    let has_predicate = CompactRaggedTable::build(width, fallback_rows);

    let num_entities = entity_predicates.len().max(1) as f64;
    let distinct_predicates = predicate_global_ids.len().max(1) as f64;
    RoleData {
        has_pattern,
        has_predicate,
        patterns,
        predicate_global_ids,
        metadata: PatternMetaData {
            full_has_predicate_size: total,
            full_has_predicate_multiplicity_entities: num_entities / distinct_predicates.max(1.0),
            full_has_predicate_multiplicity_predicates: total as f64 / num_entities,
        },
    }
}
