use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use inputlayer::compact::ragged_table::CompactRaggedTable;
use inputlayer::compact::IdWidth;
use inputlayer::operation::cache::ResultCache;
use inputlayer::pattern_index::{PatternIndex, PatternMetaData, RoleData, NO_PATTERN};
use inputlayer::scan::HasPredicateScan;
use inputlayer::vocabulary::MapVocabulary;
use inputlayer::{ExecutionContext, Operation, Role};
use std::sync::Arc;

fn synthetic_role(num_entities: usize, predicates_per_entity: usize) -> RoleData {
    let has_pattern = vec![NO_PATTERN; num_entities];
    let rows: Vec<Vec<u64>> = (0..num_entities)
        .map(|e| {
            (0..predicates_per_entity)
                .map(|p| ((e + p) % predicates_per_entity) as u64)
                .collect()
        })
        .collect();
    let has_predicate = CompactRaggedTable::build(IdWidth::W2, rows);
    let patterns = CompactRaggedTable::build(IdWidth::W2, Vec::<Vec<u64>>::new());
    let predicate_global_ids: Vec<u64> = (0..predicates_per_entity as u64).collect();
    RoleData {
        has_pattern,
        has_predicate,
        patterns,
        predicate_global_ids,
        metadata: PatternMetaData {
            full_has_predicate_size: (num_entities * predicates_per_entity) as u64,
            full_has_predicate_multiplicity_entities: 1.0,
            full_has_predicate_multiplicity_predicates: predicates_per_entity as f64,
        },
    }
}

fn bench_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("has_predicate_scan_full_scan");
    for &size in &[1_000usize, 10_000, 100_000] {
        let index = Arc::new(PatternIndex::new(synthetic_role(size, 8), synthetic_role(size, 8)));
        let vocab = Arc::new(MapVocabulary::new());
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let ctx = ExecutionContext::new(
                    index.clone(),
                    vocab.clone(),
                    Arc::new(ResultCache::new(1, 0)),
                    inputlayer::execution::QueryTimeout::infinite(),
                    Arc::new(inputlayer::execution::MemoryTracker::new(
                        inputlayer::execution::ResourceLimits::unlimited(),
                    )),
                );
                let scan = HasPredicateScan::full_scan(index.clone(), Role::Subject, "?s", "?p");
                scan.get_result(&ctx).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_full_scan);
criterion_main!(benches);
