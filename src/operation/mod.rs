//! Operation Framework
//!
//! The `Operation` trait every execution-tree node implements, grounded on
//! `original_source/src/engine/Operation.h`: a normal-form string identity
//! used as the cache key, a human-readable descriptor, result-shape
//! metadata (width, sortedness, variable-to-column bindings), cost/size/
//! multiplicity estimators the query planner would consult, and a private
//! `compute_result` hidden behind the caching, timeout-checked
//! `get_result`.

pub mod cache;
pub mod result_table;
pub mod runtime_info;

use crate::error::{Error, Result};
use crate::execution::{MemoryTracker, QueryTimeout};
use crate::pattern_index::PatternIndex;
use crate::vocabulary::Vocabulary;
use cache::ResultCache;
use result_table::ResultTable;
use runtime_info::RuntimeInfo;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Everything an operator needs to compute its result: the shared,
/// read-only pattern index, the vocabulary, the process-wide result cache,
/// the query's cancellation token, and its memory quota tracker (§9: one
/// context value threaded through the tree rather than ambient globals).
#[derive(Clone)]
pub struct ExecutionContext {
    pub pattern_index: Arc<PatternIndex>,
    pub vocabulary: Arc<dyn Vocabulary + Send + Sync>,
    pub cache: Arc<ResultCache>,
    pub timeout: QueryTimeout,
    pub memory: Arc<MemoryTracker>,
}

impl ExecutionContext {
    pub fn new(
        pattern_index: Arc<PatternIndex>,
        vocabulary: Arc<dyn Vocabulary + Send + Sync>,
        cache: Arc<ResultCache>,
        timeout: QueryTimeout,
        memory: Arc<MemoryTracker>,
    ) -> Self {
        ExecutionContext {
            pattern_index,
            vocabulary,
            cache,
            timeout,
            memory,
        }
    }
}

/// A node in a query execution tree.
///
/// `get_result` is the only entry point callers use; `compute_result` is
/// the operator-specific work it wraps with caching and a timeout check.
/// Implementors should perform their own periodic `ctx.timeout.check()`
/// calls inside `compute_result` at natural loop boundaries (§5) rather
/// than relying solely on the check `get_result` performs before starting.
pub trait Operation: Send + Sync {
    /// Short, stable, human-readable description of this node alone (not
    /// its subtree), e.g. `"HAS_PREDICATE_SCAN with O = <urn:knows>"`.
    fn descriptor(&self) -> String;

    /// Cache key: uniquely identifies this operator and its full subtree
    /// by value, so two structurally identical trees share one cache slot
    /// regardless of object identity.
    fn normal_form(&self) -> String;

    /// Number of columns `compute_result` will produce.
    fn result_width(&self) -> usize;

    /// Column indices the result is sorted on, ascending, in sort-key
    /// order. Empty if the result is unsorted.
    fn result_sorted_on(&self) -> Vec<usize>;

    /// Variable name to result-column-index bindings visible above this
    /// operator.
    fn variable_columns(&self) -> &HashMap<String, usize>;

    fn cost_estimate(&self) -> u64;
    fn size_estimate(&self) -> u64;
    fn multiplicity(&self, column: usize) -> f64;

    /// `true` if the result is known to be empty without materialising it
    /// (e.g. a Free-S scan whose bound predicate is not in the
    /// vocabulary).
    fn known_empty_result(&self) -> bool;

    /// Child nodes, e.g. the bound subtree a Subquery-S scan joins
    /// against. Empty for leaf operators.
    fn children(&self) -> Vec<Arc<dyn Operation>>;

    /// Operator-specific computation. Not called directly by consumers;
    /// go through `get_result`, which caches and times it.
    fn compute_result(&self, ctx: &ExecutionContext) -> Result<ResultTable>;

    /// Propagate a text-snippet length limit down the tree. A no-op for
    /// operators that do not themselves consult it; the default forwards
    /// to every child so a planner can call it uniformly on the root
    /// without matching on node type.
    fn set_text_limit(&self, limit: usize) {
        for child in self.children() {
            child.set_text_limit(limit);
        }
    }

    /// Render this node and its subtree as an indented tree, for
    /// diagnostics.
    fn as_string(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        let mut s = format!("{pad}{}", self.descriptor());
        for child in self.children() {
            s.push('\n');
            s.push_str(&child.as_string(indent + 2));
        }
        s
    }

    /// Compute (or fetch from cache) this operator's result, recursing
    /// into children to build a matching `RuntimeInfo` tree.
    fn get_result(&self, ctx: &ExecutionContext) -> Result<(Arc<ResultTable>, RuntimeInfo)> {
        let node = self.descriptor();
        ctx.timeout.check().map_err(|_| {
            tracing::warn!(node = %node, "query cancelled before get_result could run");
            Error::timeout(node.clone())
        })?;

        if self.known_empty_result() {
            let empty = Arc::new(ResultTable::new(self.result_width()));
            let info = RuntimeInfo::new(node).with_result(0, self.result_width(), std::time::Duration::ZERO);
            return Ok((empty, info));
        }

        let start = Instant::now();
        let key = self.normal_form();
        let result = ctx.cache.get_or_compute(&key, || self.compute_result(ctx))?;
        let elapsed = start.elapsed();

        let mut info = RuntimeInfo::new(node).with_result(result.size(), result.cols(), elapsed);
        for child in self.children() {
            let (_, child_info) = child.get_result(ctx)?;
            info.add_child(child_info);
        }
        Ok((result, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{MemoryTracker, QueryTimeout, ResourceLimits};
    use crate::pattern_index::{PatternIndex, fixture};
    use crate::vocabulary::MapVocabulary;

    struct ConstOp {
        width: usize,
        rows: Vec<Vec<u64>>,
    }

    impl Operation for ConstOp {
        fn descriptor(&self) -> String {
            "CONST".to_string()
        }
        fn normal_form(&self) -> String {
            format!("CONST({}x{})", self.rows.len(), self.width)
        }
        fn result_width(&self) -> usize {
            self.width
        }
        fn result_sorted_on(&self) -> Vec<usize> {
            vec![]
        }
        fn variable_columns(&self) -> &HashMap<String, usize> {
            static EMPTY: std::sync::OnceLock<HashMap<String, usize>> = std::sync::OnceLock::new();
            EMPTY.get_or_init(HashMap::new)
        }
        fn cost_estimate(&self) -> u64 {
            self.rows.len() as u64
        }
        fn size_estimate(&self) -> u64 {
            self.rows.len() as u64
        }
        fn multiplicity(&self, _column: usize) -> f64 {
            1.0
        }
        fn known_empty_result(&self) -> bool {
            self.rows.is_empty()
        }
        fn children(&self) -> Vec<Arc<dyn Operation>> {
            vec![]
        }
        fn compute_result(&self, _ctx: &ExecutionContext) -> Result<ResultTable> {
            let mut table = ResultTable::new(self.width);
            for row in &self.rows {
                table.push_row(row.clone());
            }
            Ok(table)
        }
    }

    fn test_context() -> ExecutionContext {
        let index = PatternIndex::new(fixture::subject_fixture(), fixture::subject_fixture());
        ExecutionContext::new(
            Arc::new(index),
            Arc::new(MapVocabulary::new()),
            Arc::new(ResultCache::new(10, 0)),
            QueryTimeout::infinite(),
            Arc::new(MemoryTracker::new(ResourceLimits::unlimited())),
        )
    }

    #[test]
    fn get_result_caches_and_builds_runtime_info() {
        let ctx = test_context();
        let op = ConstOp {
            width: 1,
            rows: vec![vec![1], vec![2]],
        };
        let (result, info) = op.get_result(&ctx).unwrap();
        assert_eq!(result.size(), 2);
        assert_eq!(info.rows_produced, 2);
        assert!(info.children.is_empty());
    }

    #[test]
    fn known_empty_result_short_circuits() {
        let ctx = test_context();
        let op = ConstOp {
            width: 1,
            rows: vec![],
        };
        let (result, info) = op.get_result(&ctx).unwrap();
        assert!(result.is_empty());
        assert_eq!(info.rows_produced, 0);
    }
}
