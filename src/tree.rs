//! Execution tree leaves beyond the has-predicate scan.
//!
//! `Values` holds an already-materialised result and contributes it as a
//! bound upstream subresult, grounded on
//! `original_source/src/engine/Values.h`: a leaf with no children whose
//! `compute_result` just returns its fixed table.

use crate::error::Result;
use crate::operation::result_table::ResultTable;
use crate::operation::{ExecutionContext, Operation};
use std::collections::HashMap;
use std::sync::Arc;

pub struct Values {
    table: ResultTable,
    variable_columns: HashMap<String, usize>,
    multiplicities: Vec<f64>,
}

impl Values {
    /// Wrap a pre-built table as a leaf operator, binding `subject_var` to
    /// `subject_col` so a `HasPredicateScan::subquery_s` built on top of it
    /// can find its join column by name.
    pub fn new(table: ResultTable, subject_col: usize) -> Self {
        Self::with_variables(table, [("?s".to_string(), subject_col)].into())
    }

    pub fn with_variables(table: ResultTable, variable_columns: HashMap<String, usize>) -> Self {
        let multiplicities = compute_multiplicities(&table);
        Values {
            table,
            variable_columns,
            multiplicities,
        }
    }
}

fn compute_multiplicities(table: &ResultTable) -> Vec<f64> {
    (0..table.cols())
        .map(|col| {
            if table.is_empty() {
                return 1.0;
            }
            let mut distinct = std::collections::HashSet::new();
            for row in table.rows() {
                distinct.insert(row[col]);
            }
            table.size() as f64 / distinct.len() as f64
        })
        .collect()
}

impl Operation for Values {
    fn descriptor(&self) -> String {
        "Values".to_string()
    }

    fn normal_form(&self) -> String {
        format!("VALUES:{}x{}:{:?}", self.table.size(), self.table.cols(), self.table.rows())
    }

    fn result_width(&self) -> usize {
        self.table.cols()
    }

    fn result_sorted_on(&self) -> Vec<usize> {
        self.table.sorted_by().to_vec()
    }

    fn variable_columns(&self) -> &HashMap<String, usize> {
        &self.variable_columns
    }

    fn known_empty_result(&self) -> bool {
        self.variable_columns.is_empty() || self.table.is_empty()
    }

    fn children(&self) -> Vec<Arc<dyn Operation>> {
        vec![]
    }

    fn multiplicity(&self, col: usize) -> f64 {
        self.multiplicities.get(col).copied().unwrap_or(1.0)
    }

    fn size_estimate(&self) -> u64 {
        self.table.size() as u64
    }

    fn cost_estimate(&self) -> u64 {
        self.size_estimate()
    }

    fn compute_result(&self, _ctx: &ExecutionContext) -> Result<ResultTable> {
        Ok(self.table.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{MemoryTracker, QueryTimeout, ResourceLimits};
    use crate::operation::cache::ResultCache;
    use crate::pattern_index::{fixture, PatternIndex};
    use crate::vocabulary::MapVocabulary;

    #[test]
    fn values_returns_its_fixed_table() {
        let mut table = ResultTable::new(1);
        table.push_row(vec![1]);
        table.push_row(vec![2]);
        let values = Values::new(table, 0);

        let index = Arc::new(PatternIndex::new(fixture::subject_fixture(), fixture::subject_fixture()));
        let ctx = ExecutionContext::new(
            index,
            Arc::new(MapVocabulary::new()),
            Arc::new(ResultCache::new(10, 0)),
            QueryTimeout::infinite(),
            Arc::new(MemoryTracker::new(ResourceLimits::unlimited())),
        );
        let (result, _) = values.get_result(&ctx).unwrap();
        assert_eq!(result.size(), 2);
    }
}
