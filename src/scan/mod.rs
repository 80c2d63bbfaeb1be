//! Has-Predicate Scan Operator
//!
//! Reads the pattern index to answer "which predicates does this subject
//! (or object) have" and its inverse, in four modes, grounded on
//! `original_source/src/engine/HasPredicateScan.cpp`:
//!
//! - `FreeS` — the predicate-position term is bound, subject is free.
//!   Scans every entity and keeps the ones whose predicate set contains
//!   the bound term.
//! - `FreeO` — the subject-position term is bound, predicate is free.
//!   Looks up one entity's predicate set directly.
//! - `FullScan` — no bound term; emits every (entity, predicate) pair.
//! - `SubqueryS` — the free-subject form joined against a bound upstream
//!   column: for each row of a child operator's result, expands that
//!   row's subject into one output row per predicate it has.
//!
//! Unlike the original, which instantiates a template per on-disk
//! predicate-id width for performance, `CompactIdVector` already hides
//! the storage width behind `get(i) -> u64`, so there is nothing left for
//! this module to dispatch on; the width only matters when the pattern
//! index is built or loaded (`compact::IdWidth`).

use crate::compact::ragged_table::RowView;
use crate::error::{Error, Result};
use crate::operation::result_table::ResultTable;
use crate::operation::{ExecutionContext, Operation};
use crate::pattern_index::{PatternIndex, Role, RoleData};
use std::collections::HashMap;
use std::sync::Arc;

/// Which of the four algorithms a scan runs, and the inputs specific to
/// it.
pub enum ScanMode {
    /// Free subject, object bound to a lexical term.
    FreeS { bound_object: String },
    /// Free object, subject bound to a lexical term.
    FreeO { bound_subject: String },
    /// No bound term.
    FullScan,
    /// Free subject expanded against a bound column of a child operator's
    /// result.
    SubqueryS {
        subtree: Arc<dyn Operation>,
        subtree_col_index: usize,
    },
}

/// The has-predicate scan, in one of its four modes, over one role
/// (subject or object) of the pattern index.
pub struct HasPredicateScan {
    pattern_index: Arc<PatternIndex>,
    role: Role,
    mode: ScanMode,
    subject_var: String,
    object_var: String,
    variable_columns: HashMap<String, usize>,
}

const TIMEOUT_CHECK_INTERVAL: usize = 4096;

impl HasPredicateScan {
    pub fn free_s(
        pattern_index: Arc<PatternIndex>,
        role: Role,
        subject_var: impl Into<String>,
        bound_object: impl Into<String>,
    ) -> Self {
        let subject_var = subject_var.into();
        let mut variable_columns = HashMap::new();
        variable_columns.insert(subject_var.clone(), 0);
        HasPredicateScan {
            pattern_index,
            role,
            mode: ScanMode::FreeS {
                bound_object: bound_object.into(),
            },
            subject_var,
            object_var: String::new(),
            variable_columns,
        }
    }

    pub fn free_o(
        pattern_index: Arc<PatternIndex>,
        role: Role,
        object_var: impl Into<String>,
        bound_subject: impl Into<String>,
    ) -> Self {
        let object_var = object_var.into();
        let mut variable_columns = HashMap::new();
        variable_columns.insert(object_var.clone(), 0);
        HasPredicateScan {
            pattern_index,
            role,
            mode: ScanMode::FreeO {
                bound_subject: bound_subject.into(),
            },
            subject_var: String::new(),
            object_var,
            variable_columns,
        }
    }

    pub fn full_scan(
        pattern_index: Arc<PatternIndex>,
        role: Role,
        subject_var: impl Into<String>,
        object_var: impl Into<String>,
    ) -> Self {
        let subject_var = subject_var.into();
        let object_var = object_var.into();
        let mut variable_columns = HashMap::new();
        variable_columns.insert(subject_var.clone(), 0);
        variable_columns.insert(object_var.clone(), 1);
        HasPredicateScan {
            pattern_index,
            role,
            mode: ScanMode::FullScan,
            subject_var,
            object_var,
            variable_columns,
        }
    }

    pub fn subquery_s(
        pattern_index: Arc<PatternIndex>,
        role: Role,
        object_var: impl Into<String>,
        subtree: Arc<dyn Operation>,
        subtree_col_index: usize,
    ) -> Self {
        let object_var = object_var.into();
        let mut variable_columns = subtree.variable_columns().clone();
        let result_width = subtree.result_width() + 1;
        variable_columns.insert(object_var.clone(), result_width - 1);
        HasPredicateScan {
            pattern_index,
            role,
            mode: ScanMode::SubqueryS {
                subtree,
                subtree_col_index,
            },
            subject_var: String::new(),
            object_var,
            variable_columns,
        }
    }

    fn role_data(&self) -> &RoleData {
        self.pattern_index.data(self.role)
    }

    fn prefix(&self) -> &'static str {
        match self.role {
            Role::Object => "Object",
            Role::Subject => "",
        }
    }
}

/// The outcome of resolving one entity id against a role's pattern data.
enum Lookup {
    /// `id` has a predicate set, either a shared pattern or the per-entity
    /// fallback; the global predicate ids are returned in order.
    Found(Vec<u64>),
    /// `id` is in range but has no recorded predicates.
    Empty,
    /// `id` is past both the pattern table and the fallback table.
    OutOfRange,
}

fn lookup_entity(role: &RoleData, id: usize) -> Lookup {
    if id < role.has_pattern.len() {
        if let Some(pattern_id) = role.pattern_of(id as u64) {
            let row = role.patterns.row(pattern_id as usize);
            return Lookup::Found(globals_of(role, &row));
        }
    }
    if id < role.has_predicate.num_rows() {
        let row = role.has_predicate.row(id);
        return Lookup::Found(globals_of(role, &row));
    }
    if id >= role.has_pattern.len() {
        Lookup::OutOfRange
    } else {
        Lookup::Empty
    }
}

fn globals_of(role: &RoleData, row: &RowView<'_>) -> Vec<u64> {
    row.iter()
        .map(|local| role.predicate_global_ids[local as usize])
        .collect()
}

fn entity_count(role: &RoleData) -> usize {
    role.has_pattern.len().max(role.has_predicate.num_rows())
}

fn compute_free_s(
    role: &RoleData,
    bound_object_id: u64,
    ctx: &ExecutionContext,
    node: &str,
) -> Result<ResultTable> {
    let mut table = ResultTable::new(1).with_sorted_by(vec![]);
    for id in 0..entity_count(role) {
        if id % TIMEOUT_CHECK_INTERVAL == 0 {
            ctx.timeout.check().map_err(|_| Error::timeout(node))?;
        }
        if let Lookup::Found(predicates) = lookup_entity(role, id) {
            if predicates.contains(&bound_object_id) {
                table.reserve(node, 1, &ctx.memory)?;
                table.push_row(vec![id as u64]);
            }
        }
    }
    Ok(table)
}

fn compute_free_o(
    role: &RoleData,
    bound_subject_id: u64,
    ctx: &ExecutionContext,
    node: &str,
) -> Result<ResultTable> {
    let mut table = ResultTable::new(1).with_sorted_by(vec![0]);
    if let Lookup::Found(predicates) = lookup_entity(role, bound_subject_id as usize) {
        table.reserve(node, predicates.len(), &ctx.memory)?;
        for p in predicates {
            table.push_row(vec![p]);
        }
    }
    Ok(table)
}

fn compute_full_scan(role: &RoleData, ctx: &ExecutionContext, node: &str) -> Result<ResultTable> {
    use rayon::prelude::*;

    let mut table = ResultTable::new(2).with_sorted_by(vec![0]);
    table.reserve(node, role.metadata.full_has_predicate_size as usize, &ctx.memory)?;

    let n = entity_count(role);
    let chunk_size = TIMEOUT_CHECK_INTERVAL;
    let ids: Vec<usize> = (0..n).collect();
    // Chunked so the cancellation token is checked once per chunk rather than
    // once per entity; chunks are processed in parallel but `par_chunks` +
    // `collect` preserves chunk order, so the scan's `resultSortedOn() == {0}`
    // contract holds.
    let chunks: Result<Vec<Vec<(u64, u64)>>> = ids
        .par_chunks(chunk_size)
        .map(|chunk| -> Result<Vec<(u64, u64)>> {
            ctx.timeout.check().map_err(|_| Error::timeout(node))?;
            let mut rows = Vec::new();
            for &id in chunk {
                if let Lookup::Found(predicates) = lookup_entity(role, id) {
                    for p in predicates {
                        rows.push((id as u64, p));
                    }
                }
            }
            Ok(rows)
        })
        .collect();

    for (id, p) in chunks?.into_iter().flatten() {
        table.push_row(vec![id, p]);
    }
    Ok(table)
}

fn compute_subquery_s(
    role: &RoleData,
    input: &ResultTable,
    subtree_col_index: usize,
    out_width: usize,
    ctx: &ExecutionContext,
    node: &str,
) -> Result<ResultTable> {
    let mut table = ResultTable::new(out_width).with_sorted_by(input.sorted_by().to_vec());
    for (i, row) in input.rows().iter().enumerate() {
        if i % TIMEOUT_CHECK_INTERVAL == 0 {
            ctx.timeout.check().map_err(|_| Error::timeout(node))?;
        }
        let id = row[subtree_col_index];
        match lookup_entity(role, id as usize) {
            Lookup::Found(predicates) => {
                table.reserve(node, predicates.len(), &ctx.memory)?;
                for p in predicates {
                    let mut out_row = row.clone();
                    out_row.push(p);
                    table.push_row(out_row);
                }
            }
            // Inputs are expected sorted ascending on `subtree_col_index`
            // (documented precondition): once an id falls past both the
            // pattern table and the fallback table, every later row's id
            // will too, so scanning can stop.
            Lookup::OutOfRange => break,
            Lookup::Empty => {}
        }
    }
    Ok(table)
}

impl Operation for HasPredicateScan {
    fn descriptor(&self) -> String {
        let prefix = self.prefix();
        match &self.mode {
            ScanMode::FreeS { .. } => format!("{prefix}HasPredicateScan free subject: {}", self.subject_var),
            ScanMode::FreeO { .. } => format!("{prefix}HasPredicateScan free object: {}", self.object_var),
            ScanMode::FullScan => format!("{prefix}HasPredicateScan full scan"),
            ScanMode::SubqueryS { .. } => {
                format!("{prefix}HasPredicateScan with a subquery on {}", self.subject_var)
            }
        }
    }

    fn normal_form(&self) -> String {
        let prefix = self.prefix();
        match &self.mode {
            ScanMode::FreeS { bound_object } => format!("{prefix}SCAN-FREE-S O={bound_object}"),
            ScanMode::FreeO { bound_subject } => format!("{prefix}SCAN-FREE-O S={bound_subject}"),
            ScanMode::FullScan => format!("{prefix}SCAN-FULL"),
            ScanMode::SubqueryS {
                subtree,
                subtree_col_index,
            } => format!(
                "{prefix}SCAN-SUBQUERY-S col={subtree_col_index} subtree=({})",
                subtree.normal_form()
            ),
        }
    }

    fn result_width(&self) -> usize {
        match &self.mode {
            ScanMode::FreeS { .. } | ScanMode::FreeO { .. } => 1,
            ScanMode::FullScan => 2,
            ScanMode::SubqueryS { subtree, .. } => subtree.result_width() + 1,
        }
    }

    fn result_sorted_on(&self) -> Vec<usize> {
        match &self.mode {
            ScanMode::FreeS { .. } => vec![],
            ScanMode::FreeO { .. } => vec![0],
            ScanMode::FullScan => vec![0],
            ScanMode::SubqueryS { subtree, .. } => subtree.result_sorted_on(),
        }
    }

    fn variable_columns(&self) -> &HashMap<String, usize> {
        &self.variable_columns
    }

    fn known_empty_result(&self) -> bool {
        match &self.mode {
            ScanMode::SubqueryS { subtree, .. } => subtree.known_empty_result(),
            _ => false,
        }
    }

    fn children(&self) -> Vec<Arc<dyn Operation>> {
        match &self.mode {
            ScanMode::SubqueryS { subtree, .. } => vec![subtree.clone()],
            _ => vec![],
        }
    }

    fn multiplicity(&self, col: usize) -> f64 {
        let metadata = self.role_data().metadata;
        match &self.mode {
            ScanMode::FreeS { .. } => {
                if col == 0 {
                    metadata.full_has_predicate_multiplicity_entities
                } else {
                    1.0
                }
            }
            ScanMode::FreeO { .. } => {
                if col == 0 {
                    metadata.full_has_predicate_multiplicity_predicates
                } else {
                    1.0
                }
            }
            ScanMode::FullScan => match col {
                0 => metadata.full_has_predicate_multiplicity_entities,
                1 => metadata.full_has_predicate_multiplicity_predicates,
                _ => 1.0,
            },
            ScanMode::SubqueryS {
                subtree,
                subtree_col_index,
            } => {
                let width = self.result_width();
                if col < width - 1 {
                    subtree.multiplicity(col) * metadata.full_has_predicate_multiplicity_predicates
                } else {
                    subtree.multiplicity(*subtree_col_index)
                        * metadata.full_has_predicate_multiplicity_predicates
                }
            }
        }
    }

    fn size_estimate(&self) -> u64 {
        let metadata = self.role_data().metadata;
        match &self.mode {
            ScanMode::FreeS { .. } => metadata.full_has_predicate_multiplicity_entities as u64,
            ScanMode::FreeO { .. } => metadata.full_has_predicate_multiplicity_predicates as u64,
            ScanMode::FullScan => metadata.full_has_predicate_size,
            ScanMode::SubqueryS {
                subtree,
                subtree_col_index,
            } => {
                let subtree_multiplicity = subtree.multiplicity(*subtree_col_index);
                let nof_distinct_left =
                    ((subtree.size_estimate() as f64 / subtree_multiplicity) as u64).max(1);
                let nof_distinct_right = ((metadata.full_has_predicate_size as f64
                    / metadata.full_has_predicate_multiplicity_predicates)
                    as u64)
                    .max(1);
                let nof_distinct_in_result = nof_distinct_left.min(nof_distinct_right);
                let jc_multiplicity =
                    subtree_multiplicity * metadata.full_has_predicate_multiplicity_predicates;
                ((jc_multiplicity * nof_distinct_in_result as f64) as u64).max(1)
            }
        }
    }

    fn cost_estimate(&self) -> u64 {
        match &self.mode {
            ScanMode::SubqueryS { subtree, .. } => subtree.cost_estimate() + self.size_estimate(),
            _ => self.size_estimate(),
        }
    }

    fn compute_result(&self, ctx: &ExecutionContext) -> Result<ResultTable> {
        let node = self.descriptor();
        tracing::debug!(node = %node, "has_predicate_scan compute_result start");
        let started = std::time::Instant::now();
        let result = self.compute_result_inner(ctx, &node);
        match &result {
            Ok(table) => tracing::debug!(
                node = %node,
                rows = table.size(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "has_predicate_scan compute_result done"
            ),
            Err(err) => tracing::warn!(node = %node, error = %err, "has_predicate_scan compute_result failed"),
        }
        result
    }
}

impl HasPredicateScan {
    fn compute_result_inner(&self, ctx: &ExecutionContext, node: &str) -> Result<ResultTable> {
        let role = self.role_data();
        match &self.mode {
            ScanMode::FreeS { bound_object } => {
                let object_id = ctx.vocabulary.get_id(bound_object).ok_or_else(|| {
                    Error::bad_input(
                        node.to_string(),
                        format!("the term '{bound_object}' is not in the vocabulary"),
                    )
                })?;
                compute_free_s(role, object_id, ctx, node)
            }
            ScanMode::FreeO { bound_subject } => {
                let subject_id = ctx.vocabulary.get_id(bound_subject).ok_or_else(|| {
                    Error::bad_input(
                        node.to_string(),
                        format!("the term '{bound_subject}' is not in the vocabulary"),
                    )
                })?;
                compute_free_o(role, subject_id, ctx, node)
            }
            ScanMode::FullScan => compute_full_scan(role, ctx, node),
            ScanMode::SubqueryS {
                subtree,
                subtree_col_index,
            } => {
                let (subresult, _) = subtree.get_result(ctx)?;
                compute_subquery_s(role, &subresult, *subtree_col_index, self.result_width(), ctx, node)
            }
        }
    }
}
