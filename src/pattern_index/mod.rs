//! Pattern Index
//!
//! Owns, per role (subject / object), a `hasPattern[]` vector, a fallback
//! per-entity predicate table, the shared pattern dictionary, the
//! local-to-global predicate translation table, and a metadata record.
//! See `SPEC_FULL.md` §4.3 for the rationale (deduplicating dense predicate
//! sets across millions of entities) and §6 for the on-disk layout this
//! module reads.

pub mod builder;
pub mod io;

use crate::compact::ragged_table::CompactRaggedTable;
use crate::compact::IdWidth;

/// Sentinel stored in `hasPattern[e]` for entities that fall back to the
/// per-entity `hasPredicate` table.
pub const NO_PATTERN: u32 = 0xFFFF_FFFF;

/// Which side of a triple an entity occupies; subject and object patterns
/// are indexed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Subject,
    Object,
}

impl Role {
    pub fn as_tag(self) -> u16 {
        match self {
            Role::Subject => 0,
            Role::Object => 1,
        }
    }

    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(Role::Subject),
            1 => Some(Role::Object),
            _ => None,
        }
    }
}

/// Expected distinct-entity and distinct-predicate counts per role, used
/// by the scan operator's cost and size estimators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternMetaData {
    /// Total number of (entity, predicate) pairs this role's scan would
    /// emit in a full scan.
    pub full_has_predicate_size: u64,
    /// Expected number of distinct entities per distinct predicate.
    pub full_has_predicate_multiplicity_entities: f64,
    /// Expected number of distinct predicates per entity.
    pub full_has_predicate_multiplicity_predicates: f64,
}

/// The four tables that make up one role's half of the pattern index.
#[derive(Debug, Clone)]
pub struct RoleData {
    /// `hasPattern[e] -> pattern id, or NO_PATTERN`.
    pub has_pattern: Vec<u32>,
    /// Fallback per-entity predicate lists for entities with `NO_PATTERN`.
    pub has_predicate: CompactRaggedTable,
    /// Shared dictionary of deduplicated predicate-id sequences.
    pub patterns: CompactRaggedTable,
    /// `predicateGlobalIds[local] -> global vocabulary id`.
    pub predicate_global_ids: Vec<u64>,
    pub metadata: PatternMetaData,
}

impl RoleData {
    /// Width of the local predicate ids stored in `patterns`/`has_predicate`,
    /// i.e. the smallest width fitting `predicate_global_ids.len()`.
    pub fn predicate_id_width(&self) -> IdWidth {
        self.patterns.data_width()
    }

    pub fn pattern_of(&self, entity: u64) -> Option<u32> {
        let idx = usize::try_from(entity).ok()?;
        self.has_pattern.get(idx).copied().filter(|p| *p != NO_PATTERN)
    }
}

/// The full dual (subject, object) pattern index, loaded read-only from
/// disk and shared by every query that touches a has-predicate scan.
#[derive(Debug, Clone)]
pub struct PatternIndex {
    subject: RoleData,
    object: RoleData,
}

impl PatternIndex {
    pub fn new(subject: RoleData, object: RoleData) -> Self {
        PatternIndex { subject, object }
    }

    pub fn subject_data(&self) -> &RoleData {
        &self.subject
    }

    pub fn object_data(&self) -> &RoleData {
        &self.object
    }

    pub fn data(&self, role: Role) -> &RoleData {
        match role {
            Role::Subject => &self.subject,
            Role::Object => &self.object,
        }
    }

    /// The narrower of the two roles' predicate-id widths is not
    /// meaningful on its own; callers ask a specific role. Exposed here
    /// for parity with the specification's single accessor, returning the
    /// subject role's width (the common case queries dispatch on).
    pub fn predicate_id_width(&self) -> IdWidth {
        self.subject.predicate_id_width()
    }
}

#[cfg(test)]
pub mod fixture {
    //! The concrete fixture from §8 of the specification, reused by the
    //! scan operator's tests and the integration test in `tests/`.
    use super::*;
    use crate::compact::ragged_table::CompactRaggedTable;
    use crate::compact::IdWidth;

    pub fn subject_fixture() -> RoleData {
        let has_pattern = vec![0u32, NO_PATTERN, NO_PATTERN, 1, 0];
        let has_predicate_rows: Vec<Vec<u64>> = vec![
            vec![],
            vec![0, 3],
            vec![0],
            vec![],
            vec![],
            vec![0, 3],
            vec![3, 4],
            vec![2, 4],
            vec![3],
        ];
        let has_predicate = CompactRaggedTable::build(IdWidth::W1, has_predicate_rows);
        let patterns = CompactRaggedTable::build(
            IdWidth::W1,
            vec![vec![0u64, 2, 3], vec![1, 3, 4, 2, 0]],
        );
        let predicate_global_ids: Vec<u64> = (0..5).collect();
        RoleData {
            has_pattern,
            has_predicate,
            patterns,
            predicate_global_ids,
            metadata: PatternMetaData {
                full_has_predicate_size: 21,
                full_has_predicate_multiplicity_entities: 1.0,
                full_has_predicate_multiplicity_predicates: 1.0,
            },
        }
    }
}
