//! On-disk Pattern Index layout (§6 of the specification).
//!
//! Two role sections (subject, then object) concatenated:
//!
//! 1. header: 1 byte width `w`, 1 byte version, 2 bytes role tag.
//! 2. `predicateGlobalIds` as `(count:u64, count * u64)`.
//! 3. `hasPattern` as `(count:u64, count * u32)`, sentinel `NO_PATTERN`.
//! 4. `hasPredicate`: a `CompactRaggedTable` (offsets block then data block).
//! 5. `patterns`: a `CompactRaggedTable`.
//! 6. metadata: `fullHasPredicateSize:u64`, two `f64` multiplicities.
//!
//! Readers reject any width or version byte they don't recognise, and a
//! header width that disagrees with the `patterns` table actually stored
//! after it, with `Error::BadInput`/`Error::IndexCorruption`; queries never
//! mutate this structure after load.

use super::{PatternIndex, PatternMetaData, Role, RoleData, NO_PATTERN};
use crate::compact::ragged_table::CompactRaggedTable;
use crate::compact::IdWidth;
use crate::error::{Error, Result};
use std::path::Path;

const CURRENT_VERSION: u8 = 1;

pub fn save(index: &PatternIndex, path: impl AsRef<Path>) -> Result<()> {
    let mut buf = Vec::new();
    write_role(&mut buf, Role::Subject, index.subject_data());
    write_role(&mut buf, Role::Object, index.object_data());
    std::fs::write(path, &buf).map_err(|e| Error::index_corruption(format!("write failed: {e}")))
}

pub fn load(path: impl AsRef<Path>) -> Result<PatternIndex> {
    let buf = std::fs::read(path).map_err(|e| Error::index_corruption(format!("read failed: {e}")))?;
    let mut pos = 0usize;
    let (role_a, data_a) = read_role(&buf, &mut pos)?;
    let (role_b, data_b) = read_role(&buf, &mut pos)?;
    let (subject, object) = match (role_a, role_b) {
        (Role::Subject, Role::Object) => (data_a, data_b),
        (Role::Object, Role::Subject) => (data_b, data_a),
        _ => {
            return Err(Error::index_corruption(
                "expected one subject section and one object section",
            ))
        }
    };
    let index = PatternIndex::new(subject, object);
    validate(&index)?;
    Ok(index)
}

fn write_role(buf: &mut Vec<u8>, role: Role, data: &RoleData) {
    buf.push(data.predicate_id_width().bytes() as u8);
    buf.push(CURRENT_VERSION);
    buf.extend_from_slice(&role.as_tag().to_le_bytes());

    buf.extend_from_slice(&(data.predicate_global_ids.len() as u64).to_le_bytes());
    for id in &data.predicate_global_ids {
        buf.extend_from_slice(&id.to_le_bytes());
    }

    buf.extend_from_slice(&(data.has_pattern.len() as u64).to_le_bytes());
    for p in &data.has_pattern {
        buf.extend_from_slice(&p.to_le_bytes());
    }

    data.has_predicate.write_to(buf);
    data.patterns.write_to(buf);

    buf.extend_from_slice(&data.metadata.full_has_predicate_size.to_le_bytes());
    buf.extend_from_slice(&data.metadata.full_has_predicate_multiplicity_entities.to_le_bytes());
    buf.extend_from_slice(&data.metadata.full_has_predicate_multiplicity_predicates.to_le_bytes());
}

fn read_role(buf: &[u8], pos: &mut usize) -> Result<(Role, RoleData)> {
    let width_byte = *buf
        .get(*pos)
        .ok_or_else(|| Error::index_corruption("unexpected end of buffer reading header width"))?;
    let declared_width = IdWidth::from_byte(width_byte)?;
    *pos += 1;

    let version = *buf
        .get(*pos)
        .ok_or_else(|| Error::index_corruption("unexpected end of buffer reading header version"))?;
    if version != CURRENT_VERSION {
        return Err(Error::bad_input(
            "PatternIndex::load",
            format!("unknown on-disk version {version}, expected {CURRENT_VERSION}"),
        ));
    }
    *pos += 1;

    let tag_bytes: [u8; 2] = buf
        .get(*pos..*pos + 2)
        .ok_or_else(|| Error::index_corruption("unexpected end of buffer reading role tag"))?
        .try_into()
        .unwrap();
    let tag = u16::from_le_bytes(tag_bytes);
    let role = Role::from_tag(tag)
        .ok_or_else(|| Error::index_corruption(format!("unknown role tag {tag}")))?;
    *pos += 2;

    let count = read_u64(buf, pos)?;
    let mut predicate_global_ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        predicate_global_ids.push(read_u64(buf, pos)?);
    }

    let hp_count = read_u64(buf, pos)?;
    let mut has_pattern = Vec::with_capacity(hp_count as usize);
    for _ in 0..hp_count {
        let bytes: [u8; 4] = buf
            .get(*pos..*pos + 4)
            .ok_or_else(|| Error::index_corruption("unexpected end of buffer reading hasPattern"))?
            .try_into()
            .unwrap();
        has_pattern.push(u32::from_le_bytes(bytes));
        *pos += 4;
    }

    let has_predicate = CompactRaggedTable::read_from(buf, pos)?;
    let patterns = CompactRaggedTable::read_from(buf, pos)?;

    if patterns.data_width() != declared_width {
        return Err(Error::index_corruption(format!(
            "header declared predicate id width {:?} but patterns table was stored at {:?}",
            declared_width,
            patterns.data_width()
        )));
    }

    let full_has_predicate_size = read_u64(buf, pos)?;
    let full_has_predicate_multiplicity_entities = read_f64(buf, pos)?;
    let full_has_predicate_multiplicity_predicates = read_f64(buf, pos)?;

    let data = RoleData {
        has_pattern,
        has_predicate,
        patterns,
        predicate_global_ids,
        metadata: PatternMetaData {
            full_has_predicate_size,
            full_has_predicate_multiplicity_entities,
            full_has_predicate_multiplicity_predicates,
        },
    };
    Ok((role, data))
}

fn read_u64(buf: &[u8], pos: &mut usize) -> Result<u64> {
    let bytes: [u8; 8] = buf
        .get(*pos..*pos + 8)
        .ok_or_else(|| Error::index_corruption("unexpected end of buffer reading u64"))?
        .try_into()
        .unwrap();
    *pos += 8;
    Ok(u64::from_le_bytes(bytes))
}

fn read_f64(buf: &[u8], pos: &mut usize) -> Result<f64> {
    let bytes: [u8; 8] = buf
        .get(*pos..*pos + 8)
        .ok_or_else(|| Error::index_corruption("unexpected end of buffer reading f64"))?
        .try_into()
        .unwrap();
    *pos += 8;
    Ok(f64::from_le_bytes(bytes))
}

/// Check the §3 invariants that are cheap to verify at load time.
fn validate(index: &PatternIndex) -> Result<()> {
    for data in [index.subject_data(), index.object_data()] {
        let num_predicates = data.predicate_global_ids.len();
        for e in 0..data.has_pattern.len() {
            let pattern_id = data.has_pattern[e];
            if pattern_id != NO_PATTERN {
                if pattern_id as usize >= data.patterns.num_rows() {
                    return Err(Error::index_corruption(format!(
                        "hasPattern[{e}] references out-of-range pattern {pattern_id}"
                    )));
                }
            }
        }
        for p in 0..data.patterns.num_rows() {
            let row = data.patterns.row(p);
            if row.is_empty() {
                return Err(Error::index_corruption(format!(
                    "pattern {p} is empty, violating the non-empty-pattern invariant"
                )));
            }
            for local in row.iter() {
                if local as usize >= num_predicates {
                    return Err(Error::index_corruption(format!(
                        "pattern {p} references local predicate {local} outside predicateGlobalIds"
                    )));
                }
            }
        }
        for e in 0..data.has_predicate.num_rows() {
            for local in data.has_predicate.row(e).iter() {
                if local as usize >= num_predicates {
                    return Err(Error::index_corruption(format!(
                        "hasPredicate[{e}] references local predicate {local} outside predicateGlobalIds"
                    )));
                }
            }
        }
    }
    Ok(())
}
