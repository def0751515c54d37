//! Applying plans and resolutions to a snapshot.
//!
//! Both operations are idempotent: applying the same plan or resolution a
//! second time leaves the snapshot unchanged.

use crate::{MergePlan, Record, Snapshot, ThreeWayConflict};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counts of what an application actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    /// Fields set or removed
    pub fields_changed: usize,
    /// Entry types changed
    pub types_changed: usize,
    /// Records inserted
    pub inserted: usize,
    /// Records replaced by a resolution
    pub replaced: usize,
    /// Records removed
    pub deleted: usize,
}

impl ApplyResult {
    /// Whether nothing changed.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Apply a merge plan to a target snapshot.
///
/// Deletions run first, then field patches (`None` removes the field;
/// patches for a key with no record are skipped) and entry type changes,
/// then insertions of records whose key is not already present.
pub fn apply_plan(plan: &MergePlan, target: &mut Snapshot) -> ApplyResult {
    let mut result = ApplyResult::default();

    for key in &plan.deleted_keys {
        result.deleted += target.remove_key(key);
    }

    for (key, patch) in &plan.field_patches {
        let Some(record) = target.get_mut(key) else {
            tracing::debug!(key = key.as_str(), "patch target missing, skipped");
            continue;
        };
        for (field, value) in patch {
            let changed = match value {
                Some(value) => {
                    if record.field(field) == Some(value.as_str()) {
                        false
                    } else {
                        record.set_field(field, value.clone());
                        true
                    }
                }
                None => record.remove_field(field).is_some(),
            };
            if changed {
                result.fields_changed += 1;
            }
        }
    }

    for (key, entry_type) in &plan.entry_types {
        let Some(record) = target.get_mut(key) else {
            tracing::debug!(key = key.as_str(), "entry type target missing, skipped");
            continue;
        };
        let entry_type = entry_type.to_lowercase();
        if record.entry_type != entry_type {
            record.entry_type = entry_type;
            result.types_changed += 1;
        }
    }

    for record in &plan.new_records {
        let Some(key) = record.key() else {
            continue;
        };
        if !target.contains_key(key) {
            target.push(record.clone());
            result.inserted += 1;
        }
    }

    result
}

/// Apply resolved records for a set of conflicts.
///
/// For each conflict key, the resolved record carrying that key replaces
/// local's record (or is appended). A conflict with no resolved record was
/// resolved to "absent" and its key is removed, so an empty `resolved`
/// deletes every conflicting key. Resolved records whose key matches no
/// conflict are ignored.
pub fn apply_resolutions(
    conflicts: &[ThreeWayConflict],
    resolved: &[Record],
    target: &mut Snapshot,
) -> ApplyResult {
    let mut result = ApplyResult::default();
    let mut by_key: HashMap<&str, &Record> = HashMap::with_capacity(resolved.len());

    for record in resolved {
        match record.key() {
            Some(key) => {
                by_key.insert(key, record);
            }
            None => tracing::warn!("resolved record without citation key ignored"),
        }
    }

    for conflict in conflicts {
        match by_key.get(conflict.key.as_str()) {
            Some(&record) => {
                if target.get(&conflict.key) == Some(record) {
                    continue;
                }
                if target.contains_key(&conflict.key) {
                    result.replaced += 1;
                } else {
                    result.inserted += 1;
                }
                target.upsert(record.clone());
            }
            None => result.deleted += target.remove_key(&conflict.key),
        }
    }

    result
}
