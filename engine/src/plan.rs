//! Auto-merge planning for keys without conflicts.
//!
//! The planner turns each non-conflicting key into a small [`MergePlan`]
//! and folds them together. It never touches the snapshots it reads.
//!
//! | Base | Local | Remote | Rule | Action |
//! |---|---|---|---|---|
//! | absent | present | absent | B0 | keep local |
//! | absent | present | present | B1 | field patch against an empty base |
//! | absent | absent | present | B2 | insert remote |
//! | present | * | absent | B3 | delete if local is absent or unchanged |
//! | present | present | present | B4 | field patch, plus entry type if only remote changed it |
//! | present | absent | present | - | local deletion stands |

use crate::{
    error::Result,
    index::union_keys,
    patch::{classify, FieldChange},
    CitationKey, ConflictDetector, Error, FieldPatch, FieldPatchComputer, MergeConfig, Record,
    RecordIndex,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Mutations to apply to local so it picks up every uncontested remote change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePlan {
    /// Per-key field patches, ordered by key
    #[serde(default)]
    pub field_patches: BTreeMap<CitationKey, FieldPatch>,
    /// Records that exist only on the remote side
    #[serde(default)]
    pub new_records: Vec<Record>,
    /// Keys to remove from local
    #[serde(default)]
    pub deleted_keys: Vec<CitationKey>,
    /// New entry types for keys whose type only remote changed
    #[serde(default)]
    pub entry_types: BTreeMap<CitationKey, String>,
}

impl MergePlan {
    /// An empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.field_patches.is_empty()
            && self.new_records.is_empty()
            && self.deleted_keys.is_empty()
            && self.entry_types.is_empty()
    }

    /// Fold another plan into this one.
    ///
    /// Patches for the same key are combined field by field, with `other`
    /// taking precedence. Deleted keys stay unique.
    pub fn merge(&mut self, other: MergePlan) {
        self.entry_types.extend(other.entry_types);
        for (key, patch) in other.field_patches {
            self.field_patches.entry(key).or_default().extend(patch);
        }
        self.new_records.extend(other.new_records);
        for key in other.deleted_keys {
            if !self.deleted_keys.contains(&key) {
                self.deleted_keys.push(key);
            }
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidPlan(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidPlan(e.to_string()))
    }
}

/// Computes merge actions for keys that passed the conflict gate.
#[derive(Debug, Clone, Copy)]
pub struct AutoMergePlanner<'a> {
    config: &'a MergeConfig,
}

impl<'a> AutoMergePlanner<'a> {
    /// Create a planner using the given configuration.
    pub fn new(config: &'a MergeConfig) -> Self {
        Self { config }
    }

    /// Plan the actions for one key.
    ///
    /// The key must not be in conflict. Debug builds assert this; in release
    /// builds calling it for a conflicting key is a caller bug and the result
    /// is unspecified (the field patch skips conflicting fields, B3 falls
    /// back to a no-op).
    pub fn plan_for_key(
        &self,
        key: &str,
        base: Option<&Record>,
        local: Option<&Record>,
        remote: Option<&Record>,
    ) -> MergePlan {
        debug_assert!(
            !ConflictDetector::new(self.config).is_conflicting(base, local, remote),
            "planned a conflicting key: {key}"
        );

        let mut plan = MergePlan::new();
        let computer = FieldPatchComputer::new(self.config);

        match (base, local, remote) {
            // B0: created locally only
            (None, Some(_), None) => {}
            // B1: created on both sides without disagreement
            (None, Some(local), Some(remote)) => {
                let patch = computer.compute(None, Some(local), Some(remote));
                if !patch.is_empty() {
                    plan.field_patches.insert(key.to_string(), patch);
                }
            }
            // B2: created remotely only
            (None, None, Some(remote)) => plan.new_records.push(remote.clone()),
            // B3: deleted remotely
            (Some(base), local, None) => match local {
                None => plan.deleted_keys.push(key.to_string()),
                Some(local) if local.same_content(base, self.config) => {
                    plan.deleted_keys.push(key.to_string())
                }
                Some(_) => {
                    tracing::debug!(key, "remote deletion of locally modified record skipped");
                }
            },
            // B4: present everywhere
            (Some(base), Some(local), Some(remote)) => {
                let patch = computer.compute(Some(base), Some(local), Some(remote));
                if !patch.is_empty() {
                    plan.field_patches.insert(key.to_string(), patch);
                }
                let entry_type = classify(
                    Some(base.entry_type.as_str()),
                    Some(local.entry_type.as_str()),
                    Some(remote.entry_type.as_str()),
                    self.config,
                );
                if entry_type == FieldChange::TakeRemote {
                    plan.entry_types
                        .insert(key.to_string(), remote.entry_type.clone());
                }
            }
            // Deleted locally; remote left it alone or it was a conflict
            (Some(_), None, Some(_)) => {}
            (None, None, None) => {}
        }

        plan
    }

    /// Plan every key in the union of the three indices, skipping `excluded`.
    pub fn plan(
        &self,
        base: &RecordIndex<'_>,
        local: &RecordIndex<'_>,
        remote: &RecordIndex<'_>,
        excluded: &HashSet<&str>,
    ) -> MergePlan {
        union_keys(base, local, remote)
            .into_iter()
            .filter(|key| !excluded.contains(key))
            .map(|key| self.plan_for_key(key, base.get(key), local.get(key), remote.get(key)))
            .fold(MergePlan::new(), |mut acc, plan| {
                acc.merge(plan);
                acc
            })
    }
}
