//! Three-way merge of bibliography snapshots.
//!
//! This is the entry point that ties the pieces together. Given base,
//! local and remote snapshots it produces a deterministic result.
//!
//! # Algorithm
//!
//! 1. Index the three snapshots by citation key
//! 2. Detect conflicts over the union of keys
//! 3. Ask the resolver about conflicts (abort stops here, nothing applied)
//! 4. Plan every non-conflicting key
//! 5. Apply resolutions and the plan to a copy of local

use crate::{
    apply::{apply_plan, apply_resolutions, ApplyResult},
    AutoMergePlanner, ConflictDetector, ConflictResolver, MergeConfig, MergePlan, RecordIndex,
    Snapshot, ThreeWayConflict,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Conflicts plus the automatic plan for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeAnalysis {
    /// Conflicts in union-key order
    pub conflicts: Vec<ThreeWayConflict>,
    /// Plan for the non-conflicting keys
    pub auto_plan: MergePlan,
}

impl MergeAnalysis {
    /// Whether the merge can proceed without a resolver.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Summary of a completed merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Conflicts that were resolved
    pub conflicts: Vec<ThreeWayConflict>,
    /// The plan applied for the non-conflicting keys
    pub plan: MergePlan,
    /// Changes made by the resolutions
    pub resolution_result: ApplyResult,
    /// Changes made by the plan
    pub plan_result: ApplyResult,
}

/// Outcome of a full merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum MergeOutcome {
    /// Merged snapshot, ready to be persisted
    Merged {
        snapshot: Snapshot,
        report: MergeReport,
    },
    /// The resolver declined; local must be left untouched
    Aborted { conflicts: Vec<ThreeWayConflict> },
}

impl MergeOutcome {
    /// The merged snapshot, if the merge went through.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            MergeOutcome::Merged { snapshot, .. } => Some(snapshot),
            MergeOutcome::Aborted { .. } => None,
        }
    }

    /// Whether the merge was aborted.
    pub fn is_aborted(&self) -> bool {
        matches!(self, MergeOutcome::Aborted { .. })
    }
}

/// Runs three-way merges under one configuration.
///
/// Holds no state between calls; every call builds fresh indices.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    config: MergeConfig,
}

impl Merger {
    /// Create a merger.
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Detect conflicts and plan every key that is not in conflict.
    pub fn analyze(&self, base: &Snapshot, local: &Snapshot, remote: &Snapshot) -> MergeAnalysis {
        let base = RecordIndex::from_snapshot(base);
        let local = RecordIndex::from_snapshot(local);
        let remote = RecordIndex::from_snapshot(remote);

        let conflicts = ConflictDetector::new(&self.config).detect_indexed(&base, &local, &remote);
        let excluded: HashSet<&str> = conflicts.iter().map(|c| c.key.as_str()).collect();
        let auto_plan =
            AutoMergePlanner::new(&self.config).plan(&base, &local, &remote, &excluded);

        tracing::info!(
            conflicts = conflicts.len(),
            patches = auto_plan.field_patches.len(),
            inserts = auto_plan.new_records.len(),
            deletes = auto_plan.deleted_keys.len(),
            "merge analyzed"
        );

        MergeAnalysis {
            conflicts,
            auto_plan,
        }
    }

    /// Run the full pipeline: detect, resolve, plan, apply.
    ///
    /// The resolver is only consulted when there are conflicts. If it
    /// declines, nothing is applied and the conflicts are handed back.
    pub fn merge<R>(
        &self,
        base: &Snapshot,
        local: &Snapshot,
        remote: &Snapshot,
        resolver: &mut R,
    ) -> MergeOutcome
    where
        R: ConflictResolver + ?Sized,
    {
        let base_index = RecordIndex::from_snapshot(base);
        let local_index = RecordIndex::from_snapshot(local);
        let remote_index = RecordIndex::from_snapshot(remote);

        let conflicts = ConflictDetector::new(&self.config).detect_indexed(
            &base_index,
            &local_index,
            &remote_index,
        );

        let resolved = if conflicts.is_empty() {
            Vec::new()
        } else {
            match resolver.resolve(&conflicts) {
                Some(resolved) => resolved,
                None => {
                    tracing::warn!(conflicts = conflicts.len(), "merge aborted by resolver");
                    return MergeOutcome::Aborted { conflicts };
                }
            }
        };

        let excluded: HashSet<&str> = conflicts.iter().map(|c| c.key.as_str()).collect();
        let plan = AutoMergePlanner::new(&self.config).plan(
            &base_index,
            &local_index,
            &remote_index,
            &excluded,
        );

        let mut merged = local.clone();
        let resolution_result = apply_resolutions(&conflicts, &resolved, &mut merged);
        let plan_result = apply_plan(&plan, &mut merged);

        tracing::info!(
            conflicts = conflicts.len(),
            fields_changed = plan_result.fields_changed,
            inserted = plan_result.inserted + resolution_result.inserted,
            deleted = plan_result.deleted + resolution_result.deleted,
            "merge applied"
        );

        MergeOutcome::Merged {
            snapshot: merged,
            report: MergeReport {
                conflicts,
                plan,
                resolution_result,
                plan_result,
            },
        }
    }
}
