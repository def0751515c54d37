//! Field-level patches.
//!
//! A [`FieldPatch`] describes what remote changed relative to base, limited
//! to fields local left untouched. Every field triple falls into exactly one
//! [`FieldChange`] class, checked in this order:
//!
//! 1. base == remote: nothing to do
//! 2. local == base: take remote's value (or delete the field)
//! 3. local == remote: both sides converged
//! 4. otherwise: a real conflict, skipped here

use crate::{FieldName, MergeConfig, Record};
use std::collections::{BTreeMap, BTreeSet};

/// Field name → new value. `None` means delete the field.
pub type FieldPatch = BTreeMap<FieldName, Option<String>>;

/// Classification of one field across base, local and remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldChange {
    /// Remote did not change the field
    Unchanged,
    /// Only remote changed the field; local should follow
    TakeRemote,
    /// Both changed it to the same value
    Converged,
    /// Both changed it to different values
    Conflict,
}

/// Classify a field from its three optional values.
pub fn classify(
    base: Option<&str>,
    local: Option<&str>,
    remote: Option<&str>,
    config: &MergeConfig,
) -> FieldChange {
    if config.values_equal(base, remote) {
        FieldChange::Unchanged
    } else if config.values_equal(local, base) {
        FieldChange::TakeRemote
    } else if config.values_equal(local, remote) {
        FieldChange::Converged
    } else {
        FieldChange::Conflict
    }
}

/// Computes field patches for a single record.
#[derive(Debug, Clone, Copy)]
pub struct FieldPatchComputer<'a> {
    config: &'a MergeConfig,
}

impl<'a> FieldPatchComputer<'a> {
    /// Create a computer using the given configuration.
    pub fn new(config: &'a MergeConfig) -> Self {
        Self { config }
    }

    /// Compute the patch that brings remote's changes into local.
    ///
    /// An absent base is treated as an empty record. An absent remote gives
    /// an empty patch: whole-record deletion is a planner concern. Fields in
    /// conflict are skipped without error, so this is safe to call before
    /// or after conflicts are resolved.
    pub fn compute(
        &self,
        base: Option<&Record>,
        local: Option<&Record>,
        remote: Option<&Record>,
    ) -> FieldPatch {
        let mut patch = FieldPatch::new();
        let Some(remote) = remote else {
            return patch;
        };

        let candidates: BTreeSet<&str> = base
            .into_iter()
            .flat_map(|b| b.field_names(self.config))
            .chain(remote.field_names(self.config))
            .collect();

        for field in candidates {
            let base_value = base.and_then(|b| b.field(field));
            let local_value = local.and_then(|l| l.field(field));
            let remote_value = remote.field(field);

            match classify(base_value, local_value, remote_value, self.config) {
                FieldChange::TakeRemote => {
                    patch.insert(field.to_string(), remote_value.map(str::to_string));
                }
                FieldChange::Unchanged | FieldChange::Converged | FieldChange::Conflict => {}
            }
        }

        patch
    }
}
