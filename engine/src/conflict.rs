//! Three-way conflict detection.
//!
//! # Algorithm
//!
//! For every key in the union of base, local and remote keys:
//!
//! 1. All three present: conflict iff some field (or the entry type) was
//!    changed on both sides to different values.
//! 2. Base absent, both sides created the key: compared against an empty
//!    base, so any field set on both sides to different values (or
//!    differing entry types) is a conflict. Disjoint additions are not.
//! 3. Base present, one side deleted: conflict iff the surviving side
//!    differs from base.
//! 4. Anything else (both deleted, one-sided creation): no conflict.
//!
//! Conflicts are reported in union-key order.

use crate::{
    index::union_keys, patch::classify, patch::FieldChange, CitationKey, MergeConfig, Record,
    RecordIndex, Snapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Versions of one record that changed in incompatible ways.
///
/// Any subset of the three versions may be absent, meaning the record did
/// not exist or was deleted in that snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeWayConflict {
    /// Citation key shared by all present versions
    pub key: CitationKey,
    /// Common ancestor version
    pub base: Option<Record>,
    /// Local version
    pub local: Option<Record>,
    /// Remote version
    pub remote: Option<Record>,
}

impl ThreeWayConflict {
    /// The kind of conflict, derived from which versions exist.
    pub fn kind(&self) -> ConflictKind {
        match (&self.base, &self.local, &self.remote) {
            (None, _, _) => ConflictKind::BothCreated,
            (Some(_), None, _) => ConflictKind::DeletedLocally,
            (Some(_), _, None) => ConflictKind::DeletedRemotely,
            (Some(_), Some(_), Some(_)) => ConflictKind::BothModified,
        }
    }
}

/// Shape of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictKind {
    /// Both sides edited the same field differently
    BothModified,
    /// Both sides created the key with disagreeing content
    BothCreated,
    /// Local deleted what remote modified
    DeletedLocally,
    /// Remote deleted what local modified
    DeletedRemotely,
}

/// Finds keys whose concurrent edits collide.
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector<'a> {
    config: &'a MergeConfig,
}

impl<'a> ConflictDetector<'a> {
    /// Create a detector using the given configuration.
    pub fn new(config: &'a MergeConfig) -> Self {
        Self { config }
    }

    /// Detect all conflicts between three snapshots.
    pub fn detect(
        &self,
        base: &Snapshot,
        local: &Snapshot,
        remote: &Snapshot,
    ) -> Vec<ThreeWayConflict> {
        let base = RecordIndex::from_snapshot(base);
        let local = RecordIndex::from_snapshot(local);
        let remote = RecordIndex::from_snapshot(remote);
        self.detect_indexed(&base, &local, &remote)
    }

    /// Detect conflicts over prebuilt indices.
    pub fn detect_indexed(
        &self,
        base: &RecordIndex<'_>,
        local: &RecordIndex<'_>,
        remote: &RecordIndex<'_>,
    ) -> Vec<ThreeWayConflict> {
        union_keys(base, local, remote)
            .into_iter()
            .filter_map(|key| self.detect_key(key, base.get(key), local.get(key), remote.get(key)))
            .collect()
    }

    /// Check a single key.
    pub fn detect_key(
        &self,
        key: &str,
        base: Option<&Record>,
        local: Option<&Record>,
        remote: Option<&Record>,
    ) -> Option<ThreeWayConflict> {
        if !self.is_conflicting(base, local, remote) {
            return None;
        }

        let conflict = ThreeWayConflict {
            key: key.to_string(),
            base: base.cloned(),
            local: local.cloned(),
            remote: remote.cloned(),
        };
        tracing::debug!(key, kind = ?conflict.kind(), "conflict detected");
        Some(conflict)
    }

    /// Whether the three versions of a key conflict.
    pub fn is_conflicting(
        &self,
        base: Option<&Record>,
        local: Option<&Record>,
        remote: Option<&Record>,
    ) -> bool {
        match (base, local, remote) {
            (Some(b), Some(l), Some(r)) => self.has_conflicting_edit(Some(b), l, r),
            (None, Some(l), Some(r)) => self.has_conflicting_edit(None, l, r),
            (Some(b), None, Some(r)) => !r.same_content(b, self.config),
            (Some(b), Some(l), None) => !l.same_content(b, self.config),
            (Some(_), None, None) | (None, Some(_), None) | (None, None, Some(_)) => false,
            (None, None, None) => false,
        }
    }

    fn has_conflicting_edit(&self, base: Option<&Record>, local: &Record, remote: &Record) -> bool {
        let base_type = base.map(|b| b.entry_type.as_str());
        if classify(
            base_type,
            Some(local.entry_type.as_str()),
            Some(remote.entry_type.as_str()),
            self.config,
        ) == FieldChange::Conflict
        {
            return true;
        }

        let fields: BTreeSet<&str> = base
            .into_iter()
            .flat_map(|b| b.field_names(self.config))
            .chain(local.field_names(self.config))
            .chain(remote.field_names(self.config))
            .collect();

        fields.into_iter().any(|field| {
            classify(
                base.and_then(|b| b.field(field)),
                local.field(field),
                remote.field(field),
                self.config,
            ) == FieldChange::Conflict
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(value: &str) -> Record {
        Record::new("article", "a").with_field("author", value)
    }

    fn db(records: Vec<Record>) -> Snapshot {
        Snapshot::from_records(records)
    }

    fn detect(base: Vec<Record>, local: Vec<Record>, remote: Vec<Record>) -> Vec<ThreeWayConflict> {
        let config = MergeConfig::default();
        ConflictDetector::new(&config).detect(&db(base), &db(local), &db(remote))
    }

    #[test]
    fn identical_snapshots_have_no_conflicts() {
        let records = vec![author("same"), Record::new("book", "b").with_field("title", "T")];
        assert!(detect(records.clone(), records.clone(), records).is_empty());
    }

    #[test]
    fn both_changed_same_field_differently() {
        let conflicts = detect(vec![author("base")], vec![author("local")], vec![author("remote")]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].key, "a");
        assert_eq!(conflicts[0].kind(), ConflictKind::BothModified);
        assert_eq!(conflicts[0].local, Some(author("local")));
    }

    #[test]
    fn both_changed_same_field_identically() {
        assert!(detect(vec![author("base")], vec![author("same")], vec![author("same")]).is_empty());
    }

    #[test]
    fn different_fields_changed() {
        let base = author("base").with_field("title", "A");
        let local = author("local").with_field("title", "A");
        let remote = author("base").with_field("title", "B");
        assert!(detect(vec![base], vec![local], vec![remote]).is_empty());
    }

    #[test]
    fn local_unchanged_never_conflicts() {
        let base = author("base");
        for remote in [vec![], vec![author("remote")], vec![Record::new("article", "a")]] {
            assert!(detect(vec![base.clone()], vec![base.clone()], remote).is_empty());
        }
    }

    #[test]
    fn field_deleted_one_side_changed_other() {
        let empty = Record::new("article", "a");
        assert_eq!(
            detect(vec![author("base")], vec![author("local")], vec![empty.clone()]).len(),
            1
        );
        assert_eq!(
            detect(vec![author("base")], vec![empty], vec![author("remote")]).len(),
            1
        );
    }

    #[test]
    fn both_created_identical() {
        assert!(detect(vec![], vec![author("same")], vec![author("same")]).is_empty());
    }

    #[test]
    fn both_created_disjoint_fields() {
        let local = author("local");
        let remote = Record::new("article", "a").with_field("journal", "Remote Journal");
        assert!(detect(vec![], vec![local], vec![remote]).is_empty());
    }

    #[test]
    fn both_created_conflicting_values() {
        let conflicts = detect(vec![], vec![author("local")], vec![author("remote")]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind(), ConflictKind::BothCreated);
        assert_eq!(conflicts[0].base, None);
    }

    #[test]
    fn both_created_different_entry_types() {
        let local = Record::new("book", "a").with_field("author", "base");
        let remote = Record::new("inproceedings", "a").with_field("author", "base");
        assert_eq!(detect(vec![], vec![local], vec![remote]).len(), 1);
    }

    #[test]
    fn entry_type_changed_one_side() {
        let base = Record::new("article", "a").with_field("author", "base");
        let local = Record::new("book", "a").with_field("author", "base");
        assert!(detect(vec![base.clone()], vec![local], vec![base]).is_empty());
    }

    #[test]
    fn entry_type_changed_differently_both_sides() {
        let base = Record::new("article", "a");
        let local = Record::new("book", "a");
        let remote = Record::new("misc", "a");
        assert_eq!(detect(vec![base], vec![local], vec![remote]).len(), 1);
    }

    #[test]
    fn remote_deleted_local_modified() {
        let conflicts = detect(vec![author("base")], vec![author("local")], vec![]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind(), ConflictKind::DeletedRemotely);
        assert_eq!(conflicts[0].remote, None);
    }

    #[test]
    fn local_deleted_remote_modified() {
        let conflicts = detect(vec![author("base")], vec![], vec![author("remote")]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind(), ConflictKind::DeletedLocally);
    }

    #[test]
    fn clean_deletions_are_not_conflicts() {
        assert!(detect(vec![author("base")], vec![], vec![author("base")]).is_empty());
        assert!(detect(vec![author("base")], vec![author("base")], vec![]).is_empty());
        assert!(detect(vec![author("base")], vec![], vec![]).is_empty());
    }

    #[test]
    fn one_sided_creations_are_not_conflicts() {
        assert!(detect(vec![], vec![author("local")], vec![]).is_empty());
        assert!(detect(vec![], vec![], vec![author("remote")]).is_empty());
        assert!(detect(vec![], vec![], vec![]).is_empty());
    }

    #[test]
    fn key_renames_are_not_conflicts() {
        let base = author("base");
        let renamed_b = Record::new("article", "b").with_field("author", "base");
        let renamed_c = Record::new("article", "c").with_field("author", "base");

        assert!(detect(vec![base.clone()], vec![renamed_b.clone()], vec![base.clone()]).is_empty());
        assert!(detect(vec![base.clone()], vec![base.clone()], vec![renamed_b.clone()]).is_empty());
        assert!(detect(vec![base], vec![renamed_b], vec![renamed_c]).is_empty());
    }

    #[test]
    fn line_endings_only_difference() {
        let base = Record::new("article", "a").with_field("comment", "line1\n\nline3");
        let local = Record::new("article", "a").with_field("comment", "line1\r\n\r\nline3");
        assert!(detect(vec![base.clone()], vec![local], vec![base]).is_empty());
    }

    #[test]
    fn reserved_fields_ignored() {
        let base = author("base").with_field("__markedentry", "1");
        let local = author("base").with_field("__markedentry", "2");
        let remote = author("base").with_field("__markedentry", "3");
        assert!(detect(vec![base], vec![local], vec![remote]).is_empty());
    }

    #[test]
    fn records_without_key_are_ignored() {
        let orphan = |v: &str| Record::untyped("article").with_field("author", v);
        assert!(detect(vec![orphan("base")], vec![orphan("local")], vec![orphan("remote")]).is_empty());
    }

    #[test]
    fn conflicts_follow_union_key_order() {
        let rec = |k: &str, v: &str| Record::new("article", k).with_field("author", v);
        let conflicts = detect(
            vec![rec("z", "b"), rec("m", "b")],
            vec![rec("m", "l"), rec("z", "l"), rec("new", "l")],
            vec![rec("new", "r"), rec("z", "r"), rec("m", "r")],
        );
        let keys: Vec<_> = conflicts.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["z", "m", "new"]);
    }
}
