//! Key → record index over a single snapshot.
//!
//! The index borrows records from its snapshot; it is built once per merge
//! and read-only afterwards.

use crate::{Record, Snapshot};
use std::collections::{HashMap, HashSet};

/// Lookup from citation key to record for one snapshot.
///
/// Keys keep the order of their first appearance in the snapshot, while
/// the record stored for a key is the last one seen.
#[derive(Debug, Clone, Default)]
pub struct RecordIndex<'a> {
    order: Vec<&'a str>,
    records: HashMap<&'a str, &'a Record>,
    skipped: usize,
}

impl<'a> RecordIndex<'a> {
    /// Index a snapshot. Records without a citation key are skipped.
    pub fn from_snapshot(snapshot: &'a Snapshot) -> Self {
        let mut index = Self {
            order: Vec::with_capacity(snapshot.len()),
            records: HashMap::with_capacity(snapshot.len()),
            skipped: 0,
        };

        for record in &snapshot.records {
            let Some(key) = record.key() else {
                index.skipped += 1;
                continue;
            };
            if index.records.insert(key, record).is_none() {
                index.order.push(key);
            }
        }

        if index.skipped > 0 {
            tracing::debug!(
                skipped = index.skipped,
                "records without citation key excluded from merge"
            );
        }

        index
    }

    /// The record for a key.
    pub fn get(&self, key: &str) -> Option<&'a Record> {
        self.records.get(key).copied()
    }

    /// Whether the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Keys in first-appearance order.
    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.order.iter().copied()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no keyed record was indexed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// How many records were dropped for lacking a citation key.
    pub fn skipped_without_key(&self) -> usize {
        self.skipped
    }
}

/// Union of the keys of three indices.
///
/// Base keys come first, then keys only in local, then keys only in
/// remote. Each key appears once. This is the work-list for conflict
/// detection and planning; unlike a pairwise diff it includes keys that
/// survive only in base.
pub fn union_keys<'a>(
    base: &RecordIndex<'a>,
    local: &RecordIndex<'a>,
    remote: &RecordIndex<'a>,
) -> Vec<&'a str> {
    let mut seen = HashSet::with_capacity(base.len() + local.len() + remote.len());
    base.keys()
        .chain(local.keys())
        .chain(remote.keys())
        .filter(|key| seen.insert(*key))
        .collect()
}
