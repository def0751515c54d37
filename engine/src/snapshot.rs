//! Snapshot of a record collection at one point in time.
//!
//! A snapshot is an ordered list of records. Order matters: when several
//! records share a citation key, the last one wins during indexing.

use crate::{error::Result, Error, Record};
use serde::{Deserialize, Serialize};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// An ordered collection of records (base, local, or remote).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Snapshot format version
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Records in input order
    #[serde(default)]
    pub records: Vec<Record>,
}

fn default_format_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Record> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}

impl Snapshot {
    /// Create a new empty snapshot.
    pub fn new() -> Self {
        Self::from_records(Vec::new())
    }

    /// Create a snapshot from records in order.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            records,
        }
    }

    /// Append a record.
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Number of records, including ones without a key.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record for a key. The last duplicate wins, matching indexing.
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.iter().rev().find(|r| r.key() == Some(key))
    }

    /// Mutable access to the record for a key (last duplicate).
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Record> {
        self.records.iter_mut().rev().find(|r| r.key() == Some(key))
    }

    /// Whether any record carries the key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.records.iter().any(|r| r.key() == Some(key))
    }

    /// Remove every record with the key. Returns how many were removed.
    pub fn remove_key(&mut self, key: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.key() != Some(key));
        before - self.records.len()
    }

    /// Replace the record for the record's key in place, or append it.
    ///
    /// Other duplicates of the key are dropped so the snapshot ends with
    /// exactly one record for it.
    pub fn upsert(&mut self, record: Record) {
        let Some(key) = record.key().map(str::to_owned) else {
            self.records.push(record);
            return;
        };
        match self.records.iter().position(|r| r.key() == Some(key.as_str())) {
            Some(first) => {
                self.records[first] = record;
                let mut index = 0;
                self.records.retain(|r| {
                    let keep = index == first || r.key() != Some(key.as_str());
                    index += 1;
                    keep
                });
            }
            None => self.records.push(record),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}
