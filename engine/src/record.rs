//! Bibliography record type.

use crate::{CitationKey, Error, FieldName, MergeConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Entry type given to records that do not specify one.
pub const DEFAULT_ENTRY_TYPE: &str = "misc";

/// A single bibliography entry.
///
/// Field names and the entry type are stored lowercase. Field values are
/// opaque strings. A record without a citation key cannot be matched
/// across snapshots and is ignored by the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawRecord")]
pub struct Record {
    /// Unique citation key (identity for merge purposes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_key: Option<CitationKey>,
    /// Entry type such as `article` or `book`
    pub entry_type: String,
    /// Field values by lowercase field name
    pub fields: BTreeMap<FieldName, String>,
}

/// Wire shape of a record before normalization.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(default)]
    citation_key: Option<CitationKey>,
    #[serde(default)]
    entry_type: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

impl TryFrom<RawRecord> for Record {
    type Error = Error;

    /// Normalize a decoded record. Field names that collide once lowercased
    /// (`Title` and `title`) are rejected rather than silently merged.
    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let mut record = Record::untyped(raw.entry_type.as_deref().unwrap_or(DEFAULT_ENTRY_TYPE));
        record.citation_key = raw.citation_key;
        for (name, value) in raw.fields {
            let lowered = name.to_lowercase();
            if record.fields.contains_key(&lowered) {
                return Err(Error::InvalidRecord(format!(
                    "duplicate field name `{}` in record {}",
                    lowered,
                    record.key().unwrap_or("<no key>")
                )));
            }
            record.fields.insert(lowered, value);
        }
        Ok(record)
    }
}

impl Record {
    /// Create an empty record with a citation key.
    pub fn new(entry_type: impl AsRef<str>, citation_key: impl Into<CitationKey>) -> Self {
        let mut record = Self::untyped(entry_type);
        record.citation_key = Some(citation_key.into());
        record
    }

    /// Create an empty record without a citation key.
    pub fn untyped(entry_type: impl AsRef<str>) -> Self {
        Self {
            citation_key: None,
            entry_type: entry_type.as_ref().to_lowercase(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Citation key, if any.
    pub fn key(&self) -> Option<&str> {
        self.citation_key.as_deref()
    }

    /// Get a field value by (case-insensitive) name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(value) => Some(value.as_str()),
            None => self.fields.get(&name.to_lowercase()).map(String::as_str),
        }
    }

    /// Set a field value. The name is lowercased.
    pub fn set_field(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.fields
            .insert(name.as_ref().to_lowercase(), value.into());
    }

    /// Remove a field, returning its previous value.
    pub fn remove_field(&mut self, name: &str) -> Option<String> {
        self.fields.remove(&name.to_lowercase())
    }

    /// Names of all non-reserved fields.
    pub fn field_names<'a>(
        &'a self,
        config: &'a MergeConfig,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .keys()
            .map(String::as_str)
            .filter(move |name| !config.is_reserved(name))
    }

    /// Deserialize a single record from JSON.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidRecord(e.to_string()))
    }

    /// Whether two records carry the same merge-relevant content.
    ///
    /// Compares entry type and every non-reserved field. The citation key
    /// is not compared: records are matched by key before this is called.
    pub fn same_content(&self, other: &Record, config: &MergeConfig) -> bool {
        if self.entry_type != other.entry_type {
            return false;
        }
        let names: BTreeSet<&str> = self
            .field_names(config)
            .chain(other.field_names(config))
            .collect();
        names
            .into_iter()
            .all(|name| config.values_equal(self.field(name), other.field(name)))
    }
}
