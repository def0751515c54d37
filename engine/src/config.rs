//! Merge configuration.
//!
//! Controls which fields are treated as internal bookkeeping (never compared
//! or patched) and how field values are compared.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::env;

/// Default prefix marking internal fields.
pub const DEFAULT_RESERVED_PREFIX: &str = "__";

/// Default exact reserved field names.
pub const DEFAULT_RESERVED_FIELDS: &[&str] = &["citationkey"];

/// Configuration for a merge run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeConfig {
    /// Fields whose name starts with this prefix are internal
    pub reserved_prefix: String,
    /// Exact field names that are internal
    pub reserved_fields: BTreeSet<String>,
    /// Treat CRLF and CR as LF when comparing values
    pub normalize_line_endings: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
            reserved_fields: DEFAULT_RESERVED_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            normalize_line_endings: true,
        }
    }
}

impl MergeConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// - `BIBMERGE_RESERVED_PREFIX`
    /// - `BIBMERGE_RESERVED_FIELDS` (comma separated)
    /// - `BIBMERGE_NORMALIZE_LINE_ENDINGS` (`true`/`false`/`1`/`0`)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(prefix) = env::var("BIBMERGE_RESERVED_PREFIX") {
            config.reserved_prefix = prefix;
        }

        if let Ok(fields) = env::var("BIBMERGE_RESERVED_FIELDS") {
            config.reserved_fields = fields
                .split(',')
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect();
        }

        if let Ok(value) = env::var("BIBMERGE_NORMALIZE_LINE_ENDINGS") {
            config.normalize_line_endings = parse_bool(&value).ok_or(Error::InvalidEnvValue {
                var: "BIBMERGE_NORMALIZE_LINE_ENDINGS".to_string(),
                value,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Deserialize from JSON. Missing keys take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.reserved_fields = config
            .reserved_fields
            .into_iter()
            .map(|f| f.to_lowercase())
            .collect();
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.reserved_prefix.is_empty() {
            // An empty prefix would reserve every field.
            return Err(Error::InvalidConfig(
                "reservedPrefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a field name is internal bookkeeping. Case-insensitive on
    /// both the name and the configured prefix and fields.
    pub fn is_reserved(&self, field: &str) -> bool {
        starts_with_ignore_case(field, &self.reserved_prefix)
            || self.reserved_fields.contains(field)
            || self
                .reserved_fields
                .iter()
                .any(|reserved| eq_ignore_case(reserved, field))
    }

    /// Compare two optional field values under this configuration.
    ///
    /// Absent equals absent; absent never equals present (not even `""`).
    pub fn values_equal(&self, a: Option<&str>, b: Option<&str>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => self.normalize(a) == self.normalize(b),
            _ => false,
        }
    }

    fn normalize<'v>(&self, value: &'v str) -> Cow<'v, str> {
        if self.normalize_line_endings && value.contains('\r') {
            Cow::Owned(value.replace("\r\n", "\n").replace('\r', "\n"))
        } else {
            Cow::Borrowed(value)
        }
    }
}

fn lowercase_chars(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    lowercase_chars(a).eq(lowercase_chars(b))
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    let mut chars = lowercase_chars(s);
    lowercase_chars(prefix).all(|p| chars.next() == Some(p))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
