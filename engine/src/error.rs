//! Error types for the bibmerge engine.
//!
//! The merge computation itself is total; these errors only arise at the
//! edges where data is decoded or configuration is validated.

use thiserror::Error;

/// All possible errors from the bibmerge engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Decoding errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("invalid merge plan: {0}")]
    InvalidPlan(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    // Configuration errors
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid value for {var}: {value}")]
    InvalidEnvValue { var: String, value: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
