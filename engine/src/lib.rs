//! # Bibmerge Engine
//!
//! A deterministic three-way merge engine for bibliography libraries.
//!
//! This crate merges two concurrently edited copies of a library (local and
//! remote) against their common ancestor (base). Uncontested remote changes
//! are applied automatically; contested records are reported as conflicts
//! and handed to a resolver.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, git, or user interfaces
//! - **Deterministic**: Same inputs always produce same outputs
//! - **Testable**: Pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Records and Snapshots
//!
//! A [`Record`] is one bibliography entry: an entry type, an optional
//! citation key, and a map of field names to values. A [`Snapshot`] is the
//! full list of records at one point in time.
//!
//! ### Field Classification
//!
//! For every field, the base, local and remote values classify the field as
//! one of the [`patch::FieldChange`] variants. Only a field changed on both
//! sides to different values is a conflict.
//!
//! ### Conflicts
//!
//! The [`ConflictDetector`] reports each citation key whose three versions
//! cannot be merged automatically as a [`ThreeWayConflict`].
//!
//! ### Auto-merge
//!
//! The [`AutoMergePlanner`] produces a [`MergePlan`] for every other key:
//! field patches, new records and deletions.
//!
//! ### Resolution
//!
//! A [`ConflictResolver`] decides the conflicting keys or aborts the merge:
//! - [`NoopResolver`] - always aborts (headless use)
//! - [`InteractiveResolver`] - asks a [`ConflictPrompt`] per conflict
//!
//! ## Quick Start
//!
//! ```rust
//! use bibmerge_engine::{Merger, NoopResolver, Record, Snapshot};
//!
//! let base = Snapshot::from_records(vec![
//!     Record::new("article", "knuth1984").with_field("title", "Literate Programming"),
//! ]);
//!
//! // Local adds a note, remote fixes the year
//! let local = Snapshot::from_records(vec![
//!     Record::new("article", "knuth1984")
//!         .with_field("title", "Literate Programming")
//!         .with_field("note", "read"),
//! ]);
//! let remote = Snapshot::from_records(vec![
//!     Record::new("article", "knuth1984")
//!         .with_field("title", "Literate Programming")
//!         .with_field("year", "1984"),
//! ]);
//!
//! let merger = Merger::default();
//! let analysis = merger.analyze(&base, &local, &remote);
//! assert!(analysis.is_clean());
//!
//! let outcome = merger.merge(&base, &local, &remote, &mut NoopResolver);
//! let merged = outcome.snapshot().unwrap().get("knuth1984").unwrap();
//! assert_eq!(merged.field("note"), Some("read"));
//! assert_eq!(merged.field("year"), Some("1984"));
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for use from other languages.
//! All data is exchanged as JSON strings.

pub mod apply;
pub mod config;
pub mod conflict;
pub mod error;
pub mod ffi;
pub mod index;
pub mod merge;
pub mod patch;
pub mod plan;
pub mod record;
pub mod resolve;
pub mod snapshot;

// Re-export main types at crate root
pub use apply::{apply_plan, apply_resolutions, ApplyResult};
pub use config::MergeConfig;
pub use conflict::{ConflictDetector, ConflictKind, ThreeWayConflict};
pub use error::Error;
pub use index::{union_keys, RecordIndex};
pub use merge::{MergeAnalysis, MergeOutcome, MergeReport, Merger};
pub use patch::{FieldChange, FieldPatch, FieldPatchComputer};
pub use plan::{AutoMergePlanner, MergePlan};
pub use record::Record;
pub use resolve::{
    ConflictPrompt, ConflictResolver, InteractiveResolver, NoopResolver, ResolutionChoice,
};
pub use snapshot::{Snapshot, SNAPSHOT_FORMAT_VERSION};

/// Type aliases for clarity
pub type CitationKey = String;
pub type FieldName = String;
