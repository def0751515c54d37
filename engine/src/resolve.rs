//! Conflict resolution strategies.
//!
//! A resolver receives every detected conflict and either aborts the merge
//! (`None`) or returns the records that should survive for the conflicting
//! keys. A conflicting key with no returned record is resolved as absent.

use crate::{Record, ThreeWayConflict};
use serde::{Deserialize, Serialize};

/// Decides the outcome of a set of conflicts.
pub trait ConflictResolver {
    /// Resolve the conflicts, or return `None` to abort the merge.
    ///
    /// The returned list is matched to conflicts by citation key. Every
    /// conflict key missing from it is resolved as absent: local's record
    /// for that key is deleted. Returning `Some(vec![])` therefore deletes
    /// every conflicting record. To keep local's version, return it.
    fn resolve(&mut self, conflicts: &[ThreeWayConflict]) -> Option<Vec<Record>>;
}

/// Resolver for headless contexts: declines every merge with conflicts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl ConflictResolver for NoopResolver {
    fn resolve(&mut self, _conflicts: &[ThreeWayConflict]) -> Option<Vec<Record>> {
        None
    }
}

/// What to keep for a single conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "choice", content = "record")]
pub enum ResolutionChoice {
    /// Keep the common ancestor version
    Base,
    /// Keep the local version
    Local,
    /// Take the remote version
    Remote,
    /// Use an edited record
    Custom(Record),
    /// Abort the whole merge
    Cancel,
}

/// Source of per-conflict decisions, typically a user interface.
pub trait ConflictPrompt {
    /// Ask for a decision on one conflict.
    fn choose(&mut self, conflict: &ThreeWayConflict) -> ResolutionChoice;
}

impl<F> ConflictPrompt for F
where
    F: FnMut(&ThreeWayConflict) -> ResolutionChoice,
{
    fn choose(&mut self, conflict: &ThreeWayConflict) -> ResolutionChoice {
        self(conflict)
    }
}

/// Resolver that asks a prompt about each conflict in order.
#[derive(Debug, Clone)]
pub struct InteractiveResolver<P> {
    prompt: P,
}

impl<P: ConflictPrompt> InteractiveResolver<P> {
    /// Create a resolver around a prompt.
    pub fn new(prompt: P) -> Self {
        Self { prompt }
    }

    /// Give back the prompt.
    pub fn into_inner(self) -> P {
        self.prompt
    }
}

impl<P: ConflictPrompt> ConflictResolver for InteractiveResolver<P> {
    fn resolve(&mut self, conflicts: &[ThreeWayConflict]) -> Option<Vec<Record>> {
        let mut resolved = Vec::with_capacity(conflicts.len());

        for conflict in conflicts {
            let chosen = match self.prompt.choose(conflict) {
                ResolutionChoice::Base => conflict.base.clone(),
                ResolutionChoice::Local => conflict.local.clone(),
                ResolutionChoice::Remote => conflict.remote.clone(),
                ResolutionChoice::Custom(mut record) => {
                    record.citation_key = Some(conflict.key.clone());
                    Some(record)
                }
                ResolutionChoice::Cancel => {
                    tracing::debug!(key = conflict.key.as_str(), "resolution cancelled");
                    return None;
                }
            };
            resolved.extend(chosen);
        }

        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> ThreeWayConflict {
        let author = |v: &str| Record::new("article", "a").with_field("author", v);
        ThreeWayConflict {
            key: "a".into(),
            base: Some(author("base")),
            local: Some(author("local")),
            remote: None,
        }
    }

    #[test]
    fn noop_always_declines() {
        assert_eq!(NoopResolver.resolve(&[conflict()]), None);
        assert_eq!(NoopResolver.resolve(&[]), None);
    }

    #[test]
    fn interactive_picks_versions() {
        let c = conflict();

        let mut local = InteractiveResolver::new(|_: &ThreeWayConflict| ResolutionChoice::Local);
        assert_eq!(local.resolve(&[c.clone()]), Some(vec![c.local.clone().unwrap()]));

        let mut base = InteractiveResolver::new(|_: &ThreeWayConflict| ResolutionChoice::Base);
        assert_eq!(base.resolve(&[c.clone()]), Some(vec![c.base.clone().unwrap()]));

        // Remote deleted the record: choosing it resolves to absent
        let mut remote = InteractiveResolver::new(|_: &ThreeWayConflict| ResolutionChoice::Remote);
        assert_eq!(remote.resolve(&[c]), Some(vec![]));
    }

    #[test]
    fn interactive_custom_record_gets_conflict_key() {
        let edited = Record::untyped("article").with_field("author", "merged");
        let mut resolver = InteractiveResolver::new(move |_: &ThreeWayConflict| {
            ResolutionChoice::Custom(edited.clone())
        });

        let resolved = resolver.resolve(&[conflict()]).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].key(), Some("a"));
        assert_eq!(resolved[0].field("author"), Some("merged"));
    }

    #[test]
    fn interactive_cancel_aborts_everything() {
        let mut calls = 0;
        let mut resolver = InteractiveResolver::new(|_: &ThreeWayConflict| {
            calls += 1;
            if calls == 1 {
                ResolutionChoice::Local
            } else {
                ResolutionChoice::Cancel
            }
        });
        assert_eq!(resolver.resolve(&[conflict(), conflict()]), None);
    }

    #[test]
    fn interactive_with_no_conflicts() {
        let mut resolver = InteractiveResolver::new(|_: &ThreeWayConflict| ResolutionChoice::Cancel);
        assert_eq!(resolver.resolve(&[]), Some(vec![]));
    }

    #[test]
    fn choice_serialization() {
        let json = serde_json::to_string(&ResolutionChoice::Remote).unwrap();
        assert_eq!(json, r#"{"choice":"remote"}"#);

        let parsed: ResolutionChoice =
            serde_json::from_str(r#"{"choice":"custom","record":{"entryType":"book"}}"#).unwrap();
        assert_eq!(parsed, ResolutionChoice::Custom(Record::untyped("book")));
    }
}
