//! Turns raw export records into a validated [`ConversationCollection`].

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::error::CollectionError;
use crate::models::{ConversationCollection, ConversationTree, RawConversation};
use crate::parsers::{is_export_archive, parse_export_archive, parse_export_file, parse_export_str};

const MISSING_ID: &str = "<missing id>";

/// What to do with a conversation that cannot be turned into a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Abort the load on the first structural error or duplicate id
    Strict,
    /// Leave the conversation out and record it in [`LoadReport::skipped`]
    #[default]
    SkipInvalid,
}

/// A conversation left out of the collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedConversation {
    pub id: String,
    pub reason: String,
}

/// Outcome of a load: the collection plus everything that was left out
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub collection: ConversationCollection,
    pub skipped: Vec<SkippedConversation>,
}

impl LoadReport {
    pub fn skipped_ids(&self) -> Vec<&str> {
        self.skipped.iter().map(|s| s.id.as_str()).collect()
    }
}

/// Build a collection from raw records
///
/// Trees are built in parallel; the collection keeps the export order. When two
/// records share an id the first one wins under [`LoadPolicy::SkipInvalid`].
///
/// # Errors
///
/// Under [`LoadPolicy::Strict`], returns the first [`CollectionError`] in export
/// order. [`LoadPolicy::SkipInvalid`] never fails.
pub fn build_collection(
    records: Vec<RawConversation>,
    policy: LoadPolicy,
) -> Result<LoadReport, CollectionError> {
    let total = records.len();
    let built: Vec<_> = records.into_par_iter().map(ConversationTree::try_from).collect();

    let mut trees = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    let mut seen = HashSet::with_capacity(total);

    for result in built {
        let failure = match result {
            Ok(tree) if seen.contains(tree.id()) => {
                CollectionError::DuplicateConversation { id: tree.id().to_string() }
            }
            Ok(tree) => {
                seen.insert(tree.id().to_string());
                trees.push(tree);
                continue;
            }
            Err(e) => CollectionError::Structural(e),
        };

        if policy == LoadPolicy::Strict {
            return Err(failure);
        }

        let id = match &failure {
            CollectionError::DuplicateConversation { id } => id.clone(),
            CollectionError::Structural(e) => e.conversation_id().unwrap_or(MISSING_ID).to_string(),
        };
        tracing::warn!(conversation = %id, reason = %failure, "Skipping conversation");
        skipped.push(SkippedConversation { id, reason: failure.to_string() });
    }

    let collection = ConversationCollection::new(trees)?;
    tracing::info!(
        loaded = collection.len(),
        skipped = skipped.len(),
        "Built conversation collection"
    );

    Ok(LoadReport { collection, skipped })
}

/// Parse an export and build its collection
///
/// `path` is either a `conversations.json` or the `.zip` archive it came in.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use chat_export_analyzer::loader::{LoadPolicy, load_export_file};
///
/// let report = load_export_file(Path::new("conversations.json"), LoadPolicy::SkipInvalid)?;
/// println!("Loaded {} conversations", report.collection.len());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_export_file(path: &Path, policy: LoadPolicy) -> Result<LoadReport> {
    let records =
        if is_export_archive(path) { parse_export_archive(path)? } else { parse_export_file(path)? };
    build_collection(records, policy)
        .with_context(|| format!("Invalid conversation in export {}", path.display()))
}

/// Parse an in-memory export and build its collection
pub fn load_export_str(json: &str, policy: LoadPolicy) -> Result<LoadReport> {
    let records = parse_export_str(json)?;
    build_collection(records, policy).context("Invalid conversation in export")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructuralError;

    fn record(id: &str, parent_of_second: &str) -> String {
        format!(
            r#"{{
                "id": "{id}",
                "title": "Conversation {id}",
                "create_time": 1700000000.0,
                "mapping": {{
                    "a": {{"id": "a", "message": null, "parent": null, "children": ["b"]}},
                    "b": {{"id": "b", "message": null, "parent": "{parent_of_second}", "children": []}}
                }}
            }}"#
        )
    }

    fn export(records: &[String]) -> String {
        format!("[{}]", records.join(","))
    }

    #[test]
    fn test_build_preserves_export_order() {
        let json = export(&[record("c3", "a"), record("c1", "a"), record("c2", "a")]);
        let report = load_export_str(&json, LoadPolicy::Strict).unwrap();
        assert_eq!(report.collection.ids(), vec!["c3", "c1", "c2"]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_skip_invalid_reports_dangling_parent() {
        let json = export(&[record("good", "a"), record("bad", "ghost"), record("also-good", "a")]);
        let report = load_export_str(&json, LoadPolicy::SkipInvalid).unwrap();

        assert_eq!(report.collection.ids(), vec!["good", "also-good"]);
        assert_eq!(report.skipped_ids(), vec!["bad"]);
        assert!(report.skipped[0].reason.contains("ghost"));
    }

    #[test]
    fn test_strict_fails_on_structural_error() {
        let records: Vec<RawConversation> = serde_json::from_str(&export(&[
            record("good", "a"),
            record("bad", "ghost"),
        ]))
        .unwrap();

        let err = build_collection(records, LoadPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            CollectionError::Structural(StructuralError::DanglingParent { ref conversation_id, .. })
                if conversation_id == "bad"
        ));
    }

    #[test]
    fn test_duplicate_ids() {
        let json = export(&[record("same", "a"), record("same", "a")]);

        let report = load_export_str(&json, LoadPolicy::SkipInvalid).unwrap();
        assert_eq!(report.collection.len(), 1);
        assert_eq!(report.skipped_ids(), vec!["same"]);

        let records: Vec<RawConversation> = serde_json::from_str(&json).unwrap();
        let err = build_collection(records, LoadPolicy::Strict).unwrap_err();
        assert_eq!(err, CollectionError::DuplicateConversation { id: "same".to_string() });
    }

    #[test]
    fn test_missing_id_is_reported() {
        let json = r#"[{"title": "no id", "mapping": {"a": {"id": "a", "parent": null}}}]"#;
        let report = load_export_str(json, LoadPolicy::SkipInvalid).unwrap();
        assert!(report.collection.is_empty());
        assert_eq!(report.skipped_ids(), vec![MISSING_ID]);
    }

    #[test]
    fn test_empty_export() {
        let report = load_export_str("[]", LoadPolicy::Strict).unwrap();
        assert!(report.collection.is_empty());
    }
}
