use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AuthorHeaders, ConversationCollection, ConversationTree};
use crate::utils::write_atomic;

const MARKDOWN_EXTENSION: &str = "md";
const ID_SUFFIX_CHARS: usize = 8;

/// How a conversation is laid out as a markdown document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    pub headers: AuthorHeaders,
    /// Prepend a YAML front matter block with conversation metadata
    pub yaml_header: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self { headers: AuthorHeaders::default(), yaml_header: true }
    }
}

/// What happens to markdown files already present in the output directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Leave them; files with the same name are overwritten
    #[default]
    Keep,
    /// Delete every `*.md` file in the directory first (other files are untouched)
    Clear,
}

/// Markdown document for one conversation: optional front matter, then the
/// main-branch transcript
pub fn render_markdown(tree: &ConversationTree, options: &MarkdownOptions) -> String {
    let body = tree.render_with(&options.headers);
    if !options.yaml_header {
        return body;
    }

    let mut document = front_matter(tree);
    if !body.is_empty() {
        document.push('\n');
        document.push_str(&body);
    }
    document
}

// Scalars are written as JSON strings, which YAML reads as double-quoted scalars
fn front_matter(tree: &ConversationTree) -> String {
    let lines = [
        ("title", quote(tree.title())),
        ("url", quote(&tree.url())),
        ("create_time", timestamp(tree.create_time())),
        ("update_time", timestamp(tree.update_time())),
        ("models", list(tree.model_slugs())),
        ("used_plugins", list(tree.used_plugins())),
        ("message_count", tree.message_count().to_string()),
        ("content_types", list(tree.content_types().iter().map(|t| t.as_str().to_string()))),
    ];

    let mut header = String::from("---\n");
    for (key, value) in lines {
        header.push_str(key);
        header.push_str(": ");
        header.push_str(&value);
        header.push('\n');
    }
    header.push_str("---\n");
    header
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}

fn timestamp(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => quote(&time.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => String::from("null"),
    }
}

fn list(values: impl IntoIterator<Item = String>) -> String {
    let quoted: Vec<String> = values.into_iter().map(|v| quote(&v)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Write one `{sanitized title}.md` per conversation into `out_dir`
///
/// The directory is created if needed. Names that collide, ignoring case, get
/// a `-{id prefix}` suffix and then a counter, so every conversation gets its
/// own file. Each file is written atomically.
///
/// Returns the written paths in collection order.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or cleared, or a file
/// cannot be written. Files written before the failure are left in place.
pub fn write_markdown_files(
    conversations: &ConversationCollection,
    out_dir: &Path,
    options: &MarkdownOptions,
    mode: OutputMode,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    if mode == OutputMode::Clear {
        let removed = clear_markdown_files(out_dir)?;
        tracing::debug!(removed, dir = %out_dir.display(), "Cleared markdown files");
    }

    let mut taken = HashSet::with_capacity(conversations.len());
    let mut written = Vec::with_capacity(conversations.len());

    for tree in conversations.iter() {
        let stem = unique_stem(tree, &mut taken);
        let path = out_dir.join(format!("{}.{}", stem, MARKDOWN_EXTENSION));
        write_atomic(&path, render_markdown(tree, options).as_bytes())?;
        written.push(path);
    }

    tracing::info!(files = written.len(), dir = %out_dir.display(), "Wrote markdown files");
    Ok(written)
}

fn unique_stem(tree: &ConversationTree, taken: &mut HashSet<String>) -> String {
    let base = tree.sanitized_title();
    let id_prefix: String = sanitize_id(tree.id()).chars().take(ID_SUFFIX_CHARS).collect();

    let mut candidates = vec![base.clone(), format!("{}-{}", base, id_prefix)];
    let mut counter = 2;
    loop {
        for candidate in candidates.drain(..) {
            if taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
        }
        candidates.push(format!("{}-{}-{}", base, id_prefix, counter));
        counter += 1;
    }
}

fn sanitize_id(id: &str) -> String {
    id.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_').collect()
}

fn clear_markdown_files(dir: &Path) -> Result<usize> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read output directory: {}", dir.display()))?;

    let mut removed = 0;
    for entry in entries {
        let path = entry.context("Failed to read directory entry")?.path();
        let is_markdown = path.extension().is_some_and(|ext| ext == MARKDOWN_EXTENSION);
        if is_markdown && path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Write `word<TAB>count` lines, most frequent first, atomically
pub fn write_word_frequencies(path: &Path, frequencies: &[(String, usize)]) -> Result<()> {
    let mut table = String::new();
    for (word, count) in frequencies {
        table.push_str(word);
        table.push('\t');
        table.push_str(&count.to_string());
        table.push('\n');
    }
    write_atomic(path, table.as_bytes())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{AuthorRole, Content, ConversationMeta, MessageNode};

    fn conversation(id: &str, title: &str) -> ConversationTree {
        let nodes = vec![
            MessageNode::synthetic("root", None),
            MessageNode {
                author_role: AuthorRole::User,
                content: Some(Content::Text { parts: vec!["Hello".to_string()] }),
                ..MessageNode::synthetic("u1", Some("root".to_string()))
            },
            MessageNode {
                author_role: AuthorRole::Assistant,
                content: Some(Content::Text { parts: vec!["Hi there".to_string()] }),
                model_slug: Some("gpt-4".to_string()),
                ..MessageNode::synthetic("a1", Some("u1".to_string()))
            },
        ];
        let meta = ConversationMeta {
            id: id.to_string(),
            title: Some(title.to_string()),
            create_time: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).single(),
            ..Default::default()
        };
        ConversationTree::new(meta, nodes).unwrap()
    }

    fn collection(trees: Vec<ConversationTree>) -> ConversationCollection {
        ConversationCollection::new(trees).unwrap()
    }

    fn file_names(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_render_markdown_front_matter() {
        let doc = render_markdown(&conversation("abc", "Say \"hi\""), &MarkdownOptions::default());
        let expected = "---\n\
            title: \"Say \\\"hi\\\"\"\n\
            url: \"https://chat.openai.com/c/abc\"\n\
            create_time: \"2024-03-01T08:30:00Z\"\n\
            update_time: null\n\
            models: [\"gpt-4\"]\n\
            used_plugins: []\n\
            message_count: 3\n\
            content_types: [\"text\"]\n\
            ---\n\
            \n\
            # User\n\nHello\n\n# Assistant\n\nHi there\n";
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_render_markdown_without_header() {
        let options = MarkdownOptions { yaml_header: false, ..Default::default() };
        let doc = render_markdown(&conversation("abc", "t"), &options);
        assert!(doc.starts_with("# User\n\nHello"));
    }

    #[test]
    fn test_write_markdown_files_resolves_collisions() {
        let dir = TempDir::new().unwrap();
        let conversations = collection(vec![
            conversation("aaaaaaaa-1111", "Plan"),
            conversation("bbbbbbbb-2222", "plan"),
            conversation("cccccccc-3333", "Notes"),
        ]);

        let paths =
            write_markdown_files(&conversations, dir.path(), &MarkdownOptions::default(), OutputMode::Keep)
                .unwrap();

        assert_eq!(file_names(&paths), vec!["Plan.md", "plan-bbbbbbbb.md", "Notes.md"]);
        for path in &paths {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_unique_stem_falls_back_to_counter() {
        let mut taken = HashSet::new();
        let tree = conversation("same-id", "Plan");
        assert_eq!(unique_stem(&tree, &mut taken), "Plan");
        assert_eq!(unique_stem(&tree, &mut taken), "Plan-same-id");
        assert_eq!(unique_stem(&tree, &mut taken), "Plan-same-id-2");
        assert_eq!(unique_stem(&tree, &mut taken), "Plan-same-id-3");
    }

    #[test]
    fn test_clear_mode_removes_only_markdown() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stale.md"), "old").unwrap();
        fs::write(dir.path().join("keep.txt"), "keep").unwrap();

        let conversations = collection(vec![conversation("c1", "Fresh")]);
        write_markdown_files(&conversations, dir.path(), &MarkdownOptions::default(), OutputMode::Clear)
            .unwrap();

        assert!(!dir.path().join("stale.md").exists());
        assert!(dir.path().join("keep.txt").exists());
        assert!(dir.path().join("Fresh.md").exists());
    }

    #[test]
    fn test_keep_mode_leaves_existing_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stale.md"), "old").unwrap();

        let conversations = collection(vec![conversation("c1", "Fresh")]);
        write_markdown_files(&conversations, dir.path(), &MarkdownOptions::default(), OutputMode::Keep)
            .unwrap();

        assert!(dir.path().join("stale.md").exists());
    }

    #[test]
    fn test_write_word_frequencies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.tsv");
        write_word_frequencies(&path, &[("rust".to_string(), 3), ("tree".to_string(), 1)]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "rust\t3\ntree\t1\n");
    }
}
