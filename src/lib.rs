//! Chat Export Analyzer - Statistics and transcripts from chat conversation exports
//!
//! This library loads the `conversations.json` file of a ChatGPT-style data
//! export and models every conversation as a tree of messages, since a reply
//! can be regenerated or a prompt edited. It supports:
//!
//! - Validating conversation trees and rendering the main branch as markdown
//! - Ranking, filtering and grouping conversations by week or month
//! - Collecting text for word counts and per-period activity series
//! - Writing one markdown file per conversation
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use chat_export_analyzer::{LoadPolicy, SortKey, load_export_file};
//!
//! let report = load_export_file(Path::new("conversations.json"), LoadPolicy::SkipInvalid)?;
//! let key = SortKey::MessageCount;
//! for tree in report.collection.top_n(|t| key.key(t), 5) {
//!     println!("{} ({} messages)", tree.title(), tree.message_count());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod loader;
pub mod models;
pub mod parsers;
pub mod render;
pub mod utils;

// Re-export commonly used types
pub use aggregate::TextAggregator;
pub use error::{CollectionError, EmptyInputError, StructuralError};
pub use loader::{LoadPolicy, LoadReport, build_collection, load_export_file, load_export_str};
pub use models::{
    AuthorRole, BranchScope, Content, ContentType, ConversationCollection, ConversationTree,
    MessageNode, Period, SortKey,
};
pub use parsers::{parse_export_archive, parse_export_file, parse_export_str};
pub use render::{MarkdownOptions, OutputMode, render_markdown, write_markdown_files};
