//! Output renderers: markdown documents and word-frequency tables

pub mod markdown;

pub use markdown::{
    MarkdownOptions, OutputMode, render_markdown, write_markdown_files, write_word_frequencies,
};
