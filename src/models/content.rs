use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRole {
    User,
    Assistant,
    System,
    Tool,
}

impl AuthorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorRole::User => "user",
            AuthorRole::Assistant => "assistant",
            AuthorRole::System => "system",
            AuthorRole::Tool => "tool",
        }
    }
}

impl fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag describing the shape of a message payload.
///
/// Ordered so that sets of content types iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentType {
    Text,
    MultimodalText,
    Code,
    ExecutionOutput,
    BrowsingDisplay,
    Quote,
    SystemError,
    /// Any tag this crate does not model, kept verbatim
    Unrecognized(String),
}

impl ContentType {
    /// The tag as it appears in the export
    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Text => "text",
            ContentType::MultimodalText => "multimodal_text",
            ContentType::Code => "code",
            ContentType::ExecutionOutput => "execution_output",
            ContentType::BrowsingDisplay => "tether_browsing_display",
            ContentType::Quote => "tether_quote",
            ContentType::SystemError => "system_error",
            ContentType::Unrecognized(tag) => tag,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ContentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Message payload, one variant per content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text { parts: Vec<String> },
    MultimodalText { parts: Vec<String>, image_refs: Vec<String> },
    Code { language: Option<String>, text: String },
    ExecutionOutput { text: String },
    BrowsingDisplay { result: String },
    Quote { url: Option<String>, title: Option<String>, text: String },
    SystemError { name: String, text: String },
    Unrecognized { content_type: String },
}

impl Content {
    pub fn content_type(&self) -> ContentType {
        match self {
            Content::Text { .. } => ContentType::Text,
            Content::MultimodalText { .. } => ContentType::MultimodalText,
            Content::Code { .. } => ContentType::Code,
            Content::ExecutionOutput { .. } => ContentType::ExecutionOutput,
            Content::BrowsingDisplay { .. } => ContentType::BrowsingDisplay,
            Content::Quote { .. } => ContentType::Quote,
            Content::SystemError { .. } => ContentType::SystemError,
            Content::Unrecognized { content_type } => {
                ContentType::Unrecognized(content_type.clone())
            }
        }
    }

    /// Raw prose of the payload. Empty for everything that is not a text type.
    pub fn text(&self) -> String {
        match self {
            Content::Text { parts } | Content::MultimodalText { parts, .. } => join_parts(parts),
            _ => String::new(),
        }
    }

    /// Markdown rendering of the payload
    pub fn to_markdown(&self) -> String {
        match self {
            Content::Text { parts } => join_parts(parts),
            Content::MultimodalText { parts, image_refs } => {
                let mut out = join_parts(parts);
                for image in image_refs {
                    if !out.is_empty() {
                        out.push_str("\n\n");
                    }
                    out.push_str(&format!("![image]({})", image));
                }
                out
            }
            Content::Code { language, text } => {
                let lang = language.as_deref().filter(|l| *l != "unknown").unwrap_or("");
                format!("```{}\n{}\n```", lang, text)
            }
            Content::ExecutionOutput { text } => format!("```\n{}\n```", text),
            Content::BrowsingDisplay { result } => result.clone(),
            Content::Quote { url, title, text } => {
                let mut out =
                    text.lines().map(|line| format!("> {}", line)).collect::<Vec<_>>().join("\n");
                if let Some(url) = url {
                    let label = title.as_deref().filter(|t| !t.is_empty()).unwrap_or(url);
                    out.push_str(&format!("\n>\n> [{}]({})", label, url));
                }
                out
            }
            Content::SystemError { name, text } => format!("**{}**: {}", name, text),
            Content::Unrecognized { .. } => String::new(),
        }
    }
}

/// Joins non-empty parts with newlines so adjacent parts never run together
fn join_parts(parts: &[String]) -> String {
    parts.iter().filter(|p| !p.is_empty()).map(String::as_str).collect::<Vec<_>>().join("\n")
}
