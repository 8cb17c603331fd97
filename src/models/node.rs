use chrono::{DateTime, Utc};

use super::content::{AuthorRole, Content, ContentType};

/// A single turn in a conversation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub author_role: AuthorRole,
    /// Tool name for tool messages (e.g. `browser`, `python`)
    pub author_name: Option<String>,
    /// `None` for synthetic nodes that carry no message
    pub content: Option<Content>,
    /// Only set on plugin-invocation results
    pub plugin_name: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub model_slug: Option<String>,
    pub recipient: Option<String>,
}

impl MessageNode {
    /// A payload-less node, such as the synthetic root most exports start with
    pub fn synthetic(id: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            parent_id,
            author_role: AuthorRole::System,
            author_name: None,
            content: None,
            plugin_name: None,
            create_time: None,
            model_slug: None,
            recipient: None,
        }
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.content.as_ref().map(Content::content_type)
    }

    /// Raw textual payload, empty for synthetic and non-text nodes
    pub fn text(&self) -> String {
        self.content.as_ref().map(Content::text).unwrap_or_default()
    }

    pub fn has_payload(&self) -> bool {
        self.content.is_some()
    }
}
