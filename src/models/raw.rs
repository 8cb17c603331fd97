//! Serde shapes of a `conversations.json` export record.
//!
//! These mirror the export closely and are converted into the validated
//! [`ConversationTree`] model with `TryFrom`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::content::{AuthorRole, Content};
use super::node::MessageNode;
use super::tree::{ConversationMeta, ConversationTree};
use crate::error::StructuralError;

#[derive(Debug, Clone, Deserialize)]
pub struct RawConversation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_epoch_seconds")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_epoch_seconds")]
    pub update_time: Option<DateTime<Utc>>,
    /// `(mapping key, node)` pairs in document order
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_ordered_mapping")]
    pub mapping: Vec<(String, RawNode)>,
    #[serde(default)]
    pub current_node: Option<String>,
}

impl RawConversation {
    /// Conversation id, preferring `id` over `conversation_id`
    pub fn conversation_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.conversation_id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<RawMessage>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub author: RawAuthor,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_epoch_seconds")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_content")]
    pub content: Option<Content>,
    #[serde(default)]
    pub metadata: Option<RawMetadata>,
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAuthor {
    pub role: AuthorRole,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetadata {
    #[serde(default)]
    pub model_slug: Option<String>,
    #[serde(default)]
    pub invoked_plugin: Option<RawInvokedPlugin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawInvokedPlugin {
    #[serde(default)]
    pub namespace: Option<String>,
}

impl RawNode {
    fn into_message_node(self, key: String) -> MessageNode {
        let id = self.id.filter(|id| !id.is_empty()).unwrap_or(key);
        let Some(message) = self.message else {
            return MessageNode::synthetic(id, self.parent);
        };

        let metadata = message.metadata.unwrap_or_default();
        let plugin_name = match message.author.role {
            AuthorRole::Tool => metadata.invoked_plugin.and_then(|p| p.namespace),
            _ => None,
        };

        MessageNode {
            id,
            parent_id: self.parent,
            author_role: message.author.role,
            author_name: message.author.name,
            content: message.content,
            plugin_name,
            create_time: message.create_time,
            model_slug: metadata.model_slug,
            recipient: message.recipient,
        }
    }
}

impl TryFrom<RawConversation> for ConversationTree {
    type Error = StructuralError;

    fn try_from(raw: RawConversation) -> Result<Self, Self::Error> {
        let id = raw.conversation_id().map(str::to_string).ok_or(StructuralError::MissingId)?;
        let nodes =
            raw.mapping.into_iter().map(|(key, node)| node.into_message_node(key)).collect();
        let meta = ConversationMeta {
            id,
            title: raw.title,
            create_time: raw.create_time,
            update_time: raw.update_time,
            current_node: raw.current_node,
        };
        ConversationTree::new(meta, nodes)
    }
}
