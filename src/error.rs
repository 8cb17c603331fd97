//! Typed errors raised by the conversation model.
//!
//! IO and command-line code wraps these in `anyhow::Error`; library callers can
//! match on them to decide whether to skip a conversation or abort a load.

use thiserror::Error;

/// A conversation record that does not form a valid out-tree.
///
/// Raised while constructing a [`ConversationTree`](crate::models::ConversationTree);
/// the offending conversation is never materialized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("conversation record has no id")]
    MissingId,

    #[error("conversation '{conversation_id}' has no nodes")]
    Empty { conversation_id: String },

    #[error("conversation '{conversation_id}' has duplicate node id '{node_id}'")]
    DuplicateNode { conversation_id: String, node_id: String },

    #[error("conversation '{conversation_id}' has no root node")]
    MissingRoot { conversation_id: String },

    #[error("conversation '{conversation_id}' has {} root nodes: {}", roots.len(), roots.join(", "))]
    MultipleRoots { conversation_id: String, roots: Vec<String> },

    #[error(
        "conversation '{conversation_id}': node '{node_id}' references missing parent '{parent_id}'"
    )]
    DanglingParent { conversation_id: String, node_id: String, parent_id: String },

    #[error("conversation '{conversation_id}': node '{node_id}' is part of a parent cycle")]
    Cycle { conversation_id: String, node_id: String },
}

impl StructuralError {
    /// Id of the conversation the error was raised for, if it had one.
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            StructuralError::MissingId => None,
            StructuralError::Empty { conversation_id }
            | StructuralError::DuplicateNode { conversation_id, .. }
            | StructuralError::MissingRoot { conversation_id }
            | StructuralError::MultipleRoots { conversation_id, .. }
            | StructuralError::DanglingParent { conversation_id, .. }
            | StructuralError::Cycle { conversation_id, .. } => Some(conversation_id),
        }
    }
}

/// A statistic was requested over zero elements.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot compute {statistic} over an empty collection")]
pub struct EmptyInputError {
    pub statistic: &'static str,
}

/// Errors raised while assembling a [`ConversationCollection`](crate::models::ConversationCollection).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("duplicate conversation id '{id}'")]
    DuplicateConversation { id: String },

    #[error(transparent)]
    Structural(#[from] StructuralError),
}
