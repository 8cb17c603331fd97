//! Data model for chat conversation exports.
//!
//! - [`MessageNode`] - one turn of a conversation
//! - [`Content`] / [`ContentType`] - closed set of payload shapes
//! - [`ConversationTree`] - a branching conversation stored as an id-indexed arena
//! - [`ConversationCollection`] - ordered, id-unique set of shared trees with
//!   sorting and calendar grouping
//! - [`RawConversation`] - serde shape of an export record
//!
//! Trees are validated on construction and immutable afterwards.

pub mod collection;
pub mod content;
pub mod node;
pub mod raw;
pub mod stats;
pub mod tree;

pub use collection::{ConversationCollection, Grouping, Period, SortKey};
pub use content::{AuthorRole, Content, ContentType};
pub use node::MessageNode;
pub use raw::RawConversation;
pub use stats::{CollectionSummary, ConversationStats};
pub use tree::{AuthorHeaders, BranchScope, ConversationMeta, ConversationTree};
