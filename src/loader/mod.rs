//! Loading exports into a [`ConversationCollection`](crate::models::ConversationCollection)
//!
//! # Error Handling Strategy
//!
//! - **Record-level failures**: malformed JSON records are dropped by the
//!   [`parsers`](crate::parsers), which fail only when more than half are bad.
//!
//! - **Conversation-level failures**: records that do not form a valid tree, or
//!   repeat an earlier id, are handled by [`LoadPolicy`]. `SkipInvalid` logs and
//!   lists them in [`LoadReport::skipped`]; `Strict` aborts the load.
//!
//! - **Summary reporting**: every load logs how many conversations were kept and
//!   how many were skipped.

pub mod builder;
pub mod discovery;

pub use builder::{
    LoadPolicy, LoadReport, SkippedConversation, build_collection, load_export_file,
    load_export_str,
};
pub use discovery::{EXPORT_FILE_NAME, find_latest_export};
