//! JSON parsing for chat-service conversation exports
//!
//! # Error Handling Strategy
//!
//! Parsing follows a **graceful degradation** approach:
//!
//! - **Individual record failures**: A record that does not match the expected shape
//!   (e.g. an unknown author role) is logged with `tracing::warn!` and skipped, so one
//!   bad conversation does not discard the whole export.
//!
//! - **Catastrophic failure detection**: If more than 50% of records fail, or the
//!   document is not a JSON array at all, the parser returns an error.
//!
//! - **Lenient payloads**: Unknown content types and missing timestamps are not
//!   failures; they map to [`Content::Unrecognized`](crate::models::Content) and `None`.
//!
//! Exports arrive as a zip archive; [`parse_export_archive`] reads
//! `conversations.json` from it without unpacking to disk, and
//! [`parse_export_file`] handles an already extracted copy.
//!
//! Structural validation (roots, parents, cycles) happens later, when records are
//! turned into trees by the [`loader`](crate::loader).

pub mod archive;
pub mod deserializers;
pub mod export;

pub use archive::{archive_contains_export, is_export_archive, parse_export_archive};
pub use export::{EXPORT_FILE_NAME, parse_export_file, parse_export_str};
