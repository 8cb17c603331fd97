use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::content::ContentType;
use crate::error::EmptyInputError;

/// Per-conversation statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationStats {
    pub id: String,
    pub title: String,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    pub message_count: usize,
    pub leaf_count: usize,
    pub branch_points: usize,
    pub depth: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub content_types: BTreeSet<ContentType>,
    pub used_plugins: BTreeSet<String>,
}

/// Aggregate figures over a whole collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSummary {
    pub conversations: usize,
    pub total_messages: usize,
    pub total_user_messages: usize,
    pub mean_messages: f64,
    pub mean_leaves: f64,
    /// Conversations with at least one regenerated response
    pub branching_conversations: usize,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub missing_timestamp: usize,
    /// Number of conversations using each plugin
    pub plugin_usage: BTreeMap<String, usize>,
    /// Number of conversations containing each content type
    pub content_type_usage: BTreeMap<String, usize>,
}

/// Arithmetic mean that refuses to invent a value for empty input
pub fn mean(values: &[f64], statistic: &'static str) -> Result<f64, EmptyInputError> {
    if values.is_empty() {
        return Err(EmptyInputError { statistic });
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Summarize per-conversation statistics
///
/// # Errors
///
/// Returns [`EmptyInputError`] when `stats` is empty.
pub fn summarize(stats: &[ConversationStats]) -> Result<CollectionSummary, EmptyInputError> {
    let message_counts: Vec<f64> = stats.iter().map(|s| s.message_count as f64).collect();
    let leaf_counts: Vec<f64> = stats.iter().map(|s| s.leaf_count as f64).collect();
    let mean_messages = mean(&message_counts, "mean message count")?;
    let mean_leaves = mean(&leaf_counts, "mean leaf count")?;

    let mut plugin_usage = BTreeMap::new();
    let mut content_type_usage = BTreeMap::new();
    for s in stats {
        for plugin in &s.used_plugins {
            *plugin_usage.entry(plugin.clone()).or_insert(0) += 1;
        }
        for content_type in &s.content_types {
            *content_type_usage.entry(content_type.to_string()).or_insert(0) += 1;
        }
    }

    Ok(CollectionSummary {
        conversations: stats.len(),
        total_messages: stats.iter().map(|s| s.message_count).sum(),
        total_user_messages: stats.iter().map(|s| s.user_messages).sum(),
        mean_messages,
        mean_leaves,
        branching_conversations: stats.iter().filter(|s| s.branch_points > 0).count(),
        earliest: stats.iter().filter_map(|s| s.create_time).min(),
        latest: stats.iter().filter_map(|s| s.create_time).max(),
        missing_timestamp: stats.iter().filter(|s| s.create_time.is_none()).count(),
        plugin_usage,
        content_type_usage,
    })
}
