//! Ordered collections of conversations and calendar grouping.
//!
//! # Period boundaries
//!
//! Weeks start on Monday 00:00 and months on the first day 00:00. The plain
//! [`ConversationCollection::grouped_by_week`] and
//! [`ConversationCollection::grouped_by_month`] evaluate those boundaries in UTC
//! so results do not depend on the machine running them;
//! [`ConversationCollection::grouped_by`] accepts a fixed offset for callers that
//! want local calendars. Group keys are always the UTC instant the period starts.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, NaiveTime, Offset, Utc};
use rayon::prelude::*;

use super::content::AuthorRole;
use super::stats::{CollectionSummary, ConversationStats, summarize};
use super::tree::{BranchScope, ConversationTree};
use crate::error::{CollectionError, EmptyInputError};

/// Calendar period used for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Week,
    Month,
}

impl Period {
    /// UTC instant at which the period containing `time` starts, with calendar
    /// boundaries evaluated at `offset`
    ///
    /// Returns `None` when that instant falls outside the range chrono can
    /// represent, which only happens for timestamps at the calendar limits.
    pub fn start_of(&self, time: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
        let local_date = time.with_timezone(&offset).date_naive();
        let back = match self {
            Period::Week => local_date.weekday().num_days_from_monday(),
            Period::Month => local_date.day0(),
        };
        let start = local_date.checked_sub_days(Days::new(u64::from(back)))?;
        start
            .and_time(NaiveTime::MIN)
            .and_utc()
            .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Week => f.write_str("week"),
            Period::Month => f.write_str("month"),
        }
    }
}

/// Derived keys commonly used to rank conversations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    MessageCount,
    LeafCount,
    BranchPoints,
    PluginCount,
    ContentTypeCount,
    CreateTime,
    UpdateTime,
}

impl SortKey {
    /// Integer key for `tree`; missing timestamps sort before every real one
    pub fn key(&self, tree: &ConversationTree) -> i64 {
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        match self {
            SortKey::MessageCount => count(tree.message_count()),
            SortKey::LeafCount => count(tree.leaf_count()),
            SortKey::BranchPoints => count(tree.branch_point_count()),
            SortKey::PluginCount => count(tree.used_plugins().len()),
            SortKey::ContentTypeCount => count(tree.content_types().len()),
            SortKey::CreateTime => tree.create_time().map_or(i64::MIN, |t| t.timestamp_millis()),
            SortKey::UpdateTime => tree.update_time().map_or(i64::MIN, |t| t.timestamp_millis()),
        }
    }
}

/// Ordered collection of conversations with unique ids.
///
/// Members are shared (`Arc`) so filtering and grouping never copy tree data.
#[derive(Debug, Clone, Default)]
pub struct ConversationCollection {
    conversations: Vec<Arc<ConversationTree>>,
}

impl ConversationCollection {
    /// # Errors
    ///
    /// Returns [`CollectionError::DuplicateConversation`] if two trees share an id.
    pub fn new(trees: Vec<ConversationTree>) -> Result<Self, CollectionError> {
        Self::from_shared(trees.into_iter().map(Arc::new).collect())
    }

    /// Like [`ConversationCollection::new`] for trees that are already shared
    pub fn from_shared(conversations: Vec<Arc<ConversationTree>>) -> Result<Self, CollectionError> {
        let mut seen = HashSet::with_capacity(conversations.len());
        for conversation in &conversations {
            if !seen.insert(conversation.id()) {
                return Err(CollectionError::DuplicateConversation {
                    id: conversation.id().to_string(),
                });
            }
        }
        Ok(Self { conversations })
    }

    /// Members drawn from an existing collection are already unique
    fn from_members(conversations: Vec<Arc<ConversationTree>>) -> Self {
        Self { conversations }
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Members in source order
    pub fn all(&self) -> &[Arc<ConversationTree>] {
        &self.conversations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConversationTree>> {
        self.conversations.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ConversationTree>> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.conversations.iter().map(|c| c.id()).collect()
    }

    /// Sub-collection of members matching `predicate`, order preserved
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&ConversationTree) -> bool,
    {
        Self::from_members(
            self.conversations.iter().filter(|c| predicate(c)).cloned().collect(),
        )
    }

    /// Members sorted by a derived key. The sort is stable: members with equal
    /// keys keep their relative source order in both directions.
    pub fn sorted_by<K, F>(&self, key_fn: F, descending: bool) -> Vec<Arc<ConversationTree>>
    where
        K: Ord,
        F: Fn(&ConversationTree) -> K,
    {
        let mut keyed: Vec<(K, &Arc<ConversationTree>)> =
            self.conversations.iter().map(|c| (key_fn(c), c)).collect();
        if descending {
            keyed.sort_by(|a, b| b.0.cmp(&a.0));
        } else {
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
        }
        keyed.into_iter().map(|(_, c)| Arc::clone(c)).collect()
    }

    /// First `n` members of the descending sort; all members if `n` is larger
    pub fn top_n<K, F>(&self, key_fn: F, n: usize) -> Vec<Arc<ConversationTree>>
    where
        K: Ord,
        F: Fn(&ConversationTree) -> K,
    {
        let mut sorted = self.sorted_by(key_fn, true);
        sorted.truncate(n);
        sorted
    }

    pub fn grouped_by_week(&self) -> Grouping {
        self.grouped_by(Period::Week, utc_offset())
    }

    pub fn grouped_by_month(&self) -> Grouping {
        self.grouped_by(Period::Month, utc_offset())
    }

    /// Partition members by the period containing their `create_time`.
    ///
    /// Conversations without a `create_time`, or with one whose period start is
    /// not representable, are placed in no group; their ids are reported in
    /// [`Grouping::missing_timestamp`].
    pub fn grouped_by(&self, period: Period, offset: FixedOffset) -> Grouping {
        let mut buckets: BTreeMap<DateTime<Utc>, Vec<Arc<ConversationTree>>> = BTreeMap::new();
        let mut missing_timestamp = Vec::new();

        for conversation in &self.conversations {
            let start = conversation.create_time().and_then(|time| period.start_of(time, offset));
            match start {
                Some(start) => buckets.entry(start).or_default().push(Arc::clone(conversation)),
                None => missing_timestamp.push(conversation.id().to_string()),
            }
        }

        if !missing_timestamp.is_empty() {
            tracing::warn!(
                count = missing_timestamp.len(),
                %period,
                "conversations without a usable create_time excluded from grouping"
            );
        }

        Grouping {
            period,
            groups: buckets.into_iter().map(|(k, v)| (k, Self::from_members(v))).collect(),
            missing_timestamp,
        }
    }

    /// Statistics for every member, computed in parallel and returned in
    /// collection order
    pub fn stats(&self) -> Vec<ConversationStats> {
        self.conversations.par_iter().map(|c| c.stats()).collect()
    }

    /// # Errors
    ///
    /// Returns [`EmptyInputError`] for an empty collection.
    pub fn summary(&self) -> Result<CollectionSummary, EmptyInputError> {
        summarize(&self.stats())
    }

    /// Message creation times across all members
    pub fn timestamps(&self, role: Option<AuthorRole>, scope: BranchScope) -> Vec<DateTime<Utc>> {
        self.conversations.iter().flat_map(|c| c.timestamps(role, scope)).collect()
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Result of [`ConversationCollection::grouped_by`]
#[derive(Debug, Clone)]
pub struct Grouping {
    period: Period,
    groups: BTreeMap<DateTime<Utc>, ConversationCollection>,
    missing_timestamp: Vec<String>,
}

impl Grouping {
    pub fn period(&self) -> Period {
        self.period
    }

    /// Number of non-empty groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in chronological order, keyed by period start
    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &ConversationCollection)> {
        self.groups.iter()
    }

    pub fn get(&self, period_start: &DateTime<Utc>) -> Option<&ConversationCollection> {
        self.groups.get(period_start)
    }

    /// Ids of conversations left out because they have no usable `create_time`
    pub fn missing_timestamp(&self) -> &[String] {
        &self.missing_timestamp
    }

    pub fn excluded_count(&self) -> usize {
        self.missing_timestamp.len()
    }

    /// Total conversations across all groups
    pub fn grouped_count(&self) -> usize {
        self.groups.values().map(ConversationCollection::len).sum()
    }

    pub fn into_groups(self) -> BTreeMap<DateTime<Utc>, ConversationCollection> {
        self.groups
    }
}
