use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::models::{AuthorRole, BranchScope, ConversationCollection, Period};

/// Number of messages per period, keyed by period start
///
/// Unlike [`ConversationCollection::grouped_by`], which buckets whole
/// conversations by their creation time, this counts individual messages by
/// their own timestamps. Messages without a timestamp, or whose period start is
/// out of chrono's range, are not counted.
pub fn activity_by_period(
    collection: &ConversationCollection,
    period: Period,
    role: Option<AuthorRole>,
    scope: BranchScope,
) -> BTreeMap<DateTime<Utc>, usize> {
    activity_by_period_in(collection, period, role, scope, Utc.fix())
}

/// [`activity_by_period`] with periods aligned to a fixed UTC offset
pub fn activity_by_period_in(
    collection: &ConversationCollection,
    period: Period,
    role: Option<AuthorRole>,
    scope: BranchScope,
    offset: FixedOffset,
) -> BTreeMap<DateTime<Utc>, usize> {
    let mut activity = BTreeMap::new();
    let starts =
        collection.timestamps(role, scope).into_iter().filter_map(|t| period.start_of(t, offset));
    for start in starts {
        *activity.entry(start).or_insert(0) += 1;
    }
    activity
}
