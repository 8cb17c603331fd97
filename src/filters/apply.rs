use chrono::{DateTime, Days, Utc};

use super::ast::{FieldFilter, FilterExpr, FilterField, FilterOperator};
use super::parser::parse_date;
use crate::models::{ConversationCollection, ConversationTree};

/// Conversations of `collection` that match `filter`, in collection order
///
/// An empty expression matches every conversation.
pub fn apply_filters(collection: &ConversationCollection, filter: &FilterExpr) -> ConversationCollection {
    if filter.is_empty() {
        return collection.clone();
    }
    let filtered = collection.filter(|tree| matches(tree, filter));
    tracing::debug!(before = collection.len(), after = filtered.len(), "Applied filter");
    filtered
}

/// Evaluate an expression against one conversation, left to right
pub fn matches(tree: &ConversationTree, filter: &FilterExpr) -> bool {
    let Some(first) = filter.filters.first() else {
        return true;
    };

    let mut result = evaluate_field_filter(tree, first);
    for (operator, next) in filter.operators.iter().zip(filter.filters.iter().skip(1)) {
        let next_result = evaluate_field_filter(tree, next);
        result = match operator {
            FilterOperator::And => result && next_result,
            FilterOperator::Or => result || next_result,
        };
    }

    result
}

fn evaluate_field_filter(tree: &ConversationTree, filter: &FieldFilter) -> bool {
    let value = filter.value.to_lowercase();
    match filter.field {
        FilterField::Title => tree.title().to_lowercase().contains(&value),
        FilterField::Plugin => tree.used_plugins().iter().any(|p| p.to_lowercase() == value),
        FilterField::Content => tree.content_types().iter().any(|t| t.as_str() == value),
        FilterField::Model => tree.model_slugs().iter().any(|m| m.to_lowercase().contains(&value)),
        FilterField::Since => match_since(tree.create_time(), &filter.value),
        FilterField::Until => match_until(tree.create_time(), &filter.value),
    }
}

/// Created at or after midnight UTC of the date
fn match_since(created: Option<DateTime<Utc>>, value: &str) -> bool {
    let Some(start) = parse_date(value).map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc()) else {
        return false;
    };
    created.is_some_and(|t| t >= start)
}

/// Created before midnight UTC of the following day
fn match_until(created: Option<DateTime<Utc>>, value: &str) -> bool {
    let Some(end) = parse_date(value)
        .and_then(|d| d.checked_add_days(Days::new(1)))
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
    else {
        return false;
    };
    created.is_some_and(|t| t < end)
}
