use std::fmt;

/// Conversation attributes a filter term can test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    /// Case-insensitive substring of the title
    Title,
    /// A plugin used anywhere in the conversation (case-insensitive exact)
    Plugin,
    /// A content-type tag present in the conversation (`code`, `tether_quote`, ...)
    Content,
    /// Case-insensitive substring of any model slug
    Model,
    /// Created on or after a date (YYYY-MM-DD, UTC)
    Since,
    /// Created on or before a date (YYYY-MM-DD, UTC)
    Until,
}

impl FilterField {
    pub const NAMES: &'static [&'static str] =
        &["title", "plugin", "content", "model", "since", "until"];

    pub fn name(&self) -> &'static str {
        match self {
            FilterField::Title => "title",
            FilterField::Plugin => "plugin",
            FilterField::Content => "content",
            FilterField::Model => "model",
            FilterField::Since => "since",
            FilterField::Until => "until",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "title" => Some(FilterField::Title),
            "plugin" => Some(FilterField::Plugin),
            "content" => Some(FilterField::Content),
            "model" => Some(FilterField::Model),
            "since" => Some(FilterField::Since),
            "until" => Some(FilterField::Until),
            _ => None,
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, FilterField::Since | FilterField::Until)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical operators for combining filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Both conditions must match (default between different fields)
    And,
    /// Either condition matches (default within same field)
    Or,
}

/// Single field:value term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: FilterField,
    pub value: String,
}

impl FieldFilter {
    pub fn new(field: FilterField, value: impl Into<String>) -> Self {
        Self { field, value: value.into() }
    }
}

/// Terms joined by operators, evaluated left to right
///
/// No parentheses:
/// - Same-field terms are OR'd together: plugin:a plugin:b → (a OR b)
/// - Cross-field terms are AND'd together: plugin:a content:code → (a AND code)
/// - Explicit operators override defaults
///
/// Invariant: `operators.len() == filters.len() - 1` for a non-empty expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterExpr {
    pub filters: Vec<FieldFilter>,
    pub operators: Vec<FilterOperator>,
}

impl FilterExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: FieldFilter) {
        self.filters.push(filter);
    }

    pub fn add_operator(&mut self, operator: FilterOperator) {
        self.operators.push(operator);
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
