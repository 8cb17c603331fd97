//! Inputs for visualisations: joined text, word counts and activity over time

pub mod text;
pub mod timeseries;
pub mod words;

pub use text::TextAggregator;
pub use timeseries::{activity_by_period, activity_by_period_in};
pub use words::{DEFAULT_STOPWORDS, stopword_set, tokenize, word_frequencies};
