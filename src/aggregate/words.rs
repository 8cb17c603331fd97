use std::collections::{HashMap, HashSet};

/// Common English words left out of word counts unless the caller supplies
/// their own list
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "don't", "down", "during", "each",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "i'm", "if", "in", "into", "is", "it", "it's",
    "its", "itself", "just", "let", "me", "more", "most", "my", "myself", "no", "nor", "not",
    "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "same", "she", "should", "so", "some", "such", "than", "that", "that's", "the",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "use", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    "your", "yours", "yourself", "yourselves",
];

/// Stop word set built from [`DEFAULT_STOPWORDS`] plus `extra`, all lowercased
pub fn stopword_set<I, S>(extra: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    DEFAULT_STOPWORDS
        .iter()
        .map(|w| w.to_string())
        .chain(extra.into_iter().map(|w| w.as_ref().to_lowercase()))
        .collect()
}

/// Lowercased word tokens of `text`
///
/// A token is a run of alphanumeric characters; an apostrophe is kept only
/// between two alphanumerics (`don't`, but not `'quoted'`).
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if (ch == '\'' || ch == '’')
            && !current.is_empty()
            && chars.peek().is_some_and(|next| next.is_alphanumeric())
        {
            current.push('\'');
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Word counts of `text`, most frequent first (ties alphabetical)
///
/// Stop words, pure numbers and words shorter than `min_len` characters are
/// dropped.
///
/// # Examples
///
/// ```
/// use chat_export_analyzer::aggregate::{stopword_set, word_frequencies};
///
/// let stopwords = stopword_set(Vec::<String>::new());
/// let counts = word_frequencies("The borrow checker checks the borrow", &stopwords, 3);
/// assert_eq!(counts[0], ("borrow".to_string(), 2));
/// ```
pub fn word_frequencies(
    text: &str,
    stopwords: &HashSet<String>,
    min_len: usize,
) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in tokenize(text) {
        if token.chars().count() < min_len
            || token.chars().all(|c| c.is_numeric())
            || stopwords.contains(&token)
        {
            continue;
        }
        *counts.entry(token).or_insert(0) += 1;
    }

    let mut frequencies: Vec<(String, usize)> = counts.into_iter().collect();
    frequencies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    frequencies
}
