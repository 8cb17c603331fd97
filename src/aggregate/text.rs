use crate::models::{AuthorRole, BranchScope, ConversationCollection, ConversationTree};

/// Collects the textual payload of a collection into one string, typically as
/// input for word counts or a word cloud
///
/// By default only main-branch messages are used so regenerated answers are not
/// counted twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextAggregator {
    scope: BranchScope,
    role: Option<AuthorRole>,
}

impl TextAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: BranchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Restrict to messages written by `role`
    pub fn with_role(mut self, role: AuthorRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn scope(&self) -> BranchScope {
        self.scope
    }

    pub fn role(&self) -> Option<AuthorRole> {
        self.role
    }

    /// Non-empty message texts of every conversation, in collection order and
    /// then node order, joined with `"\n"`
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_export_analyzer::aggregate::TextAggregator;
    /// use chat_export_analyzer::models::ConversationCollection;
    ///
    /// let empty = ConversationCollection::default();
    /// assert_eq!(TextAggregator::new().aggregate_text(&empty), "");
    /// ```
    pub fn aggregate_text(&self, collection: &ConversationCollection) -> String {
        let texts: Vec<String> =
            collection.iter().flat_map(|tree| self.texts_of(tree)).collect();
        texts.join("\n")
    }

    /// Same as [`TextAggregator::aggregate_text`] for a single conversation
    pub fn aggregate_tree(&self, tree: &ConversationTree) -> String {
        self.texts_of(tree).join("\n")
    }

    fn texts_of(&self, tree: &ConversationTree) -> Vec<String> {
        tree.nodes_in(self.scope)
            .into_iter()
            .filter(|node| self.role.is_none_or(|role| node.author_role == role))
            .map(|node| node.text())
            .filter(|text| !text.is_empty())
            .collect()
    }
}
