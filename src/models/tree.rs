//! Branching conversation tree.
//!
//! Nodes live in an arena (`Vec<MessageNode>`) indexed by id; parent and child
//! edges are stored as arena indices. Children keep the order in which their
//! nodes were supplied, which for exports is the order of the `mapping` object.
//!
//! # Main branch policy
//!
//! Exports do not always mark which branch is active, so [`ConversationTree::main_branch`]
//! resolves it as follows:
//!
//! 1. If the export names a `current_node` that exists in the tree, the main
//!    branch runs from the root through that node. When the node still has
//!    descendants the path continues below it as in rule 2, so the branch
//!    always ends at a leaf.
//! 2. Otherwise start at the root and, at every branch point, follow the child
//!    with the latest `create_time`. Children without a timestamp rank below any
//!    timestamped child; ties go to the child supplied last (the most recent
//!    regeneration).

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::{AuthorRole, ContentType};
use super::node::MessageNode;
use super::stats::ConversationStats;
use crate::error::StructuralError;
use crate::utils::paths::sanitize_file_stem;

const CONVERSATION_URL_BASE: &str = "https://chat.openai.com/c/";

/// Which nodes of a tree an operation looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchScope {
    /// Only the nodes on [`ConversationTree::main_branch`]
    #[default]
    MainBranch,
    /// Every node, regenerated variants included
    AllBranches,
}

/// Header line written before each message when rendering a transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorHeaders {
    pub user: String,
    pub assistant: String,
    pub system: String,
    pub tool: String,
}

impl AuthorHeaders {
    pub fn header(&self, role: AuthorRole) -> &str {
        match role {
            AuthorRole::User => &self.user,
            AuthorRole::Assistant => &self.assistant,
            AuthorRole::System => &self.system,
            AuthorRole::Tool => &self.tool,
        }
    }
}

impl Default for AuthorHeaders {
    fn default() -> Self {
        Self {
            user: "# User".to_string(),
            assistant: "# Assistant".to_string(),
            system: "### System".to_string(),
            tool: "### Tool output".to_string(),
        }
    }
}

/// Conversation-level fields supplied alongside the nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationMeta {
    pub id: String,
    pub title: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    /// Export pointer to the active leaf, if any
    pub current_node: Option<String>,
}

/// One conversation: a rooted out-tree of [`MessageNode`]s plus metadata.
///
/// Immutable once built; every accessor is a read-only view.
#[derive(Debug, Clone)]
pub struct ConversationTree {
    id: String,
    title: String,
    create_time: Option<DateTime<Utc>>,
    update_time: Option<DateTime<Utc>>,
    current_node: Option<usize>,
    nodes: Vec<MessageNode>,
    index: HashMap<String, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    root: usize,
}

impl ConversationTree {
    /// Build a tree, validating that the nodes form a single rooted out-tree.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the conversation id is empty, there are no
    /// nodes, a node id repeats, a parent reference dangles, there is not exactly
    /// one root, or some nodes are unreachable from the root (a parent cycle).
    pub fn new(meta: ConversationMeta, nodes: Vec<MessageNode>) -> Result<Self, StructuralError> {
        let id = meta.id.trim().to_string();
        if id.is_empty() {
            return Err(StructuralError::MissingId);
        }
        if nodes.is_empty() {
            return Err(StructuralError::Empty { conversation_id: id });
        }

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(StructuralError::DuplicateNode {
                    conversation_id: id,
                    node_id: node.id.clone(),
                });
            }
        }

        let mut parents = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let parent = match &node.parent_id {
                None => None,
                Some(parent_id) => match index.get(parent_id) {
                    Some(&p) => Some(p),
                    None => {
                        return Err(StructuralError::DanglingParent {
                            conversation_id: id,
                            node_id: node.id.clone(),
                            parent_id: parent_id.clone(),
                        });
                    }
                },
            };
            parents.push(parent);
        }

        let roots: Vec<usize> =
            parents.iter().enumerate().filter(|(_, p)| p.is_none()).map(|(i, _)| i).collect();
        let root = match roots.as_slice() {
            [] => return Err(StructuralError::MissingRoot { conversation_id: id }),
            [root] => *root,
            _ => {
                return Err(StructuralError::MultipleRoots {
                    conversation_id: id,
                    roots: roots.iter().map(|&i| nodes[i].id.clone()).collect(),
                });
            }
        };

        let mut children = vec![Vec::new(); nodes.len()];
        for (i, parent) in parents.iter().enumerate() {
            if let Some(p) = parent {
                children[*p].push(i);
            }
        }

        // Exactly one root and resolved parents: anything unreachable sits on a cycle
        let mut reached = vec![false; nodes.len()];
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            if reached[i] {
                continue;
            }
            reached[i] = true;
            stack.extend(children[i].iter().copied());
        }
        if let Some(i) = reached.iter().position(|r| !r) {
            return Err(StructuralError::Cycle {
                conversation_id: id,
                node_id: nodes[i].id.clone(),
            });
        }

        let current_node = match meta.current_node {
            Some(current) => {
                let resolved = index.get(&current).copied();
                if resolved.is_none() {
                    tracing::debug!(
                        conversation = %id,
                        current_node = %current,
                        "current_node not present in tree, falling back to latest-child policy"
                    );
                }
                resolved
            }
            None => None,
        };

        Ok(Self {
            id,
            title: meta.title.unwrap_or_default(),
            create_time: meta.create_time,
            update_time: meta.update_time,
            current_node,
            nodes,
            index,
            parents,
            children,
            root,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Title as exported; may be empty
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn create_time(&self) -> Option<DateTime<Utc>> {
        self.create_time
    }

    pub fn update_time(&self) -> Option<DateTime<Utc>> {
        self.update_time
    }

    pub fn url(&self) -> String {
        format!("{}{}", CONVERSATION_URL_BASE, self.id)
    }

    pub fn root(&self) -> &MessageNode {
        &self.nodes[self.root]
    }

    pub fn node(&self, id: &str) -> Option<&MessageNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// All nodes in the order they were supplied
    pub fn nodes(&self) -> impl Iterator<Item = &MessageNode> {
        self.nodes.iter()
    }

    pub fn children(&self, id: &str) -> Vec<&MessageNode> {
        match self.index.get(id) {
            Some(&i) => self.children[i].iter().map(|&c| &self.nodes[c]).collect(),
            None => Vec::new(),
        }
    }

    pub fn parent(&self, id: &str) -> Option<&MessageNode> {
        let i = *self.index.get(id)?;
        self.parents[i].map(|p| &self.nodes[p])
    }

    /// Number of nodes with no children, i.e. distinct response variants
    pub fn leaf_count(&self) -> usize {
        self.children.iter().filter(|c| c.is_empty()).count()
    }

    /// Raw structural count of every node, root and synthetic nodes included
    pub fn message_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes carrying a message authored by `role`
    pub fn message_count_by(&self, role: AuthorRole) -> usize {
        self.nodes.iter().filter(|n| n.has_payload() && n.author_role == role).count()
    }

    /// Nodes with more than one child (regeneration points)
    pub fn branch_point_count(&self) -> usize {
        self.children.iter().filter(|c| c.len() > 1).count()
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 1usize)];
        while let Some((i, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(self.children[i].iter().map(|&c| (c, depth + 1)));
        }
        deepest
    }

    /// Distinct content types over every branch
    pub fn content_types(&self) -> BTreeSet<ContentType> {
        self.content_types_in(BranchScope::AllBranches)
    }

    pub fn content_types_on_main_branch(&self) -> BTreeSet<ContentType> {
        self.content_types_in(BranchScope::MainBranch)
    }

    fn content_types_in(&self, scope: BranchScope) -> BTreeSet<ContentType> {
        self.nodes_in(scope).into_iter().filter_map(MessageNode::content_type).collect()
    }

    /// Distinct plugin names over every branch
    pub fn used_plugins(&self) -> BTreeSet<String> {
        self.used_plugins_in(BranchScope::AllBranches)
    }

    pub fn used_plugins_on_main_branch(&self) -> BTreeSet<String> {
        self.used_plugins_in(BranchScope::MainBranch)
    }

    fn used_plugins_in(&self, scope: BranchScope) -> BTreeSet<String> {
        self.nodes_in(scope).into_iter().filter_map(|n| n.plugin_name.clone()).collect()
    }

    pub fn model_slugs(&self) -> BTreeSet<String> {
        self.nodes.iter().filter_map(|n| n.model_slug.clone()).collect()
    }

    /// File-system safe stem derived from the title, falling back to the id
    pub fn sanitized_title(&self) -> String {
        let source = if self.title.trim().is_empty() { &self.id } else { &self.title };
        sanitize_file_stem(source)
    }

    /// Root-to-leaf path chosen by the module-level main branch policy
    pub fn main_branch(&self) -> Vec<&MessageNode> {
        self.main_branch_indices().into_iter().map(|i| &self.nodes[i]).collect()
    }

    fn main_branch_indices(&self) -> Vec<usize> {
        let mut path = match self.current_node {
            Some(current) => {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(parent) = self.parents[cursor] {
                    path.push(parent);
                    cursor = parent;
                }
                path.reverse();
                path
            }
            None => vec![self.root],
        };

        let mut cursor = path[path.len() - 1];
        // max_by keeps the last of equal elements, so ties resolve to the latest sibling
        while let Some(next) = self.children[cursor]
            .iter()
            .copied()
            .max_by(|&a, &b| self.nodes[a].create_time.cmp(&self.nodes[b].create_time))
        {
            path.push(next);
            cursor = next;
        }
        path
    }

    /// Nodes selected by `scope`, main branch in path order, all branches in arena order
    pub fn nodes_in(&self, scope: BranchScope) -> Vec<&MessageNode> {
        match scope {
            BranchScope::MainBranch => self.main_branch(),
            BranchScope::AllBranches => self.nodes.iter().collect(),
        }
    }

    /// Creation times of messages, optionally restricted to one author role
    pub fn timestamps(&self, role: Option<AuthorRole>, scope: BranchScope) -> Vec<DateTime<Utc>> {
        self.nodes_in(scope)
            .into_iter()
            .filter(|n| n.has_payload() && role.is_none_or(|r| n.author_role == r))
            .filter_map(|n| n.create_time)
            .collect()
    }

    /// Transcript of the main branch with the default author headers
    pub fn render_to_text(&self) -> String {
        self.render_with(&AuthorHeaders::default())
    }

    /// Transcript of the main branch. Synthetic nodes and messages that render to
    /// nothing are skipped.
    pub fn render_with(&self, headers: &AuthorHeaders) -> String {
        let mut out = String::new();
        for node in self.main_branch() {
            let Some(content) = &node.content else {
                continue;
            };
            let body = content.to_markdown();
            if body.trim().is_empty() {
                continue;
            }

            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(headers.header(node.author_role));
            if node.author_role == AuthorRole::Tool
                && let Some(name) = &node.author_name
            {
                out.push_str(&format!(" ({})", name));
            }
            out.push_str("\n\n");
            out.push_str(body.trim_end());
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    pub fn stats(&self) -> ConversationStats {
        ConversationStats {
            id: self.id.clone(),
            title: self.title.clone(),
            create_time: self.create_time,
            update_time: self.update_time,
            message_count: self.message_count(),
            leaf_count: self.leaf_count(),
            branch_points: self.branch_point_count(),
            depth: self.depth(),
            user_messages: self.message_count_by(AuthorRole::User),
            assistant_messages: self.message_count_by(AuthorRole::Assistant),
            content_types: self.content_types(),
            used_plugins: self.used_plugins(),
        }
    }
}
