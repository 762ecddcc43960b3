//! Nested tree construction from a flat repository listing.
//!
//! The listing arrives as an unordered list of `/`-delimited paths. Every
//! function here is a pure transform over that list or over the nested tree
//! built from it: nothing is mutated in place, so the sidebar can rerun any
//! of them whenever the listing or the search query changes.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntryKind
// ---------------------------------------------------------------------------

/// Whether a listing entry is a folder or a file.
///
/// Accepts the GitHub tree spellings (`tree`, `blob`) when deserializing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[serde(alias = "tree")]
    Folder,
    #[serde(alias = "blob")]
    File,
}

impl EntryKind {
    pub fn is_folder(self) -> bool {
        matches!(self, EntryKind::Folder)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Folder => "folder",
            EntryKind::File => "file",
        }
    }
}

// ---------------------------------------------------------------------------
// TreeItem / TreeNode
// ---------------------------------------------------------------------------

/// One entry of the flat listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TreeItem {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl TreeItem {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
            size: Some(size),
            sha: None,
        }
    }

    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Folder,
            size: None,
            sha: None,
        }
    }
}

/// A node of the nested tree. `path` is the full listing path and is unique
/// within a well-formed listing, so it doubles as a stable key.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: Option<u64>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// A copy of this node carrying a different set of children.
    fn with_children(&self, children: Vec<TreeNode>) -> TreeNode {
        TreeNode {
            name: self.name.clone(),
            path: self.path.clone(),
            kind: self.kind,
            size: self.size,
            children,
        }
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Everything before the last `/`, or `None` for a root-level path.
fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// The last `/`-delimited segment of `path`.
fn last_segment(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Folders before files, then by name.
fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    match (a.kind, b.kind) {
        (EntryKind::Folder, EntryKind::File) => Ordering::Less,
        (EntryKind::File, EntryKind::Folder) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    }
}

// ---------------------------------------------------------------------------
// Tree building
// ---------------------------------------------------------------------------

/// Build the nested tree from a flat listing.
///
/// Items are processed in path order, which guarantees a parent path (a strict
/// prefix of its children) is registered before any of its children. An item
/// whose parent path was never listed is attached at the root. Every input
/// item produces exactly one node; for duplicate paths the first one in path
/// order receives the children.
pub fn build_tree(items: &[TreeItem]) -> Vec<TreeNode> {
    let mut sorted: Vec<&TreeItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    // Single pass: register each path and group entries under their parent.
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(sorted.len());
    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); sorted.len()];
    let mut roots: Vec<usize> = Vec::new();

    for (idx, item) in sorted.iter().enumerate() {
        let parent = parent_path(&item.path).and_then(|p| index_of.get(p).copied());
        match parent {
            Some(parent_idx) => children_of[parent_idx].push(idx),
            None => roots.push(idx),
        }
        index_of.entry(item.path.as_str()).or_insert(idx);
    }

    let mut nodes: Vec<TreeNode> = roots
        .iter()
        .map(|&idx| assemble(idx, &sorted, &children_of))
        .collect();
    nodes.sort_by(compare_nodes);
    nodes
}

/// Recursively build the node at `idx` from the pre-computed children lists.
fn assemble(idx: usize, sorted: &[&TreeItem], children_of: &[Vec<usize>]) -> TreeNode {
    let item = sorted[idx];

    let mut children: Vec<TreeNode> = children_of[idx]
        .iter()
        .map(|&child| assemble(child, sorted, children_of))
        .collect();
    children.sort_by(compare_nodes);

    TreeNode {
        name: last_segment(&item.path).to_string(),
        path: item.path.clone(),
        kind: item.kind,
        size: item.size,
        children,
    }
}

// ---------------------------------------------------------------------------
// Tree filtering
// ---------------------------------------------------------------------------

/// Filter the tree by a case-insensitive substring of file names.
///
/// A file survives when its name matches; a folder survives only when at
/// least one descendant does, and then carries just the surviving children.
/// A blank query returns an identical copy of the tree.
pub fn filter_tree(nodes: &[TreeNode], query: &str) -> Vec<TreeNode> {
    if query.trim().is_empty() {
        return nodes.to_vec();
    }

    let query_lower = query.to_lowercase();
    nodes
        .iter()
        .filter_map(|node| filter_node(node, &query_lower))
        .collect()
}

fn filter_node(node: &TreeNode, query_lower: &str) -> Option<TreeNode> {
    match node.kind {
        EntryKind::File => node
            .name
            .to_lowercase()
            .contains(query_lower)
            .then(|| node.clone()),
        EntryKind::Folder => {
            let children: Vec<TreeNode> = node
                .children
                .iter()
                .filter_map(|child| filter_node(child, query_lower))
                .collect();

            if children.is_empty() {
                None
            } else {
                Some(node.with_children(children))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Traversal helpers
// ---------------------------------------------------------------------------

/// Pre-order list of every folder path in the tree.
pub fn collect_folder_paths(nodes: &[TreeNode]) -> Vec<String> {
    let mut out = Vec::new();
    collect_folders_into(nodes, &mut out);
    out
}

fn collect_folders_into(nodes: &[TreeNode], out: &mut Vec<String>) {
    for node in nodes {
        if node.is_folder() {
            out.push(node.path.clone());
        }
        collect_folders_into(&node.children, out);
    }
}

/// Total number of nodes, root level included.
pub fn count_nodes(nodes: &[TreeNode]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(&n.children)).sum()
}

/// Depth-first lookup of a node by its full path.
pub fn find_node<'a>(nodes: &'a [TreeNode], path: &str) -> Option<&'a TreeNode> {
    for node in nodes {
        if node.path == path {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, path) {
            return Some(found);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Expand / collapse state
// ---------------------------------------------------------------------------

/// The set of folders the user has expanded in the sidebar.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: HashSet<String>,
}

impl ExpansionState {
    /// Initial state after a load: every top-level folder is open.
    pub fn with_top_level(nodes: &[TreeNode]) -> Self {
        Self {
            expanded: nodes
                .iter()
                .filter(|n| n.is_folder())
                .map(|n| n.path.clone())
                .collect(),
        }
    }

    /// Every folder in `nodes` expanded.
    pub fn all(nodes: &[TreeNode]) -> Self {
        Self {
            expanded: collect_folder_paths(nodes).into_iter().collect(),
        }
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    /// Flip a folder open/closed. Returns whether it is now expanded.
    pub fn toggle(&mut self, path: &str) -> bool {
        if self.expanded.remove(path) {
            false
        } else {
            self.expanded.insert(path.to_string());
            true
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    /// The expansion to display: while a search is active every ancestor of
    /// a match is opened, otherwise the user's own state applies.
    pub fn effective(&self, filtered: &[TreeNode], query: &str) -> ExpansionState {
        if query.trim().is_empty() {
            self.clone()
        } else {
            ExpansionState::all(filtered)
        }
    }
}

// ---------------------------------------------------------------------------
// Visible rows
// ---------------------------------------------------------------------------

/// A single sidebar row produced by flattening the expanded part of the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibleRow {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
    pub depth: usize,
    pub is_last: bool,
    pub expanded: bool,
    /// For each ancestor level, whether more siblings follow below it (a
    /// vertical guide has to be drawn in that column).
    pub guides: Vec<bool>,
}

/// Flatten the tree into display rows, descending only into expanded folders.
pub fn visible_rows(nodes: &[TreeNode], expansion: &ExpansionState) -> Vec<VisibleRow> {
    let mut rows = Vec::new();
    let mut guides = Vec::new();
    push_rows(nodes, expansion, &mut guides, &mut rows);
    rows
}

fn push_rows(
    nodes: &[TreeNode],
    expansion: &ExpansionState,
    guides: &mut Vec<bool>,
    rows: &mut Vec<VisibleRow>,
) {
    let total = nodes.len();
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i + 1 == total;
        let expanded = node.is_folder() && expansion.is_expanded(&node.path);

        rows.push(VisibleRow {
            name: node.name.clone(),
            path: node.path.clone(),
            kind: node.kind,
            size: node.size,
            depth: guides.len(),
            is_last,
            expanded,
            guides: guides.clone(),
        });

        if expanded && !node.children.is_empty() {
            guides.push(!is_last);
            push_rows(&node.children, expansion, guides, rows);
            guides.pop();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
