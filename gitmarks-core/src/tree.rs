//! Hierarchical file tree built from the server's flat path list.
//!
//! The server returns one [`GitTreeNode`] per repository path in no particular
//! order. [`build_tree`] folds that list into a [`FileTree`] whose directories
//! carry the aggregated change status of everything beneath them.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::types::{ChangeStatus, DiffRange, EntryType, GitTreeNode};

/// One node of the derived tree. Interior nodes are always `Tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTreeNode {
    pub kind: EntryType,
    pub sha: String,
    pub name: String,
    /// Slash-joined path from the root, `""` for the root itself.
    pub path: String,
    /// Changed line ranges; only set on the final segment of an input path.
    pub diff: Option<Vec<DiffRange>>,
    pub status: ChangeStatus,
    pub children: HashMap<String, FileTreeNode>,
}

impl FileTreeNode {
    fn root() -> Self {
        Self {
            kind: EntryType::Tree,
            sha: String::new(),
            name: String::new(),
            path: String::new(),
            diff: None,
            status: ChangeStatus::Unmodified,
            children: HashMap::new(),
        }
    }

    pub fn is_blob(&self) -> bool {
        self.kind == EntryType::Blob
    }

    /// Folds an incoming status into this node's existing one.
    fn merge_status(&mut self, incoming: ChangeStatus) {
        if matches!(incoming, ChangeStatus::Unmodified | ChangeStatus::Renamed) {
            return;
        }
        if self.status == ChangeStatus::Unmodified {
            self.status = incoming;
        } else if self.status != incoming {
            self.status = ChangeStatus::Modified;
        }
    }
}

/// Result of [`build_tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTree {
    pub root: FileTreeNode,
    /// Largest segment count over all input paths.
    pub tree_depth: usize,
}

/// Builds the hierarchical tree from an unordered flat list.
///
/// Paths are split on `/` without validation, so `"a//b"` yields a node named
/// `""` between `a` and `b`.
pub fn build_tree(flat: &[GitTreeNode]) -> FileTree {
    let mut root = FileTreeNode::root();
    let mut tree_depth = 0;

    for node in flat {
        let segments: Vec<&str> = node.entry.path.split('/').collect();
        tree_depth = tree_depth.max(segments.len());
        let incoming = node.status.status;
        let last = segments.len() - 1;

        let mut level = &mut root;
        let mut path = String::new();
        for (i, seg) in segments.iter().enumerate() {
            if i > 0 {
                path.push('/');
            }
            path.push_str(seg);

            let is_leaf = i == last;
            let child = match level.children.entry((*seg).to_owned()) {
                std::collections::hash_map::Entry::Occupied(e) => {
                    let child = e.into_mut();
                    child.merge_status(incoming);
                    child
                }
                std::collections::hash_map::Entry::Vacant(e) => e.insert(FileTreeNode {
                    kind: if is_leaf { node.entry.kind } else { EntryType::Tree },
                    sha: if is_leaf { node.entry.sha.clone() } else { String::new() },
                    name: (*seg).to_owned(),
                    path: path.clone(),
                    diff: if is_leaf { node.status.diff.clone() } else { None },
                    status: incoming,
                    children: HashMap::new(),
                }),
            };
            level = child;
        }
    }

    FileTree { root, tree_depth }
}

/// Locale-style name ordering: case-insensitive first, uppercase before
/// lowercase on ties.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

/// Children of `node` in display order: directories first, then files, each
/// group sorted by [`locale_cmp`]. Computed fresh on every call.
pub fn sorted_children(node: &FileTreeNode) -> Vec<&FileTreeNode> {
    let mut children: Vec<&FileTreeNode> = node.children.values().collect();
    children.sort_by(|a, b| match (a.kind, b.kind) {
        (EntryType::Tree, EntryType::Blob) => Ordering::Less,
        (EntryType::Blob, EntryType::Tree) => Ordering::Greater,
        _ => locale_cmp(&a.name, &b.name),
    });
    children
}

/// One rendered row of the file tree panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub name: String,
    pub path: String,
    pub kind: EntryType,
    pub status: ChangeStatus,
    pub expanded: bool,
}

impl FileTree {
    /// Looks a node up by its full path.
    pub fn find(&self, path: &str) -> Option<&FileTreeNode> {
        if path.is_empty() {
            return Some(&self.root);
        }
        let mut level = &self.root;
        for seg in path.split('/') {
            level = level.children.get(seg)?;
        }
        Some(level)
    }

    /// Paths of every blob leaf.
    pub fn blob_paths(&self) -> BTreeSet<String> {
        fn walk(node: &FileTreeNode, out: &mut BTreeSet<String>) {
            if node.is_blob() {
                out.insert(node.path.clone());
            }
            for child in node.children.values() {
                walk(child, out);
            }
        }
        let mut out = BTreeSet::new();
        walk(&self.root, &mut out);
        out
    }

    /// Flattens the tree into display rows, depth-first in sorted order.
    ///
    /// Directories whose path is in `collapsed` are listed but not descended.
    pub fn visible_rows(&self, collapsed: &BTreeSet<String>) -> Vec<TreeRow> {
        fn walk(
            node: &FileTreeNode,
            depth: usize,
            collapsed: &BTreeSet<String>,
            out: &mut Vec<TreeRow>,
        ) {
            for child in sorted_children(node) {
                let expanded = !child.is_blob() && !collapsed.contains(&child.path);
                out.push(TreeRow {
                    depth,
                    name: child.name.clone(),
                    path: child.path.clone(),
                    kind: child.kind,
                    status: child.status,
                    expanded,
                });
                if expanded {
                    walk(child, depth + 1, collapsed, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.root, 0, collapsed, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(path: &str, status: ChangeStatus) -> GitTreeNode {
        GitTreeNode::new(path, EntryType::Blob, status, None)
    }

    #[test]
    fn conflicting_children_collapse_parent_to_modified() {
        let tree = build_tree(&[
            blob("src/a.py", ChangeStatus::Added),
            blob("src/b.py", ChangeStatus::Removed),
        ]);
        assert_eq!(tree.find("src").unwrap().status, ChangeStatus::Modified);
    }

    #[test]
    fn renamed_visit_leaves_existing_status() {
        let tree = build_tree(&[
            blob("src/a.py", ChangeStatus::Added),
            blob("src/b.py", ChangeStatus::Renamed),
        ]);
        assert_eq!(tree.find("src").unwrap().status, ChangeStatus::Added);
    }

    #[test]
    fn empty_segment_becomes_named_node() {
        let tree = build_tree(&[blob("a//b", ChangeStatus::Unmodified)]);
        let mid = tree.find("a").unwrap().children.get("").unwrap();
        assert_eq!(mid.kind, EntryType::Tree);
        assert_eq!(mid.path, "a/");
        assert!(tree.find("a//b").unwrap().is_blob());
        assert_eq!(tree.tree_depth, 3);
    }

    #[test]
    fn collapsed_directories_hide_descendants() {
        let tree = build_tree(&[
            blob("src/a.py", ChangeStatus::Unmodified),
            blob("README.md", ChangeStatus::Unmodified),
        ]);
        let collapsed = BTreeSet::from(["src".to_owned()]);
        let rows = tree.visible_rows(&collapsed);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["src", "README.md"]);
        assert!(!rows[0].expanded);
    }
}
