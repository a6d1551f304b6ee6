//! Tree builder properties: leaf paths, depth, status aggregation and
//! child ordering.

use std::collections::BTreeSet;

use gitmarks_core::tree::{build_tree, sorted_children};
use gitmarks_core::types::{ChangeStatus, DiffRange, EntryType, GitTreeNode};

fn node(path: &str, status: ChangeStatus) -> GitTreeNode {
    GitTreeNode::new(path, EntryType::Blob, status, None)
}

fn sample() -> Vec<GitTreeNode> {
    vec![
        node("src/main.rs", ChangeStatus::Modified),
        node("src/util/mod.rs", ChangeStatus::Added),
        node("src/util/io.rs", ChangeStatus::Unmodified),
        node("README.md", ChangeStatus::Unmodified),
        node("docs/guide/intro.md", ChangeStatus::Removed),
        node("docs/guide/setup.md", ChangeStatus::Added),
    ]
}

#[test]
fn leaf_paths_match_input_and_depth_is_longest_path() {
    let tree = build_tree(&sample());
    let expected: BTreeSet<String> = sample().iter().map(|n| n.entry.path.clone()).collect();
    assert_eq!(tree.blob_paths(), expected);
    assert_eq!(tree.tree_depth, 3);
}

#[test]
fn empty_input_is_an_empty_root() {
    let tree = build_tree(&[]);
    assert!(tree.root.children.is_empty());
    assert_eq!(tree.tree_depth, 0);
    assert_eq!(tree.root.path, "");
}

#[test]
fn only_leaves_carry_sha_and_diff() {
    let flat = vec![GitTreeNode::new(
        "a/b.rs",
        EntryType::Blob,
        ChangeStatus::Modified,
        Some(vec![DiffRange { start: 1, end: 2 }]),
    )];
    let tree = build_tree(&flat);
    let dir = tree.find("a").unwrap();
    assert_eq!(dir.kind, EntryType::Tree);
    assert!(dir.sha.is_empty());
    assert!(dir.diff.is_none());
    let leaf = tree.find("a/b.rs").unwrap();
    assert_eq!(leaf.sha, "sha-a/b.rs");
    assert_eq!(leaf.diff.as_deref(), Some(&[DiffRange { start: 1, end: 2 }][..]));
}

#[test]
fn status_aggregation_is_order_independent() {
    let flat = sample();
    let forward = build_tree(&flat);
    let mut reversed = flat.clone();
    reversed.reverse();
    let backward = build_tree(&reversed);
    let mut rotated = flat.clone();
    rotated.rotate_left(2);
    let rotated = build_tree(&rotated);

    for path in ["src", "src/util", "docs", "docs/guide", "README.md"] {
        let status = forward.find(path).unwrap().status;
        assert_eq!(backward.find(path).unwrap().status, status, "{path}");
        assert_eq!(rotated.find(path).unwrap().status, status, "{path}");
    }
    assert_eq!(forward.find("src").unwrap().status, ChangeStatus::Modified);
    assert_eq!(forward.find("src/util").unwrap().status, ChangeStatus::Added);
    assert_eq!(forward.find("docs/guide").unwrap().status, ChangeStatus::Modified);
    assert_eq!(forward.find("README.md").unwrap().status, ChangeStatus::Unmodified);
}

#[test]
fn trees_sort_before_blobs_in_locale_order() {
    let flat = vec![
        node("b.py", ChangeStatus::Unmodified),
        node("A/x", ChangeStatus::Unmodified),
        node("a/y", ChangeStatus::Unmodified),
        node("Z.py", ChangeStatus::Unmodified),
    ];
    let tree = build_tree(&flat);
    let names: Vec<&str> = sorted_children(&tree.root).iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["A", "a", "b.py", "Z.py"]);
}
