/*!
 * Tri-state selection over a scanned tree
 *
 * Nodes are flattened into an arena in pre-order, so every subtree occupies
 * a contiguous index range and walking that range backwards visits children
 * before their parents. Directory states are never set directly: they are
 * recomputed from their direct children after every mutation.
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glob_match::glob_match;

use crate::error::SelectionError;
use crate::types::{NodeKind, NodeView, SelectionState, TreeNode};
use crate::utils::display_path;

/// One arena entry
#[derive(Debug, Clone)]
struct Slot {
    path: PathBuf,
    name: String,
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
    /// One past the last index of this node's subtree
    end: usize,
    /// Number of files in this subtree
    files: usize,
    depth: usize,
    state: SelectionState,
}

/// Selection state for every node of one scanned tree
#[derive(Debug, Clone)]
pub struct SelectionTree {
    slots: Vec<Slot>,
    index: HashMap<PathBuf, usize>,
}

impl SelectionTree {
    /// Build a selection over `root` with every node unchecked
    pub fn build(root: &TreeNode) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            index: HashMap::new(),
        };
        tree.push_node(root, None, 0);
        tree
    }

    fn push_node(&mut self, node: &TreeNode, parent: Option<usize>, depth: usize) -> usize {
        let idx = self.slots.len();
        self.slots.push(Slot {
            path: node.path.clone(),
            name: node.name.clone(),
            kind: node.kind,
            parent,
            children: Vec::with_capacity(node.children.len()),
            end: idx + 1,
            files: usize::from(node.is_file()),
            depth,
            state: SelectionState::Unchecked,
        });
        self.index.insert(node.path.clone(), idx);

        for child in &node.children {
            let child_idx = self.push_node(child, Some(idx), depth + 1);
            self.slots[idx].files += self.slots[child_idx].files;
            self.slots[idx].children.push(child_idx);
        }
        self.slots[idx].end = self.slots.len();
        idx
    }

    /// Path of the tree root
    pub fn root_path(&self) -> &Path {
        &self.slots[0].path
    }

    /// Number of nodes, directories included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    fn lookup(&self, path: &Path) -> Result<usize, SelectionError> {
        self.index
            .get(path)
            .copied()
            .ok_or_else(|| SelectionError::NodeNotFound(path.to_path_buf()))
    }

    /// Current state of the node at `path`
    pub fn state_of(&self, path: &Path) -> Result<SelectionState, SelectionError> {
        Ok(self.slots[self.lookup(path)?].state)
    }

    /// Check the node and its whole subtree, unless it is already fully
    /// checked, in which case uncheck it. Ancestors are recomputed.
    pub fn toggle(&mut self, path: &Path) -> Result<(), SelectionError> {
        let idx = self.lookup(path)?;
        let target = match self.slots[idx].state {
            SelectionState::Checked => SelectionState::Unchecked,
            SelectionState::Unchecked | SelectionState::Partial => SelectionState::Checked,
        };
        self.apply(idx, target);
        tracing::debug!(path = %path.display(), state = %self.slots[idx].state, "Toggled node");
        Ok(())
    }

    /// Explicitly check or uncheck the node at `path` and its subtree
    pub fn set_checked(&mut self, path: &Path, checked: bool) -> Result<(), SelectionError> {
        let idx = self.lookup(path)?;
        let target = if checked {
            SelectionState::Checked
        } else {
            SelectionState::Unchecked
        };
        self.apply(idx, target);
        Ok(())
    }

    /// Check every node
    pub fn select_all(&mut self) {
        if !self.slots.is_empty() {
            self.fill_subtree(0, SelectionState::Checked);
        }
    }

    /// Uncheck every node
    pub fn clear_all(&mut self) {
        if !self.slots.is_empty() {
            self.fill_subtree(0, SelectionState::Unchecked);
        }
    }

    /// Check every file whose root-relative path, or the path of one of its
    /// directories, matches `pattern`. Returns how many files matched.
    pub fn select_matching(&mut self, pattern: &str) -> usize {
        let root = self.root_path().to_path_buf();
        let mut matched = vec![false; self.slots.len()];
        let mut count = 0;

        for idx in 0..self.slots.len() {
            let inherited = self.slots[idx].parent.is_some_and(|p| matched[p]);
            matched[idx] = inherited
                || display_path(&self.slots[idx].path, &root)
                    .is_some_and(|rel| glob_match(pattern, &rel));
            if matched[idx] && self.slots[idx].kind == NodeKind::File {
                self.slots[idx].state = SelectionState::Checked;
                count += 1;
            }
        }

        self.recompute_subtree(0);
        tracing::debug!(pattern, count, "Selected matching files");
        count
    }

    /// Checked files in pre-order; directories never appear
    pub fn resolve(&self) -> Vec<PathBuf> {
        self.slots
            .iter()
            .filter(|s| s.kind == NodeKind::File && s.state == SelectionState::Checked)
            .map(|s| s.path.clone())
            .collect()
    }

    /// Number of checked files
    pub fn checked_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.kind == NodeKind::File && s.state == SelectionState::Checked)
            .count()
    }

    /// All nodes in pre-order, ready for rendering
    pub fn nodes(&self) -> impl Iterator<Item = NodeView> + '_ {
        self.slots.iter().map(|s| NodeView {
            path: s.path.clone(),
            name: s.name.clone(),
            kind: s.kind,
            state: s.state,
            depth: s.depth,
        })
    }

    fn apply(&mut self, idx: usize, target: SelectionState) {
        self.fill_subtree(idx, target);

        let mut parent = self.slots[idx].parent;
        while let Some(p) = parent {
            self.recompute(p);
            parent = self.slots[p].parent;
        }
    }

    /// Set every file under `idx` to `target` and settle the directories
    fn fill_subtree(&mut self, idx: usize, target: SelectionState) {
        for i in (idx..self.slots[idx].end).rev() {
            match self.slots[i].kind {
                NodeKind::File => self.slots[i].state = target,
                NodeKind::Directory => self.recompute(i),
            }
        }
    }

    fn recompute_subtree(&mut self, idx: usize) {
        for i in (idx..self.slots[idx].end).rev() {
            if self.slots[i].kind == NodeKind::Directory {
                self.recompute(i);
            }
        }
    }

    /// Derive a directory's state from its direct children.
    ///
    /// Children without any file below them carry no selection and are
    /// ignored; a directory with no file below it is unchecked.
    fn recompute(&mut self, idx: usize) {
        let mut any_checked = false;
        let mut any_unchecked = false;
        for &child in &self.slots[idx].children {
            let child = &self.slots[child];
            if child.files == 0 {
                continue;
            }
            match child.state {
                SelectionState::Checked => any_checked = true,
                SelectionState::Unchecked => any_unchecked = true,
                SelectionState::Partial => {
                    any_checked = true;
                    any_unchecked = true;
                }
            }
        }

        self.slots[idx].state = match (any_checked, any_unchecked) {
            (true, false) => SelectionState::Checked,
            (true, true) => SelectionState::Partial,
            (false, _) => SelectionState::Unchecked,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/project")
    }

    fn file(rel: &str) -> TreeNode {
        let path = root().join(rel);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        TreeNode::file(path, name, 1)
    }

    fn dir(rel: &str, children: Vec<TreeNode>) -> TreeNode {
        let path = root().join(rel);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        TreeNode::directory(path, name, children)
    }

    /// project/
    ///   src/
    ///     util/
    ///       fmt.rs
    ///     lib.rs
    ///     main.rs
    ///   empty/
    ///   README.md
    fn sample() -> TreeNode {
        dir(
            "",
            vec![
                file("README.md"),
                dir("empty", vec![]),
                dir(
                    "src",
                    vec![
                        file("src/main.rs"),
                        file("src/lib.rs"),
                        dir("src/util", vec![file("src/util/fmt.rs")]),
                    ],
                ),
            ],
        )
    }

    fn p(rel: &str) -> PathBuf {
        root().join(rel)
    }

    fn state(tree: &SelectionTree, rel: &str) -> SelectionState {
        tree.state_of(&p(rel)).unwrap()
    }

    fn snapshot(tree: &SelectionTree) -> Vec<(PathBuf, SelectionState)> {
        tree.nodes().map(|n| (n.path, n.state)).collect()
    }

    /// Every directory's state must match the states of all files below it
    fn assert_consistent(tree: &SelectionTree, node: &TreeNode) {
        let mut checked = 0;
        let mut total = 0;
        for (_, n) in node.walk() {
            if n.is_file() {
                total += 1;
                let s = tree.state_of(&n.path).unwrap();
                assert_ne!(s, SelectionState::Partial, "file {:?} is partial", n.path);
                if s == SelectionState::Checked {
                    checked += 1;
                }
            }
        }
        let expected = if total > 0 && checked == total {
            SelectionState::Checked
        } else if checked == 0 {
            SelectionState::Unchecked
        } else {
            SelectionState::Partial
        };
        assert_eq!(tree.state_of(&node.path).unwrap(), expected, "at {:?}", node.path);
        for child in &node.children {
            assert_consistent(tree, child);
        }
    }

    #[test]
    fn test_build_starts_unchecked() {
        let tree = SelectionTree::build(&sample());
        assert_eq!(tree.len(), 8);
        assert!(tree.nodes().all(|n| n.state == SelectionState::Unchecked));
        assert!(tree.resolve().is_empty());
        assert_eq!(tree.root_path(), root().as_path());
    }

    #[test]
    fn test_toggle_directory_selects_subtree() {
        let mut tree = SelectionTree::build(&sample());
        tree.toggle(&p("src")).unwrap();

        assert_eq!(state(&tree, "src"), SelectionState::Checked);
        assert_eq!(state(&tree, "src/util"), SelectionState::Checked);
        assert_eq!(state(&tree, ""), SelectionState::Partial);
        assert_eq!(
            tree.resolve(),
            vec![p("src/util/fmt.rs"), p("src/lib.rs"), p("src/main.rs")]
        );
        assert_consistent(&tree, &sample());
    }

    #[test]
    fn test_toggle_leaf_marks_ancestors_partial() {
        let mut tree = SelectionTree::build(&sample());
        tree.toggle(&p("src/lib.rs")).unwrap();

        assert_eq!(state(&tree, "src/lib.rs"), SelectionState::Checked);
        assert_eq!(state(&tree, "src"), SelectionState::Partial);
        assert_eq!(state(&tree, ""), SelectionState::Partial);
        assert_eq!(state(&tree, "src/util"), SelectionState::Unchecked);
        assert_eq!(tree.resolve(), vec![p("src/lib.rs")]);
    }

    #[test]
    fn test_only_child_makes_parent_checked() {
        let mut tree = SelectionTree::build(&sample());
        tree.toggle(&p("src/util/fmt.rs")).unwrap();
        assert_eq!(state(&tree, "src/util"), SelectionState::Checked);
        assert_eq!(state(&tree, "src"), SelectionState::Partial);
    }

    #[test]
    fn test_partial_directory_toggles_to_checked() {
        let mut tree = SelectionTree::build(&sample());
        tree.toggle(&p("src/main.rs")).unwrap();
        tree.toggle(&p("src")).unwrap();
        assert_eq!(state(&tree, "src"), SelectionState::Checked);
        tree.toggle(&p("src")).unwrap();
        assert_eq!(state(&tree, "src"), SelectionState::Unchecked);
        assert_eq!(state(&tree, "src/main.rs"), SelectionState::Unchecked);
    }

    #[test]
    fn test_double_toggle_restores_everything() {
        let mut tree = SelectionTree::build(&sample());
        tree.toggle(&p("README.md")).unwrap();
        tree.toggle(&p("src/util")).unwrap();

        let before = snapshot(&tree);
        for rel in ["src/main.rs", "src/util/fmt.rs", "src/util", "README.md", "empty"] {
            tree.toggle(&p(rel)).unwrap();
            tree.toggle(&p(rel)).unwrap();
            assert_eq!(snapshot(&tree), before, "double toggle of {:?}", rel);
        }
    }

    #[test]
    fn test_empty_directories_stay_unchecked() {
        let mut tree = SelectionTree::build(&sample());
        tree.toggle(&p("empty")).unwrap();
        assert_eq!(state(&tree, "empty"), SelectionState::Unchecked);
        assert_eq!(state(&tree, ""), SelectionState::Unchecked);

        // The empty child does not block the root from becoming fully checked
        tree.toggle(&p("")).unwrap();
        assert_eq!(state(&tree, ""), SelectionState::Checked);
        assert_eq!(state(&tree, "empty"), SelectionState::Unchecked);
        tree.toggle(&p("")).unwrap();
        assert_eq!(state(&tree, ""), SelectionState::Unchecked);
    }

    #[test]
    fn test_unknown_path_is_node_not_found() {
        let mut tree = SelectionTree::build(&sample());
        let stale = p("src/deleted.rs");
        assert_eq!(
            tree.toggle(&stale),
            Err(SelectionError::NodeNotFound(stale.clone()))
        );
        assert_eq!(
            tree.state_of(&stale),
            Err(SelectionError::NodeNotFound(stale))
        );
    }

    #[test]
    fn test_select_all_and_clear_all() {
        let mut tree = SelectionTree::build(&sample());
        tree.select_all();
        assert_eq!(tree.checked_count(), 4);
        assert_eq!(state(&tree, ""), SelectionState::Checked);
        assert_eq!(state(&tree, "empty"), SelectionState::Unchecked);
        assert_consistent(&tree, &sample());

        tree.clear_all();
        assert!(tree.resolve().is_empty());
        assert!(tree.nodes().all(|n| n.state == SelectionState::Unchecked));
    }

    #[test]
    fn test_set_checked() {
        let mut tree = SelectionTree::build(&sample());
        tree.set_checked(&p("src"), true).unwrap();
        tree.set_checked(&p("src"), true).unwrap();
        assert_eq!(state(&tree, "src"), SelectionState::Checked);
        tree.set_checked(&p("src/lib.rs"), false).unwrap();
        assert_eq!(state(&tree, "src"), SelectionState::Partial);
    }

    #[test]
    fn test_select_matching() {
        let mut tree = SelectionTree::build(&sample());
        assert_eq!(tree.select_matching("**/*.rs"), 3);
        assert_eq!(state(&tree, "src"), SelectionState::Checked);
        assert_eq!(state(&tree, "README.md"), SelectionState::Unchecked);

        tree.clear_all();
        assert_eq!(tree.select_matching("src/util"), 1);
        assert_eq!(tree.resolve(), vec![p("src/util/fmt.rs")]);
        assert_consistent(&tree, &sample());
    }

    #[test]
    fn test_random_toggles_stay_consistent() {
        let sample = sample();
        let paths: Vec<PathBuf> = sample.walk().map(|(_, n)| n.path.clone()).collect();
        let mut tree = SelectionTree::build(&sample);

        // Small LCG keeps the sequence deterministic
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        for _ in 0..200 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let path = &paths[(seed >> 33) as usize % paths.len()];
            tree.toggle(path).unwrap();
            assert_consistent(&tree, &sample);

            let resolved = tree.resolve();
            let mut deduped = resolved.clone();
            deduped.dedup();
            assert_eq!(resolved, deduped);
            for path in &resolved {
                assert_eq!(tree.state_of(path).unwrap(), SelectionState::Checked);
            }
        }
    }

    #[test]
    fn test_nodes_carry_depth() {
        let tree = SelectionTree::build(&sample());
        let views: Vec<(String, usize)> = tree.nodes().map(|n| (n.name, n.depth)).collect();
        assert_eq!(
            views,
            vec![
                ("project".to_string(), 0),
                ("empty".to_string(), 1),
                ("src".to_string(), 1),
                ("util".to_string(), 2),
                ("fmt.rs".to_string(), 3),
                ("lib.rs".to_string(), 2),
                ("main.rs".to_string(), 2),
                ("README.md".to_string(), 1),
            ]
        );
    }
}
