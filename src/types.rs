/*!
 * Core types and data structures for context-studio
 */

use std::cmp::Ordering;
use std::path::PathBuf;

use serde::Serialize;
use strum::Display;

/// Kind of a filesystem entry in the scanned tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeKind {
    /// Directory containing other entries
    Directory,
    /// Regular file (or a symlink resolving to one)
    File,
}

/// One entry of a scanned project tree
///
/// Files and directories share this shape; `kind` tells them apart. A file
/// never has children and a directory always reports a size of zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    /// Absolute path of the entry, rooted at the canonical scan root
    pub path: PathBuf,
    /// Display name (last path component)
    pub name: String,
    /// Entry kind
    pub kind: NodeKind,
    /// Children, directories first, then case-insensitive by name
    pub children: Vec<TreeNode>,
    /// Size in bytes (files only)
    pub size_bytes: u64,
}

impl TreeNode {
    /// Create a file node
    pub fn file(path: PathBuf, name: String, size_bytes: u64) -> Self {
        Self {
            path,
            name,
            kind: NodeKind::File,
            children: Vec::new(),
            size_bytes,
        }
    }

    /// Create a directory node, sorting its children into display order
    pub fn directory(path: PathBuf, name: String, mut children: Vec<TreeNode>) -> Self {
        children.sort_by(sibling_order);
        Self {
            path,
            name,
            kind: NodeKind::Directory,
            children,
            size_bytes: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Number of files anywhere below (or at) this node
    pub fn file_count(&self) -> usize {
        match self.kind {
            NodeKind::File => 1,
            NodeKind::Directory => self.children.iter().map(TreeNode::file_count).sum(),
        }
    }

    /// Total size of all files below (or at) this node
    pub fn total_size(&self) -> u64 {
        match self.kind {
            NodeKind::File => self.size_bytes,
            NodeKind::Directory => self.children.iter().map(TreeNode::total_size).sum(),
        }
    }

    /// Pre-order traversal, yielding each node with its depth (root = 0)
    pub fn walk(&self) -> impl Iterator<Item = (usize, &TreeNode)> {
        let mut stack = vec![(0usize, self)];
        std::iter::from_fn(move || {
            let (depth, node) = stack.pop()?;
            stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
            Some((depth, node))
        })
    }
}

/// Sort key for siblings: directories before files, then by lowercase name.
/// Ties on the lowercase name fall back to the raw name so the order is total.
pub fn sibling_key(kind: NodeKind, name: &str) -> (u8, String, &str) {
    let rank = match kind {
        NodeKind::Directory => 0,
        NodeKind::File => 1,
    };
    (rank, name.to_lowercase(), name)
}

/// Sibling ordering of two nodes, see [`sibling_key`]
pub fn sibling_order(a: &TreeNode, b: &TreeNode) -> Ordering {
    sibling_key(a.kind, &a.name).cmp(&sibling_key(b.kind, &b.name))
}

/// Tri-state selection of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SelectionState {
    #[default]
    Unchecked,
    Checked,
    /// Some, but not all, descendant files are checked
    Partial,
}

/// Why an entry was left out of the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
#[strum(serialize_all = "snake_case")]
pub enum DiagnosticReason {
    /// Reading the entry or its metadata was not permitted
    PermissionDenied,
    /// A symlink (or mount) led back to an already visited directory
    SymlinkCycle,
    /// A symlink whose target does not exist
    BrokenSymlink,
    /// A symlink to a directory that is already part of the tree
    DuplicateLink,
    /// Sockets, fifos and other non-regular entries
    UnsupportedType,
    /// Any other I/O failure
    Io(String),
}

/// Non-fatal note about an entry skipped during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Path of the skipped entry
    pub path: PathBuf,
    /// Reason it was skipped
    pub reason: DiagnosticReason,
}

impl Diagnostic {
    pub fn new(path: PathBuf, reason: DiagnosticReason) -> Self {
        Self { path, reason }
    }
}

/// Flattened node as handed to a view for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub path: PathBuf,
    pub name: String,
    pub kind: NodeKind,
    pub state: SelectionState,
    /// Nesting depth, root = 0
    pub depth: usize,
}
