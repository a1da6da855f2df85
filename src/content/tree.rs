//! Repository tree builder.
//!
//! The tree of one checkin is an arena of [`TreeNode`]s. Links between
//! nodes (parent, first/last child, siblings) are indices into the arena, so
//! the whole structure is a single `Vec` with no shared ownership.
//!
//! The arena is built once from the manifest's path-sorted file cards. The
//! view then works with [`TreeObject`]s: materialized, sorted listings of a
//! single directory that exist only while that directory is on screen.

use crate::model::ArtifactId;
use crate::repo::{FileCard, Manifest, Permission};

/// Index of a node in a [`RepositoryTree`].
pub type NodeId = usize;

/// The root directory node.
pub const ROOT: NodeId = 0;

/// One file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Last path component.
    pub name: String,
    /// Full path from the repository root; empty for the root.
    pub path: String,
    /// File content id; `None` for directories.
    pub id: Option<ArtifactId>,
    /// File permission.
    pub perm: Permission,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    next: Option<NodeId>,
    prev: Option<NodeId>,
}

impl TreeNode {
    fn new(name: &str, path: &str, card: Option<&FileCard>) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            id: card.map(|c| c.id.clone()),
            perm: card.map(|c| c.perm).unwrap_or_default(),
            parent: None,
            first_child: None,
            last_child: None,
            next: None,
            prev: None,
        }
    }

    /// Whether this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.id.is_none()
    }

    /// Parent directory.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Whether `dir` is a proper directory prefix of `path`.
fn contains(dir: &str, path: &str) -> bool {
    dir.is_empty()
        || (path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/')
}

/// Node arena for one checkin.
#[derive(Debug, Clone)]
pub struct RepositoryTree {
    checkin: ArtifactId,
    nodes: Vec<TreeNode>,
}

impl RepositoryTree {
    /// Build the tree of `manifest`.
    pub fn build(manifest: &Manifest) -> Self {
        let mut tree = Self {
            checkin: manifest.id.clone(),
            nodes: vec![TreeNode::new("", "", None)],
        };
        let mut last = ROOT;
        for card in &manifest.cards {
            // Cards are path-sorted, so the parent is an ancestor of the
            // most recently inserted node.
            let mut cur = last;
            while !contains(&tree.nodes[cur].path, &card.path) {
                cur = tree.nodes[cur].parent.unwrap_or(ROOT);
            }
            let base = tree.nodes[cur].path.len();
            let rest = if base == 0 {
                card.path.as_str()
            } else {
                &card.path[base + 1..]
            };
            let mut offset = card.path.len() - rest.len();
            let mut components = rest.split('/').peekable();
            while let Some(name) = components.next() {
                let end = offset + name.len();
                let path = &card.path[..end];
                offset = end + 1;
                let is_leaf = components.peek().is_none();
                cur = tree.push(cur, TreeNode::new(name, path, is_leaf.then_some(card)));
            }
            last = cur;
        }
        tree
    }

    fn push(&mut self, parent: NodeId, mut node: TreeNode) -> NodeId {
        let id = self.nodes.len();
        node.parent = Some(parent);
        node.prev = self.nodes[parent].last_child;
        match self.nodes[parent].last_child {
            Some(prev) => self.nodes[prev].next = Some(id),
            None => self.nodes[parent].first_child = Some(id),
        }
        self.nodes[parent].last_child = Some(id);
        self.nodes.push(node);
        id
    }

    /// Checkin the tree was built from.
    pub fn checkin(&self) -> &ArtifactId {
        &self.checkin
    }

    /// Node by index.
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Number of nodes, the root excluded.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Whether the checkin has no files.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of file nodes.
    pub fn file_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_dir()).count()
    }

    /// Number of directory nodes, the root excluded.
    pub fn dir_count(&self) -> usize {
        self.len() - self.file_count()
    }

    /// Children of `dir` in sibling order.
    pub fn children(&self, dir: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let first = self.nodes.get(dir).and_then(|n| n.first_child);
        std::iter::successors(first, move |&id| self.nodes[id].next)
    }

    /// Node for `path`, walking down from the root one component at a time.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Some(ROOT);
        }
        path.split('/').try_fold(ROOT, |dir, name| {
            self.children(dir).find(|&child| self.nodes[child].name == name)
        })
    }

    /// Materialize the listing of directory `dir`.
    pub fn materialize(&self, dir: NodeId) -> Option<TreeObject> {
        let node = self.nodes.get(dir).filter(|n| n.is_dir())?;
        let mut entries: Vec<TreeEntry> = self
            .children(dir)
            .map(|id| {
                let child = &self.nodes[id];
                TreeEntry {
                    node: id,
                    name: child.name.clone(),
                    path: child.path.clone(),
                    id: child.id.clone(),
                    perm: child.perm,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Some(TreeObject {
            dir,
            path: node.path.clone(),
            entries,
        })
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Node in the arena.
    pub node: NodeId,
    /// Display name.
    pub name: String,
    /// Full path.
    pub path: String,
    /// File id; `None` for directories.
    pub id: Option<ArtifactId>,
    /// Permission.
    pub perm: Permission,
}

impl TreeEntry {
    /// Whether the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.id.is_none()
    }
}

/// Sorted listing of one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeObject {
    /// Directory node.
    pub dir: NodeId,
    /// Directory path; empty for the root.
    pub path: String,
    /// Entries sorted by path.
    pub entries: Vec<TreeEntry>,
}

/// A directory the user descended from.
#[derive(Debug, Clone)]
pub struct ParentFrame {
    /// The parent listing.
    pub object: TreeObject,
    /// Entry selected when descending.
    pub selected: usize,
    /// Scroll offset when descending.
    pub offset: usize,
}
