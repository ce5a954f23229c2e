//! Hierarchical view of archive entries.

use std::fmt::Write as _;

use super::names::EntryName;

/// A node in the [`NameTree`].
///
/// A node may carry an entry and children at the same time, so an entry
/// stored as `a` and another stored as `a\b` can coexist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    entry: Option<usize>,
    children: Vec<(String, Node)>,
}

impl Node {
    /// Record index held by this node, if any.
    pub fn entry(&self) -> Option<usize> {
        self.entry
    }

    /// Children in first-insertion order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|(child, _)| child == name)
            .map(|(_, node)| node)
    }

    fn child_mut_or_insert(&mut self, name: &str) -> &mut Node {
        let pos = match self.children.iter().position(|(child, _)| child == name) {
            Some(pos) => pos,
            None => {
                self.children.push((name.to_string(), Node::default()));
                self.children.len() - 1
            }
        };
        &mut self.children[pos].1
    }
}

/// Entries grouped by path segment.
///
/// Built once from the resolved entry names and never modified; rebuild it
/// when the archive changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTree {
    root: Node,
    leaves: usize,
}

impl NameTree {
    /// Build a tree from names given in record index order.
    ///
    /// Names are expected to be unique, as produced by
    /// [`NameResolver`](super::NameResolver); a repeated name keeps the first
    /// entry.
    pub fn build<'a>(names: impl IntoIterator<Item = &'a EntryName>) -> Self {
        let mut tree = Self::default();
        for (index, name) in names.into_iter().enumerate() {
            let node = name
                .segments()
                .iter()
                .fold(&mut tree.root, |node, segment| node.child_mut_or_insert(segment));
            if node.entry.is_none() {
                node.entry = Some(index);
                tree.leaves += 1;
            }
        }
        tree
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of nodes holding an entry.
    pub fn leaf_count(&self) -> usize {
        self.leaves
    }

    /// Look up the entry stored at `path`.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<usize> {
        path.iter()
            .try_fold(&self.root, |node, segment| node.child(segment.as_ref()))
            .and_then(Node::entry)
    }

    /// All `(path, index)` pairs, depth first in insertion order.
    pub fn leaves(&self) -> Vec<(String, usize)> {
        fn walk(node: &Node, prefix: &str, out: &mut Vec<(String, usize)>) {
            for (name, child) in node.children() {
                let path = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{prefix}/{name}")
                };
                if let Some(index) = child.entry() {
                    out.push((path.clone(), index));
                }
                walk(child, &path, out);
            }
        }

        let mut out = Vec::with_capacity(self.leaves);
        walk(&self.root, "", &mut out);
        out
    }

    /// Indented text listing, one node per line.
    pub fn render(&self) -> String {
        fn walk(node: &Node, depth: usize, out: &mut String) {
            for (name, child) in node.children() {
                let _ = write!(out, "{}+ {name}", "| ".repeat(depth));
                if let Some(index) = child.entry() {
                    let _ = write!(out, "  [{index}]");
                }
                out.push('\n');
                walk(child, depth + 1, out);
            }
        }

        let mut out = String::new();
        walk(&self.root, 0, &mut out);
        out
    }
}
