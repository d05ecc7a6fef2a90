//! Plain tree: the validated organizational hierarchy.
//!
//! Built once from child→parent edges and read-only afterwards. Nodes live in a
//! generational arena; parent and child links are arena indices, so there are
//! no reference cycles between nodes.

use std::collections::{HashMap, HashSet};
use std::fmt;

use generational_arena::{Arena, Index};
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, TreeResult};

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Unique tenant name
    pub name: String,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena
    pub children: Vec<Index>,
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Arena-based tenant hierarchy.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    arena: Arena<TreeNode>,
    root: Index,
}

impl Hierarchy {
    /// Build and validate a hierarchy from a child→parent mapping.
    ///
    /// The root is the single entry whose child equals its parent. Fails if
    /// there is no such entry, more than one, or if the remaining edges do not
    /// form one connected acyclic tree below it.
    #[instrument(level = "debug", skip(edges), fields(edges = edges.len()))]
    pub fn build(edges: &HashMap<String, String>) -> TreeResult<Self> {
        let tree = Self::from_edges_unchecked(edges)?;
        if !tree.validate(tree.root)? {
            let reached = tree.reachable(tree.root);
            let unreachable = tree
                .arena
                .iter()
                .filter(|(idx, _)| !reached.contains(idx))
                .map(|(_, node)| node.name.clone())
                .sorted()
                .collect();
            return Err(DomainError::InvalidStructure {
                root: tree.arena[tree.root].name.clone(),
                unreachable,
            });
        }
        debug!(nodes = tree.len(), "hierarchy built");
        Ok(tree)
    }

    /// Link all edges without checking connectivity or cycles.
    ///
    /// Only root detection is enforced here; use [`Hierarchy::validate`] to
    /// inspect the result.
    #[instrument(level = "debug", skip(edges), fields(edges = edges.len()))]
    pub fn from_edges_unchecked(edges: &HashMap<String, String>) -> TreeResult<Self> {
        let roots: Vec<&String> = edges
            .iter()
            .filter(|(child, parent)| child == parent)
            .map(|(child, _)| child)
            .sorted()
            .collect();
        let root_name = match roots.as_slice() {
            [] => return Err(DomainError::NoRoot),
            [single] => single.to_string(),
            many => {
                return Err(DomainError::MultipleRoots(
                    many.iter().map(|s| s.to_string()).collect(),
                ))
            }
        };

        let mut arena = Arena::with_capacity(edges.len());
        let mut by_name: HashMap<&str, Index> = HashMap::with_capacity(edges.len());
        let names = edges
            .iter()
            .flat_map(|(child, parent)| [child.as_str(), parent.as_str()])
            .unique()
            .sorted();
        for name in names {
            let idx = arena.insert(TreeNode {
                name: name.to_string(),
                parent: None,
                children: Vec::new(),
            });
            by_name.insert(name, idx);
        }

        // sorted by child name so sibling order does not depend on map iteration
        for (child, parent) in edges.iter().sorted() {
            if child == parent {
                continue;
            }
            let child_idx = by_name[child.as_str()];
            let parent_idx = by_name[parent.as_str()];
            arena[child_idx].parent = Some(parent_idx);
            arena[parent_idx].children.push(child_idx);
        }

        let root = by_name[root_name.as_str()];
        Ok(Self { arena, root })
    }

    pub fn root(&self) -> Index {
        self.root
    }

    pub fn root_node(&self) -> &TreeNode {
        &self.arena[self.root]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn find(&self, name: &str) -> Option<Index> {
        self.arena
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(idx, _)| idx)
    }

    fn node(&self, idx: Index) -> TreeResult<&TreeNode> {
        self.arena.get(idx).ok_or(DomainError::UnknownNode)
    }

    fn require_root(&self, idx: Index) -> TreeResult<&TreeNode> {
        let node = self.node(idx)?;
        if node.parent.is_some() {
            return Err(DomainError::NotRoot(node.name.clone()));
        }
        Ok(node)
    }

    /// Check that every node is reachable from `root` exactly once.
    ///
    /// Returns false on a revisited node (cycle) or on any node never visited
    /// (disconnected fragment).
    #[instrument(level = "debug", skip(self))]
    pub fn validate(&self, root: Index) -> TreeResult<bool> {
        self.require_root(root)?;

        let mut visited = HashSet::with_capacity(self.arena.len());
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                debug!(node = %self.arena[idx], "node revisited");
                return Ok(false);
            }
            stack.extend(self.node(idx)?.children.iter().rev().copied());
        }

        let connected = visited.len() == self.arena.len();
        if !connected {
            debug!(
                visited = visited.len(),
                total = self.arena.len(),
                "disconnected fragment"
            );
        }
        Ok(connected)
    }

    /// Pre-order listing of every node reachable from `root`.
    #[instrument(level = "debug", skip(self))]
    pub fn all_nodes(&self, root: Index) -> TreeResult<Vec<Index>> {
        self.require_root(root)?;
        Ok(TreeIterator::new(self, root).map(|(idx, _)| idx).collect())
    }

    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self.root, 1)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(node) = self.arena.get(idx) {
                stack.extend(node.children.iter().map(|&child| (child, depth + 1)));
            }
        }
        max_depth
    }

    /// Names of all nodes without children, in pre-order.
    pub fn leaf_names(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(_, node)| node.name.clone())
            .collect()
    }

    fn reachable(&self, root: Index) -> HashSet<Index> {
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if visited.insert(idx) {
                if let Some(node) = self.arena.get(idx) {
                    stack.extend(node.children.iter().copied());
                }
            }
        }
        visited
    }
}

/// Pre-order depth-first iterator with an explicit stack.
pub struct TreeIterator<'a> {
    tree: &'a Hierarchy,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a Hierarchy, start: Index) -> Self {
        Self {
            tree,
            stack: vec![start],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;

    fn edges(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(c, p)| (c.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn given_edges_when_unchecked_then_children_sorted_by_name() {
        let tree =
            Hierarchy::from_edges_unchecked(&edges(&[("a", "a"), ("c", "a"), ("b", "a")]))
                .unwrap();
        let root = tree.get_node(tree.root()).unwrap();
        let names: Vec<_> = root
            .children
            .iter()
            .map(|&c| tree.get_node(c).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn given_two_self_edges_when_building_then_multiple_roots() {
        let err = Hierarchy::build(&edges(&[("a", "a"), ("b", "b")])).unwrap_err();
        assert_eq!(
            err,
            DomainError::MultipleRoots(vec!["a".into(), "b".into()])
        );
        assert_eq!(err.kind(), ErrorKind::Structure);
    }

    #[test]
    fn given_deep_chain_when_validating_then_no_stack_overflow() {
        let mut pairs = vec![("n0".to_string(), "n0".to_string())];
        for i in 1..50_000 {
            pairs.push((format!("n{i}"), format!("n{}", i - 1)));
        }
        let tree = Hierarchy::build(&pairs.into_iter().collect()).unwrap();
        assert_eq!(tree.depth(), 50_000);
        assert_eq!(tree.all_nodes(tree.root()).unwrap().len(), 50_000);
    }
}
