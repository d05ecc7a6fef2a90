//! Partition tree: the weighted, mutable copy of a [`Hierarchy`].
//!
//! Every node carries its own weight (`node_size`) and the cached weight of
//! its whole subtree (`subtree_size`). All weight changes go through
//! [`PartitionTree::add_weight`], all structural changes through
//! [`PartitionTree::detach`] and [`PartitionTree::attach`], so the sums stay
//! exact after every call:
//!
//! `subtree_size(n) == node_size(n) + Σ subtree_size(c)` for children `c` of `n`.
//!
//! Detached subtrees stay in the same arena with no parent link. A parentless
//! node other than the tree root is a separated partition.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use generational_arena::{Arena, Index};
use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::domain::error::{DomainError, TreeResult};
use crate::domain::tree::Hierarchy;

/// Weighted node of the partition tree.
#[derive(Debug, Clone)]
pub struct PartitionNode {
    pub name: String,
    /// None for the tree root and for separated partition roots
    pub parent: Option<Index>,
    pub children: Vec<Index>,
    /// Own weight, may be negative
    pub node_size: i64,
    /// Cached sum of `node_size` over this node and all descendants
    pub subtree_size: i64,
}

impl PartitionNode {
    fn unweighted(name: &str, parent: Option<Index>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            node_size: 0,
            subtree_size: 0,
        }
    }
}

impl fmt::Display for PartitionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.name, self.node_size, self.subtree_size)
    }
}

/// Result of a separate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Separation {
    /// Resulting partitions, heaviest first
    pub separated: Vec<Index>,
    /// Detached nodes to hand back to the matching unite call
    pub reunitable: Vec<Index>,
}

/// Weight summary of one partition, for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionSummary {
    pub name: String,
    pub subtree_size: i64,
    pub node_count: usize,
}

/// A node whose cached sums or links disagree with the tree shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invariant violated at '{name}': {detail}")]
pub struct InvariantViolation {
    pub name: String,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct PartitionTree {
    arena: Arena<PartitionNode>,
    root: Index,
}

impl PartitionTree {
    /// Structural copy of `hierarchy` with all weights zero.
    ///
    /// Child order matches the source.
    #[instrument(level = "debug", skip(hierarchy), fields(nodes = hierarchy.len()))]
    pub fn copy_from(hierarchy: &Hierarchy) -> Self {
        let mut arena = Arena::with_capacity(hierarchy.len());
        let src_root = hierarchy.root_node();
        let root = arena.insert(PartitionNode::unweighted(&src_root.name, None));

        // reversed so the first child is popped, and linked, first
        let mut stack: Vec<(Index, Index)> =
            src_root.children.iter().rev().map(|&c| (c, root)).collect();
        while let Some((src_idx, parent_idx)) = stack.pop() {
            let Some(src) = hierarchy.get_node(src_idx) else {
                continue;
            };
            let idx = arena.insert(PartitionNode::unweighted(&src.name, Some(parent_idx)));
            arena[parent_idx].children.push(idx);
            stack.extend(src.children.iter().rev().map(|&c| (c, idx)));
        }

        Self { arena, root }
    }

    pub fn root(&self) -> Index {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get_node(&self, idx: Index) -> Option<&PartitionNode> {
        self.arena.get(idx)
    }

    pub fn find(&self, name: &str) -> Option<Index> {
        self.arena
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(idx, _)| idx)
    }

    pub fn children(&self, idx: Index) -> TreeResult<&[Index]> {
        Ok(&self.node(idx)?.children)
    }

    fn node(&self, idx: Index) -> TreeResult<&PartitionNode> {
        self.arena.get(idx).ok_or(DomainError::UnknownNode)
    }

    fn node_mut(&mut self, idx: Index) -> TreeResult<&mut PartitionNode> {
        self.arena.get_mut(idx).ok_or(DomainError::UnknownNode)
    }

    fn require_root(&self, idx: Index) -> TreeResult<&PartitionNode> {
        let node = self.node(idx)?;
        if node.parent.is_some() {
            return Err(DomainError::NotRoot(node.name.clone()));
        }
        Ok(node)
    }

    /// Like `require_root`, but separated partitions do not qualify.
    fn require_tree_root(&self, idx: Index) -> TreeResult<&PartitionNode> {
        let node = self.require_root(idx)?;
        if idx != self.root {
            return Err(DomainError::NotRoot(node.name.clone()));
        }
        Ok(node)
    }

    fn name_of(&self, idx: Index) -> String {
        self.arena
            .get(idx)
            .map(|n| n.name.clone())
            .unwrap_or_default()
    }

    /// Pre-order listing of `start` and everything below it.
    pub fn subtree(&self, start: Index) -> Vec<Index> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if let Some(node) = self.arena.get(idx) {
                out.push(idx);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Name lookup over the whole tree below `root`.
    #[instrument(level = "debug", skip(self))]
    pub fn name_index(&self, root: Index) -> TreeResult<HashMap<String, Index>> {
        self.require_tree_root(root)?;
        Ok(self
            .subtree(root)
            .into_iter()
            .map(|idx| (self.arena[idx].name.clone(), idx))
            .collect())
    }

    /// Seed node weights from the first `init_days` days of `per_day`.
    ///
    /// All names of the window are resolved before any weight is added, so an
    /// unknown name leaves the tree untouched. An overflow rolls back the
    /// weight added so far.
    #[instrument(level = "debug", skip(self, per_day), fields(days = per_day.len()))]
    pub fn set_initial_weight(
        &mut self,
        root: Index,
        per_day: &[HashMap<String, i64>],
        init_days: usize,
    ) -> TreeResult<()> {
        let subtree_size = self.require_tree_root(root)?.subtree_size;
        if subtree_size != 0 {
            return Err(DomainError::AlreadyInitialized { subtree_size });
        }

        let index = self.name_index(root)?;
        let window = &per_day[..init_days.min(per_day.len())];
        let deltas = window
            .iter()
            .flat_map(|day| day.iter())
            .map(|(name, &tasks)| {
                index
                    .get(name)
                    .map(|&idx| (idx, tasks))
                    .ok_or_else(|| DomainError::UnknownName(name.clone()))
            })
            .collect::<TreeResult<Vec<_>>>()?;

        for (applied, &(idx, tasks)) in deltas.iter().enumerate() {
            if let Err(e) = self.add_weight(idx, tasks) {
                for &(idx, tasks) in deltas[..applied].iter().rev() {
                    self.revert_weight(idx, tasks);
                }
                return Err(e);
            }
        }
        info!(
            days = window.len(),
            total = self.arena[root].subtree_size,
            "initial weight set"
        );
        Ok(())
    }

    /// Add `delta` to the node's own weight and to the subtree sums of the
    /// node and all its ancestors.
    #[instrument(level = "trace", skip(self))]
    pub fn add_weight(&mut self, idx: Index, delta: i64) -> TreeResult<()> {
        let node = self.node(idx)?;
        let node_size = node
            .node_size
            .checked_add(delta)
            .ok_or_else(|| DomainError::WeightOverflow {
                name: node.name.clone(),
                delta,
            })?;
        self.propagate(idx, delta)?;
        self.node_mut(idx)?.node_size = node_size;
        Ok(())
    }

    /// Undo a successful `add_weight` of `delta`.
    fn revert_weight(&mut self, idx: Index, delta: i64) {
        let mut current = Some(idx);
        if let Some(node) = self.arena.get_mut(idx) {
            node.node_size = node.node_size.wrapping_sub(delta);
        }
        while let Some(idx) = current {
            let node = &mut self.arena[idx];
            node.subtree_size = node.subtree_size.wrapping_sub(delta);
            current = node.parent;
        }
    }

    /// Add `delta` to the subtree sums from `start` up to its partition root.
    /// Nothing changes unless every sum on the way stays in range.
    fn propagate(&mut self, start: Index, delta: i64) -> TreeResult<()> {
        let mut current = Some(start);
        while let Some(idx) = current {
            let node = self.node(idx)?;
            if node.subtree_size.checked_add(delta).is_none() {
                return Err(DomainError::WeightOverflow {
                    name: node.name.clone(),
                    delta,
                });
            }
            current = node.parent;
        }

        let mut current = Some(start);
        while let Some(idx) = current {
            let node = &mut self.arena[idx];
            node.subtree_size += delta;
            current = node.parent;
        }
        Ok(())
    }

    fn negated(&self, idx: Index, size: i64) -> TreeResult<i64> {
        size.checked_neg().ok_or_else(|| DomainError::WeightOverflow {
            name: self.name_of(idx),
            delta: size,
        })
    }

    /// Unlink `child` from `parent`. The child keeps its own sums and can be
    /// attached elsewhere unchanged.
    #[instrument(level = "debug", skip(self))]
    pub fn detach(&mut self, parent: Index, child: Index) -> TreeResult<()> {
        let child_size = self.node(child)?.subtree_size;
        let pos = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| DomainError::ChildNotFound {
                parent: self.name_of(parent),
                child: self.name_of(child),
            })?;

        self.propagate(parent, self.negated(child, child_size)?)?;
        self.arena[parent].children.remove(pos);
        self.arena[child].parent = None;
        debug!(
            parent = %self.arena[parent].name,
            child = %self.arena[child].name,
            child_size,
            "detached"
        );
        Ok(())
    }

    /// Append a detached `child` under `parent`.
    #[instrument(level = "debug", skip(self))]
    pub fn attach(&mut self, parent: Index, child: Index) -> TreeResult<()> {
        self.check_attach(parent, child)?;
        let child_size = self.arena[child].subtree_size;

        self.propagate(parent, child_size)?;
        self.arena[parent].children.push(child);
        self.arena[child].parent = Some(parent);
        debug!(
            parent = %self.arena[parent].name,
            child = %self.arena[child].name,
            child_size,
            "attached"
        );
        Ok(())
    }

    fn check_attach(&self, parent: Index, child: Index) -> TreeResult<()> {
        let invalid = |reason: String| DomainError::InvalidAttach {
            parent: self.name_of(parent),
            child: self.name_of(child),
            reason,
        };

        self.node(parent)?;
        if child == self.root {
            return Err(invalid("the tree root cannot become a child".into()));
        }
        if let Some(current) = self.node(child)?.parent {
            return Err(invalid(format!(
                "already attached to '{}'",
                self.name_of(current)
            )));
        }
        let mut ancestor = Some(parent);
        while let Some(idx) = ancestor {
            if idx == child {
                return Err(invalid("parent lies inside the child's subtree".into()));
            }
            ancestor = self.arena[idx].parent;
        }
        Ok(())
    }

    fn attach_all(&mut self, parent: Index, children: &[Index]) -> TreeResult<()> {
        self.node(parent)?;
        let mut seen = HashSet::with_capacity(children.len());
        for &child in children {
            self.check_attach(parent, child)?;
            if !seen.insert(child) {
                return Err(DomainError::InvalidAttach {
                    parent: self.name_of(parent),
                    child: self.name_of(child),
                    reason: "listed more than once".into(),
                });
            }
        }
        for &child in children {
            self.attach(parent, child)?;
        }
        Ok(())
    }

    /// Heaviest first, name ascending on equal weight.
    fn by_weight_desc(&self, a: Index, b: Index) -> Ordering {
        let (a, b) = (&self.arena[a], &self.arena[b]);
        b.subtree_size
            .cmp(&a.subtree_size)
            .then_with(|| a.name.cmp(&b.name))
    }

    /// Detach every child of `root`, leaving it with only its own weight.
    ///
    /// `separated` holds the former children plus `root`, heaviest first;
    /// `reunitable` holds the former children in their original order.
    #[instrument(level = "debug", skip(self))]
    pub fn separate_root(&mut self, root: Index) -> TreeResult<Separation> {
        let node = self.node(root)?;
        let total = node
            .children
            .iter()
            .try_fold(0i64, |acc, &c| acc.checked_add(self.arena[c].subtree_size))
            .ok_or_else(|| DomainError::WeightOverflow {
                name: node.name.clone(),
                delta: i64::MIN,
            })?;

        // one ancestor walk for the whole level
        self.propagate(root, self.negated(root, total)?)?;
        let children = std::mem::take(&mut self.arena[root].children);
        for &child in &children {
            self.arena[child].parent = None;
        }

        let mut separated = children.clone();
        separated.push(root);
        separated.sort_by(|&a, &b| self.by_weight_desc(a, b));

        let node = &self.arena[root];
        debug_assert_eq!(node.subtree_size, node.node_size);
        debug!(root = %node, parts = separated.len(), "root separated");
        Ok(Separation {
            separated,
            reunitable: children,
        })
    }

    /// Reattach `children` under `root`; inverse of [`Self::separate_root`].
    #[instrument(level = "debug", skip(self, children), fields(children = children.len()))]
    pub fn unite_root(&mut self, root: Index, children: &[Index]) -> TreeResult<()> {
        self.attach_all(root, children)?;
        debug!(root = %self.arena[root], "root united");
        Ok(())
    }

    /// Detach the heaviest child of `parent`.
    ///
    /// Equal weights go to the child with the smallest name. `separated` is
    /// `[parent, child]` or `[child, parent]`, heavier first, the parent
    /// winning a tie.
    #[instrument(level = "debug", skip(self))]
    pub fn separate_max_child(&mut self, parent: Index) -> TreeResult<Separation> {
        let node = self.node(parent)?;
        let max_child = node
            .children
            .iter()
            .copied()
            .min_by(|&a, &b| self.by_weight_desc(a, b))
            .ok_or_else(|| DomainError::NoChildren(node.name.clone()))?;

        self.detach(parent, max_child)?;

        let separated = if self.arena[max_child].subtree_size > self.arena[parent].subtree_size {
            vec![max_child, parent]
        } else {
            vec![parent, max_child]
        };
        debug!(
            parent = %self.arena[parent],
            child = %self.arena[max_child],
            "max child separated"
        );
        Ok(Separation {
            separated,
            reunitable: vec![max_child],
        })
    }

    /// Reattach each of `children` under `parent`.
    #[instrument(level = "debug", skip(self, children), fields(children = children.len()))]
    pub fn unite_max_child(&mut self, parent: Index, children: &[Index]) -> TreeResult<()> {
        self.attach_all(parent, children)?;
        debug!(parent = %self.arena[parent], "max child united");
        Ok(())
    }

    /// Recheck every node's cached sum and parent/child links.
    #[instrument(level = "trace", skip(self))]
    pub fn check_invariant(&self) -> Result<(), InvariantViolation> {
        for (idx, node) in self.arena.iter() {
            let mut expected = node.node_size;
            for &child in &node.children {
                let Some(c) = self.arena.get(child) else {
                    return Err(InvariantViolation {
                        name: node.name.clone(),
                        detail: "dangling child handle".into(),
                    });
                };
                if c.parent != Some(idx) {
                    return Err(InvariantViolation {
                        name: c.name.clone(),
                        detail: format!("parent link does not point to '{}'", node.name),
                    });
                }
                expected += c.subtree_size;
            }
            if expected != node.subtree_size {
                return Err(InvariantViolation {
                    name: node.name.clone(),
                    detail: format!(
                        "cached subtree size {} but computed {}",
                        node.subtree_size, expected
                    ),
                });
            }
        }
        Ok(())
    }

    /// Every parentless node with its weight, heaviest first.
    pub fn partition_roots(&self) -> Vec<PartitionSummary> {
        self.arena
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(idx, _)| idx)
            .sorted_by(|&a, &b| self.by_weight_desc(a, b))
            .map(|idx| PartitionSummary {
                name: self.arena[idx].name.clone(),
                subtree_size: self.arena[idx].subtree_size,
                node_count: self.subtree(idx).len(),
            })
            .collect()
    }

    /// Move the detached subtree under `root` into its own tree.
    ///
    /// Handles into the moved nodes become invalid in `self`; look them up
    /// by name in the returned tree.
    #[instrument(level = "debug", skip(self))]
    pub fn extract(&mut self, root: Index) -> TreeResult<PartitionTree> {
        self.require_root(root)?;
        if root == self.root {
            return Err(DomainError::RootExtraction(self.name_of(root)));
        }

        let mut arena = Arena::new();
        let mut new_root = None;
        let mut stack = vec![(root, None)];
        while let Some((old_idx, parent_idx)) = stack.pop() {
            let Some(mut node) = self.arena.remove(old_idx) else {
                continue;
            };
            let old_children = std::mem::take(&mut node.children);
            node.parent = parent_idx;
            let idx = arena.insert(node);
            match parent_idx {
                Some(p) => arena[p].children.push(idx),
                None => new_root = Some(idx),
            }
            for &child in old_children.iter().rev() {
                stack.push((child, Some(idx)));
            }
        }

        let root = new_root.ok_or(DomainError::UnknownNode)?;
        debug!(root = %arena[root], nodes = arena.len(), "partition extracted");
        Ok(PartitionTree { arena, root })
    }
}
