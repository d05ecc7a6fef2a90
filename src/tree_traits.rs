//! Text rendering of trees via termtree.

use generational_arena::Index;
use termtree::Tree;

use crate::domain::{Hierarchy, PartitionTree};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

/// Assemble a termtree bottom-up with an explicit stack.
///
/// `visit` yields the label and children of a node; unknown handles render as
/// an empty leaf.
fn build_tree<'a, F>(root: Index, visit: F) -> Tree<String>
where
    F: Fn(Index) -> Option<(String, &'a [Index])>,
{
    // (node, children already pushed)
    let mut pending = vec![(root, false)];
    let mut built: Vec<Tree<String>> = Vec::new();
    while let Some((idx, expanded)) = pending.pop() {
        let Some((label, children)) = visit(idx) else {
            built.push(Tree::new(String::new()));
            continue;
        };
        if expanded {
            let leaves = built.split_off(built.len() - children.len());
            built.push(Tree::new(label).with_leaves(leaves));
        } else {
            pending.push((idx, true));
            pending.extend(children.iter().rev().map(|&c| (c, false)));
        }
    }
    built.pop().unwrap_or_else(|| Tree::new(String::new()))
}

impl TreeNodeConvert for Hierarchy {
    fn to_tree_string(&self) -> Tree<String> {
        build_tree(self.root(), move |idx| {
            self.get_node(idx)
                .map(|node| (node.name.clone(), node.children.as_slice()))
        })
    }
}

impl TreeNodeConvert for PartitionTree {
    fn to_tree_string(&self) -> Tree<String> {
        self.partition_to_tree_string(self.root())
    }
}

/// Render one partition, labelled `name (node_size/subtree_size)`.
pub trait PartitionRender {
    fn partition_to_tree_string(&self, root: Index) -> Tree<String>;
}

impl PartitionRender for PartitionTree {
    fn partition_to_tree_string(&self, root: Index) -> Tree<String> {
        build_tree(root, move |idx| {
            self.get_node(idx)
                .map(|node| (node.to_string(), node.children.as_slice()))
        })
    }
}
