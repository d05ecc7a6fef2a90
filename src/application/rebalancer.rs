//! Rebalancing session over a prepared partition tree.
//!
//! Forwards the separate/unite primitives and, when configured, rechecks the
//! subtree sums after each of them. Choosing which primitive to call next is
//! left to the caller.

use generational_arena::Index;
use tracing::{instrument, warn};

use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::{PartitionSummary, PartitionTree, Separation};

#[derive(Debug, Clone)]
pub struct Rebalancer {
    tree: PartitionTree,
    verify_invariants: bool,
}

impl Rebalancer {
    pub fn new(tree: PartitionTree, settings: &Settings) -> Self {
        Self {
            tree,
            verify_invariants: settings.verify_invariants,
        }
    }

    pub fn tree(&self) -> &PartitionTree {
        &self.tree
    }

    pub fn into_tree(self) -> PartitionTree {
        self.tree
    }

    /// Current partitions, heaviest first.
    pub fn partitions(&self) -> Vec<PartitionSummary> {
        self.tree.partition_roots()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn separate_root(&mut self, root: Index) -> ApplicationResult<Separation> {
        let separation = self.tree.separate_root(root)?;
        self.verify()?;
        Ok(separation)
    }

    #[instrument(level = "debug", skip(self, children))]
    pub fn unite_root(&mut self, root: Index, children: &[Index]) -> ApplicationResult<()> {
        self.tree.unite_root(root, children)?;
        self.verify()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn separate_max_child(&mut self, parent: Index) -> ApplicationResult<Separation> {
        let separation = self.tree.separate_max_child(parent)?;
        self.verify()?;
        Ok(separation)
    }

    #[instrument(level = "debug", skip(self, children))]
    pub fn unite_max_child(&mut self, parent: Index, children: &[Index]) -> ApplicationResult<()> {
        self.tree.unite_max_child(parent, children)?;
        self.verify()
    }

    fn verify(&self) -> ApplicationResult<()> {
        if !self.verify_invariants {
            return Ok(());
        }
        self.tree.check_invariant().map_err(|violation| {
            warn!(%violation, "partition tree inconsistent");
            violation.into()
        })
    }
}
