//! Domain layer: trees and partitioning primitives
//!
//! This layer is independent of external concerns (no I/O, no config loading).

pub mod entities;
pub mod error;
pub mod partition;
pub mod tree;

pub use entities::WorkloadInput;
pub use error::{DomainError, ErrorKind, TreeResult};
pub use partition::{
    InvariantViolation, PartitionNode, PartitionSummary, PartitionTree, Separation,
};
pub use tree::{Hierarchy, TreeIterator, TreeNode};
