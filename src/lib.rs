//! Weight-balanced partitioning of hierarchical multi-tenant workload trees.
//!
//! A [`domain::Hierarchy`] is built and validated from child→parent edges,
//! copied into a weighted [`domain::PartitionTree`], seeded from a per-day
//! task series, and then split or merged with the separate/unite primitives.

pub mod application;
pub mod config;
pub mod domain;
pub mod tree_traits;
pub mod util;

pub use application::{prepare, ApplicationError, ApplicationResult, PreparedWorkload, Rebalancer};
pub use config::Settings;
pub use domain::{
    DomainError, ErrorKind, Hierarchy, PartitionSummary, PartitionTree, Separation, WorkloadInput,
};
