//! Application layer: the build → copy → seed pipeline and the rebalancing session
//!
//! This layer orchestrates domain logic and applies settings.

pub mod error;
pub mod rebalancer;
pub mod workload;

pub use error::{ApplicationError, ApplicationResult};
pub use rebalancer::Rebalancer;
pub use workload::{prepare, PreparedWorkload};
