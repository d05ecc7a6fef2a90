//! Turns pre-parsed input into a weighted partition tree.

use tracing::{info, instrument};

use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::{Hierarchy, PartitionTree, WorkloadInput};

/// Validated hierarchy plus its weighted copy.
#[derive(Debug, Clone)]
pub struct PreparedWorkload {
    /// Read-only reference structure
    pub hierarchy: Hierarchy,
    /// Weighted copy, the object of all rebalancing
    pub partitions: PartitionTree,
}

/// Build and validate the hierarchy, copy it and seed weights over the first
/// `settings.init_days` days.
#[instrument(level = "debug", skip_all, fields(edges = input.child_to_parent.len(), days = input.per_day_weights.len()))]
pub fn prepare(input: &WorkloadInput, settings: &Settings) -> ApplicationResult<PreparedWorkload> {
    let hierarchy = Hierarchy::build(&input.child_to_parent)?;
    let mut partitions = PartitionTree::copy_from(&hierarchy);
    let root = partitions.root();
    partitions.set_initial_weight(root, &input.per_day_weights, settings.init_days)?;

    info!(
        nodes = hierarchy.len(),
        depth = hierarchy.depth(),
        init_days = settings.init_days,
        "workload prepared"
    );
    Ok(PreparedWorkload {
        hierarchy,
        partitions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ApplicationError;
    use crate::domain::DomainError;
    use std::collections::HashMap;

    fn input(days: usize) -> WorkloadInput {
        let edges = [("a", "a"), ("b", "a"), ("c", "b")]
            .iter()
            .map(|(c, p)| (c.to_string(), p.to_string()))
            .collect();
        let per_day = (0..days)
            .map(|day| HashMap::from([("c".to_string(), day as i64 + 1)]))
            .collect();
        WorkloadInput::new(edges, per_day)
    }

    #[test]
    fn given_longer_series_when_preparing_then_uses_init_window_only() {
        let settings = Settings {
            init_days: 2,
            ..Settings::default()
        };
        let prepared = prepare(&input(5), &settings).unwrap();
        let root = prepared.partitions.root();
        assert_eq!(
            prepared.partitions.get_node(root).unwrap().subtree_size,
            1 + 2
        );
    }

    #[test]
    fn given_missing_root_when_preparing_then_domain_error() {
        let mut bad = input(1);
        bad.child_to_parent.remove("a");
        let err = prepare(&bad, &Settings::default()).unwrap_err();
        assert!(matches!(err, ApplicationError::Domain(DomainError::NoRoot)));
    }
}
