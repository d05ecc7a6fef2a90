//! Domain entities: pre-parsed inputs handed over by the loading collaborator

use std::collections::HashMap;

/// Tenant hierarchy and its task history, already parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadInput {
    /// Child name → parent name; the root maps to itself
    pub child_to_parent: HashMap<String, String>,
    /// Per-day task counts by node name, oldest day first.
    /// Names without tasks on a day may be omitted.
    pub per_day_weights: Vec<HashMap<String, i64>>,
}

impl WorkloadInput {
    pub fn new(
        child_to_parent: HashMap<String, String>,
        per_day_weights: Vec<HashMap<String, i64>>,
    ) -> Self {
        Self {
            child_to_parent,
            per_day_weights,
        }
    }

    /// Total of all task counts over the first `days` days.
    pub fn total_weight(&self, days: usize) -> i64 {
        self.per_day_weights
            .iter()
            .take(days)
            .flat_map(|day| day.values())
            .sum()
    }
}
