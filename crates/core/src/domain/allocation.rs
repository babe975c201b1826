use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identity of one entry inside a [`crate::portfolio::PortfolioStore`].
///
/// Removal and weight edits go through the id, never the name, so two entries
/// with the same name can coexist under the `allow-distinct` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub name: String,
    pub weight: u32,
    pub highlighted: bool,
}

/// Point-in-time aggregation of a portfolio.
///
/// Snapshots produced by the store always satisfy `total == entries.values().sum()`.
/// Hand-built snapshots are not checked; the rule engine evaluates whatever it is given.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AllocationSnapshot {
    pub total: u64,
    pub entries: BTreeMap<String, u64>,
}

impl AllocationSnapshot {
    /// Aggregates `(name, weight)` pairs. Repeated names are summed.
    pub fn from_weights<'a, I>(weights: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let mut entries = BTreeMap::<String, u64>::new();
        let mut total: u64 = 0;
        for (name, weight) in weights {
            let weight = u64::from(weight);
            total += weight;
            *entries.entry(name.to_string()).or_default() += weight;
        }
        Self { total, entries }
    }

    /// Weight recorded under `name`; absent names weigh 0.
    pub fn weight_of(&self, name: &str) -> u64 {
        self.entries.get(name).copied().unwrap_or(0)
    }

    pub fn is_consistent(&self) -> bool {
        self.entries.values().sum::<u64>() == self.total
    }
}
