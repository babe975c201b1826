//! The editable portfolio and its reactive aggregation.
//!
//! Every effective mutation recomputes the [`AllocationSnapshot`] under the
//! store lock and publishes exactly one `portfolioChanged` after the lock is
//! released, so subscribers can call back into the store.

pub mod error;

pub use error::StoreError;

use crate::bus::{Event, EventBus};
use crate::domain::allocation::{AllocationSnapshot, Entry, EntryId};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What `add_entry` does when the name is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    /// Replace the existing entry's weight and keep its id.
    Overwrite,
    /// Keep both entries; the snapshot sums their weights under the shared name.
    AllowDistinct,
}

impl FromStr for DuplicatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "overwrite" => Ok(Self::Overwrite),
            "allow-distinct" | "allow_distinct" => Ok(Self::AllowDistinct),
            other => anyhow::bail!(
                "unknown duplicate policy {other:?} (expected reject, overwrite or allow-distinct)"
            ),
        }
    }
}

#[derive(Debug)]
pub struct PortfolioStore {
    bus: EventBus,
    policy: DuplicatePolicy,
    entries: Mutex<Vec<Entry>>,
}

enum Insert {
    Added(EntryId),
    Overwritten { id: EntryId, changed: bool },
}

impl PortfolioStore {
    pub fn new(bus: EventBus, policy: DuplicatePolicy) -> Self {
        Self {
            bus,
            policy,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_entry(&self, name: &str, initial_weight: u32) -> Result<EntryId, StoreError> {
        let mut entries = self.lock();
        match insert(&mut entries, self.policy, name, initial_weight)? {
            Insert::Added(id) => {
                tracing::debug!(name, weight = initial_weight, entry = %id, "entry added");
                self.recompute(entries);
                Ok(id)
            }
            Insert::Overwritten { id, changed } => {
                tracing::debug!(name, weight = initial_weight, changed, "entry overwritten");
                if changed {
                    self.recompute(entries);
                }
                Ok(id)
            }
        }
    }

    /// Adds several entries as one change: at most one `portfolioChanged` is
    /// published. Nothing is added if any of them is rejected.
    pub fn add_entries<'a, I>(&self, seed: I) -> Result<Vec<EntryId>, StoreError>
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let mut entries = self.lock();
        let mut staged = entries.clone();
        let mut ids = Vec::new();
        let mut changed = false;
        for (name, weight) in seed {
            match insert(&mut staged, self.policy, name, weight)? {
                Insert::Added(id) => {
                    changed = true;
                    ids.push(id);
                }
                Insert::Overwritten { id, changed: c } => {
                    changed |= c;
                    ids.push(id);
                }
            }
        }
        if changed {
            *entries = staged;
            self.recompute(entries);
        }
        Ok(ids)
    }

    /// Text-box entry point: trims and upper-cases the symbol. Blank input is
    /// ignored.
    pub fn add_ticker(&self, raw: &str, weight: u32) -> Result<Option<EntryId>, StoreError> {
        let ticker = raw.trim().to_uppercase();
        if ticker.is_empty() {
            return Ok(None);
        }
        self.add_entry(&ticker, weight).map(Some)
    }

    /// Returns `false` if the entry was already gone.
    pub fn remove_entry(&self, id: EntryId) -> bool {
        let mut entries = self.lock();
        let Some(pos) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let removed = entries.remove(pos);
        tracing::debug!(name = %removed.name, entry = %id, "entry removed");
        self.recompute(entries);
        true
    }

    pub fn set_weight(&self, id: EntryId, new_weight: i64) -> Result<(), StoreError> {
        let weight =
            u32::try_from(new_weight).map_err(|_| StoreError::InvalidWeight(new_weight.to_string()))?;
        self.apply_weight(id, weight)
    }

    /// Same as [`Self::set_weight`] for raw UI input.
    pub fn set_weight_input(&self, id: EntryId, raw: &str) -> Result<(), StoreError> {
        let weight = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| StoreError::InvalidWeight(raw.to_string()))?;
        self.apply_weight(id, weight)
    }

    fn apply_weight(&self, id: EntryId, weight: u32) -> Result<(), StoreError> {
        let mut entries = self.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::UnknownEntry(id))?;
        if entry.weight == weight {
            return Ok(());
        }
        entry.weight = weight;
        self.recompute(entries);
        Ok(())
    }

    /// Highlights exactly the entries whose name is in `names`.
    pub fn highlight<S: AsRef<str>>(&self, names: &[S]) {
        let mut entries = self.lock();
        for entry in entries.iter_mut() {
            entry.highlighted = names.iter().any(|n| n.as_ref() == entry.name);
        }
    }

    pub fn snapshot(&self) -> AllocationSnapshot {
        snapshot_of(&self.lock())
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.name.clone()).collect()
    }

    pub fn total(&self) -> u64 {
        self.lock().iter().map(|e| u64::from(e.weight)).sum()
    }

    /// First entry with this name.
    pub fn find(&self, name: &str) -> Option<EntryId> {
        self.find_nth(name, 0)
    }

    /// The `n`th (0-based, insertion order) entry with this name. Only
    /// `DuplicatePolicy::AllowDistinct` ever holds more than one.
    pub fn find_nth(&self, name: &str, n: usize) -> Option<EntryId> {
        self.lock()
            .iter()
            .filter(|e| e.name == name)
            .nth(n)
            .map(|e| e.id)
    }

    /// Asks for the add-investment picker, excluding names already held.
    pub fn request_selection(&self) -> usize {
        let names = self.names();
        self.bus.publish(Event::SelectInvestments(names))
    }

    fn recompute(&self, mut entries: MutexGuard<'_, Vec<Entry>>) {
        for entry in entries.iter_mut() {
            entry.highlighted = false;
        }
        let snapshot = snapshot_of(&entries);
        drop(entries);

        tracing::debug!(
            total = snapshot.total,
            names = snapshot.entries.len(),
            "portfolio recomputed"
        );
        self.bus.publish(Event::PortfolioChanged(snapshot));
    }
}

fn insert(
    entries: &mut Vec<Entry>,
    policy: DuplicatePolicy,
    name: &str,
    weight: u32,
) -> Result<Insert, StoreError> {
    if let Some(existing) = entries.iter_mut().find(|e| e.name == name) {
        match policy {
            DuplicatePolicy::Reject => return Err(StoreError::DuplicateName(name.to_string())),
            DuplicatePolicy::Overwrite => {
                let changed = existing.weight != weight;
                existing.weight = weight;
                return Ok(Insert::Overwritten {
                    id: existing.id,
                    changed,
                });
            }
            DuplicatePolicy::AllowDistinct => {}
        }
    }

    let id = EntryId::new();
    entries.push(Entry {
        id,
        name: name.to_string(),
        weight,
        highlighted: false,
    });
    Ok(Insert::Added(id))
}

fn snapshot_of(entries: &[Entry]) -> AllocationSnapshot {
    AllocationSnapshot::from_weights(entries.iter().map(|e| (e.name.as_str(), e.weight)))
}
