use crate::domain::allocation::EntryId;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    DuplicateName(String),
    /// Carries the rejected input as the caller supplied it.
    InvalidWeight(String),
    UnknownEntry(EntryId),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateName(name) => write!(f, "entry {name:?} is already in the portfolio"),
            StoreError::InvalidWeight(raw) => {
                write!(f, "invalid weight {raw:?}: must be a non-negative integer")
            }
            StoreError::UnknownEntry(id) => write!(f, "no entry with id {id}"),
        }
    }
}

impl std::error::Error for StoreError {}
