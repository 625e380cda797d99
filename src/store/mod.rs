//! Completion records
//!
//! A durable map from public address to "migration completed". Records are
//! monotonic: once an address is marked complete nothing in this crate
//! clears it.

mod file;

use std::collections::HashSet;
use std::sync::RwLock;

use crate::error::StoreError;

pub use file::FileCompletionStore;

/// Durable per-address completion flag
pub trait CompletionStore: Send + Sync + 'static {
    /// `false` for addresses never marked
    fn is_complete(&self, public_address: &str) -> bool;

    /// Record that `public_address` has migrated
    fn mark_complete(&self, public_address: &str) -> Result<(), StoreError>;
}

/// Process-local store, lost on restart
#[derive(Debug, Default)]
pub struct MemoryCompletionStore {
    completed: RwLock<HashSet<String>>,
}

impl MemoryCompletionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given addresses already marked
    pub fn with_completed<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            completed: RwLock::new(addresses.into_iter().map(Into::into).collect()),
        }
    }
}

impl CompletionStore for MemoryCompletionStore {
    fn is_complete(&self, public_address: &str) -> bool {
        self.completed
            .read()
            .map(|set| set.contains(public_address))
            .unwrap_or(false)
    }

    fn mark_complete(&self, public_address: &str) -> Result<(), StoreError> {
        let mut set = self.completed.write().map_err(|_| StoreError::Poisoned)?;
        set.insert(public_address.to_string());
        Ok(())
    }
}
