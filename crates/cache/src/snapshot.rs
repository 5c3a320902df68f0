//! Immutable snapshots of the flag dataset.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use flagcache_entity::{Flag, PreparedFlag};
use std::collections::HashMap;
use std::sync::Arc;
use time::UtcDateTime;
use tracing::instrument;

/// One generation of prepared flags, indexed by ID and by key.
///
/// Both indexes are built together from a single fetch and never change
/// afterwards. A flag with both an ID and a key is reachable through either,
/// and both lookups hand out the same [`Arc`].
#[derive(Debug)]
pub struct Snapshot {
    /// Keyed by the decimal form of the flag ID.
    by_id: HashMap<String, Arc<PreparedFlag>>,
    by_key: HashMap<String, Arc<PreparedFlag>>,
    generation: u64,
    built_at: UtcDateTime,
}
impl Snapshot {
    /// Prepare every flag and index the results.
    ///
    /// The first flag that fails preparation aborts the build; nothing is
    /// returned for the flags that did succeed. Flags with neither an ID nor
    /// a key are prepared (so they can still fail the build) but not indexed.
    ///
    /// When two flags share an ID or a key, the one that appears later wins.
    #[instrument(skip(flags), fields(flags = flags.len()))]
    pub fn build(flags: Vec<Flag>, generation: u64) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(flags.len());
        let mut by_key = HashMap::with_capacity(flags.len());
        for flag in flags {
            let prepared = Arc::new(flag.prepare().or_raise(|| ErrorKind::Preparation)?);
            if prepared.id() != 0
                && by_id.insert(prepared.id().to_string(), Arc::clone(&prepared)).is_some()
            {
                tracing::warn!(id = prepared.id(), "Duplicate flag ID; keeping the later flag");
            }
            if !prepared.key().is_empty()
                && by_key.insert(prepared.key().to_string(), Arc::clone(&prepared)).is_some()
            {
                tracing::warn!(key = prepared.key(), "Duplicate flag key; keeping the later flag");
            }
        }
        Ok(Self { by_id, by_key, generation, built_at: UtcDateTime::now() })
    }

    pub fn by_id(&self, id: u64) -> Option<&Arc<PreparedFlag>> {
        self.by_id.get(&id.to_string())
    }

    pub fn by_key(&self, key: &str) -> Option<&Arc<PreparedFlag>> {
        self.by_key.get(key)
    }

    pub fn len_by_id(&self) -> usize {
        self.by_id.len()
    }

    pub fn len_by_key(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.by_key.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> UtcDateTime {
        self.built_at
    }

    /// Copies of every flag reachable by ID, ordered by ID.
    ///
    /// Flags that only have a key are not included.
    pub fn export(&self) -> Vec<Flag> {
        let mut flags: Vec<Flag> = self.by_id.values().map(|prepared| prepared.flag().clone()).collect();
        flags.sort_unstable_by_key(|flag| flag.id);
        flags
    }
}
