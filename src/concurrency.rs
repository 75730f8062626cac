//! Per-location locking for storage mutations
//!
//! Mutating store operations take the write lock of the containing directory
//! they change. Operations on different directories proceed concurrently;
//! check-then-act sequences inside one directory are serialized.
//!
//! Entries live only while someone holds them: [`PathLockManager::with_write`]
//! drops a location's lock from the map once no other caller references it,
//! so the map is bounded by the number of locations in use at once.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lock manager keyed by storage location
pub struct PathLockManager {
    /// Map from location to its read-write lock
    locks: Arc<RwLock<HashMap<PathBuf, Arc<RwLock<()>>>>>,
}

impl PathLockManager {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get or create the lock for a location
    pub fn get_lock(&self, location: &Path) -> Arc<RwLock<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(location) {
                return lock.clone();
            }
        }

        let mut map = self.locks.write();
        // Another thread may have inserted it between the two guards
        map.entry(location.to_path_buf())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Locks for several locations, deduplicated and in a stable order.
    ///
    /// Acquiring write guards in the returned order never deadlocks against
    /// another caller doing the same.
    pub fn ordered_locks(&self, locations: &[&Path]) -> Vec<Arc<RwLock<()>>> {
        let mut keys: Vec<&Path> = locations.to_vec();
        keys.sort();
        keys.dedup();
        keys.into_iter().map(|key| self.get_lock(key)).collect()
    }

    /// Run `f` holding the write locks of every location, then prune them.
    pub fn with_write<T>(&self, locations: &[&Path], f: impl FnOnce() -> T) -> T {
        let locks = self.ordered_locks(locations);
        let result = {
            let _guards: Vec<_> = locks.iter().map(|lock| lock.write()).collect();
            f()
        };
        drop(locks);
        self.release(locations);
        result
    }

    /// Drop map entries nobody outside the map references.
    ///
    /// Clones are only handed out under the map lock, so an entry with a
    /// strong count of one cannot be acquired concurrently with its removal.
    pub fn release(&self, locations: &[&Path]) {
        let mut map = self.locks.write();
        for location in locations {
            let unused = map
                .get(*location)
                .map(|lock| Arc::strong_count(lock) == 1)
                .unwrap_or(false);
            if unused {
                map.remove(*location);
            }
        }
    }

    /// Number of locations currently tracked.
    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PathLockManager {
    fn default() -> Self {
        Self::new()
    }
}
