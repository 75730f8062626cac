//! Checkpoints: per-file snapshot history
//!
//! A checkpoint captures a file's payload and last-modified timestamp.
//! Restoring replaces the live file with the snapshot and leaves the history
//! untouched.

pub mod file;
pub mod memory;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;

use crate::error::{ContentsError, Result};
use crate::store::ContentStore;
use crate::types::CheckpointID;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Checkpoint descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: CheckpointID,
    pub last_modified: DateTime<Utc>,
}

/// Checkpoint capability set. Every operation addresses the file positionally.
pub trait CheckpointStore: Send + Sync {
    fn create(&self, store: &dyn ContentStore, path: &str, name: &str) -> Result<Checkpoint>;

    /// History in creation order. Files without history yield an empty list.
    fn list(&self, store: &dyn ContentStore, path: &str, name: &str) -> Result<Vec<Checkpoint>>;

    fn restore(
        &self,
        store: &dyn ContentStore,
        path: &str,
        name: &str,
        checkpoint_id: &str,
    ) -> Result<()>;

    fn delete(
        &self,
        store: &dyn ContentStore,
        path: &str,
        name: &str,
        checkpoint_id: &str,
    ) -> Result<()>;

    /// Drop the history of the item at a combined logical path and of
    /// everything beneath it. Items without history are not an error.
    fn forget(&self, store: &dyn ContentStore, path: &str) -> Result<()>;
}

/// Strategy for fresh checkpoint identifiers
pub trait CheckpointIdGenerator: Send + Sync {
    /// An id not present in `history`.
    fn next_id(&self, history: &[Checkpoint]) -> CheckpointID;
}

/// Decimal counter: one past the largest numeric id in the history
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialIds;

impl CheckpointIdGenerator for SequentialIds {
    fn next_id(&self, history: &[Checkpoint]) -> CheckpointID {
        let next = history
            .iter()
            .filter_map(|c| c.checkpoint_id.parse::<u64>().ok())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);
        next.to_string()
    }
}

/// Random, time-sortable ULID strings
#[derive(Debug, Default, Clone, Copy)]
pub struct UlidIds;

impl CheckpointIdGenerator for UlidIds {
    fn next_id(&self, history: &[Checkpoint]) -> CheckpointID {
        loop {
            let id = ulid::Ulid::new().to_string();
            if !history.iter().any(|c| c.checkpoint_id == id) {
                return id;
            }
        }
    }
}

pub fn id_generator(strategy: &str) -> Result<Arc<dyn CheckpointIdGenerator>> {
    match strategy {
        "sequential" => Ok(Arc::new(SequentialIds)),
        "ulid" => Ok(Arc::new(UlidIds)),
        other => Err(ContentsError::Config(format!(
            "Invalid checkpoint id strategy: {} (must be 'sequential' or 'ulid')",
            other
        ))),
    }
}

/// Backend without checkpoint support.
///
/// Listing yields nothing; create, restore and delete are unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCheckpoints;

impl CheckpointStore for NoCheckpoints {
    fn create(&self, _store: &dyn ContentStore, _path: &str, _name: &str) -> Result<Checkpoint> {
        Err(ContentsError::Unsupported("checkpoint create".to_string()))
    }

    fn list(&self, _store: &dyn ContentStore, _path: &str, _name: &str) -> Result<Vec<Checkpoint>> {
        Ok(Vec::new())
    }

    fn restore(
        &self,
        _store: &dyn ContentStore,
        _path: &str,
        _name: &str,
        _checkpoint_id: &str,
    ) -> Result<()> {
        Err(ContentsError::Unsupported("checkpoint restore".to_string()))
    }

    fn delete(
        &self,
        _store: &dyn ContentStore,
        _path: &str,
        _name: &str,
        _checkpoint_id: &str,
    ) -> Result<()> {
        Err(ContentsError::Unsupported("checkpoint delete".to_string()))
    }

    fn forget(&self, _store: &dyn ContentStore, _path: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;

    fn checkpoint(id: &str) -> Checkpoint {
        Checkpoint {
            checkpoint_id: id.to_string(),
            last_modified: Utc::now(),
        }
    }

    #[test]
    fn sequential_ids_follow_largest() {
        assert_eq!(SequentialIds.next_id(&[]), "0");
        assert_eq!(
            SequentialIds.next_id(&[checkpoint("0"), checkpoint("4"), checkpoint("2")]),
            "5"
        );
    }

    #[test]
    fn ulid_ids_are_unique() {
        let first = UlidIds.next_id(&[]);
        let second = UlidIds.next_id(&[checkpoint(&first)]);
        assert_ne!(first, second);
        assert_eq!(first.len(), 26);
    }

    #[test]
    fn unknown_strategy_is_config_error() {
        assert_eq!(id_generator("uuid").err().unwrap().kind(), ErrorKind::Config);
    }

    #[test]
    fn no_checkpoints_lists_empty_and_rejects_mutation() {
        let store = MemoryStore::new("/mem");
        assert!(NoCheckpoints.list(&store, "/", "a.ipynb").unwrap().is_empty());
        assert_eq!(
            NoCheckpoints.create(&store, "/", "a.ipynb").unwrap_err().kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            NoCheckpoints
                .restore(&store, "/", "a.ipynb", "0")
                .unwrap_err()
                .kind(),
            ErrorKind::Unsupported
        );
        assert!(NoCheckpoints.forget(&store, "a.ipynb").is_ok());
    }
}
