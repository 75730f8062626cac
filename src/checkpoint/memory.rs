//! Process-local checkpoint history
//!
//! Snapshots live in memory and vanish with the process. Useful alongside
//! [`crate::store::MemoryStore`] or when history must not touch disk.

use crate::checkpoint::{Checkpoint, CheckpointIdGenerator, CheckpointStore};
use crate::error::{ContentsError, Result};
use crate::path::LogicalPath;
use crate::store::{item_address, ContentStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

struct Snapshot {
    checkpoint: Checkpoint,
    bytes: Vec<u8>,
}

pub struct MemoryCheckpointStore {
    ids: Arc<dyn CheckpointIdGenerator>,
    history: RwLock<HashMap<LogicalPath, Vec<Snapshot>>>,
}

impl MemoryCheckpointStore {
    pub fn new(ids: Arc<dyn CheckpointIdGenerator>) -> Self {
        Self {
            ids,
            history: RwLock::new(HashMap::new()),
        }
    }
}

fn document_key(path: &str, name: &str) -> (LogicalPath, String, String) {
    let (parent, name) = item_address(path, name);
    let key = parent.join(&name);
    (key, parent.to_string(), name)
}

fn not_found(key: &LogicalPath, checkpoint_id: &str) -> ContentsError {
    ContentsError::NotFound(format!("checkpoint {} for {}", checkpoint_id, key))
}

impl CheckpointStore for MemoryCheckpointStore {
    fn create(&self, store: &dyn ContentStore, path: &str, name: &str) -> Result<Checkpoint> {
        let (key, dir, name) = document_key(path, name);
        let model = store.stat(&dir, &name)?;
        let bytes = store.read_bytes(&dir, &name)?;

        let mut history = self.history.write();
        let entries = history.entry(key.clone()).or_default();
        let existing: Vec<Checkpoint> = entries.iter().map(|s| s.checkpoint.clone()).collect();
        let checkpoint = Checkpoint {
            checkpoint_id: self.ids.next_id(&existing),
            last_modified: model.last_modified,
        };
        entries.push(Snapshot {
            checkpoint: checkpoint.clone(),
            bytes,
        });

        info!("Created checkpoint {} for {}", checkpoint.checkpoint_id, key);
        Ok(checkpoint)
    }

    fn list(&self, _store: &dyn ContentStore, path: &str, name: &str) -> Result<Vec<Checkpoint>> {
        let (key, _, _) = document_key(path, name);
        Ok(self
            .history
            .read()
            .get(&key)
            .map(|entries| entries.iter().map(|s| s.checkpoint.clone()).collect())
            .unwrap_or_default())
    }

    fn restore(
        &self,
        store: &dyn ContentStore,
        path: &str,
        name: &str,
        checkpoint_id: &str,
    ) -> Result<()> {
        let (key, dir, name) = document_key(path, name);
        store.stat(&dir, &name)?;

        let history = self.history.read();
        let snapshot = history
            .get(&key)
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|s| s.checkpoint.checkpoint_id == checkpoint_id)
            })
            .ok_or_else(|| not_found(&key, checkpoint_id))?;

        store.write_bytes(&dir, &name, &snapshot.bytes)?;
        store.set_modified(&dir, &name, snapshot.checkpoint.last_modified)?;

        info!("Restored {} from checkpoint {}", key, checkpoint_id);
        Ok(())
    }

    fn delete(
        &self,
        _store: &dyn ContentStore,
        path: &str,
        name: &str,
        checkpoint_id: &str,
    ) -> Result<()> {
        let (key, _, _) = document_key(path, name);
        let mut history = self.history.write();
        let entries = history
            .get_mut(&key)
            .ok_or_else(|| not_found(&key, checkpoint_id))?;
        let index = entries
            .iter()
            .position(|s| s.checkpoint.checkpoint_id == checkpoint_id)
            .ok_or_else(|| not_found(&key, checkpoint_id))?;
        entries.remove(index);

        info!("Deleted checkpoint {} for {}", checkpoint_id, key);
        Ok(())
    }

    fn forget(&self, _store: &dyn ContentStore, path: &str) -> Result<()> {
        let prefix = LogicalPath::parse(path);
        let mut history = self.history.write();
        let before = history.len();
        history.retain(|key, _| !key.segments().starts_with(prefix.segments()));

        let forgotten = before - history.len();
        if forgotten > 0 {
            info!("Dropped history of {} documents under {}", forgotten, prefix);
        }
        Ok(())
    }
}
