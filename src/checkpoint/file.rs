//! Checkpoints kept beside the document
//!
//! Layout, inside the document's containing directory:
//!
//! ```text
//! .ipynb_checkpoints/<name>.json        ordered manifest of checkpoints
//! .ipynb_checkpoints/<name>-<id>        snapshot payload
//! ```
//!
//! Everything is written through the content store, so history persists
//! exactly as long as the store does. The directory is hidden and never shows
//! up in listings.

use crate::checkpoint::{Checkpoint, CheckpointIdGenerator, CheckpointStore};
use crate::concurrency::PathLockManager;
use crate::error::{ContentsError, Result};
use crate::path::LogicalPath;
use crate::store::{item_address, ContentStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub const CHECKPOINT_DIR: &str = ".ipynb_checkpoints";

pub struct FileCheckpointStore {
    ids: Arc<dyn CheckpointIdGenerator>,
    locks: PathLockManager,
}

/// Resolved storage addresses for one document's history
struct HistoryAddress {
    document_dir: String,
    document_name: String,
    checkpoint_dir: String,
    manifest_name: String,
}

impl HistoryAddress {
    fn new(path: &str, name: &str) -> Self {
        let (parent, name) = item_address(path, name);
        Self {
            document_dir: parent.to_string(),
            checkpoint_dir: parent.join(CHECKPOINT_DIR).to_string(),
            manifest_name: format!("{}.json", name),
            document_name: name,
        }
    }

    fn snapshot_name(&self, checkpoint_id: &str) -> String {
        format!("{}-{}", self.document_name, checkpoint_id)
    }

    fn location(&self, store: &dyn ContentStore) -> PathBuf {
        store
            .root()
            .resolve(Some(&self.document_name), &self.document_dir)
    }

    fn display(&self) -> String {
        LogicalPath::parse(&self.document_dir)
            .join(&self.document_name)
            .to_string()
    }
}

impl FileCheckpointStore {
    pub fn new(ids: Arc<dyn CheckpointIdGenerator>) -> Self {
        Self {
            ids,
            locks: PathLockManager::new(),
        }
    }

    fn load_manifest(
        &self,
        store: &dyn ContentStore,
        address: &HistoryAddress,
    ) -> Result<Vec<Checkpoint>> {
        if !store.exists(&address.checkpoint_dir, Some(&address.manifest_name)) {
            return Ok(Vec::new());
        }
        let bytes = store.read_bytes(&address.checkpoint_dir, &address.manifest_name)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save_manifest(
        &self,
        store: &dyn ContentStore,
        address: &HistoryAddress,
        history: &[Checkpoint],
    ) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(history)?;
        store.write_bytes(&address.checkpoint_dir, &address.manifest_name, &bytes)?;
        Ok(())
    }

    fn find(history: &[Checkpoint], address: &HistoryAddress, checkpoint_id: &str) -> Result<usize> {
        history
            .iter()
            .position(|c| c.checkpoint_id == checkpoint_id)
            .ok_or_else(|| {
                ContentsError::NotFound(format!(
                    "checkpoint {} for {}",
                    checkpoint_id,
                    address.display()
                ))
            })
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn create(&self, store: &dyn ContentStore, path: &str, name: &str) -> Result<Checkpoint> {
        let address = HistoryAddress::new(path, name);
        let document = address.location(store);

        let checkpoint = self.locks.with_write(&[&document], || -> Result<Checkpoint> {
            let model = store.stat(&address.document_dir, &address.document_name)?;
            let bytes = store.read_bytes(&address.document_dir, &address.document_name)?;
            let mut history = self.load_manifest(store, &address)?;

            let checkpoint = Checkpoint {
                checkpoint_id: self.ids.next_id(&history),
                last_modified: model.last_modified,
            };
            store.write_bytes(
                &address.checkpoint_dir,
                &address.snapshot_name(&checkpoint.checkpoint_id),
                &bytes,
            )?;
            history.push(checkpoint.clone());
            self.save_manifest(store, &address, &history)?;
            Ok(checkpoint)
        })?;

        info!(
            "Created checkpoint {} for {}",
            checkpoint.checkpoint_id,
            address.display()
        );
        Ok(checkpoint)
    }

    fn list(&self, store: &dyn ContentStore, path: &str, name: &str) -> Result<Vec<Checkpoint>> {
        let address = HistoryAddress::new(path, name);
        let history = self.load_manifest(store, &address)?;
        debug!("{} checkpoints for {}", history.len(), address.display());
        Ok(history)
    }

    fn restore(
        &self,
        store: &dyn ContentStore,
        path: &str,
        name: &str,
        checkpoint_id: &str,
    ) -> Result<()> {
        let address = HistoryAddress::new(path, name);
        let document = address.location(store);

        self.locks.with_write(&[&document], || -> Result<()> {
            store.stat(&address.document_dir, &address.document_name)?;
            let history = self.load_manifest(store, &address)?;
            let checkpoint = &history[Self::find(&history, &address, checkpoint_id)?];

            let bytes =
                store.read_bytes(&address.checkpoint_dir, &address.snapshot_name(checkpoint_id))?;
            store.write_bytes(&address.document_dir, &address.document_name, &bytes)?;
            store.set_modified(
                &address.document_dir,
                &address.document_name,
                checkpoint.last_modified,
            )
        })?;

        info!(
            "Restored {} from checkpoint {}",
            address.display(),
            checkpoint_id
        );
        Ok(())
    }

    fn delete(
        &self,
        store: &dyn ContentStore,
        path: &str,
        name: &str,
        checkpoint_id: &str,
    ) -> Result<()> {
        let address = HistoryAddress::new(path, name);
        let document = address.location(store);

        self.locks.with_write(&[&document], || -> Result<()> {
            let mut history = self.load_manifest(store, &address)?;
            let index = Self::find(&history, &address, checkpoint_id)?;
            history.remove(index);
            self.save_manifest(store, &address, &history)?;
            remove_if_present(store, &address.checkpoint_dir, &address.snapshot_name(checkpoint_id))
        })?;

        info!(
            "Deleted checkpoint {} for {}",
            checkpoint_id,
            address.display()
        );
        Ok(())
    }

    fn forget(&self, store: &dyn ContentStore, path: &str) -> Result<()> {
        let logical = LogicalPath::parse(path);
        let address = match logical.split_last() {
            Some((parent, name)) => HistoryAddress::new(&parent.to_string(), name),
            // The root itself has no history
            None => return Ok(()),
        };
        let document = address.location(store);

        let forgotten = self.locks.with_write(&[&document], || -> Result<usize> {
            let history = self.load_manifest(store, &address)?;
            for checkpoint in &history {
                remove_if_present(
                    store,
                    &address.checkpoint_dir,
                    &address.snapshot_name(&checkpoint.checkpoint_id),
                )?;
            }
            remove_if_present(store, &address.checkpoint_dir, &address.manifest_name)?;
            Ok(history.len())
        })?;

        if forgotten > 0 {
            info!("Dropped {} checkpoints for {}", forgotten, address.display());
        }
        Ok(())
    }
}

fn remove_if_present(store: &dyn ContentStore, path: &str, name: &str) -> Result<()> {
    let target = LogicalPath::parse(path).join(name).to_string();
    match store.delete(&target) {
        Ok(()) | Err(ContentsError::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::SequentialIds;
    use crate::error::ErrorKind;
    use crate::model::WriteModel;
    use crate::store::FileSystemStore;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileSystemStore, FileCheckpointStore) {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::open(temp.path()).unwrap();
        store
            .write("nb", &WriteModel::from_bytes("a.ipynb", b"v1"))
            .unwrap();
        (temp, store, FileCheckpointStore::new(Arc::new(SequentialIds)))
    }

    #[test]
    fn create_list_restore_keeps_history() {
        let (temp, store, checkpoints) = setup();
        let created = checkpoints.create(&store, "nb", "a.ipynb").unwrap();
        assert_eq!(created.checkpoint_id, "0");

        store
            .write("nb", &WriteModel::from_bytes("a.ipynb", b"v2"))
            .unwrap();
        checkpoints.restore(&store, "nb", "a.ipynb", "0").unwrap();

        assert_eq!(store.read_bytes("nb", "a.ipynb").unwrap(), b"v1");
        let restored = store.stat("nb", "a.ipynb").unwrap();
        assert_eq!(
            restored.last_modified.timestamp(),
            created.last_modified.timestamp()
        );
        assert_eq!(checkpoints.list(&store, "nb", "a.ipynb").unwrap(), vec![created]);
        assert!(temp.path().join("nb/.ipynb_checkpoints/a.ipynb-0").is_file());
    }

    #[test]
    fn checkpoint_directory_is_hidden_from_listing() {
        let (_temp, store, checkpoints) = setup();
        checkpoints.create(&store, "nb", "a.ipynb").unwrap();
        let names: Vec<String> = store.list("nb").unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["a.ipynb".to_string()]);
    }

    #[test]
    fn unknown_file_or_checkpoint_is_not_found() {
        let (_temp, store, checkpoints) = setup();
        assert_eq!(
            checkpoints.create(&store, "nb", "missing.ipynb").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            checkpoints.restore(&store, "nb", "a.ipynb", "7").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            checkpoints.delete(&store, "nb", "a.ipynb", "7").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn delete_removes_one_entry() {
        let (temp, store, checkpoints) = setup();
        checkpoints.create(&store, "nb", "a.ipynb").unwrap();
        checkpoints.create(&store, "nb", "a.ipynb").unwrap();
        checkpoints.delete(&store, "nb", "a.ipynb", "0").unwrap();

        let ids: Vec<String> = checkpoints
            .list(&store, "nb", "a.ipynb")
            .unwrap()
            .into_iter()
            .map(|c| c.checkpoint_id)
            .collect();
        assert_eq!(ids, vec!["1".to_string()]);
        assert!(!temp.path().join("nb/.ipynb_checkpoints/a.ipynb-0").exists());
    }

    #[test]
    fn forget_drops_manifest_and_snapshots() {
        let (temp, store, checkpoints) = setup();
        checkpoints.create(&store, "nb", "a.ipynb").unwrap();
        checkpoints.create(&store, "nb", "a.ipynb").unwrap();
        store.delete("nb/a.ipynb").unwrap();

        checkpoints.forget(&store, "nb/a.ipynb").unwrap();
        let leftovers: Vec<_> = fs::read_dir(temp.path().join("nb/.ipynb_checkpoints"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());

        store
            .write("nb", &WriteModel::from_bytes("a.ipynb", b"fresh"))
            .unwrap();
        assert!(checkpoints.list(&store, "nb", "a.ipynb").unwrap().is_empty());
        assert!(checkpoints.locks.is_empty());
    }

    #[test]
    fn forget_without_history_is_a_no_op() {
        let (_temp, store, checkpoints) = setup();
        checkpoints.forget(&store, "nb/other.ipynb").unwrap();
        checkpoints.forget(&store, "/").unwrap();
        assert_eq!(store.read_bytes("nb", "a.ipynb").unwrap(), b"v1");
    }
}
