use nbcontents::checkpoint::{
    CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, SequentialIds, UlidIds,
};
use nbcontents::model::WriteModel;
use nbcontents::store::{ContentStore, FileSystemStore, MemoryStore};
use nbcontents::ErrorKind;
use std::sync::Arc;
use tempfile::TempDir;

fn exercise_history(store: &dyn ContentStore, checkpoints: &dyn CheckpointStore) {
    store
        .write("nb", &WriteModel::from_bytes("doc.ipynb", b"first"))
        .unwrap();
    assert!(checkpoints.list(store, "nb", "doc.ipynb").unwrap().is_empty());

    let first = checkpoints.create(store, "nb", "doc.ipynb").unwrap();
    store
        .write("nb", &WriteModel::from_bytes("doc.ipynb", b"second"))
        .unwrap();
    let second = checkpoints.create(store, "nb", "doc.ipynb").unwrap();
    assert_ne!(first.checkpoint_id, second.checkpoint_id);

    store
        .write("nb", &WriteModel::from_bytes("doc.ipynb", b"third"))
        .unwrap();
    let before = checkpoints.list(store, "nb", "doc.ipynb").unwrap();
    assert_eq!(before, vec![first.clone(), second.clone()]);

    checkpoints
        .restore(store, "nb", "doc.ipynb", &first.checkpoint_id)
        .unwrap();
    assert_eq!(store.read_bytes("nb", "doc.ipynb").unwrap(), b"first");
    assert_eq!(checkpoints.list(store, "nb", "doc.ipynb").unwrap(), before);

    checkpoints
        .restore(store, "nb", "doc.ipynb", &second.checkpoint_id)
        .unwrap();
    assert_eq!(store.read_bytes("nb", "doc.ipynb").unwrap(), b"second");

    assert_eq!(
        checkpoints
            .restore(store, "nb", "doc.ipynb", "no-such-id")
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        checkpoints
            .restore(store, "nb", "gone.ipynb", &first.checkpoint_id)
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );

    checkpoints
        .delete(store, "nb", "doc.ipynb", &first.checkpoint_id)
        .unwrap();
    assert_eq!(
        checkpoints.list(store, "nb", "doc.ipynb").unwrap(),
        vec![second]
    );
}

#[test]
fn file_checkpoints_on_filesystem() {
    let temp = TempDir::new().unwrap();
    let store = FileSystemStore::open(temp.path()).unwrap();
    let checkpoints = FileCheckpointStore::new(Arc::new(SequentialIds));
    exercise_history(&store, &checkpoints);
}

#[test]
fn file_checkpoints_with_ulids_on_memory_store() {
    let store = MemoryStore::new("/mem");
    let checkpoints = FileCheckpointStore::new(Arc::new(UlidIds));
    exercise_history(&store, &checkpoints);
}

#[test]
fn memory_checkpoints() {
    let store = MemoryStore::new("/mem");
    let checkpoints = MemoryCheckpointStore::new(Arc::new(SequentialIds));
    exercise_history(&store, &checkpoints);
}

#[test]
fn file_history_survives_a_new_store_instance() {
    let temp = TempDir::new().unwrap();
    {
        let store = FileSystemStore::open(temp.path()).unwrap();
        store
            .write("/", &WriteModel::from_bytes("a.ipynb", b"v1"))
            .unwrap();
        FileCheckpointStore::new(Arc::new(SequentialIds))
            .create(&store, "/", "a.ipynb")
            .unwrap();
    }

    let store = FileSystemStore::open(temp.path()).unwrap();
    let checkpoints = FileCheckpointStore::new(Arc::new(SequentialIds));
    let history = checkpoints.list(&store, "/", "a.ipynb").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(
        checkpoints.create(&store, "/", "a.ipynb").unwrap().checkpoint_id,
        "1"
    );
}
