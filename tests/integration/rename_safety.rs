use nbcontents::model::WriteModel;
use nbcontents::store::{ContentStore, FileSystemStore, MemoryStore};
use nbcontents::ErrorKind;
use tempfile::TempDir;

fn seed(store: &dyn ContentStore) {
    store
        .write("docs", &WriteModel::from_bytes("a.txt", b"alpha"))
        .unwrap();
    store
        .write("docs", &WriteModel::from_bytes("b.txt", b"\x00beta\xff"))
        .unwrap();
}

fn assert_rename_never_overwrites(store: &dyn ContentStore) {
    seed(store);

    let err = store.rename("docs/a.txt", "docs/b.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(store.read_bytes("docs", "a.txt").unwrap(), b"alpha");
    assert_eq!(store.read_bytes("docs", "b.txt").unwrap(), b"\x00beta\xff");

    let err = store.rename("docs/missing.txt", "docs/c.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store.rename("docs/a.txt", "nowhere/a.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDestination);

    let moved = store.rename("docs/a.txt", "docs/c.txt").unwrap();
    assert_eq!(moved.name, "c.txt");
    assert!(!store.exists("docs", Some("a.txt")));
    assert_eq!(store.read_bytes("docs", "c.txt").unwrap(), b"alpha");
}

fn assert_no_rename_into_own_subtree(store: &dyn ContentStore) {
    store.make_container(Some("d"), "/").unwrap();
    store
        .write("d", &WriteModel::from_bytes("keep.txt", b"kept"))
        .unwrap();

    for dest in ["d/inner", "/d/x/y"] {
        let err = store.rename("d", dest).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDestination, "rename d -> {dest}");
    }
    assert_eq!(store.read_bytes("d", "keep.txt").unwrap(), b"kept");

    // A sibling that merely shares the name prefix is a valid target
    store.rename("d", "dd").unwrap();
    assert_eq!(store.read_bytes("dd", "keep.txt").unwrap(), b"kept");
}

fn assert_root_is_undeletable(store: &dyn ContentStore) {
    for path in ["", "/", "//", "./"] {
        assert_eq!(store.delete(path).unwrap_err().kind(), ErrorKind::Forbidden);
    }
    seed(store);
    assert_eq!(store.delete("/").unwrap_err().kind(), ErrorKind::Forbidden);
    assert!(store.exists("docs", Some("a.txt")));

    store.delete("docs").unwrap();
    assert!(!store.exists("/", Some("docs")));
    assert_eq!(store.delete("docs").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn filesystem_rename_never_overwrites() {
    let temp = TempDir::new().unwrap();
    let store = FileSystemStore::open(temp.path()).unwrap();
    assert_rename_never_overwrites(&store);
}

#[test]
fn memory_rename_never_overwrites() {
    let store = MemoryStore::new("/mem");
    assert_rename_never_overwrites(&store);
}

#[test]
fn filesystem_rejects_rename_into_own_subtree() {
    let temp = TempDir::new().unwrap();
    let store = FileSystemStore::open(temp.path()).unwrap();
    assert_no_rename_into_own_subtree(&store);
    assert!(!temp.path().join("d").exists());
}

#[test]
fn memory_rejects_rename_into_own_subtree() {
    let store = MemoryStore::new("/mem");
    assert_no_rename_into_own_subtree(&store);
}

#[test]
fn filesystem_root_is_undeletable() {
    let temp = TempDir::new().unwrap();
    let store = FileSystemStore::open(temp.path()).unwrap();
    assert_root_is_undeletable(&store);
    assert!(temp.path().is_dir());
}

#[test]
fn memory_root_is_undeletable() {
    let store = MemoryStore::new("/mem");
    assert_root_is_undeletable(&store);
}

#[test]
fn make_container_allocates_distinct_names() {
    let temp = TempDir::new().unwrap();
    let store = FileSystemStore::open(temp.path()).unwrap();
    let names: Vec<String> = (0..3)
        .map(|_| store.make_container(None, "/").unwrap())
        .collect();
    assert_eq!(names, vec!["new_folder0", "new_folder1", "new_folder2"]);

    let err = store.make_container(Some("new_folder1"), "/").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}
