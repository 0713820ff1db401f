//! Roots survive process restarts through the sled-backed store.

use chronofs::{FileInput, FileSystem, SledBlockStore, Store};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_filesystem_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("blocks");

    let root = {
        let backend = Arc::new(SledBlockStore::open(&path).unwrap());
        let store = Store::new(backend.clone());
        let mut fs = FileSystem::empty(store).unwrap();
        fs.write(
            "public/persistent.txt",
            FileInput::bytes("persistent.txt", "still here"),
        )
        .unwrap();
        backend.flush().unwrap();
        fs.root_cid()
    };

    let store = Store::new(Arc::new(SledBlockStore::open(&path).unwrap()));
    let fs = FileSystem::load(store, root).unwrap();
    assert_eq!(fs.cat("public/persistent.txt").unwrap(), b"still here");
    assert_eq!(fs.history("", -1).unwrap().len(), 2);
}

#[test]
fn test_history_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("blocks");

    let root = {
        let backend = Arc::new(SledBlockStore::open(&path).unwrap());
        let store = Store::new(backend.clone());
        let mut fs = FileSystem::empty(store).unwrap();
        fs.write("public/a.txt", FileInput::bytes("a.txt", "1"))
            .unwrap();
        fs.write("public/a.txt", FileInput::bytes("a.txt", "2"))
            .unwrap();
        backend.flush().unwrap();
        fs.root_cid()
    };

    let store = Store::new(Arc::new(SledBlockStore::open(&path).unwrap()));
    let fs = FileSystem::load(store, root).unwrap();
    let log = fs.history("public/a.txt", -1).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(fs.cat("public/a.txt").unwrap(), b"2");
}
