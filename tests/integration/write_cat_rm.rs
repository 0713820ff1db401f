//! Write, read back, remove, and list files through the facade.

use chronofs::{FileInput, FileSystem, FsError, Store};

#[test]
fn test_write_cat_rm() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store.clone()).unwrap();

    let r1 = fs
        .write(
            "public/foo/hello.txt",
            FileInput::bytes("hello.txt", "hello"),
        )
        .unwrap();
    assert_eq!(fs.cat("public/foo/hello.txt").unwrap(), b"hello");

    let r2 = fs.rm("public/foo/hello.txt").unwrap();
    assert_ne!(r1.cid, r2.cid);
    assert!(matches!(
        fs.cat("public/foo/hello.txt"),
        Err(FsError::NotFound(_))
    ));

    // the parent directory survives, empty
    assert!(fs.ls("public/foo").unwrap().is_empty());
    let entries = fs.ls("public").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "foo");

    // superseded roots stay fully readable
    let old = FileSystem::load(store, r1.cid).unwrap();
    assert_eq!(old.cat("public/foo/hello.txt").unwrap(), b"hello");
}

#[test]
fn test_mkdir_then_ls_is_name_sorted() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store).unwrap();
    fs.write(
        "public/foo/hello.txt",
        FileInput::bytes("hello.txt", "hello"),
    )
    .unwrap();
    fs.rm("public/foo/hello.txt").unwrap();

    fs.mkdir("public/bar").unwrap();
    let names: Vec<String> = fs
        .ls("public")
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["bar", "foo"]);
}

#[test]
fn test_overwrite_updates_content() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store).unwrap();
    fs.write("public/hello.txt", FileInput::bytes("hello.txt", "hello"))
        .unwrap();
    fs.write(
        "public/hello.txt",
        FileInput::bytes("hello.txt", "hello number two"),
    )
    .unwrap();
    assert_eq!(fs.cat("public/hello.txt").unwrap(), b"hello number two");
}

#[test]
fn test_rm_missing_path_is_not_found() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store).unwrap();
    assert!(matches!(
        fs.rm("public/ghost.txt"),
        Err(FsError::NotFound(_))
    ));
}

#[test]
fn test_file_metadata_rides_along() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store).unwrap();
    let input = FileInput::bytes("tagged.txt", "payload")
        .with_metadata(chronofs::Ipld::String("text/plain".into()));
    fs.write("public/tagged.txt", input).unwrap();

    match fs.open("public/tagged.txt").unwrap() {
        chronofs::Node::File(f) => {
            let md = f.metadata().expect("metadata side-file");
            assert_eq!(md.content(), &chronofs::Ipld::String("text/plain".into()));
        }
        other => panic!("expected file, got {:?}", other.node_type()),
    }
}
