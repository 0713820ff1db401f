//! Copying from OS directories and between filesystems.

use chronofs::{FileInput, FileSystem, OsDirFs, Store};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_cp_os_directory() {
    let temp_dir = TempDir::new().unwrap();
    let cats = temp_dir.path().join("cats");
    fs::create_dir(&cats).unwrap();
    fs::write(cats.join("millie.txt"), "tabby").unwrap();
    fs::write(cats.join("otto.txt"), "void").unwrap();

    let store = Store::in_memory();
    let mut fsys = FileSystem::empty(store).unwrap();
    fsys.cp("public/cats", "cats", &OsDirFs::new(temp_dir.path()))
        .unwrap();

    let names: Vec<String> = fsys
        .ls("public/cats")
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["millie.txt", "otto.txt"]);
    assert_eq!(fsys.cat("public/cats/millie.txt").unwrap(), b"tabby");
    assert_eq!(fsys.cat("public/cats/otto.txt").unwrap(), b"void");
}

#[test]
fn test_cp_nested_os_directories() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("copy_me");
    for i in 0..3 {
        let dir = root.join(format!("dir_{}", i));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("note.txt"), format!("note {}", i)).unwrap();
    }

    let store = Store::in_memory();
    let mut fsys = FileSystem::empty(store).unwrap();
    fsys.cp("public/copy_me", "copy_me", &OsDirFs::new(temp_dir.path()))
        .unwrap();

    assert_eq!(fsys.ls("public/copy_me").unwrap().len(), 3);
    assert_eq!(
        fsys.cat("public/copy_me/dir_0/note.txt").unwrap(),
        b"note 0"
    );
    assert_eq!(
        fsys.cat("public/copy_me/dir_2/note.txt").unwrap(),
        b"note 2"
    );
}

#[test]
fn test_cp_empty_os_directory() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("empty")).unwrap();

    let store = Store::in_memory();
    let mut fsys = FileSystem::empty(store).unwrap();
    fsys.cp("public/empty", "empty", &OsDirFs::new(temp_dir.path()))
        .unwrap();

    assert!(fsys.ls("public/empty").unwrap().is_empty());
}

#[test]
fn test_cp_missing_source_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::in_memory();
    let mut fsys = FileSystem::empty(store).unwrap();
    assert!(fsys
        .cp("public/x", "missing", &OsDirFs::new(temp_dir.path()))
        .is_err());
}

#[test]
fn test_cp_from_another_filesystem_preserves_structure() {
    let mut src = FileSystem::empty(Store::in_memory()).unwrap();
    src.write("public/docs/a.txt", FileInput::bytes("a.txt", "alpha"))
        .unwrap();
    src.write(
        "public/docs/sub/b.txt",
        FileInput::bytes("b.txt", "beta"),
    )
    .unwrap();
    src.write(
        "public/docs/data.json",
        FileInput::structured("data.json", chronofs::Ipld::Integer(9)),
    )
    .unwrap();

    let mut dst = FileSystem::empty(Store::in_memory()).unwrap();
    dst.cp("public/docs", "public/docs", &src).unwrap();

    assert_eq!(dst.cat("public/docs/a.txt").unwrap(), b"alpha");
    assert_eq!(dst.cat("public/docs/sub/b.txt").unwrap(), b"beta");
    assert_eq!(dst.cat("public/docs/data.json").unwrap(), b"9");
}
