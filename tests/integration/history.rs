//! Revision history over the root previous-pointer chain.

use chronofs::{FileInput, FileSystem, Store};

#[test]
fn test_three_mutations_yield_four_revisions() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store).unwrap();
    let r0 = fs.root_cid();

    let r1 = fs
        .write("public/one.txt", FileInput::bytes("one.txt", "1"))
        .unwrap();
    let r2 = fs
        .write("public/two.txt", FileInput::bytes("two.txt", "2"))
        .unwrap();
    let r3 = fs
        .write("public/three.txt", FileInput::bytes("three.txt", "3"))
        .unwrap();

    let log = fs.history("", -1).unwrap();
    assert_eq!(log.len(), 4);
    assert_eq!(log[0].cid, r3.cid);
    assert_eq!(log[1].cid, r2.cid);
    assert_eq!(log[2].cid, r1.cid);
    assert_eq!(log[3].cid, r0);

    // each revision's previous pointer is the next entry's cid
    for i in 0..3 {
        assert_eq!(log[i].previous, Some(log[i + 1].cid));
    }
    assert_eq!(log[3].previous, None);
}

#[test]
fn test_bounded_history() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store).unwrap();
    for i in 0..5 {
        fs.write(
            &format!("public/f{}.txt", i),
            FileInput::bytes("f", "x"),
        )
        .unwrap();
    }

    assert_eq!(fs.history("", 2).unwrap().len(), 2);
    assert_eq!(fs.history("", -1).unwrap().len(), 6);
}

#[test]
fn test_file_history_tracks_rewrites() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store).unwrap();
    fs.write("public/a.txt", FileInput::bytes("a.txt", "v1"))
        .unwrap();
    fs.write("public/a.txt", FileInput::bytes("a.txt", "v2"))
        .unwrap();
    fs.write("public/a.txt", FileInput::bytes("a.txt", "v3"))
        .unwrap();

    let log = fs.history("public/a.txt", -1).unwrap();
    assert_eq!(log.len(), 3);
    assert_eq!(log[2].previous, None);
}

#[test]
fn test_untouched_sibling_keeps_its_history_length() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store).unwrap();
    fs.write("public/a.txt", FileInput::bytes("a.txt", "a"))
        .unwrap();
    fs.write("public/b.txt", FileInput::bytes("b.txt", "b"))
        .unwrap();
    fs.write("public/b.txt", FileInput::bytes("b.txt", "bb"))
        .unwrap();

    assert_eq!(fs.history("public/a.txt", -1).unwrap().len(), 1);
    assert_eq!(fs.history("public/b.txt", -1).unwrap().len(), 2);
}
