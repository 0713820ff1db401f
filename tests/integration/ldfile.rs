//! Linked-data files through the facade.

use chronofs::{FileInput, FileSystem, FsError, Ipld, Node, Store};
use std::collections::BTreeMap;

fn sample_value() -> Ipld {
    let mut m = BTreeMap::new();
    m.insert(
        "k".to_string(),
        Ipld::List(vec![Ipld::Integer(1), Ipld::Integer(2), Ipld::Integer(3)]),
    );
    Ipld::Map(m)
}

#[test]
fn test_structured_round_trip() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store.clone()).unwrap();
    let res = fs
        .write(
            "public/data.json",
            FileInput::structured("data.json", sample_value()),
        )
        .unwrap();

    // cat renders the content as JSON bytes
    assert_eq!(fs.cat("public/data.json").unwrap(), br#"{"k":[1,2,3]}"#);

    // reloading from the root cid decodes the same value
    let reloaded = FileSystem::load(store, res.cid).unwrap();
    match reloaded.open("public/data.json").unwrap() {
        Node::LdFile(d) => {
            assert!(!d.is_bare());
            assert_eq!(d.content(), &sample_value());
        }
        other => panic!("expected linked-data file, got {:?}", other.node_type()),
    }
}

#[test]
fn test_structured_update_keeps_history() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store).unwrap();
    fs.write(
        "public/data.json",
        FileInput::structured("data.json", Ipld::Integer(1)),
    )
    .unwrap();
    fs.write(
        "public/data.json",
        FileInput::structured("data.json", Ipld::Integer(2)),
    )
    .unwrap();

    let log = fs.history("public/data.json", -1).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].previous, None);
    assert_eq!(fs.cat("public/data.json").unwrap(), b"2");
}

#[test]
fn test_bare_metadata_has_no_history() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store.clone()).unwrap();
    let input =
        FileInput::bytes("tagged.txt", "payload").with_metadata(Ipld::String("plain".into()));
    fs.write("public/tagged.txt", input).unwrap();

    let md_cid = match fs.open("public/tagged.txt").unwrap() {
        Node::File(f) => f.header().metadata.expect("metadata link"),
        other => panic!("expected file, got {:?}", other.node_type()),
    };

    let side = chronofs::LdFile::load(store, "metadata", md_cid).unwrap();
    assert!(side.is_bare());
    assert!(matches!(
        side.history(-1),
        Err(FsError::NotSupported(_))
    ));
}

#[test]
fn test_ldfile_listed_as_file() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store).unwrap();
    fs.write(
        "public/data.json",
        FileInput::structured("data.json", Ipld::Null),
    )
    .unwrap();

    let entries = fs.ls("public").unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_file);
}
