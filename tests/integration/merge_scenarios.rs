//! Merge classification and reconciliation through the facade.

use super::test_utils::with_fixed_clock;
use chronofs::{
    copy_blocks, FileInput, FileSystem, MergeType, Store, Tree,
};

#[test]
fn test_merge_with_self_is_in_sync() {
    let store = Store::in_memory();
    let mut fs = FileSystem::empty(store.clone()).unwrap();
    fs.write("public/a.txt", FileInput::bytes("a.txt", "a"))
        .unwrap();

    let other = FileSystem::load(store, fs.root_cid()).unwrap();
    let res = fs.merge(&other).unwrap();
    assert_eq!(res.kind, MergeType::InSync);
    assert_eq!(res.cid, other.root_cid());
}

#[test]
fn test_fast_forward_adopts_descendant() {
    let store = Store::in_memory();
    let a = FileSystem::empty(store.clone()).unwrap();
    let r_a = a.root_cid();

    let mut c = FileSystem::load(store.clone(), r_a).unwrap();
    c.write("public/x", FileInput::bytes("x", "1")).unwrap();
    c.write("public/y", FileInput::bytes("y", "2")).unwrap();

    let mut stale = FileSystem::load(store, r_a).unwrap();
    let res = stale.merge(&c).unwrap();
    assert_eq!(res.kind, MergeType::FastForward);
    assert_eq!(res.cid, c.root_cid());
    assert_eq!(stale.root_cid(), c.root_cid());
    assert_eq!(stale.cat("public/y").unwrap(), b"2");
}

#[test]
fn test_local_ahead_keeps_own_head() {
    let store = Store::in_memory();
    let a = FileSystem::empty(store.clone()).unwrap();
    let r_a = a.root_cid();

    let mut ahead = FileSystem::load(store.clone(), r_a).unwrap();
    ahead
        .write("public/x", FileInput::bytes("x", "1"))
        .unwrap();
    let head = ahead.root_cid();

    let stale = FileSystem::load(store, r_a).unwrap();
    let res = ahead.merge(&stale).unwrap();
    assert_eq!(res.kind, MergeType::LocalAhead);
    assert_eq!(res.cid, head);
    assert_eq!(ahead.root_cid(), head);
}

#[test]
fn test_divergent_merge_is_deterministic() {
    with_fixed_clock(1_700_100_000, || {
        let store = Store::in_memory();
        let base = FileSystem::empty(store.clone()).unwrap();
        let r_a = base.root_cid();

        let mut x = FileSystem::load(store.clone(), r_a).unwrap();
        x.write("public/a", FileInput::bytes("a", "A")).unwrap();
        let r_x = x.root_cid();

        let mut y = FileSystem::load(store.clone(), r_a).unwrap();
        y.write("public/b", FileInput::bytes("b", "B")).unwrap();
        let r_y = y.root_cid();

        let mut left = FileSystem::load(store.clone(), r_x).unwrap();
        let m1 = left
            .merge(&FileSystem::load(store.clone(), r_y).unwrap())
            .unwrap();
        let mut right = FileSystem::load(store.clone(), r_y).unwrap();
        let m2 = right
            .merge(&FileSystem::load(store.clone(), r_x).unwrap())
            .unwrap();

        assert_eq!(m1.kind, MergeType::MergeCommit);
        assert_eq!(m2.kind, MergeType::MergeCommit);
        assert_eq!(m1.cid, m2.cid);

        // the merged tree carries both branches
        let merged = FileSystem::load(store.clone(), m1.cid).unwrap();
        let names: Vec<String> = merged
            .ls("public")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(merged.cat("public/a").unwrap(), b"A");
        assert_eq!(merged.cat("public/b").unwrap(), b"B");

        // the root header records the losing head in its merge pointer
        let root = Tree::load(store, "", m1.cid).unwrap();
        let merge_ptr = root.header().merge.expect("merge pointer set");
        assert!(merge_ptr == r_x || merge_ptr == r_y);
        let previous = root.header().previous.expect("previous pointer set");
        assert!(previous == r_x || previous == r_y);
        assert_ne!(merge_ptr, previous);
    });
}

#[test]
fn test_merge_is_idempotent() {
    with_fixed_clock(1_700_200_000, || {
        let store = Store::in_memory();
        let base = FileSystem::empty(store.clone()).unwrap();
        let r_a = base.root_cid();

        let mut x = FileSystem::load(store.clone(), r_a).unwrap();
        x.write("public/a", FileInput::bytes("a", "A")).unwrap();
        let r_x = x.root_cid();

        let mut y = FileSystem::load(store.clone(), r_a).unwrap();
        y.write("public/b", FileInput::bytes("b", "B")).unwrap();
        let r_y = y.root_cid();

        let mut left = FileSystem::load(store.clone(), r_x).unwrap();
        let m = left
            .merge(&FileSystem::load(store.clone(), r_y).unwrap())
            .unwrap();

        let mut again = FileSystem::load(store.clone(), r_x).unwrap();
        let res = again
            .merge(&FileSystem::load(store, m.cid).unwrap())
            .unwrap();
        assert_eq!(res.kind, MergeType::FastForward);
        assert_eq!(res.cid, m.cid);
    });
}

#[test]
fn test_mutation_after_merge_clears_merge_pointer() {
    with_fixed_clock(1_700_300_000, || {
        let store = Store::in_memory();
        let base = FileSystem::empty(store.clone()).unwrap();
        let r_a = base.root_cid();

        let mut x = FileSystem::load(store.clone(), r_a).unwrap();
        x.write("public/a", FileInput::bytes("a", "A")).unwrap();
        let mut y = FileSystem::load(store.clone(), r_a).unwrap();
        y.write("public/b", FileInput::bytes("b", "B")).unwrap();

        x.merge(&y).unwrap();
        let merged_root = x.root_cid();
        let res = x
            .write("public/c", FileInput::bytes("c", "C"))
            .unwrap();

        let root = Tree::load(store, "", res.cid).unwrap();
        assert_eq!(root.header().merge, None);
        assert_eq!(root.header().previous, Some(merged_root));
    });
}

#[test]
fn test_cross_store_merge_lands_on_destination() {
    with_fixed_clock(1_700_400_000, || {
        let store_a = Store::in_memory();
        let store_b = Store::in_memory();

        let base = FileSystem::empty(store_a.clone()).unwrap();
        let r_a = base.root_cid();
        copy_blocks(&store_a, &store_b, r_a).unwrap();

        let mut x = FileSystem::load(store_a.clone(), r_a).unwrap();
        x.write("public/a", FileInput::bytes("a", "A")).unwrap();
        let mut y = FileSystem::load(store_b.clone(), r_a).unwrap();
        y.write("public/b", FileInput::bytes("b", "B")).unwrap();

        let res = x.merge(&y).unwrap();
        assert_eq!(res.kind, MergeType::MergeCommit);

        // every block behind the merged root is readable from a's store
        let merged = FileSystem::load(store_a, res.cid).unwrap();
        assert_eq!(merged.cat("public/a").unwrap(), b"A");
        assert_eq!(merged.cat("public/b").unwrap(), b"B");
    });
}

#[test]
fn test_cross_store_fast_forward_copies_blocks() {
    with_fixed_clock(1_700_500_000, || {
        let store_a = Store::in_memory();
        let store_b = Store::in_memory();

        let base = FileSystem::empty(store_a.clone()).unwrap();
        let r_a = base.root_cid();
        copy_blocks(&store_a, &store_b, r_a).unwrap();

        let mut remote = FileSystem::load(store_b, r_a).unwrap();
        remote
            .write("public/new.txt", FileInput::bytes("new.txt", "new"))
            .unwrap();

        let mut local = FileSystem::load(store_a.clone(), r_a).unwrap();
        let res = local.merge(&remote).unwrap();
        assert_eq!(res.kind, MergeType::FastForward);

        let adopted = FileSystem::load(store_a, res.cid).unwrap();
        assert_eq!(adopted.cat("public/new.txt").unwrap(), b"new");
    });
}
