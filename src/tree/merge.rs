//! History-aware three-way merge.
//!
//! Two heads of the same logical node are reconciled by searching their
//! previous chains for a common revision. Depending on where the match
//! lands the merge is a no-op (in sync), an adoption of the other head
//! (fast-forward / local-ahead), or a true merge commit: the winner is
//! picked deterministically (higher generation, then smaller cid bytes),
//! directories reconcile recursively, and the result records the losing
//! head in its merge pointer. Results always persist onto the destination
//! store, the first argument's.

use crate::error::FsError;
use crate::store::{Store, DAG_CBOR_CODEC};
use crate::tree::header::Header;
use crate::tree::link::Link;
use crate::tree::node::{copy_blocks, load_node, Node};
use crate::tree::skeleton::SkeletonInfo;
use crate::tree::Tree;
use crate::types::timestamp;
use ipld_core::cid::Cid;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, instrument};

/// How two heads relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeType {
    /// Identical heads; nothing to do.
    InSync,
    /// The other head descends from ours; adopt it.
    FastForward,
    /// Our head descends from the other; keep it.
    LocalAhead,
    /// Divergent histories reconciled into a new revision.
    MergeCommit,
}

/// Outcome of a merge, addressed on the destination store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeResult {
    pub kind: MergeType,
    pub cid: Cid,
    pub userland: Option<Cid>,
    pub size: i64,
    pub is_file: bool,
}

impl MergeResult {
    fn to_link(&self, name: &str) -> Link {
        Link {
            name: name.to_string(),
            cid: self.cid,
            size: self.size,
            is_file: self.is_file,
        }
    }

    fn to_skeleton_info(&self) -> SkeletonInfo {
        SkeletonInfo {
            cid: self.cid,
            userland: self.userland,
            metadata: None,
            sub_skeleton: None,
            is_file: self.is_file,
        }
    }
}

/// Merge `b` into `a`, persisting onto `a`'s store.
///
/// Deterministic (`merge(a, b)` and `merge(b, a)` produce the same cid) and
/// idempotent (merging a head with its own merge result fast-forwards).
pub fn merge(a: &Node, b: &Node) -> Result<MergeResult, FsError> {
    let dest = a.store().clone();
    merge_onto(&dest, a, b)
}

#[instrument(skip_all, fields(a = %display_cid(a), b = %display_cid(b)))]
fn merge_onto(dest: &Store, a: &Node, b: &Node) -> Result<MergeResult, FsError> {
    let a_cid = a
        .cid()
        .ok_or(FsError::NotSupported("merging an unpersisted node"))?;
    let b_cid = b
        .cid()
        .ok_or(FsError::NotSupported("merging an unpersisted node"))?;

    if a_cid == b_cid {
        return Ok(MergeResult {
            kind: MergeType::InSync,
            cid: a_cid,
            userland: a.userland(),
            size: a.size(),
            is_file: a.node_type().is_file(),
        });
    }

    // ancestry search over both revision graphs, tracking each candidate's
    // distance from its head. Merge pointers count as parent edges, so a
    // head that lost an earlier merge is still recognized as an ancestor of
    // the commit that absorbed it.
    let a_graph = ancestor_generations(a)?;
    let b_graph = ancestor_generations(b)?;
    let b_gens: HashMap<Cid, usize> = b_graph.iter().rev().cloned().collect();

    for (a_cand, a_gen) in &a_graph {
        if let Some(&b_gen) = b_gens.get(a_cand) {
            debug!(a_gen, b_gen, ancestor = %a_cand, "found common revision");
            if *a_gen == 0 && b_gen > 0 {
                return Ok(MergeResult {
                    kind: MergeType::FastForward,
                    cid: b_cid,
                    userland: b.userland(),
                    size: b.size(),
                    is_file: b.node_type().is_file(),
                });
            } else if *a_gen > 0 && b_gen == 0 {
                return Ok(MergeResult {
                    kind: MergeType::LocalAhead,
                    cid: a_cid,
                    userland: a.userland(),
                    size: a.size(),
                    is_file: a.node_type().is_file(),
                });
            }
            return merge_commit(dest, a, b, *a_gen, b_gen);
        }
    }

    // no common history: decide on graph height alone
    let a_height = a_graph.last().map(|(_, g)| *g).unwrap_or(0);
    let b_height = b_graph.last().map(|(_, g)| *g).unwrap_or(0);
    merge_commit(dest, a, b, a_height, b_height)
}

/// Breadth-first enumeration of a head's ancestor revisions with their
/// generation (edge distance from the head), following both previous and
/// merge pointers. Entries come out in non-decreasing generation order;
/// only headers are loaded.
fn ancestor_generations(node: &Node) -> Result<Vec<(Cid, usize)>, FsError> {
    let store = node.store();
    let head = node
        .cid()
        .ok_or(FsError::NotSupported("merging an unpersisted node"))?;

    let mut out = vec![(head, 0usize)];
    let mut seen: HashSet<Cid> = HashSet::from([head]);
    let mut queue: VecDeque<(Cid, usize)> = VecDeque::new();
    // the head's edges come from the in-memory node; the rest are loaded
    // header-only from the store
    if let Some(previous) = node.previous_pointer() {
        queue.push_back((previous, 1));
    }
    if let Some(merge) = node.merge_pointer() {
        queue.push_back((merge, 1));
    }

    while let Some((cid, gen)) = queue.pop_front() {
        if !seen.insert(cid) {
            continue;
        }
        out.push((cid, gen));
        let header = Header::decode(&cid, &store.get_block(&cid)?)?;
        if let Some(previous) = header.previous {
            queue.push_back((previous, gen + 1));
        }
        if let Some(merge) = header.merge {
            queue.push_back((merge, gen + 1));
        }
    }
    Ok(out)
}

/// Divergent heads: pick the winner, then combine.
fn merge_commit(
    dest: &Store,
    a: &Node,
    b: &Node,
    a_gen: usize,
    b_gen: usize,
) -> Result<MergeResult, FsError> {
    let (winner, loser) =
        if a_gen < b_gen || (a_gen == b_gen && cid_less(&head_cid(b)?, &head_cid(a)?)) {
            (b, a)
        } else {
            (a, b)
        };

    match (winner, loser) {
        (Node::Tree(w), Node::Tree(l)) => merge_trees(dest, w.clone(), l),
        (Node::Tree(_), _) | (_, Node::Tree(_)) => Err(FsError::MergeImpossible {
            a: head_cid(winner)?,
            b: head_cid(loser)?,
        }),
        (Node::File(w), _) => merge_scalar_file(dest, w, loser),
        (Node::LdFile(_), _) => Err(FsError::MergeImpossible {
            a: head_cid(winner)?,
            b: head_cid(loser)?,
        }),
    }
}

/// Recursive directory merge: walk the loser's skeleton, adopting entries
/// the winner lacks, recursing where both sides changed, then make sure the
/// winner's own subtrees are present on the destination store. The re-seated
/// winner persists with its merge pointer set to the losing head.
fn merge_trees(dest: &Store, mut winner: Tree, loser: &Tree) -> Result<MergeResult, FsError> {
    let winner_cid = winner
        .cid()
        .ok_or(FsError::NotSupported("merging an unpersisted node"))?;
    let loser_cid = loser
        .cid()
        .ok_or(FsError::NotSupported("merging an unpersisted node"))?;
    debug!(winner = %winner_cid, loser = %loser_cid, "merging trees");

    // bring both closures over up front so history and merge pointers stay
    // dereferenceable when the heads came from another store
    copy_blocks(winner.store(), dest, winner_cid)?;
    copy_blocks(loser.store(), dest, loser_cid)?;

    let mut checked: HashSet<String> = HashSet::new();
    let mut installs: Vec<(String, Link, SkeletonInfo)> = Vec::new();

    for (name, rem_info) in loser.skeleton().iter() {
        match winner.skeleton().get(name) {
            None => {
                // only the loser has it: adopt the subtree as-is
                let node = load_node(loser.store(), name, rem_info.cid)?;
                copy_blocks(loser.store(), dest, rem_info.cid)?;
                installs.push((
                    name.clone(),
                    Link {
                        name: name.clone(),
                        cid: rem_info.cid,
                        size: node.size(),
                        is_file: rem_info.is_file,
                    },
                    rem_info.clone(),
                ));
                checked.insert(name.clone());
            }
            Some(local) if local.cid == rem_info.cid => {
                checked.insert(name.clone());
            }
            Some(local) => {
                // both changed: recurse
                let lcl = load_node(winner.store(), name, local.cid)?;
                let rem = load_node(loser.store(), name, rem_info.cid)?;
                let res = merge_onto(dest, &lcl, &rem)?;
                if res.kind == MergeType::FastForward {
                    copy_blocks(loser.store(), dest, res.cid)?;
                }
                installs.push((name.clone(), res.to_link(name), res.to_skeleton_info()));
                checked.insert(name.clone());
            }
        }
    }

    for (name, info) in winner.skeleton().iter() {
        if !checked.contains(name) {
            copy_blocks(winner.store(), dest, info.cid)?;
        }
    }

    winner.install_merge(dest.clone(), loser_cid, installs);
    let res = winner.put()?;
    Ok(MergeResult {
        kind: MergeType::MergeCommit,
        cid: res.cid,
        userland: res.userland,
        size: res.size,
        is_file: false,
    })
}

/// Non-tree winner: a new winner-shaped revision whose previous pointer is
/// the winning head and whose merge pointer is the losing head, content and
/// metadata carried over.
fn merge_scalar_file(
    dest: &Store,
    winner: &crate::tree::file::File,
    loser: &Node,
) -> Result<MergeResult, FsError> {
    let winner_cid = winner
        .cid()
        .ok_or(FsError::NotSupported("merging an unpersisted node"))?;
    let loser_cid = head_cid(loser)?;
    debug!(winner = %winner_cid, loser = %loser_cid, "merging file heads");

    copy_blocks(winner.store(), dest, winner_cid)?;
    copy_blocks(loser.store(), dest, loser_cid)?;

    let mut header = winner.header().clone();
    header.previous = Some(winner_cid);
    header.merge = Some(loser_cid);
    header.info.mtime = timestamp();

    let bytes = header.encode()?;
    let cid = dest.put_block(DAG_CBOR_CODEC, &bytes)?;

    Ok(MergeResult {
        kind: MergeType::MergeCommit,
        cid,
        userland: header.userland,
        size: header.info.size,
        is_file: true,
    })
}

/// Lexicographic comparison over serialized cid bytes, the deterministic
/// tie-break for equal generations.
fn cid_less(a: &Cid, b: &Cid) -> bool {
    a.to_bytes() < b.to_bytes()
}

fn head_cid(n: &Node) -> Result<Cid, FsError> {
    n.cid()
        .ok_or(FsError::NotSupported("merging an unpersisted node"))
}

fn display_cid(n: &Node) -> String {
    n.cid().map(|c| c.to_string()).unwrap_or_else(|| "?".into())
}
