//! Node polymorphism: the tagged sum over directory trees, opaque files,
//! and linked-data files, plus the header-dispatched loader, the history
//! walk, and block-closure copying between stores.

use crate::error::FsError;
use crate::store::Store;
use crate::tree::file::File;
use crate::tree::header::Header;
use crate::tree::ldfile::LdFile;
use crate::tree::link::{Link, Links};
use crate::tree::skeleton::SkeletonInfo;
use crate::tree::Tree;
use crate::types::NodeType;
use ipld_core::cid::Cid;
use tracing::{debug, trace};

/// Result of persisting any node. The cid is the new revision; the link and
/// skeleton conversions are what a parent installs for this child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutResult {
    pub cid: Cid,
    pub size: i64,
    pub node_type: NodeType,
    pub userland: Option<Cid>,
    pub metadata: Option<Cid>,
    pub skeleton: Option<Cid>,
}

impl PutResult {
    pub fn to_link(&self, name: &str) -> Link {
        Link {
            name: name.to_string(),
            cid: self.cid,
            size: self.size,
            is_file: self.node_type.is_file(),
        }
    }

    pub fn to_skeleton_info(&self) -> SkeletonInfo {
        SkeletonInfo {
            cid: self.cid,
            userland: self.userland,
            metadata: self.metadata,
            sub_skeleton: self.skeleton,
            is_file: self.node_type.is_file(),
        }
    }
}

/// One revision in a node's history chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub cid: Cid,
    pub previous: Option<Cid>,
    pub node_type: NodeType,
    pub mtime: i64,
    pub size: i64,
}

/// A loaded node of any kind.
#[derive(Debug)]
pub enum Node {
    Tree(Tree),
    File(File),
    LdFile(LdFile),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Tree(t) => t.name(),
            Node::File(f) => f.name(),
            Node::LdFile(d) => d.name(),
        }
    }

    pub fn cid(&self) -> Option<Cid> {
        match self {
            Node::Tree(t) => t.cid(),
            Node::File(f) => f.cid(),
            Node::LdFile(d) => d.cid(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Tree(_) => NodeType::Dir,
            Node::File(_) => NodeType::File,
            Node::LdFile(_) => NodeType::LdFile,
        }
    }

    pub fn size(&self) -> i64 {
        match self {
            Node::Tree(t) => t.size(),
            Node::File(f) => f.size(),
            Node::LdFile(d) => d.size(),
        }
    }

    pub fn mtime(&self) -> i64 {
        match self {
            Node::Tree(t) => t.mtime(),
            Node::File(f) => f.mtime(),
            Node::LdFile(d) => d.mtime(),
        }
    }

    /// Userland payload address recorded in the node's manifest.
    pub fn userland(&self) -> Option<Cid> {
        match self {
            Node::Tree(t) => t.header().userland,
            Node::File(f) => f.header().userland,
            Node::LdFile(d) => d.cid(),
        }
    }

    /// Child links. Only directories have any.
    pub fn links(&self) -> Links {
        match self {
            Node::Tree(t) => t.links().clone(),
            _ => Links::new(),
        }
    }

    pub fn put(&mut self) -> Result<PutResult, FsError> {
        match self {
            Node::Tree(t) => t.put(),
            Node::File(f) => f.put(),
            Node::LdFile(d) => d.put(),
        }
    }

    pub fn as_history_entry(&self) -> Option<HistoryEntry> {
        match self {
            Node::Tree(t) => t.as_history_entry(),
            Node::File(f) => f.as_history_entry(),
            Node::LdFile(d) => d.as_history_entry(),
        }
    }

    pub fn history(&self, max: i64) -> Result<Vec<HistoryEntry>, FsError> {
        match self {
            Node::Tree(t) => t.history(max),
            Node::File(f) => f.history(max),
            Node::LdFile(d) => d.history(max),
        }
    }

    pub(crate) fn store(&self) -> &Store {
        match self {
            Node::Tree(t) => t.store(),
            Node::File(f) => f.store(),
            Node::LdFile(d) => d.store(),
        }
    }

    pub(crate) fn previous_pointer(&self) -> Option<Cid> {
        match self {
            Node::Tree(t) => t.header().previous,
            Node::File(f) => f.header().previous,
            Node::LdFile(d) => d.previous(),
        }
    }

    pub(crate) fn merge_pointer(&self) -> Option<Cid> {
        match self {
            Node::Tree(t) => t.header().merge,
            Node::File(f) => f.header().merge,
            Node::LdFile(_) => None,
        }
    }
}

/// Load a node by header cid, dispatching on its type tag.
pub fn load_node(store: &Store, name: &str, cid: Cid) -> Result<Node, FsError> {
    let bytes = store.get_block(&cid)?;
    let header = Header::decode(&cid, &bytes)?;
    trace!(name, cid = %cid, node_type = ?header.info.node_type, "loaded node header");

    match header.info.node_type {
        NodeType::File => Ok(Node::File(File::from_header(
            store.clone(),
            header,
            name,
            cid,
        )?)),
        NodeType::Dir => Ok(Node::Tree(Tree::from_header(
            store.clone(),
            header,
            name,
            cid,
        )?)),
        // re-decode through the linked-data rules, which inspect the block
        // for themselves
        NodeType::LdFile => Ok(Node::LdFile(LdFile::decode_block(
            store.clone(),
            name,
            cid,
            &bytes,
        )?)),
    }
}

/// Walk a history chain from `head`, loading headers only. A negative `max`
/// means unbounded.
pub(crate) fn walk_history(
    store: &Store,
    head: HistoryEntry,
    max: i64,
) -> Result<Vec<HistoryEntry>, FsError> {
    let mut log = vec![head];
    let mut prev = head.previous;
    while let Some(cid) = prev {
        if max >= 0 && log.len() as i64 >= max {
            break;
        }
        let entry = load_history_entry(store, cid)?;
        prev = entry.previous;
        log.push(entry);
    }
    Ok(log)
}

fn load_history_entry(store: &Store, cid: Cid) -> Result<HistoryEntry, FsError> {
    let bytes = store.get_block(&cid)?;
    let header = Header::decode(&cid, &bytes)?;
    Ok(HistoryEntry {
        cid,
        previous: header.previous,
        node_type: header.info.node_type,
        mtime: header.info.mtime,
        size: header.info.size,
    })
}

/// Copy the block closure of a node from one store into another: the block
/// itself, its history and metadata chains, and for directories the link
/// table and every child's closure. A no-op when both handles share a
/// backend; already-present blocks are skipped.
pub fn copy_blocks(src: &Store, dest: &Store, cid: Cid) -> Result<(), FsError> {
    if src.same_backend(dest) {
        return Ok(());
    }
    debug!(cid = %cid, "copying node closure between stores");
    copy_node(src, dest, cid)
}

fn copy_node(src: &Store, dest: &Store, cid: Cid) -> Result<(), FsError> {
    if dest.has_block(&cid)? {
        return Ok(());
    }
    let bytes = src.get_block(&cid)?;
    dest.put_block(cid.codec(), &bytes)?;

    // leaf blocks (raw content, bare linked-data values) do not decode as
    // headers and carry no outgoing links
    let header = match Header::decode(&cid, &bytes) {
        Ok(h) => h,
        Err(_) => return Ok(()),
    };

    for linked in [header.previous, header.merge, header.metadata]
        .into_iter()
        .flatten()
    {
        copy_node(src, dest, linked)?;
    }
    if let Some(skeleton) = header.skeleton {
        copy_leaf(src, dest, skeleton)?;
    }
    if let Some(userland) = header.userland {
        match header.info.node_type {
            NodeType::Dir => {
                copy_leaf(src, dest, userland)?;
                let links = Links::decode_block(&userland, &src.get_block(&userland)?)?;
                for link in links.sorted() {
                    copy_node(src, dest, link.cid)?;
                }
            }
            NodeType::File | NodeType::LdFile => copy_leaf(src, dest, userland)?,
        }
    }
    Ok(())
}

fn copy_leaf(src: &Store, dest: &Store, cid: Cid) -> Result<(), FsError> {
    if dest.has_block(&cid)? {
        return Ok(());
    }
    let bytes = src.get_block(&cid)?;
    dest.put_block(cid.codec(), &bytes)?;
    Ok(())
}
