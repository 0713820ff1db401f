//! Directory trees.
//!
//! A tree owns two parallel indices over its children: the userland link
//! table (the payload a peer lists) and the skeleton (per-child address
//! records for shallow traversal). Every mutation rewrites the path from the
//! touched leaf back to this node: children persist first, then the parent
//! installs the returned link and skeleton entry and re-persists itself, so
//! any cid a caller observes is fully reachable in the store.

pub mod file;
pub mod header;
pub mod ldfile;
pub mod link;
pub mod merge;
pub mod node;
pub mod skeleton;

use crate::error::FsError;
use crate::fs::{SourceFs, SourceItem};
use crate::path::{join_source, SlashPath};
use crate::store::{Store, DAG_CBOR_CODEC};
use crate::types::{timestamp, DirEntry, NodeType, METADATA_NAME};
use file::{File, FileInput};
use header::Header;
use ipld_core::cid::Cid;
use ipld_core::ipld::Ipld;
use ldfile::LdFile;
use link::{Link, Links};
use node::{load_node, walk_history, HistoryEntry, Node, PutResult};
use skeleton::{Skeleton, SkeletonInfo};
use tracing::{debug, instrument};

/// A directory node.
#[derive(Debug, Clone)]
pub struct Tree {
    store: Store,
    name: String,
    cid: Option<Cid>,
    header: Header,
    metadata: Option<LdFile>,
    skeleton: Skeleton,
    userland: Links,
    dirty: bool,
}

impl Tree {
    /// New empty directory, not yet persisted.
    pub fn empty(store: Store, name: &str) -> Tree {
        Tree {
            store,
            name: name.to_string(),
            cid: None,
            header: Header::new(NodeType::Dir),
            metadata: None,
            skeleton: Skeleton::new(),
            userland: Links::new(),
            dirty: true,
        }
    }

    /// Fetch a directory by header cid, eagerly loading its link table and
    /// skeleton.
    pub fn load(store: Store, name: &str, cid: Cid) -> Result<Tree, FsError> {
        debug!(name, cid = %cid, "loading tree");
        let bytes = store.get_block(&cid)?;
        let header = Header::decode(&cid, &bytes)?;
        Tree::from_header(store, header, name, cid)
    }

    pub(crate) fn from_header(
        store: Store,
        header: Header,
        name: &str,
        cid: Cid,
    ) -> Result<Tree, FsError> {
        if header.info.node_type != NodeType::Dir {
            return Err(FsError::TypeMismatch {
                path: name.to_string(),
                expected: "directory",
            });
        }
        // decode guarantees both links are present on directory headers
        let skeleton_cid = header.skeleton.ok_or_else(|| FsError::MalformedHeader {
            cid,
            reason: "directory header is missing skeleton link".to_string(),
        })?;
        let userland_cid = header.userland.ok_or_else(|| FsError::MalformedHeader {
            cid,
            reason: "directory header is missing userland link".to_string(),
        })?;

        let skeleton = Skeleton::load(&store, &skeleton_cid)?;
        let userland = Links::decode_block(&userland_cid, &store.get_block(&userland_cid)?)?;

        Ok(Tree {
            store,
            name: name.to_string(),
            cid: Some(cid),
            header,
            metadata: None,
            skeleton,
            userland,
            dirty: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cid(&self) -> Option<Cid> {
        self.cid
    }

    pub fn size(&self) -> i64 {
        self.header.info.size
    }

    pub fn mtime(&self) -> i64 {
        self.header.info.mtime
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn links(&self) -> &Links {
        &self.userland
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    /// Attach user metadata as a linked-data file. Persisted on next put.
    pub fn set_metadata(&mut self, value: Ipld) {
        self.metadata = Some(LdFile::new(self.store.clone(), METADATA_NAME, value));
        self.dirty = true;
    }

    /// The user metadata file, loading it on demand.
    pub fn metadata(&mut self) -> Result<Option<&LdFile>, FsError> {
        if self.metadata.is_none() {
            if let Some(cid) = self.header.metadata {
                self.metadata = Some(LdFile::load(self.store.clone(), METADATA_NAME, cid)?);
            }
        }
        Ok(self.metadata.as_ref())
    }

    /// Directory listing in name order.
    pub fn entries(&self) -> Vec<DirEntry> {
        self.userland
            .sorted()
            .map(|l| DirEntry {
                name: l.name.clone(),
                is_file: l.is_file,
            })
            .collect()
    }

    /// Resolve a path to a node. The empty path is this tree.
    pub fn get(&self, path: &SlashPath) -> Result<Node, FsError> {
        let (head, tail) = match path.shift() {
            None => return Ok(Node::Tree(self.clone())),
            Some(parts) => parts,
        };

        let link = self
            .userland
            .get(head)
            .ok_or_else(|| FsError::NotFound(head.to_string()))?;

        if tail.is_empty() {
            load_node(&self.store, head, link.cid)
        } else {
            let child = Tree::load(self.store.clone(), head, link.cid)?;
            child.get(&tail)
        }
    }

    /// Create a directory, making intermediate components as needed.
    #[instrument(skip(self), fields(dir = %self.name, path = %path))]
    pub fn mkdir(&mut self, path: &SlashPath) -> Result<PutResult, FsError> {
        let (head, tail) = path
            .shift()
            .ok_or_else(|| FsError::InvalidPath("empty".to_string()))?;

        let mut child = self.get_or_create_child_tree(head)?;
        let res = if tail.is_empty() {
            child.put()?
        } else {
            child.mkdir(&tail)?
        };

        self.update_userland_link(head, &res);
        self.put()
    }

    /// Write a payload at a path, creating intermediate directories. Routes
    /// structured payloads to a linked-data file, byte payloads to an
    /// opaque file.
    #[instrument(skip(self, input), fields(dir = %self.name, path = %path))]
    pub fn add(&mut self, path: &SlashPath, input: FileInput) -> Result<PutResult, FsError> {
        let (head, tail) = path
            .shift()
            .ok_or_else(|| FsError::InvalidPath("empty".to_string()))?;

        let res = if tail.is_empty() {
            self.create_or_update_child(head, input)?
        } else {
            let mut child = self.get_or_create_child_tree(head)?;
            child.add(&tail, input)?
        };

        self.update_userland_link(head, &res);
        self.put()
    }

    /// Copy from a source filesystem into this tree. Recursive along the
    /// destination path and, for directory sources, across their entries.
    #[instrument(skip(self, src), fields(dir = %self.name, path = %path, src_path))]
    pub fn copy(
        &mut self,
        path: &SlashPath,
        src_path: &str,
        src: &dyn SourceFs,
    ) -> Result<PutResult, FsError> {
        let (head, tail) = path
            .shift()
            .ok_or_else(|| FsError::InvalidPath("empty".to_string()))?;

        let res = if tail.is_empty() {
            match src.open(src_path)? {
                SourceItem::Dir(names) => {
                    let mut child = self.get_or_create_child_tree(head)?;
                    let mut last = None;
                    for name in names {
                        last = Some(child.copy(
                            &SlashPath::single(&name),
                            &join_source(src_path, &name),
                            src,
                        )?);
                    }
                    match last {
                        Some(res) => res,
                        None => child.put()?,
                    }
                }
                SourceItem::File(input) => self.create_or_update_child(head, input)?,
            }
        } else {
            let mut child = self.get_or_create_child_tree(head)?;
            child.copy(&tail, src_path, src)?
        };

        self.update_userland_link(head, &res);
        self.put()
    }

    /// Remove the node at a path. Removing an absent name is an error.
    #[instrument(skip(self), fields(dir = %self.name, path = %path))]
    pub fn rm(&mut self, path: &SlashPath) -> Result<PutResult, FsError> {
        let (head, tail) = path
            .shift()
            .ok_or_else(|| FsError::InvalidPath("empty".to_string()))?;

        if tail.is_empty() {
            if self.userland.get(head).is_none() {
                return Err(FsError::NotFound(head.to_string()));
            }
            self.remove_userland_link(head);
        } else {
            let link = self
                .userland
                .get(head)
                .ok_or_else(|| FsError::NotFound(head.to_string()))?;
            let mut child = Tree::load(self.store.clone(), head, link.cid)?;
            let res = child.rm(&tail)?;
            self.update_userland_link(head, &res);
        }

        self.put()
    }

    /// Persist this directory: link table block, metadata, skeleton file,
    /// then the header with its previous pointer rotated onto the old cid.
    /// A clean, already-persisted tree re-yields its current cid.
    pub fn put(&mut self) -> Result<PutResult, FsError> {
        if !self.dirty {
            if let Some(cid) = self.cid {
                return Ok(PutResult {
                    cid,
                    size: self.header.info.size,
                    node_type: NodeType::Dir,
                    userland: self.header.userland,
                    metadata: self.header.metadata,
                    skeleton: self.header.skeleton,
                });
            }
        }

        let (userland_bytes, userland_cid) = self.userland.encode_block()?;
        self.store.put_block(DAG_CBOR_CODEC, &userland_bytes)?;
        self.header.userland = Some(userland_cid);

        if let Some(md) = self.metadata.as_mut() {
            let res = md.put()?;
            self.header.metadata = Some(res.cid);
        }

        let skeleton_bytes = self.skeleton.encode_file()?;
        let res = self.store.put_file(&mut skeleton_bytes.as_slice())?;
        self.header.skeleton = Some(res.cid);

        self.header.info.size = self.userland.total_size();

        if let Some(cur) = self.cid {
            self.header.previous = Some(cur);
        }

        let header_bytes = self.header.encode()?;
        let cid = self.store.put_block(DAG_CBOR_CODEC, &header_bytes)?;
        self.cid = Some(cid);
        self.dirty = false;
        debug!(
            name = %self.name,
            cid = %cid,
            links = self.userland.len(),
            size = self.header.info.size,
            previous = ?self.header.previous,
            "wrote tree header"
        );

        Ok(PutResult {
            cid,
            size: self.header.info.size,
            node_type: NodeType::Dir,
            userland: Some(userland_cid),
            metadata: self.header.metadata,
            skeleton: self.header.skeleton,
        })
    }

    pub fn as_history_entry(&self) -> Option<HistoryEntry> {
        Some(HistoryEntry {
            cid: self.cid?,
            previous: self.header.previous,
            node_type: NodeType::Dir,
            mtime: self.header.info.mtime,
            size: self.header.info.size,
        })
    }

    /// Revision log from this head back through previous pointers, loading
    /// headers only. A negative `max` means unbounded.
    pub fn history(&self, max: i64) -> Result<Vec<HistoryEntry>, FsError> {
        let head = self
            .as_history_entry()
            .ok_or(FsError::NotSupported("history of an unpersisted node"))?;
        walk_history(&self.store, head, max)
    }

    fn get_or_create_child_tree(&self, name: &str) -> Result<Tree, FsError> {
        match self.userland.get(name) {
            None => Ok(Tree::empty(self.store.clone(), name)),
            Some(link) => Tree::load(self.store.clone(), name, link.cid),
        }
    }

    fn create_or_update_child(&self, name: &str, input: FileInput) -> Result<PutResult, FsError> {
        if input.is_structured() {
            return self.create_or_update_child_ldfile(name, input);
        }

        match self.userland.get(name) {
            Some(link) => {
                let mut existing = File::load(self.store.clone(), name, link.cid)?;
                existing.set_content(input)?;
                existing.put()
            }
            None => {
                let mut file = File::new(self.store.clone(), input)?;
                file.put()
            }
        }
    }

    fn create_or_update_child_ldfile(
        &self,
        name: &str,
        input: FileInput,
    ) -> Result<PutResult, FsError> {
        let (_, _, body) = input.into_parts();
        let content = match body {
            file::FileBody::Structured(v) => v,
            _ => {
                return Err(FsError::TypeMismatch {
                    path: name.to_string(),
                    expected: "structured content",
                })
            }
        };

        match self.userland.get(name) {
            Some(link) => {
                let mut existing = LdFile::load(self.store.clone(), name, link.cid)?;
                existing.set_content(content);
                existing.put()
            }
            None => {
                let mut created = LdFile::new(self.store.clone(), name, content);
                created.put()
            }
        }
    }

    /// Install a child's put result in both indices. User-initiated
    /// mutations are never merge commits, so the merge pointer is cleared
    /// even when this revision descends from one.
    fn update_userland_link(&mut self, name: &str, res: &PutResult) {
        self.userland.add(res.to_link(name));
        self.skeleton.set(name, res.to_skeleton_info());
        self.header.info.mtime = timestamp();
        self.header.merge = None;
        self.dirty = true;
    }

    fn remove_userland_link(&mut self, name: &str) {
        self.userland.remove(name);
        self.skeleton.delete(name);
        self.header.info.mtime = timestamp();
        self.header.merge = None;
        self.dirty = true;
    }

    /// Re-seat this tree as a merge commit: install the reconciled entries,
    /// point the merge link at the losing head, and move onto the
    /// destination store. Unlike user mutations this keeps the merge
    /// pointer, which the next put persists.
    pub(crate) fn install_merge(
        &mut self,
        dest: Store,
        loser: Cid,
        installs: Vec<(String, Link, SkeletonInfo)>,
    ) {
        for (name, link, info) in installs {
            self.userland.add(link);
            self.skeleton.set(&name, info);
        }
        self.header.merge = Some(loser);
        self.header.info.mtime = timestamp();
        self.store = dest;
        self.dirty = true;
    }
}
