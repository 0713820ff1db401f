//! Filesystem facade.
//!
//! Wraps a root tree holding the `public` namespace and exposes the
//! path-level surface: write, cat, ls, mkdir, rm, cp, history, merge. Each
//! mutating call runs bottom-up through the tree and returns the outermost
//! put result; its cid is the new filesystem root.

use crate::error::FsError;
use crate::path::SlashPath;
use crate::store::Store;
use crate::tree::file::FileInput;
use crate::tree::ldfile::LdFile;
use crate::tree::merge::{self, MergeResult, MergeType};
use crate::tree::node::{copy_blocks, HistoryEntry, Node, PutResult};
use crate::tree::Tree;
use crate::types::{DirEntry, METADATA_NAME};
use ipld_core::cid::Cid;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};

/// Name of the plaintext namespace under the filesystem root.
pub const PUBLIC_NAME: &str = "public";

/// An item handed out by a copy source.
pub enum SourceItem {
    /// A directory and its entry names, name-sorted.
    Dir(Vec<String>),
    /// A file payload.
    File(FileInput),
}

/// Anything `cp` can read from: another filesystem, an OS directory, a
/// test fixture.
pub trait SourceFs {
    fn open(&self, path: &str) -> Result<SourceItem, FsError>;
}

/// A versioned filesystem rooted at a single content address.
#[derive(Debug, Clone)]
pub struct FileSystem {
    store: Store,
    root: Tree,
    cid: Cid,
}

impl FileSystem {
    /// Create and persist an empty filesystem: a root tree holding an empty
    /// `public` directory. The returned state is revision zero.
    pub fn empty(store: Store) -> Result<FileSystem, FsError> {
        let mut root = Tree::empty(store.clone(), "");
        let res = root.mkdir(&SlashPath::single(PUBLIC_NAME))?;
        info!(root = %res.cid, "created empty filesystem");
        Ok(FileSystem {
            store,
            root,
            cid: res.cid,
        })
    }

    /// Open an existing filesystem at a root cid.
    pub fn load(store: Store, root: Cid) -> Result<FileSystem, FsError> {
        let tree = Tree::load(store.clone(), "", root)?;
        Ok(FileSystem {
            store,
            root: tree,
            cid: root,
        })
    }

    /// The current root content address.
    pub fn root_cid(&self) -> Cid {
        self.cid
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Write a payload at a path. Returns the new root revision.
    pub fn write(&mut self, path: &str, input: FileInput) -> Result<PutResult, FsError> {
        let path = SlashPath::parse(path)?;
        let res = self.root.add(&path, input)?;
        self.cid = res.cid;
        Ok(res)
    }

    /// Resolve a path to a node.
    pub fn open(&self, path: &str) -> Result<Node, FsError> {
        self.root.get(&SlashPath::parse(path)?)
    }

    /// Read a file's bytes. Linked-data files render as JSON.
    pub fn cat(&self, path: &str) -> Result<Vec<u8>, FsError> {
        match self.open(path)? {
            Node::File(mut f) => f.content_bytes(),
            Node::LdFile(d) => d.json_bytes(),
            Node::Tree(_) => Err(FsError::TypeMismatch {
                path: path.to_string(),
                expected: "file",
            }),
        }
    }

    /// List a directory, name-sorted.
    pub fn ls(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        match self.open(path)? {
            Node::Tree(t) => Ok(t.entries()),
            _ => Err(FsError::TypeMismatch {
                path: path.to_string(),
                expected: "directory",
            }),
        }
    }

    /// Create a directory (and any missing intermediate components).
    pub fn mkdir(&mut self, path: &str) -> Result<PutResult, FsError> {
        let path = SlashPath::parse(path)?;
        let res = self.root.mkdir(&path)?;
        self.cid = res.cid;
        Ok(res)
    }

    /// Remove the node at a path.
    pub fn rm(&mut self, path: &str) -> Result<PutResult, FsError> {
        let path = SlashPath::parse(path)?;
        let res = self.root.rm(&path)?;
        self.cid = res.cid;
        Ok(res)
    }

    /// Copy from a source filesystem into this one.
    pub fn cp(
        &mut self,
        path: &str,
        src_path: &str,
        src: &dyn SourceFs,
    ) -> Result<PutResult, FsError> {
        let path = SlashPath::parse(path)?;
        let res = self.root.copy(&path, src_path, src)?;
        self.cid = res.cid;
        Ok(res)
    }

    /// Revision log of the node at a path; the empty path logs the root.
    /// A negative `max` means unbounded.
    pub fn history(&self, path: &str, max: i64) -> Result<Vec<HistoryEntry>, FsError> {
        self.open(path)?.history(max)
    }

    /// Merge another filesystem's root into this one, persisting onto this
    /// store and adopting the resulting root.
    pub fn merge(&mut self, other: &FileSystem) -> Result<MergeResult, FsError> {
        let a = Node::Tree(self.root.clone());
        let b = Node::Tree(other.root.clone());
        let res = merge::merge(&a, &b)?;
        debug!(kind = ?res.kind, root = %res.cid, "merged filesystem roots");

        if res.kind == MergeType::FastForward {
            // the adopted head may live on the other store
            copy_blocks(&other.store, &self.store, res.cid)?;
        }
        self.root = Tree::load(self.store.clone(), "", res.cid)?;
        self.cid = res.cid;
        Ok(res)
    }
}

impl SourceFs for FileSystem {
    fn open(&self, path: &str) -> Result<SourceItem, FsError> {
        match FileSystem::open(self, path)? {
            Node::Tree(t) => Ok(SourceItem::Dir(
                t.entries().into_iter().map(|e| e.name).collect(),
            )),
            Node::File(mut f) => {
                let name = f.name().to_string();
                let bytes = f.content_bytes()?;
                let mut input = FileInput::bytes(&name, bytes);
                if let Some(md) = f.header().metadata {
                    let side = LdFile::load(self.store.clone(), METADATA_NAME, md)?;
                    input = input.with_metadata(side.content().clone());
                }
                Ok(SourceItem::File(input))
            }
            Node::LdFile(d) => Ok(SourceItem::File(FileInput::structured(
                d.name(),
                d.content().clone(),
            ))),
        }
    }
}

/// Copy source over an OS directory, the way `cp` imports host files.
pub struct OsDirFs {
    root: PathBuf,
}

impl OsDirFs {
    pub fn new(root: impl Into<PathBuf>) -> OsDirFs {
        OsDirFs { root: root.into() }
    }
}

impl SourceFs for OsDirFs {
    fn open(&self, path: &str) -> Result<SourceItem, FsError> {
        let full = self.root.join(path);
        let meta = std::fs::metadata(&full).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FsError::NotFound(path.to_string())
            } else {
                FsError::Io(e)
            }
        })?;

        if meta.is_dir() {
            let mut names = Vec::new();
            for entry in std::fs::read_dir(&full)? {
                names.push(entry?.file_name().to_string_lossy().into_owned());
            }
            names.sort();
            return Ok(SourceItem::Dir(names));
        }

        let name = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let mut bytes = Vec::new();
        std::fs::File::open(&full)?.read_to_end(&mut bytes)?;
        Ok(SourceItem::File(FileInput::bytes(&name, bytes)))
    }
}
