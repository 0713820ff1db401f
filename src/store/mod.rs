//! Content-addressed block storage.
//!
//! The filesystem persists everything as immutable blocks keyed by the
//! BLAKE3 digest of their bytes, carried as CIDv1 so links stay
//! self-describing. A [`Store`] is a cheap cloneable handle over some
//! [`BlockStore`] backend plus a cooperative cancellation token; it may be
//! read by any number of callers, while a single filesystem writer mutates
//! through it at a time.

pub mod persistence;

pub use persistence::SledBlockStore;

use crate::error::FsError;
use ipld_core::cid::multihash::Multihash;
use ipld_core::cid::Cid;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Multicodec for DAG-CBOR encoded blocks.
pub const DAG_CBOR_CODEC: u64 = 0x71;
/// Multicodec for raw byte blocks (opaque file content, skeleton files).
pub const RAW_CODEC: u64 = 0x55;
/// Multihash code for BLAKE3-256.
const BLAKE3_CODE: u64 = 0x1e;

/// Compute the content address of a block: BLAKE3 over the bytes, wrapped
/// into a CIDv1 with the given codec.
pub fn cid_for(codec: u64, bytes: &[u8]) -> Result<Cid, FsError> {
    let digest = blake3::hash(bytes);
    let mh = Multihash::<64>::wrap(BLAKE3_CODE, digest.as_bytes())
        .map_err(|e| FsError::Encode(format!("multihash wrap: {}", e)))?;
    Ok(Cid::new_v1(codec, mh))
}

/// Result of writing a byte stream through [`Store::put_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutFileResult {
    pub cid: Cid,
    pub size: i64,
}

/// Raw block storage. `put_block` must be idempotent for byte-equal inputs
/// and must return the hash the store itself computes.
pub trait BlockStore: Send + Sync {
    fn get_block(&self, cid: &Cid) -> Result<Vec<u8>, FsError>;
    fn put_block(&self, codec: u64, bytes: &[u8]) -> Result<Cid, FsError>;
    fn has_block(&self, cid: &Cid) -> Result<bool, FsError>;
    fn all_keys(&self) -> Result<Box<dyn Iterator<Item = Result<Cid, FsError>> + '_>, FsError>;
}

/// Cooperative cancellation token handed out by a store.
///
/// Cancellation is checked before each store call; blocks already written
/// stay in place (they are unreferenced until a parent header lands).
#[derive(Debug, Clone, Default)]
pub struct StoreContext {
    cancelled: Arc<AtomicBool>,
}

impl StoreContext {
    pub fn new() -> StoreContext {
        StoreContext::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<(), FsError> {
        if self.is_cancelled() {
            return Err(FsError::Cancelled);
        }
        Ok(())
    }
}

/// Handle over a block store shared by all nodes of a filesystem.
#[derive(Clone)]
pub struct Store {
    blocks: Arc<dyn BlockStore>,
    ctx: StoreContext,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("cancelled", &self.ctx.is_cancelled())
            .finish()
    }
}

impl Store {
    pub fn new(blocks: Arc<dyn BlockStore>) -> Store {
        Store {
            blocks,
            ctx: StoreContext::new(),
        }
    }

    /// Fresh store over an in-memory backend. Handy for tests and staging.
    pub fn in_memory() -> Store {
        Store::new(Arc::new(MemoryBlockStore::new()))
    }

    /// The cancellation token shared by every clone of this handle.
    pub fn context(&self) -> StoreContext {
        self.ctx.clone()
    }

    /// Whether two handles address the same underlying backend.
    pub fn same_backend(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.blocks, &other.blocks)
    }

    pub fn get_block(&self, cid: &Cid) -> Result<Vec<u8>, FsError> {
        self.ctx.ensure_active()?;
        self.blocks.get_block(cid)
    }

    pub fn put_block(&self, codec: u64, bytes: &[u8]) -> Result<Cid, FsError> {
        self.ctx.ensure_active()?;
        self.blocks.put_block(codec, bytes)
    }

    pub fn has_block(&self, cid: &Cid) -> Result<bool, FsError> {
        self.ctx.ensure_active()?;
        self.blocks.has_block(cid)
    }

    /// Read an opaque byte file previously written with [`Store::put_file`].
    pub fn get_file(&self, cid: &Cid) -> Result<Box<dyn Read + Send>, FsError> {
        let bytes = self.get_block(cid)?;
        Ok(Box::new(std::io::Cursor::new(bytes)))
    }

    /// Write an opaque byte stream as a single raw block.
    pub fn put_file(&self, reader: &mut dyn Read) -> Result<PutFileResult, FsError> {
        self.ctx.ensure_active()?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let size = bytes.len() as i64;
        let cid = self.blocks.put_block(RAW_CODEC, &bytes)?;
        Ok(PutFileResult { cid, size })
    }

    pub fn all_keys(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<Cid, FsError>> + '_>, FsError> {
        self.ctx.ensure_active()?;
        self.blocks.all_keys()
    }
}

/// In-memory block store: a cid-keyed map behind a read-write lock.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryBlockStore {
    pub fn new() -> MemoryBlockStore {
        MemoryBlockStore::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

impl BlockStore for MemoryBlockStore {
    fn get_block(&self, cid: &Cid) -> Result<Vec<u8>, FsError> {
        self.blocks
            .read()
            .get(cid)
            .cloned()
            .ok_or_else(|| FsError::NotFound(cid.to_string()))
    }

    fn put_block(&self, codec: u64, bytes: &[u8]) -> Result<Cid, FsError> {
        let cid = cid_for(codec, bytes)?;
        self.blocks.write().insert(cid, bytes.to_vec());
        Ok(cid)
    }

    fn has_block(&self, cid: &Cid) -> Result<bool, FsError> {
        Ok(self.blocks.read().contains_key(cid))
    }

    fn all_keys(&self) -> Result<Box<dyn Iterator<Item = Result<Cid, FsError>> + '_>, FsError> {
        let keys: Vec<Cid> = self.blocks.read().keys().copied().collect();
        Ok(Box::new(keys.into_iter().map(Ok)))
    }
}
