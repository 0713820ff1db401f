//! Sled-backed block store.
//!
//! Blocks are stored under their full cid bytes, so reopening a database
//! restores every root that was ever written.

use crate::error::FsError;
use crate::store::{cid_for, BlockStore};
use ipld_core::cid::Cid;
use std::path::Path;
use tracing::warn;

pub struct SledBlockStore {
    db: sled::Db,
}

impl SledBlockStore {
    /// Open (or create) a block database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SledBlockStore, FsError> {
        let db = sled::open(path)
            .map_err(|e| FsError::io_other(format!("failed to open block database: {}", e)))?;
        Ok(SledBlockStore { db })
    }

    /// Wrap an already-open sled database.
    pub fn from_db(db: sled::Db) -> SledBlockStore {
        SledBlockStore { db }
    }

    /// Flush buffered writes to disk.
    pub fn flush(&self) -> Result<(), FsError> {
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| FsError::io_other(format!("failed to flush block database: {}", e)))
    }
}

impl BlockStore for SledBlockStore {
    fn get_block(&self, cid: &Cid) -> Result<Vec<u8>, FsError> {
        match self
            .db
            .get(cid.to_bytes())
            .map_err(|e| FsError::io_other(format!("failed to read block: {}", e)))?
        {
            Some(bytes) => Ok(bytes.to_vec()),
            None => Err(FsError::NotFound(cid.to_string())),
        }
    }

    fn put_block(&self, codec: u64, bytes: &[u8]) -> Result<Cid, FsError> {
        let cid = cid_for(codec, bytes)?;
        self.db
            .insert(cid.to_bytes(), bytes)
            .map_err(|e| FsError::io_other(format!("failed to write block: {}", e)))?;
        Ok(cid)
    }

    fn has_block(&self, cid: &Cid) -> Result<bool, FsError> {
        self.db
            .contains_key(cid.to_bytes())
            .map_err(|e| FsError::io_other(format!("failed to probe block: {}", e)))
    }

    fn all_keys(&self) -> Result<Box<dyn Iterator<Item = Result<Cid, FsError>> + '_>, FsError> {
        Ok(Box::new(self.db.iter().keys().map(|item| {
            let key = item.map_err(|e| FsError::io_other(format!("failed to iterate blocks: {}", e)))?;
            Cid::try_from(key.as_ref()).map_err(|e| {
                warn!(key = %hex::encode(key.as_ref()), error = %e, "skipping undecodable block key");
                FsError::io_other(format!(
                    "undecodable block key {}: {}",
                    hex::encode(key.as_ref()),
                    e
                ))
            })
        })))
    }
}
