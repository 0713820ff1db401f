//! Skeleton index.
//!
//! A directory's skeleton mirrors its userland link names and records each
//! child's header, userland, metadata, and sub-skeleton addresses, so a
//! peer can traverse or verify a subtree without fetching every child
//! header. The two indices are kept in lockstep by the tree.

use crate::error::FsError;
use crate::store::Store;
use ipld_core::cid::Cid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

/// Per-child record in a skeleton.
///
/// `userland` may be unknown for entries installed by the merge engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonInfo {
    pub cid: Cid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userland: Option<Cid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Cid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_skeleton: Option<Cid>,
    pub is_file: bool,
}

/// Name-keyed skeleton index for one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Skeleton {
    entries: BTreeMap<String, SkeletonInfo>,
}

impl Skeleton {
    pub fn new() -> Skeleton {
        Skeleton::default()
    }

    pub fn get(&self, name: &str) -> Option<&SkeletonInfo> {
        self.entries.get(name)
    }

    pub fn set(&mut self, name: &str, info: SkeletonInfo) {
        self.entries.insert(name.to_string(), info);
    }

    pub fn delete(&mut self, name: &str) -> Option<SkeletonInfo> {
        self.entries.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SkeletonInfo)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize for the store's opaque-file writer.
    pub fn encode_file(&self) -> Result<Vec<u8>, FsError> {
        serde_ipld_dagcbor::to_vec(&self.entries).map_err(|e| FsError::Encode(e.to_string()))
    }

    pub fn decode_file(cid: &Cid, bytes: &[u8]) -> Result<Skeleton, FsError> {
        let entries: BTreeMap<String, SkeletonInfo> =
            serde_ipld_dagcbor::from_slice(bytes).map_err(|e| FsError::MalformedSkeleton {
                cid: *cid,
                reason: e.to_string(),
            })?;
        Ok(Skeleton { entries })
    }

    /// Fetch and decode a skeleton file from the store.
    pub fn load(store: &Store, cid: &Cid) -> Result<Skeleton, FsError> {
        let mut reader = store.get_file(cid)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Skeleton::decode_file(cid, &bytes)
    }
}
