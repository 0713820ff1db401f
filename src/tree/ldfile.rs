//! Linked-data files.
//!
//! A linked-data file's content is a structured value rather than a byte
//! stream. It comes in two forms: *bare*, where the block is the encoded
//! value itself, and *wrapped*, where the block is an envelope of
//! `{info, previous?, metadata?, content}`. A decoder picks wrapped iff the
//! block carries an `info` map with a populated version string; that
//! disambiguation is the reason the version rides in every info map.

use crate::error::FsError;
use crate::store::{Store, DAG_CBOR_CODEC};
use crate::tree::header::{Info, InfoRepr};
use crate::tree::node::{walk_history, HistoryEntry, PutResult};
use crate::types::{timestamp, NodeType};
use ipld_core::cid::Cid;
use ipld_core::ipld::Ipld;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn null_ipld() -> Ipld {
    Ipld::Null
}

/// Wire shape of a wrapped linked-data block.
#[derive(Serialize, Deserialize)]
struct LdFileRepr {
    info: InfoRepr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous: Option<Cid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Cid>,
    #[serde(default = "null_ipld")]
    content: Ipld,
}

/// A structured-value file node.
#[derive(Debug, Clone)]
pub struct LdFile {
    store: Store,
    name: String,
    cid: Option<Cid>,
    bare: bool,
    info: Option<Info>,
    previous: Option<Cid>,
    metadata: Option<Cid>,
    content: Ipld,
    dirty: bool,
}

impl LdFile {
    /// New wrapped linked-data file.
    pub fn new(store: Store, name: &str, content: Ipld) -> LdFile {
        LdFile {
            store,
            name: name.to_string(),
            cid: None,
            bare: false,
            info: Some(Info::new(NodeType::LdFile)),
            previous: None,
            metadata: None,
            content,
            dirty: true,
        }
    }

    /// New bare linked-data file: the persisted block is the value itself.
    pub fn new_bare(store: Store, name: &str, content: Ipld) -> LdFile {
        LdFile {
            store,
            name: name.to_string(),
            cid: None,
            bare: true,
            info: None,
            previous: None,
            metadata: None,
            content,
            dirty: true,
        }
    }

    /// Attach a metadata link at construction time. Round-trips through the
    /// wrapped envelope; bare files have nowhere to record it.
    pub fn with_metadata(mut self, metadata: Cid) -> LdFile {
        self.metadata = Some(metadata);
        self.dirty = true;
        self
    }

    /// Fetch and decode a linked-data file.
    pub fn load(store: Store, name: &str, cid: Cid) -> Result<LdFile, FsError> {
        let bytes = store.get_block(&cid)?;
        LdFile::decode_block(store, name, cid, &bytes)
    }

    pub(crate) fn decode_block(
        store: Store,
        name: &str,
        cid: Cid,
        bytes: &[u8],
    ) -> Result<LdFile, FsError> {
        if let Ok(repr) = serde_ipld_dagcbor::from_slice::<LdFileRepr>(bytes) {
            if !repr.info.version.is_empty() {
                let info = Info::from_repr(repr.info, &cid)?;
                return Ok(LdFile {
                    store,
                    name: name.to_string(),
                    cid: Some(cid),
                    bare: false,
                    info: Some(info),
                    previous: repr.previous,
                    metadata: repr.metadata,
                    content: repr.content,
                    dirty: false,
                });
            }
        }

        // no populated info map: the whole block is the content value
        let content: Ipld =
            serde_ipld_dagcbor::from_slice(bytes).map_err(|e| FsError::MalformedLdFile {
                cid,
                reason: e.to_string(),
            })?;
        Ok(LdFile {
            store,
            name: name.to_string(),
            cid: Some(cid),
            bare: true,
            info: None,
            previous: None,
            metadata: None,
            content,
            dirty: false,
        })
    }

    pub fn is_bare(&self) -> bool {
        self.bare
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cid(&self) -> Option<Cid> {
        self.cid
    }

    pub fn previous(&self) -> Option<Cid> {
        self.previous
    }

    pub fn metadata(&self) -> Option<Cid> {
        self.metadata
    }

    pub fn content(&self) -> &Ipld {
        &self.content
    }

    pub fn size(&self) -> i64 {
        self.info.as_ref().map_or(-1, |i| i.size)
    }

    pub fn mtime(&self) -> i64 {
        self.info.as_ref().map_or(0, |i| i.mtime)
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    /// Replace the content value. Persisted on the next put.
    pub fn set_content(&mut self, content: Ipld) {
        self.content = content;
        self.dirty = true;
    }

    /// The content value rendered as JSON bytes, the way `cat` reads it.
    pub fn json_bytes(&self) -> Result<Vec<u8>, FsError> {
        serde_json::to_vec(&self.content).map_err(|e| FsError::Encode(e.to_string()))
    }

    /// Persist. Bare files encode the value directly; wrapped files encode
    /// the envelope and rotate the previous pointer.
    pub fn put(&mut self) -> Result<PutResult, FsError> {
        if self.bare {
            let bytes = serde_ipld_dagcbor::to_vec(&self.content)
                .map_err(|e| FsError::Encode(e.to_string()))?;
            let size = bytes.len() as i64;
            let cid = self.store.put_block(DAG_CBOR_CODEC, &bytes)?;
            self.cid = Some(cid);
            self.dirty = false;
            return Ok(PutResult {
                cid,
                size,
                node_type: NodeType::LdFile,
                userland: Some(cid),
                metadata: None,
                skeleton: None,
            });
        }

        let info = self.info.get_or_insert_with(|| Info::new(NodeType::LdFile));

        if !self.dirty {
            if let Some(cid) = self.cid {
                return Ok(PutResult {
                    cid,
                    size: info.size,
                    node_type: NodeType::LdFile,
                    userland: Some(cid),
                    metadata: self.metadata,
                    skeleton: None,
                });
            }
        }

        if let Some(cur) = self.cid {
            self.previous = Some(cur);
        }
        let content_bytes = serde_ipld_dagcbor::to_vec(&self.content)
            .map_err(|e| FsError::Encode(e.to_string()))?;
        info.size = content_bytes.len() as i64;
        info.mtime = timestamp();

        let repr = LdFileRepr {
            info: info.to_repr(),
            previous: self.previous,
            metadata: self.metadata,
            content: self.content.clone(),
        };
        let bytes =
            serde_ipld_dagcbor::to_vec(&repr).map_err(|e| FsError::Encode(e.to_string()))?;
        let cid = self.store.put_block(DAG_CBOR_CODEC, &bytes)?;
        self.cid = Some(cid);
        self.dirty = false;
        debug!(name = %self.name, cid = %cid, size = info.size, "wrote linked-data file");

        Ok(PutResult {
            cid,
            size: info.size,
            node_type: NodeType::LdFile,
            userland: Some(cid),
            metadata: self.metadata,
            skeleton: None,
        })
    }

    pub fn as_history_entry(&self) -> Option<HistoryEntry> {
        Some(HistoryEntry {
            cid: self.cid?,
            previous: self.previous,
            node_type: NodeType::LdFile,
            mtime: self.mtime(),
            size: self.size(),
        })
    }

    /// Revision log. Wrapped files walk the same previous chain as headers;
    /// bare files have no revision pointer to walk.
    pub fn history(&self, max: i64) -> Result<Vec<HistoryEntry>, FsError> {
        if self.bare {
            return Err(FsError::NotSupported(
                "bare linked-data files have no history",
            ));
        }
        let head = self
            .as_history_entry()
            .ok_or(FsError::NotSupported("history of an unpersisted node"))?;
        walk_history(&self.store, head, max)
    }
}
