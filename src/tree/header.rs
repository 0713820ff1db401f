//! Per-node header blocks.
//!
//! A header is the manifest of one node revision: an `info` map (always
//! present) plus up to five links. Links are emitted only when set, so a
//! decoder re-binds them by name. The encoded bytes hash to the node's cid.

use crate::error::FsError;
use crate::types::{timestamp, NodeType, LATEST_VERSION, MODE_DEFAULT};
use ipld_core::cid::Cid;
use serde::{Deserialize, Serialize};

/// Node metadata embedded in every header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub version: String,
    pub node_type: NodeType,
    pub mode: u32,
    pub ctime: i64,
    pub mtime: i64,
    pub size: i64,
}

impl Info {
    /// Fresh info for a new node: ctime and mtime both set to now.
    pub fn new(node_type: NodeType) -> Info {
        let ts = timestamp();
        Info {
            version: LATEST_VERSION.to_string(),
            node_type,
            mode: MODE_DEFAULT,
            ctime: ts,
            mtime: ts,
            size: 0,
        }
    }
}

/// The manifest of a single node revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub info: Info,
    /// Prior revision of this node, absent only on the first revision.
    pub previous: Option<Cid>,
    /// The other parent, set only on revisions produced by the merge engine.
    pub merge: Option<Cid>,
    /// Linked-data file of user metadata.
    pub metadata: Option<Cid>,
    /// Skeleton index file, directories only.
    pub skeleton: Option<Cid>,
    /// Payload: link-set block for directories, raw content for files.
    pub userland: Option<Cid>,
}

/// Wire shape of the info map. Shared with the linked-data codec, which
/// keys its wrapped/bare decision on the version field.
#[derive(Serialize, Deserialize)]
pub(crate) struct InfoRepr {
    #[serde(rename = "wnfs")]
    pub(crate) version: String,
    #[serde(rename = "type")]
    pub(crate) node_type: u64,
    pub(crate) mode: u32,
    pub(crate) ctime: i64,
    pub(crate) mtime: i64,
    pub(crate) size: i64,
}

impl Info {
    pub(crate) fn to_repr(&self) -> InfoRepr {
        InfoRepr {
            version: self.version.clone(),
            node_type: self.node_type.tag(),
            mode: self.mode,
            ctime: self.ctime,
            mtime: self.mtime,
            size: self.size,
        }
    }

    pub(crate) fn from_repr(repr: InfoRepr, cid: &Cid) -> Result<Info, FsError> {
        let node_type = NodeType::from_tag(repr.node_type).ok_or(FsError::UnknownNodeType {
            cid: *cid,
            tag: repr.node_type,
        })?;
        Ok(Info {
            version: repr.version,
            node_type,
            mode: repr.mode,
            ctime: repr.ctime,
            mtime: repr.mtime,
            size: repr.size,
        })
    }
}

/// Wire shape of a header block. Optional links are omitted when unset.
#[derive(Serialize, Deserialize)]
struct HeaderRepr {
    info: InfoRepr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous: Option<Cid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    merge: Option<Cid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Cid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    skeleton: Option<Cid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    userland: Option<Cid>,
}

impl Header {
    /// Header for a brand-new node with no links yet.
    pub fn new(node_type: NodeType) -> Header {
        Header {
            info: Info::new(node_type),
            previous: None,
            merge: None,
            metadata: None,
            skeleton: None,
            userland: None,
        }
    }

    /// Encode to a DAG-CBOR block. Field order is fixed, so equal headers
    /// always produce byte-equal blocks.
    pub fn encode(&self) -> Result<Vec<u8>, FsError> {
        let repr = HeaderRepr {
            info: self.info.to_repr(),
            previous: self.previous,
            merge: self.merge,
            metadata: self.metadata,
            skeleton: self.skeleton,
            userland: self.userland,
        };
        serde_ipld_dagcbor::to_vec(&repr).map_err(|e| FsError::Encode(e.to_string()))
    }

    /// Decode a header block.
    ///
    /// Fails with [`FsError::MalformedHeader`] when the block is not a map,
    /// the info map is missing or ill-shaped, or a directory lacks its
    /// skeleton or userland link; with [`FsError::UnknownNodeType`] on an
    /// unrecognized type tag.
    pub fn decode(cid: &Cid, bytes: &[u8]) -> Result<Header, FsError> {
        let repr: HeaderRepr =
            serde_ipld_dagcbor::from_slice(bytes).map_err(|e| FsError::MalformedHeader {
                cid: *cid,
                reason: e.to_string(),
            })?;

        let info = Info::from_repr(repr.info, cid)?;

        if info.node_type == NodeType::Dir && (repr.skeleton.is_none() || repr.userland.is_none()) {
            return Err(FsError::MalformedHeader {
                cid: *cid,
                reason: "directory header is missing skeleton or userland link".to_string(),
            });
        }

        Ok(Header {
            info,
            previous: repr.previous,
            merge: repr.merge,
            metadata: repr.metadata,
            skeleton: repr.skeleton,
            userland: repr.userland,
        })
    }
}
