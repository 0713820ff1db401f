//! Error types for the versioned content-addressed filesystem.

use ipld_core::cid::Cid;
use thiserror::Error;

/// Every failure surfaced by the filesystem. Each variant carries the
/// offending cid or path; nothing is swallowed or retried internally.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed header block {cid}: {reason}")]
    MalformedHeader { cid: Cid, reason: String },

    #[error("malformed link block {cid}: {reason}")]
    MalformedLinkBlock { cid: Cid, reason: String },

    #[error("malformed linked-data block {cid}: {reason}")]
    MalformedLdFile { cid: Cid, reason: String },

    #[error("malformed skeleton file {cid}: {reason}")]
    MalformedSkeleton { cid: Cid, reason: String },

    #[error("unknown node type tag {tag} in header {cid}")]
    UnknownNodeType { cid: Cid, tag: u64 },

    #[error("type mismatch at {path:?}: expected {expected}")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("cannot merge {a} with {b}: incompatible node kinds")]
    MergeImpossible { a: Cid, b: Cid },

    #[error("not supported: {0}")]
    NotSupported(&'static str),

    #[error("operation cancelled")]
    Cancelled,

    #[error("block encoding failed: {0}")]
    Encode(String),
}

impl FsError {
    /// Shorthand for wrapping a store failure that has no richer shape.
    pub(crate) fn io_other(msg: impl Into<String>) -> FsError {
        FsError::Io(std::io::Error::new(std::io::ErrorKind::Other, msg.into()))
    }
}
