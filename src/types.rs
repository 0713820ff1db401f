//! Shared types for the versioned content-addressed filesystem.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Format version stamped into every node header. Doubles as the
/// wrapped/bare discriminator for linked-data blocks: a block whose `info`
/// map carries a populated version string is a wrapped node.
pub const LATEST_VERSION: &str = "0.2.0";

/// Default permission bits recorded for new nodes.
pub const MODE_DEFAULT: u32 = 0o644;

/// Name used for metadata side-files linked from node headers.
pub(crate) const METADATA_NAME: &str = "metadata";

/// Node kind tag recorded in a header's info map.
///
/// The integer values are part of the block format; peers must agree on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Dir,
    File,
    LdFile,
}

impl NodeType {
    /// Wire tag for this node kind.
    pub fn tag(self) -> u64 {
        match self {
            NodeType::Dir => 1,
            NodeType::File => 2,
            NodeType::LdFile => 3,
        }
    }

    /// Reverse of [`NodeType::tag`]. Returns `None` for unrecognized tags.
    pub fn from_tag(tag: u64) -> Option<NodeType> {
        match tag {
            1 => Some(NodeType::Dir),
            2 => Some(NodeType::File),
            3 => Some(NodeType::LdFile),
            _ => None,
        }
    }

    /// Whether links to this kind of node are flagged as files. Everything
    /// that is not a directory is a file from the link table's point of view.
    pub fn is_file(self) -> bool {
        !matches!(self, NodeType::Dir)
    }
}

/// A single directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub is_file: bool,
}

static TIMESTAMP_OVERRIDE: RwLock<Option<i64>> = RwLock::new(None);

/// Current unix time in seconds.
///
/// Honors [`set_timestamp_override`] so history and merge scenarios can be
/// made deterministic in tests.
pub fn timestamp() -> i64 {
    if let Some(ts) = *TIMESTAMP_OVERRIDE.read() {
        return ts;
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Pin (or with `None`, unpin) the value returned by [`timestamp`].
pub fn set_timestamp_override(ts: Option<i64>) {
    *TIMESTAMP_OVERRIDE.write() = ts;
}
