//! chronofs: a versioned, content-addressed filesystem.
//!
//! Every node persists as an immutable block addressed by the hash of its
//! bytes; every mutation rewrites the path from the touched leaf up to a
//! new root cid, leaving prior revisions reachable through per-node
//! previous pointers. Independently evolved roots reconcile through a
//! deterministic history-aware merge.

pub mod error;
pub mod fs;
pub mod logging;
pub mod path;
pub mod store;
pub mod tree;
pub mod types;

pub use error::FsError;
pub use fs::{FileSystem, OsDirFs, SourceFs, SourceItem};
pub use logging::{init_logging, LoggingConfig};
pub use path::SlashPath;
pub use store::{BlockStore, MemoryBlockStore, SledBlockStore, Store, StoreContext};
pub use tree::file::{File, FileInput};
pub use tree::ldfile::LdFile;
pub use tree::merge::{merge, MergeResult, MergeType};
pub use tree::node::{copy_blocks, load_node, HistoryEntry, Node, PutResult};
pub use tree::Tree;
pub use types::{DirEntry, NodeType};

// the block vocabulary callers speak
pub use ipld_core::cid::Cid;
pub use ipld_core::ipld::Ipld;
