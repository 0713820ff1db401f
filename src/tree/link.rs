//! Userland link table.
//!
//! A directory's payload is a set of named links, unique by name and
//! serialized as a name-keyed map so the encoding is deterministic.

use crate::error::FsError;
use crate::store::{cid_for, DAG_CBOR_CODEC};
use ipld_core::cid::Cid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One directory entry: a named pointer to a child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    pub cid: Cid,
    pub size: i64,
    pub is_file: bool,
}

/// Wire value stored per name in a link-set block.
#[derive(Serialize, Deserialize)]
struct LinkRepr {
    cid: Cid,
    size: i64,
    is_file: bool,
}

/// A set of links, unique and ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    entries: BTreeMap<String, Link>,
}

impl Links {
    pub fn new() -> Links {
        Links::default()
    }

    /// Insert a link, replacing any existing link with the same name.
    pub fn add(&mut self, link: Link) {
        self.entries.insert(link.name.clone(), link);
    }

    pub fn remove(&mut self, name: &str) -> Option<Link> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Link> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Links in ascending name order.
    pub fn sorted(&self) -> impl Iterator<Item = &Link> {
        self.entries.values()
    }

    /// Total size of all linked children.
    pub fn total_size(&self) -> i64 {
        self.entries.values().map(|l| l.size).sum()
    }

    /// Encode as a deterministic name-keyed DAG-CBOR map, returning the
    /// block bytes and their content address.
    pub fn encode_block(&self) -> Result<(Vec<u8>, Cid), FsError> {
        let repr: BTreeMap<&str, LinkRepr> = self
            .entries
            .values()
            .map(|l| {
                (
                    l.name.as_str(),
                    LinkRepr {
                        cid: l.cid,
                        size: l.size,
                        is_file: l.is_file,
                    },
                )
            })
            .collect();
        let bytes = serde_ipld_dagcbor::to_vec(&repr).map_err(|e| FsError::Encode(e.to_string()))?;
        let cid = cid_for(DAG_CBOR_CODEC, &bytes)?;
        Ok((bytes, cid))
    }

    /// Decode a link-set block. Rejects empty names; colliding names cannot
    /// survive the map encoding and are rejected by the codec layer.
    pub fn decode_block(cid: &Cid, bytes: &[u8]) -> Result<Links, FsError> {
        let repr: BTreeMap<String, LinkRepr> =
            serde_ipld_dagcbor::from_slice(bytes).map_err(|e| FsError::MalformedLinkBlock {
                cid: *cid,
                reason: e.to_string(),
            })?;

        let mut links = Links::new();
        for (name, l) in repr {
            if name.is_empty() {
                return Err(FsError::MalformedLinkBlock {
                    cid: *cid,
                    reason: "empty link name".to_string(),
                });
            }
            links.add(Link {
                name,
                cid: l.cid,
                size: l.size,
                is_file: l.is_file,
            });
        }
        Ok(links)
    }
}
