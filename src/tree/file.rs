//! Opaque byte-file nodes and the payload adapter fed to the tree.

use crate::error::FsError;
use crate::store::{Store, DAG_CBOR_CODEC};
use crate::tree::header::Header;
use crate::tree::ldfile::LdFile;
use crate::tree::node::{walk_history, HistoryEntry, PutResult};
use crate::types::{timestamp, NodeType, METADATA_NAME};
use ipld_core::cid::Cid;
use ipld_core::ipld::Ipld;
use std::fmt;
use std::io::Read;
use tracing::debug;

/// Payload handed to [`crate::tree::Tree::add`] and produced by copy
/// sources. Wraps a byte body or a structured value, with an optional
/// structured metadata side channel; the tree's add routine dispatches on
/// the body kind.
pub struct FileInput {
    name: String,
    metadata: Option<Ipld>,
    body: FileBody,
}

pub enum FileBody {
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
    Structured(Ipld),
}

impl FileInput {
    pub fn bytes(name: &str, content: impl Into<Vec<u8>>) -> FileInput {
        FileInput {
            name: name.to_string(),
            metadata: None,
            body: FileBody::Bytes(content.into()),
        }
    }

    pub fn reader(name: &str, content: Box<dyn Read + Send>) -> FileInput {
        FileInput {
            name: name.to_string(),
            metadata: None,
            body: FileBody::Reader(content),
        }
    }

    /// A linked-data payload: the target becomes a structured-value file.
    pub fn structured(name: &str, content: Ipld) -> FileInput {
        FileInput {
            name: name.to_string(),
            metadata: None,
            body: FileBody::Structured(content),
        }
    }

    /// Attach a structured metadata value carried alongside the content.
    pub fn with_metadata(mut self, metadata: Ipld) -> FileInput {
        self.metadata = Some(metadata);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_structured(&self) -> bool {
        matches!(self.body, FileBody::Structured(_))
    }

    pub(crate) fn into_parts(self) -> (String, Option<Ipld>, FileBody) {
        (self.name, self.metadata, self.body)
    }
}

impl fmt::Debug for FileInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            FileBody::Bytes(b) => format!("bytes[{}]", b.len()),
            FileBody::Reader(_) => "reader".to_string(),
            FileBody::Structured(_) => "structured".to_string(),
        };
        f.debug_struct("FileInput")
            .field("name", &self.name)
            .field("body", &body)
            .finish()
    }
}

/// An opaque byte file: header plus lazily-fetched content.
pub struct File {
    store: Store,
    name: String,
    cid: Option<Cid>,
    header: Header,
    metadata: Option<LdFile>,
    content: Option<Box<dyn Read + Send>>,
    dirty: bool,
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("cid", &self.cid)
            .field("size", &self.header.info.size)
            .finish()
    }
}

impl File {
    /// New file from a byte payload. Structured payloads belong to
    /// [`LdFile`]; handing one in here is a caller bug surfaced as a
    /// type mismatch.
    pub fn new(store: Store, input: FileInput) -> Result<File, FsError> {
        let (name, metadata, body) = input.into_parts();
        let content = byte_body(&name, body)?;
        let metadata = metadata.map(|v| LdFile::new_bare(store.clone(), METADATA_NAME, v));
        Ok(File {
            store,
            name,
            cid: None,
            header: Header::new(NodeType::File),
            metadata,
            content: Some(content),
            dirty: true,
        })
    }

    /// Fetch a file by header cid.
    pub fn load(store: Store, name: &str, cid: Cid) -> Result<File, FsError> {
        let bytes = store.get_block(&cid)?;
        let header = Header::decode(&cid, &bytes)?;
        File::from_header(store, header, name, cid)
    }

    pub(crate) fn from_header(
        store: Store,
        header: Header,
        name: &str,
        cid: Cid,
    ) -> Result<File, FsError> {
        if header.userland.is_none() {
            return Err(FsError::MalformedHeader {
                cid,
                reason: "file header is missing userland link".to_string(),
            });
        }
        let metadata = match header.metadata {
            Some(md) => Some(LdFile::load(store.clone(), METADATA_NAME, md)?),
            None => None,
        };
        Ok(File {
            store,
            name: name.to_string(),
            cid: Some(cid),
            header,
            metadata,
            content: None,
            dirty: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cid(&self) -> Option<Cid> {
        self.cid
    }

    pub fn size(&self) -> i64 {
        self.header.info.size
    }

    pub fn mtime(&self) -> i64 {
        self.header.info.mtime
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub fn metadata(&self) -> Option<&LdFile> {
        self.metadata.as_ref()
    }

    /// Replace content (and metadata, when the payload carries one).
    /// Persisted on the next put.
    pub fn set_content(&mut self, input: FileInput) -> Result<(), FsError> {
        let (name, metadata, body) = input.into_parts();
        self.content = Some(byte_body(&name, body)?);
        if let Some(v) = metadata {
            self.metadata = Some(LdFile::new_bare(self.store.clone(), METADATA_NAME, v));
        }
        self.dirty = true;
        Ok(())
    }

    /// Replace the metadata side-file. Persisted on the next put.
    pub fn set_metadata(&mut self, value: Ipld) {
        self.metadata = Some(LdFile::new_bare(self.store.clone(), METADATA_NAME, value));
        self.dirty = true;
    }

    fn ensure_content(&mut self) -> Result<(), FsError> {
        if self.content.is_none() {
            let userland = self.header.userland.ok_or_else(|| {
                FsError::NotFound(format!("{}: file has no content", self.name))
            })?;
            self.content = Some(self.store.get_file(&userland)?);
        }
        Ok(())
    }

    /// Read the full content, fetching it from the store on first use.
    pub fn content_bytes(&mut self) -> Result<Vec<u8>, FsError> {
        self.ensure_content()?;
        let mut bytes = Vec::new();
        if let Some(reader) = self.content.as_mut() {
            reader.read_to_end(&mut bytes)?;
        }
        Ok(bytes)
    }

    /// Persist: content through the store's file writer, then metadata, then
    /// the header with its previous pointer rotated onto the old revision.
    pub fn put(&mut self) -> Result<PutResult, FsError> {
        if !self.dirty {
            if let Some(cid) = self.cid {
                return Ok(PutResult {
                    cid,
                    size: self.header.info.size,
                    node_type: NodeType::File,
                    userland: self.header.userland,
                    metadata: self.header.metadata,
                    skeleton: None,
                });
            }
        }

        if let Some(mut content) = self.content.take() {
            let res = self.store.put_file(&mut content)?;
            self.header.userland = Some(res.cid);
            self.header.info.size = res.size;
        }
        if self.header.userland.is_none() {
            return Err(FsError::NotFound(format!(
                "{}: file has no content to persist",
                self.name
            )));
        }

        if let Some(md) = self.metadata.as_mut() {
            let res = md.put()?;
            self.header.metadata = Some(res.cid);
        }

        if let Some(cur) = self.cid {
            self.header.previous = Some(cur);
        }
        self.header.info.mtime = timestamp();

        let bytes = self.header.encode()?;
        let cid = self.store.put_block(DAG_CBOR_CODEC, &bytes)?;
        self.cid = Some(cid);
        self.dirty = false;
        debug!(name = %self.name, cid = %cid, size = self.header.info.size, "wrote file header");

        Ok(PutResult {
            cid,
            size: self.header.info.size,
            node_type: NodeType::File,
            userland: self.header.userland,
            metadata: self.header.metadata,
            skeleton: None,
        })
    }

    pub fn as_history_entry(&self) -> Option<HistoryEntry> {
        Some(HistoryEntry {
            cid: self.cid?,
            previous: self.header.previous,
            node_type: NodeType::File,
            mtime: self.header.info.mtime,
            size: self.header.info.size,
        })
    }

    pub fn history(&self, max: i64) -> Result<Vec<HistoryEntry>, FsError> {
        let head = self
            .as_history_entry()
            .ok_or(FsError::NotSupported("history of an unpersisted node"))?;
        walk_history(&self.store, head, max)
    }
}

impl Read for File {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.ensure_content()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        match self.content.as_mut() {
            Some(reader) => reader.read(buf),
            None => Ok(0),
        }
    }
}

fn byte_body(name: &str, body: FileBody) -> Result<Box<dyn Read + Send>, FsError> {
    match body {
        FileBody::Bytes(b) => Ok(Box::new(std::io::Cursor::new(b))),
        FileBody::Reader(r) => Ok(r),
        FileBody::Structured(_) => Err(FsError::TypeMismatch {
            path: name.to_string(),
            expected: "byte content",
        }),
    }
}
