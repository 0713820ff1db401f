//! Slash-separated path handling.
//!
//! Paths are absolute and literal: no `.`, no `..`, no escaping. The empty
//! path addresses the root of whatever tree the operation targets.

use crate::error::FsError;
use std::fmt;

/// A parsed filesystem path: zero or more non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlashPath {
    segments: Vec<String>,
}

impl SlashPath {
    /// Parse a path string, trimming leading and trailing slashes.
    ///
    /// Rejects empty interior segments (`a//b`) and the relative components
    /// `.` and `..`.
    pub fn parse(s: &str) -> Result<SlashPath, FsError> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(SlashPath::default());
        }
        let mut segments = Vec::new();
        for seg in trimmed.split('/') {
            if seg.is_empty() {
                return Err(FsError::InvalidPath(format!("empty segment in {:?}", s)));
            }
            if seg == "." || seg == ".." {
                return Err(FsError::InvalidPath(format!(
                    "relative component {:?} in {:?}",
                    seg, s
                )));
            }
            segments.push(seg.to_string());
        }
        Ok(SlashPath { segments })
    }

    /// A single-segment path. The segment must already be a valid name.
    pub fn single(name: &str) -> SlashPath {
        SlashPath {
            segments: vec![name.to_string()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Split into the first segment and the remaining path.
    /// Returns `None` on the empty path.
    pub fn shift(&self) -> Option<(&str, SlashPath)> {
        let (head, tail) = self.segments.split_first()?;
        Some((
            head.as_str(),
            SlashPath {
                segments: tail.to_vec(),
            },
        ))
    }
}

impl fmt::Display for SlashPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Join a source-path string with a child name. Source paths are plain
/// slash strings owned by whatever [`crate::fs::SourceFs`] they address.
pub fn join_source(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}
