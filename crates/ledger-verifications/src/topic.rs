//! Verification topics — `/`-delimited hierarchical claim paths.
//!
//! `/company/acme/employee` has the parent `/company/acme`. A single-segment
//! topic such as `/company` is root-level: it has no parent. The root topic
//! (`""` or `/`) has no segments and no parent either.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::hashing::topic_hash;
use crate::error::{VerificationError, Result};
use crate::ledger::Hash32;

/// A normalized topic path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic {
    segments: Vec<String>,
}

impl Topic {
    /// The root topic.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a topic path. A leading `/` is optional; empty segments are rejected.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if body.is_empty() {
            return Ok(Self::root());
        }
        let body = body.strip_suffix('/').unwrap_or(body);

        let mut segments = Vec::new();
        for segment in body.split('/') {
            if segment.is_empty() {
                return Err(VerificationError::InvalidTopic(format!(
                    "empty segment in {path:?}"
                )));
            }
            if segment.contains('.') || segment.chars().any(char::is_whitespace) {
                return Err(VerificationError::InvalidTopic(format!(
                    "segment {segment:?} in {path:?} may not contain dots or whitespace"
                )));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// All segments but the last, when that leaves at least one segment.
    pub fn parent(&self) -> Option<Topic> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append a segment.
    pub fn child(&self, segment: &str) -> Result<Topic> {
        let mut path = self.segments.join("/");
        path.push('/');
        path.push_str(segment);
        Topic::parse(&path)
    }

    /// True when `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Topic) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments.starts_with(&ancestor.segments)
    }

    /// Canonical path form, `/` for the root.
    pub fn path(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        format!("/{}", self.segments.join("/"))
    }

    /// Ledger hash of the canonical path.
    pub fn hash(&self) -> Hash32 {
        topic_hash(&self.path())
    }

    /// Registry name of the topic's description:
    /// reversed segments joined with `.verifications.<root>`.
    pub fn description_name(&self, root: &str) -> String {
        let mut labels: Vec<&str> = self.segments.iter().rev().map(String::as_str).collect();
        labels.push("verifications");
        labels.push(root);
        labels.join(".")
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.path())
    }
}

impl FromStr for Topic {
    type Err = VerificationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
