//! Topic descriptions from the name registry.
//!
//! A verification's description node resolves to a content hash through
//! the name registry; the content is a JSON description, either flat or
//! wrapped in a `public` envelope. Every failure along the way degrades to
//! the default description named after the topic.
//!
//! A claim without a description node falls back to the topic's name
//! under the configured registry root.

use std::sync::Arc;

use log::warn;
use serde_json::Value;

use crate::crypto::name_hash;
use crate::error::Result;
use crate::ledger::{ContentStore, Hash32, NameRegistry};
use crate::topic::Topic;

use super::types::VerificationDescription;

pub struct DescriptionResolver {
    names: Arc<dyn NameRegistry>,
    content: Arc<dyn ContentStore>,
    root: String,
}

impl DescriptionResolver {
    pub fn new(
        names: Arc<dyn NameRegistry>,
        content: Arc<dyn ContentStore>,
        root: impl Into<String>,
    ) -> Self {
        Self {
            names,
            content,
            root: root.into(),
        }
    }

    /// Registry node of `topic`'s description under `domain`.
    pub fn node_for(topic: &Topic, domain: &str) -> Hash32 {
        name_hash(&topic.description_name(domain))
    }

    /// Description stored at `node`, or the default for `topic`.
    pub async fn resolve(&self, topic: &Topic, node: &Hash32) -> VerificationDescription {
        let node = if node.is_zero() {
            Self::node_for(topic, &self.root)
        } else {
            *node
        };
        match self.lookup(&node).await {
            Ok(Some(description)) => description,
            Ok(None) => VerificationDescription::default_for(topic),
            Err(e) => {
                warn!("description of {topic} at node {node} unavailable: {e}");
                VerificationDescription::default_for(topic)
            }
        }
    }

    async fn lookup(&self, node: &Hash32) -> Result<Option<VerificationDescription>> {
        let Some(resolver) = self.names.resolver(node).await? else {
            return Ok(None);
        };
        let Some(hash) = self.names.content_hash(&resolver, node).await? else {
            return Ok(None);
        };
        let Some(bytes) = self.content.get(&hash).await? else {
            return Ok(None);
        };
        let mut doc: Value = serde_json::from_slice(&bytes)?;
        if let Some(public) = doc.get_mut("public") {
            doc = public.take();
        }
        Ok(Some(serde_json::from_value(doc)?))
    }
}
