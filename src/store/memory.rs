//! In-memory node store
//!
//! Holds every node in a vector sorted by id. Used for JSON Lines input and
//! as a store double in tests.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, SourceError};

use super::{Node, NodeStore};

/// Node store backed by a sorted vector
#[derive(Debug, Clone, Default)]
pub struct MemoryNodeStore {
    nodes: Vec<Node>,
}

impl MemoryNodeStore {
    /// Create a store from nodes in any order
    pub fn new(mut nodes: Vec<Node>) -> Self {
        nodes.sort_by_key(|node| node.id);
        Self { nodes }
    }

    /// Load nodes from a JSON Lines file, one node document per line
    ///
    /// # Arguments
    /// * `path` - File to read
    ///
    /// # Returns
    /// * `Result<Self>` - Loaded store, or the first malformed line as error
    pub async fn from_jsonl<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(SourceError::Io)?;

        let store = Self::parse_jsonl(&content)?;
        debug!(
            "Loaded {} nodes from {}",
            store.nodes.len(),
            path.as_ref().display()
        );
        Ok(store)
    }

    /// Parse JSON Lines text into a store
    pub fn parse_jsonl(content: &str) -> Result<Self> {
        let mut nodes = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let node: Node =
                serde_json::from_str(line).map_err(|e| SourceError::InvalidDocument {
                    line: index + 1,
                    message: e.to_string(),
                })?;
            nodes.push(node);
        }
        Ok(Self::new(nodes))
    }

    /// Number of nodes held
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn count(&self) -> Result<u64> {
        Ok(self.nodes.len() as u64)
    }

    async fn fetch_page(&self, offset: u64, limit: u64) -> Result<Vec<Node>> {
        Ok(self
            .nodes
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Node>> {
        Ok(self
            .nodes
            .binary_search_by_key(&id, |node| node.id)
            .ok()
            .map(|index| self.nodes[index].clone()))
    }

    async fn children(&self, parent_id: i64) -> Result<Vec<Node>> {
        Ok(self
            .nodes
            .iter()
            .filter(|node| node.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }
}
