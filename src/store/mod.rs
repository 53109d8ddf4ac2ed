//! Node storage for export operations
//!
//! A node is one entry of the tree-shaped hierarchy being exported. Nodes
//! carry a fixed set of structural fields plus a free-form `response`
//! document from which custom columns are extracted.
//!
//! Stores are reached through the [`NodeStore`] trait so the export pipeline
//! can run against MongoDB or an in-memory collection alike.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::formatter::{BsonConverter, PlainTextConverter};

pub mod memory;
pub mod mongo;

pub use memory::MemoryNodeStore;
pub use mongo::MongoNodeStore;

/// Structural columns emitted before any custom column
pub const BASE_COLUMNS: [&str; 8] = [
    "level",
    "id",
    "parent_id",
    "object_id",
    "object_type",
    "query_status",
    "query_time",
    "query_type",
];

/// Separator used when a custom column resolves to several values
const MULTI_VALUE_SEPARATOR: &str = ";";

/// A single node of the exported hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "_id", alias = "id")]
    pub id: i64,

    #[serde(default)]
    pub parent_id: Option<i64>,

    #[serde(default)]
    pub level: i32,

    #[serde(default)]
    pub objectid: String,

    #[serde(default)]
    pub objecttype: String,

    #[serde(default)]
    pub querystatus: Option<String>,

    #[serde(default)]
    pub querytime: Option<String>,

    #[serde(default)]
    pub querytype: Option<String>,

    /// Raw response payload the node was created from
    #[serde(default)]
    pub response: Document,
}

impl Node {
    /// Create a node with empty optional fields
    pub fn new(id: i64, parent_id: Option<i64>, level: i32, objectid: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            level,
            objectid: objectid.into(),
            objecttype: String::new(),
            querystatus: None,
            querytime: None,
            querytype: None,
            response: Document::new(),
        }
    }

    /// Structural values in [`BASE_COLUMNS`] order
    pub fn base_cells(&self) -> Vec<String> {
        vec![
            self.level.to_string(),
            self.id.to_string(),
            self.parent_id.map(|id| id.to_string()).unwrap_or_default(),
            self.objectid.clone(),
            self.objecttype.clone(),
            self.querystatus.clone().unwrap_or_default(),
            self.querytime.clone().unwrap_or_default(),
            self.querytype.clone().unwrap_or_default(),
        ]
    }

    /// Structural values followed by one value per custom column
    pub fn cells(&self, columns: &[ColumnKey]) -> Vec<String> {
        let mut row = self.base_cells();
        row.extend(columns.iter().map(|column| column.extract(self)));
        row
    }
}

/// Header row for a node export with the given custom columns
pub fn node_header(columns: &[ColumnKey]) -> Vec<String> {
    BASE_COLUMNS
        .iter()
        .map(|name| name.to_string())
        .chain(columns.iter().map(|column| column.name.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Wildcard,
}

/// Custom column resolved once before an export starts
///
/// Parsed from `path` or `name=path`. The path is dot separated; a numeric
/// segment indexes into an array and `*` fans out over every element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnKey {
    /// Header name of the column
    pub name: String,
    path: Vec<PathSegment>,
}

impl ColumnKey {
    /// Parse a column key
    ///
    /// # Arguments
    /// * `key` - Key text such as `message`, `from.name` or `likes=likes.data.*.id`
    ///
    /// # Returns
    /// * `Result<Self>` - Parsed key or error for an empty path
    pub fn parse(key: &str) -> Result<Self> {
        let (name, path) = match key.split_once('=') {
            Some((name, path)) => (name.trim(), path.trim()),
            None => (key.trim(), key.trim()),
        };

        let invalid = || ConfigError::InvalidValue {
            field: "custom_columns".to_string(),
            value: key.to_string(),
        };

        if name.is_empty() || path.is_empty() {
            return Err(invalid().into());
        }

        let mut segments = Vec::new();
        for part in path.split('.') {
            match part {
                "" => return Err(invalid().into()),
                "*" => segments.push(PathSegment::Wildcard),
                field => segments.push(PathSegment::Key(field.to_string())),
            }
        }

        Ok(Self {
            name: name.to_string(),
            path: segments,
        })
    }

    /// Parse a list of column keys, failing on the first invalid one
    pub fn parse_all<S: AsRef<str>>(keys: &[S]) -> Result<Vec<Self>> {
        keys.iter().map(|key| Self::parse(key.as_ref())).collect()
    }

    /// Extract this column's value from a node's response
    ///
    /// Missing paths yield an empty string; fanned-out values are joined
    /// with `;`.
    pub fn extract(&self, node: &Node) -> String {
        let Some((first, rest)) = self.path.split_first() else {
            return String::new();
        };

        let mut current: Vec<&Bson> = match first {
            PathSegment::Key(key) => node.response.get(key).into_iter().collect(),
            PathSegment::Wildcard => node.response.values().collect(),
        };
        for segment in rest {
            current = current
                .into_iter()
                .flat_map(|value| descend(value, segment))
                .collect();
        }

        let converter = PlainTextConverter::new();
        current
            .into_iter()
            .map(|value| converter.convert(value))
            .collect::<Vec<_>>()
            .join(MULTI_VALUE_SEPARATOR)
    }
}

fn descend<'a>(value: &'a Bson, segment: &PathSegment) -> Vec<&'a Bson> {
    match (segment, value) {
        (PathSegment::Wildcard, Bson::Array(items)) => items.iter().collect(),
        (PathSegment::Wildcard, Bson::Document(doc)) => doc.values().collect(),
        (PathSegment::Key(key), Bson::Document(doc)) => doc.get(key).into_iter().collect(),
        (PathSegment::Key(key), Bson::Array(items)) => key
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// Trait for reading nodes from a persistent store
///
/// Pages and child lists are ordered by node id.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Total number of nodes
    async fn count(&self) -> Result<u64>;

    /// Fetch up to `limit` nodes starting at `offset`
    async fn fetch_page(&self, offset: u64, limit: u64) -> Result<Vec<Node>>;

    /// Look up a single node
    async fn find(&self, id: i64) -> Result<Option<Node>>;

    /// Direct children of a node
    async fn children(&self, parent_id: i64) -> Result<Vec<Node>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn sample() -> Node {
        let mut node = Node::new(7, Some(3), 1, "obj-7");
        node.objecttype = "data".to_string();
        node.response = doc! {
            "message": "hello",
            "from": { "name": "Ada", "id": 11 },
            "likes": { "data": [ { "id": "a" }, { "id": "b" } ] },
        };
        node
    }

    #[test]
    fn test_base_cells_order() {
        let node = sample();
        assert_eq!(
            node.base_cells(),
            vec!["1", "7", "3", "obj-7", "data", "", "", ""]
        );
    }

    #[test]
    fn test_root_has_empty_parent() {
        let node = Node::new(1, None, 0, "root");
        assert_eq!(node.base_cells()[2], "");
    }

    #[test]
    fn test_extract_nested_key() {
        let key = ColumnKey::parse("from.name").unwrap();
        assert_eq!(key.name, "from.name");
        assert_eq!(key.extract(&sample()), "Ada");
    }

    #[test]
    fn test_extract_array_index_and_wildcard() {
        let node = sample();
        assert_eq!(ColumnKey::parse("likes.data.1.id").unwrap().extract(&node), "b");
        assert_eq!(ColumnKey::parse("likes.data.*.id").unwrap().extract(&node), "a;b");
    }

    #[test]
    fn test_extract_missing_is_empty() {
        assert_eq!(ColumnKey::parse("nope.deeper").unwrap().extract(&sample()), "");
    }

    #[test]
    fn test_named_column() {
        let key = ColumnKey::parse("author = from.name").unwrap();
        assert_eq!(key.name, "author");
        assert_eq!(key.extract(&sample()), "Ada");
    }

    #[test]
    fn test_invalid_keys_rejected() {
        assert!(ColumnKey::parse("").is_err());
        assert!(ColumnKey::parse("a..b").is_err());
        assert!(ColumnKey::parse("name=").is_err());
    }

    #[test]
    fn test_header_with_custom_columns() {
        let columns = ColumnKey::parse_all(&["message"]).unwrap();
        let header = node_header(&columns);
        assert_eq!(header.len(), 9);
        assert_eq!(header[0], "level");
        assert_eq!(header[8], "message");
    }

    #[test]
    fn test_cells_include_custom_values() {
        let columns = ColumnKey::parse_all(&["message", "from.id"]).unwrap();
        let cells = sample().cells(&columns);
        assert_eq!(&cells[8..], ["hello", "11"]);
    }
}
