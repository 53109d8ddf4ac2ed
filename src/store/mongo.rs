//! MongoDB-backed node store
//!
//! Nodes live in a single collection keyed by their integer `_id`.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::{debug, info};

use crate::error::Result;

use super::{Node, NodeStore};

/// Node store reading from a MongoDB collection
pub struct MongoNodeStore {
    collection: Collection<Node>,
}

impl MongoNodeStore {
    /// Connect to MongoDB and verify the server is reachable
    ///
    /// # Arguments
    /// * `uri` - MongoDB connection URI
    /// * `database` - Database holding the nodes
    /// * `collection` - Collection name
    /// * `timeout` - Connect and server selection timeout
    ///
    /// # Returns
    /// * `Result<Self>` - Connected store or driver error
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options)?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await?;

        info!("Connected to {}.{}", database, collection);
        Ok(Self {
            collection: db.collection::<Node>(collection),
        })
    }
}

/// Driver limit for a page of `limit` nodes
///
/// The driver reads a negative limit as a single-batch request, so sizes
/// beyond `i64::MAX` saturate instead of wrapping.
fn page_limit(limit: u64) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl NodeStore for MongoNodeStore {
    async fn count(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    async fn fetch_page(&self, offset: u64, limit: u64) -> Result<Vec<Node>> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .skip(offset)
            .limit(page_limit(limit))
            .await?;
        let nodes: Vec<Node> = cursor.try_collect().await?;
        debug!("Fetched {} nodes at offset {}", nodes.len(), offset);
        Ok(nodes)
    }

    async fn find(&self, id: i64) -> Result<Option<Node>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn children(&self, parent_id: i64) -> Result<Vec<Node>> {
        let cursor = self
            .collection
            .find(doc! { "parent_id": parent_id })
            .sort(doc! { "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
