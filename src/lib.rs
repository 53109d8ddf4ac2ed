//! nodexport library
//!
//! Streams a tree-shaped node collection to CSV, paging through the store or
//! following a selection of nodes and their children, with progress
//! reporting and cooperative cancellation.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: The export pipeline (options, sources, progress, CSV writer)
//! - `formatter`: Cell value formatting
//! - `store`: Node model and node stores (MongoDB, in-memory)
//!
//! # Example
//!
//! ```no_run
//! use nodexport::export::{export, ExportOptions, ProgressTracker, Source, TreeModel};
//! use nodexport::store::MongoNodeStore;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoNodeStore::connect(
//!         "mongodb://localhost:27017",
//!         "facepager",
//!         "nodes",
//!         Duration::from_secs(30),
//!     )
//!     .await?;
//!
//!     let model = TreeModel::new(&store, &[]);
//!     let ids = model.selected_with_children(&[1, 2]).await?;
//!
//!     let mut out = tokio::fs::File::create("selection.csv").await?;
//!     let mut tracker = ProgressTracker::new(true);
//!     export(&mut out, &ExportOptions::default(), Source::fixed(&model, ids), &mut tracker).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod formatter;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{ExportError, Result};
pub use export::{ExportOptions, ExportResult, ExportScope, export};
pub use store::{ColumnKey, Node, NodeStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
