//! Export module for streaming node exports to CSV
//!
//! This module provides the export pipeline:
//! - Streaming exports that hold at most one page of nodes in memory
//! - Two row sources: a fixed list of selected ids, or the whole store paged by id
//! - Progress tracking with cooperative cancellation
//! - Quoted, CRLF-terminated CSV output with a configurable delimiter
//!
//! # Architecture
//!
//! 1. **Source**: where rows come from ([`Source::FixedIndexList`] or [`Source::PagedQuery`])
//! 2. **ProgressSink**: receives progress and reports cancellation
//! 3. **CsvWriter**: formats and writes rows to an async sink
//!
//! These are orchestrated by [`export`], which owns the header/rows sequence
//! and the cancellation checks.
//!
//! # Example
//!
//! ```no_run
//! use nodexport::export::{export, ExportOptions, PagedQuery, ProgressTracker, Source};
//! use nodexport::store::MemoryNodeStore;
//!
//! # async fn run() -> nodexport::Result<()> {
//! let store = MemoryNodeStore::from_jsonl("nodes.jsonl").await?;
//! let mut file = tokio::fs::File::create("nodes.csv").await?;
//! let mut tracker = ProgressTracker::new(true);
//!
//! let source = Source::paged(PagedQuery::new(&store, &[]));
//! let result = export(&mut file, &ExportOptions::default(), source, &mut tracker).await?;
//! println!("{} rows", result.rows_exported);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod options;
pub mod progress;
pub mod source;
pub mod writers;

pub use coordinator::{ExportResult, export};
pub use options::{ExportOptions, ExportScope, unescape_delimiter};
pub use progress::{ProgressGuard, ProgressSink, ProgressTracker};
pub use source::{DEFAULT_PAGE_SIZE, PagedQuery, RowModel, Source, TreeModel};
pub use writers::{BYTE_ORDER_MARK, CsvWriter, write_byte_order_mark};
