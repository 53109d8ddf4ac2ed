//! Error handling for export operations.
//!
//! Errors are grouped by where they arise:
//! - `FormatError`: invalid formatting options such as a bad delimiter escape
//! - `SourceError`: failures reading nodes from a store or row model
//! - `ConfigError`: configuration loading and validation
//!
//! Everything is wrapped by [`ExportError`], and writing failures on the
//! destination are reported as [`ExportError::Write`].

pub mod kinds;

// Re-export commonly used types
pub use kinds::{ConfigError, ExportError, FormatError, Result, SourceError};
