//! Export coordinator for orchestrating export operations
//!
//! Brings together a row source, progress tracking and the CSV writer:
//! header first, then every row, checking for cancellation before each row
//! and before each page.

use std::time::Instant;

use tokio::io::AsyncWrite;
use tracing::{debug, info};

use crate::error::Result;

use super::options::ExportOptions;
use super::progress::{ProgressGuard, ProgressSink};
use super::source::{PagedQuery, RowModel, Source};
use super::writers::CsvWriter;

/// Result of an export operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// Number of data rows written, header excluded
    pub rows_exported: u64,
    /// Whether the export stopped early on request
    pub cancelled: bool,
    /// Time taken for export
    pub elapsed_ms: u64,
}

/// How a row loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Cancelled,
}

/// Export rows from `source` to `sink` as delimited text
///
/// The sink must already be positioned at the start of the output, with the
/// byte order mark written by the caller if one is wanted. It is flushed but
/// never closed. `progress` is closed exactly once, whatever the outcome.
///
/// Cancellation is not an error: the rows written so far form a valid,
/// truncated file and the result reports `cancelled`.
///
/// # Returns
/// * `Result<ExportResult>` - Export statistics, or the first format, source
///   or write error
pub async fn export<W>(
    sink: &mut W,
    options: &ExportOptions,
    source: Source<'_>,
    progress: &mut dyn ProgressSink,
) -> Result<ExportResult>
where
    W: AsyncWrite + Unpin,
{
    let mut progress = ProgressGuard::new(progress);
    let start_time = Instant::now();

    let delimiter = options.resolved_delimiter()?;
    let mut writer = CsvWriter::new(sink, delimiter, options.strip_line_breaks);

    info!("Starting {} export", options.scope);

    let outcome = match source {
        Source::FixedIndexList { header, ids, model } => {
            export_fixed(&mut writer, &mut progress, &header, &ids, model).await?
        }
        Source::PagedQuery(query) => export_paged(&mut writer, &mut progress, &query).await?,
    };

    writer.finalize().await?;

    let rows_exported = writer.rows_written();
    let elapsed_ms = start_time.elapsed().as_millis() as u64;
    let cancelled = outcome == Outcome::Cancelled;

    if cancelled {
        info!("Export cancelled after {} rows", rows_exported);
    } else {
        info!("Export completed: {} rows, {} ms", rows_exported, elapsed_ms);
    }

    Ok(ExportResult {
        rows_exported,
        cancelled,
        elapsed_ms,
    })
}

async fn export_fixed<W>(
    writer: &mut CsvWriter<'_, W>,
    progress: &mut ProgressGuard<'_>,
    header: &[String],
    ids: &[i64],
    model: &dyn RowModel,
) -> Result<Outcome>
where
    W: AsyncWrite + Unpin,
{
    progress.set_maximum(ids.len() as u64);
    writer.write_header(header).await?;

    for &id in ids {
        if progress.was_canceled() {
            return Ok(Outcome::Cancelled);
        }
        let row = model.row_data(id).await?;
        writer.write_row(&row).await?;
        progress.step();
    }

    Ok(Outcome::Completed)
}

async fn export_paged<W>(
    writer: &mut CsvWriter<'_, W>,
    progress: &mut ProgressGuard<'_>,
    query: &PagedQuery<'_>,
) -> Result<Outcome>
where
    W: AsyncWrite + Unpin,
{
    progress.set_maximum(query.total().await?);
    writer.write_header(&query.header()).await?;

    let mut page_index = 0u64;
    loop {
        if progress.was_canceled() {
            return Ok(Outcome::Cancelled);
        }

        let nodes = query.page(page_index).await?;
        if nodes.is_empty() {
            debug!("No more nodes available");
            break;
        }

        for node in &nodes {
            if progress.was_canceled() {
                return Ok(Outcome::Cancelled);
            }
            writer.write_row(&query.row(node)).await?;
            progress.step();
        }

        // A short page means the store is exhausted
        if (nodes.len() as u64) < query.page_size() {
            break;
        }
        page_index += 1;

        if page_index % 10 == 0 {
            info!(
                "Progress: {} rows exported ({} pages)",
                writer.rows_written(),
                page_index
            );
        }
    }

    Ok(Outcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExportError, FormatError, SourceError};
    use crate::store::{MemoryNodeStore, Node};
    use async_trait::async_trait;

    /// Progress sink recording calls and cancelling after a number of steps
    struct RecordingProgress {
        maximum: Option<u64>,
        steps: u64,
        cancel_after: Option<u64>,
        closed: u32,
    }

    impl RecordingProgress {
        fn new(cancel_after: Option<u64>) -> Self {
            Self {
                maximum: None,
                steps: 0,
                cancel_after,
                closed: 0,
            }
        }
    }

    impl ProgressSink for RecordingProgress {
        fn set_maximum(&mut self, maximum: u64) {
            self.maximum = Some(maximum);
        }

        fn step(&mut self) {
            self.steps += 1;
        }

        fn was_canceled(&self) -> bool {
            self.cancel_after.is_some_and(|n| self.steps >= n)
        }

        fn close(&mut self) {
            self.closed += 1;
        }
    }

    struct VecModel {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    }

    #[async_trait]
    impl RowModel for VecModel {
        fn row_header(&self) -> Vec<String> {
            self.header.clone()
        }

        async fn row_data(&self, id: i64) -> Result<Vec<String>> {
            self.rows
                .get(id as usize)
                .cloned()
                .ok_or_else(|| SourceError::NodeNotFound(id).into())
        }
    }

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn comma_options() -> ExportOptions {
        ExportOptions {
            delimiter: ",".to_string(),
            ..ExportOptions::default()
        }
    }

    fn nodes(count: i64) -> MemoryNodeStore {
        MemoryNodeStore::new((1..=count).map(|id| Node::new(id, None, 0, format!("o{id}"))).collect())
    }

    #[tokio::test]
    async fn test_fixed_list_export() {
        let model = VecModel {
            header: strings(&["x", "y"]),
            rows: vec![strings(&["a", "b,c"]), strings(&["d\ne", "f"])],
        };
        let mut out: Vec<u8> = Vec::new();
        let mut progress = RecordingProgress::new(None);

        let result = export(
            &mut out,
            &comma_options(),
            Source::fixed(&model, vec![0, 1]),
            &mut progress,
        )
        .await
        .unwrap();

        assert_eq!(result.rows_exported, 2);
        assert!(!result.cancelled);
        assert_eq!(progress.maximum, Some(2));
        assert_eq!(progress.steps, 2);
        assert_eq!(progress.closed, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"x\",\"y\"\r\n\"a\",\"b,c\"\r\n\"d e\",\"f\"\r\n"
        );
    }

    #[tokio::test]
    async fn test_fixed_list_follows_given_order() {
        let model = VecModel {
            header: strings(&["v"]),
            rows: vec![strings(&["zero"]), strings(&["one"]), strings(&["two"])],
        };
        let mut out: Vec<u8> = Vec::new();
        let mut progress = RecordingProgress::new(None);

        export(&mut out, &comma_options(), Source::fixed(&model, vec![2, 0]), &mut progress)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"v\"\r\n\"two\"\r\n\"zero\"\r\n"
        );
    }

    #[tokio::test]
    async fn test_paged_export_writes_every_node() {
        let store = nodes(7);
        let query = PagedQuery::new(&store, &[]).with_page_size(3);
        let mut out: Vec<u8> = Vec::new();
        let mut progress = RecordingProgress::new(None);

        let result = export(&mut out, &comma_options(), Source::paged(query), &mut progress)
            .await
            .unwrap();

        assert_eq!(result.rows_exported, 7);
        assert_eq!(progress.maximum, Some(7));
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.split_terminator("\r\n").collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("\"level\",\"id\",\"parent_id\""));
        assert!(lines[7].contains("\"o7\""));
    }

    #[tokio::test]
    async fn test_cancellation_truncates_without_error() {
        let store = nodes(10);
        let query = PagedQuery::new(&store, &[]).with_page_size(4);
        let mut out: Vec<u8> = Vec::new();
        let mut progress = RecordingProgress::new(Some(6));

        let result = export(&mut out, &comma_options(), Source::paged(query), &mut progress)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.rows_exported, 6);
        assert_eq!(progress.closed, 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.split_terminator("\r\n").count(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_writes_header_only() {
        let model = VecModel {
            header: strings(&["v"]),
            rows: vec![strings(&["zero"])],
        };
        let mut out: Vec<u8> = Vec::new();
        let mut progress = RecordingProgress::new(Some(0));

        let result = export(&mut out, &comma_options(), Source::fixed(&model, vec![0]), &mut progress)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.rows_exported, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "\"v\"\r\n");
    }

    #[tokio::test]
    async fn test_bad_delimiter_fails_and_closes_progress() {
        let store = nodes(1);
        let options = ExportOptions {
            delimiter: "\\q".to_string(),
            ..ExportOptions::default()
        };
        let mut out: Vec<u8> = Vec::new();
        let mut progress = RecordingProgress::new(None);

        let err = export(
            &mut out,
            &options,
            Source::paged(PagedQuery::new(&store, &[])),
            &mut progress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExportError::Format(FormatError::InvalidEscape { .. })));
        assert_eq!(progress.closed, 1);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_missing_row_is_source_error() {
        let model = VecModel {
            header: strings(&["v"]),
            rows: vec![],
        };
        let mut out: Vec<u8> = Vec::new();
        let mut progress = RecordingProgress::new(None);

        let err = export(&mut out, &comma_options(), Source::fixed(&model, vec![3]), &mut progress)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Source(SourceError::NodeNotFound(3))));
        assert_eq!(progress.closed, 1);
    }

    #[tokio::test]
    async fn test_write_failure_aborts_export() {
        let store = nodes(3);
        let mut sink = tokio_test::io::Builder::new()
            .write_error(std::io::Error::other("disk full"))
            .build();
        let mut progress = RecordingProgress::new(None);

        let err = export(
            &mut sink,
            &comma_options(),
            Source::paged(PagedQuery::new(&store, &[])),
            &mut progress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExportError::Write(_)));
        assert_eq!(progress.steps, 0);
        assert_eq!(progress.closed, 1);
    }
}
