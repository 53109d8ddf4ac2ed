//! CSV row writer for export operations
//!
//! Every field is quoted, embedded quotes are doubled and rows end with
//! CRLF regardless of platform. The delimiter may be any non-empty string.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ExportError, Result};

/// UTF-8 byte order mark written ahead of the header when requested
pub const BYTE_ORDER_MARK: &str = "\u{feff}";

const QUOTE: char = '"';
const LINE_TERMINATOR: &str = "\r\n";

/// Writer for quoted CSV rows over a borrowed async sink
///
/// The writer flushes but never shuts down the sink; closing it is left to
/// whoever opened it.
pub struct CsvWriter<'a, W> {
    /// Destination sink
    sink: &'a mut W,
    /// Resolved field delimiter
    delimiter: String,
    /// Replace line breaks in cells with spaces
    strip_line_breaks: bool,
    /// Number of data rows written
    written: u64,
}

impl<'a, W> CsvWriter<'a, W>
where
    W: AsyncWrite + Unpin,
{
    /// Create a new CSV writer
    ///
    /// # Arguments
    /// * `sink` - Open destination, positioned where the header belongs
    /// * `delimiter` - Field delimiter with escapes already resolved
    /// * `strip_line_breaks` - Replace `\n` and `\r` in cells with spaces
    pub fn new(sink: &'a mut W, delimiter: impl Into<String>, strip_line_breaks: bool) -> Self {
        Self {
            sink,
            delimiter: delimiter.into(),
            strip_line_breaks,
            written: 0,
        }
    }

    /// Write the header row
    pub async fn write_header(&mut self, header: &[String]) -> Result<()> {
        let line = self.format_row(header);
        self.write_line(&line).await?;
        debug!("Wrote CSV header: {} fields", header.len());
        Ok(())
    }

    /// Write a single data row
    pub async fn write_row(&mut self, cells: &[String]) -> Result<()> {
        let line = self.format_row(cells);
        self.write_line(&line).await?;
        self.written += 1;
        Ok(())
    }

    /// Flush buffered output to the sink
    pub async fn finalize(&mut self) -> Result<()> {
        self.sink.flush().await.map_err(ExportError::Write)?;
        debug!("Finalized CSV output ({} rows)", self.written);
        Ok(())
    }

    /// Number of data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.written
    }

    /// Render one row, terminator included
    pub fn format_row(&self, cells: &[String]) -> String {
        let mut line = String::new();
        for (index, cell) in cells.iter().enumerate() {
            if index > 0 {
                line.push_str(&self.delimiter);
            }
            if self.strip_line_breaks {
                line.push_str(&quote_field(&strip_line_breaks(cell)));
            } else {
                line.push_str(&quote_field(cell));
            }
        }
        line.push_str(LINE_TERMINATOR);
        line
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.sink
            .write_all(line.as_bytes())
            .await
            .map_err(ExportError::Write)
    }
}

/// Wrap a value in quotes, doubling any embedded quote
pub fn quote_field(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push(QUOTE);
    for ch in value.chars() {
        if ch == QUOTE {
            quoted.push(QUOTE);
        }
        quoted.push(ch);
    }
    quoted.push(QUOTE);
    quoted
}

/// Replace every `\n` and `\r` with a single space each
pub fn strip_line_breaks(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}

/// Write the byte order mark to a freshly opened sink
pub async fn write_byte_order_mark<W>(sink: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    sink.write_all(BYTE_ORDER_MARK.as_bytes())
        .await
        .map_err(ExportError::Write)
}
