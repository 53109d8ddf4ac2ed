//! Format writers for export operations

pub mod csv;

pub use csv::{BYTE_ORDER_MARK, CsvWriter, quote_field, strip_line_breaks, write_byte_order_mark};
