//! Value formatting for exported cells

pub mod cell;

pub use cell::{BsonConverter, PlainTextConverter};
