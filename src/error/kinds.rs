use std::{fmt, io};

/// Crate-wide `Result` type using [`ExportError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Top-level error type for export operations.
///
/// Cancellation is deliberately absent: a cancelled export returns `Ok`
/// with a truncated output.
#[derive(Debug)]
pub enum ExportError {
    /// Invalid formatting options (e.g. a bad delimiter escape).
    Format(FormatError),

    /// I/O failure while writing the destination.
    Write(io::Error),

    /// Node store or row model failure.
    Source(SourceError),

    /// Configuration errors.
    Config(ConfigError),

    /// Other I/O errors (opening or preparing the destination).
    Io(io::Error),
}

/// Formatting-option errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Backslash followed by a character that is not a known escape.
    InvalidEscape { sequence: String, position: usize },

    /// Escape sequence cut short by the end of input.
    TruncatedEscape { position: usize },

    /// Numeric escape that does not name a valid character.
    InvalidCodePoint { value: u32 },

    /// Delimiter resolved to nothing.
    EmptyDelimiter,
}

/// Errors raised while reading nodes.
#[derive(Debug)]
pub enum SourceError {
    /// MongoDB driver errors.
    Driver(mongodb::error::Error),

    /// A node id could not be resolved.
    NodeNotFound(i64),

    /// A stored node could not be decoded.
    InvalidDocument { line: usize, message: String },

    /// I/O errors while reading node input.
    Io(io::Error),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Generic configuration error.
    Generic(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Format(e) => write!(f, "Format error: {e}"),
            ExportError::Write(e) => write!(f, "Write error: {e}"),
            ExportError::Source(e) => write!(f, "Source error: {e}"),
            ExportError::Config(e) => write!(f, "Configuration error: {e}"),
            ExportError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::InvalidEscape { sequence, position } => {
                write!(f, "Invalid escape sequence '{sequence}' at position {position}")
            }
            FormatError::TruncatedEscape { position } => {
                write!(f, "Truncated escape sequence at position {position}")
            }
            FormatError::InvalidCodePoint { value } => {
                write!(f, "Escape sequence names invalid character U+{value:X}")
            }
            FormatError::EmptyDelimiter => write!(f, "Delimiter must not be empty"),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Driver(e) => write!(f, "Query failed: {e}"),
            SourceError::NodeNotFound(id) => write!(f, "Node {id} not found"),
            SourceError::InvalidDocument { line, message } => {
                write!(f, "Invalid node document on line {line}: {message}")
            }
            SourceError::Io(e) => write!(f, "Failed to read nodes: {e}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Format(e) => Some(e),
            ExportError::Write(e) | ExportError::Io(e) => Some(e),
            ExportError::Source(e) => Some(e),
            ExportError::Config(e) => Some(e),
        }
    }
}
impl std::error::Error for FormatError {}
impl std::error::Error for SourceError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to ExportError ========================= */

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<mongodb::error::Error> for ExportError {
    fn from(err: mongodb::error::Error) -> Self {
        ExportError::Source(SourceError::Driver(err))
    }
}

impl From<FormatError> for ExportError {
    fn from(err: FormatError) -> Self {
        ExportError::Format(err)
    }
}

impl From<SourceError> for ExportError {
    fn from(err: SourceError) -> Self {
        ExportError::Source(err)
    }
}

impl From<ConfigError> for ExportError {
    fn from(err: ConfigError) -> Self {
        ExportError::Config(err)
    }
}
