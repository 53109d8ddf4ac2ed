//! Export options and delimiter resolution

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// Which nodes an export covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    /// Every node in the store, paged in id order
    #[default]
    All,

    /// The selected nodes and their descendants, in tree order
    Selected,
}

impl ExportScope {
    /// Default scope for a selection
    ///
    /// Exporting everything is faster, so a selection that is empty or
    /// covers every node falls back to `All`.
    pub fn suggest(selected: usize, total: u64) -> Self {
        if selected == 0 || selected as u64 >= total {
            ExportScope::All
        } else {
            ExportScope::Selected
        }
    }
}

impl fmt::Display for ExportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportScope::All => write!(f, "all"),
            ExportScope::Selected => write!(f, "selected"),
        }
    }
}

impl FromStr for ExportScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ExportScope::All),
            "selected" => Ok(ExportScope::Selected),
            other => Err(format!("Unknown export scope '{other}' (expected all or selected)")),
        }
    }
}

/// Formatting options for one export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Prefix the file with a UTF-8 byte order mark
    pub use_byte_order_mark: bool,

    /// Replace `\n` and `\r` in every cell with a space
    pub strip_line_breaks: bool,

    /// Field delimiter as entered, escapes such as `\t` still unresolved
    pub delimiter: String,

    /// Which nodes to export
    pub scope: ExportScope,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            use_byte_order_mark: true,
            strip_line_breaks: true,
            delimiter: ";".to_string(),
            scope: ExportScope::All,
        }
    }
}

impl ExportOptions {
    /// Delimiter with backslash escapes resolved
    pub fn resolved_delimiter(&self) -> Result<String, FormatError> {
        unescape_delimiter(&self.delimiter)
    }
}

/// Resolve backslash escapes in a delimiter
///
/// Supports `\\ \' \" \a \b \f \n \r \t \v`, octal `\o` to `\ooo`, `\xHH`,
/// `\uHHHH` and `\UHHHHHHHH`. Any other escape is an error, as is a
/// delimiter that resolves to nothing.
pub fn unescape_delimiter(raw: &str) -> Result<String, FormatError> {
    let chars: Vec<char> = raw.chars().collect();
    let mut resolved = String::with_capacity(raw.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '\\' {
            resolved.push(chars[i]);
            i += 1;
            continue;
        }

        let position = i;
        let Some(&kind) = chars.get(i + 1) else {
            return Err(FormatError::TruncatedEscape { position });
        };
        i += 2;

        let ch = match kind {
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\x0b',
            '0'..='7' => {
                let mut value = kind.to_digit(8).unwrap_or(0);
                let mut taken = 0;
                while taken < 2 {
                    match chars.get(i).and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            i += 1;
                            taken += 1;
                        }
                        None => break,
                    }
                }
                to_char(value)?
            }
            'x' | 'u' | 'U' => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let value = read_hex(&chars, i, width, position)?;
                i += width;
                to_char(value)?
            }
            other => {
                return Err(FormatError::InvalidEscape {
                    sequence: format!("\\{other}"),
                    position,
                });
            }
        };
        resolved.push(ch);
    }

    if resolved.is_empty() {
        return Err(FormatError::EmptyDelimiter);
    }
    Ok(resolved)
}

fn read_hex(chars: &[char], start: usize, width: usize, position: usize) -> Result<u32, FormatError> {
    let mut value = 0u32;
    for offset in 0..width {
        let Some(&c) = chars.get(start + offset) else {
            return Err(FormatError::TruncatedEscape { position });
        };
        let Some(digit) = c.to_digit(16) else {
            let end = (start + offset + 1).min(chars.len());
            return Err(FormatError::InvalidEscape {
                sequence: chars[position..end].iter().collect(),
                position,
            });
        };
        value = value.wrapping_mul(16).wrapping_add(digit);
    }
    Ok(value)
}

fn to_char(value: u32) -> Result<char, FormatError> {
    char::from_u32(value).ok_or(FormatError::InvalidCodePoint { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_delimiters_unchanged() {
        assert_eq!(unescape_delimiter(";").unwrap(), ";");
        assert_eq!(unescape_delimiter(",").unwrap(), ",");
        assert_eq!(unescape_delimiter("||").unwrap(), "||");
        assert_eq!(unescape_delimiter("§").unwrap(), "§");
    }

    #[test]
    fn test_named_escapes() {
        assert_eq!(unescape_delimiter("\\t").unwrap(), "\t");
        assert_eq!(unescape_delimiter("\\n").unwrap(), "\n");
        assert_eq!(unescape_delimiter("\\\\").unwrap(), "\\");
        assert_eq!(unescape_delimiter("\\v").unwrap(), "\x0b");
        assert_eq!(unescape_delimiter("a\\tb").unwrap(), "a\tb");
    }

    #[test]
    fn test_numeric_escapes() {
        assert_eq!(unescape_delimiter("\\x09").unwrap(), "\t");
        assert_eq!(unescape_delimiter("\\011").unwrap(), "\t");
        assert_eq!(unescape_delimiter("\\0").unwrap(), "\0");
        assert_eq!(unescape_delimiter("\\u00a6").unwrap(), "¦");
        assert_eq!(unescape_delimiter("\\U0001F600").unwrap(), "😀");
    }

    #[test]
    fn test_unknown_escape_is_error() {
        assert_eq!(
            unescape_delimiter("\\q"),
            Err(FormatError::InvalidEscape {
                sequence: "\\q".to_string(),
                position: 0
            })
        );
    }

    #[test]
    fn test_truncated_escapes() {
        assert_eq!(
            unescape_delimiter("x\\"),
            Err(FormatError::TruncatedEscape { position: 1 })
        );
        assert_eq!(
            unescape_delimiter("\\x9"),
            Err(FormatError::TruncatedEscape { position: 0 })
        );
        assert!(matches!(
            unescape_delimiter("\\xZZ"),
            Err(FormatError::InvalidEscape { position: 0, .. })
        ));
    }

    #[test]
    fn test_surrogate_rejected() {
        assert_eq!(
            unescape_delimiter("\\ud800"),
            Err(FormatError::InvalidCodePoint { value: 0xD800 })
        );
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        assert_eq!(unescape_delimiter(""), Err(FormatError::EmptyDelimiter));
    }

    #[test]
    fn test_default_options() {
        let options = ExportOptions::default();
        assert!(options.use_byte_order_mark);
        assert!(options.strip_line_breaks);
        assert_eq!(options.resolved_delimiter().unwrap(), ";");
        assert_eq!(options.scope, ExportScope::All);
    }

    #[test]
    fn test_scope_suggestion() {
        assert_eq!(ExportScope::suggest(0, 10), ExportScope::All);
        assert_eq!(ExportScope::suggest(10, 10), ExportScope::All);
        assert_eq!(ExportScope::suggest(3, 10), ExportScope::Selected);
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("ALL".parse::<ExportScope>().unwrap(), ExportScope::All);
        assert_eq!("selected".parse::<ExportScope>().unwrap(), ExportScope::Selected);
        assert!("some".parse::<ExportScope>().is_err());
    }
}
