//! Error types for schema sanitization and parsing.

use thiserror::Error;

/// Errors produced while sanitizing or building schemas.
///
/// There is a single externally meaningful failure category, an invalid
/// schema; the variants distinguish a JSON syntax failure (which carries the
/// byte offset of the failure) from a structurally or semantically invalid
/// schema document.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// The input was not valid JSON.
    #[error("invalid schema: {message} at offset {offset}")]
    Parse {
        /// Byte offset of the failure within the input.
        offset: usize,
        /// Human-readable parser message.
        message: String,
    },

    /// The JSON was well formed but does not describe a valid schema.
    #[error("invalid schema: {0}")]
    Invalid(String),
}

impl SchemaError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SchemaError::Invalid(message.into())
    }

    /// Convert a serde_json error into a `Parse` error, translating the
    /// parser's line/column location into a byte offset within `input`.
    pub(crate) fn from_json(err: &serde_json::Error, input: &str) -> Self {
        SchemaError::Parse {
            offset: byte_offset(input, err.line(), err.column()),
            message: err.to_string(),
        }
    }
}

/// Translate a one-based line/column pair into a byte offset.
///
/// serde_json reports zeroed coordinates for errors with no location; those
/// map to offset 0.
fn byte_offset(input: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let preceding: usize = input
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (preceding + column.saturating_sub(1)).min(input.len())
}
