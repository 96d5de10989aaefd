//! Configuration for chunked DSV access.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of data rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Configuration for DSV parsing, indexing and export.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DsvConfig {
    /// Field delimiter (default: b',')
    pub delimiter: u8,
    /// Quote character (default: b'"')
    pub quote_char: u8,
    /// Data rows per chunk (default: 1000)
    pub chunk_size: usize,
}

impl Default for DsvConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote_char: b'"',
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl DsvConfig {
    /// Create a CSV configuration (comma-separated).
    pub fn csv() -> Self {
        Self::default()
    }

    /// Create a TSV configuration (tab-separated).
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }

    /// Set the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote character.
    pub fn with_quote_char(mut self, quote_char: u8) -> Self {
        self.quote_char = quote_char;
        self
    }

    /// Set the number of data rows per chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[inline]
    pub(crate) fn delimiter_char(&self) -> char {
        char::from(self.delimiter)
    }

    #[inline]
    pub(crate) fn quote(&self) -> char {
        char::from(self.quote_char)
    }
}
