//! Seek-based chunk loading.
//!
//! Chunk boundaries recorded by the indexer always point at the first byte of
//! a row, so loading a chunk is a seek followed by reading `chunk_size`
//! lines. No partial row is ever read.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};

use super::config::DsvConfig;
use super::index::FileIndex;
use super::lines::{self, LineReader};
use super::parser::parse_line_with;
use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// One parsed data record. Its length is not checked against the header.
pub type Row = Vec<String>;

/// A contiguous window of parsed data rows.
///
/// A chunk is immutable once built; sessions replace it wholesale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    index: usize,
    first_row: u64,
    rows: Vec<Row>,
}

impl Chunk {
    pub fn new(index: usize, first_row: u64, rows: Vec<Row>) -> Self {
        Self {
            index,
            first_row,
            rows,
        }
    }

    /// Load chunk `index` of an indexed file.
    pub fn load(
        path: &Path,
        file_index: &FileIndex,
        index: usize,
        config: &DsvConfig,
    ) -> Result<Self> {
        Self::load_cancellable(path, file_index, index, config, &CancelToken::new())
    }

    /// Load chunk `index`, giving up with [`Error::Cancelled`] once `cancel`
    /// is set.
    pub fn load_cancellable(
        path: &Path,
        file_index: &FileIndex,
        index: usize,
        config: &DsvConfig,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let offset = file_index.offset(index).ok_or(Error::ChunkOutOfRange {
            index,
            count: file_index.chunk_count(),
        })?;

        let rows = RowReader::open(path, offset, config)?
            .with_cancel(cancel.clone())
            .take(file_index.chunk_size())
            .collect::<Result<Vec<_>>>()?;

        tracing::trace!(index, offset, rows = rows.len(), "loaded chunk");
        let first_row = index as u64 * file_index.chunk_size() as u64;
        Ok(Self::new(index, first_row, rows))
    }

    /// Position of this chunk in the file's index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Data-row number of the first row in this chunk.
    pub fn first_row(&self) -> u64 {
        self.first_row
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> Option<&Row> {
        self.rows.get(i)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Data-row numbers covered by this chunk.
    pub fn row_range(&self) -> Range<u64> {
        self.first_row..self.first_row + self.rows.len() as u64
    }
}

/// Read up to `chunk_size` rows starting at byte `offset`.
///
/// `offset` must be the start of a line, such as one returned by
/// [`FileIndex::offset`].
pub fn load_chunk(path: impl AsRef<Path>, offset: u64, chunk_size: usize) -> Result<Vec<Row>> {
    RowReader::open(path.as_ref(), offset, &DsvConfig::default())?
        .take(chunk_size)
        .collect()
}

/// Iterator over parsed rows starting at a line boundary.
///
/// Invalid UTF-8 is replaced rather than rejected. Iteration stops after the
/// first error.
pub struct RowReader<R = BufReader<File>> {
    lines: LineReader<R>,
    buf: Vec<u8>,
    config: DsvConfig,
    path: PathBuf,
    cancel: Option<CancelToken>,
    /// Set at end of input or after an error; the iterator is fused from then on.
    done: bool,
}

impl RowReader<BufReader<File>> {
    /// Open `path` for reading and seek to `offset`.
    pub fn open(path: &Path, offset: u64, config: &DsvConfig) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io(path, e))?;
        Ok(Self {
            lines: LineReader::new(BufReader::new(file), offset),
            buf: Vec::new(),
            config: config.clone(),
            path: path.to_path_buf(),
            cancel: None,
            done: false,
        })
    }
}

impl<R: BufRead> RowReader<R> {
    /// Read rows from an in-memory or already positioned reader.
    pub fn from_reader(reader: R, config: &DsvConfig) -> Self {
        Self {
            lines: LineReader::new(reader, 0),
            buf: Vec::new(),
            config: config.clone(),
            path: PathBuf::new(),
            cancel: None,
            done: false,
        }
    }

    /// Stop with [`Error::Cancelled`] once `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Byte position of the next unread row.
    pub fn position(&self) -> u64 {
        self.lines.position()
    }

    /// Read and parse the next line. A cancelled token stops the read before
    /// any I/O and yields [`Error::Cancelled`].
    fn read_row(&mut self) -> Result<Option<Row>> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        let more = self
            .lines
            .next_line(&mut self.buf)
            .map_err(|e| Error::io(&self.path, e))?;
        if !more {
            return Ok(None);
        }
        let row = parse_line_with(&lines::decode(&self.buf), &self.config);
        Ok(Some(row))
    }
}

impl<R: BufRead> Iterator for RowReader<R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
