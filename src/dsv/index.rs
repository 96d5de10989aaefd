//! Sparse row index for DSV files.
//!
//! The index is built with one forward pass over the file and records the
//! byte offset of every `chunk_size`-th data row. Memory is proportional to
//! the number of chunks, not to the file size: row contents are never kept.

use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::config::DsvConfig;
use super::lines::{self, LineReader};
use super::parser::parse_line_with;
use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// Read buffer used for the indexing scan.
const SCAN_BUFFER_SIZE: usize = 256 * 1024;

/// Sparse index over a DSV file.
///
/// `offsets[i]` is the byte position of data row `i * chunk_size`, so
/// `offsets.len() == ceil(total_rows / chunk_size)` and the offsets are
/// strictly increasing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileIndex {
    header: Vec<String>,
    total_rows: u64,
    chunk_size: usize,
    offsets: Vec<u64>,
    /// Byte position right after the header line.
    data_start: u64,
    /// File length observed when the scan started.
    file_len: u64,
}

impl FileIndex {
    /// Column names parsed from the first line.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of data rows (lines after the header).
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Rows per chunk this index was built with.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Byte offsets of each chunk's first row.
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.offsets.len()
    }

    /// Byte offset of chunk `index`, if it exists.
    pub fn offset(&self, index: usize) -> Option<u64> {
        self.offsets.get(index).copied()
    }

    /// Byte position of the first data row (right after the header line).
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// True when the file has a header but no data rows.
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    /// Data-row range `[i * chunk_size, min((i + 1) * chunk_size, total_rows))`
    /// covered by chunk `index`.
    pub fn row_range(&self, index: usize) -> Option<Range<u64>> {
        if index >= self.chunk_count() {
            return None;
        }
        let size = self.chunk_size as u64;
        let start = index as u64 * size;
        Some(start..(start + size).min(self.total_rows))
    }

    /// Chunk containing data row `row`.
    pub fn chunk_of_row(&self, row: u64) -> Option<usize> {
        if row >= self.total_rows {
            return None;
        }
        Some((row / self.chunk_size as u64) as usize)
    }
}

/// Progress of an indexing scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexProgress {
    pub bytes_read: u64,
    pub total_bytes: u64,
}

impl IndexProgress {
    /// Whole percentage scanned, 0 to 100.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let pct = self.bytes_read.saturating_mul(100) / self.total_bytes;
        pct.min(100) as u8
    }
}

/// Build a [`FileIndex`] for `path` with comma-separated defaults.
///
/// # Examples
///
/// ```no_run
/// use bigcsv::dsv::build_index;
///
/// let index = build_index("huge.csv", 1000)?;
/// println!("{} rows in {} chunks", index.total_rows(), index.chunk_count());
/// # Ok::<(), bigcsv::Error>(())
/// ```
pub fn build_index(path: impl AsRef<Path>, chunk_size: usize) -> Result<FileIndex> {
    let config = DsvConfig::default().with_chunk_size(chunk_size);
    build_index_with(path.as_ref(), &config, &mut |_| {}, &CancelToken::new())
}

/// Build a [`FileIndex`] with progress reporting and cancellation.
///
/// `on_progress` fires once per whole-percent change of bytes scanned. The
/// scan checks `cancel` before every line and returns [`Error::Cancelled`]
/// once it is set.
pub fn build_index_with<F>(
    path: &Path,
    config: &DsvConfig,
    on_progress: &mut F,
    cancel: &CancelToken,
) -> Result<FileIndex>
where
    F: FnMut(IndexProgress),
{
    let chunk_size = config.chunk_size;
    if chunk_size == 0 {
        return Err(Error::InvalidChunkSize);
    }

    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let file_len = file.metadata().map_err(|e| Error::io(path, e))?.len();
    let mut reader = LineReader::new(BufReader::with_capacity(SCAN_BUFFER_SIZE, file), 0);
    let mut buf = Vec::new();

    if !reader.next_line(&mut buf).map_err(|e| Error::io(path, e))? {
        return Err(Error::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    let header = parse_line_with(&lines::decode(lines::strip_bom(&buf)), config);
    let data_start = reader.position();

    let mut offsets = Vec::new();
    let mut total_rows: u64 = 0;
    let mut last_percent = None;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!(path = %path.display(), total_rows, "index scan cancelled");
            return Err(Error::Cancelled);
        }

        let line_start = reader.position();
        if !reader.next_line(&mut buf).map_err(|e| Error::io(path, e))? {
            break;
        }
        if total_rows % chunk_size as u64 == 0 {
            offsets.push(line_start);
        }
        total_rows += 1;

        let progress = IndexProgress {
            bytes_read: reader.position(),
            total_bytes: file_len,
        };
        let percent = progress.percent();
        if last_percent != Some(percent) {
            last_percent = Some(percent);
            on_progress(progress);
        }
    }

    tracing::debug!(
        path = %path.display(),
        columns = header.len(),
        total_rows,
        chunks = offsets.len(),
        chunk_size,
        "built file index"
    );

    Ok(FileIndex {
        header,
        total_rows,
        chunk_size,
        offsets,
        data_start,
        file_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_four_rows_chunk_two() {
        let file = write_file(b"a,b,c\n1,2,3\n4,5,6\n7,8,9\n10,11,12\n");
        let index = build_index(file.path(), 2).unwrap();

        assert_eq!(index.header(), ["a", "b", "c"]);
        assert_eq!(index.total_rows(), 4);
        assert_eq!(index.offsets(), [6, 18]);
        assert_eq!(index.data_start(), 6);
        assert_eq!(index.row_range(1), Some(2..4));
        assert_eq!(index.row_range(2), None);
    }

    #[test]
    fn test_partial_last_chunk() {
        let file = write_file(b"h\n1\n2\n3\n4\n5");
        let index = build_index(file.path(), 2).unwrap();

        assert_eq!(index.total_rows(), 5);
        assert_eq!(index.offsets(), [2, 6, 10]);
        assert_eq!(index.row_range(2), Some(4..5));
        assert_eq!(index.chunk_of_row(4), Some(2));
        assert_eq!(index.chunk_of_row(5), None);
    }

    #[test]
    fn test_header_only() {
        let file = write_file(b"a,b\n");
        let index = build_index(file.path(), 10).unwrap();

        assert!(index.is_empty());
        assert_eq!(index.chunk_count(), 0);
        assert_eq!(index.data_start(), 4);
    }

    #[test]
    fn test_empty_file() {
        let file = write_file(b"");
        let err = build_index(file.path(), 10).unwrap_err();
        assert!(matches!(err, Error::EmptyFile { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_index(dir.path().join("nope.csv"), 10).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_zero_chunk_size() {
        let file = write_file(b"a\n1\n");
        assert!(matches!(
            build_index(file.path(), 0),
            Err(Error::InvalidChunkSize)
        ));
    }

    #[test]
    fn test_bom_stripped_from_header() {
        let file = write_file(b"\xEF\xBB\xBFid,name\r\n1,x\r\n");
        let index = build_index(file.path(), 1).unwrap();

        assert_eq!(index.header(), ["id", "name"]);
        assert_eq!(index.offsets(), [12]);
    }

    #[test]
    fn test_blank_lines_are_rows() {
        let file = write_file(b"a\n\n\nb\n");
        let index = build_index(file.path(), 1).unwrap();

        assert_eq!(index.total_rows(), 3);
        assert_eq!(index.offsets(), [2, 3, 4]);
    }

    #[test]
    fn test_progress_reaches_100() {
        let file = write_file(b"h\n1\n2\n3\n");
        let mut seen = Vec::new();
        let config = DsvConfig::default().with_chunk_size(1);
        build_index_with(
            file.path(),
            &config,
            &mut |p: IndexProgress| seen.push(p.percent()),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_cancelled() {
        let file = write_file(b"h\n1\n2\n");
        let cancel = CancelToken::new();
        cancel.cancel();
        let config = DsvConfig::default();
        let result = build_index_with(file.path(), &config, &mut |_| {}, &cancel);
        assert!(result.unwrap_err().is_cancelled());
    }
}
