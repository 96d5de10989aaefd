//! Serializing header and rows back to delimited text.
//!
//! Output is written through a buffered writer straight into the destination
//! file. A failure part way through can leave a truncated file behind.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::chunk::RowReader;
use super::config::DsvConfig;
use super::escape::escape_field_with;
use super::index::FileIndex;
use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// Which rows an export covers.
///
/// The header always reflects the whole file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExportScope {
    /// Only the rows of the currently materialized chunk.
    #[default]
    CurrentChunk,
    /// Every data row of the source file, streamed from disk.
    WholeFile,
}

/// Write one escaped, delimiter-joined record followed by `\n`.
pub fn write_record<W, S>(writer: &mut W, fields: &[S], config: &DsvConfig) -> std::io::Result<()>
where
    W: Write,
    S: AsRef<str>,
{
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            writer.write_all(&[config.delimiter])?;
        }
        writer.write_all(escape_field_with(field.as_ref(), config).as_bytes())?;
    }
    writer.write_all(b"\n")
}

/// Write the header then every row to `writer`. Returns the number of rows.
pub fn write_rows<W, I, R, S>(
    writer: &mut W,
    header: &[S],
    rows: I,
    config: &DsvConfig,
) -> std::io::Result<u64>
where
    W: Write,
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    write_record(writer, header, config)?;
    let mut count = 0;
    for row in rows {
        write_record(writer, row.as_ref(), config)?;
        count += 1;
    }
    Ok(count)
}

/// Export `header` and `rows` to `path` as comma-separated text.
///
/// # Examples
///
/// ```no_run
/// use bigcsv::dsv::export;
///
/// let header = vec!["id".to_string(), "note".to_string()];
/// let rows = vec![vec!["1".to_string(), "a, b".to_string()]];
/// export("out.csv", &header, &rows)?;
/// # Ok::<(), bigcsv::Error>(())
/// ```
pub fn export<P, I, R, S>(path: P, header: &[S], rows: I) -> Result<u64>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    export_with(path.as_ref(), header, rows, &DsvConfig::default())
}

/// Export with an explicit configuration.
pub fn export_with<I, R, S>(path: &Path, header: &[S], rows: I, config: &DsvConfig) -> Result<u64>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let count = write_rows(&mut writer, header, rows, config).map_err(|e| Error::io(path, e))?;
    writer.flush().map_err(|e| Error::io(path, e))?;
    Ok(count)
}

/// Stream every data row of `source` into `dest`.
///
/// Rows are re-read from disk one at a time starting at the index's data
/// start, so memory stays bounded by the longest row.
pub fn export_file(
    source: &Path,
    index: &FileIndex,
    dest: &Path,
    config: &DsvConfig,
    cancel: &CancelToken,
) -> Result<u64> {
    let rows = RowReader::open(source, index.data_start(), config)?.with_cancel(cancel.clone());

    let file = File::create(dest).map_err(|e| Error::io(dest, e))?;
    let mut writer = BufWriter::new(file);
    write_record(&mut writer, index.header(), config).map_err(|e| Error::io(dest, e))?;

    let mut count = 0;
    for row in rows {
        let row = row?;
        write_record(&mut writer, &row, config).map_err(|e| Error::io(dest, e))?;
        count += 1;
    }
    writer.flush().map_err(|e| Error::io(dest, e))?;

    tracing::debug!(
        source = %source.display(),
        dest = %dest.display(),
        rows = count,
        "exported file"
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsv::index::build_index;

    fn render(header: &[&str], rows: &[Vec<&str>]) -> String {
        let mut out = Vec::new();
        write_rows(&mut out, header, rows, &DsvConfig::default()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_write_rows() {
        let text = render(
            &["id", "name"],
            &[
                vec!["1", "plain"],
                vec!["2", "with, comma"],
                vec!["3", "say \"hi\""],
            ],
        );
        insta::assert_snapshot!(text, @r###"
        id,name
        1,plain
        2,"with, comma"
        3,"say ""hi"""
        "###);
    }

    #[test]
    fn test_header_only() {
        assert_eq!(render(&["a", "b"], &[]), "a,b\n");
    }

    #[test]
    fn test_tsv_record() {
        let mut out = Vec::new();
        write_record(&mut out, &["a,b", "c\td"], &DsvConfig::tsv()).unwrap();
        assert_eq!(out, b"a,b\t\"c\td\"\n");
    }

    #[test]
    fn test_export_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let header = vec!["x".to_string()];
        let rows = vec![vec!["1".to_string()], vec!["2".to_string()]];

        assert_eq!(export(&path, &header, &rows).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\n1\n2\n");
    }

    #[test]
    fn test_export_into_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let header = vec!["x".to_string()];
        let rows: Vec<Vec<String>> = Vec::new();

        assert!(matches!(
            export(&path, &header, &rows),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_export_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.csv");
        let dest = dir.path().join("out.csv");
        std::fs::write(&source, "a,b\r\n1,\"x,y\"\r\n2,z\r\n").unwrap();
        let index = build_index(&source, 1).unwrap();

        let config = DsvConfig::default();
        let count = export_file(&source, &index, &dest, &config, &CancelToken::new()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "a,b\n1,\"x,y\"\n2,z\n"
        );
    }
}
