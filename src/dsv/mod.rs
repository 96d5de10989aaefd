//! Chunked, indexed access to delimited text files.
//!
//! A file is scanned once to build a sparse [`FileIndex`] holding the byte
//! offset of every `chunk_size`-th data row. Any chunk of rows can then be
//! reconstructed with a seek and a short sequential read, so memory stays
//! proportional to the number of chunks rather than the file size.
//!
//! # Format
//!
//! One record per line, first line is the header, fields separated by the
//! configured delimiter and optionally quoted. Quoted fields may contain the
//! delimiter but not line breaks: scanning is strictly line-oriented.
//!
//! # Example
//!
//! ```no_run
//! use bigcsv::dsv::{build_index, load_chunk, map_position};
//!
//! let index = build_index("huge.csv", 1000)?;
//! let chunk = map_position(0.5, index.total_rows(), index.chunk_size());
//! let rows = load_chunk("huge.csv", index.offsets()[chunk], index.chunk_size())?;
//! println!("{:?}: {} rows", index.header(), rows.len());
//! # Ok::<(), bigcsv::Error>(())
//! ```
//!
//! The source file must not be modified while an index built from it is in
//! use; offsets would no longer point at row starts and results are
//! undefined.

mod chunk;
mod config;
mod escape;
mod export;
mod index;
mod lines;
mod parser;
mod scroll;

pub use chunk::{load_chunk, Chunk, Row, RowReader};
pub use config::{DsvConfig, DEFAULT_CHUNK_SIZE};
pub use escape::{escape_field, escape_field_with};
pub use export::{export, export_file, export_with, write_record, write_rows, ExportScope};
pub use index::{build_index, build_index_with, FileIndex, IndexProgress};
pub use parser::{parse_line, parse_line_with};
pub use scroll::{chunk_count, map_position};
