//! # bigcsv
//!
//! Chunked, indexed random access to very large CSV files.
//!
//! A file is scanned once to record the byte offset of every `chunk_size`-th
//! row. Any window of rows can then be rebuilt with a seek and a short read,
//! which keeps memory proportional to the number of chunks instead of the
//! file size.
//!
//! ## Module Organization
//!
//! - [`dsv`] - Line parsing, field escaping, indexing, chunk loading,
//!   scroll mapping and export
//! - [`session`] - Background worker and state machine for interactive
//!   browsing, with coalesced chunk requests
//! - [`cancel`] - Cooperative cancellation tokens
//!
//! ## Quick Start
//!
//! ```no_run
//! use bigcsv::dsv::{build_index, load_chunk};
//!
//! let index = build_index("huge.csv", 1000)?;
//! let last = index.chunk_count() - 1;
//! let rows = load_chunk("huge.csv", index.offsets()[last], index.chunk_size())?;
//! assert!(rows.len() <= 1000);
//! # Ok::<(), bigcsv::Error>(())
//! ```
//!
//! ## Features
//!
//! - `serde` - Serialization of [`DsvConfig`], [`FileIndex`] and
//!   [`dsv::ExportScope`]
//! - `cli` - The `bigcsv` command-line tool

/// Cooperative cancellation for long-running jobs.
pub mod cancel;

/// Chunked DSV (CSV/TSV) access.
pub mod dsv;

/// Error types.
pub mod error;

/// Interactive browsing session.
pub mod session;

pub use cancel::CancelToken;
pub use dsv::{Chunk, DsvConfig, FileIndex, Row};
pub use error::{Error, Result};
pub use session::{ChunkRequest, Session, SessionState, SessionUpdate};
