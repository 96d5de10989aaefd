//! Error types shared by the indexer, loader, exporter and session.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised by blocking DSV operations and the session controller.
///
/// Rows whose field count differs from the header are not an error; they are
/// handed out as parsed.
#[derive(Debug, Error)]
pub enum Error {
    /// File missing, unreadable, permission denied, or a failed write.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file has no header line.
    #[error("{} is empty (no header line)", path.display())]
    EmptyFile { path: PathBuf },

    #[error("chunk size must be at least 1")]
    InvalidChunkSize,

    #[error("chunk {index} is out of range (file has {count} chunks)")]
    ChunkOutOfRange { index: usize, count: usize },

    #[error("no file is open")]
    NoFile,

    /// The job observed its cancel token and stopped early.
    #[error("operation cancelled")]
    Cancelled,

    #[error("background worker is no longer running")]
    WorkerGone,
}

impl Error {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for [`Error::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;
