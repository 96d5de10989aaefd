//! Session controller for browsing one file.
//!
//! The session is owned by the caller's event thread. Every blocking
//! operation (indexing, chunk loading, export) is handed to a background
//! worker and its result comes back on a channel. The caller drains that
//! channel with [`Session::poll`] or [`Session::wait_update`], and each result
//! is applied to the session state before being returned as a
//! [`SessionUpdate`].
//!
//! ```text
//!            open / set_chunk_size
//!   Empty ─────────────────────────▶ Indexing ──▶ Ready ◀──▶ Loading(i)
//!     ▲                                  ▲          │
//!     └──────────── reset ───────────────┴──────────┘
//! ```
//!
//! Only one index build and one chunk load run at a time. Load requests that
//! arrive while another load is in flight are coalesced: the in-flight job is
//! cancelled, and only the latest request is dispatched. Every submission
//! carries a generation number, and results from superseded generations are
//! discarded, so a stale chunk never becomes current.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use bigcsv::session::{Session, SessionUpdate};
//! use bigcsv::dsv::DsvConfig;
//!
//! let mut session = Session::new(DsvConfig::default().with_chunk_size(500))?;
//! session.open("huge.csv")?;
//! session.scroll_to(0.25)?;
//! while let Some(update) = session.wait_update(Duration::from_secs(5))? {
//!     if let SessionUpdate::ChunkLoaded(chunk) = update {
//!         println!("{} rows starting at {}", chunk.len(), chunk.first_row());
//!         break;
//!     }
//! }
//! # Ok::<(), bigcsv::Error>(())
//! ```

mod worker;

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::dsv::{map_position, Chunk, DsvConfig, ExportScope, FileIndex, IndexProgress};
use crate::error::{Error, Result};

use worker::{ExportJob, ExportSource, IndexJob, LoadJob, Worker, WorkerEvent};

/// Lifecycle state of a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No file is open.
    Empty,
    /// A file index is being built.
    Indexing,
    /// The index is available and no load is in flight.
    Ready,
    /// Chunk `n` is being loaded.
    Loading(usize),
}

/// Outcome of a chunk request.
#[derive(Clone, Debug)]
pub enum ChunkRequest {
    /// The chunk is already current. No I/O was performed.
    Ready(Arc<Chunk>),
    /// A load is queued or in flight; a [`SessionUpdate::ChunkLoaded`] follows.
    Pending,
    /// Indexing is in progress; the request is dispatched once it completes.
    Deferred,
}

/// State change reported to the caller after applying a worker result.
#[derive(Debug)]
pub enum SessionUpdate {
    IndexProgress(IndexProgress),
    Indexed {
        header: Vec<String>,
        total_rows: u64,
        chunk_count: usize,
    },
    /// Indexing failed. Previously loaded state is unchanged; progress
    /// indication should be cleared.
    IndexFailed(Error),
    ChunkLoaded(Arc<Chunk>),
    /// Loading failed. The previous chunk stays current.
    ChunkFailed {
        index: usize,
        error: Error,
    },
    Exported {
        path: PathBuf,
        rows: u64,
    },
    ExportFailed {
        path: PathBuf,
        error: Error,
    },
}

/// A request made while indexing, replayed against the new index.
#[derive(Clone, Copy, Debug)]
enum Deferred {
    Chunk(usize),
    Scroll(f64),
}

struct InFlight {
    generation: u64,
    cancel: CancelToken,
}

struct InFlightIndex {
    job: InFlight,
    path: PathBuf,
}

struct InFlightLoad {
    job: InFlight,
    chunk: usize,
}

/// Browsing session over one delimited file.
pub struct Session {
    config: DsvConfig,
    state: SessionState,
    path: Option<PathBuf>,
    index: Option<Arc<FileIndex>>,
    current: Option<Arc<Chunk>>,
    indexing: Option<InFlightIndex>,
    loading: Option<InFlightLoad>,
    deferred: Option<Deferred>,
    exports_in_flight: usize,
    exports_cancel: CancelToken,
    next_generation: u64,
    events: Receiver<WorkerEvent>,
    worker: Worker,
}

impl Session {
    /// Create an empty session and start its worker thread.
    pub fn new(config: DsvConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }
        let (tx, rx) = mpsc::channel();
        let worker = Worker::spawn(tx)?;

        Ok(Self {
            config,
            state: SessionState::Empty,
            path: None,
            index: None,
            current: None,
            indexing: None,
            loading: None,
            deferred: None,
            exports_in_flight: 0,
            exports_cancel: CancelToken::new(),
            next_generation: 0,
            events: rx,
            worker,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &DsvConfig {
        &self.config
    }

    /// Path of the file the current index was built from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn index(&self) -> Option<&Arc<FileIndex>> {
        self.index.as_ref()
    }

    /// The materialized chunk, if any.
    pub fn current_chunk(&self) -> Option<&Arc<Chunk>> {
        self.current.as_ref()
    }

    /// True when no index build, chunk load or export is outstanding.
    pub fn is_idle(&self) -> bool {
        self.indexing.is_none() && self.loading.is_none() && self.exports_in_flight == 0
    }

    /// Open `path` and index it in the background.
    ///
    /// Any in-flight index build or chunk load is cancelled. The current
    /// index and chunk stay available until the new index lands; they are
    /// replaced on success and kept on failure.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        tracing::info!(path = %path.display(), chunk_size = self.config.chunk_size, "opening file");

        self.cancel_load();
        if let Some(old) = self.indexing.take() {
            old.job.cancel.cancel();
        }
        self.deferred = None;

        let generation = self.bump_generation();
        let cancel = CancelToken::new();
        let job = IndexJob {
            generation,
            path: path.clone(),
            config: self.config.clone(),
            cancel: cancel.clone(),
        };
        self.worker.with_queue(|queue| queue.push_index(job));

        self.indexing = Some(InFlightIndex {
            job: InFlight { generation, cancel },
            path,
        });
        self.state = SessionState::Indexing;
        Ok(())
    }

    /// Change the chunk size.
    ///
    /// With no file open the value is just stored. Otherwise the open file is
    /// re-indexed, since existing offsets are only valid for the old size.
    pub fn set_chunk_size(&mut self, chunk_size: usize) -> Result<()> {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }
        if chunk_size == self.config.chunk_size {
            return Ok(());
        }
        self.config.chunk_size = chunk_size;

        let target = self
            .indexing
            .as_ref()
            .map(|i| i.path.clone())
            .or_else(|| self.path.clone());
        match target {
            Some(path) => self.open(path),
            None => Ok(()),
        }
    }

    /// Request chunk `index`.
    ///
    /// Returns the current chunk directly when it already is `index`.
    /// Otherwise any in-flight load for a different chunk is cancelled and a
    /// new load replaces whatever was pending.
    pub fn request_chunk(&mut self, index: usize) -> Result<ChunkRequest> {
        if self.indexing.is_some() {
            self.deferred = Some(Deferred::Chunk(index));
            return Ok(ChunkRequest::Deferred);
        }
        let file_index = self.index.clone().ok_or(Error::NoFile)?;
        if index >= file_index.chunk_count() {
            return Err(Error::ChunkOutOfRange {
                index,
                count: file_index.chunk_count(),
            });
        }

        if let Some(current) = &self.current {
            if current.index() == index {
                let current = Arc::clone(current);
                self.cancel_load();
                self.state = SessionState::Ready;
                return Ok(ChunkRequest::Ready(current));
            }
        }

        if let Some(loading) = &self.loading {
            if loading.chunk == index {
                return Ok(ChunkRequest::Pending);
            }
        }

        self.cancel_load();
        let path = self.path.clone().ok_or(Error::NoFile)?;
        let generation = self.bump_generation();
        let cancel = CancelToken::new();
        let job = LoadJob {
            generation,
            path,
            index: file_index,
            chunk: index,
            config: self.config.clone(),
            cancel: cancel.clone(),
        };
        if let Some(old) = self.worker.with_queue(|queue| queue.push_load(job)) {
            tracing::trace!(
                dropped = old.chunk,
                requested = index,
                "coalesced chunk request"
            );
        }

        self.loading = Some(InFlightLoad {
            job: InFlight { generation, cancel },
            chunk: index,
        });
        self.state = SessionState::Loading(index);
        Ok(ChunkRequest::Pending)
    }

    /// Map a normalized scroll position to a chunk and request it.
    pub fn scroll_to(&mut self, fraction: f64) -> Result<ChunkRequest> {
        if self.indexing.is_some() {
            self.deferred = Some(Deferred::Scroll(fraction));
            return Ok(ChunkRequest::Deferred);
        }
        let file_index = self.index.as_ref().ok_or(Error::NoFile)?;
        let target = map_position(fraction, file_index.total_rows(), file_index.chunk_size());
        self.request_chunk(target)
    }

    /// Export to `dest` in the background.
    ///
    /// [`ExportScope::CurrentChunk`] writes the header and the rows of the
    /// materialized chunk (just the header when none is loaded).
    /// [`ExportScope::WholeFile`] streams every row of the source file.
    pub fn export(&mut self, dest: impl AsRef<Path>, scope: ExportScope) -> Result<()> {
        let file_index = self.index.clone().ok_or(Error::NoFile)?;
        let source = match scope {
            ExportScope::CurrentChunk => ExportSource::Chunk {
                header: file_index.header().to_vec(),
                chunk: self.current.clone(),
            },
            ExportScope::WholeFile => ExportSource::File {
                path: self.path.clone().ok_or(Error::NoFile)?,
                index: file_index,
            },
        };
        let job = ExportJob {
            dest: dest.as_ref().to_path_buf(),
            source,
            config: self.config.clone(),
            cancel: self.exports_cancel.clone(),
        };
        self.worker.with_queue(|queue| queue.push_export(job));
        self.exports_in_flight += 1;
        Ok(())
    }

    /// Close the file and return to [`SessionState::Empty`].
    ///
    /// Pending index and load jobs are dropped and in-flight ones cancelled.
    /// Queued exports still run.
    pub fn reset(&mut self) {
        self.cancel_load();
        if let Some(old) = self.indexing.take() {
            old.job.cancel.cancel();
        }
        self.worker.with_queue(|queue| queue.clear());
        self.bump_generation();

        self.deferred = None;
        self.path = None;
        self.index = None;
        self.current = None;
        self.state = SessionState::Empty;
    }

    /// Apply every result that is ready without blocking.
    pub fn poll(&mut self) -> Result<Vec<SessionUpdate>> {
        let mut updates = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => updates.extend(self.apply(event)),
                Err(TryRecvError::Empty) => return Ok(updates),
                Err(TryRecvError::Disconnected) => return Err(Error::WorkerGone),
            }
        }
    }

    /// Block until a result produces an update or `timeout` elapses.
    ///
    /// Results from superseded jobs are applied silently and do not end the
    /// wait. Returns `Ok(None)` on timeout.
    pub fn wait_update(&mut self, timeout: Duration) -> Result<Option<SessionUpdate>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(event) => {
                    if let Some(update) = self.apply(event) {
                        return Ok(Some(update));
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(Error::WorkerGone),
            }
        }
    }

    /// Wait until the session is idle, collecting updates on the way.
    pub fn settle(&mut self, timeout: Duration) -> Result<Vec<SessionUpdate>> {
        let deadline = Instant::now() + timeout;
        let mut updates = Vec::new();
        while !self.is_idle() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            updates.extend(self.wait_update(remaining)?);
        }
        Ok(updates)
    }

    /// Fold one worker result into the session state.
    ///
    /// Index and load results are only applied when their generation matches
    /// the job currently tracked as in flight; anything older was superseded
    /// and is dropped, returning `None`. Export results always apply.
    fn apply(&mut self, event: WorkerEvent) -> Option<SessionUpdate> {
        match event {
            WorkerEvent::IndexProgress {
                generation,
                progress,
            } => self
                .is_current_index(generation)
                .then_some(SessionUpdate::IndexProgress(progress)),
            WorkerEvent::Indexed { generation, result } => {
                if !self.is_current_index(generation) {
                    tracing::trace!(generation, "discarding stale index");
                    return None;
                }
                let finished = self.indexing.take()?;
                Some(self.finish_index(finished.path, result))
            }
            WorkerEvent::ChunkLoaded {
                generation,
                chunk,
                result,
            } => {
                let is_current = self
                    .loading
                    .as_ref()
                    .is_some_and(|l| l.job.generation == generation);
                if !is_current {
                    tracing::trace!(generation, chunk, "discarding superseded chunk");
                    return None;
                }
                self.loading = None;
                self.state = SessionState::Ready;
                match result {
                    Ok(loaded) => {
                        let loaded = Arc::new(loaded);
                        self.current = Some(Arc::clone(&loaded));
                        Some(SessionUpdate::ChunkLoaded(loaded))
                    }
                    Err(error) => {
                        tracing::warn!(chunk, "chunk load failed: {}", error);
                        Some(SessionUpdate::ChunkFailed {
                            index: chunk,
                            error,
                        })
                    }
                }
            }
            WorkerEvent::Exported { dest, result } => {
                self.exports_in_flight = self.exports_in_flight.saturating_sub(1);
                match result {
                    Ok(rows) => Some(SessionUpdate::Exported { path: dest, rows }),
                    Err(error) => {
                        tracing::warn!(dest = %dest.display(), "export failed: {}", error);
                        Some(SessionUpdate::ExportFailed { path: dest, error })
                    }
                }
            }
        }
    }

    /// Install a finished index, or keep the previous one on failure.
    ///
    /// Only called for the current generation. On success the current chunk
    /// is cleared and a request deferred during indexing is replayed.
    fn finish_index(&mut self, path: PathBuf, result: Result<FileIndex>) -> SessionUpdate {
        let deferred = self.deferred.take();
        match result {
            Ok(file_index) => {
                let update = SessionUpdate::Indexed {
                    header: file_index.header().to_vec(),
                    total_rows: file_index.total_rows(),
                    chunk_count: file_index.chunk_count(),
                };
                self.path = Some(path);
                self.index = Some(Arc::new(file_index));
                self.current = None;
                self.state = SessionState::Ready;

                let replay = match deferred {
                    Some(Deferred::Chunk(index)) => Some(self.request_chunk(index)),
                    Some(Deferred::Scroll(fraction)) => Some(self.scroll_to(fraction)),
                    None => None,
                };
                if let Some(Err(e)) = replay {
                    tracing::warn!("deferred chunk request dropped: {}", e);
                }
                update
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), "indexing failed: {}", error);
                self.state = if self.index.is_some() {
                    SessionState::Ready
                } else {
                    SessionState::Empty
                };
                SessionUpdate::IndexFailed(error)
            }
        }
    }

    fn is_current_index(&self, generation: u64) -> bool {
        self.indexing
            .as_ref()
            .is_some_and(|i| i.job.generation == generation)
    }

    /// Cancel the in-flight load, if any, and drop a pending one.
    fn cancel_load(&mut self) {
        if let Some(old) = self.loading.take() {
            old.job.cancel.cancel();
        }
        self.worker.with_queue(|queue| queue.take_load());
        if let SessionState::Loading(_) = self.state {
            self.state = SessionState::Ready;
        }
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(loading) = &self.loading {
            loading.job.cancel.cancel();
        }
        if let Some(indexing) = &self.indexing {
            indexing.job.cancel.cancel();
        }
        self.exports_cancel.cancel();
    }
}
