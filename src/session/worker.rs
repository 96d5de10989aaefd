//! Background worker for blocking file operations.
//!
//! One dedicated thread drains a small job queue guarded by a mutex and a
//! condition variable. The queue has one slot for an index build, one slot
//! for a chunk load and a FIFO of exports. Submitting a load overwrites the
//! pending one, so fast scrolling never builds a backlog: only the most
//! recent request survives until the worker is free. Results are posted in
//! order on an mpsc channel owned by the session.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::cancel::CancelToken;
use crate::dsv::{self, Chunk, DsvConfig, FileIndex, IndexProgress};
use crate::error::{Error, Result};

pub(crate) struct IndexJob {
    pub generation: u64,
    pub path: PathBuf,
    pub config: DsvConfig,
    pub cancel: CancelToken,
}

pub(crate) struct LoadJob {
    pub generation: u64,
    pub path: PathBuf,
    pub index: Arc<FileIndex>,
    pub chunk: usize,
    pub config: DsvConfig,
    pub cancel: CancelToken,
}

pub(crate) enum ExportSource {
    /// Header plus the rows of a materialized chunk, if any.
    Chunk {
        header: Vec<String>,
        chunk: Option<Arc<Chunk>>,
    },
    /// Every row of the indexed source file.
    File {
        path: PathBuf,
        index: Arc<FileIndex>,
    },
}

pub(crate) struct ExportJob {
    pub dest: PathBuf,
    pub source: ExportSource,
    pub config: DsvConfig,
    pub cancel: CancelToken,
}

pub(crate) enum Job {
    Index(IndexJob),
    Load(LoadJob),
    Export(ExportJob),
}

/// Results posted back to the session, in completion order.
pub(crate) enum WorkerEvent {
    IndexProgress {
        generation: u64,
        progress: IndexProgress,
    },
    Indexed {
        generation: u64,
        result: Result<FileIndex>,
    },
    ChunkLoaded {
        generation: u64,
        chunk: usize,
        result: Result<Chunk>,
    },
    Exported {
        dest: PathBuf,
        result: Result<u64>,
    },
}

#[derive(Default)]
pub(crate) struct Queue {
    index: Option<IndexJob>,
    load: Option<LoadJob>,
    exports: VecDeque<ExportJob>,
    shutdown: bool,
}

impl Queue {
    /// Replace any pending index build and drop the pending load, which was
    /// resolved against the old index.
    pub(crate) fn push_index(&mut self, job: IndexJob) {
        if let Some(old) = self.index.replace(job) {
            old.cancel.cancel();
        }
        if let Some(old) = self.load.take() {
            old.cancel.cancel();
        }
    }

    /// Replace the pending load. The superseded job is returned so the
    /// caller can see what was coalesced away.
    pub(crate) fn push_load(&mut self, job: LoadJob) -> Option<LoadJob> {
        self.load.replace(job)
    }

    pub(crate) fn push_export(&mut self, job: ExportJob) {
        self.exports.push_back(job);
    }

    pub(crate) fn take_load(&mut self) -> Option<LoadJob> {
        self.load.take()
    }

    #[cfg(test)]
    pub(crate) fn has_pending_load(&self) -> bool {
        self.load.is_some()
    }

    /// Drop pending index and load jobs. Exports are kept.
    pub(crate) fn clear(&mut self) {
        self.index = None;
        self.load = None;
    }

    /// Next job to run. Index builds come first so offsets are stable before
    /// any load is resolved against them; loads come before exports to keep
    /// scrolling responsive.
    pub(crate) fn pop(&mut self) -> Option<Job> {
        if let Some(job) = self.index.take() {
            return Some(Job::Index(job));
        }
        if let Some(job) = self.load.take() {
            return Some(Job::Load(job));
        }
        self.exports.pop_front().map(Job::Export)
    }
}

struct Shared {
    queue: Mutex<Queue>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the worker thread. Dropping it stops and joins the thread.
pub(crate) struct Worker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn(events: Sender<WorkerEvent>) -> Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            ready: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("bigcsv-worker".into())
            .spawn(move || run(&thread_shared, &events))
            .map_err(|e| {
                tracing::warn!("failed to spawn worker thread: {}", e);
                Error::WorkerGone
            })?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Run `f` on the locked queue and wake the worker.
    pub(crate) fn with_queue<T>(&self, f: impl FnOnce(&mut Queue) -> T) -> T {
        let mut queue = self.shared.lock();
        let out = f(&mut queue);
        drop(queue);
        self.shared.ready.notify_one();
        out
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        {
            let mut queue = self.shared.lock();
            queue.shutdown = true;
            if let Some(job) = &queue.index {
                job.cancel.cancel();
            }
            if let Some(job) = &queue.load {
                job.cancel.cancel();
            }
        }
        self.shared.ready.notify_one();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked");
            }
        }
    }
}

fn run(shared: &Shared, events: &Sender<WorkerEvent>) {
    loop {
        let job = {
            let mut queue = shared.lock();
            loop {
                if queue.shutdown {
                    return;
                }
                if let Some(job) = queue.pop() {
                    break job;
                }
                queue = shared
                    .ready
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let event = match job {
            Job::Index(job) => run_index(job, events),
            Job::Load(job) => run_load(job),
            Job::Export(job) => run_export(job),
        };
        if events.send(event).is_err() {
            tracing::debug!("session dropped, worker exiting");
            return;
        }
    }
}

fn run_index(job: IndexJob, events: &Sender<WorkerEvent>) -> WorkerEvent {
    tracing::debug!(generation = job.generation, path = %job.path.display(), "indexing");
    let generation = job.generation;
    let mut on_progress = |progress: IndexProgress| {
        // A closed channel is noticed when the result is sent.
        let _ = events.send(WorkerEvent::IndexProgress {
            generation,
            progress,
        });
    };
    let result = dsv::build_index_with(&job.path, &job.config, &mut on_progress, &job.cancel);
    WorkerEvent::Indexed { generation, result }
}

fn run_load(job: LoadJob) -> WorkerEvent {
    if job.cancel.is_cancelled() {
        return WorkerEvent::ChunkLoaded {
            generation: job.generation,
            chunk: job.chunk,
            result: Err(Error::Cancelled),
        };
    }
    tracing::debug!(
        generation = job.generation,
        chunk = job.chunk,
        "loading chunk"
    );
    let result =
        Chunk::load_cancellable(&job.path, &job.index, job.chunk, &job.config, &job.cancel);
    WorkerEvent::ChunkLoaded {
        generation: job.generation,
        chunk: job.chunk,
        result,
    }
}

fn run_export(job: ExportJob) -> WorkerEvent {
    tracing::debug!(dest = %job.dest.display(), "exporting");
    let result = match &job.source {
        ExportSource::Chunk { header, chunk } => {
            let rows = chunk.as_deref().map(Chunk::rows).unwrap_or_default();
            dsv::export_with(&job.dest, header, rows, &job.config)
        }
        ExportSource::File { path, index } => {
            dsv::export_file(path, index, &job.dest, &job.config, &job.cancel)
        }
    };
    WorkerEvent::Exported {
        dest: job.dest,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_job(generation: u64, chunk: usize, index: &Arc<FileIndex>) -> LoadJob {
        LoadJob {
            generation,
            path: PathBuf::from("unused.csv"),
            index: Arc::clone(index),
            chunk,
            config: DsvConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    fn index_job(generation: u64) -> IndexJob {
        IndexJob {
            generation,
            path: PathBuf::from("unused.csv"),
            config: DsvConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    fn sample_index() -> Arc<FileIndex> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.csv");
        std::fs::write(&path, "h\n1\n2\n3\n").unwrap();
        Arc::new(dsv::build_index(&path, 1).unwrap())
    }

    #[test]
    fn test_load_slot_keeps_latest() {
        let index = sample_index();
        let mut queue = Queue::default();

        assert!(queue.push_load(load_job(1, 0, &index)).is_none());
        let replaced = queue.push_load(load_job(2, 2, &index)).unwrap();
        assert_eq!(replaced.chunk, 0);
        let replaced = queue.push_load(load_job(3, 1, &index)).unwrap();
        assert_eq!(replaced.chunk, 2);

        match queue.pop() {
            Some(Job::Load(job)) => assert_eq!((job.generation, job.chunk), (3, 1)),
            _ => panic!("expected load job"),
        }
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_index_supersedes_pending_load() {
        let index = sample_index();
        let mut queue = Queue::default();
        let load = load_job(1, 0, &index);
        let load_cancel = load.cancel.clone();
        queue.push_load(load);

        queue.push_index(index_job(2));

        assert!(load_cancel.is_cancelled());
        assert!(matches!(queue.pop(), Some(Job::Index(job)) if job.generation == 2));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_order_index_load_export() {
        let index = sample_index();
        let mut queue = Queue::default();
        queue.push_export(ExportJob {
            dest: PathBuf::from("out.csv"),
            source: ExportSource::Chunk {
                header: vec![],
                chunk: None,
            },
            config: DsvConfig::default(),
            cancel: CancelToken::new(),
        });
        queue.push_index(index_job(1));
        queue.push_load(load_job(2, 0, &index));

        assert!(matches!(queue.pop(), Some(Job::Index(_))));
        assert!(matches!(queue.pop(), Some(Job::Load(_))));
        assert!(matches!(queue.pop(), Some(Job::Export(_))));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_clear_keeps_exports() {
        let mut queue = Queue::default();
        queue.push_index(index_job(1));
        queue.push_export(ExportJob {
            dest: PathBuf::from("out.csv"),
            source: ExportSource::Chunk {
                header: vec![],
                chunk: None,
            },
            config: DsvConfig::default(),
            cancel: CancelToken::new(),
        });

        queue.clear();

        assert!(matches!(queue.pop(), Some(Job::Export(_))));
        assert!(queue.pop().is_none());
    }
}
