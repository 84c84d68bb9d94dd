//! Asynchronous, per-path serialized atomic writes.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::oneshot;
use tracing::trace;

use crate::traits::normalize_path;
use crate::{AtomicWriter, FsAtomic, FsError, PathQueue, Payload, WriteOptions};

/// One submitted write, owned by the coordinator until its queue slot is retired.
struct WriteJob {
    target: PathBuf,
    key: PathBuf,
    payload: Payload,
    options: WriteOptions,
}

/// Drives atomic writes over a driver, one at a time per target path.
///
/// Writes submitted through the same coordinator for the same path run in
/// submission order and never overlap. Writes to different paths run
/// concurrently. Each job's syscalls run on tokio's blocking pool.
///
/// The serialization guarantee is local to this coordinator; separate
/// coordinators, other processes and the synchronous API are not
/// coordinated with it.
///
/// ```rust
/// use atomic_file_write::{FsRead, MemoryFs, WriteCoordinator, WriteOptions};
/// use std::path::Path;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let coordinator = WriteCoordinator::new(MemoryFs::new());
/// let first = coordinator.submit("/state.json", "{\"v\":1}", WriteOptions::new());
/// let second = coordinator.submit("/state.json", "{\"v\":2}", WriteOptions::new());
/// first.await.unwrap();
/// second.await.unwrap();
///
/// let content = coordinator.backend().read(Path::new("/state.json")).unwrap();
/// assert_eq!(content, b"{\"v\":2}");
/// # });
/// ```
pub struct WriteCoordinator<B> {
    fs: Arc<B>,
    queue: Arc<PathQueue>,
}

impl<B> Clone for WriteCoordinator<B> {
    fn clone(&self) -> Self {
        Self {
            fs: Arc::clone(&self.fs),
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<B: FsAtomic + 'static> WriteCoordinator<B> {
    /// Create a coordinator that owns `fs`.
    pub fn new(fs: B) -> Self {
        Self::from_arc(Arc::new(fs))
    }

    /// Create a coordinator over a shared driver.
    pub fn from_arc(fs: Arc<B>) -> Self {
        Self {
            fs,
            queue: Arc::new(PathQueue::new()),
        }
    }

    /// The underlying driver.
    pub fn backend(&self) -> &B {
        &self.fs
    }

    /// The per-path queue, for inspection.
    pub fn queue(&self) -> &PathQueue {
        &self.queue
    }

    /// Submit a write and return a future for its completion.
    ///
    /// The job is queued before this returns, so the order of `submit`
    /// calls is the execution order for a path. The write runs whether or
    /// not the returned future is polled; dropping it only discards the
    /// result.
    ///
    /// Must be called from within a tokio runtime. Otherwise the returned
    /// future resolves to [`FsError::Backend`] and nothing is written.
    pub fn submit(
        &self,
        path: impl AsRef<Path>,
        payload: impl Into<Payload>,
        options: WriteOptions,
    ) -> PendingWrite {
        let runtime = match RuntimeHandle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => return PendingWrite::failed(FsError::Backend(err.to_string())),
        };

        let target = path.as_ref().to_path_buf();
        let key = queue_key(&target);
        let job = WriteJob {
            target,
            key: key.clone(),
            payload: payload.into(),
            options,
        };

        let (done_tx, done_rx) = oneshot::channel();
        let fs = Arc::clone(&self.fs);
        let slot = QueueSlot {
            queue: Arc::clone(&self.queue),
            key: key.clone(),
        };
        self.queue.enqueue(key, move || {
            // On a runtime that is shutting down the task is dropped
            // unpolled, which releases the slot.
            runtime.spawn(run_job(fs, slot, job, done_tx));
        });

        PendingWrite {
            state: PendingState::Waiting(done_rx),
        }
    }

    /// Atomically write `payload` to `path`, waiting behind earlier writes
    /// to the same path.
    ///
    /// # Errors
    ///
    /// The error of the first failing step; see [`AtomicWriter::run`].
    pub async fn write_file(
        &self,
        path: impl AsRef<Path>,
        payload: impl Into<Payload>,
        options: WriteOptions,
    ) -> Result<(), FsError> {
        self.submit(path, payload, options).await
    }

    /// Atomically write `payload` to `path` on the calling thread.
    ///
    /// Same steps and failure handling as [`write_file`](Self::write_file),
    /// but bypasses the queue entirely.
    ///
    /// # Errors
    ///
    /// The error of the first failing step; see [`AtomicWriter::run`].
    pub fn write_file_sync(
        &self,
        path: impl AsRef<Path>,
        payload: impl Into<Payload>,
        options: &WriteOptions,
    ) -> Result<(), FsError> {
        AtomicWriter::new(&*self.fs).run(path.as_ref(), &payload.into(), options)
    }
}

/// The head slot of a key's queue, held by the job occupying it.
///
/// Dropping it retires the slot and starts the next queued job. The job
/// drops it when its syscalls are done, or, if the job is torn down early
/// (runtime shutdown, panic), wherever the teardown happens.
struct QueueSlot {
    queue: Arc<PathQueue>,
    key: PathBuf,
}

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.queue.advance(&self.key);
    }
}

async fn run_job<B: FsAtomic + 'static>(
    fs: Arc<B>,
    slot: QueueSlot,
    job: WriteJob,
    done: oneshot::Sender<Result<(), FsError>>,
) {
    trace!(key = %job.key.display(), "write job started");

    // The slot rides along into the blocking task so that it is released
    // only once no syscall of this job can still be running.
    let result = tokio::task::spawn_blocking(move || {
        let result = AtomicWriter::new(&*fs).run(&job.target, &job.payload, &job.options);
        // Advance before notifying so a caller that immediately resubmits
        // queues behind jobs already waiting.
        drop(slot);
        result
    })
    .await
    .unwrap_or_else(|err| Err(FsError::Backend(format!("write task failed: {err}"))));

    let _ = done.send(result);
}

/// Queue key for a target: absolute and lexically normalized, symlinks untouched.
pub(crate) fn queue_key(path: &Path) -> PathBuf {
    match std::path::absolute(path) {
        Ok(absolute) => normalize_path(&absolute),
        Err(_) => path.to_path_buf(),
    }
}

/// Completion of a submitted write.
///
/// Resolves to `Ok(())` once the new content is published, or to the error
/// of the failing step.
#[must_use = "the write runs regardless, but its error is lost if this is dropped"]
pub struct PendingWrite {
    state: PendingState,
}

enum PendingState {
    Waiting(oneshot::Receiver<Result<(), FsError>>),
    Failed(Option<FsError>),
}

impl PendingWrite {
    fn failed(err: FsError) -> Self {
        Self {
            state: PendingState::Failed(Some(err)),
        }
    }
}

impl Future for PendingWrite {
    type Output = Result<(), FsError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            PendingState::Waiting(rx) => Pin::new(rx).poll(cx).map(|received| {
                received.unwrap_or_else(|_| {
                    Err(FsError::Backend("write job dropped before completion".into()))
                })
            }),
            PendingState::Failed(err) => Poll::Ready(Err(err
                .take()
                .unwrap_or_else(|| FsError::Backend("write result already taken".into())))),
        }
    }
}

impl std::fmt::Debug for PendingWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            PendingState::Waiting(_) => "waiting",
            PendingState::Failed(_) => "failed",
        };
        f.debug_struct("PendingWrite").field("state", &state).finish()
    }
}
