//! Per-path serialization of write jobs.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::trace;

type StartFn = Box<dyn FnOnce() + Send>;

/// Queues of pending jobs keyed by absolute target path.
///
/// Only the job at the head of a key's queue is active. Its start function
/// has already run; the start functions of the jobs behind it are held
/// until [`advance`](Self::advance) promotes them. A key is present only
/// while at least one of its jobs is pending or running.
///
/// Start functions always run outside the internal lock, so they may
/// enqueue or advance themselves.
///
/// ```rust
/// use atomic_file_write::PathQueue;
/// use std::path::Path;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let queue = PathQueue::new();
/// let started = Arc::new(AtomicUsize::new(0));
/// for _ in 0..2 {
///     let started = Arc::clone(&started);
///     queue.enqueue("/a".into(), move || {
///         started.fetch_add(1, Ordering::SeqCst);
///     });
/// }
/// assert_eq!(started.load(Ordering::SeqCst), 1);
///
/// queue.advance(Path::new("/a"));
/// assert_eq!(started.load(Ordering::SeqCst), 2);
/// queue.advance(Path::new("/a"));
/// assert!(queue.is_idle());
/// ```
#[derive(Default)]
pub struct PathQueue {
    active: Mutex<HashMap<PathBuf, VecDeque<Option<StartFn>>>>,
}

impl PathQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job for `key`, starting it immediately if nothing is queued
    /// for that key.
    pub fn enqueue<F>(&self, key: PathBuf, start: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let start_now = {
            let mut active = self.active.lock();
            let jobs = active.entry(key).or_default();
            if jobs.is_empty() {
                // The head slot stays occupied until `advance` pops it.
                jobs.push_back(None);
                trace!("starting write immediately");
                Some(start)
            } else {
                jobs.push_back(Some(Box::new(start)));
                trace!(position = jobs.len() - 1, "write queued behind active job");
                None
            }
        };

        if let Some(start) = start_now {
            start();
        }
    }

    /// Retire the active job for `key` and start the next one, if any.
    ///
    /// Must be called exactly once per enqueued job, whether it succeeded
    /// or failed; otherwise the key's queue never moves again.
    pub fn advance(&self, key: &Path) {
        let next = {
            let mut active = self.active.lock();
            let Some(jobs) = active.get_mut(key) else {
                trace!(key = %key.display(), "advance on idle key ignored");
                return;
            };
            jobs.pop_front();
            if jobs.is_empty() {
                active.remove(key);
                None
            } else {
                jobs.front_mut().and_then(Option::take)
            }
        };

        if let Some(start) = next {
            trace!(key = %key.display(), "starting next queued write");
            start();
        }
    }

    /// Number of jobs queued or running for `key`.
    pub fn pending(&self, key: &Path) -> usize {
        self.active.lock().get(key).map_or(0, VecDeque::len)
    }

    /// Keys with at least one queued or running job.
    pub fn active_keys(&self) -> Vec<PathBuf> {
        self.active.lock().keys().cloned().collect()
    }

    /// Returns `true` when no job is queued or running.
    pub fn is_idle(&self) -> bool {
        self.active.lock().is_empty()
    }
}

impl std::fmt::Debug for PathQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.active.lock();
        f.debug_map()
            .entries(active.iter().map(|(key, jobs)| (key, jobs.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> StartFn) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |name: &'static str| -> StartFn {
                let log = Arc::clone(&log);
                Box::new(move || log.lock().push(name))
            }
        };
        (log, make)
    }

    #[test]
    fn first_job_starts_immediately() {
        let queue = PathQueue::new();
        let (log, job) = recorder();

        queue.enqueue("/a".into(), job("first"));
        assert_eq!(*log.lock(), ["first"]);
        assert_eq!(queue.pending(Path::new("/a")), 1);
    }

    #[test]
    fn later_jobs_wait_for_advance() {
        let queue = PathQueue::new();
        let (log, job) = recorder();

        queue.enqueue("/a".into(), job("first"));
        queue.enqueue("/a".into(), job("second"));
        queue.enqueue("/a".into(), job("third"));
        assert_eq!(*log.lock(), ["first"]);
        assert_eq!(queue.pending(Path::new("/a")), 3);

        queue.advance(Path::new("/a"));
        assert_eq!(*log.lock(), ["first", "second"]);

        queue.advance(Path::new("/a"));
        assert_eq!(*log.lock(), ["first", "second", "third"]);
    }

    #[test]
    fn key_removed_when_drained() {
        let queue = PathQueue::new();
        let (_log, job) = recorder();

        queue.enqueue("/a".into(), job("only"));
        assert_eq!(queue.active_keys(), vec![PathBuf::from("/a")]);

        queue.advance(Path::new("/a"));
        assert!(queue.is_idle());
        assert_eq!(queue.pending(Path::new("/a")), 0);
    }

    #[test]
    fn keys_are_independent() {
        let queue = PathQueue::new();
        let (log, job) = recorder();

        queue.enqueue("/a".into(), job("a1"));
        queue.enqueue("/b".into(), job("b1"));
        queue.enqueue("/a".into(), job("a2"));
        assert_eq!(*log.lock(), ["a1", "b1"]);

        queue.advance(Path::new("/b"));
        assert_eq!(*log.lock(), ["a1", "b1"]);
        assert_eq!(queue.active_keys(), vec![PathBuf::from("/a")]);
    }

    #[test]
    fn advance_on_idle_key_is_a_no_op() {
        let queue = PathQueue::new();
        queue.advance(Path::new("/never"));
        assert!(queue.is_idle());
    }

    #[test]
    fn start_function_may_advance_reentrantly() {
        let queue = Arc::new(PathQueue::new());
        let (log, job) = recorder();

        let q = Arc::clone(&queue);
        let inner = job("synchronous");
        queue.enqueue("/a".into(), move || {
            inner();
            q.advance(Path::new("/a"));
        });

        assert_eq!(*log.lock(), ["synchronous"]);
        assert!(queue.is_idle());
    }
}
