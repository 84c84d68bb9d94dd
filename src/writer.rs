//! The atomic write pipeline.
//!
//! ```text
//! realpath ─▶ temp name ─▶ attributes ─▶ open ─▶ write ─▶ fsync ─▶ close
//!                                                                   │
//!                         rename (publish) ◀─ chmod ◀─ chown ◀──────┘
//! ```
//!
//! Any failure after the temp name is chosen closes the handle if it is
//! still open, unlinks the temp file and returns the original error. The
//! target is only ever touched by the final rename.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::attributes::{resolve_attributes, ResolvedAttributes};
use crate::{temp_name, FsAtomic, FsError, Handle, OpenFlags, Payload, WriteOptions};

/// Steps of a single write, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteStage {
    Opening,
    Writing,
    Flushing,
    Closing,
    Chowning,
    Chmodding,
    Renaming,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteStage::Opening => "open",
            WriteStage::Writing => "write",
            WriteStage::Flushing => "fsync",
            WriteStage::Closing => "close",
            WriteStage::Chowning => "chown",
            WriteStage::Chmodding => "chmod",
            WriteStage::Renaming => "rename",
        })
    }
}

/// Runs the write pipeline against a driver.
///
/// `AtomicWriter` holds no state of its own and performs no queueing: it is
/// the synchronous form of an atomic write. Callers issuing overlapping
/// writes to the same path must serialize them themselves, or go through a
/// [`WriteCoordinator`](crate::WriteCoordinator).
///
/// ```rust
/// use atomic_file_write::{AtomicWriter, FsRead, MemoryFs, WriteOptions};
/// use std::path::Path;
///
/// let fs = MemoryFs::new();
/// AtomicWriter::new(&fs)
///     .run(Path::new("/config.toml"), &"answer = 42".into(), &WriteOptions::new())
///     .unwrap();
/// assert_eq!(fs.read(Path::new("/config.toml")).unwrap(), b"answer = 42");
/// ```
pub struct AtomicWriter<'a, B: FsAtomic + ?Sized> {
    fs: &'a B,
}

impl<'a, B: FsAtomic + ?Sized> AtomicWriter<'a, B> {
    /// Create a writer over `fs`.
    pub fn new(fs: &'a B) -> Self {
        Self { fs }
    }

    /// Resolve the path that is actually replaced.
    ///
    /// Follows symlinks; a path that cannot be resolved (typically one that
    /// does not exist yet) is used as given.
    pub fn real_path(&self, target: &Path) -> PathBuf {
        self.fs
            .canonicalize(target)
            .unwrap_or_else(|_| target.to_path_buf())
    }

    /// Atomically replace `target` with `payload`.
    ///
    /// On success the real target holds exactly the new content. On error
    /// the real target is unchanged and the error of the failing step is
    /// returned; cleanup failures are never reported in its place.
    ///
    /// # Errors
    ///
    /// Whatever the driver returns from open, write, fsync, close, chown,
    /// chmod or rename.
    pub fn run(
        &self,
        target: &Path,
        payload: &Payload,
        options: &WriteOptions,
    ) -> Result<(), FsError> {
        let real = self.real_path(target);
        let tmp = temp_name(&real);
        let attrs = resolve_attributes(self.fs, &real, options);

        let mut open_handle = None;
        match self.publish(&real, &tmp, payload, options, attrs, &mut open_handle) {
            Ok(written) => {
                debug!(
                    target = %real.display(),
                    tmp = %tmp.display(),
                    bytes = written,
                    "atomic write published"
                );
                Ok(())
            }
            Err((stage, err)) => {
                warn!(target = %real.display(), %stage, error = %err, "atomic write failed");
                self.discard(&tmp, open_handle);
                Err(err)
            }
        }
    }

    fn publish(
        &self,
        real: &Path,
        tmp: &Path,
        payload: &Payload,
        options: &WriteOptions,
        attrs: ResolvedAttributes,
        open_handle: &mut Option<Handle>,
    ) -> Result<usize, (WriteStage, FsError)> {
        use WriteStage::*;

        let handle = self
            .fs
            .open(tmp, OpenFlags::WRITE, attrs.mode)
            .map_err(|e| (Opening, e))?;
        *open_handle = Some(handle);

        let mut written = 0;
        if let Some(bytes) = payload.encode(options.encoding) {
            written = self
                .fs
                .write_at(handle, &bytes, 0)
                .map_err(|e| (Writing, e))?;
        }

        if options.fsync {
            self.fs.fsync(handle).map_err(|e| (Flushing, e))?;
        }
        open_handle.take();
        self.fs.close(handle).map_err(|e| (Closing, e))?;

        if let Some(owner) = attrs.owner {
            self.fs.set_owner(tmp, owner).map_err(|e| (Chowning, e))?;
        }
        // Re-applied after open: the creation mode is filtered by the umask
        // and ignored entirely when the temp name already existed.
        if let Some(mode) = attrs.mode {
            self.fs
                .set_permissions(tmp, mode)
                .map_err(|e| (Chmodding, e))?;
        }

        self.fs.rename(tmp, real).map_err(|e| (Renaming, e))?;
        Ok(written)
    }

    /// Best-effort rollback after a failed step.
    fn discard(&self, tmp: &Path, open_handle: Option<Handle>) {
        if let Some(handle) = open_handle {
            if let Err(err) = self.fs.close(handle) {
                debug!(tmp = %tmp.display(), error = %err, "ignoring close failure during cleanup");
            }
        }
        if let Err(err) = self.fs.remove_file(tmp) {
            debug!(tmp = %tmp.display(), error = %err, "ignoring unlink failure during cleanup");
        }
    }
}
