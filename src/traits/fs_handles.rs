//! Handle-based file operations.
//!
//! The write pipeline opens the temp file once, writes through the handle,
//! flushes it with [`FsSync::fsync`](super::FsSync::fsync) and closes it.
//!
//! # Example
//!
//! ```rust
//! use atomic_file_write::{FsHandles, FsError, OpenFlags};
//! use std::path::Path;
//!
//! fn write_header<B: FsHandles>(backend: &B, path: &Path) -> Result<(), FsError> {
//!     let handle = backend.open(path, OpenFlags::WRITE, Some(0o644))?;
//!     backend.write_at(handle, b"HEADER", 0)?;
//!     backend.close(handle)
//! }
//! ```

use std::path::Path;

use crate::{FsError, Handle, OpenFlags};

/// Handle-based file operations.
///
/// # Handle Lifecycle
///
/// 1. Obtain a handle via [`open`](FsHandles::open)
/// 2. Write with [`write_at`](FsHandles::write_at)
/// 3. Release the handle with [`close`](FsHandles::close)
pub trait FsHandles: Send + Sync {
    /// Open a file and return a handle.
    ///
    /// `mode` is applied only when the file is created, like the third
    /// argument of POSIX `open(2)`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent directory doesn't exist, or the
    ///   file doesn't exist and `create` is false
    /// - [`FsError::NotAFile`] if the path is a directory
    /// - [`FsError::InvalidMode`] if `mode` has bits outside `0o7777`
    /// - [`FsError::PermissionDenied`] if access is denied
    fn open(&self, path: &Path, flags: OpenFlags, mode: Option<u32>) -> Result<Handle, FsError>;

    /// Write all of `data` at `offset`.
    ///
    /// Returns the number of bytes written, which equals `data.len()` on success.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    /// - [`FsError::PermissionDenied`] if the handle wasn't opened for writing
    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError>;

    /// Close a handle.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or already closed
    fn close(&self, handle: Handle) -> Result<(), FsError>;
}
