//! Flush-to-storage operations.

use crate::{FsError, Handle};

/// Flush-to-storage operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsSync`.
pub trait FsSync: Send + Sync {
    /// Sync an open file's data and metadata to storage.
    ///
    /// Similar to POSIX `fsync(fd)`. Must not return before the data is durable.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    /// - [`FsError::Io`] for underlying I/O errors
    fn fsync(&self, handle: Handle) -> Result<(), FsError>;
}
